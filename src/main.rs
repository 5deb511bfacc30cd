use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tillpay::config::{Config, LogFormat};
use tillpay::middleware::{RateLimiter, RequestId};
use tillpay::AppServices;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tillpay=debug,actix_web=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn cors(allowed_origin: Option<&str>) -> Cors {
    match allowed_origin {
        Some(origin) => Cors::default()
            .allowed_origin(origin)
            .allowed_methods(vec!["GET", "POST"])
            .allow_any_header()
            .max_age(3600),
        None => Cors::permissive(),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = Config::from_env().map_err(|e| std::io::Error::other(e.to_string()))?;
    init_tracing(config.app.log_format);
    config
        .validate()
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    tracing::info!("Starting Tillpay payment service");
    tracing::info!(
        environment = %config.app.env,
        gateway_environment = %config.mpesa.environment,
        simulated = config.mpesa.simulate,
        "Configuration loaded"
    );

    let services = AppServices::from_config(&config)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let bind_address = config.server.bind_address();
    let rate_limit = config.security.rate_limit_per_minute;
    let allowed_origin = config.server.cors_allowed_origin.clone();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(cors(allowed_origin.as_deref()))
            .wrap(RateLimiter::new(rate_limit))
            .wrap(RequestId)
            .wrap(TracingLogger::default())
            .configure(|cfg| services.configure(cfg))
            .route("/", web::get().to(index))
    })
    .workers(config.server.workers)
    .bind(&bind_address)?
    .run();

    tracing::info!("Server started at http://{}", bind_address);

    server.await
}

async fn index() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "service": "Tillpay",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}
