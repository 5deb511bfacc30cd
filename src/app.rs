use actix_web::web;
use std::sync::Arc;

use crate::config::{Config, DatabaseConfig, PollingConfig};
use crate::core::Result;
use crate::modules::customers::{self, CustomerAccounts, InMemoryCustomerAccounts, MySqlCustomerAccounts};
use crate::modules::gateways::{build_gateway, PaymentGateway};
use crate::modules::health;
use crate::modules::payments::{
    self, CallbackReceiver, InMemoryPaymentStore, MySqlPaymentStore, PaymentOrchestrator,
    PaymentStore,
};
use crate::modules::register::RegisterService;
use crate::modules::transactions::{
    InMemoryTransactionStore, MySqlTransactionRepository, TransactionStore,
};

/// Persistence behind the payment core
#[derive(Clone)]
pub struct Stores {
    pub payments: Arc<dyn PaymentStore>,
    pub transactions: Arc<dyn TransactionStore>,
    pub customers: Arc<dyn CustomerAccounts>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            payments: Arc::new(InMemoryPaymentStore::new()),
            transactions: Arc::new(InMemoryTransactionStore::new()),
            customers: Arc::new(InMemoryCustomerAccounts::new()),
        }
    }

    pub fn mysql(pool: sqlx::MySqlPool) -> Self {
        Self {
            payments: Arc::new(MySqlPaymentStore::new(pool.clone())),
            transactions: Arc::new(MySqlTransactionRepository::new(pool.clone())),
            customers: Arc::new(MySqlCustomerAccounts::new(pool)),
        }
    }
}

/// Shared services behind the HTTP workers
#[derive(Clone)]
pub struct AppServices {
    pub payments: Arc<dyn PaymentStore>,
    pub transactions: Arc<dyn TransactionStore>,
    pub customers: Arc<dyn CustomerAccounts>,
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub callbacks: web::Data<CallbackReceiver>,
    pub register: Arc<RegisterService>,
    /// Background polling applied to every accepted push
    pub polling: PollingConfig,
}

impl AppServices {
    /// Build from configuration: MySQL stores when a database is configured,
    /// in-memory stores otherwise
    pub async fn from_config(config: &Config) -> Result<Self> {
        let gateway = build_gateway(&config.mpesa)?;

        let stores = match &config.database {
            Some(database) => {
                let pool = database.create_pool().await?;
                DatabaseConfig::migrate(&pool).await?;
                tracing::info!(
                    max_connections = database.max_connections,
                    "Database pool initialized and migrated"
                );
                Stores::mysql(pool)
            }
            None => {
                tracing::warn!("DATABASE_URL not set; payments are kept in memory only");
                Stores::in_memory()
            }
        };

        let services = Self::with_stores(gateway, stores).with_polling(config.polling);

        if let Some(float) = config.app.register_opening_float {
            let session = services.register.open_session(float)?;
            tracing::info!(session_id = %session.id, opening_balance = %float, "Register opened");
        }

        Ok(services)
    }

    /// Wire the payment core around the given gateway and stores
    pub fn with_stores(gateway: Arc<dyn PaymentGateway>, stores: Stores) -> Self {
        let register = Arc::new(RegisterService::new());

        let orchestrator = Arc::new(PaymentOrchestrator::new(
            gateway,
            stores.payments.clone(),
            stores.transactions.clone(),
            register.clone(),
            stores.customers.clone(),
        ));
        let callbacks = web::Data::new(CallbackReceiver::new(orchestrator.clone()));

        Self {
            payments: stores.payments,
            transactions: stores.transactions,
            customers: stores.customers,
            orchestrator,
            callbacks,
            register,
            polling: PollingConfig::default(),
        }
    }

    /// In-memory stores around the given gateway
    pub fn in_memory(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self::with_stores(gateway, Stores::in_memory())
    }

    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }

    /// Register shared state and all routes
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.orchestrator.clone()))
            .app_data(web::Data::new(self.payments.clone()))
            .app_data(web::Data::new(self.customers.clone()))
            .app_data(web::Data::new(self.polling))
            .app_data(self.callbacks.clone())
            .configure(health::configure)
            .configure(payments::configure)
            .configure(customers::configure);
    }
}
