pub mod daraja;
pub mod gateway_trait;
pub mod result_codes;
pub mod simulated;
pub mod token_cache;

pub use daraja::DarajaClient;
pub use gateway_trait::{AccessToken, PaymentGateway, PushAcknowledgement, PushRequest};
pub use result_codes::{status_for_code, status_message, STILL_PROCESSING_ERROR_CODE};
pub use simulated::SimulatedGateway;
pub use token_cache::TokenCache;

use crate::config::MpesaConfig;
use crate::core::Result;
use std::sync::Arc;

/// Select the live client or the simulated responder from configuration
pub fn build_gateway(config: &MpesaConfig) -> Result<Arc<dyn PaymentGateway>> {
    if config.simulate {
        tracing::warn!("MPESA_SIMULATE is enabled; no real payments will be requested");
        return Ok(Arc::new(SimulatedGateway::new()));
    }

    tracing::info!(
        environment = %config.environment,
        base_url = %config.base_url,
        "Using Daraja gateway"
    );
    Ok(Arc::new(DarajaClient::new(config)?))
}
