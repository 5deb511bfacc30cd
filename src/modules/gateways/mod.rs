pub mod models;
pub mod services;

pub use models::GatewayEnvironment;
pub use services::{
    build_gateway, AccessToken, DarajaClient, PaymentGateway, PushAcknowledgement, PushRequest,
    SimulatedGateway,
};
