pub mod daraja_wire;
pub mod gateway_config;

pub use gateway_config::GatewayEnvironment;
