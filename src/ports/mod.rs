pub mod config_port;
pub mod price_port;
