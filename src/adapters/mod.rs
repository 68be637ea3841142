pub mod csv_adapter;
pub mod file_config_adapter;
pub mod json_adapter;
