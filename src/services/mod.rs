pub mod config;
pub mod kintone_client;
pub mod logger;
pub mod tool_executor;
pub mod validation;
