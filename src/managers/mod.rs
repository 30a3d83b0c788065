pub mod app;
pub mod logging;
pub mod record;
pub mod text;
