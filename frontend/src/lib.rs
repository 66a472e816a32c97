pub mod app;
pub mod notification_bell;
