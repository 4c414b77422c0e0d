pub mod analyze;
pub mod auth;
pub mod dashboard;
pub mod forecast;
pub mod holdings;
pub mod setup;
pub mod ui;
