pub mod api;
pub mod config;
pub mod database;
pub mod email;
pub mod error;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod payments;
pub mod services;
