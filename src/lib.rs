pub mod api;
pub mod batch;
pub mod config;
pub mod config_wizard;
pub mod extract;
pub mod models;
pub mod poll;
pub mod query;
pub mod retry;
pub mod runner;
pub mod sink;
pub mod utils;
