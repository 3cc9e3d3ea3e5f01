pub mod app;
pub mod cancel;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod observer;
pub mod output;
pub mod persist;
pub mod state;
pub mod store;
