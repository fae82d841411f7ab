//! Heart disease risk prediction over HTTP.
//!
//! A fitted scaler and classifier are loaded once at startup
//! ([`artifacts`]) and applied to single form submissions or uploaded CSV
//! batches ([`inference`]). Manual submissions are also written to a remote
//! document collection ([`store`]) and can be listed back.

pub mod artifacts;
pub mod batch;
pub mod config;
pub mod error;
pub mod handlers;
pub mod inference;
pub mod records;
pub mod store;
pub mod views;
