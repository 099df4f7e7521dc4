//! HTTP front-end of the Kan AI backend.
//!
//! Serves a liveness root, a health check, a weather lookup proxied to
//! OpenWeatherMap and an image classification route backed by
//! [`kan_model::KanModel`].

pub mod config;
pub mod cors;
pub mod response;
pub mod routes;
pub mod weather;

pub use config::Config;
pub use routes::{handle, AppState};
