use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use structopt::StructOpt;

use crate::cors::DEFAULT_ORIGINS;

#[derive(StructOpt, Debug, Clone)]
#[structopt(
    name = "kan-backend",
    about = "Kan AI backend: image classification and weather lookups over HTTP"
)]
pub struct Config {
    #[structopt(long, env = "KAN_HOST", default_value = "0.0.0.0", help = "Address to listen on")]
    pub host: IpAddr,

    #[structopt(long, env = "KAN_PORT", default_value = "8000", help = "Port to listen on")]
    pub port: u16,

    #[structopt(
        long = "model",
        env = "KAN_MODEL_PATH",
        parse(from_os_str),
        help = "Saved model to load; a fresh network is built when absent"
    )]
    pub model_path: Option<PathBuf>,

    #[structopt(
        long,
        env = "KAN_WEATHER_URL",
        default_value = "http://api.openweathermap.org/data/2.5/weather",
        help = "Current-weather endpoint of the weather provider"
    )]
    pub weather_url: String,

    #[structopt(
        long,
        env = "KAN_WEATHER_API_KEY",
        default_value = "YOUR_ACTUAL_API_KEY",
        hide_env_values = true,
        help = "API key sent to the weather provider"
    )]
    pub weather_api_key: String,

    #[structopt(
        long = "weather-timeout",
        env = "KAN_WEATHER_TIMEOUT",
        default_value = "10",
        help = "Weather request timeout in seconds"
    )]
    pub weather_timeout_secs: u64,

    #[structopt(
        long,
        env = "KAN_MAX_UPLOAD_BYTES",
        default_value = "10485760",
        help = "Largest accepted /kan-predict request body, in bytes"
    )]
    pub max_upload_bytes: usize,

    #[structopt(
        long = "allow-origin",
        number_of_values = 1,
        help = "Origin allowed to make CORS requests (repeatable)"
    )]
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn weather_timeout(&self) -> Duration {
        Duration::from_secs(self.weather_timeout_secs)
    }

    /// Configured origins, or the frontend defaults when none were given.
    pub fn origins(&self) -> Vec<String> {
        if self.allowed_origins.is_empty() {
            DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect()
        } else {
            self.allowed_origins.clone()
        }
    }
}
