use std::time::Duration;

use log::{debug, warn};
use serde_json::{json, Value};

/// Client for the provider's current-weather endpoint.
///
/// One request per lookup, bounded by the client timeout. The upstream body
/// is relayed as-is, error statuses included.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl WeatherClient {
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(WeatherClient {
            client,
            url: url.to_owned(),
            api_key: api_key.to_owned(),
        })
    }

    pub async fn current(&self, city: &str) -> reqwest::Result<Value> {
        debug!("Fetching weather for '{}' from {}", city, self.url);

        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        debug!("Weather provider answered {}", response.status());
        response.json::<Value>().await
    }

    /// Like [`current`](Self::current), with any failure folded into an
    /// `{"error": <message>}` object.
    pub async fn lookup(&self, city: &str) -> Value {
        match self.current(city).await {
            Ok(body) => body,
            Err(err) => {
                warn!("Weather lookup for '{}' failed: {}", city, err);
                json!({ "error": err.to_string() })
            }
        }
    }
}
