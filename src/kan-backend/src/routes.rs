use std::convert::Infallible;
use std::sync::Arc;

use hyper::header::{CONTENT_TYPE, ORIGIN};
use hyper::body::HttpBody;
use hyper::{Body, Method, Request, Response, StatusCode};
use kan_model::{Error as ModelError, KanModel};
use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::cors::Cors;
use crate::response;
use crate::weather::WeatherClient;

/// Shared, read-only state of every request.
pub struct AppState {
    pub model: Arc<KanModel>,
    pub weather: WeatherClient,
    pub cors: Cors,
    /// Largest accepted upload on `/kan-predict`
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(model: KanModel, config: &Config) -> reqwest::Result<Self> {
        let weather = WeatherClient::new(
            &config.weather_url,
            &config.weather_api_key,
            config.weather_timeout(),
        )?;

        Ok(AppState {
            model: Arc::new(model),
            weather,
            cors: Cors::new(config.origins()),
            max_upload_bytes: config.max_upload_bytes,
        })
    }
}

#[derive(Debug, PartialEq)]
enum Route {
    Root,
    Health,
    Weather(String),
    Predict,
}

impl Route {
    fn parse(path: &str) -> Option<Route> {
        match path {
            "/" => Some(Route::Root),
            "/kan-health" => Some(Route::Health),
            "/kan-predict" => Some(Route::Predict),
            _ => {
                let city = path.strip_prefix("/kan-weather/")?;
                if city.is_empty() || city.contains('/') {
                    return None;
                }
                let city = urlencoding::decode(city).ok()?;
                Some(Route::Weather(city.into_owned()))
            }
        }
    }
}

#[derive(Deserialize)]
struct PredictRequest {
    /// Base64 image, optionally as a `data:` URL
    image: String,
}

pub async fn handle(
    req: Request<Body>,
    state: Arc<AppState>,
) -> Result<Response<Body>, Infallible> {
    debug!("{} {}", req.method(), req.uri());

    if Cors::is_preflight(&req) {
        return Ok(state.cors.preflight(&req));
    }

    let origin = req.headers().get(ORIGIN).cloned();
    let mut response = route(req, &state).await;
    state.cors.decorate(origin.as_ref(), &mut response);

    Ok(response)
}

async fn route(req: Request<Body>, state: &AppState) -> Response<Body> {
    let route = match Route::parse(req.uri().path()) {
        Some(route) => route,
        None => return response::detail(StatusCode::NOT_FOUND),
    };
    let method = req.method().clone();

    match (method, route) {
        (Method::GET, Route::Root) => response::json(
            StatusCode::OK,
            &json!({ "message": "Kan AI Backend is running!" }),
        ),
        (Method::GET, Route::Health) => {
            response::json(StatusCode::OK, &json!({ "status": "healthy" }))
        }
        (Method::GET, Route::Weather(city)) => {
            response::json(StatusCode::OK, &state.weather.lookup(&city).await)
        }
        (Method::POST, Route::Predict) => predict(req, state).await,
        _ => response::detail(StatusCode::METHOD_NOT_ALLOWED),
    }
}

async fn predict(req: Request<Body>, state: &AppState) -> Response<Body> {
    let is_json = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.starts_with("application/json"));

    let raw = match read_upload(req.into_body(), state.max_upload_bytes).await {
        Ok(raw) => raw,
        Err(response) => return response,
    };

    let image = if is_json {
        match decode_json_image(&raw) {
            Ok(image) => image,
            Err(msg) => return response::error(StatusCode::BAD_REQUEST, msg),
        }
    } else {
        raw
    };

    if image.is_empty() {
        return response::error(StatusCode::BAD_REQUEST, "Empty image upload");
    }

    let model = Arc::clone(&state.model);
    match tokio::task::spawn_blocking(move || model.predict(&image)).await {
        Ok(Ok(prediction)) => {
            info!(
                "Predicted class {} ({:.3})",
                prediction.class_index, prediction.confidence
            );
            response::json(StatusCode::OK, &prediction)
        }
        Ok(Err(err)) => {
            let status = match err {
                ModelError::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
                ModelError::ImageDecode(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            warn!("Classification failure: {}", err);
            response::error(status, err)
        }
        Err(err) => {
            error!("Classification task failed: {}", err);
            response::error(StatusCode::INTERNAL_SERVER_ERROR, err)
        }
    }
}

/// Collects the request body, giving up as soon as it grows past `limit`.
async fn read_upload(mut body: Body, limit: usize) -> Result<Vec<u8>, Response<Body>> {
    let too_large = || {
        warn!("Upload exceeds {} bytes", limit);
        response::error(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("Upload exceeds {} bytes", limit),
        )
    };

    if body.size_hint().lower() > limit as u64 {
        return Err(too_large());
    }

    let mut raw = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk.map_err(|err| {
            warn!("Could not read upload: {}", err);
            response::error(StatusCode::BAD_REQUEST, err)
        })?;

        if raw.len() + chunk.len() > limit {
            return Err(too_large());
        }
        raw.extend_from_slice(&chunk);
    }

    Ok(raw)
}

fn decode_json_image(raw: &[u8]) -> Result<Vec<u8>, String> {
    let request: PredictRequest =
        serde_json::from_slice(raw).map_err(|e| format!("Invalid JSON body: {}", e))?;

    let encoded = match request.image.split_once(',') {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => request.image.as_str(),
    };

    base64::decode(encoded.trim()).map_err(|e| format!("Invalid base64 image: {}", e))
}
