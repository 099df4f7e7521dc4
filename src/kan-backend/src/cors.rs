use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE,
    ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN, VARY,
};
use hyper::{Body, Method, Request, Response, StatusCode};
use log::debug;

use crate::response;

/// Frontends allowed to call the backend when nothing else is configured.
pub const DEFAULT_ORIGINS: &[&str] = &["http://localhost:3000", "https://flora-guard.vercel.app"];

const ALLOW_METHODS: &str = "DELETE, GET, HEAD, OPTIONS, PATCH, POST, PUT";
const MAX_AGE: &str = "600";

/// Origin allow-list with credentials enabled and any method or header
/// permitted.
#[derive(Debug, Clone)]
pub struct Cors {
    allowed_origins: Vec<String>,
}

impl Cors {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Cors {
            allowed_origins: origins.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == "*" || o == origin)
    }

    pub fn is_preflight(req: &Request<Body>) -> bool {
        req.method() == Method::OPTIONS
            && req.headers().contains_key(ORIGIN)
            && req.headers().contains_key(ACCESS_CONTROL_REQUEST_METHOD)
    }

    pub fn preflight(&self, req: &Request<Body>) -> Response<Body> {
        let origin = match req.headers().get(ORIGIN) {
            Some(origin) if self.origin_allowed(origin) => origin.clone(),
            origin => {
                debug!("Rejected CORS preflight from {:?}", origin);
                let mut response = response::text(StatusCode::BAD_REQUEST, "Disallowed CORS origin");
                response
                    .headers_mut()
                    .insert(VARY, HeaderValue::from_static("Origin"));
                return response;
            }
        };

        let mut response = response::text(StatusCode::OK, "OK");
        let headers = response.headers_mut();
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        if let Some(requested) = req.headers().get(ACCESS_CONTROL_REQUEST_HEADERS) {
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
        }
        headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE));
        headers.insert(VARY, HeaderValue::from_static("Origin"));

        response
    }

    /// Adds the CORS headers to a regular response when the request origin
    /// is allowed.
    pub fn decorate(&self, origin: Option<&HeaderValue>, response: &mut Response<Body>) {
        let origin = match origin {
            Some(origin) if self.origin_allowed(origin) => origin.clone(),
            _ => return,
        };

        let headers = response.headers_mut();
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.append(VARY, HeaderValue::from_static("Origin"));
    }

    fn origin_allowed(&self, origin: &HeaderValue) -> bool {
        origin.to_str().map_or(false, |o| self.is_allowed(o))
    }
}
