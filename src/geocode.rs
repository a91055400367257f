use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::coords::Coordinate;
use crate::error::AnnotateError;

const NOMINATIM_REVERSE_URL: &str = "https://nominatim.openstreetmap.org/reverse";

/// Place description used by the offline stub.
pub const OFFLINE_PLACE: &str = "unknown place (offline)";

pub type GeocodeFuture = Pin<Box<dyn Future<Output = Result<String, AnnotateError>> + Send>>;

/// Reverse geocoding as a pluggable capability: resolve a decimal coordinate
/// to a human-readable place description.
pub trait Geocoder: Send + Sync {
    fn reverse(&self, coord: Coordinate) -> GeocodeFuture;
}

#[derive(Clone)]
pub enum GeocoderImpl {
    Nominatim(Nominatim),
    Offline(Offline),
}

impl Geocoder for GeocoderImpl {
    fn reverse(&self, coord: Coordinate) -> GeocodeFuture {
        match self {
            GeocoderImpl::Nominatim(geocoder) => geocoder.reverse(coord),
            GeocoderImpl::Offline(geocoder) => geocoder.reverse(coord),
        }
    }
}

/// Live reverse geocoding against the public Nominatim service. The client
/// carries a caller-identifying user agent and a bounded timeout, per the
/// service's usage policy.
#[derive(Clone)]
pub struct Nominatim {
    client: reqwest::Client,
}

impl Nominatim {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Nominatim> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(timeout)
            .build()
            .context("failed to build geocoding HTTP client")?;
        Ok(Nominatim { client })
    }
}

impl Geocoder for Nominatim {
    fn reverse(&self, coord: Coordinate) -> GeocodeFuture {
        let client = self.client.clone();
        Box::pin(async move {
            let response = client
                .get(NOMINATIM_REVERSE_URL)
                .query(&[
                    ("lat", coord.lat.to_string()),
                    ("lon", coord.lon.to_string()),
                    ("format", "jsonv2".to_string()),
                ])
                .send()
                .await
                .map_err(|err| AnnotateError::GeocodingUnavailable(err.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(AnnotateError::GeocodingUnavailable(format!(
                    "service returned {status}"
                )));
            }
            let json = response
                .json::<Value>()
                .await
                .map_err(|err| AnnotateError::GeocodingUnavailable(err.to_string()))?;
            debug!("nominatim response: {}", json);
            place_from_response(&json)
        })
    }
}

/// Deterministic stand-in for environments without network access.
#[derive(Clone, Copy)]
pub struct Offline;

impl Geocoder for Offline {
    fn reverse(&self, _coord: Coordinate) -> GeocodeFuture {
        Box::pin(async { Ok(OFFLINE_PLACE.to_string()) })
    }
}

fn place_from_response(json: &Value) -> Result<String, AnnotateError> {
    // Nominatim reports unresolvable coordinates as 200 + {"error": ...}.
    if json.get("error").is_some() {
        return Err(AnnotateError::GeocodingNotFound);
    }
    match json.get("display_name").and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => Ok(name.to_string()),
        _ => Err(AnnotateError::GeocodingNotFound),
    }
}
