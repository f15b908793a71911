// 📍 Geocoding Client - address → latitude/longitude
// One GET against the mapping service, first result wins

use crate::error::{DepotError, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const SERVICE: &str = "geocode";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Latitude as the decimal string shown in the form
    pub fn latitude_text(&self) -> String {
        self.lat.to_string()
    }

    /// Longitude as the decimal string shown in the form
    pub fn longitude_text(&self) -> String {
        self.lng.to_string()
    }
}

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Coordinates,
}

/// Pull the first result out of a geocode response body
fn first_location(body: GeocodeResponse) -> Result<Coordinates> {
    if body.status != "OK" {
        return Err(DepotError::Business(format!(
            "geocoding returned status {}",
            body.status
        )));
    }

    body.results
        .into_iter()
        .next()
        .map(|r| r.geometry.location)
        .ok_or_else(|| DepotError::parse(SERVICE, "status OK but no results"))
}

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Debug, Clone)]
pub struct GeocodeClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeocodeClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        GeocodeClient {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Resolve a free-text address to the first matching coordinates
    pub async fn geocode(&self, address: &str) -> Result<Coordinates> {
        info!(address, "geocoding address");

        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| DepotError::network(SERVICE, e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!(status = status.as_u16(), "geocoding service refused request");
            return Err(DepotError::Status {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| DepotError::parse(SERVICE, e.to_string()))?;

        let location = first_location(body)?;
        info!(lat = location.lat, lng = location.lng, "address resolved");
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GeocodeResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_first_result_is_used() {
        let body = parse(
            r#"{"status":"OK","results":[
                {"geometry":{"location":{"lat":48.8566,"lng":2.3522}}},
                {"geometry":{"location":{"lat":1.0,"lng":1.0}}}
            ]}"#,
        );
        let location = first_location(body).unwrap();
        assert_eq!(location, Coordinates { lat: 48.8566, lng: 2.3522 });
        assert_eq!(location.latitude_text(), "48.8566");
        assert_eq!(location.longitude_text(), "2.3522");
    }

    #[test]
    fn test_zero_results_is_business_error() {
        let body = parse(r#"{"status":"ZERO_RESULTS","results":[]}"#);
        let err = first_location(body).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Business);
    }

    #[test]
    fn test_ok_without_results_is_parse_error() {
        let body = parse(r#"{"status":"OK"}"#);
        let err = first_location(body).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Parse);
    }
}
