// ⚙️ Configuration - environment driven
// Deposit service and geocoding credentials plus local runtime knobs

use crate::error::{DepotError, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
pub const DEFAULT_CREDIT_PRODUCT_ID: &str = "4";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct Config {
    /// Deposit service endpoint (single URL, `call` selects the operation)
    pub api_url: String,

    /// Pre-shared deposit service key, sent as `key`
    pub api_key: String,

    /// Account key used by `loginUserFromAccountKey`
    pub account_key: String,

    /// Geocoding service key
    pub google_api_key: String,

    pub geocode_url: String,

    /// Product whose remaining credits are shown on the page
    pub credit_product_id: String,

    /// Where uploaded photos and collages are written before upload
    pub staging_dir: PathBuf,

    pub http_timeout: Duration,

    pub bind_addr: String,

    /// Request body limit for the upload form, in bytes
    pub max_upload_bytes: usize,

    pub log_json: bool,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Load configuration from an explicit variable map
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let required = |name: &str| -> Result<String> {
            match vars.get(name).map(|v| v.trim()) {
                Some(v) if !v.is_empty() => Ok(v.to_string()),
                _ => Err(DepotError::Config(format!("{} is not set", name))),
            }
        };
        let optional = |name: &str, default: &str| -> String {
            vars.get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        let number = |name: &str, default: u64| -> Result<u64> {
            match vars.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
                Some(v) => v
                    .parse::<u64>()
                    .map_err(|_| DepotError::Config(format!("{} must be a positive integer, got {:?}", name, v))),
                None => Ok(default),
            }
        };

        let megabytes = |mb: u64| -> Result<usize> {
            usize::try_from(mb)
                .ok()
                .and_then(|mb| mb.checked_mul(1024 * 1024))
                .ok_or_else(|| DepotError::Config(format!("MAX_UPLOAD_MB is too large: {}", mb)))
        };

        let log_json = matches!(
            optional("LOG_JSON", "false").as_str(),
            "1" | "true" | "TRUE" | "yes" | "YES"
        );

        Ok(Config {
            api_url: required("API_URL")?,
            api_key: required("API_KEY")?,
            account_key: required("ACCOUNT_KEY")?,
            google_api_key: required("GOOGLE_API_KEY")?,
            geocode_url: optional("GEOCODE_URL", DEFAULT_GEOCODE_URL),
            credit_product_id: optional("CREDIT_PRODUCT_ID", DEFAULT_CREDIT_PRODUCT_ID),
            staging_dir: PathBuf::from(optional("STAGING_DIR", ".")),
            http_timeout: Duration::from_secs(number("HTTP_TIMEOUT_SECS", 60)?),
            bind_addr: optional("BIND_ADDR", DEFAULT_BIND_ADDR),
            max_upload_bytes: megabytes(number("MAX_UPLOAD_MB", 200)?)?,
            log_json,
        })
    }

    /// Shared HTTP client for both external services
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .build()
            .map_err(|e| DepotError::Config(format!("cannot build HTTP client: {}", e)))
    }
}
