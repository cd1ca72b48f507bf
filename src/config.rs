use std::net::SocketAddr;

/// Application-level constants
pub const APP_NAME: &str = "idscan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Detect endpoint of a locally running OCR service.
pub const DEFAULT_OCR_ENDPOINT: &str = "http://127.0.0.1:8000/detect";

/// Recognition runs two detectors plus OCR; give it time.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5174";

/// Upload limit for chosen files. Matches the capture size guard.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const ENV_OCR_URL: &str = "IDSCAN_OCR_URL";
const ENV_TIMEOUT_SECS: &str = "IDSCAN_TIMEOUT_SECS";
const ENV_BIND: &str = "IDSCAN_BIND";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "idscan_lib=info,idscan=info,tower_http=warn"
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be an http(s) URL, got '{value}'")]
    InvalidUrl { var: &'static str, value: String },

    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be a socket address like 127.0.0.1:5174, got '{value}'")]
    InvalidAddr { var: &'static str, value: String },
}

// ═══════════════════════════════════════════════════════════
// AppConfig
// ═══════════════════════════════════════════════════════════

/// Runtime configuration. Every value has a working default so the binary
/// runs next to a locally started OCR service without any setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Full URL of the OCR detect endpoint (multipart POST).
    pub ocr_endpoint: String,
    /// Timeout for the single OCR request.
    pub request_timeout_secs: u64,
    /// Address the local API binds to.
    pub bind_addr: SocketAddr,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ocr_endpoint: DEFAULT_OCR_ENDPOINT.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5174)),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Unset or blank
    /// variables fall back to defaults; malformed ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get(ENV_OCR_URL) {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl {
                    var: ENV_OCR_URL,
                    value: url,
                });
            }
            config.ocr_endpoint = url;
        }

        if let Some(raw) = get(ENV_TIMEOUT_SECS) {
            config.request_timeout_secs = match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        var: ENV_TIMEOUT_SECS,
                        value: raw,
                    })
                }
            };
        }

        if let Some(raw) = get(ENV_BIND) {
            config.bind_addr = raw.parse().map_err(|_| ConfigError::InvalidAddr {
                var: ENV_BIND,
                value: raw.clone(),
            })?;
        }

        Ok(config)
    }
}
