//! Configuration data structures for manifold.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files.
//! They are serde-friendly with defaults throughout, so a minimal or absent
//! config file still yields a runnable server.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listen address and process-level settings
    pub server: ServerSection,
    /// Engine preference
    pub engine: EngineSection,
    /// Route-tree handler settings
    pub handlers: HandlersSection,
    /// Log level and format
    pub logging: LoggingSection,
    /// Request id / arrival logging
    pub request_log: RequestLogSection,
    /// Cookie pre-parsing
    pub cookies: CookiesSection,
    /// CORS, hardening headers and rate limiting
    pub security: SecuritySection,
    /// Static file serving, absent by default
    pub static_files: Option<StaticFilesConfig>,
    /// Request body guard, absent by default
    pub body: Option<BodySection>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSection {
    /// Address to bind
    pub host: String,
    /// Port to bind; the `PORT` env var overrides this
    pub port: u16,
    /// Run mode, "development" or "production"; `RUN_MODE` overrides
    pub run_mode: String,
    /// Worker thread count for thread-pool engines
    pub workers: usize,
}

impl ServerSection {
    pub fn is_production(&self) -> bool {
        self.run_mode == "production"
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            run_mode: "development".to_string(),
            workers: 4,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EngineSection {
    /// Engine to run on; unset picks the best compiled-in engine
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HandlersSection {
    /// Directory for per-node state such as error journals
    pub state_dir: String,
}

impl Default for HandlersSection {
    fn default() -> Self {
        Self {
            state_dir: "state".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level filter, e.g. "info" or a full tracing directive
    pub level: String,
    /// Force JSON (true) or console (false) output; unset follows run mode
    pub json: Option<bool>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RequestLogSection {
    pub enabled: bool,
}

impl Default for RequestLogSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CookiesSection {
    pub enabled: bool,
}

impl Default for CookiesSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SecuritySection {
    pub cors: Option<CorsConfig>,
    pub secure_headers: Option<SecureHeadersConfig>,
    pub rate_limit: Option<RateLimitConfig>,
}

/// CORS allow lists
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins; `"*"` allows any
    pub origins: Vec<String>,
    pub methods: Vec<String>,
    pub headers: Vec<String>,
}

impl CorsConfig {
    /// Origin value to allow for a request, if any.
    ///
    /// A wildcard entry wins outright; otherwise a listed origin is echoed
    /// back and anything else gets no allow header.
    pub fn allow_origin_for(&self, origin: Option<&str>) -> Option<String> {
        if self.origins.iter().any(|o| o == "*") {
            return Some("*".to_string());
        }
        origin
            .filter(|o| self.origins.iter().any(|allowed| allowed == o))
            .map(str::to_string)
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: vec!["*".to_string()],
            methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS", "HEAD"]
                .map(String::from)
                .to_vec(),
            headers: ["Content-Type", "Authorization"].map(String::from).to_vec(),
        }
    }
}

/// Security hardening headers
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SecureHeadersConfig {
    /// Content-Security-Policy directives; absent means no CSP header
    pub csp: Option<CspConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CspConfig {
    /// Directive name to source list, e.g. `"default-src" = ["'self'"]`
    pub directives: HashMap<String, Vec<String>>,
}

/// Global rate limit quota
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Window as a humantime string, e.g. "15m"
    pub window: String,
    /// Requests allowed per window
    pub max: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: "15m".to_string(),
            max: 100,
        }
    }
}

/// Configuration for static file serving
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Root directory for static files
    pub root: String,
    /// URL prefix for static files (e.g., "/assets")
    pub url_prefix: String,
    /// File served for the prefix root
    pub index_file: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: "./public".to_string(),
            url_prefix: "/".to_string(),
            index_file: "index.html".to_string(),
        }
    }
}

/// Request body guard
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BodySection {
    /// Largest accepted request body in bytes
    pub limit_bytes: usize,
}

impl Default for BodySection {
    fn default() -> Self {
        Self {
            limit_bytes: 1024 * 1024,
        }
    }
}
