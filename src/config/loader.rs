use std::path::Path;

use config::{Config, File, FileFormat};
use eyre::{Context, Result};

use crate::config::models::AppConfig;

/// Load configuration from a file using the config crate, then apply
/// environment overrides. Supports multiple formats: TOML, JSON, YAML.
///
/// A missing file is not fatal: defaults apply and a warning is logged.
pub fn load_config(config_path: &str) -> Result<AppConfig> {
    let mut app_config = if Path::new(config_path).exists() {
        load_file(config_path)?
    } else {
        tracing::warn!("Config file '{config_path}' not found, using defaults");
        AppConfig::default()
    };
    apply_env_overlay(&mut app_config);
    Ok(app_config)
}

/// Parse one config file, format picked by extension
pub fn load_file(config_path: &str) -> Result<AppConfig> {
    let config_path = Path::new(config_path);

    // Determine file format based on extension
    let format = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("toml") => FileFormat::Toml,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Toml,
    };

    let settings = Config::builder()
        .add_source(File::new(
            config_path
                .to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?,
            format,
        ))
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    let app_config: AppConfig = settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize config from {}",
            config_path.display()
        )
    })?;

    Ok(app_config)
}

/// Overlay `PORT` and `RUN_MODE` from the environment.
///
/// Each missing variable logs a warning naming it, so a bare environment
/// is visible in the logs without being fatal.
pub fn apply_env_overlay(config: &mut AppConfig) {
    let port = std::env::var("PORT").ok();
    let run_mode = std::env::var("RUN_MODE").ok();
    overlay_values(config, port.as_deref(), run_mode.as_deref());
}

fn overlay_values(config: &mut AppConfig, port: Option<&str>, run_mode: Option<&str>) {
    match port {
        Some(value) => match value.parse::<u16>() {
            Ok(parsed) => config.server.port = parsed,
            Err(e) => tracing::warn!("Ignoring unparseable PORT value '{value}': {e}"),
        },
        None => tracing::warn!("Environment variable PORT is not set"),
    }
    match run_mode {
        Some(value) => config.server.run_mode = value.to_string(),
        None => tracing::warn!("Environment variable RUN_MODE is not set"),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_load_toml_config() {
        let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8080
run_mode = "production"

[engine]
name = "hyper"

[security.rate_limit]
window = "30s"
max = 50
"#;

        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config = load_file(temp_file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert!(config.server.is_production());
        assert_eq!(config.engine.name.as_deref(), Some("hyper"));
        let rate = config.security.rate_limit.unwrap();
        assert_eq!(rate.window, "30s");
        assert_eq!(rate.max, 50);
    }

    #[test]
    fn test_load_json_config() {
        let json_content = r#"
{
  "server": { "port": 4000 },
  "handlers": { "state_dir": "/tmp/manifold-state" },
  "security": {
    "cors": { "origins": ["http://localhost:3000"] }
  }
}
"#;

        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        write!(temp_file, "{}", json_content).unwrap();

        let config = load_file(temp_file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.handlers.state_dir, "/tmp/manifold-state");
        let cors = config.security.cors.unwrap();
        assert_eq!(cors.origins, vec!["http://localhost:3000".to_string()]);
    }

    #[test]
    fn test_overlay_overrides_port_and_run_mode() {
        let mut config = AppConfig::default();
        overlay_values(&mut config, Some("9090"), Some("production"));
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.run_mode, "production");
    }

    #[test]
    fn test_overlay_ignores_garbage_port() {
        let mut config = AppConfig::default();
        overlay_values(&mut config, Some("not-a-port"), None);
        assert_eq!(config.server.port, 3000);
    }
}
