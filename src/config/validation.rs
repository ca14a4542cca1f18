use crate::{config::models::AppConfig, core::middleware::rate_limit, ports::engine::EngineId};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Unknown engine '{name}'")]
    UnknownEngine { name: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Application configuration validator
pub struct AppConfigValidator;

impl AppConfigValidator {
    /// Validate the entire configuration, collecting every problem rather
    /// than stopping at the first
    pub fn validate(config: &AppConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Some(name) = &config.engine.name
            && name.parse::<EngineId>().is_err()
        {
            errors.push(ValidationError::UnknownEngine { name: name.clone() });
        }

        if config.server.workers == 0 {
            errors.push(ValidationError::InvalidField {
                field: "server.workers".to_string(),
                message: "Worker count must be greater than 0".to_string(),
            });
        }

        if config.handlers.state_dir.trim().is_empty() {
            errors.push(ValidationError::InvalidField {
                field: "handlers.state_dir".to_string(),
                message: "State directory must not be empty".to_string(),
            });
        }

        if let Some(rate) = &config.security.rate_limit
            && let Err(message) = rate_limit::build_limiter(rate)
        {
            errors.push(ValidationError::InvalidField {
                field: "security.rate_limit".to_string(),
                message,
            });
        }

        if let Some(cors) = &config.security.cors
            && cors.origins.is_empty()
        {
            errors.push(ValidationError::InvalidField {
                field: "security.cors.origins".to_string(),
                message: "At least one origin is required".to_string(),
            });
        }

        if let Some(static_files) = &config.static_files {
            if !static_files.url_prefix.starts_with('/') {
                errors.push(ValidationError::InvalidField {
                    field: "static_files.url_prefix".to_string(),
                    message: "URL prefix must start with '/'".to_string(),
                });
            }
            if static_files.root.trim().is_empty() {
                errors.push(ValidationError::InvalidField {
                    field: "static_files.root".to_string(),
                    message: "Static root must not be empty".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Format multiple validation errors into a single message
    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        if errors.is_empty() {
            return "No errors".to_string();
        }

        if errors.len() == 1 {
            return errors[0].to_string();
        }

        let mut message = format!("Found {} validation errors:\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::{
        EngineSection, RateLimitConfig, SecuritySection, StaticFilesConfig,
    };

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfigValidator::validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_known_engine_names_pass() {
        for name in ["axum", "actix-web", "actix", "hyper", "rouille", "tiny-http"] {
            let config = AppConfig {
                engine: EngineSection {
                    name: Some(name.to_string()),
                },
                ..AppConfig::default()
            };
            assert!(AppConfigValidator::validate(&config).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_unknown_engine_is_rejected() {
        let config = AppConfig {
            engine: EngineSection {
                name: Some("express".to_string()),
            },
            ..AppConfig::default()
        };
        let err = AppConfigValidator::validate(&config).unwrap_err();
        assert!(err.to_string().contains("Unknown engine 'express'"));
    }

    #[test]
    fn test_bad_rate_limit_window_is_rejected() {
        let config = AppConfig {
            security: SecuritySection {
                rate_limit: Some(RateLimitConfig {
                    window: "forever".to_string(),
                    max: 100,
                }),
                ..SecuritySection::default()
            },
            ..AppConfig::default()
        };
        let err = AppConfigValidator::validate(&config).unwrap_err();
        assert!(err.to_string().contains("security.rate_limit"));
    }

    #[test]
    fn test_multiple_errors_are_collected() {
        let mut config = AppConfig {
            engine: EngineSection {
                name: Some("express".to_string()),
            },
            static_files: Some(StaticFilesConfig {
                url_prefix: "assets".to_string(),
                ..StaticFilesConfig::default()
            }),
            ..AppConfig::default()
        };
        config.handlers.state_dir = "  ".to_string();

        let err = AppConfigValidator::validate(&config).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Found 3 validation errors"), "{message}");
        assert!(message.contains("Unknown engine"));
        assert!(message.contains("state_dir"));
        assert!(message.contains("url_prefix"));
    }
}
