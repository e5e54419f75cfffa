//! Application configuration
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;

/// Secret used when none is configured outside production.
const DEV_JWT_SECRET: &str = "citicare-development-secret-change-me";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Which store backs the API
    pub storage: StorageBackend,
    /// Upload directory path
    pub upload_dir: String,
    /// Prefix prepended to stored file URLs (may be empty)
    pub public_base_url: String,
    /// HS256 signing secret for bearer tokens
    pub jwt_secret: String,
    /// Token lifetime in hours
    pub token_ttl_hours: i64,
    /// Maximum size of a single uploaded image in bytes
    pub max_image_size: usize,
    /// Maximum number of images in one request
    pub max_images_per_request: usize,
    /// CORS allowed origins
    pub cors_origins: Vec<String>,
    /// Environment (development/production)
    pub environment: Environment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    Postgres { database_url: String },
    Memory,
}

impl Config {
    /// Load configuration from `.env` and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("ENVIRONMENT")
            .unwrap_or_else(|| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        };

        let storage = match lookup("STORAGE_BACKEND")
            .unwrap_or_else(|| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "postgres" => StorageBackend::Postgres {
                database_url: database_url(&lookup)?,
            },
            other => {
                return Err(ConfigError::Invalid(format!(
                    "STORAGE_BACKEND must be 'postgres' or 'memory', got '{}'",
                    other
                )))
            }
        };

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.trim().is_empty()) {
            Some(secret) => secret,
            None if environment == Environment::Production => {
                return Err(ConfigError::Missing(
                    "JWT_SECRET is required in production".to_string(),
                ))
            }
            None => {
                tracing::warn!("JWT_SECRET not set; using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        Ok(Config {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("PORT", &lookup, 8080)?,
            storage,
            upload_dir: lookup("UPLOAD_DIR").unwrap_or_else(|| "./uploads".to_string()),
            public_base_url: lookup("PUBLIC_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            jwt_secret,
            token_ttl_hours: parse_or("TOKEN_TTL_HOURS", &lookup, 168)?,
            max_image_size: parse_or("MAX_IMAGE_SIZE", &lookup, 10 * 1024 * 1024)?,
            max_images_per_request: parse_or("MAX_IMAGES_PER_REQUEST", &lookup, 10)?,
            cors_origins: lookup("CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| {
                    vec![
                        "http://localhost:8080".to_string(),
                        "http://localhost:5173".to_string(),
                    ]
                }),
            environment,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Get the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Request body ceiling: a full batch of images plus form fields
    pub fn max_body_size(&self) -> usize {
        self.max_image_size
            .saturating_mul(self.max_images_per_request)
            .saturating_add(1024 * 1024)
    }
}

/// DATABASE_URL, or assembled from DATABASE_SERVER_HOST + DATABASE_SERVER_PORT +
/// DATABASE_SERVER_USER + DATABASE_PASSWORD + DATABASE_DB
fn database_url<F>(lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("DATABASE_URL") {
        return Ok(url);
    }

    let parts = (|| {
        let host = lookup("DATABASE_SERVER_HOST")?;
        let port = lookup("DATABASE_SERVER_PORT").unwrap_or_else(|| "5432".to_string());
        let user = lookup("DATABASE_SERVER_USER")?;
        let password = lookup("DATABASE_PASSWORD")?;
        let db = lookup("DATABASE_DB")?;
        Some(format!(
            "postgres://{}:{}@{}:{}/{}",
            user, password, host, port, db
        ))
    })();

    parts.ok_or_else(|| {
        ConfigError::Missing(
            "DATABASE_URL or DATABASE_SERVER_HOST + DATABASE_SERVER_USER + DATABASE_PASSWORD + DATABASE_DB is required".to_string(),
        )
    })
}

fn parse_or<F, T>(key: &str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("{} has an invalid value '{}'", key, raw))),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_memory_backend() {
        let cfg = config(&[("STORAGE_BACKEND", "memory")]).unwrap();
        assert_eq!(cfg.storage, StorageBackend::Memory);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.token_ttl_hours, 168);
        assert_eq!(cfg.max_image_size, 10 * 1024 * 1024);
        assert_eq!(cfg.max_images_per_request, 10);
        assert_eq!(cfg.upload_dir, "./uploads");
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert!(!cfg.is_production());
    }

    #[test]
    fn test_postgres_requires_database_url() {
        assert!(matches!(config(&[]), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_database_url_from_parts() {
        let cfg = config(&[
            ("DATABASE_SERVER_HOST", "db"),
            ("DATABASE_SERVER_USER", "citicare"),
            ("DATABASE_PASSWORD", "pw"),
            ("DATABASE_DB", "grievances"),
        ])
        .unwrap();
        assert_eq!(
            cfg.storage,
            StorageBackend::Postgres {
                database_url: "postgres://citicare:pw@db:5432/grievances".to_string()
            }
        );
    }

    #[test]
    fn test_production_requires_secret() {
        let result = config(&[("STORAGE_BACKEND", "memory"), ("ENVIRONMENT", "production")]);
        assert!(matches!(result, Err(ConfigError::Missing(_))));

        let cfg = config(&[
            ("STORAGE_BACKEND", "memory"),
            ("ENVIRONMENT", "prod"),
            ("JWT_SECRET", "s3cret"),
        ])
        .unwrap();
        assert!(cfg.is_production());
        assert_eq!(cfg.jwt_secret, "s3cret");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            config(&[("STORAGE_BACKEND", "memory"), ("PORT", "eighty")]),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            config(&[("STORAGE_BACKEND", "sqlite")]),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_cors_origins_and_base_url() {
        let cfg = config(&[
            ("STORAGE_BACKEND", "memory"),
            ("CORS_ORIGINS", "https://a.example, ,https://b.example"),
            ("PUBLIC_BASE_URL", "https://cdn.example/"),
        ])
        .unwrap();
        assert_eq!(cfg.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(cfg.public_base_url, "https://cdn.example");
    }
}
