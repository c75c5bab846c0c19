use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub server: ServerConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub rust_log: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    pub max_csv_bytes: usize,
    pub default_currency: String,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| anyhow::anyhow!("missing required variable {}", key))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = required("DATABASE_URL")?;
        let max_connections: u32 = or_default("DATABASE_MAX_CONNECTIONS", "5").parse()?;
        let jwt_secret = required("JWT_SECRET")?;
        let jwt_audience = lookup("JWT_AUDIENCE").filter(|a| !a.is_empty());
        let port: u16 = or_default("PORT", "8080").parse()?;
        let host = or_default("HOST", "0.0.0.0");
        let rust_log = or_default("RUST_LOG", "info");
        let max_csv_bytes: usize = or_default("IMPORT_MAX_CSV_BYTES", "2097152").parse()?;
        let default_currency = or_default("DEFAULT_CURRENCY", "BRL");

        if jwt_secret.len() < 16 {
            anyhow::bail!("JWT_SECRET must be at least 16 characters");
        }

        Ok(Config {
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            auth: AuthConfig {
                jwt_secret,
                jwt_audience,
            },
            server: ServerConfig { port, host, rust_log },
            import: ImportConfig {
                max_csv_bytes,
                default_currency,
            },
        })
    }
}
