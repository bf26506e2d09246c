use actix_web::http::header::HeaderName;

use crate::auth::{JwtKeys, PasswordHasher, DEFAULT_HASH_COST};
use crate::error::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Authentication settings
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    /// HS256 signing secret, normally supplied through `SECRET_KEY`
    #[serde(default)]
    pub secret: String,
    /// Request header carrying the access token
    #[serde(default = "default_token_header")]
    pub token_header: String,
    /// bcrypt work factor
    #[serde(default = "default_password_hash_cost")]
    pub password_hash_cost: u32,
}

fn default_token_header() -> String {
    "token".to_string()
}

fn default_password_hash_cost() -> u32 {
    DEFAULT_HASH_COST
}

/// Load settings from `configuration.yaml` (optional), `APP__*` variables,
/// then `SECRET_KEY`.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .set_override_option("auth.secret", std::env::var("SECRET_KEY").ok())?
        .build()?;
    settings.try_deserialize::<Settings>()
}

/// Immutable authentication configuration, built once at startup and shared
/// read-only by the issuer, the validator and the request guard.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    keys: JwtKeys,
    hasher: PasswordHasher,
    token_header: HeaderName,
}

impl AuthConfig {
    /// # Errors
    /// `MissingRequired` for an empty secret, `InvalidValue` for a header
    /// name that is not a valid HTTP header.
    pub fn new(secret: &str, token_header: &str, hash_cost: u32) -> Result<Self, ConfigError> {
        let keys = JwtKeys::new(secret)?;
        let token_header = HeaderName::from_bytes(token_header.trim().as_bytes()).map_err(|_| {
            ConfigError::InvalidValue(format!("auth.token_header {:?}", token_header))
        })?;

        Ok(Self {
            keys,
            hasher: PasswordHasher::new(hash_cost),
            token_header,
        })
    }

    pub fn from_settings(settings: &AuthSettings) -> Result<Self, ConfigError> {
        Self::new(
            &settings.secret,
            &settings.token_header,
            settings.password_hash_cost,
        )
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    pub fn token_header(&self) -> &HeaderName {
        &self.token_header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_settings(secret: &str) -> AuthSettings {
        AuthSettings {
            secret: secret.to_string(),
            token_header: default_token_header(),
            password_hash_cost: default_password_hash_cost(),
        }
    }

    #[test]
    fn test_missing_secret_refuses_to_build() {
        let result = AuthConfig::from_settings(&auth_settings(""));
        assert!(matches!(result, Err(ConfigError::MissingRequired(_))));
    }

    #[test]
    fn test_defaults() {
        let config = AuthConfig::from_settings(&auth_settings("s3cr3t")).unwrap();
        assert_eq!(config.token_header().as_str(), "token");
        assert_eq!(config.hasher().cost(), DEFAULT_HASH_COST);
    }

    #[test]
    fn test_invalid_header_name() {
        let result = AuthConfig::new("s3cr3t", "bad header", 10);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_auth_settings_deserialize_with_defaults() {
        let settings: AuthSettings = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(settings.secret.is_empty());
        assert_eq!(settings.token_header, "token");
        assert_eq!(settings.password_hash_cost, DEFAULT_HASH_COST);
    }
}
