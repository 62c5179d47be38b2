use std::env;
use std::str::FromStr;

use crate::error::AppError;
use crate::services::SecretStrategy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret_key: String,
    pub expiration_hours: i64,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    pub secret_strategy: SecretStrategy,
    /// Company codes allowed through the company-gated routes.
    pub company_allowlist: Vec<i64>,
}

const DEV_SECRET_KEY: &str = "dev-secret-change-in-production";

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::Config(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = AppConfig {
            environment,
            service_name: get_env("SERVICE_NAME", Some("intranet-auth"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            port: parse(get_env("PORT", Some("8080"), is_prod)?, "PORT")?,
            jwt: JwtConfig {
                secret_key: get_env("SECRET_KEY", Some(DEV_SECRET_KEY), is_prod)?,
                expiration_hours: parse(
                    get_env("JWT_EXPIRATION_HOURS", Some("24"), is_prod)?,
                    "JWT_EXPIRATION_HOURS",
                )?,
            },
            database: DatabaseConfig {
                url: get_env(
                    "DATABASE_URL",
                    Some("postgres://localhost:5432/intranet"),
                    is_prod,
                )?,
                max_connections: parse(
                    get_env("DATABASE_MAX_CONNECTIONS", Some("5"), is_prod)?,
                    "DATABASE_MAX_CONNECTIONS",
                )?,
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                secret_strategy: get_env("SECRET_STRATEGY", Some("plain"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::Config(anyhow::anyhow!(e)))?,
                company_allowlist: get_env("COMPANY_ALLOWLIST", Some("1,2,3"), is_prod)?
                    .split(',')
                    .map(|s| parse(s.trim().to_string(), "COMPANY_ALLOWLIST"))
                    .collect::<Result<Vec<i64>, _>>()?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.port == 0 {
            return Err(AppError::Config(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.jwt.expiration_hours <= 0 {
            return Err(AppError::Config(anyhow::anyhow!(
                "JWT_EXPIRATION_HOURS must be positive"
            )));
        }

        if self.environment == Environment::Prod {
            if self.jwt.secret_key == DEV_SECRET_KEY {
                return Err(AppError::Config(anyhow::anyhow!(
                    "SECRET_KEY must be set to a real key in production"
                )));
            }

            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::Config(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::Config(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::Config(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse<T>(value: String, key: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| AppError::Config(anyhow::anyhow!("{}: {}", key, e)))
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
