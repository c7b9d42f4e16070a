// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults and the typed configuration values
//! built from them. Configuration is read once at startup; nothing on the
//! request path looks at the environment. Any error here is fatal and the
//! binaries exit non-zero before accepting traffic.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `JWT_SECRET` | Shared HS256 signing secret | Required |
//! | `TOKEN_TTL_SECS` | Session token lifetime | `86400` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` gateway, `8081` auth |
//! | `GATEWAY_ROUTES` | `prefix=url;public\|protected`, comma separated | see below |
//! | `AUTH_SERVICE_URL` | Backend for `/auth` (public) | Required without `GATEWAY_ROUTES` |
//! | `TODO_SERVICE_URL` | Backend for `/todo` (protected) | Required without `GATEWAY_ROUTES` |
//! | `NOTIFICATION_SERVICE_URL` | Backend for `/notify` (protected) | Optional |
//! | `UPSTREAM_CONNECT_TIMEOUT_SECS` | Backend connect timeout | `5` |
//! | `UPSTREAM_TIMEOUT_SECS` | Wait for backend response head | `30` |
//! | `GATEWAY_MAX_BODY_BYTES` | Request body limit | `2097152` |
//! | `CREDENTIALS_DB` | redb file for credentials | in-memory |
//! | `STORE_TIMEOUT_SECS` | Credential store call timeout | `5` |
//! | `PASSWORD_HASH_MEMORY_KIB` | Argon2id memory cost | `19456` |
//! | `PASSWORD_HASH_ITERATIONS` | Argon2id iterations | `2` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt::{self, Display};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::auth::password::{DEFAULT_ITERATIONS, DEFAULT_MEMORY_KIB};
use crate::gateway::routes::RouteRule;

pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const TOKEN_TTL_ENV: &str = "TOKEN_TTL_SECS";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const GATEWAY_ROUTES_ENV: &str = "GATEWAY_ROUTES";
pub const AUTH_SERVICE_URL_ENV: &str = "AUTH_SERVICE_URL";
pub const TODO_SERVICE_URL_ENV: &str = "TODO_SERVICE_URL";
pub const NOTIFICATION_SERVICE_URL_ENV: &str = "NOTIFICATION_SERVICE_URL";
pub const UPSTREAM_CONNECT_TIMEOUT_ENV: &str = "UPSTREAM_CONNECT_TIMEOUT_SECS";
pub const UPSTREAM_TIMEOUT_ENV: &str = "UPSTREAM_TIMEOUT_SECS";
pub const MAX_BODY_BYTES_ENV: &str = "GATEWAY_MAX_BODY_BYTES";
pub const CREDENTIALS_DB_ENV: &str = "CREDENTIALS_DB";
pub const STORE_TIMEOUT_ENV: &str = "STORE_TIMEOUT_SECS";
pub const PASSWORD_MEMORY_ENV: &str = "PASSWORD_HASH_MEMORY_KIB";
pub const PASSWORD_ITERATIONS_ENV: &str = "PASSWORD_HASH_ITERATIONS";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_GATEWAY_PORT: u16 = 8080;
pub const DEFAULT_AUTH_PORT: u16 = 8081;
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Secrets shorter than this still work but are logged as weak.
const RECOMMENDED_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("invalid route {prefix:?}: {reason}")]
    Route { prefix: String, reason: String },
}

/// Shared signing secret. Never printed.
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret([redacted])")
    }
}

/// Settings both services must agree on.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub secret: SigningSecret,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub token: TokenSettings,
    pub routes: Vec<RouteRule>,
    pub connect_timeout: Duration,
    pub upstream_timeout: Duration,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    pub bind_addr: SocketAddr,
    pub token: TokenSettings,
    pub credentials_db: Option<PathBuf>,
    pub store_timeout: Duration,
    pub password_memory_kib: u32,
    pub password_iterations: u32,
}

/// Typed access over a variable lookup function.
struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn parse_or<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(name) {
            Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    fn secs_or(&self, name: &'static str, default: u64) -> Result<Duration, ConfigError> {
        let secs = self.parse_or(name, default)?;
        if secs == 0 {
            return Err(ConfigError::Invalid {
                name,
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(Duration::from_secs(secs))
    }

    fn bind_addr(&self, default_port: u16) -> Result<SocketAddr, ConfigError> {
        let host = self.optional(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port: u16 = self.parse_or(PORT_ENV, default_port)?;
        format!("{host}:{port}")
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: HOST_ENV,
                reason: e.to_string(),
            })
    }

    fn token(&self) -> Result<TokenSettings, ConfigError> {
        let secret = self.required(JWT_SECRET_ENV)?;
        if secret.len() < RECOMMENDED_SECRET_LEN {
            tracing::warn!(
                min_len = RECOMMENDED_SECRET_LEN,
                "JWT_SECRET is shorter than recommended"
            );
        }
        Ok(TokenSettings {
            secret: SigningSecret::new(secret.into_bytes()),
            ttl: self.secs_or(TOKEN_TTL_ENV, DEFAULT_TOKEN_TTL_SECS)?,
        })
    }

    fn routes(&self) -> Result<Vec<RouteRule>, ConfigError> {
        if let Some(value) = self.optional(GATEWAY_ROUTES_ENV) {
            return parse_routes(&value);
        }

        let mut routes = vec![
            RouteRule::new("/auth", &self.required(AUTH_SERVICE_URL_ENV)?, false)?,
            RouteRule::new("/todo", &self.required(TODO_SERVICE_URL_ENV)?, true)?,
        ];
        if let Some(url) = self.optional(NOTIFICATION_SERVICE_URL_ENV) {
            routes.push(RouteRule::new("/notify", &url, true)?);
        }
        Ok(routes)
    }
}

/// Parse `prefix=url;public|protected` entries separated by commas.
pub fn parse_routes(value: &str) -> Result<Vec<RouteRule>, ConfigError> {
    value.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = |reason: &str| ConfigError::Route {
                prefix: entry.to_string(),
                reason: reason.to_string(),
            };
            let (prefix, rest) = entry.split_once('=').ok_or_else(|| invalid("expected prefix=url;mode"))?;
            let (target, mode) = rest.rsplit_once(';').ok_or_else(|| invalid("missing ;public or ;protected"))?;
            let requires_auth = match mode.trim() {
                "protected" => true,
                "public" => false,
                _ => return Err(invalid("mode must be public or protected")),
            };
            RouteRule::new(prefix.trim(), target.trim(), requires_auth)
        })
        .collect()
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };
        let max_body_bytes = env.parse_or(MAX_BODY_BYTES_ENV, DEFAULT_MAX_BODY_BYTES)?;
        if max_body_bytes == 0 {
            return Err(ConfigError::Invalid {
                name: MAX_BODY_BYTES_ENV,
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            bind_addr: env.bind_addr(DEFAULT_GATEWAY_PORT)?,
            token: env.token()?,
            routes: env.routes()?,
            connect_timeout: env.secs_or(UPSTREAM_CONNECT_TIMEOUT_ENV, 5)?,
            upstream_timeout: env.secs_or(UPSTREAM_TIMEOUT_ENV, 30)?,
            max_body_bytes,
        })
    }
}

impl AuthServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };
        Ok(Self {
            bind_addr: env.bind_addr(DEFAULT_AUTH_PORT)?,
            token: env.token()?,
            credentials_db: env.optional(CREDENTIALS_DB_ENV).map(PathBuf::from),
            store_timeout: env.secs_or(STORE_TIMEOUT_ENV, 5)?,
            password_memory_kib: env.parse_or(PASSWORD_MEMORY_ENV, DEFAULT_MEMORY_KIB)?,
            password_iterations: env.parse_or(PASSWORD_ITERATIONS_ENV, DEFAULT_ITERATIONS)?,
        })
    }
}
