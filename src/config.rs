//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `FLEX_LOG_LEVEL` and `FLEX_PRETTY_DEBUG_LOGS` env overrides.

use std::{env, fs, path::Path};

use serde::Deserialize;

use crate::error::AppError;

/// Settings the adapter core reads.
#[derive(Debug, Clone, Default)]
pub struct FlexConfig {
    /// Indent request/response JSON in debug logs.  Readable on a console,
    /// but splits each record across lines in CloudWatch.
    pub pretty_debug_logs: bool,
}

/// HTTP webhook channel configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind the webhook listener to.
    pub bind: String,
    /// Path Lex posts events to.
    pub route: String,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub flex: FlexConfig,
    pub server: ServerConfig,
}

/// Env overrides, passed explicitly so tests never touch the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub log_level: Option<String>,
    pub pretty_debug_logs: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("FLEX_LOG_LEVEL").ok(),
            pretty_debug_logs: env::var("FLEX_PRETTY_DEBUG_LOGS").ok(),
        }
    }
}

/// Raw TOML shape, the `serde` target before resolution.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    flex: RawFlex,
    #[serde(default)]
    server: RawServer,
}

#[derive(Deserialize)]
struct RawFlex {
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    pretty_debug_logs: bool,
}

impl Default for RawFlex {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            pretty_debug_logs: false,
        }
    }
}

#[derive(Deserialize)]
struct RawServer {
    #[serde(default = "default_bind")]
    bind: String,
    #[serde(default = "default_route")]
    route: String,
}

impl Default for RawServer {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            route: default_route(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_route() -> String {
    "/".to_string()
}

/// Load config from `config/default.toml`, then apply env-var overrides.
pub fn load() -> Result<Config, AppError> {
    load_from(Path::new("config/default.toml"), &Overrides::from_env())
}

/// Loader that takes an explicit path and overrides.
pub fn load_from(path: &Path, overrides: &Overrides) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let pretty_debug_logs = match overrides.pretty_debug_logs.as_deref() {
        Some(flag) => parse_flag(flag)?,
        None => parsed.flex.pretty_debug_logs,
    };

    let route = parsed.server.route;
    if !route.starts_with('/') {
        return Err(AppError::Config(format!("server.route must start with '/': {route}")));
    }
    if let Some(segment) = route.split('/').find(|s| s.starts_with(':') || s.starts_with('*')) {
        return Err(AppError::Config(format!(
            "server.route segment '{segment}' uses ':'/'*' capture syntax; use '{{name}}' instead: {route}"
        )));
    }

    Ok(Config {
        log_level: overrides
            .log_level
            .clone()
            .unwrap_or(parsed.flex.log_level),
        flex: FlexConfig { pretty_debug_logs },
        server: ServerConfig {
            bind: parsed.server.bind,
            route,
        },
    })
}

fn parse_flag(value: &str) -> Result<bool, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::Config(format!(
            "FLEX_PRETTY_DEBUG_LOGS must be a boolean, got '{other}'"
        ))),
    }
}
