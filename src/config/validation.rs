//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every target URL must parse into a backend target
//! - Validate value ranges (timeouts > 0, percentages <= 100)
//! - Routes reference declared breaker commands
//!
//! Returns all validation errors, not just the first.

use std::collections::HashSet;

use crate::config::schema::GatewayConfig;
use crate::routing::BackendTarget;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("route `{route}`: invalid target `{target}`: {reason}")]
    InvalidTarget {
        route: String,
        target: String,
        reason: String,
    },

    #[error("route `{0}`: path must start with '/'")]
    InvalidPath(String),

    #[error("duplicate route name `{0}`")]
    DuplicateRoute(String),

    #[error("route `{route}`: unknown breaker command `{command}`")]
    UnknownCommand { route: String, command: String },

    #[error("command `{command}`: {field} must be greater than zero")]
    ZeroValue {
        command: String,
        field: &'static str,
    },

    #[error("command `{0}`: error_threshold_percent must be at most 100")]
    ThresholdOutOfRange(String),

    #[error("listener bind address `{0}` is not a socket address")]
    InvalidBindAddress(String),

    #[error("static file mount `{0}` must start with '/' and not be the root")]
    InvalidMount(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config
        .listener
        .bind_address
        .parse::<std::net::SocketAddr>()
        .is_err()
    {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let mount = &config.static_files.mount;
    if config.static_files.enabled && (!mount.starts_with('/') || mount == "/") {
        errors.push(ValidationError::InvalidMount(mount.clone()));
    }

    if let Err(e) = BackendTarget::parse(&config.default_target) {
        errors.push(ValidationError::InvalidTarget {
            route: "default".to_string(),
            target: config.default_target.clone(),
            reason: e.to_string(),
        });
    }

    let mut names = HashSet::new();
    for route in &config.routes {
        if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }
        if !route.path.starts_with('/') {
            errors.push(ValidationError::InvalidPath(route.name.clone()));
        }
        if let Err(e) = BackendTarget::parse(&route.target) {
            errors.push(ValidationError::InvalidTarget {
                route: route.name.clone(),
                target: route.target.clone(),
                reason: e.to_string(),
            });
        }
        if let Some(command) = &route.command {
            if command != &config.breaker.default_command
                && !config.breaker.commands.contains_key(command)
            {
                errors.push(ValidationError::UnknownCommand {
                    route: route.name.clone(),
                    command: command.clone(),
                });
            }
        }
    }

    for (name, command) in &config.breaker.commands {
        let numbers = [
            ("timeout_ms", command.timeout_ms),
            ("max_concurrent", command.max_concurrent as u64),
            ("sleep_window_ms", command.sleep_window_ms),
            ("rolling_window_secs", command.rolling_window_secs),
        ];
        for (field, value) in numbers {
            if value == 0 {
                errors.push(ValidationError::ZeroValue {
                    command: name.clone(),
                    field,
                });
            }
        }
        if command.error_threshold_percent > 100 {
            errors.push(ValidationError::ThresholdOutOfRange(name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
