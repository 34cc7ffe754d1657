//! Backend Directory: path to backend lookup.
//!
//! # Responsibilities
//! - Store compiled route rules in their evaluation order
//! - Resolve any request path to exactly one route (total function)
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Rules sorted once: exact before prefix, longer before shorter, config
//!   order breaking ties; the first match wins, so the longest pattern wins
//! - Unmatched paths fall back to the catch-all route, never a NoMatch

use crate::config::GatewayConfig;
use crate::routing::matcher::PathMatcher;
use crate::routing::target::{BackendTarget, TargetError};

/// Name given to the catch-all route.
pub const DEFAULT_ROUTE: &str = "default";

/// One compiled route rule.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    pub matcher: PathMatcher,
    pub target: BackendTarget,
    /// Breaker command protecting this route.
    pub command: String,
}

/// Error compiling the directory from configuration.
#[derive(Debug, thiserror::Error)]
#[error("route `{route}`: {source}")]
pub struct DirectoryError {
    pub route: String,
    #[source]
    pub source: TargetError,
}

/// Ordered, read-only route table with a catch-all fallback.
#[derive(Debug, Clone)]
pub struct BackendDirectory {
    rules: Vec<Route>,
    fallback: Route,
}

impl BackendDirectory {
    /// Build a directory from explicit rules and a fallback route.
    pub fn new(mut rules: Vec<Route>, fallback: Route) -> Self {
        // sort_by_key is stable: equal precedence keeps config order
        rules.sort_by_key(|r| r.matcher.precedence());
        Self { rules, fallback }
    }

    /// Compile the directory from validated configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, DirectoryError> {
        let default_command = &config.breaker.default_command;

        let rules = config
            .routes
            .iter()
            .map(|rc| {
                let target = BackendTarget::parse(&rc.target).map_err(|source| DirectoryError {
                    route: rc.name.clone(),
                    source,
                })?;
                Ok(Route {
                    name: rc.name.clone(),
                    matcher: PathMatcher::new(rc.match_kind, rc.path.clone()),
                    target,
                    command: rc.command.clone().unwrap_or_else(|| default_command.clone()),
                })
            })
            .collect::<Result<Vec<_>, DirectoryError>>()?;

        let fallback_target =
            BackendTarget::parse(&config.default_target).map_err(|source| DirectoryError {
                route: DEFAULT_ROUTE.to_string(),
                source,
            })?;
        let fallback = Route {
            name: DEFAULT_ROUTE.to_string(),
            matcher: PathMatcher::Prefix("/".to_string()),
            target: fallback_target,
            command: default_command.clone(),
        };

        Ok(Self::new(rules, fallback))
    }

    /// Resolve a request path. Always returns a route.
    pub fn resolve(&self, path: &str) -> &Route {
        self.rules
            .iter()
            .find(|r| r.matcher.matches(path))
            .unwrap_or(&self.fallback)
    }

    /// Rules in evaluation order, fallback excluded.
    pub fn rules(&self) -> &[Route] {
        &self.rules
    }

    pub fn fallback(&self) -> &Route {
        &self.fallback
    }
}
