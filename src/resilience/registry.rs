//! Breaker registry and the dispatch envelope.
//!
//! The registry owns one [`CircuitBreaker`] per command name. Commands named
//! in configuration are built at startup; any other name gets default
//! settings on first use. Entries live as long as the registry.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::{BreakerConfig, CommandConfig};
use crate::error::GatewayError;
use crate::resilience::circuit_breaker::CircuitBreaker;

#[derive(Debug, Default)]
pub struct BreakerRegistry {
    commands: DashMap<String, Arc<CircuitBreaker>>,
    defaults: CommandConfig,
}

impl BreakerRegistry {
    pub fn new(commands: HashMap<String, CommandConfig>) -> Self {
        let registry = Self {
            commands: DashMap::new(),
            defaults: CommandConfig::default(),
        };
        for (name, config) in commands {
            registry
                .commands
                .insert(name.clone(), Arc::new(CircuitBreaker::new(name, config)));
        }
        registry
    }

    pub fn from_config(config: &BreakerConfig) -> Self {
        Self::new(config.commands.clone())
    }

    /// Breaker for `name`, created with default settings if unknown.
    pub fn command(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.commands.get(name) {
            return breaker.clone();
        }
        self.commands
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(command = %name, "Creating breaker with default settings");
                Arc::new(CircuitBreaker::new(name, self.defaults.clone()))
            })
            .clone()
    }

    /// Run `work` inside the named command's envelope.
    pub async fn execute<F, T>(&self, name: &str, work: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        self.command(name).execute(work).await
    }
}
