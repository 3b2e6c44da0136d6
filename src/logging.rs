use anyhow::{bail, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_enabled: bool,
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            loki_enabled: lookup("LOKI_ENABLED")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(false),
            loki_url: lookup("LOKI_URL").filter(|v| !v.trim().is_empty()),
            service_name: lookup("SERVICE_NAME").unwrap_or_else(|| "factsheet".to_string()),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            log_level: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_FILTER.to_string()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.loki_enabled && self.loki_url.is_none() {
            bail!("LOKI_ENABLED is true but LOKI_URL is not set");
        }
        if self.loki_enabled && !cfg!(feature = "loki") {
            bail!("LOKI_ENABLED is true but the binary was built without the 'loki' feature");
        }
        Ok(())
    }
}

pub fn init_logging(config: LoggingConfig) -> Result<()> {
    config.validate()?;

    #[cfg(feature = "loki")]
    {
        if config.loki_enabled {
            if let Some(loki_url) = config.loki_url.clone() {
                return init_with_loki(config, &loki_url);
            }
        }
    }

    init_console_only(config)
}

fn init_console_only(config: LoggingConfig) -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    tracing::info!(
        "📊 Console logging initialized for {} ({})",
        config.service_name,
        config.environment
    );
    Ok(())
}

#[cfg(feature = "loki")]
fn init_with_loki(config: LoggingConfig, loki_url: &str) -> Result<()> {
    let url = url::Url::parse(loki_url)?;

    let (loki_layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)?
        .label("environment", &config.environment)?
        .build_url(url)?;

    // Ships buffered log lines to Loki.
    tokio::spawn(task);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .with(loki_layer)
        .try_init()?;

    tracing::info!("✅ Loki logging initialized at {}", loki_url);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::from_lookup(lookup(&[]));
        assert!(!config.loki_enabled);
        assert_eq!(config.service_name, "factsheet");
        assert_eq!(config.log_level, DEFAULT_FILTER);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_loki_requires_url() {
        let config = LoggingConfig::from_lookup(lookup(&[("LOKI_ENABLED", "true")]));
        assert!(config.validate().is_err());
    }
}
