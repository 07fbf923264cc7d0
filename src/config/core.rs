use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::Serialize;
use std::path::Path;

use super::CasepollConfig;

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

impl CasepollConfig {
    /// Load the layered configuration
    ///
    /// Priority, lowest first: embedded defaults, user config, working
    /// directory config, `custom_config`, `CASEPOLL_*` environment, then
    /// `cli_overrides`.
    pub fn load<T: Serialize>(custom_config: Option<&str>, cli_overrides: Option<T>) -> Result<Self> {
        tracing::trace!("CONFIG LOAD: Starting");

        let mut figment = Self::base_figment();

        if let Some(custom_path) = custom_config {
            if !Path::new(custom_path).exists() {
                anyhow::bail!("Config file not found: {}", custom_path);
            }
            figment = merge_by_extension(figment, custom_path);
        }

        figment = figment.merge(Env::prefixed("CASEPOLL_").split("__"));

        if let Some(overrides) = cli_overrides {
            tracing::trace!("CONFIG LOAD: Applying CLI overrides");
            figment = figment.merge(Serialized::defaults(overrides));
        }

        let config: CasepollConfig = figment
            .extract()
            .context("Failed to build configuration")?;

        tracing::debug!(
            "CONFIG LOAD: endpoint={} remainder={:?} rate_limit={:?}",
            config.endpoint.url,
            config.parallel.remainder,
            config.rate_limit.policy
        );

        config.validate()?;
        Ok(config)
    }

    /// Defaults plus the user-level and working-directory config files
    fn base_figment() -> Figment {
        let user_base = Self::user_config_base_path();

        Figment::new()
            .merge(Toml::string(DEFAULT_CONFIG))
            .merge(Toml::file(format!("{}.toml", user_base)))
            .merge(Json::file(format!("{}.json", user_base)))
            .merge(Yaml::file(format!("{}.yaml", user_base)))
            .merge(Yaml::file(format!("{}.yml", user_base)))
            .merge(Toml::file("casepoll.toml"))
            .merge(Json::file("casepoll.json"))
            .merge(Yaml::file("casepoll.yaml"))
            .merge(Yaml::file("casepoll.yml"))
    }

    fn user_config_base_path() -> String {
        match std::env::var("HOME") {
            Ok(home) => format!("{}/.config/casepoll/config", home),
            Err(_) => "~/.config/casepoll/config".to_string(),
        }
    }
}

fn merge_by_extension(figment: Figment, path: &str) -> Figment {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("json") => figment.merge(Json::file(path)),
        Some("yaml") | Some("yml") => figment.merge(Yaml::file(path)),
        _ => figment.merge(Toml::file(path)),
    }
}
