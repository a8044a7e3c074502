//! CLI configuration
//!
//! Sources, lowest precedence first:
//! - built-in defaults
//! - `config/default.*`, `config/local.*`
//! - the file passed with `--config`
//! - `KEYWARD__*` environment variables (`.env` is read first)

use anyhow::{bail, Context};
use keyward_core::WalletConfig;
use keyward_types::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywardConfig {
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub factory: FactoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Addresses wallets are derived from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactoryConfig {
    #[serde(default = "default_factory_address")]
    pub address: Address,
    #[serde(default = "default_implementation")]
    pub implementation: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_factory_address() -> Address {
    Address([0x4b; 20])
}
fn default_implementation() -> Address {
    Address([0x1c; 20])
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            address: default_factory_address(),
            implementation: default_implementation(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl KeywardConfig {
    /// Load configuration from files and environment
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("KEYWARD")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: KeywardConfig = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.wallet.validate()?;

        if self.factory.address == self.factory.implementation {
            bail!("factory address and implementation address must differ");
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => bail!("unknown log format '{}' (expected 'pretty' or 'json')", other),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = KeywardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.wallet, WalletConfig::default());
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        let mut config = KeywardConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_invalid_thresholds() {
        let mut config = KeywardConfig::default();
        config.wallet.thresholds.owner = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyward.toml");
        std::fs::write(
            &path,
            r#"
[wallet]
chain_id = 10

[wallet.thresholds]
owner = 2
assets_op = 1

[logging]
format = "json"
"#,
        )
        .unwrap();

        let config = KeywardConfig::load(path.to_str()).unwrap();
        assert_eq!(config.wallet.chain_id, 10);
        assert_eq!(config.wallet.thresholds.owner, 2);
        assert_eq!(config.wallet.thresholds.assets_op, 1);
        assert_eq!(config.wallet.thresholds.guardian, 50);
        assert_eq!(config.logging.format, "json");
    }
}
