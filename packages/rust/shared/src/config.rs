//! Application configuration for IntakeForge.
//!
//! User config lives at `~/.intakeforge/intakeforge.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IntakeForgeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "intakeforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".intakeforge";

// ---------------------------------------------------------------------------
// Config structs (matching intakeforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Text stamped on generated data sheets.
    #[serde(default)]
    pub branding: BrandingConfig,

    /// Advisor details used by the advisor and journal forms.
    #[serde(default)]
    pub advisor: AdvisorConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Where rendered documents are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Directory holding fillable PDF templates.
    #[serde(default = "default_forms_dir")]
    pub forms_dir: String,

    /// Path of the household registry database.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory of per-household account workbooks (`robert_thornton.xlsx`).
    #[serde(default = "default_accounts_dir")]
    pub accounts_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            forms_dir: default_forms_dir(),
            database_path: default_database_path(),
            accounts_dir: default_accounts_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "out".into()
}
fn default_forms_dir() -> String {
    "forms".into()
}
fn default_database_path() -> String {
    "~/.intakeforge/registry.db".into()
}
fn default_accounts_dir() -> String {
    "~/.intakeforge/accounts".into()
}

/// `[branding]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandingConfig {
    /// Product name printed in the data-sheet header band.
    #[serde(default = "default_product_name")]
    pub product_name: String,

    /// Notice printed under the header on every data-sheet page.
    #[serde(default = "default_confidentiality_notice")]
    pub confidentiality_notice: String,
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            product_name: default_product_name(),
            confidentiality_notice: default_confidentiality_notice(),
        }
    }
}

fn default_product_name() -> String {
    "Wealth Intelligence Platform".into()
}
fn default_confidentiality_notice() -> String {
    "CONFIDENTIAL - contains client personal information. For account-opening use only.".into()
}

/// `[advisor]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Advisor display name.
    #[serde(default)]
    pub name: String,

    /// Advisor G-number.
    #[serde(default)]
    pub g_number: String,

    /// Clearing DTC number.
    #[serde(default)]
    pub dtc_number: String,

    /// Pricing code for the brokerage account.
    #[serde(default)]
    pub pricing_code: String,

    /// Firm name on journal requests.
    #[serde(default = "default_firm")]
    pub firm: String,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            g_number: String::new(),
            dtc_number: String::new(),
            pricing_code: String::new(),
            firm: default_firm(),
        }
    }
}

fn default_firm() -> String {
    "IWS".into()
}

impl AppConfig {
    /// Resolve the database path, expanding a leading `~/`.
    pub fn database_path(&self) -> Result<PathBuf> {
        expand_home(&self.defaults.database_path)
    }

    /// Resolve the templates directory, expanding a leading `~/`.
    pub fn forms_dir(&self) -> Result<PathBuf> {
        expand_home(&self.defaults.forms_dir)
    }

    /// Resolve the output directory, expanding a leading `~/`.
    pub fn output_dir(&self) -> Result<PathBuf> {
        expand_home(&self.defaults.output_dir)
    }

    /// Resolve the account workbook directory, expanding a leading `~/`.
    pub fn accounts_dir(&self) -> Result<PathBuf> {
        expand_home(&self.defaults.accounts_dir)
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| IntakeForgeError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.intakeforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| IntakeForgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.intakeforge/intakeforge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| IntakeForgeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        IntakeForgeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| IntakeForgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| IntakeForgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| IntakeForgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("forms_dir"));
        assert!(toml_str.contains("Wealth Intelligence Platform"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.output_dir, "out");
        assert_eq!(parsed.advisor.firm, "IWS");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[advisor]
name = "Dana Whitfield"
g_number = "G12345"

[branding]
product_name = "Household Desk"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.advisor.name, "Dana Whitfield");
        assert_eq!(config.advisor.firm, "IWS");
        assert_eq!(config.branding.product_name, "Household Desk");
        assert!(config.branding.confidentiality_notice.starts_with("CONFIDENTIAL"));
        assert_eq!(config.defaults.forms_dir, "forms");
        assert_eq!(config.defaults.accounts_dir, "~/.intakeforge/accounts");
    }

    #[test]
    fn relative_paths_are_not_expanded() {
        let path = expand_home("forms/templates").expect("expand");
        assert_eq!(path, PathBuf::from("forms/templates"));
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let tmp = std::env::temp_dir().join(format!("if_cfg_{}.toml", uuid::Uuid::now_v7()));
        std::fs::write(&tmp, "[defaults\noutput_dir = 3").expect("write");
        let err = load_config_from(&tmp).expect_err("should fail");
        assert!(err.to_string().starts_with("config error"));
    }
}
