use crate::core::ConfigProvider;
use crate::domain::model::EntityKind;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_database_url, validate_non_empty_string, validate_path, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 例如 `url = "${PG_URI}"`
    pub url: Option<String>,
    #[serde(default = "default_schema")]
    pub schema: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    pub brands: Option<String>,
    pub users: Option<String>,
    /// Receipts and receipt items share this file.
    pub receipts: Option<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            brands: None,
            users: None,
            receipts: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn default_schema() -> String {
    "fetch".to_string()
}

fn default_data_dir() -> String {
    "./sample_data".to_string()
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PG_URI})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }
}

impl ConfigProvider for TomlConfig {
    fn database_url(&self) -> Option<&str> {
        self.database.url.as_deref()
    }

    fn schema(&self) -> &str {
        &self.database.schema
    }

    fn data_dir(&self) -> &str {
        &self.sources.data_dir
    }

    fn source_file(&self, entity: EntityKind) -> String {
        let configured = match entity {
            EntityKind::Brands => &self.sources.brands,
            EntityKind::Users => &self.sources.users,
            EntityKind::Receipts | EntityKind::ReceiptItems => &self.sources.receipts,
        };
        configured
            .clone()
            .unwrap_or_else(|| entity.default_source().to_string())
    }

    fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_path("sources.data_dir", &self.sources.data_dir)?;
        validate_non_empty_string("database.schema", &self.database.schema)?;
        if let Some(url) = &self.database.url {
            validate_database_url("database.url", url)?;
        }
        for entity in EntityKind::ALL {
            validate_path("sources", &self.source_file(entity))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[database]
url = "postgres://etl@localhost:5432/rewards"
schema = "staging"

[sources]
data_dir = "./exports"
receipts = "receipts_2021.json"

[monitoring]
enabled = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.schema(), "staging");
        assert_eq!(config.data_dir(), "./exports");
        assert_eq!(config.source_file(EntityKind::Brands), "brands.json");
        assert_eq!(config.source_file(EntityKind::ReceiptItems), "receipts_2021.json");
        assert!(config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_when_sections_are_sparse() {
        let config = TomlConfig::from_toml_str("[database]\n").unwrap();
        assert_eq!(config.schema(), "fetch");
        assert_eq!(config.data_dir(), "./sample_data");
        assert!(config.database_url().is_none());
        assert!(!config.monitoring_enabled());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("REWARDS_ETL_TEST_PG_URI", "postgres://localhost/test");

        let toml_content = r#"
[database]
url = "${REWARDS_ETL_TEST_PG_URI}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.database_url(), Some("postgres://localhost/test"));

        std::env::remove_var("REWARDS_ETL_TEST_PG_URI");
    }

    #[test]
    fn test_unset_env_var_is_left_in_place() {
        let config =
            TomlConfig::from_toml_str("[database]\nurl = \"${REWARDS_ETL_SURELY_UNSET}\"\n")
                .unwrap();
        assert_eq!(config.database_url(), Some("${REWARDS_ETL_SURELY_UNSET}"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[database]\nschema = \"file_test\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.schema(), "file_test");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[database\n").unwrap_err();
        assert!(matches!(err, EtlError::ConfigValidationError { .. }));
    }
}
