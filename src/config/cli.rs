use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_database_url, validate_non_empty_string, validate_path, validate_required_field,
    Validate,
};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "rewards-etl")]
#[command(about = "Load brands, users and receipts exports into PostgreSQL")]
pub struct CliConfig {
    /// PostgreSQL connection string
    #[arg(long, env = "PG_URI", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Directory holding brands.json, users.json and receipts.json
    #[arg(long, default_value = "./sample_data")]
    pub data_dir: String,

    #[arg(long, default_value = "fetch")]
    pub schema: String,

    /// Write CSV files into this directory instead of the database
    #[arg(long)]
    pub csv_output: Option<String>,

    /// TOML configuration file; replaces the flags above
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log process CPU and memory after each phase")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

impl ConfigProvider for CliConfig {
    fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    fn schema(&self) -> &str {
        &self.schema
    }

    fn data_dir(&self) -> &str {
        &self.data_dir
    }

    fn monitoring_enabled(&self) -> bool {
        self.monitor
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("data_dir", &self.data_dir)?;
        validate_non_empty_string("schema", &self.schema)?;

        match &self.csv_output {
            Some(dir) => validate_path("csv_output", dir)?,
            None => {
                let url = validate_required_field("database_url (PG_URI)", &self.database_url)?;
                validate_database_url("database_url", url)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliConfig {
        CliConfig::try_parse_from(std::iter::once("rewards-etl").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--database-url", "postgres://localhost/rewards"]);
        assert_eq!(config.data_dir, "./sample_data");
        assert_eq!(config.schema(), "fetch");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_csv_output_does_not_need_database() {
        let config = parse(&["--csv-output", "./out"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_database_url_is_rejected() {
        let config = parse(&["--database-url", "mysql://localhost/rewards"]);
        assert!(config.validate().is_err());
    }
}
