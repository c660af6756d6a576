use clap::Parser;
use rewards_etl::core::{ConfigProvider, TableSink};
use rewards_etl::utils::{logger, validation::Validate};
use rewards_etl::{CliConfig, CsvSink, LocalStorage, Orchestrator, PostgresSink, TomlConfig};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting rewards-etl");

    // 有指定 TOML 時以檔案內容為準
    match cli.config.clone() {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            match TomlConfig::from_file(&path) {
                Ok(config) => run(config, cli.csv_output.clone()).await,
                Err(e) => {
                    tracing::error!("❌ Failed to load config file '{}': {}", path, e);
                    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
                }
            }
        }
        None => {
            let csv_output = cli.csv_output.clone();
            run(cli, csv_output).await
        }
    }

    // 各資料表的錯誤都已記錄，結束碼固定為 0
}

async fn run<C: ConfigProvider + Validate>(config: C, csv_output: Option<String>) {
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        return;
    }

    let storage = LocalStorage::new(config.data_dir().to_string());

    if let Some(dir) = csv_output {
        tracing::info!("📁 Writing CSV output to {}", dir);
        let sink = CsvSink::new(LocalStorage::new(dir));
        execute(storage, sink, config).await;
        return;
    }

    let Some(url) = config.database_url().map(str::to_string) else {
        tracing::error!("❌ No database connection string; set PG_URI or --database-url");
        return;
    };

    match PostgresSink::connect(&url).await {
        Ok(sink) => execute(storage, sink, config).await,
        Err(e) => {
            tracing::error!("💀 {}", e.user_friendly_message());
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        }
    }
}

async fn execute<K: TableSink, C: ConfigProvider>(storage: LocalStorage, sink: K, config: C) {
    let orchestrator = Orchestrator::new(storage, sink, config);
    let summary = orchestrator.run().await;
    summary.log();
}
