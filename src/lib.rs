pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{CsvSink, LocalStorage, PostgresSink};
pub use app::pipelines::entity_pipeline::EntityPipeline;
pub use core::{
    etl::EtlEngine,
    orchestrator::{Orchestrator, RunSummary, TableStatus},
};
pub use domain::model::{Cell, ColumnType, EntityKind, Table, TableName};
pub use utils::error::{EtlError, Result};
