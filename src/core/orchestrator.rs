use crate::app::pipelines::entity_pipeline::EntityPipeline;
use crate::core::etl::EtlEngine;
use crate::core::{ConfigProvider, Storage, TableSink};
use crate::domain::model::{EntityKind, TableName};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    Loaded { rows: usize },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOutcome {
    pub entity: EntityKind,
    pub target: TableName,
    pub status: TableStatus,
}

/// 一次完整執行的結果摘要
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub schema_error: Option<String>,
    pub tables: Vec<TableOutcome>,
}

impl RunSummary {
    pub fn failures(&self) -> impl Iterator<Item = &TableOutcome> {
        self.tables
            .iter()
            .filter(|t| matches!(t.status, TableStatus::Failed { .. }))
    }

    pub fn is_clean(&self) -> bool {
        self.schema_error.is_none() && self.failures().next().is_none()
    }

    pub fn rows_loaded(&self, entity: EntityKind) -> Option<usize> {
        self.tables.iter().find_map(|t| match t.status {
            TableStatus::Loaded { rows } if t.entity == entity => Some(rows),
            _ => None,
        })
    }

    pub fn log(&self) {
        for outcome in &self.tables {
            match &outcome.status {
                TableStatus::Loaded { rows } => {
                    tracing::info!("✅ {}: {} rows", outcome.target, rows)
                }
                TableStatus::Failed { error } => {
                    tracing::error!("💀 {}: {}", outcome.target, error)
                }
            }
        }
        if self.is_clean() {
            tracing::info!("🌈 (っ◔◡◔)っ ♥ all tables loaded ♥ ✨");
        } else {
            tracing::warn!(
                "⚠️ Run finished with {} failed table(s)",
                self.failures().count() + usize::from(self.schema_error.is_some())
            );
        }
    }
}

/// Creates the schema, then runs brands, users, receipts and receipt items
/// in that order. Failures are recorded and the run moves on.
pub struct Orchestrator<S: Storage, K: TableSink, C: ConfigProvider> {
    storage: Arc<S>,
    sink: Arc<K>,
    config: C,
}

impl<S: Storage, K: TableSink, C: ConfigProvider> Orchestrator<S, K, C> {
    pub fn new(storage: S, sink: K, config: C) -> Self {
        Self {
            storage: Arc::new(storage),
            sink: Arc::new(sink),
            config,
        }
    }

    pub fn pipeline(&self, entity: EntityKind) -> EntityPipeline<S, K> {
        EntityPipeline::new(
            entity,
            self.config.source_file(entity),
            self.config.schema(),
            self.storage.clone(),
            self.sink.clone(),
        )
    }

    pub async fn run(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        let schema = self.config.schema();

        if let Err(e) = self.sink.ensure_schema(schema).await {
            tracing::error!("💀 Error creating schema \"{}\": {}", schema, e);
            summary.schema_error = Some(e.to_string());
        }

        for entity in EntityKind::ALL {
            let pipeline = self.pipeline(entity);
            let target = pipeline.target().clone();
            let engine = EtlEngine::new_with_monitoring(
                target.to_string(),
                pipeline,
                self.config.monitoring_enabled(),
            );

            let status = match engine.run().await {
                Ok(report) => TableStatus::Loaded {
                    rows: report.rows_written,
                },
                Err(e) => {
                    tracing::error!(
                        "💀 Error running {} ETL: {} (Category: {:?}, Severity: {:?})",
                        entity,
                        e,
                        e.category(),
                        e.severity()
                    );
                    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
                    TableStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };

            summary.tables.push(TableOutcome {
                entity,
                target,
                status,
            });
        }

        summary
    }
}
