pub mod coerce;
pub mod entities;
pub mod etl;
pub mod flatten;
pub mod loader;
pub mod orchestrator;

pub use crate::domain::model::{Record, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage, TableSink};
pub use crate::utils::error::Result;
