// Adapters layer: concrete sinks for the relational store and local files.

pub mod csv_sink;
pub mod postgres;
pub mod storage;

pub use csv_sink::CsvSink;
pub use postgres::PostgresSink;
pub use storage::LocalStorage;
