pub mod entity_pipeline;
