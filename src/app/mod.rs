// Application layer: concrete pipelines wired from the core stages.

pub mod pipelines;
