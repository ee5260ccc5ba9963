pub mod geocode_pipeline;
pub mod jobs_pipeline;

pub use geocode_pipeline::{GeocodeBatch, GeocodePipeline};
pub use jobs_pipeline::JobsPipeline;
