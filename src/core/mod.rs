pub mod etl;
pub mod fetch;
pub mod listing;
pub mod load;
pub mod regeo;

pub use crate::domain::model::{ParsedRecord, TransformResult};
pub use crate::domain::ports::{PageDriver, Pipeline, Readiness, ReverseGeocoder, Storage};
pub use crate::utils::error::Result;
