pub mod models;

pub use models::{quantity_from_value, NormalizedInventory, SourceId};
