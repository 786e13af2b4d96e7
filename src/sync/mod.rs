mod engine;
pub mod params;

pub use engine::SyncEngine;
pub use params::{DateRange, ProcessEnv, SyncParameters};
