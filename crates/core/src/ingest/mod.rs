pub mod provider;

pub use provider::{HttpSnapshotSource, SnapshotSource};
