pub mod backend;
pub mod pins;

pub use backend::PinBackend;
pub use pins::{PinStore, SnapshotFn, StoreConfig};
