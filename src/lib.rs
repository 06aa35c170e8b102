//! Core of a shared tactical map: several clients drop transient, categorized
//! pins on one map image and watch each other's marks appear and fade in real
//! time.
//!
//! Three pieces do the real work: the [`gesture`] tap judge classifies raw
//! pointer streams into single / double / long taps, the [`geometry`]
//! projector turns pointer positions into rotation-invariant map ratios, and
//! the [`store`] keeps the replicated pin collection consistent and expires
//! aged pins. [`surface::MapSurface`] wires them together for one interactive
//! surface; rendering and transport stay outside this crate.

pub mod geometry;
pub mod gesture;
pub mod models;
pub mod store;
pub mod surface;
mod utils;

pub use geometry::{client_to_ratio, fit_scale, wrap_rotation, SurfaceGeometry};
pub use gesture::{JudgeConfig, PointerEvent, TapJudge, TapKind};
pub use models::{Pin, PinTag};
pub use store::{PinBackend, PinStore, SnapshotFn, StoreConfig};
pub use surface::MapSurface;
