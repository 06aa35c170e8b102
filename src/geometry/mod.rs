pub mod fit;
pub mod projector;

pub use fit::{fit_scale, wrap_rotation};
pub use projector::{client_to_ratio, SurfaceGeometry, NEUTRAL_RATIO};
