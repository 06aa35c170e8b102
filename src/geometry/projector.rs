//! Maps raw pointer positions into map-space ratios.
//!
//! The interactive surface is rotated and scaled for display, but pins are
//! stored as fractions of the map image's unrotated layout box, so the same
//! ratio lands on the same spot for every client regardless of how each one
//! has rotated their view.

/// Unrotated layout box of the interactive surface plus its on-screen center.
/// The center comes from the rotated bounding rect; the width/height are the
/// layout dimensions before any display transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceGeometry {
    pub width: f64,
    pub height: f64,
    pub center_x: f64,
    pub center_y: f64,
}

impl SurfaceGeometry {
    pub fn new(width: f64, height: f64, center_x: f64, center_y: f64) -> Self {
        Self {
            width,
            height,
            center_x,
            center_y,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Ratio reported for a surface we cannot project into (zero-sized layout or
/// non-positive scale): the map center.
pub const NEUTRAL_RATIO: (f64, f64) = (0.5, 0.5);

/// Projects a client-space pointer position into `[0,1]` map ratios.
///
/// Undoes the display transform in reverse order: center-relative local
/// coordinates, divided by the uniform display scale, rotated by
/// `-rotation_deg`, then normalized by the unrotated layout size with the
/// origin moved back to the top-left corner.
pub fn client_to_ratio(
    geometry: &SurfaceGeometry,
    client_x: f64,
    client_y: f64,
    rotation_deg: f64,
    scale: f64,
) -> (f64, f64) {
    if geometry.is_degenerate() || !(scale > 0.0) {
        return NEUTRAL_RATIO;
    }

    let local_x = (client_x - geometry.center_x) / scale;
    let local_y = (client_y - geometry.center_y) / scale;

    let rad = rotation_deg.to_radians();
    let (sin, cos) = rad.sin_cos();
    let rx = local_x * cos + local_y * sin;
    let ry = -local_x * sin + local_y * cos;

    (0.5 + rx / geometry.width, 0.5 + ry / geometry.height)
}
