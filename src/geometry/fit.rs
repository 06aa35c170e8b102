//! Display-fit helpers for the rotation controls: the uniform scale that keeps
//! a rotated map inside its container, and rotation wrapping for the +/-90
//! degree step buttons.

/// Largest uniform scale, capped at 1, that fits the rotated image's bounding
/// box inside the container. Degenerate sizes fall back to the neutral scale.
pub fn fit_scale(
    container_w: f64,
    container_h: f64,
    image_w: f64,
    image_h: f64,
    rotation_deg: f64,
) -> f64 {
    if !(container_w > 0.0 && container_h > 0.0 && image_w > 0.0 && image_h > 0.0) {
        return 1.0;
    }

    let rad = rotation_deg.to_radians();
    let cos = rad.cos().abs();
    let sin = rad.sin().abs();

    let rotated_w = cos * image_w + sin * image_h;
    let rotated_h = sin * image_w + cos * image_h;

    (container_w / rotated_w)
        .min(container_h / rotated_h)
        .min(1.0)
}

/// Normalizes any rotation into `[0, 360)`.
pub fn wrap_rotation(deg: f64) -> f64 {
    let wrapped = deg % 360.0;
    if wrapped < 0.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}
