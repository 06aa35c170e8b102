use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use log::warn;

use crate::geometry::{client_to_ratio, wrap_rotation, SurfaceGeometry};
use crate::gesture::{JudgeConfig, OnTapFn, PointerEvent, RatioFn, TapJudge, TapKind};
use crate::models::{Pin, PinTag};
use crate::store::{PinStore, SnapshotFn};

/// Pins closer than this to a long-press, in ratio space, count as hit.
const PIN_HIT_RADIUS: f64 = 0.03;

#[derive(Debug, Clone, Copy)]
struct ViewState {
    geometry: SurfaceGeometry,
    rotation_deg: f64,
    scale: f64,
}

enum TapAction {
    Place(PinTag),
    Remove(String),
}

/// One interactive map surface: wires the tap judge, the projector and the
/// pin store together, and holds the rotation/scale the presentation layer
/// supplies. Rendering stays outside; this type only turns classified taps
/// into store operations and relays live snapshots back out.
///
/// Tap policy: single places an ally pin, double places an enemy pin, a
/// long-press on an existing pin removes it, a long-press on empty map places
/// a general pin.
pub struct MapSurface {
    judge: TapJudge,
    store: PinStore,
    map_id: String,
    view: Arc<StdMutex<ViewState>>,
    pins: Arc<StdMutex<Vec<Pin>>>,
}

impl MapSurface {
    pub fn new(store: PinStore, map_id: &str, config: JudgeConfig) -> Self {
        let view = Arc::new(StdMutex::new(ViewState {
            geometry: SurfaceGeometry::new(0.0, 0.0, 0.0, 0.0),
            rotation_deg: 0.0,
            scale: 1.0,
        }));
        let pins: Arc<StdMutex<Vec<Pin>>> = Arc::new(StdMutex::new(Vec::new()));

        // Projection uses the view state as of the press, not of resolution.
        let ratio_view = view.clone();
        let get_ratio: RatioFn = Arc::new(move |ev: &PointerEvent| {
            let view = ratio_view
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            client_to_ratio(
                &view.geometry,
                ev.client_x,
                ev.client_y,
                view.rotation_deg,
                view.scale,
            )
        });

        let tap_store = store.clone();
        let tap_pins = pins.clone();
        let tap_map = map_id.to_string();
        let on_tap: OnTapFn = Arc::new(move |kind, x_ratio, y_ratio| {
            let action = match kind {
                TapKind::Single => TapAction::Place(PinTag::Ally),
                TapKind::Double => TapAction::Place(PinTag::Enemy),
                TapKind::Long => {
                    let pins = tap_pins.lock().unwrap_or_else(PoisonError::into_inner);
                    match nearest_pin_id(&pins, x_ratio, y_ratio) {
                        Some(id) => TapAction::Remove(id),
                        None => TapAction::Place(PinTag::General),
                    }
                }
            };

            // Fire the backend request and move on; the result shows up
            // through the subscription channel.
            let store = tap_store.clone();
            let map_id = tap_map.clone();
            tokio::spawn(async move {
                match action {
                    TapAction::Place(tag) => store.add_pin(x_ratio, y_ratio, tag, &map_id).await,
                    TapAction::Remove(id) => store.remove(&id).await,
                }
            });
        });

        Self {
            judge: TapJudge::new(get_ratio, on_tap, config),
            store,
            map_id: map_id.to_string(),
            view,
            pins,
        }
    }

    /// Relays live snapshots to the presentation layer, caching the latest
    /// set for long-press hit-testing.
    pub async fn subscribe(&self, callback: SnapshotFn) {
        let cache = self.pins.clone();
        let relay: SnapshotFn = Arc::new(move |pins: Vec<Pin>| {
            *cache.lock().unwrap_or_else(PoisonError::into_inner) = pins.clone();
            callback(pins);
        });
        self.store.subscribe(&self.map_id, relay).await;
    }

    /// Tears the surface down: no further tap callbacks or snapshots.
    pub async fn detach(&self) {
        self.judge.dispose().await;
        self.store.unsubscribe_all().await;
    }

    pub async fn pointer_down(&self, ev: &PointerEvent) {
        self.judge.pointer_down(ev).await;
    }

    pub async fn pointer_move(&self, ev: &PointerEvent) {
        self.judge.pointer_move(ev).await;
    }

    pub async fn pointer_up(&self, ev: &PointerEvent) {
        self.judge.pointer_up(ev).await;
    }

    pub fn set_geometry(&self, geometry: SurfaceGeometry) {
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .geometry = geometry;
    }

    pub fn set_rotation(&self, rotation_deg: f64) {
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rotation_deg = wrap_rotation(rotation_deg);
    }

    /// Steps the rotation, wrapping into `[0, 360)`; the rotation buttons call
    /// this with +/-90.
    pub fn rotate_by(&self, delta_deg: f64) {
        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        view.rotation_deg = wrap_rotation(view.rotation_deg + delta_deg);
    }

    pub fn set_scale(&self, scale: f64) {
        if !(scale > 0.0) {
            warn!("ignoring non-positive display scale {scale}");
            return;
        }
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .scale = scale.min(1.0);
    }

    pub fn rotation(&self) -> f64 {
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rotation_deg
    }

    pub fn scale(&self) -> f64 {
        self.view.lock().unwrap_or_else(PoisonError::into_inner).scale
    }
}

fn nearest_pin_id(pins: &[Pin], x_ratio: f64, y_ratio: f64) -> Option<String> {
    let mut best: Option<(f64, &Pin)> = None;
    for pin in pins {
        let dx = pin.x_ratio - x_ratio;
        let dy = pin.y_ratio - y_ratio;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance <= PIN_HIT_RADIUS && best.map_or(true, |(closest, _)| distance < closest) {
            best = Some((distance, pin));
        }
    }
    best.map(|(_, pin)| pin.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{PinBackend, StoreConfig};
    use std::time::Duration;

    fn surface_over(backend: &PinBackend) -> MapSurface {
        let store = PinStore::new(backend.clone(), StoreConfig::default());
        let surface = MapSurface::new(store, "alpha", JudgeConfig::default());
        surface.set_geometry(SurfaceGeometry::new(800.0, 600.0, 400.0, 300.0));
        surface.set_scale(1.0);
        surface
    }

    fn at(x: f64, y: f64) -> PointerEvent {
        PointerEvent {
            client_x: x,
            client_y: y,
        }
    }

    async fn advance(ms: u64) {
        // Let any freshly-spawned timer poll and arm its sleep against the
        // current paused clock before moving time forward; otherwise the
        // advance lands before the deadline is registered.
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
        tokio::time::advance(Duration::from_millis(ms)).await;
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn single_tap_places_an_ally_pin_at_the_projected_ratio() {
        let backend = PinBackend::new();
        let surface = surface_over(&backend);

        surface.pointer_down(&at(400.0, 300.0)).await;
        advance(50).await;
        surface.pointer_up(&at(400.0, 300.0)).await;
        advance(250).await;

        let pins = backend.query("alpha").await.unwrap();
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].tag, PinTag::Ally);
        assert_eq!((pins[0].x_ratio, pins[0].y_ratio), (0.5, 0.5));
    }

    #[tokio::test(start_paused = true)]
    async fn double_tap_places_an_enemy_pin() {
        let backend = PinBackend::new();
        let surface = surface_over(&backend);

        surface.pointer_down(&at(400.0, 300.0)).await;
        surface.pointer_up(&at(400.0, 300.0)).await;
        advance(50).await;
        surface.pointer_down(&at(400.0, 300.0)).await;
        advance(250).await;

        let pins = backend.query("alpha").await.unwrap();
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].tag, PinTag::Enemy);
    }

    #[tokio::test(start_paused = true)]
    async fn long_press_on_empty_map_places_a_general_pin() {
        let backend = PinBackend::new();
        let surface = surface_over(&backend);

        surface.pointer_down(&at(600.0, 450.0)).await;
        advance(300).await;

        let pins = backend.query("alpha").await.unwrap();
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].tag, PinTag::General);
    }

    #[tokio::test(start_paused = true)]
    async fn long_press_on_an_existing_pin_removes_it() {
        let backend = PinBackend::new();
        let surface = surface_over(&backend);
        let (log, callback): (_, SnapshotFn) = {
            let log = Arc::new(StdMutex::new(Vec::<Vec<Pin>>::new()));
            let sink = log.clone();
            (log, Arc::new(move |pins| sink.lock().unwrap().push(pins)))
        };
        surface.subscribe(callback).await;

        // Place a pin, wait for the snapshot to land in the hit-test cache.
        surface.pointer_down(&at(400.0, 300.0)).await;
        surface.pointer_up(&at(400.0, 300.0)).await;
        advance(250).await;
        assert_eq!(backend.query("alpha").await.unwrap().len(), 1);
        assert!(log.lock().unwrap().iter().any(|s| s.len() == 1));

        // Long-press the same spot.
        surface.pointer_down(&at(400.0, 300.0)).await;
        advance(300).await;

        assert!(backend.query("alpha").await.unwrap().is_empty());
        surface.detach().await;
    }

    #[tokio::test(start_paused = true)]
    async fn projection_respects_rotation_set_before_the_press() {
        let backend = PinBackend::new();
        let surface = surface_over(&backend);
        surface.set_rotation(90.0);

        // 150 px right of center on a quarter-turned surface is a vertical
        // offset in map space.
        surface.pointer_down(&at(550.0, 300.0)).await;
        surface.pointer_up(&at(550.0, 300.0)).await;
        advance(250).await;

        let pins = backend.query("alpha").await.unwrap();
        assert_eq!(pins.len(), 1);
        assert!((pins[0].x_ratio - 0.5).abs() < 1e-9);
        assert!((pins[0].y_ratio - (0.5 - 150.0 / 600.0)).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn detach_suppresses_a_pending_episode() {
        let backend = PinBackend::new();
        let surface = surface_over(&backend);

        surface.pointer_down(&at(400.0, 300.0)).await;
        advance(100).await;
        surface.detach().await;
        advance(500).await;

        assert!(backend.query("alpha").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rotation_steps_wrap() {
        let backend = PinBackend::new();
        let surface = surface_over(&backend);

        surface.rotate_by(-90.0);
        assert_eq!(surface.rotation(), 270.0);
        surface.rotate_by(90.0);
        surface.rotate_by(90.0);
        assert_eq!(surface.rotation(), 90.0);
    }

    #[tokio::test(start_paused = true)]
    async fn scale_is_clamped_to_at_most_one() {
        let backend = PinBackend::new();
        let surface = surface_over(&backend);

        surface.set_scale(2.5);
        assert_eq!(surface.scale(), 1.0);
        surface.set_scale(0.4);
        assert_eq!(surface.scale(), 0.4);
        surface.set_scale(0.0);
        assert_eq!(surface.scale(), 0.4);
    }

    #[test]
    fn nearest_pin_prefers_the_closest_within_radius() {
        let mut near = Pin::new(0.50, 0.50, PinTag::Ally, "alpha");
        near.id = "near".into();
        let mut nearer = Pin::new(0.505, 0.50, PinTag::Ally, "alpha");
        nearer.id = "nearer".into();
        let mut far = Pin::new(0.9, 0.9, PinTag::Ally, "alpha");
        far.id = "far".into();

        let pins = vec![near, nearer, far];
        assert_eq!(nearest_pin_id(&pins, 0.506, 0.50), Some("nearer".into()));
        assert_eq!(nearest_pin_id(&pins, 0.2, 0.2), None);
    }
}
