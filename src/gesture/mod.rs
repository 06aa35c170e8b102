pub mod judge;
pub mod state;

pub use judge::{JudgeConfig, OnTapFn, RatioFn, TapJudge};
pub use state::{JudgeState, TapKind};

use serde::{Deserialize, Serialize};

/// Raw pointer position forwarded by the presentation layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PointerEvent {
    pub client_x: f64,
    pub client_y: f64,
}
