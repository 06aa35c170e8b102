use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TapKind {
    Single,
    Double,
    Long,
}

impl TapKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TapKind::Single => "Single",
            TapKind::Double => "Double",
            TapKind::Long => "Long",
        }
    }
}

/// Per-episode judgment state. One episode runs from the first pointer-down
/// until the judgment window closes (or the judge is disposed); everything
/// observed in between is folded into the sticky flags below.
#[derive(Debug, Clone, PartialEq)]
pub enum JudgeState {
    Idle,
    Judging {
        /// Ties the episode to its judgment timer; a timer whose episode
        /// number no longer matches resolves nothing.
        episode: u64,
        start_x: f64,
        start_y: f64,
        /// Map ratio captured at the first contact. Classification reports
        /// this position even when the finger drifts within tolerance.
        x_ratio: f64,
        y_ratio: f64,
        moved: bool,
        saw_second_down: bool,
        saw_up: bool,
    },
}

impl Default for JudgeState {
    fn default() -> Self {
        JudgeState::Idle
    }
}

impl JudgeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_judging(&self) -> bool {
        matches!(self, JudgeState::Judging { .. })
    }

    pub fn episode(&self) -> Option<u64> {
        match self {
            JudgeState::Judging { episode, .. } => Some(*episode),
            JudgeState::Idle => None,
        }
    }

    pub fn ratio(&self) -> Option<(f64, f64)> {
        match self {
            JudgeState::Judging {
                x_ratio, y_ratio, ..
            } => Some((*x_ratio, *y_ratio)),
            JudgeState::Idle => None,
        }
    }

    pub fn begin_episode(
        &mut self,
        episode: u64,
        start_x: f64,
        start_y: f64,
        x_ratio: f64,
        y_ratio: f64,
    ) {
        *self = JudgeState::Judging {
            episode,
            start_x,
            start_y,
            x_ratio,
            y_ratio,
            moved: false,
            saw_second_down: false,
            saw_up: false,
        };
    }

    /// A repeated press inside the window is the double-tap signal. It never
    /// restarts the timer or resets the episode.
    pub fn mark_second_down(&mut self) {
        if let JudgeState::Judging {
            saw_second_down, ..
        } = self
        {
            *saw_second_down = true;
        }
    }

    /// Sticky: once the pointer strays beyond tolerance the episode stays
    /// suppressed even if it returns to the start position.
    pub fn mark_moved_if_beyond(&mut self, x: f64, y: f64, tolerance_px: f64) {
        if let JudgeState::Judging {
            start_x,
            start_y,
            moved,
            ..
        } = self
        {
            let dx = x - *start_x;
            let dy = y - *start_y;
            if (dx * dx + dy * dy).sqrt() > tolerance_px {
                *moved = true;
            }
        }
    }

    /// A release inside the window rules out long-press. It does not end the
    /// episode; classification waits for the window to close.
    pub fn mark_released(&mut self) {
        if let JudgeState::Judging { saw_up, .. } = self {
            *saw_up = true;
        }
    }

    /// Terminal classification, applied once when the judgment window closes.
    /// Movement suppresses the episode outright; a second press outranks a
    /// held press; a press never released within the window is a long-press.
    pub fn classify(&self) -> Option<TapKind> {
        match self {
            JudgeState::Idle => None,
            JudgeState::Judging { moved: true, .. } => None,
            JudgeState::Judging {
                saw_second_down: true,
                ..
            } => Some(TapKind::Double),
            JudgeState::Judging { saw_up: false, .. } => Some(TapKind::Long),
            JudgeState::Judging { .. } => Some(TapKind::Single),
        }
    }

    pub fn reset(&mut self) {
        *self = JudgeState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn judging() -> JudgeState {
        let mut state = JudgeState::new();
        state.begin_episode(1, 100.0, 100.0, 0.1, 0.1);
        state
    }

    #[test]
    fn idle_classifies_to_nothing() {
        assert_eq!(JudgeState::Idle.classify(), None);
    }

    #[test]
    fn plain_released_press_is_single() {
        let mut state = judging();
        state.mark_released();
        assert_eq!(state.classify(), Some(TapKind::Single));
    }

    #[test]
    fn unreleased_press_is_long() {
        let state = judging();
        assert_eq!(state.classify(), Some(TapKind::Long));
    }

    #[test]
    fn second_down_outranks_long_and_single() {
        let mut held = judging();
        held.mark_second_down();
        assert_eq!(held.classify(), Some(TapKind::Double));

        let mut released = judging();
        released.mark_second_down();
        released.mark_released();
        assert_eq!(released.classify(), Some(TapKind::Double));
    }

    #[test]
    fn movement_suppresses_every_outcome() {
        let mut state = judging();
        state.mark_moved_if_beyond(110.0, 100.0, 5.0);
        state.mark_second_down();
        state.mark_released();
        assert_eq!(state.classify(), None);
    }

    #[test]
    fn movement_within_tolerance_does_not_suppress() {
        let mut state = judging();
        state.mark_moved_if_beyond(104.0, 100.0, 5.0);
        state.mark_released();
        assert_eq!(state.classify(), Some(TapKind::Single));
    }

    #[test]
    fn movement_is_sticky() {
        let mut state = judging();
        state.mark_moved_if_beyond(110.0, 100.0, 5.0);
        state.mark_moved_if_beyond(100.0, 100.0, 5.0);
        assert_eq!(state.classify(), None);
    }

    #[test]
    fn displacement_is_euclidean() {
        // 4 px on each axis is ~5.66 px of displacement.
        let mut state = judging();
        state.mark_moved_if_beyond(104.0, 104.0, 5.0);
        assert_eq!(state.classify(), None);
    }

    #[test]
    fn marks_are_ignored_while_idle() {
        let mut state = JudgeState::new();
        state.mark_second_down();
        state.mark_released();
        state.mark_moved_if_beyond(500.0, 500.0, 5.0);
        assert_eq!(state, JudgeState::Idle);
    }

    #[test]
    fn ratio_reports_first_contact() {
        let state = judging();
        assert_eq!(state.ratio(), Some((0.1, 0.1)));
    }
}
