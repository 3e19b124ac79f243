use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_SCALE: f32 = 0.1;
pub const DEFAULT_MAX_SCALE: f32 = 8.0;
pub const DEFAULT_ZOOM_STEP: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub scale: f32,
    pub translation: (f32, f32),
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translation: (0.0, 0.0),
        }
    }
}

#[derive(Debug)]
pub struct ViewportController {
    state: ViewportState,
    min_scale: f32,
    max_scale: f32,
    zoom_step: f32,
    pending_recenter: bool,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SCALE, DEFAULT_MAX_SCALE, DEFAULT_ZOOM_STEP)
    }
}

impl ViewportController {
    pub fn new(min_scale: f32, max_scale: f32, zoom_step: f32) -> Self {
        Self {
            state: ViewportState::default(),
            min_scale,
            max_scale,
            zoom_step,
            pending_recenter: false,
        }
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn scale(&self) -> f32 {
        self.state.scale
    }

    pub fn translation(&self) -> (f32, f32) {
        self.state.translation
    }

    pub fn recenter_pending(&self) -> bool {
        self.pending_recenter
    }

    pub fn zoom_in(&mut self) {
        self.set_scale(self.state.scale * (1.0 + self.zoom_step));
    }

    pub fn zoom_out(&mut self) {
        self.set_scale(self.state.scale / (1.0 + self.zoom_step));
    }

    pub fn set_scale(&mut self, scale: f32) {
        // max/min, not clamp: a config file with minScale > maxScale must
        // not panic.
        self.state.scale = scale.max(self.min_scale).min(self.max_scale);
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.state.translation.0 += dx;
        self.state.translation.1 += dy;
    }

    pub fn reset_view(&mut self) {
        self.pending_recenter = true;
    }

    /// New markup replaced the displayed diagram; prior pan/zoom is
    /// meaningless relative to the new content.
    pub fn content_replaced(&mut self) {
        self.pending_recenter = true;
    }

    pub fn content_cleared(&mut self) {
        self.state = ViewportState::default();
        self.pending_recenter = false;
    }

    /// Deferred re-center: runs once the host has mounted and measured the
    /// new markup. Returns whether a re-center actually ran.
    pub fn complete_layout(
        &mut self,
        content_size: (f32, f32),
        viewport_size: (f32, f32),
    ) -> bool {
        if !self.pending_recenter {
            return false;
        }
        self.pending_recenter = false;
        self.state.scale = 1.0;
        self.state.translation = (
            (viewport_size.0 - content_size.0) / 2.0,
            (viewport_size.1 - content_size.1) / 2.0,
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_respects_bounds_under_repetition() {
        let mut viewport = ViewportController::default();
        for _ in 0..200 {
            viewport.zoom_in();
        }
        assert!(viewport.scale() <= DEFAULT_MAX_SCALE);
        assert_eq!(viewport.scale(), DEFAULT_MAX_SCALE);

        for _ in 0..400 {
            viewport.zoom_out();
        }
        assert!(viewport.scale() >= DEFAULT_MIN_SCALE);
        assert_eq!(viewport.scale(), DEFAULT_MIN_SCALE);
    }

    #[test]
    fn recenter_is_deferred_until_layout_completes() {
        let mut viewport = ViewportController::default();
        viewport.zoom_in();
        viewport.pan_by(40.0, -10.0);

        viewport.content_replaced();
        assert!(viewport.recenter_pending());
        // State untouched until the host reports the measured size.
        assert_ne!(viewport.scale(), 1.0);

        assert!(viewport.complete_layout((400.0, 200.0), (1000.0, 800.0)));
        assert_eq!(viewport.scale(), 1.0);
        assert_eq!(viewport.translation(), (300.0, 300.0));
        // One-shot.
        assert!(!viewport.complete_layout((400.0, 200.0), (1000.0, 800.0)));
    }

    #[test]
    fn inverted_bounds_never_panic() {
        let mut viewport = ViewportController::new(8.0, 0.1, 0.1);
        viewport.zoom_in();
        viewport.zoom_out();
        viewport.set_scale(3.0);
        assert!(viewport.scale().is_finite());
    }

    #[test]
    fn clearing_content_resets_state() {
        let mut viewport = ViewportController::default();
        viewport.zoom_in();
        viewport.pan_by(5.0, 5.0);
        viewport.content_replaced();
        viewport.content_cleared();
        assert_eq!(viewport.state(), ViewportState::default());
        assert!(!viewport.recenter_pending());
    }
}
