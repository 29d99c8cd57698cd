//! Zoom controller for the content pane.
//!
//! Maintains a multiplicative scale factor and projects it onto the pane's
//! effective wrap width. The factor itself is never clamped; only the
//! projected width is floored at one column so layout math stays valid.

/// Multiplier applied by one zoom-in step.
pub const ZOOM_IN_FACTOR: f64 = 1.2;
/// Multiplier applied by one zoom-out step.
pub const ZOOM_OUT_FACTOR: f64 = 0.8;

/// Process-wide zoom scale, owned by the app controller.
#[derive(Debug, Clone, Copy)]
pub struct ZoomState {
    level: f64,
}

impl ZoomState {
    pub fn new() -> Self {
        Self { level: 1.0 }
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn zoom_in(&mut self) {
        self.level *= ZOOM_IN_FACTOR;
    }

    pub fn zoom_out(&mut self) {
        self.level *= ZOOM_OUT_FACTOR;
    }

    /// Reset returns to exactly 1.0, independent of accumulated drift.
    pub fn reset(&mut self) {
        self.level = 1.0;
    }

    /// Whether the scale differs from the default.
    pub fn is_zoomed(&self) -> bool {
        self.level != 1.0
    }

    /// Effective wrap width for a pane `base` columns wide.
    ///
    /// Zooming in narrows the wrap width (text reflows larger-feeling);
    /// zooming out widens it. The width is floored at 1 and capped at
    /// `u16::MAX`; the scale factor itself is unbounded.
    pub fn content_width(&self, base: u16) -> u16 {
        let scaled = (base as f64 / self.level).round();
        scaled.clamp(1.0, u16::MAX as f64) as u16
    }

    /// Zoom percentage for the status bar, e.g. `96` for level 0.96.
    pub fn percent(&self) -> u32 {
        (self.level * 100.0).round().clamp(0.0, u32::MAX as f64) as u32
    }
}

impl Default for ZoomState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_unity() {
        let zoom = ZoomState::new();
        assert_eq!(zoom.level(), 1.0);
        assert!(!zoom.is_zoomed());
    }

    #[test]
    fn in_then_out_drifts_below_unity() {
        let mut zoom = ZoomState::new();
        zoom.zoom_in();
        zoom.zoom_out();
        // 1.2 * 0.8 = 0.96 — the pair is not an inverse.
        assert!((zoom.level() - 0.96).abs() < 1e-12);
        assert_ne!(zoom.level(), 1.0);
        assert!(zoom.is_zoomed());
    }

    #[test]
    fn reset_returns_exactly_to_unity() {
        let mut zoom = ZoomState::new();
        for _ in 0..7 {
            zoom.zoom_in();
        }
        zoom.zoom_out();
        zoom.reset();
        assert_eq!(zoom.level(), 1.0);
    }

    #[test]
    fn no_bounds_clamping_on_level() {
        let mut zoom = ZoomState::new();
        for _ in 0..50 {
            zoom.zoom_in();
        }
        assert!(zoom.level() > 1000.0);
        for _ in 0..200 {
            zoom.zoom_out();
        }
        assert!(zoom.level() < 1e-10);
        assert!(zoom.level() > 0.0);
    }

    #[test]
    fn content_width_narrows_when_zoomed_in() {
        let mut zoom = ZoomState::new();
        assert_eq!(zoom.content_width(120), 120);
        zoom.zoom_in();
        assert_eq!(zoom.content_width(120), 100);
    }

    #[test]
    fn content_width_widens_when_zoomed_out() {
        let mut zoom = ZoomState::new();
        zoom.zoom_out();
        assert_eq!(zoom.content_width(80), 100);
    }

    #[test]
    fn content_width_floors_at_one_column() {
        let mut zoom = ZoomState::new();
        for _ in 0..60 {
            zoom.zoom_in();
        }
        assert_eq!(zoom.content_width(80), 1);
    }

    #[test]
    fn percent_rounds() {
        let mut zoom = ZoomState::new();
        assert_eq!(zoom.percent(), 100);
        zoom.zoom_in();
        zoom.zoom_out();
        assert_eq!(zoom.percent(), 96);
    }
}
