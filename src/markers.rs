//! A/B marker pair and the session duration it is measured against.

use tracing::debug;

/// The user-selected `[a, b)` region, in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MarkerPair {
    pub a: f64,
    pub b: f64,
}

impl MarkerPair {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    /// Looping and cutting are only enabled for an active pair.
    pub fn is_active(&self) -> bool {
        self.a >= 0.0 && self.a < self.b
    }
}

/// Holds the latest marker pair for the loaded source. Values are stored as
/// given; clamping into the source is left to the widget that edits them.
#[derive(Debug, Default)]
pub struct MarkerModel {
    pair: MarkerPair,
    duration: Option<f64>,
}

impl MarkerModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pair(&self) -> MarkerPair {
        self.pair
    }

    pub fn is_active(&self) -> bool {
        self.pair.is_active()
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn set_markers(&mut self, a: f64, b: f64) {
        self.pair = MarkerPair::new(a, b);
        debug!(a, b, active = self.pair.is_active(), "Markers set");
    }

    /// Select the whole source.
    pub fn reset(&mut self, duration: f64) {
        self.set_markers(0.0, duration);
    }

    /// Record the duration reported for the current source.
    pub fn set_duration(&mut self, duration: f64) {
        self.duration = Some(duration);
    }

    /// Forget everything about the previous source.
    pub fn clear(&mut self) {
        self.pair = MarkerPair::default();
        self.duration = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_only_when_a_before_b() {
        assert!(MarkerPair::new(1.0, 2.0).is_active());
        assert!(!MarkerPair::new(2.0, 2.0).is_active());
        assert!(!MarkerPair::new(3.0, 2.0).is_active());
        assert!(!MarkerPair::new(-1.0, 2.0).is_active());
        assert!(!MarkerPair::new(f64::NAN, 2.0).is_active());
    }

    #[test]
    fn stores_pair_verbatim() {
        let mut model = MarkerModel::new();
        model.set_markers(7.5, 3.0);
        assert_eq!(model.pair(), MarkerPair::new(7.5, 3.0));
        assert!(!model.is_active());
    }

    #[test]
    fn reset_selects_whole_source() {
        let mut model = MarkerModel::new();
        model.set_duration(120.0);
        model.reset(120.0);
        assert_eq!(model.pair(), MarkerPair::new(0.0, 120.0));
        assert!(model.is_active());
    }

    #[test]
    fn clear_forgets_duration() {
        let mut model = MarkerModel::new();
        model.set_duration(30.0);
        model.set_markers(1.0, 2.0);
        model.clear();
        assert_eq!(model.duration(), None);
        assert!(!model.is_active());
    }
}
