//! Keeps playback inside the active A/B region.
//!
//! Two states. Unarmed holds nothing. Armed owns exactly one position observer
//! and one pause observer on the current handle, held as [`Subscription`]
//! guards, so leaving Armed by any path (disarm, re-arm, drop) detaches both.

use tracing::debug;

use crate::audio::types::EventKind;
use crate::markers::MarkerPair;
use crate::playback::handle::{PlaybackHandle, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Unarmed,
    Armed,
}

struct ArmedLoop {
    region: MarkerPair,
    _on_position: Subscription,
    on_pause: Subscription,
}

#[derive(Default)]
pub struct LoopController {
    armed: Option<ArmedLoop>,
}

impl LoopController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Armed while the observers are attached. A user pause detaches them from
    /// inside the pause observer, which releases the loop without a marker change.
    pub fn state(&self) -> LoopState {
        match &self.armed {
            Some(armed) if armed.on_pause.is_attached() => LoopState::Armed,
            _ => LoopState::Unarmed,
        }
    }

    /// The region being enforced, if armed.
    pub fn region(&self) -> Option<MarkerPair> {
        match self.state() {
            LoopState::Armed => self.armed.as_ref().map(|armed| armed.region),
            LoopState::Unarmed => None,
        }
    }

    /// Enter the state matching `pair`. Called after every marker edit; an
    /// active pair re-arms from scratch even if it was already armed.
    pub fn sync(&mut self, pair: MarkerPair, handle: &mut PlaybackHandle) {
        self.disarm();
        if pair.is_active() {
            self.arm(pair, handle);
        }
    }

    /// Detach both observers. Idempotent.
    pub fn disarm(&mut self) {
        if let Some(armed) = self.armed.take() {
            debug!(a = armed.region.a, b = armed.region.b, "Loop disarmed");
        }
    }

    fn arm(&mut self, region: MarkerPair, handle: &mut PlaybackHandle) {
        let MarkerPair { a, b } = region;

        handle.seek(a);
        handle.play();

        let on_position = handle.subscribe(EventKind::Position, move |ctl| {
            if ctl.position() >= b {
                ctl.seek(a);
                ctl.play();
            }
        });
        let position_id = on_position.id();
        let on_pause = handle.subscribe(EventKind::Paused, move |ctl| {
            ctl.unsubscribe(position_id);
            ctl.unsubscribe_current();
            debug!("Loop released by pause");
        });

        debug!(a, b, "Loop armed");
        self.armed = Some(ArmedLoop {
            region,
            _on_position: on_position,
            on_pause,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::types::{PlaybackEvent, SourceId};
    use crate::playback::handle::testing::{recording_handle, Call};

    fn assert_no_observers(handle: &PlaybackHandle) {
        assert_eq!(handle.observer_count(EventKind::Position), 0);
        assert_eq!(handle.observer_count(EventKind::Paused), 0);
    }

    #[test]
    fn active_pair_seeks_to_a_and_plays() {
        let (mut handle, calls) = recording_handle(1);
        let mut looper = LoopController::new();
        looper.sync(MarkerPair::new(2.0, 4.0), &mut handle);

        assert_eq!(looper.state(), LoopState::Armed);
        assert_eq!(*calls.borrow(), vec![Call::Seek(2.0), Call::Play]);
        assert_eq!(handle.observer_count(EventKind::Position), 1);
        assert_eq!(handle.observer_count(EventKind::Paused), 1);
    }

    #[test]
    fn wraps_to_a_at_or_past_b() {
        let (mut handle, calls) = recording_handle(1);
        let mut looper = LoopController::new();
        looper.sync(MarkerPair::new(2.0, 4.0), &mut handle);
        calls.borrow_mut().clear();

        handle.dispatch(SourceId(1), PlaybackEvent::Position(3.9));
        assert!(calls.borrow().is_empty());

        handle.dispatch(SourceId(1), PlaybackEvent::Position(4.0));
        assert_eq!(*calls.borrow(), vec![Call::Seek(2.0), Call::Play]);
        assert!(handle.position() >= 2.0 && handle.position() < 4.0);

        calls.borrow_mut().clear();
        handle.dispatch(SourceId(1), PlaybackEvent::Position(4.7));
        assert_eq!(*calls.borrow(), vec![Call::Seek(2.0), Call::Play]);
        assert_eq!(handle.position(), 2.0);
    }

    #[test]
    fn inactive_pairs_leave_nothing_attached() {
        for (a, b) in [(4.0, 4.0), (5.0, 1.0), (0.0, 0.0)] {
            let (mut handle, calls) = recording_handle(1);
            let mut looper = LoopController::new();
            looper.sync(MarkerPair::new(1.0, 3.0), &mut handle);
            looper.sync(MarkerPair::new(a, b), &mut handle);

            assert_eq!(looper.state(), LoopState::Unarmed);
            assert_no_observers(&handle);

            calls.borrow_mut().clear();
            handle.dispatch(SourceId(1), PlaybackEvent::Position(10.0));
            assert!(calls.borrow().is_empty());
        }
    }

    #[test]
    fn repeated_edits_do_not_accumulate_observers() {
        let (mut handle, _) = recording_handle(1);
        let mut looper = LoopController::new();
        for i in 0..25 {
            let a = i as f64 * 0.1;
            looper.sync(MarkerPair::new(a, a + 1.0), &mut handle);
            assert_eq!(handle.observer_count(EventKind::Position), 1);
            assert_eq!(handle.observer_count(EventKind::Paused), 1);
        }
        let last = 24.0 * 0.1;
        assert_eq!(looper.region(), Some(MarkerPair::new(last, last + 1.0)));
    }

    #[test]
    fn rearm_uses_latest_region() {
        let (mut handle, calls) = recording_handle(1);
        let mut looper = LoopController::new();
        looper.sync(MarkerPair::new(1.0, 2.0), &mut handle);
        looper.sync(MarkerPair::new(5.0, 8.0), &mut handle);
        calls.borrow_mut().clear();

        handle.dispatch(SourceId(1), PlaybackEvent::Position(2.5));
        assert!(calls.borrow().is_empty());
        handle.dispatch(SourceId(1), PlaybackEvent::Position(8.0));
        assert_eq!(*calls.borrow(), vec![Call::Seek(5.0), Call::Play]);
    }

    #[test]
    fn pause_releases_loop() {
        let (mut handle, calls) = recording_handle(1);
        let mut looper = LoopController::new();
        looper.sync(MarkerPair::new(1.0, 2.0), &mut handle);
        handle.dispatch(SourceId(1), PlaybackEvent::Paused);

        assert_eq!(looper.state(), LoopState::Unarmed);
        assert_no_observers(&handle);

        calls.borrow_mut().clear();
        handle.dispatch(SourceId(1), PlaybackEvent::Position(3.0));
        assert!(calls.borrow().is_empty());

        // Disarming after a release is harmless.
        looper.disarm();
        assert_no_observers(&handle);
    }

    #[test]
    fn reset_to_whole_source_arms() {
        let mut markers = crate::markers::MarkerModel::new();
        markers.set_duration(120.0);
        markers.reset(120.0);

        let (mut handle, calls) = recording_handle(1);
        let mut looper = LoopController::new();
        looper.sync(markers.pair(), &mut handle);

        assert_eq!(looper.region(), Some(MarkerPair::new(0.0, 120.0)));
        assert_eq!(*calls.borrow(), vec![Call::Seek(0.0), Call::Play]);
    }

    #[test]
    fn dropping_controller_detaches() {
        let (mut handle, _) = recording_handle(1);
        let mut looper = LoopController::new();
        looper.sync(MarkerPair::new(1.0, 2.0), &mut handle);
        drop(looper);
        assert_no_observers(&handle);
    }
}
