use std::cell::Cell;
use std::rc::Rc;

use crate::audio::types::EventKind;

use super::handle::{PlaybackHandle, Subscription};

/// Republishes the handle's play/pause events as a single flag.
///
/// Driven only by what the handle reports, never by which button was pressed,
/// since the loop controller and the engine also start and stop playback.
#[derive(Debug, Default)]
pub struct PlaybackMirror {
    playing: Rc<Cell<bool>>,
    subscriptions: Vec<Subscription>,
}

impl PlaybackMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.get()
    }

    /// Follow `handle`, dropping any previous subscriptions first.
    pub fn attach(&mut self, handle: &mut PlaybackHandle) {
        self.detach();
        self.playing.set(handle.is_playing());

        let on_play = self.playing.clone();
        let on_pause = self.playing.clone();
        self.subscriptions.push(handle.subscribe(EventKind::Played, move |_| on_play.set(true)));
        self.subscriptions.push(handle.subscribe(EventKind::Paused, move |_| on_pause.set(false)));
    }

    pub fn detach(&mut self) {
        self.subscriptions.clear();
        self.playing.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::types::{PlaybackEvent, SourceId};
    use crate::playback::handle::testing::recording_handle;

    #[test]
    fn follows_handle_events() {
        let (mut handle, _) = recording_handle(1);
        let mut mirror = PlaybackMirror::new();
        mirror.attach(&mut handle);
        assert!(!mirror.is_playing());

        handle.dispatch(SourceId(1), PlaybackEvent::Played);
        assert!(mirror.is_playing());
        handle.dispatch(SourceId(1), PlaybackEvent::Paused);
        assert!(!mirror.is_playing());
    }

    #[test]
    fn reattach_moves_to_new_handle() {
        let (mut old, _) = recording_handle(1);
        let (mut new, _) = recording_handle(2);
        let mut mirror = PlaybackMirror::new();

        mirror.attach(&mut old);
        old.dispatch(SourceId(1), PlaybackEvent::Played);
        mirror.attach(&mut new);

        assert_eq!(old.observer_count(EventKind::Played), 0);
        assert_eq!(old.observer_count(EventKind::Paused), 0);
        assert_eq!(new.observer_count(EventKind::Played), 1);
        assert!(!mirror.is_playing());

        old.dispatch(SourceId(1), PlaybackEvent::Played);
        assert!(!mirror.is_playing());
    }

    #[test]
    fn detach_releases_everything() {
        let (mut handle, _) = recording_handle(1);
        let mut mirror = PlaybackMirror::new();
        mirror.attach(&mut handle);
        mirror.detach();
        assert_eq!(handle.observer_count(EventKind::Played), 0);
        assert_eq!(handle.observer_count(EventKind::Paused), 0);
    }
}
