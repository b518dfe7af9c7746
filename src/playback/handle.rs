//! The play/seek surface of one loaded source, plus the observers attached to it.
//!
//! Observers are registered with [`PlaybackHandle::subscribe`] and stay attached
//! for as long as the returned [`Subscription`] is alive. Engine events are fed
//! in through [`PlaybackHandle::dispatch`] on the UI thread, so every callback
//! runs on the same timeline as the rest of the application state.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crossbeam_channel::Sender;
use tracing::{trace, warn};

use crate::audio::types::{AudioCommand, EventKind, PlaybackEvent, SourceId};

/// Where seek/play/pause requests end up.
pub trait Transport {
    fn seek(&mut self, secs: f64);
    fn play(&mut self);
    fn pause(&mut self);
}

/// Forwards transport requests to the audio engine thread.
pub struct EngineTransport {
    cmd_tx: Sender<AudioCommand>,
}

impl EngineTransport {
    pub fn new(cmd_tx: Sender<AudioCommand>) -> Self {
        Self { cmd_tx }
    }

    fn send(&self, cmd: AudioCommand) {
        if let Err(e) = self.cmd_tx.send(cmd) {
            warn!("Audio engine gone, dropped command: {:?}", e.into_inner());
        }
    }
}

impl Transport for EngineTransport {
    fn seek(&mut self, secs: f64) {
        self.send(AudioCommand::Seek(secs));
    }

    fn play(&mut self) {
        self.send(AudioCommand::Play);
    }

    fn pause(&mut self) {
        self.send(AudioCommand::Pause);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type ObserverFn = Box<dyn FnMut(&mut PlaybackControls<'_>)>;

struct Observer {
    id: SubscriptionId,
    kind: EventKind,
    /// Taken out while the callback runs.
    callback: Option<ObserverFn>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    observers: Vec<Observer>,
}

impl Registry {
    fn insert(&mut self, kind: EventKind, callback: ObserverFn) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.observers.push(Observer {
            id,
            kind,
            callback: Some(callback),
        });
        id
    }

    fn remove(&mut self, id: SubscriptionId) {
        self.observers.retain(|o| o.id != id);
    }

    fn contains(&self, id: SubscriptionId) -> bool {
        self.observers.iter().any(|o| o.id == id)
    }

    fn take_callback(&mut self, id: SubscriptionId) -> Option<ObserverFn> {
        self.observers
            .iter_mut()
            .find(|o| o.id == id)?
            .callback
            .take()
    }

    fn restore_callback(&mut self, id: SubscriptionId, callback: ObserverFn) {
        // Stays dropped if the observer detached itself while running.
        if let Some(observer) = self.observers.iter_mut().find(|o| o.id == id) {
            observer.callback = Some(callback);
        }
    }
}

/// Keeps one observer attached. Dropping it detaches the observer; detaching
/// twice, or after the handle is gone, is a no-op.
#[must_use = "dropping a Subscription detaches its observer"]
pub struct Subscription {
    id: SubscriptionId,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// False once the observer was detached from inside a callback or the
    /// handle was dropped.
    pub fn is_attached(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.borrow().contains(self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// What an observer callback may do to the handle that notified it.
pub struct PlaybackControls<'a> {
    transport: &'a mut dyn Transport,
    position: &'a mut f64,
    registry: &'a RefCell<Registry>,
    current: SubscriptionId,
}

impl PlaybackControls<'_> {
    pub fn position(&self) -> f64 {
        *self.position
    }

    pub fn seek(&mut self, secs: f64) {
        *self.position = secs;
        self.transport.seek(secs);
    }

    pub fn play(&mut self) {
        self.transport.play();
    }

    /// Detach another observer of the same handle.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.registry.borrow_mut().remove(id);
    }

    /// Detach the observer that is currently running.
    pub fn unsubscribe_current(&mut self) {
        let id = self.current;
        self.unsubscribe(id);
    }
}

/// The play/seek surface of the currently loaded source. Replaced wholesale
/// when another file is loaded.
pub struct PlaybackHandle {
    source: SourceId,
    transport: Box<dyn Transport>,
    /// Last reported (or locally requested) position in seconds.
    position: f64,
    /// Last reported play state.
    playing: bool,
    registry: Rc<RefCell<Registry>>,
}

impl PlaybackHandle {
    pub fn new(source: SourceId, transport: Box<dyn Transport>) -> Self {
        Self {
            source,
            transport,
            position: 0.0,
            playing: false,
            registry: Rc::new(RefCell::new(Registry::default())),
        }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn seek(&mut self, secs: f64) {
        self.position = secs;
        self.transport.seek(secs);
    }

    pub fn play(&mut self) {
        self.transport.play();
    }

    pub fn pause(&mut self) {
        self.transport.pause();
    }

    /// Attach `callback` to every event of `kind` until the returned guard is dropped.
    pub fn subscribe<F>(&mut self, kind: EventKind, callback: F) -> Subscription
    where
        F: FnMut(&mut PlaybackControls<'_>) + 'static,
    {
        let id = self.registry.borrow_mut().insert(kind, Box::new(callback));
        trace!(?id, ?kind, "Observer attached");
        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    #[cfg(test)]
    pub fn observer_count(&self, kind: EventKind) -> usize {
        self.registry
            .borrow()
            .observers
            .iter()
            .filter(|o| o.kind == kind)
            .count()
    }

    /// Apply an engine event and run the observers registered for its kind.
    pub fn dispatch(&mut self, source: SourceId, event: PlaybackEvent) {
        if source != self.source {
            trace!(?source, current = ?self.source, "Dropped event for replaced source");
            return;
        }

        match event {
            PlaybackEvent::Position(secs) => self.position = secs,
            PlaybackEvent::Played => self.playing = true,
            PlaybackEvent::Paused => self.playing = false,
        }

        let kind = event.kind();
        let ids: Vec<SubscriptionId> = self
            .registry
            .borrow()
            .observers
            .iter()
            .filter(|o| o.kind == kind)
            .map(|o| o.id)
            .collect();

        for id in ids {
            // Gone if an earlier observer in this round detached it.
            let Some(mut callback) = self.registry.borrow_mut().take_callback(id) else {
                continue;
            };
            let mut controls = PlaybackControls {
                transport: self.transport.as_mut(),
                position: &mut self.position,
                registry: &*self.registry,
                current: id,
            };
            callback(&mut controls);
            self.registry.borrow_mut().restore_callback(id, callback);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Seek(f64),
        Play,
        Pause,
    }

    /// Records transport requests instead of driving an engine.
    #[derive(Clone, Default)]
    pub struct RecordingTransport {
        pub calls: Rc<RefCell<Vec<Call>>>,
    }

    impl Transport for RecordingTransport {
        fn seek(&mut self, secs: f64) {
            self.calls.borrow_mut().push(Call::Seek(secs));
        }

        fn play(&mut self) {
            self.calls.borrow_mut().push(Call::Play);
        }

        fn pause(&mut self) {
            self.calls.borrow_mut().push(Call::Pause);
        }
    }

    pub fn recording_handle(source: u64) -> (PlaybackHandle, Rc<RefCell<Vec<Call>>>) {
        let transport = RecordingTransport::default();
        let calls = transport.calls.clone();
        (
            PlaybackHandle::new(SourceId(source), Box::new(transport)),
            calls,
        )
    }
}
