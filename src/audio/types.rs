use std::sync::Arc;

/// Decoded audio data stored entirely in memory.
#[derive(Clone, Debug)]
pub struct AudioData {
    /// Interleaved samples normalized to [-1.0, 1.0].
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Duration in seconds.
    pub duration: f64,
}

impl AudioData {
    /// Total number of frames (samples per channel).
    pub fn num_frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Mix down to mono, returning one sample per frame.
    pub fn to_mono(&self) -> Vec<f32> {
        let ch = self.channels as usize;
        if ch == 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks_exact(ch)
            .map(|frame| frame.iter().sum::<f32>() / ch as f32)
            .collect()
    }
}

/// Identifies one loaded source. Every file load gets a fresh id so events
/// emitted for a replaced source can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u64);

/// Commands sent from the UI thread to the audio thread.
#[derive(Debug, Clone)]
pub enum AudioCommand {
    Load {
        source: SourceId,
        data: Arc<AudioData>,
    },
    Play,
    Pause,
    Seek(f64),
    Shutdown,
}

/// What the engine reports about the currently loaded source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    /// Playback position advanced or jumped, in seconds.
    Position(f64),
    Played,
    Paused,
}

impl PlaybackEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PlaybackEvent::Position(_) => EventKind::Position,
            PlaybackEvent::Played => EventKind::Played,
            PlaybackEvent::Paused => EventKind::Paused,
        }
    }
}

/// Event categories a playback observer can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Position,
    Played,
    Paused,
}

/// Events sent from the audio thread to the UI thread.
#[derive(Debug, Clone)]
pub enum AudioEvent {
    Playback(SourceId, PlaybackEvent),
    Error(String),
}
