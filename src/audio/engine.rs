use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, error, warn};

use super::types::{AudioCommand, AudioData, AudioEvent, EventKind, PlaybackEvent, SourceId};
use crate::error::AudioError;

/// How often (in output frames) to send position updates.
const POSITION_UPDATE_INTERVAL: usize = 2048;
/// Silence played after the end of the source before reporting a pause,
/// expressed as a fraction of a second (1 / 4 = 250 ms).
const END_GRACE_DIVISOR: u32 = 4;

struct EngineState {
    audio: Option<Arc<AudioData>>,
    source: Option<SourceId>,
    /// Read position in source frames. Fractional so the source can be
    /// stepped at a different rate than the output device.
    cursor: f64,
    playing: bool,
    output_sample_rate: u32,
    frames_since_update: usize,
    /// Output frames written since the cursor ran past the last source frame.
    ended_frames: usize,
    /// Latest play/pause event that found the event channel full. Positions
    /// may be dropped; play state may not.
    held_state: Option<(SourceId, PlaybackEvent)>,
}

impl EngineState {
    fn new(output_sample_rate: u32) -> Self {
        Self {
            audio: None,
            source: None,
            cursor: 0.0,
            playing: false,
            output_sample_rate,
            frames_since_update: 0,
            ended_frames: 0,
            held_state: None,
        }
    }

    fn emit(&mut self, event_tx: &Sender<AudioEvent>, event: PlaybackEvent) {
        let Some(source) = self.source else {
            return;
        };
        if event.kind() == EventKind::Position {
            let _ = event_tx.try_send(AudioEvent::Playback(source, event));
            return;
        }

        self.flush_held(event_tx);
        if self.held_state.is_some() {
            self.held_state = Some((source, event));
            return;
        }
        if let Err(TrySendError::Full(_)) = event_tx.try_send(AudioEvent::Playback(source, event)) {
            warn!(?event, "Event channel full, holding play state");
            self.held_state = Some((source, event));
        }
    }

    /// Retry a held play/pause event. Called at the start of every callback.
    fn flush_held(&mut self, event_tx: &Sender<AudioEvent>) {
        if let Some((source, event)) = self.held_state.take() {
            if let Err(TrySendError::Full(_)) =
                event_tx.try_send(AudioEvent::Playback(source, event))
            {
                self.held_state = Some((source, event));
            }
        }
    }

    fn position_secs(&self) -> f64 {
        match &self.audio {
            Some(audio) => self.cursor / audio.sample_rate as f64,
            None => 0.0,
        }
    }

    fn handle_command(&mut self, cmd: AudioCommand, event_tx: &Sender<AudioEvent>) {
        match cmd {
            AudioCommand::Load { source, data } => {
                if self.playing {
                    self.playing = false;
                    self.emit(event_tx, PlaybackEvent::Paused);
                }
                self.audio = Some(data);
                self.source = Some(source);
                self.cursor = 0.0;
                self.ended_frames = 0;
                self.frames_since_update = 0;
            }
            AudioCommand::Play => {
                let Some(audio) = &self.audio else {
                    return;
                };
                if self.cursor as usize >= audio.num_frames() {
                    self.cursor = 0.0;
                    self.ended_frames = 0;
                }
                if !self.playing {
                    self.playing = true;
                    self.emit(event_tx, PlaybackEvent::Played);
                }
            }
            AudioCommand::Pause => {
                if self.playing {
                    self.playing = false;
                    self.emit(event_tx, PlaybackEvent::Paused);
                }
            }
            AudioCommand::Seek(time) => {
                if let Some(audio) = &self.audio {
                    let frame = (time.max(0.0) * audio.sample_rate as f64).floor();
                    self.cursor = frame.min(audio.num_frames() as f64);
                    self.ended_frames = 0;
                    let pos = self.position_secs();
                    self.emit(event_tx, PlaybackEvent::Position(pos));
                }
            }
            AudioCommand::Shutdown => {
                if self.playing {
                    self.playing = false;
                    self.emit(event_tx, PlaybackEvent::Paused);
                }
                self.audio = None;
                self.source = None;
            }
        }
    }

    /// Fill the output buffer with source audio.
    fn fill_buffer(&mut self, output: &mut [f32], channels: u16, event_tx: &Sender<AudioEvent>) {
        if !self.playing {
            output.fill(0.0);
            return;
        }

        let audio = match &self.audio {
            Some(a) => a.clone(),
            None => {
                output.fill(0.0);
                return;
            }
        };

        let audio_channels = audio.channels as usize;
        let out_channels = channels as usize;
        let total_frames = audio.num_frames();
        let step = audio.sample_rate as f64 / self.output_sample_rate as f64;

        for frame in output.chunks_mut(out_channels) {
            let index = self.cursor as usize;
            if index >= total_frames {
                frame.fill(0.0);
                if self.ended_frames == 0 {
                    self.emit(event_tx, PlaybackEvent::Position(audio.duration));
                }
                self.ended_frames += 1;
                continue;
            }

            // Channel conversion: wrap the output channel onto the source layout.
            for (c, sample) in frame.iter_mut().enumerate() {
                *sample = audio.samples[index * audio_channels + c % audio_channels];
            }
            self.cursor += step;

            self.frames_since_update += 1;
            if self.frames_since_update >= POSITION_UPDATE_INTERVAL {
                self.frames_since_update = 0;
                let pos = self.position_secs();
                self.emit(event_tx, PlaybackEvent::Position(pos));
            }
        }

        // Give position observers time to seek away from the end before stopping.
        let grace = (self.output_sample_rate / END_GRACE_DIVISOR) as usize;
        if self.ended_frames >= grace {
            self.playing = false;
            self.ended_frames = 0;
            debug!("Reached end of source");
            self.emit(event_tx, PlaybackEvent::Paused);
        }
    }
}

/// Spawn the audio engine thread and return command/event channels.
pub fn spawn_engine() -> Result<(Sender<AudioCommand>, Receiver<AudioEvent>), AudioError> {
    let (cmd_tx, cmd_rx) = crossbeam_channel::bounded::<AudioCommand>(64);
    let (event_tx, event_rx) = crossbeam_channel::bounded::<AudioEvent>(256);

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(AudioError::NoOutputDevice)?;

    let config = device
        .default_output_config()
        .map_err(|e| AudioError::OutputConfig(e.to_string()))?;

    let sample_rate = config.sample_rate();
    let channels = config.channels();
    let sample_format = config.sample_format();

    let mut state = EngineState::new(sample_rate);
    let event_tx_clone = event_tx.clone();
    let error_tx = event_tx.clone();

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    state.flush_held(&event_tx_clone);
                    // Process commands
                    while let Ok(cmd) = cmd_rx.try_recv() {
                        state.handle_command(cmd, &event_tx_clone);
                    }
                    state.fill_buffer(data, channels, &event_tx_clone);
                },
                move |err| {
                    error!("Audio stream error: {err}");
                    let _ = error_tx.try_send(AudioEvent::Error(err.to_string()));
                },
                None,
            )
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?,
        _ => return Err(AudioError::UnsupportedFormat(format!("{sample_format:?}"))),
    };

    stream
        .play()
        .map_err(|e| AudioError::StreamPlay(e.to_string()))?;

    // Keep stream alive by moving it into a thread
    std::thread::Builder::new()
        .name("audio-keepalive".into())
        .spawn(move || {
            let _stream = stream;
            loop {
                std::thread::park();
            }
        })
        .map_err(|e| AudioError::Thread(e.to_string()))?;

    debug!(sample_rate, channels, "Audio engine started");
    Ok((cmd_tx, event_rx))
}
