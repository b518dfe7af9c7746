use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use iced::keyboard;
use iced::widget::{canvas, center, column, container, text};
use iced::{Color, Element, Length, Subscription, Task, Theme};
use tracing::{debug, error, info, warn};

use crate::audio::decoder;
use crate::audio::engine;
use crate::audio::types::*;
use crate::config::Config;
use crate::cut::job::BoundaryPort;
use crate::cut::{self, CutJobs, CutOutcome, CutSource, CutterChannel};
use crate::error::CutError;
use crate::looping::LoopController;
use crate::markers::MarkerModel;
use crate::notify::{NotificationId, NotificationKind, Notifier};
use crate::playback::{EngineTransport, PlaybackHandle, PlaybackMirror};
use crate::ui::controls::{self, ControlMessage, ControlsState};
use crate::ui::waveform::{WaveformMessage, WaveformView, MIN_ZOOM};
use crate::waveform_cache::WaveformPeaks;

/// The file currently loaded, with the handle that plays it.
struct LoadedSource {
    path: PathBuf,
    file_name: String,
    handle: PlaybackHandle,
}

pub struct App {
    config: Config,

    // Audio engine channels
    cmd_tx: Option<Sender<AudioCommand>>,
    event_rx: Option<Receiver<AudioEvent>>,

    // Cut worker channel
    cutter: Option<CutterChannel>,

    // State
    source: Option<LoadedSource>,
    next_source_id: u64,
    markers: MarkerModel,
    looper: LoopController,
    mirror: PlaybackMirror,
    cuts: CutJobs,
    notifier: Notifier,
    error: Option<String>,

    // Waveform
    waveform_view: WaveformView,
    /// One-shot request to scroll the waveform onto the A/B region.
    center_on_ab: bool,
}

#[derive(Debug, Clone)]
pub enum Message {
    EngineReady(Result<(Sender<AudioCommand>, Receiver<AudioEvent>), String>),
    FileDialogResult(Option<PathBuf>),
    FileLoaded(Result<(AudioData, PathBuf), String>),
    Control(ControlMessage),
    Waveform(WaveformMessage),
    Tick,
    KeyEvent(keyboard::Event),
    NotificationExpired(NotificationId),
}

fn boot(config: Config) -> (App, Task<Message>) {
    let cutter = match cut::worker::spawn(config.cutter.clone()) {
        Ok(channel) => Some(channel),
        Err(e) => {
            error!("Failed to start cut worker: {e}");
            None
        }
    };

    let app = App {
        notifier: Notifier::new(config.notification_timeout()),
        config,
        cmd_tx: None,
        event_rx: None,
        cutter,
        source: None,
        next_source_id: 0,
        markers: MarkerModel::new(),
        looper: LoopController::new(),
        mirror: PlaybackMirror::new(),
        cuts: CutJobs::new(),
        error: None,
        waveform_view: WaveformView::new(),
        center_on_ab: false,
    };

    let task = Task::perform(
        async {
            tokio::task::spawn_blocking(|| engine::spawn_engine().map_err(|e| e.to_string()))
                .await
                .unwrap_or_else(|e| Err(format!("Audio engine task failed: {e}")))
        },
        Message::EngineReady,
    );

    (app, task)
}

fn title(app: &App) -> String {
    match &app.source {
        Some(source) => format!("Loopcut - {}", source.file_name),
        None => "Loopcut".to_string(),
    }
}

impl App {
    fn notify(&mut self, kind: NotificationKind, text: impl Into<String>) -> Task<Message> {
        let id = self.notifier.notify(kind, text, Instant::now());
        let timeout = self.notifier.timeout();
        Task::perform(tokio::time::sleep(timeout), move |_| {
            Message::NotificationExpired(id)
        })
    }

    /// Push the current marker pair to the waveform and the loop controller.
    fn apply_markers(&mut self) {
        let pair = self.markers.pair();
        self.waveform_view.markers = pair.is_active().then_some((pair.a, pair.b));
        match &mut self.source {
            Some(source) => self.looper.sync(pair, &mut source.handle),
            None => self.looper.disarm(),
        }
        debug!(region = ?self.looper.region(), "Loop synced");
    }

    fn load_source(&mut self, data: AudioData, path: PathBuf) -> Task<Message> {
        let Some(cmd_tx) = self.cmd_tx.clone() else {
            return self.notify(NotificationKind::Error, "Audio engine not ready");
        };

        // Leave the old handle before it is replaced.
        self.looper.disarm();
        self.mirror.detach();
        self.source = None;

        self.next_source_id += 1;
        let source_id = SourceId(self.next_source_id);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let peaks = WaveformPeaks::compute(&data);
        self.waveform_view
            .set_peaks(peaks, data.num_frames(), data.duration);
        self.markers.clear();
        self.markers.set_duration(data.duration);
        self.error = None;

        if cmd_tx
            .send(AudioCommand::Load {
                source: source_id,
                data: Arc::new(data),
            })
            .is_err()
        {
            warn!("Audio engine gone while loading source");
        }

        let mut handle = PlaybackHandle::new(source_id, Box::new(EngineTransport::new(cmd_tx)));
        info!(file = %file_name, source = ?handle.source(), "Source loaded");
        self.mirror.attach(&mut handle);
        self.source = Some(LoadedSource {
            path,
            file_name,
            handle,
        });
        self.apply_markers();
        Task::none()
    }

    fn start_cut(&mut self) -> Task<Message> {
        let source = self.source.as_ref().map(|s| CutSource {
            path: &s.path,
            file_name: &s.file_name,
        });
        let port = self.cutter.as_ref().map(|c| c as &dyn BoundaryPort);
        let started = self
            .cuts
            .start(self.markers.pair(), source, port)
            .map(|job| job.request.filename.clone());

        match started {
            Ok(filename) => {
                info!(%filename, "Cut job queued");
                self.notify(
                    NotificationKind::Info,
                    "Processing... your download will start soon",
                )
            }
            // The control is disabled in these states.
            Err(CutError::InactiveRegion | CutError::JobInFlight) => Task::none(),
            Err(e) => {
                warn!("Cut not started: {e}");
                self.notify(NotificationKind::Error, e.to_string())
            }
        }
    }

    fn seek_by(&mut self, delta: f64) {
        let duration = self.markers.duration().unwrap_or(0.0);
        if let Some(source) = &mut self.source {
            let target = (source.handle.position() + delta).clamp(0.0, duration);
            source.handle.seek(target);
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(tx) = &self.cmd_tx {
            let _ = tx.send(AudioCommand::Shutdown);
        }
    }
}

fn update(app: &mut App, message: Message) -> Task<Message> {
    match message {
        Message::EngineReady(result) => match result {
            Ok((tx, rx)) => {
                app.cmd_tx = Some(tx);
                app.event_rx = Some(rx);
                Task::none()
            }
            Err(e) => {
                error!("Audio engine error: {e}");
                app.error = Some(format!("Audio engine error: {e}"));
                Task::none()
            }
        },
        Message::Control(ctrl) => match ctrl {
            ControlMessage::OpenFile => {
                if app.mirror.is_playing() {
                    return Task::none();
                }
                Task::perform(
                    async {
                        let handle = rfd::AsyncFileDialog::new()
                            .add_filter(
                                "Media",
                                &["mp3", "wav", "flac", "ogg", "aac", "m4a", "mp4", "m4v", "mov"],
                            )
                            .pick_file()
                            .await;
                        handle.map(|h| h.path().to_path_buf())
                    },
                    Message::FileDialogResult,
                )
            }
            ControlMessage::PlayPause => {
                let playing = app.mirror.is_playing();
                if let Some(source) = &mut app.source {
                    if playing {
                        source.handle.pause();
                    } else {
                        source.handle.play();
                    }
                }
                Task::none()
            }
            ControlMessage::ResetMarkers => {
                if app.mirror.is_playing() {
                    return Task::none();
                }
                if let Some(duration) = app.markers.duration() {
                    app.markers.reset(duration);
                    app.apply_markers();
                }
                Task::none()
            }
            ControlMessage::Cut => app.start_cut(),
            ControlMessage::ZoomChanged(zoom) => {
                app.waveform_view.set_zoom(zoom);
                Task::none()
            }
            ControlMessage::ResetZoom => {
                app.waveform_view.set_zoom(MIN_ZOOM);
                Task::none()
            }
            ControlMessage::CenterOnRegion => {
                app.center_on_ab = true;
                Task::none()
            }
        },
        Message::FileDialogResult(path) => {
            if let Some(path) = path {
                Task::perform(
                    async move {
                        tokio::task::spawn_blocking(move || {
                            decoder::decode_file(&path)
                                .map(|data| (data, path))
                                .map_err(|e| e.to_string())
                        })
                        .await
                        .unwrap_or_else(|e| Err(format!("Decoder task failed: {e}")))
                    },
                    Message::FileLoaded,
                )
            } else {
                Task::none()
            }
        }
        Message::FileLoaded(result) => match result {
            Ok((data, path)) => app.load_source(data, path),
            Err(e) => {
                warn!("Failed to load file: {e}");
                app.error = Some(e.clone());
                app.notify(NotificationKind::Error, e)
            }
        },
        Message::Waveform(wm) => match wm {
            WaveformMessage::Seek(time) => {
                if let Some(source) = &mut app.source {
                    source.handle.seek(time);
                }
                Task::none()
            }
            WaveformMessage::MarkersChanged(a, b) => {
                app.markers.set_markers(a, b);
                app.apply_markers();
                Task::none()
            }
        },
        Message::Tick => {
            let events: Vec<AudioEvent> = app
                .event_rx
                .as_ref()
                .map(|rx| rx.try_iter().collect())
                .unwrap_or_default();
            for event in events {
                match event {
                    AudioEvent::Playback(source_id, event) => {
                        if let Some(source) = &mut app.source {
                            source.handle.dispatch(source_id, event);
                        }
                    }
                    AudioEvent::Error(e) => {
                        app.error = Some(e);
                    }
                }
            }
            if let Some(source) = &app.source {
                app.waveform_view.playback_position = source.handle.position();
            }

            // The waveform consumes the center request once.
            if std::mem::take(&mut app.center_on_ab) {
                let pair = app.markers.pair();
                if pair.is_active() {
                    app.waveform_view.center_on(pair.a, pair.b);
                }
            }

            let inbound: Vec<String> = app
                .cutter
                .as_ref()
                .map(|c| c.drain().collect())
                .unwrap_or_default();
            let mut tasks = Vec::new();
            for raw in inbound {
                match app.cuts.handle_message(&raw) {
                    Some(CutOutcome::Succeeded { filename }) => tasks.push(app.notify(
                        NotificationKind::Success,
                        format!("Clip ready: {filename}"),
                    )),
                    Some(CutOutcome::Failed { message }) => tasks.push(app.notify(
                        NotificationKind::Error,
                        format!("Video cutting failed: {message}"),
                    )),
                    None => {}
                }
            }
            Task::batch(tasks)
        }
        Message::KeyEvent(key_event) => match key_event {
            keyboard::Event::KeyPressed {
                key, modifiers: _, ..
            } => match key.as_ref() {
                keyboard::Key::Named(keyboard::key::Named::Space) => {
                    update(app, Message::Control(ControlMessage::PlayPause))
                }
                keyboard::Key::Named(keyboard::key::Named::ArrowLeft) => {
                    app.seek_by(-app.config.seek_step_secs);
                    Task::none()
                }
                keyboard::Key::Named(keyboard::key::Named::ArrowRight) => {
                    app.seek_by(app.config.seek_step_secs);
                    Task::none()
                }
                _ => Task::none(),
            },
            _ => Task::none(),
        },
        Message::NotificationExpired(id) => {
            app.notifier.expire(id);
            Task::none()
        }
    }
}

fn view(app: &App) -> Element<'_, Message> {
    let is_playing = app.mirror.is_playing();
    let has_source = app.source.is_some();

    let controls = controls::view_controls(ControlsState {
        file_name: app.source.as_ref().map(|s| s.file_name.as_str()),
        has_source,
        is_playing,
        position: app.waveform_view.playback_position,
        duration: app.markers.duration().unwrap_or(0.0),
        markers: app.markers.pair(),
        cut: app
            .cuts
            .button(app.markers.is_active(), has_source, is_playing),
        zoom: app.waveform_view.zoom(),
    })
    .map(Message::Control);

    let waveform: Element<Message> = if has_source {
        let canvas_el: Element<WaveformMessage> = canvas::Canvas::new(&app.waveform_view)
            .width(Length::Fill)
            .height(Length::Fixed(200.0))
            .into();
        canvas_el.map(Message::Waveform)
    } else {
        center(text("Choose a video or audio file to begin").size(18))
            .width(Length::Fill)
            .height(Length::Fixed(200.0))
            .into()
    };

    let mut content = column![controls, waveform].spacing(5);

    if let Some(notification) = app.notifier.visible(Instant::now()) {
        let color = match notification.kind {
            NotificationKind::Success => Color::from_rgb(0.13, 0.77, 0.37),
            NotificationKind::Error => Color::from_rgb(1.0, 0.3, 0.3),
            NotificationKind::Info => Color::from_rgb(0.8, 0.8, 0.85),
        };
        content = content.push(
            container(text(notification.text.as_str()).color(color))
                .padding(10)
                .center_x(Length::Fill),
        );
    }

    if let Some(err) = &app.error {
        content = content.push(
            container(text(format!("Error: {err}")).color(Color::from_rgb(1.0, 0.3, 0.3)))
                .padding(10),
        );
    }

    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn subscription(_app: &App) -> Subscription<Message> {
    let tick =
        iced::time::every(std::time::Duration::from_millis(16)).map(|_| Message::Tick);

    let keys = keyboard::listen().map(Message::KeyEvent);

    Subscription::batch([tick, keys])
}

fn theme(_app: &App) -> Theme {
    Theme::Dark
}

pub fn run(config: Config) -> iced::Result {
    iced::application(move || boot(config.clone()), update, view)
        .title(title)
        .subscription(subscription)
        .theme(theme)
        .window_size((1000.0, 420.0))
        .run()
}
