use iced::mouse;
use iced::widget::canvas::{self, Action, Cache, Event, Frame, Geometry, Path, Stroke};
use iced::{Color, Point, Rectangle, Renderer, Size, Theme};

use crate::waveform_cache::WaveformPeaks;

pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 5.0;

/// Pixel distance within which a press grabs an existing marker.
const GRAB_TOLERANCE: f32 = 6.0;
/// Presses that move less than this are treated as a click (seek).
const CLICK_TOLERANCE: f32 = 3.0;

/// Visible window over the source, as fractions of its length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    zoom: f32,
    start: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: MIN_ZOOM,
            start: 0.0,
        }
    }
}

impl Viewport {
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn span(&self) -> f64 {
        1.0 / self.zoom as f64
    }

    pub fn range(&self) -> (f64, f64) {
        (self.start, self.start + self.span())
    }

    /// Change zoom keeping the middle of the window in place.
    pub fn set_zoom(&mut self, zoom: f32) {
        let center = self.start + self.span() / 2.0;
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.scroll_to(center);
    }

    /// Put the middle of `[lo, hi]` in the middle of the window.
    pub fn center_on(&mut self, lo: f64, hi: f64) {
        self.scroll_to((lo + hi) / 2.0);
    }

    fn scroll_to(&mut self, center: f64) {
        let span = self.span();
        self.start = (center - span / 2.0).clamp(0.0, (1.0 - span).max(0.0));
    }

    /// Source fraction under a horizontal position given as a fraction of the widget.
    pub fn to_source(&self, x_frac: f64) -> f64 {
        self.start + x_frac.clamp(0.0, 1.0) * self.span()
    }

    /// Horizontal widget fraction of a source fraction. May fall outside 0..1.
    pub fn to_view(&self, source_frac: f64) -> f64 {
        (source_frac - self.start) / self.span()
    }
}

/// State for the waveform canvas widget.
pub struct WaveformView {
    waveform_cache: Cache,
    pub peaks: Option<WaveformPeaks>,
    pub total_frames: usize,
    pub duration: f64,
    /// Playhead in seconds.
    pub playback_position: f64,
    /// Active A/B region in seconds.
    pub markers: Option<(f64, f64)>,
    viewport: Viewport,
}

/// Interactions on the waveform.
#[derive(Debug, Clone)]
pub enum WaveformMessage {
    /// Click: move the playhead, in seconds.
    Seek(f64),
    /// A marker was dragged or a new region selected, in seconds.
    MarkersChanged(f64, f64),
}

/// In-progress drag, tracked by the canvas between press and release.
#[derive(Debug, Clone, Copy)]
pub enum Drag {
    Select { anchor: f64, current: f64 },
    MoveA { current: f64 },
    MoveB { current: f64 },
}

impl WaveformView {
    pub fn new() -> Self {
        Self {
            waveform_cache: Cache::new(),
            peaks: None,
            total_frames: 0,
            duration: 0.0,
            playback_position: 0.0,
            markers: None,
            viewport: Viewport::default(),
        }
    }

    pub fn set_peaks(&mut self, peaks: WaveformPeaks, total_frames: usize, duration: f64) {
        self.peaks = Some(peaks);
        self.total_frames = total_frames;
        self.duration = duration;
        self.playback_position = 0.0;
        self.markers = None;
        self.viewport = Viewport::default();
        self.waveform_cache.clear();
    }

    pub fn zoom(&self) -> f32 {
        self.viewport.zoom()
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.viewport.set_zoom(zoom);
        self.waveform_cache.clear();
    }

    /// Scroll so the A/B region sits in the middle of the view.
    pub fn center_on(&mut self, a: f64, b: f64) {
        if self.duration <= 0.0 {
            return;
        }
        self.viewport.center_on(a / self.duration, b / self.duration);
        self.waveform_cache.clear();
    }

    fn time_at(&self, x: f32, width: f32) -> f64 {
        let source = self.viewport.to_source((x / width) as f64);
        (source * self.duration).clamp(0.0, self.duration)
    }

    fn x_of(&self, time: f64, width: f32) -> f32 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        (self.viewport.to_view(time / self.duration) * width as f64) as f32
    }

    /// Region to draw: the live drag if there is one, else the stored markers.
    fn shown_region(&self, drag: Option<Drag>) -> Option<(f64, f64)> {
        match (drag, self.markers) {
            (Some(Drag::Select { anchor, current }), _) => {
                Some((anchor.min(current), anchor.max(current)))
            }
            (Some(Drag::MoveA { current }), Some((_, b))) => Some((current.min(b), b)),
            (Some(Drag::MoveB { current }), Some((a, _))) => Some((a, current.max(a))),
            (_, markers) => markers,
        }
    }

    fn finish_drag(&self, drag: Drag, width: f32) -> Option<WaveformMessage> {
        match drag {
            Drag::Select { anchor, current } => {
                let moved = (self.x_of(current, width) - self.x_of(anchor, width)).abs();
                if moved < CLICK_TOLERANCE {
                    Some(WaveformMessage::Seek(anchor))
                } else {
                    Some(WaveformMessage::MarkersChanged(
                        anchor.min(current),
                        anchor.max(current),
                    ))
                }
            }
            Drag::MoveA { current } => {
                let (_, b) = self.markers?;
                Some(WaveformMessage::MarkersChanged(current.min(b), b))
            }
            Drag::MoveB { current } => {
                let (a, _) = self.markers?;
                Some(WaveformMessage::MarkersChanged(a, current.max(a)))
            }
        }
    }
}

impl canvas::Program<WaveformMessage> for WaveformView {
    type State = Option<Drag>;

    fn draw(
        &self,
        state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let width = bounds.width;
        let height = bounds.height;

        // Layer 1: Cached waveform
        let waveform = self.waveform_cache.draw(renderer, bounds.size(), |frame| {
            frame.fill_rectangle(Point::ORIGIN, bounds.size(), Color::from_rgb(0.12, 0.12, 0.15));

            let center_y = height / 2.0;
            let center_line = Path::line(Point::new(0.0, center_y), Point::new(width, center_y));
            frame.stroke(
                &center_line,
                Stroke::default()
                    .with_color(Color::from_rgba(1.0, 1.0, 1.0, 0.15))
                    .with_width(1.0),
            );

            if let Some(peaks) = &self.peaks {
                let display_peaks =
                    peaks.peaks_for_view(width, self.total_frames, self.viewport.range());
                let waveform_color = Color::from_rgb(0.3, 0.7, 1.0);

                for (i, peak) in display_peaks.iter().enumerate() {
                    let x = i as f32;
                    let min_y = center_y - peak.max * center_y;
                    let max_y = center_y - peak.min * center_y;
                    let line = Path::line(Point::new(x, min_y), Point::new(x, max_y));
                    frame.stroke(
                        &line,
                        Stroke::default().with_color(waveform_color).with_width(1.0),
                    );
                }
            }
        });

        // Layer 2: Dynamic overlay (A/B region + playhead)
        let overlay = {
            let mut frame = Frame::new(renderer, bounds.size());

            if let Some((a, b)) = self.shown_region(*state) {
                let x_a = self.x_of(a, width);
                let x_b = self.x_of(b, width);

                frame.fill_rectangle(
                    Point::new(x_a, 0.0),
                    Size::new(x_b - x_a, height),
                    Color::from_rgba(0.13, 0.77, 0.37, 0.15),
                );

                for (x, color) in [
                    (x_a, Color::from_rgb(0.13, 0.77, 0.37)),
                    (x_b, Color::from_rgb(0.95, 0.45, 0.2)),
                ] {
                    let line = Path::line(Point::new(x, 0.0), Point::new(x, height));
                    frame.stroke(&line, Stroke::default().with_color(color).with_width(2.0));
                }
            }

            let playhead_x = self.x_of(self.playback_position, width);
            let playhead = Path::line(Point::new(playhead_x, 0.0), Point::new(playhead_x, height));
            frame.stroke(
                &playhead,
                Stroke::default()
                    .with_color(Color::from_rgb(1.0, 1.0, 1.0))
                    .with_width(2.0),
            );

            frame.into_geometry()
        };

        vec![waveform, overlay]
    }

    fn update(
        &self,
        state: &mut Self::State,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<Action<WaveformMessage>> {
        if self.duration <= 0.0 {
            return None;
        }
        let width = bounds.width;

        match event {
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                let pos = cursor.position_in(bounds)?;
                let time = self.time_at(pos.x, width);
                let near = |t: f64| (self.x_of(t, width) - pos.x).abs() <= GRAB_TOLERANCE;

                *state = Some(match self.markers {
                    Some((a, _)) if near(a) => Drag::MoveA { current: time },
                    Some((_, b)) if near(b) => Drag::MoveB { current: time },
                    _ => Drag::Select {
                        anchor: time,
                        current: time,
                    },
                });
                Some(Action::request_redraw().and_capture())
            }
            Event::Mouse(mouse::Event::CursorMoved { .. }) => {
                let drag = state.as_mut()?;
                let x = cursor.position()?.x - bounds.x;
                let time = self.time_at(x, width);
                match drag {
                    Drag::Select { current, .. }
                    | Drag::MoveA { current }
                    | Drag::MoveB { current } => *current = time,
                }
                Some(Action::request_redraw().and_capture())
            }
            Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                let drag = state.take()?;
                let message = self.finish_drag(drag, width)?;
                Some(Action::publish(message).and_capture())
            }
            _ => None,
        }
    }
}
