use iced::widget::{button, column, container, progress_bar, row, slider, text, Row};
use iced::{Alignment, Element, Length};

use crate::cut::CutButton;
use crate::markers::MarkerPair;
use crate::ui::waveform::{MAX_ZOOM, MIN_ZOOM};

#[derive(Debug, Clone)]
pub enum ControlMessage {
    OpenFile,
    PlayPause,
    /// Clear A/B: select the whole source.
    ResetMarkers,
    Cut,
    ZoomChanged(f32),
    ResetZoom,
    CenterOnRegion,
}

/// Everything the control rows display.
pub struct ControlsState<'a> {
    pub file_name: Option<&'a str>,
    pub has_source: bool,
    pub is_playing: bool,
    pub position: f64,
    pub duration: f64,
    pub markers: MarkerPair,
    pub cut: CutButton,
    pub zoom: f32,
}

/// Format seconds as MM:SS.
fn format_clock(seconds: f64) -> String {
    let total_secs = seconds.max(0.0) as u64;
    let mins = total_secs / 60;
    let secs = total_secs % 60;
    format!("{mins}:{secs:02}")
}

fn cut_label(cut: CutButton) -> String {
    match cut {
        CutButton::InProgress(progress) => format!("Processing {progress}%"),
        CutButton::Disabled | CutButton::Ready => "Cut & Download".to_string(),
    }
}

/// Build the transport, region and zoom controls.
pub fn view_controls<'a>(state: ControlsState<'_>) -> Element<'a, ControlMessage> {
    let idle = !state.is_playing;

    let open_btn = button(text("Choose File"))
        .on_press_maybe(idle.then_some(ControlMessage::OpenFile));
    let file_label = text(state.file_name.unwrap_or("No file loaded").to_string()).size(14);

    let play_label = if state.is_playing { "Pause" } else { "Play" };
    let play_btn = button(text(play_label))
        .on_press_maybe(state.has_source.then_some(ControlMessage::PlayPause));

    let time_display = text(format!(
        "{} / {}",
        format_clock(state.position),
        format_clock(state.duration)
    ))
    .size(16);

    let region_label = if state.markers.is_active() {
        format!(
            "A {}  B {}",
            format_clock(state.markers.a),
            format_clock(state.markers.b)
        )
    } else {
        "No region".to_string()
    };

    let clear_btn = button(text("Clear A/B"))
        .style(button::danger)
        .on_press_maybe((state.has_source && idle).then_some(ControlMessage::ResetMarkers));

    let cut_btn = button(text(cut_label(state.cut)))
        .on_press_maybe((state.cut == CutButton::Ready).then_some(ControlMessage::Cut));

    let center_btn = button(text("Center A/B"))
        .style(button::secondary)
        .on_press_maybe(state.markers.is_active().then_some(ControlMessage::CenterOnRegion));

    let transport_row = Row::new()
        .spacing(10)
        .align_y(Alignment::Center)
        .push(open_btn)
        .push(file_label)
        .push(play_btn)
        .push(time_display);

    let region_row = row![text(region_label).size(14), clear_btn, cut_btn, center_btn]
        .spacing(10)
        .align_y(Alignment::Center);

    let zoom_row = row![
        text("Zoom").size(14),
        slider(MIN_ZOOM..=MAX_ZOOM, state.zoom, ControlMessage::ZoomChanged)
            .step(0.1)
            .width(Length::Fixed(160.0)),
        button(text("Reset Zoom"))
            .style(button::secondary)
            .on_press(ControlMessage::ResetZoom),
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    let mut content = column![transport_row, region_row, zoom_row].spacing(8);

    if let CutButton::InProgress(progress) = state.cut {
        content = content.push(progress_bar(0.0..=100.0, progress as f32));
    }

    container(content).padding(10).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(65.4), "1:05");
        assert_eq!(format_clock(3725.0), "62:05");
    }

    #[test]
    fn cut_button_labels() {
        assert_eq!(cut_label(CutButton::Ready), "Cut & Download");
        assert_eq!(cut_label(CutButton::Disabled), "Cut & Download");
        assert_eq!(cut_label(CutButton::InProgress(37)), "Processing 37%");
    }
}
