//! Messages exchanged with the cut worker, and clip naming.
//!
//! Both directions travel as JSON text so the worker shares nothing with the
//! page but the channel itself.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Page -> worker. Sent exactly once per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutRequest {
    pub file: PathBuf,
    pub start: f64,
    pub end: f64,
    pub filename: String,
}

/// Worker -> page. Any number of `Progress`, then one `Success` or `Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CutStatus {
    Success,
    Error {
        #[serde(default)]
        message: String,
    },
    Progress {
        progress: f64,
    },
}

impl CutStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CutStatus::Progress { .. })
    }
}

/// Decode an inbound message. Unknown statuses and malformed payloads yield `None`.
pub fn parse_status(raw: &str) -> Option<CutStatus> {
    match serde_json::from_str(raw) {
        Ok(status) => Some(status),
        Err(e) => {
            debug!(%raw, "Ignoring unrecognised cutter message: {e}");
            None
        }
    }
}

/// Compact time label used in clip names: `1h02m05s`, `1m05s`, `5s`.
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}h{minutes:02}m{secs:02}s")
    } else if minutes > 0 {
        format!("{minutes}m{secs:02}s")
    } else {
        format!("{secs}s")
    }
}

/// `<base>-<start>-<end>.mp4`, where `base` is `file_name` without its extension.
pub fn output_name(file_name: &str, start: f64, end: f64) -> String {
    format!(
        "{}-{}-{}.mp4",
        strip_extension(file_name),
        format_time(start),
        format_time(end)
    )
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() && !name[dot + 1..].contains('/') => &name[..dot],
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_labels() {
        assert_eq!(format_time(0.0), "0s");
        assert_eq!(format_time(5.0), "5s");
        assert_eq!(format_time(40.9), "40s");
        assert_eq!(format_time(65.0), "1m05s");
        assert_eq!(format_time(600.0), "10m00s");
        assert_eq!(format_time(3725.0), "1h02m05s");
        assert_eq!(format_time(36000.0), "10h00m00s");
        assert_eq!(format_time(-3.0), "0s");
    }

    #[test]
    fn clip_names() {
        assert_eq!(output_name("lesson.mov", 65.0, 3725.0), "lesson-1m05s-1h02m05s.mp4");
        assert_eq!(output_name("lesson.mov", 5.0, 40.0), "lesson-5s-40s.mp4");
        assert_eq!(output_name("song.final.mp3", 5.0, 40.0), "song.final-5s-40s.mp4");
        assert_eq!(output_name("noext", 5.0, 40.0), "noext-5s-40s.mp4");
        assert_eq!(output_name("trailing.", 5.0, 40.0), "trailing.-5s-40s.mp4");
    }

    #[test]
    fn parses_each_status() {
        assert_eq!(parse_status(r#"{"status":"success"}"#), Some(CutStatus::Success));
        assert_eq!(
            parse_status(r#"{"status":"error","message":"boom"}"#),
            Some(CutStatus::Error {
                message: "boom".into()
            })
        );
        assert_eq!(
            parse_status(r#"{"status":"progress","progress":42}"#),
            Some(CutStatus::Progress { progress: 42.0 })
        );
    }

    #[test]
    fn ignores_unknown_and_malformed() {
        assert_eq!(parse_status(r#"{"status":"queued"}"#), None);
        assert_eq!(parse_status(r#"{"progress":10}"#), None);
        assert_eq!(parse_status(r#"{"status":"progress"}"#), None);
        assert_eq!(parse_status("not json"), None);
        assert_eq!(parse_status("[]"), None);
    }

    #[test]
    fn request_uses_wire_field_names() {
        let request = CutRequest {
            file: PathBuf::from("/media/a.mp4"),
            start: 1.5,
            end: 3.0,
            filename: "a-1s-3s.mp4".into(),
        };
        let value: serde_json::Value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["file"], "/media/a.mp4");
        assert_eq!(value["start"], 1.5);
        assert_eq!(value["end"], 3.0);
        assert_eq!(value["filename"], "a-1s-3s.mp4");
    }

    #[test]
    fn only_progress_is_non_terminal() {
        assert!(CutStatus::Success.is_terminal());
        assert!(CutStatus::Error { message: String::new() }.is_terminal());
        assert!(!CutStatus::Progress { progress: 100.0 }.is_terminal());
    }
}
