//! Page side of a cut: precondition checks, the single outbound request, and
//! the in-flight state that inbound statuses update.

use std::path::Path;

use tracing::{debug, info, warn};

use super::protocol::{output_name, parse_status, CutRequest, CutStatus};
use crate::error::CutError;
use crate::markers::MarkerPair;

/// The sending half of the cutter channel.
pub trait BoundaryPort {
    fn post(&self, message: String) -> Result<(), CutError>;
}

/// The file a cut is taken from.
#[derive(Debug, Clone, Copy)]
pub struct CutSource<'a> {
    pub path: &'a Path,
    /// Name shown to the user, used to derive the clip name.
    pub file_name: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JobStatus {
    Queued,
    Progress(u8),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CutJob {
    pub request: CutRequest,
    pub status: JobStatus,
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CutOutcome {
    Succeeded { filename: String },
    Failed { message: String },
}

/// What the Cut & Download control shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutButton {
    Disabled,
    Ready,
    InProgress(u8),
}

#[derive(Debug, Default)]
pub struct CutJobs {
    in_flight: Option<CutJob>,
    progress: u8,
}

impl CutJobs {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn in_flight(&self) -> Option<&CutJob> {
        self.in_flight.as_ref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Latest reported progress, 0..=100.
    #[cfg(test)]
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn button(&self, region_active: bool, has_source: bool, is_playing: bool) -> CutButton {
        if self.is_in_flight() {
            CutButton::InProgress(self.progress)
        } else if region_active && has_source && !is_playing {
            CutButton::Ready
        } else {
            CutButton::Disabled
        }
    }

    /// Check preconditions and post one request. Nothing is sent when any
    /// check fails.
    pub fn start(
        &mut self,
        region: MarkerPair,
        source: Option<CutSource<'_>>,
        port: Option<&dyn BoundaryPort>,
    ) -> Result<&CutJob, CutError> {
        if !region.is_active() {
            return Err(CutError::InactiveRegion);
        }
        let source = source.ok_or(CutError::NoSource)?;
        if self.is_in_flight() {
            return Err(CutError::JobInFlight);
        }
        let port = port.ok_or(CutError::ChannelUnavailable)?;

        let request = CutRequest {
            file: source.path.to_path_buf(),
            start: region.a,
            end: region.b,
            filename: output_name(source.file_name, region.a, region.b),
        };
        let message = serde_json::to_string(&request)?;
        port.post(message)?;

        info!(
            file = %request.file.display(),
            start = request.start,
            end = request.end,
            filename = %request.filename,
            "Cut requested"
        );
        self.progress = 0;
        Ok(&*self.in_flight.insert(CutJob {
            request,
            status: JobStatus::Queued,
        }))
    }

    /// Apply one inbound message. Returns the outcome when it ends the job.
    pub fn handle_message(&mut self, raw: &str) -> Option<CutOutcome> {
        let status = parse_status(raw)?;
        let Some(job) = self.in_flight.as_mut() else {
            debug!(?status, "Ignoring cutter message with no job in flight");
            return None;
        };

        if status.is_terminal() {
            debug!(?status, filename = %job.request.filename, "Cut job finished");
        }

        match status {
            CutStatus::Progress { progress } => {
                let progress = progress.round().clamp(0.0, 100.0) as u8;
                self.progress = progress;
                job.status = JobStatus::Progress(progress);
                None
            }
            CutStatus::Success => {
                let job = self.in_flight.take()?;
                self.progress = 100;
                info!(filename = %job.request.filename, "Cut finished");
                Some(CutOutcome::Succeeded {
                    filename: job.request.filename,
                })
            }
            CutStatus::Error { message } => {
                let job = self.in_flight.take()?;
                self.progress = 0;
                warn!(filename = %job.request.filename, %message, "Cut failed");
                Some(CutOutcome::Failed { message })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::PathBuf;

    use super::*;

    #[derive(Default)]
    struct RecordingPort {
        sent: RefCell<Vec<String>>,
    }

    impl BoundaryPort for RecordingPort {
        fn post(&self, message: String) -> Result<(), CutError> {
            self.sent.borrow_mut().push(message);
            Ok(())
        }
    }

    struct DeadPort;

    impl BoundaryPort for DeadPort {
        fn post(&self, _message: String) -> Result<(), CutError> {
            Err(CutError::ChannelUnavailable)
        }
    }

    fn source(path: &Path) -> Option<CutSource<'_>> {
        Some(CutSource {
            path,
            file_name: "talk.mp4",
        })
    }

    fn started(port: &RecordingPort) -> CutJobs {
        let path = PathBuf::from("/media/talk.mp4");
        let mut jobs = CutJobs::new();
        jobs.start(MarkerPair::new(65.0, 3725.0), source(&path), Some(port))
            .unwrap();
        jobs
    }

    #[test]
    fn sends_one_request_with_derived_name() {
        let port = RecordingPort::default();
        let jobs = started(&port);

        let sent = port.sent.borrow();
        assert_eq!(sent.len(), 1);
        let request: CutRequest = serde_json::from_str(&sent[0]).unwrap();
        assert_eq!(request.file, PathBuf::from("/media/talk.mp4"));
        assert_eq!(request.start, 65.0);
        assert_eq!(request.end, 3725.0);
        assert_eq!(request.filename, "talk-1m05s-1h02m05s.mp4");
        assert_eq!(jobs.in_flight().unwrap().status, JobStatus::Queued);
    }

    #[test]
    fn preconditions_send_nothing() {
        let port = RecordingPort::default();
        let path = PathBuf::from("/media/talk.mp4");
        let mut jobs = CutJobs::new();

        let err = jobs
            .start(MarkerPair::new(5.0, 5.0), source(&path), Some(&port))
            .unwrap_err();
        assert!(matches!(err, CutError::InactiveRegion));

        let err = jobs
            .start(MarkerPair::new(5.0, 40.0), None, Some(&port))
            .unwrap_err();
        assert!(matches!(err, CutError::NoSource));

        let err = jobs
            .start(MarkerPair::new(5.0, 40.0), source(&path), None)
            .unwrap_err();
        assert!(matches!(err, CutError::ChannelUnavailable));

        let err = jobs
            .start(MarkerPair::new(5.0, 40.0), source(&path), Some(&DeadPort))
            .unwrap_err();
        assert!(matches!(err, CutError::ChannelUnavailable));

        assert!(port.sent.borrow().is_empty());
        assert!(!jobs.is_in_flight());
    }

    #[test]
    fn second_request_while_in_flight_is_rejected() {
        let port = RecordingPort::default();
        let mut jobs = started(&port);
        let path = PathBuf::from("/media/talk.mp4");

        let err = jobs
            .start(MarkerPair::new(5.0, 40.0), source(&path), Some(&port))
            .unwrap_err();
        assert!(matches!(err, CutError::JobInFlight));
        assert_eq!(port.sent.borrow().len(), 1);

        jobs.handle_message(r#"{"status":"success"}"#);
        jobs.start(MarkerPair::new(5.0, 40.0), source(&path), Some(&port))
            .unwrap();
        assert_eq!(port.sent.borrow().len(), 2);
    }

    #[test]
    fn progress_never_ends_the_job() {
        let port = RecordingPort::default();
        let mut jobs = started(&port);

        assert_eq!(jobs.handle_message(r#"{"status":"progress","progress":70}"#), None);
        assert_eq!(jobs.handle_message(r#"{"status":"progress","progress":30}"#), None);
        assert_eq!(jobs.progress(), 30);
        assert_eq!(jobs.handle_message(r#"{"status":"progress","progress":100}"#), None);
        assert!(jobs.is_in_flight());
        assert_eq!(jobs.in_flight().unwrap().status, JobStatus::Progress(100));
    }

    #[test]
    fn success_ends_job_without_full_progress() {
        let port = RecordingPort::default();
        let mut jobs = started(&port);
        jobs.handle_message(r#"{"status":"progress","progress":12}"#);

        let outcome = jobs.handle_message(r#"{"status":"success"}"#);
        assert_eq!(
            outcome,
            Some(CutOutcome::Succeeded {
                filename: "talk-1m05s-1h02m05s.mp4".into()
            })
        );
        assert!(!jobs.is_in_flight());
        assert_eq!(jobs.progress(), 100);
    }

    #[test]
    fn error_ends_job_and_resets_progress() {
        let port = RecordingPort::default();
        let mut jobs = started(&port);
        jobs.handle_message(r#"{"status":"progress","progress":55}"#);

        let outcome = jobs.handle_message(r#"{"status":"error","message":"codec"}"#);
        assert_eq!(
            outcome,
            Some(CutOutcome::Failed {
                message: "codec".into()
            })
        );
        assert!(!jobs.is_in_flight());
        assert_eq!(jobs.progress(), 0);
    }

    #[test]
    fn messages_without_a_job_are_ignored() {
        let mut jobs = CutJobs::new();
        assert_eq!(jobs.handle_message(r#"{"status":"progress","progress":50}"#), None);
        assert_eq!(jobs.handle_message(r#"{"status":"success"}"#), None);
        assert_eq!(jobs.handle_message(r#"{"status":"error","message":"x"}"#), None);
        assert_eq!(jobs.progress(), 0);
        assert!(!jobs.is_in_flight());

        // Late duplicates after a finished job change nothing either.
        let port = RecordingPort::default();
        let mut jobs = started(&port);
        jobs.handle_message(r#"{"status":"success"}"#);
        assert_eq!(jobs.handle_message(r#"{"status":"error","message":"late"}"#), None);
        assert_eq!(jobs.progress(), 100);
    }

    #[test]
    fn malformed_messages_leave_job_alone() {
        let port = RecordingPort::default();
        let mut jobs = started(&port);
        assert_eq!(jobs.handle_message(r#"{"status":"done"}"#), None);
        assert_eq!(jobs.handle_message("garbage"), None);
        assert!(jobs.is_in_flight());
        assert_eq!(jobs.in_flight().unwrap().status, JobStatus::Queued);
    }

    #[test]
    fn button_states() {
        let port = RecordingPort::default();
        let idle = CutJobs::new();
        assert_eq!(idle.button(false, true, false), CutButton::Disabled);
        assert_eq!(idle.button(true, false, false), CutButton::Disabled);
        assert_eq!(idle.button(true, true, true), CutButton::Disabled);
        assert_eq!(idle.button(true, true, false), CutButton::Ready);

        let mut busy = started(&port);
        busy.handle_message(r#"{"status":"progress","progress":41.6}"#);
        assert_eq!(busy.button(true, true, false), CutButton::InProgress(42));
    }
}
