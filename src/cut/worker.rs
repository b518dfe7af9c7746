//! The cut worker: an isolated thread that turns cut requests into clip files.
//!
//! It owns a copy of its config and the two ends of the cutter channel and
//! nothing else. Requests arrive as JSON text; every request is answered with
//! zero or more `progress` statuses followed by one `success` or `error`.

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, warn};

use super::job::BoundaryPort;
use super::protocol::{CutRequest, CutStatus};
use crate::config::CutterConfig;
use crate::error::{CutError, WorkerError};

/// The page's ends of the cutter channel.
pub struct CutterChannel {
    requests: Sender<String>,
    statuses: Receiver<String>,
}

impl CutterChannel {
    /// Statuses received since the last call, without blocking.
    pub fn drain(&self) -> impl Iterator<Item = String> + '_ {
        self.statuses.try_iter()
    }
}

impl BoundaryPort for CutterChannel {
    fn post(&self, message: String) -> Result<(), CutError> {
        self.requests
            .send(message)
            .map_err(|_| CutError::ChannelUnavailable)
    }
}

/// Start the worker thread. It exits when the returned channel is dropped.
pub fn spawn(config: CutterConfig) -> Result<CutterChannel, WorkerError> {
    let (request_tx, request_rx) = crossbeam_channel::unbounded::<String>();
    let (status_tx, status_rx) = crossbeam_channel::unbounded::<String>();

    std::thread::Builder::new()
        .name("cutter".into())
        .spawn(move || run(&config, request_rx, status_tx))?;

    Ok(CutterChannel {
        requests: request_tx,
        statuses: status_rx,
    })
}

fn run(config: &CutterConfig, requests: Receiver<String>, statuses: Sender<String>) {
    let reply = |status: CutStatus| match serde_json::to_string(&status) {
        Ok(text) => {
            let _ = statuses.send(text);
        }
        Err(e) => warn!("Failed to encode cutter status: {e}"),
    };

    for raw in requests {
        let mut last_sent = None;
        let result = process(config, &raw, &mut |progress| {
            let whole = progress.round();
            if last_sent != Some(whole) {
                last_sent = Some(whole);
                reply(CutStatus::Progress { progress: whole });
            }
        });

        match result {
            Ok(output) => {
                info!(output = %output.display(), "Clip written");
                reply(CutStatus::Success);
            }
            Err(e) => {
                warn!("Cut failed: {e}");
                reply(CutStatus::Error {
                    message: e.to_string(),
                });
            }
        }
    }
    debug!("Cutter channel closed");
}

fn process(
    config: &CutterConfig,
    raw: &str,
    on_progress: &mut dyn FnMut(f64),
) -> Result<PathBuf, WorkerError> {
    let request: CutRequest = serde_json::from_str(raw)?;
    let output = output_path(&config.output_dir, &request)?;
    std::fs::create_dir_all(&config.output_dir)?;

    let span = request.end - request.start;
    debug!(args = ?ffmpeg_args(config, &request, &output), "Running ffmpeg");

    let mut child = Command::new(&config.ffmpeg_path)
        .args(ffmpeg_args(config, &request, &output))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Collect stderr on the side so a chatty ffmpeg cannot stall on a full pipe.
    let stderr = child.stderr.take();
    let stderr_reader = std::thread::spawn(move || {
        let mut text = String::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_string(&mut text);
        }
        text
    });

    let read = match child.stdout.take() {
        Some(stdout) => read_progress(stdout, span, on_progress),
        None => Ok(()),
    };
    if let Err(e) = read {
        // Never report a failure while ffmpeg may still be writing the clip.
        let _ = child.kill();
        let _ = child.wait();
        let _ = stderr_reader.join();
        return Err(e.into());
    }

    let status = child.wait();
    let stderr = stderr_reader.join().unwrap_or_default();
    let status = status?;
    if !status.success() {
        return Err(WorkerError::Ffmpeg {
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }
    Ok(output)
}

/// Feed ffmpeg's `-progress` stream to `on_progress` until it closes. Lines
/// are decoded lossily so stray bytes cannot end the read early.
fn read_progress(
    stdout: impl Read,
    span: f64,
    on_progress: &mut dyn FnMut(f64),
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stdout);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(());
        }
        if let Some(progress) = parse_progress_line(&String::from_utf8_lossy(&line), span) {
            on_progress(progress);
        }
    }
}

/// Validate the request and resolve where the clip goes. Only the final
/// component of the requested name is used.
fn output_path(output_dir: &Path, request: &CutRequest) -> Result<PathBuf, WorkerError> {
    if !(request.start >= 0.0 && request.start < request.end) {
        return Err(WorkerError::InvalidRange {
            start: request.start,
            end: request.end,
        });
    }
    let name = Path::new(&request.filename)
        .file_name()
        .filter(|name| *name == request.filename.as_str())
        .ok_or_else(|| WorkerError::InvalidFilename(request.filename.clone()))?;
    Ok(output_dir.join(name))
}

fn ffmpeg_args(config: &CutterConfig, request: &CutRequest, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-y",
        "-hide_banner",
        "-nostats",
        "-loglevel",
        "error",
        "-progress",
        "pipe:1",
        "-ss",
    ]
    .iter()
    .map(OsString::from)
    .collect();
    args.push(format!("{}", request.start).into());
    args.push("-i".into());
    args.push(request.file.clone().into_os_string());
    args.push("-t".into());
    args.push(format!("{}", request.end - request.start).into());
    args.push("-c:v".into());
    args.push(config.video_codec.clone().into());
    args.push("-c:a".into());
    args.push(config.audio_codec.clone().into());
    args.push(output.as_os_str().to_owned());
    args
}

/// Read one `key=value` line of ffmpeg's `-progress` output as a percentage
/// of `span` seconds.
fn parse_progress_line(line: &str, span: f64) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        // Both keys carry microseconds.
        "out_time_us" | "out_time_ms" => {
            let micros: f64 = value.parse().ok()?;
            if span <= 0.0 {
                return None;
            }
            Some((micros / 1_000_000.0 / span * 100.0).clamp(0.0, 100.0))
        }
        "progress" if value == "end" => Some(100.0),
        _ => None,
    }
}
