use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Track};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use super::types::AudioData;
use crate::error::AudioError;

/// Decode the audio track of a media file into memory.
///
/// Video containers are accepted; only their first decodable audio track is
/// read.
pub fn decode_file(path: &Path) -> Result<AudioData, AudioError> {
    let mut format = open_format(path)?;
    let track = audio_track(&*format)?;

    let params = &track.codec_params;
    let sample_rate = params.sample_rate.ok_or(AudioError::NoSampleRate)?;
    let channels = params.channels.map_or(2, |c| c.count() as u16);

    let mut decoder = symphonia::default::get_codecs()
        .make(params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decoder(e.to_string()))?;

    let samples = read_samples(&mut *format, &mut *decoder, track.id)?;

    let duration = (samples.len() / channels.max(1) as usize) as f64 / sample_rate as f64;
    debug!(path = %path.display(), sample_rate, channels, duration, "Decoded source");

    Ok(AudioData {
        samples,
        sample_rate,
        channels,
        duration,
    })
}

fn open_format(path: &Path) -> Result<Box<dyn FormatReader>, AudioError> {
    let file = File::open(path)?;
    let stream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map(|probed| probed.format)
        .map_err(|e| AudioError::Probe(e.to_string()))
}

/// First track carrying a sample rate. Picture tracks in video files have none.
fn audio_track(format: &dyn FormatReader) -> Result<Track, AudioError> {
    format
        .tracks()
        .iter()
        .find(|t| is_audio(&t.codec_params))
        .or_else(|| format.default_track())
        .cloned()
        .ok_or(AudioError::NoTrack)
}

fn is_audio(params: &CodecParameters) -> bool {
    params.sample_rate.is_some()
}

/// Interleaved f32 samples of `track_id` until end of stream. Corrupt packets
/// are skipped.
fn read_samples(
    format: &mut dyn FormatReader,
    decoder: &mut dyn Decoder,
    track_id: u32,
) -> Result<Vec<f32>, AudioError> {
    let mut samples = Vec::new();
    let mut skipped = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                skipped += 1;
                debug!("Skipping corrupt packet: {e}");
            }
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        }
    }

    if skipped > 0 {
        warn!(skipped, "Some packets could not be decoded");
    }
    Ok(samples)
}
