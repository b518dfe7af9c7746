use crate::audio::types::AudioData;

/// A single peak entry: min and max sample values for a range of frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    pub min: f32,
    pub max: f32,
}

/// Pre-computed peaks at multiple resolutions for efficient waveform rendering.
#[derive(Clone, Debug)]
pub struct WaveformPeaks {
    /// Each entry is (samples_per_peak, peaks).
    pub levels: Vec<(usize, Vec<Peak>)>,
}

/// Resolution levels: number of mono samples per peak.
const RESOLUTIONS: &[usize] = &[64, 256, 1024, 4096];

impl WaveformPeaks {
    /// Compute peaks from audio data at multiple resolutions.
    pub fn compute(audio: &AudioData) -> Self {
        let mono = audio.to_mono();
        let levels = RESOLUTIONS
            .iter()
            .map(|&spp| {
                let peaks = compute_peaks_at_resolution(&mono, spp);
                (spp, peaks)
            })
            .collect();
        WaveformPeaks { levels }
    }

    /// Peaks for the visible part of the source, one per pixel column.
    ///
    /// `view` is the visible window as fractions of the whole source.
    pub fn peaks_for_view(
        &self,
        canvas_width: f32,
        total_frames: usize,
        view: (f64, f64),
    ) -> Vec<Peak> {
        let (view_start, view_end) = view;
        let span = view_end - view_start;
        if total_frames == 0 || canvas_width <= 0.0 || span <= 0.0 {
            return Vec::new();
        }

        // Roughly one to two peaks per pixel of the zoomed window.
        let target_spp = (total_frames as f64 * span) as f32 / canvas_width;

        let Some((_, base_peaks)) = self
            .levels
            .iter()
            .rev()
            .find(|(spp, _)| (*spp as f32) <= target_spp * 2.0)
            .or_else(|| self.levels.first())
        else {
            return Vec::new();
        };

        let width = canvas_width as usize;
        let len = base_peaks.len() as f64;
        let mut result = Vec::with_capacity(width);

        for i in 0..width {
            let frac_start = view_start + span * i as f64 / width as f64;
            let frac_end = view_start + span * (i + 1) as f64 / width as f64;
            let peak_start = (frac_start * len) as usize;
            let peak_end = ((frac_end * len) as usize).min(base_peaks.len());

            if peak_start >= base_peaks.len() {
                result.push(Peak { min: 0.0, max: 0.0 });
                continue;
            }

            let mut min = f32::MAX;
            let mut max = f32::MIN;
            for p in &base_peaks[peak_start..peak_end.max(peak_start + 1)] {
                min = min.min(p.min);
                max = max.max(p.max);
            }
            result.push(Peak { min, max });
        }

        result
    }
}

fn compute_peaks_at_resolution(mono: &[f32], samples_per_peak: usize) -> Vec<Peak> {
    mono.chunks(samples_per_peak)
        .map(|chunk| {
            let mut min = f32::MAX;
            let mut max = f32::MIN;
            for &s in chunk {
                min = min.min(s);
                max = max.max(s);
            }
            Peak { min, max }
        })
        .collect()
}
