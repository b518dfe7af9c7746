pub mod controls;
pub mod waveform;
