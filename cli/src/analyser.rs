//! Frequency analysis over the samples tapped from the playback output.
//!
//! Mirrors the behaviour of a browser analyser node: a Blackman-windowed FFT
//! over the most recent `fft_size` samples, exponential smoothing between
//! frames, and a decibel range mapped onto `0..=255`.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub const FFT_SIZE: usize = 256;
const MIN_FFT_SIZE: usize = 32;
const MAX_FFT_SIZE: usize = 32768;
const SMOOTHING_TIME_CONSTANT: f32 = 0.8;
const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyserError {
    #[error("fft size {0} must be a power of two between 32 and 32768")]
    InvalidFftSize(usize),
}

/// Anything that can report byte-scaled frequency magnitudes.
pub trait FrequencySource {
    fn frequency_bin_count(&self) -> usize;

    /// Fills `out` with the current magnitudes; entries past the bin count are
    /// left untouched.
    fn byte_frequency_data(&mut self, out: &mut [u8]);
}

/// Shared ring of mono samples written by the audio thread.
#[derive(Debug, Clone)]
pub struct AnalysisTap {
    inner: Arc<Mutex<VecDeque<f32>>>,
    capacity: usize,
}

impl AnalysisTap {
    pub fn new(capacity: usize) -> Self {
        Self { inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))), capacity }
    }

    pub fn push(&self, sample: f32) {
        let mut buffer = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(sample);
    }

    /// Copies the newest samples into `out`, zero-padding the front when fewer
    /// have been captured.
    pub fn latest(&self, out: &mut [f32]) {
        let buffer = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let available = buffer.len().min(out.len());
        let padding = out.len() - available;
        out[..padding].fill(0.0);
        for (slot, sample) in out[padding..].iter_mut().zip(buffer.iter().skip(buffer.len() - available))
        {
            *slot = *sample;
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }
}

pub struct Analyser {
    tap: AnalysisTap,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    samples: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl Analyser {
    pub fn new(tap: AnalysisTap, fft_size: usize) -> Result<Self, AnalyserError> {
        if !fft_size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&fft_size) {
            return Err(AnalyserError::InvalidFftSize(fft_size));
        }
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let window = (0..fft_size).map(|i| blackman_window(i, fft_size)).collect();
        Ok(Self {
            tap,
            fft,
            window,
            samples: vec![0.0; fft_size],
            spectrum: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; fft_size / 2],
        })
    }

    pub fn fft_size(&self) -> usize {
        self.samples.len()
    }

    fn analyse(&mut self) {
        let size = self.fft_size();
        self.tap.latest(&mut self.samples);
        for ((bin, sample), weight) in self.spectrum.iter_mut().zip(&self.samples).zip(&self.window)
        {
            *bin = Complex::new(sample * weight, 0.0);
        }
        self.fft.process(&mut self.spectrum);

        let scale = 1.0 / size as f32;
        for (smoothed, bin) in self.smoothed.iter_mut().zip(&self.spectrum) {
            let magnitude = bin.norm() * scale;
            *smoothed =
                SMOOTHING_TIME_CONSTANT * *smoothed + (1.0 - SMOOTHING_TIME_CONSTANT) * magnitude;
        }
    }
}

impl FrequencySource for Analyser {
    fn frequency_bin_count(&self) -> usize {
        self.smoothed.len()
    }

    fn byte_frequency_data(&mut self, out: &mut [u8]) {
        self.analyse();
        for (byte, magnitude) in out.iter_mut().zip(&self.smoothed) {
            *byte = magnitude_to_byte(*magnitude);
        }
    }
}

fn magnitude_to_byte(magnitude: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let decibels = 20.0 * magnitude.log10();
    let scaled = 255.0 / (MAX_DECIBELS - MIN_DECIBELS) * (decibels - MIN_DECIBELS);
    scaled.floor().clamp(0.0, 255.0) as u8
}

pub fn blackman_window(index: usize, size: usize) -> f32 {
    let phase = 2.0 * PI * index as f32 / size as f32;
    0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_tap(bin: usize, samples: usize) -> AnalysisTap {
        let tap = AnalysisTap::new(FFT_SIZE * 4);
        for n in 0..samples {
            tap.push((2.0 * PI * bin as f32 * n as f32 / FFT_SIZE as f32).sin());
        }
        tap
    }

    #[test]
    fn rejects_non_power_of_two_windows() {
        let tap = AnalysisTap::new(16);
        assert_eq!(Analyser::new(tap.clone(), 300).err(), Some(AnalyserError::InvalidFftSize(300)));
        assert!(Analyser::new(tap, 16).is_err());
    }

    #[test]
    fn default_window_yields_128_bins() {
        let analyser = Analyser::new(AnalysisTap::new(FFT_SIZE), FFT_SIZE).unwrap();
        assert_eq!(analyser.frequency_bin_count(), 128);
    }

    #[test]
    fn silence_reads_as_zero() {
        let mut analyser = Analyser::new(AnalysisTap::new(FFT_SIZE), FFT_SIZE).unwrap();
        let mut data = vec![7u8; 128];
        analyser.byte_frequency_data(&mut data);
        assert!(data.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn pure_tone_peaks_at_its_bin() {
        let mut analyser = Analyser::new(sine_tap(16, FFT_SIZE * 2), FFT_SIZE).unwrap();
        let mut data = vec![0u8; 128];
        analyser.byte_frequency_data(&mut data);
        let (peak, value) = data.iter().enumerate().max_by_key(|(_, value)| **value).unwrap();
        assert_eq!(peak, 16);
        assert_eq!(*value, 255);
        assert!(data[60] < *value);
    }

    #[test]
    fn tap_keeps_only_newest_samples() {
        let tap = AnalysisTap::new(4);
        for sample in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0] {
            tap.push(sample);
        }
        assert_eq!(tap.len(), 4);
        let mut out = [0.0; 6];
        tap.latest(&mut out);
        assert_eq!(out, [0.0, 0.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn blackman_window_tapers_edges() {
        assert!(blackman_window(0, FFT_SIZE).abs() < 0.01);
        assert!((blackman_window(FFT_SIZE / 2, FFT_SIZE) - 1.0).abs() < 0.01);
    }
}
