use std::f32::consts::PI;

use super::complex::Complex;
use crate::error::{AnalysisError, Result};

/// One windowed transform result, frequency ascending from 0 Hz.
pub type Spectrum = Vec<Complex>;

/// Direct DFT of `size` bins over the window starting at `start`.
///
/// Only `min(size, N - start)` samples are summed and both accumulators are
/// normalised by that count. Sample indices wrap modulo the buffer length.
/// O(size²) per call.
pub fn transform(samples: &[f32], start: usize, size: usize) -> Result<Spectrum> {
    let total = samples.len();
    if total == 0 || size == 0 {
        return Err(AnalysisError::InvalidInput(
            "transform needs samples and a non-zero size".into(),
        ));
    }
    if start >= total {
        return Err(AnalysisError::InvalidInput(format!(
            "window start {} beyond {} samples",
            start, total
        )));
    }

    let to_process = size.min(total - start);
    let norm = to_process as f32;

    let spectrum = (0..size)
        .map(|k| {
            let mut real = 0.0f32;
            let mut imag = 0.0f32;
            for j in 0..to_process {
                let sample = samples[(start + j) % total];
                let angle = 2.0 * PI * k as f32 * j as f32 / size as f32;
                real += sample * angle.cos();
                imag -= sample * angle.sin();
            }
            Complex::new(real / norm, imag / norm)
        })
        .collect();

    Ok(spectrum)
}

/// Frequency in Hz of bin `index` for a `size`-bin spectrum.
pub fn bin_frequency(index: usize, sample_rate: u32, size: usize) -> f32 {
    index as f32 * sample_rate as f32 / size as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(cycles: usize, len: usize) -> Vec<f32> {
        (0..len)
            .map(|j| (2.0 * PI * cycles as f32 * j as f32 / len as f32).sin())
            .collect()
    }

    #[test]
    fn pure_tone_peaks_at_its_bin() {
        let size = 64;
        let k = 5;
        let spectrum = transform(&sine(k, size), 0, size).unwrap();
        let mags: Vec<f32> = spectrum.iter().map(Complex::magnitude).collect();

        let peak = mags[..size / 2]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!(peak.abs_diff(k) <= 1);
        assert!((mags[k] - 0.5).abs() < 1e-3);

        for (i, &m) in mags.iter().enumerate() {
            if i.abs_diff(k) > 1 && i.abs_diff(size - k) > 1 {
                assert!(m < 1e-3, "bin {} leaked {}", i, m);
            }
        }
    }

    #[test]
    fn dc_bin_of_constant_is_its_level() {
        let spectrum = transform(&[0.25; 32], 0, 32).unwrap();
        assert!((spectrum[0].real - 0.25).abs() < 1e-6);
        assert!(spectrum[0].imag.abs() < 1e-6);
    }

    #[test]
    fn short_tail_window_normalises_by_processed_count() {
        let samples = vec![1.0f32; 100];
        let spectrum = transform(&samples, 90, 64).unwrap();
        assert_eq!(spectrum.len(), 64);
        assert!((spectrum[0].real - 1.0).abs() < 1e-6);
    }

    #[test]
    fn start_past_the_end_is_rejected() {
        assert!(matches!(
            transform(&[0.0; 10], 10, 8),
            Err(AnalysisError::InvalidInput(_))
        ));
        assert!(transform(&[], 0, 8).is_err());
    }

    #[test]
    fn bin_frequency_scales_with_rate() {
        assert_eq!(bin_frequency(10, 44100, 1024), 10.0 * 44100.0 / 1024.0);
    }
}
