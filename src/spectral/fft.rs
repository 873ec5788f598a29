use std::f32::consts::PI;

use crate::error::{AnalysisError, Result};

/// Reverse the lowest `bits` bits of `x`.
pub fn bit_reverse(mut x: usize, bits: u32) -> usize {
    let mut y = 0;
    for _ in 0..bits {
        y = (y << 1) | (x & 1);
        x >>= 1;
    }
    y
}

/// In-place radix-2 FFT over an interleaved `[re, im, re, im, ...]` buffer.
///
/// The point count `buffer.len() / 2` must be a power of two. Twiddle
/// factors are advanced by complex multiplication within each stage, so
/// rounding error accumulates with the stage length.
pub fn fft_in_place(buffer: &mut [f32]) -> Result<()> {
    let n = buffer.len() / 2;
    if buffer.len() % 2 != 0 || n == 0 || !n.is_power_of_two() {
        return Err(AnalysisError::InvalidInput(format!(
            "fft needs an interleaved power-of-two buffer, got {} values",
            buffer.len()
        )));
    }
    let stages = n.trailing_zeros();

    for i in 0..n {
        let j = bit_reverse(i, stages);
        if j > i {
            buffer.swap(2 * i, 2 * j);
            buffer.swap(2 * i + 1, 2 * j + 1);
        }
    }

    for s in 1..=stages {
        let m2 = 1usize << s;
        let m1 = m2 >> 1;
        let theta = PI / m1 as f32;
        let (step_re, step_im) = (theta.cos(), -theta.sin());
        let (mut w_re, mut w_im) = (1.0f32, 0.0f32);

        for j in 0..m1 {
            let mut k = j;
            while k < n {
                let k1 = k + m1;
                let t_re = w_re * buffer[2 * k1] - w_im * buffer[2 * k1 + 1];
                let t_im = w_re * buffer[2 * k1 + 1] + w_im * buffer[2 * k1];
                buffer[2 * k1] = buffer[2 * k] - t_re;
                buffer[2 * k1 + 1] = buffer[2 * k + 1] - t_im;
                buffer[2 * k] += t_re;
                buffer[2 * k + 1] += t_im;
                k += m2;
            }

            let next_re = w_re * step_re - w_im * step_im;
            w_im = w_re * step_im + w_im * step_re;
            w_re = next_re;
        }
    }

    Ok(())
}

/// Magnitudes of the lower half of a transformed interleaved buffer.
pub fn half_magnitudes(buffer: &[f32]) -> Vec<f32> {
    let n = buffer.len() / 2;
    (0..n / 2)
        .map(|i| {
            let (re, im) = (buffer[2 * i], buffer[2 * i + 1]);
            (re * re + im * im).sqrt()
        })
        .collect()
}

/// Strongest bin of a magnitude spectrum with its interpolated position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    pub bin: usize,
    pub refined_bin: f32,
    pub magnitude: f32,
}

impl Peak {
    /// Frequency for a half spectrum of `half_len` bins.
    pub fn frequency(&self, sample_rate: u32, half_len: usize) -> f32 {
        self.refined_bin * sample_rate as f32 / (2 * half_len) as f32
    }
}

/// Locate the largest magnitude above `floor` and refine its position with
/// a parabola through its neighbours. Edge bins are not refined.
pub fn find_peak(magnitudes: &[f32], floor: f32) -> Option<Peak> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &m) in magnitudes.iter().enumerate() {
        if m > floor && best.map_or(true, |(_, b)| m > b) {
            best = Some((i, m));
        }
    }
    let (bin, magnitude) = best?;

    let mut refined_bin = bin as f32;
    if bin > 0 && bin + 1 < magnitudes.len() {
        let left = magnitudes[bin - 1] / magnitude;
        let right = magnitudes[bin + 1] / magnitude;
        refined_bin += 0.5 * (right * right - left * left);
    }

    Some(Peak {
        bin,
        refined_bin,
        magnitude,
    })
}

/// Dominant frequency of a buffer in Hz, zero-padded to a power of two.
///
/// Returns `Ok(None)` when the buffer carries no energy.
pub fn estimate_frequency(samples: &[f32], sample_rate: u32) -> Result<Option<f32>> {
    if samples.is_empty() {
        return Err(AnalysisError::InvalidInput("no samples to analyse".into()));
    }

    let n = samples.len().next_power_of_two();
    let mut buffer = vec![0.0f32; 2 * n];
    for (i, &s) in samples.iter().enumerate() {
        buffer[2 * i] = s;
    }
    fft_in_place(&mut buffer)?;

    let magnitudes = half_magnitudes(&buffer);
    let estimate = find_peak(&magnitudes, 0.0).map(|p| p.frequency(sample_rate, magnitudes.len()));
    log::debug!("Estimated frequency over {} points: {:?}", n, estimate);
    Ok(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::{num_complex::Complex, FftPlanner};

    #[test]
    fn bit_reverse_mirrors_bits() {
        assert_eq!(bit_reverse(0b001, 3), 0b100);
        assert_eq!(bit_reverse(0b110, 3), 0b011);
        assert_eq!(bit_reverse(5, 0), 0);
    }

    #[test]
    fn matches_rustfft() {
        let n = 64;
        let input: Vec<f32> = (0..n)
            .map(|i| (i as f32 * 0.37).sin() + 0.5 * (i as f32 * 1.3).cos())
            .collect();

        let mut ours = vec![0.0f32; 2 * n];
        for (i, &s) in input.iter().enumerate() {
            ours[2 * i] = s;
        }
        fft_in_place(&mut ours).unwrap();

        let mut reference: Vec<Complex<f32>> =
            input.iter().map(|&s| Complex::new(s, 0.0)).collect();
        FftPlanner::<f32>::new()
            .plan_fft_forward(n)
            .process(&mut reference);

        for (i, c) in reference.iter().enumerate() {
            assert!((ours[2 * i] - c.re).abs() < 1e-3, "re mismatch at {}", i);
            assert!((ours[2 * i + 1] - c.im).abs() < 1e-3, "im mismatch at {}", i);
        }
    }

    #[test]
    fn rejects_non_power_of_two() {
        let mut buffer = vec![0.0f32; 12];
        assert!(fft_in_place(&mut buffer).is_err());
    }

    #[test]
    fn parabolic_refinement_leans_toward_larger_neighbour() {
        let peak = find_peak(&[0.0, 0.5, 1.0, 0.8, 0.0], 0.0).unwrap();
        assert_eq!(peak.bin, 2);
        assert!(peak.refined_bin > 2.0 && peak.refined_bin < 2.5);
    }

    #[test]
    fn edge_peak_is_not_refined() {
        let peak = find_peak(&[1.0, 0.5, 0.2], 0.0).unwrap();
        assert_eq!(peak.refined_bin, 0.0);
    }

    #[test]
    fn floor_hides_quiet_peaks() {
        assert_eq!(find_peak(&[0.001, 0.005, 0.002], 0.01), None);
    }

    #[test]
    fn estimates_sine_within_one_bin() {
        let sample_rate = 8000;
        let freq = 440.0f32;
        let samples: Vec<f32> = (0..3000)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect();

        let estimate = estimate_frequency(&samples, sample_rate).unwrap().unwrap();
        let bin_width = sample_rate as f32 / 4096.0;
        assert!((estimate - freq).abs() <= bin_width, "estimated {}", estimate);
    }

    #[test]
    fn silence_has_no_estimate() {
        assert_eq!(estimate_frequency(&[0.0; 100], 8000).unwrap(), None);
    }
}
