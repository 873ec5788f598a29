use std::collections::VecDeque;

use crate::spectral::{dft, fft};

/// Peak level a bin must exceed for the pitch detector to consider it.
pub const PITCH_FLOOR: f32 = 0.01;

/// Minimum magnitude-weighted frequency sum for a block to count as sound.
pub const MIN_SPECTRAL_ENERGY: f32 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DominantReading {
    /// Moving average of recent dominant frequencies, Hz.
    pub frequency: f32,
    pub amplitude: f32,
    /// Sum of bin frequency times magnitude over the block.
    pub energy: f32,
}

/// Dominant frequency smoothed over the last few blocks.
///
/// Every block feeds the average. A reading is only reported when the
/// block's peak clears the noise threshold, its peak is above 0 Hz, and
/// its [`spectral_energy`] exceeds [`MIN_SPECTRAL_ENERGY`].
pub struct DominantFrequencyTracker {
    history: VecDeque<f32>,
    capacity: usize,
    noise_threshold: f32,
}

impl DominantFrequencyTracker {
    pub fn new(capacity: usize, noise_threshold: f32) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity + 1),
            capacity,
            noise_threshold,
        }
    }

    /// `magnitudes` is a half spectrum of a `2 * magnitudes.len()` point FFT.
    pub fn update(&mut self, magnitudes: &[f32], sample_rate: u32) -> Option<DominantReading> {
        let (index, amplitude) = magnitudes
            .iter()
            .copied()
            .enumerate()
            .fold((0, 0.0f32), |best, (i, m)| if m > best.1 { (i, m) } else { best });
        let size = 2 * magnitudes.len().max(1);
        let dominant = dft::bin_frequency(index, sample_rate, size);
        let energy = spectral_energy(magnitudes, sample_rate);

        self.history.push_back(dominant);
        if self.history.len() > self.capacity {
            self.history.pop_front();
        }
        let frequency = self.history.iter().sum::<f32>() / self.history.len() as f32;

        let audible = amplitude > self.noise_threshold
            && dominant > 0.0
            && energy > MIN_SPECTRAL_ENERGY;
        audible.then_some(DominantReading {
            frequency,
            amplitude,
            energy,
        })
    }
}

/// Magnitude-weighted sum of bin frequencies for a half spectrum.
pub fn spectral_energy(magnitudes: &[f32], sample_rate: u32) -> f32 {
    let size = 2 * magnitudes.len().max(1);
    magnitudes
        .iter()
        .enumerate()
        .map(|(i, &m)| dft::bin_frequency(i, sample_rate, size) * m)
        .sum()
}

/// Single-block pitch estimate with parabolic peak refinement.
///
/// Only bins above [`PITCH_FLOOR`] are candidates; a peak at bin 0 is
/// treated as no pitch.
pub fn detect_pitch(magnitudes: &[f32], sample_rate: u32) -> Option<f32> {
    let peak = fft::find_peak(magnitudes, PITCH_FLOOR)?;
    let frequency = peak.frequency(sample_rate, magnitudes.len());
    (frequency > 0.0).then_some(frequency)
}

/// Frequencies of every lower-half bin louder than `threshold`.
pub fn significant_frequencies(magnitudes: &[f32], sample_rate: u32, threshold: f32) -> Vec<f32> {
    let size = 2 * magnitudes.len().max(1);
    magnitudes
        .iter()
        .enumerate()
        .filter(|&(_, &m)| m > threshold)
        .map(|(i, _)| dft::bin_frequency(i, sample_rate, size))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spike(len: usize, at: usize, level: f32) -> Vec<f32> {
        let mut m = vec![0.0; len];
        m[at] = level;
        m
    }

    #[test]
    fn moving_average_smooths_jumps() {
        let mut tracker = DominantFrequencyTracker::new(2, 0.01);
        // 8 bins of a 16-point FFT at 1600 Hz: 100 Hz per bin
        let first = tracker.update(&spike(8, 2, 0.5), 1600).unwrap();
        assert_eq!(first.frequency, 200.0);
        let second = tracker.update(&spike(8, 4, 0.5), 1600).unwrap();
        assert_eq!(second.frequency, 300.0);
        let third = tracker.update(&spike(8, 4, 0.5), 1600).unwrap();
        assert_eq!(third.frequency, 400.0);
    }

    #[test]
    fn quiet_blocks_still_feed_history() {
        let mut tracker = DominantFrequencyTracker::new(5, 0.01);
        assert_eq!(tracker.update(&spike(8, 6, 0.005), 1600), None);
        let reading = tracker.update(&spike(8, 2, 0.5), 1600).unwrap();
        assert_eq!(reading.frequency, 400.0);
        assert_eq!(reading.amplitude, 0.5);
        assert_eq!(reading.energy, 100.0);
    }

    #[test]
    fn weak_low_blocks_are_not_reported() {
        let mut tracker = DominantFrequencyTracker::new(3, 0.01);
        // 0.05 at 100 Hz clears the noise floor but its energy is only 5
        assert_eq!(tracker.update(&spike(8, 1, 0.05), 1600), None);
        // a DC peak is never reported
        assert_eq!(tracker.update(&spike(8, 0, 0.9), 1600), None);
        assert!(tracker.update(&spike(8, 1, 0.5), 1600).is_some());
    }

    #[test]
    fn energy_weights_bins_by_frequency() {
        let mags = [1.0, 0.5, 0.0, 0.25];
        // 100 Hz per bin: 0 * 1.0 + 100 * 0.5 + 300 * 0.25
        assert_eq!(spectral_energy(&mags, 800), 125.0);
    }

    #[test]
    fn pitch_ignores_sub_floor_content() {
        assert_eq!(detect_pitch(&[0.0, 0.005, 0.0, 0.0], 8000), None);
        let pitch = detect_pitch(&[0.0, 0.2, 1.0, 0.2, 0.0], 1000).unwrap();
        assert_eq!(pitch, 200.0);
    }

    #[test]
    fn lists_loud_bins_in_hz() {
        let mags = [0.0, 0.5, 0.0, 0.02];
        assert_eq!(significant_frequencies(&mags, 800, 0.01), vec![100.0, 300.0]);
    }
}
