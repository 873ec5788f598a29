/// Default amplitude above which a sample counts as non-silent.
pub const SILENCE_THRESHOLD: f32 = 0.01;

/// A captured clip: interleaved samples in [-1, 1] plus their format.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipSamples {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_seconds: f32,
}

impl ClipSamples {
    /// Build a clip, deriving the duration from the frame count.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let frames = samples.len() / channels as usize;
        let duration_seconds = if sample_rate == 0 {
            0.0
        } else {
            frames as f32 / sample_rate as f32
        };
        Self {
            samples,
            sample_rate,
            channels,
            duration_seconds,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mono view of the clip (a copy when already mono).
    pub fn mono(&self) -> Vec<f32> {
        downmix(&self.samples, self.channels as usize)
    }

    /// Trim leading and trailing silence, keeping the format.
    ///
    /// Returns `None` for a completely silent clip.
    pub fn trimmed(&self, threshold: f32) -> Option<ClipSamples> {
        let samples = trim(&self.samples, threshold)?;
        Some(ClipSamples::new(samples, self.sample_rate, self.channels))
    }
}

/// Average interleaved channels into a single channel.
///
/// A trailing partial frame is dropped.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Cut everything before the first and after the last sample whose
/// magnitude exceeds `threshold`.
///
/// Indices are raw sample positions, not frame-aligned.
pub fn trim(samples: &[f32], threshold: f32) -> Option<Vec<f32>> {
    let first = samples.iter().position(|s| s.abs() > threshold)?;
    let last = samples.iter().rposition(|s| s.abs() > threshold)?;
    Some(samples[first..=last].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_buffer_trims_to_nothing() {
        assert_eq!(trim(&[0.0; 256], SILENCE_THRESHOLD), None);
    }

    #[test]
    fn single_loud_sample_survives_alone() {
        let mut samples = vec![0.0f32; 100];
        samples[37] = 0.5;
        let trimmed = trim(&samples, SILENCE_THRESHOLD).unwrap();
        assert_eq!(trimmed, vec![0.5]);
    }

    #[test]
    fn trim_keeps_inner_quiet_samples() {
        let samples = [0.0, 0.005, 0.2, 0.0, -0.3, 0.001, 0.0];
        let trimmed = trim(&samples, SILENCE_THRESHOLD).unwrap();
        assert_eq!(trimmed, vec![0.2, 0.0, -0.3]);
    }

    #[test]
    fn threshold_is_exclusive() {
        assert_eq!(trim(&[0.01, -0.01], 0.01), None);
    }

    #[test]
    fn downmix_averages_frames() {
        assert_eq!(downmix(&[1.0, 1.0, 1.0, 1.0], 2), vec![1.0, 1.0]);
        assert_eq!(downmix(&[1.0, 0.0, -0.5, 0.5], 2), vec![0.5, 0.0]);
    }

    #[test]
    fn downmix_mono_is_identity() {
        let input = vec![0.1, -0.2, 0.3];
        assert_eq!(downmix(&input, 1), input);
    }

    #[test]
    fn clip_duration_counts_frames() {
        let clip = ClipSamples::new(vec![0.0; 8000], 4000, 2);
        assert!((clip.duration_seconds - 1.0).abs() < 1e-6);
        assert_eq!(clip.mono().len(), 4000);
    }

    #[test]
    fn trimmed_clip_keeps_format() {
        let mut samples = vec![0.0f32; 10];
        samples[2] = 0.4;
        samples[5] = -0.4;
        let clip = ClipSamples::new(samples, 8000, 1);
        let trimmed = clip.trimmed(SILENCE_THRESHOLD).unwrap();
        assert_eq!(trimmed.samples.len(), 4);
        assert_eq!(trimmed.sample_rate, 8000);
        assert_eq!(trimmed.channels, 1);
    }
}
