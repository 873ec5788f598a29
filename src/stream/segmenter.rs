use crate::spectral::fft;

/// A stretch of speech closed by enough trailing quiet.
#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    pub samples: Vec<f32>,
    pub duration: f32,
    /// Dominant frequency of the whole utterance, if it had any energy.
    pub frequency: Option<f32>,
}

/// Groups loud blocks into utterances.
///
/// A block whose peak exceeds the volume threshold starts or extends the
/// current utterance. Once quiet for longer than the silence threshold the
/// buffered samples are emitted with their estimated frequency. Time is
/// measured in consumed samples, not wall clock.
pub struct SpeechSegmenter {
    sample_rate: u32,
    volume_threshold: f32,
    silence_threshold: f32,
    buffer: Vec<f32>,
    speaking: bool,
    consumed: u64,
    last_speech: f32,
}

impl SpeechSegmenter {
    pub fn new(sample_rate: u32, volume_threshold: f32, silence_threshold: f32) -> Self {
        Self {
            sample_rate,
            volume_threshold,
            silence_threshold,
            buffer: Vec::new(),
            speaking: false,
            consumed: 0,
            last_speech: 0.0,
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    fn now(&self) -> f32 {
        self.consumed as f32 / self.sample_rate.max(1) as f32
    }

    pub fn push(&mut self, block: &[f32]) -> Option<Utterance> {
        self.consumed += block.len() as u64;
        let now = self.now();
        let peak = block.iter().fold(0.0f32, |m, s| m.max(s.abs()));

        if peak > self.volume_threshold {
            if !self.speaking {
                self.speaking = true;
                self.buffer.clear();
            }
            self.buffer.extend_from_slice(block);
            self.last_speech = now;
            return None;
        }

        if self.speaking && now - self.last_speech > self.silence_threshold {
            self.speaking = false;
            return self.close();
        }
        None
    }

    /// Close any open utterance, e.g. when the stream ends.
    pub fn flush(&mut self) -> Option<Utterance> {
        if !self.speaking {
            return None;
        }
        self.speaking = false;
        self.close()
    }

    fn close(&mut self) -> Option<Utterance> {
        let samples = std::mem::take(&mut self.buffer);
        if samples.is_empty() {
            log::info!("No speech detected");
            return None;
        }

        let frequency = match fft::estimate_frequency(&samples, self.sample_rate) {
            Ok(f) => f,
            Err(e) => {
                log::error!("Error in frequency estimation: {}", e);
                None
            }
        };
        let duration = samples.len() as f32 / self.sample_rate.max(1) as f32;

        Some(Utterance {
            samples,
            duration,
            frequency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const RATE: u32 = 8000;
    const BLOCK: usize = 800;

    fn tone_block(offset: usize) -> Vec<f32> {
        (0..BLOCK)
            .map(|i| 0.5 * (2.0 * PI * 300.0 * (offset + i) as f32 / RATE as f32).sin())
            .collect()
    }

    #[test]
    fn utterance_closes_after_silence() {
        let mut seg = SpeechSegmenter::new(RATE, 0.01, 0.5);
        let quiet = vec![0.0f32; BLOCK];

        assert_eq!(seg.push(&tone_block(0)), None);
        assert_eq!(seg.push(&tone_block(BLOCK)), None);
        assert!(seg.is_speaking());

        // 0.1 s blocks: four quiet ones stay within the 0.5 s limit
        for _ in 0..4 {
            assert_eq!(seg.push(&quiet), None);
        }
        let utterance = (0..2).find_map(|_| seg.push(&quiet)).unwrap();

        assert_eq!(utterance.samples.len(), 2 * BLOCK);
        assert!((utterance.duration - 0.2).abs() < 1e-6);
        let freq = utterance.frequency.unwrap();
        assert!((freq - 300.0).abs() <= RATE as f32 / 2048.0, "estimated {}", freq);
        assert!(!seg.is_speaking());
    }

    #[test]
    fn quiet_stream_never_emits() {
        let mut seg = SpeechSegmenter::new(RATE, 0.01, 0.5);
        for _ in 0..20 {
            assert_eq!(seg.push(&[0.001; BLOCK]), None);
        }
        assert_eq!(seg.flush(), None);
    }

    #[test]
    fn flush_closes_open_utterance() {
        let mut seg = SpeechSegmenter::new(RATE, 0.01, 0.5);
        seg.push(&tone_block(0));
        let utterance = seg.flush().unwrap();
        assert_eq!(utterance.samples.len(), BLOCK);
    }
}
