//! Pitch and frequency estimators for a live sample stream.
//!
//! An external producer pushes fixed-size mono blocks; nothing here assumes
//! a particular scheduler. Use [`StreamAnalyzer::push`] from a callback or
//! [`run`] to pull blocks from a channel until the producer hangs up.

pub mod segmenter;
pub mod tracker;

use crossbeam_channel::Receiver;

use crate::config::StreamConfig;
use crate::error::{AnalysisError, Result};
use crate::spectral::{fft, window};

pub use segmenter::{SpeechSegmenter, Utterance};
pub use tracker::{DominantFrequencyTracker, DominantReading};

#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    Dominant(DominantReading),
    Pitch(f32),
    Frequencies(Vec<f32>),
    Utterance(Utterance),
}

pub struct StreamAnalyzer {
    sample_rate: u32,
    fft_size: usize,
    window: Vec<f32>,
    gain: f32,
    noise_threshold: f32,
    tracker: DominantFrequencyTracker,
    segmenter: SpeechSegmenter,
}

impl StreamAnalyzer {
    pub fn new(sample_rate: u32, config: &StreamConfig) -> Result<Self> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput("sample rate is zero".into()));
        }
        let fft_size = config.block_size;
        if fft_size < 2 || !fft_size.is_power_of_two() {
            return Err(AnalysisError::InvalidInput(format!(
                "block size must be a power of two, got {}",
                fft_size
            )));
        }

        let window = window::blackman_harris(fft_size);
        // scale so a full-band sine of amplitude A peaks near A
        let gain = 2.0 / window.iter().sum::<f32>();

        Ok(Self {
            sample_rate,
            fft_size,
            window,
            gain,
            noise_threshold: config.noise_threshold,
            tracker: DominantFrequencyTracker::new(config.moving_average, config.noise_threshold),
            segmenter: SpeechSegmenter::new(
                sample_rate,
                config.volume_threshold,
                config.silence_threshold,
            ),
        })
    }

    /// Windowed half-spectrum magnitudes of the newest `fft_size` samples.
    pub fn spectrum(&self, block: &[f32]) -> Result<Vec<f32>> {
        let tail = &block[block.len().saturating_sub(self.fft_size)..];
        let mut frame = vec![0.0f32; self.fft_size];
        frame[..tail.len()].copy_from_slice(tail);
        window::apply(&mut frame, &self.window);

        let mut buffer = vec![0.0f32; 2 * self.fft_size];
        for (i, &s) in frame.iter().enumerate() {
            buffer[2 * i] = s;
        }
        fft::fft_in_place(&mut buffer)?;

        Ok(fft::half_magnitudes(&buffer)
            .into_iter()
            .map(|m| m * self.gain)
            .collect())
    }

    pub fn push(&mut self, block: &[f32]) -> Result<Vec<StreamEvent>> {
        let mut events = Vec::new();
        if block.is_empty() {
            return Ok(events);
        }

        let magnitudes = self.spectrum(block)?;

        if let Some(reading) = self.tracker.update(&magnitudes, self.sample_rate) {
            events.push(StreamEvent::Dominant(reading));
        }
        if let Some(pitch) = tracker::detect_pitch(&magnitudes, self.sample_rate) {
            events.push(StreamEvent::Pitch(pitch));
        }
        let loud = tracker::significant_frequencies(&magnitudes, self.sample_rate, self.noise_threshold);
        if !loud.is_empty() {
            events.push(StreamEvent::Frequencies(loud));
        }
        if let Some(utterance) = self.segmenter.push(block) {
            events.push(StreamEvent::Utterance(utterance));
        }

        Ok(events)
    }

    pub fn finish(&mut self) -> Option<StreamEvent> {
        self.segmenter.flush().map(StreamEvent::Utterance)
    }
}

/// Drain blocks from `rx` until every sender is dropped.
pub fn run<F>(rx: Receiver<Vec<f32>>, analyzer: &mut StreamAnalyzer, mut on_event: F) -> Result<()>
where
    F: FnMut(StreamEvent),
{
    for block in rx.iter() {
        for event in analyzer.push(&block)? {
            on_event(event);
        }
    }
    if let Some(event) = analyzer.finish() {
        on_event(event);
    }
    Ok(())
}
