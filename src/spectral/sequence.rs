use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rayon::{ThreadPool, ThreadPoolBuilder};

use super::dft::{self, Spectrum};
use crate::audio::ClipSamples;
use crate::error::{AnalysisError, Result};

/// Spectra of one clip in temporal order, step 0 first.
pub type SpectralSequence = Vec<Spectrum>;

/// Drives the sliding DFT across a whole clip at a fixed time step.
///
/// Each step runs on the worker pool while the caller waits; steps never
/// overlap. Results are appended to a mutex-guarded sequence from inside the
/// worker, and progress is reported from the driving thread once the worker
/// has returned.
pub struct SequenceBuilder {
    pool: ThreadPool,
    sample_size: usize,
    cancelled: Arc<AtomicBool>,
}

impl SequenceBuilder {
    pub fn new(sample_size: usize, workers: usize) -> Result<Self> {
        if sample_size == 0 {
            return Err(AnalysisError::InvalidInput("sample size must be non-zero".into()));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("spectrum-worker-{i}"))
            .build()
            .map_err(|e| AnalysisError::InvalidInput(format!("worker pool: {e}")))?;

        Ok(Self {
            pool,
            sample_size,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Flag checked before every step; setting it stops the running build.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    pub fn build<F>(
        &self,
        clip: &ClipSamples,
        time_step: f32,
        label: &str,
        mut on_progress: F,
    ) -> Result<SpectralSequence>
    where
        F: FnMut(f32, &str),
    {
        if clip.is_empty() {
            return Err(AnalysisError::InvalidInput(format!("{label}: clip has no samples")));
        }
        if clip.sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(format!("{label}: sample rate is zero")));
        }
        if !(time_step.is_finite() && time_step > 0.0) {
            return Err(AnalysisError::InvalidInput(format!(
                "{label}: time step must be positive, got {time_step}"
            )));
        }

        let mono = clip.mono();
        let total_steps = (clip.duration_seconds / time_step).floor() as usize;
        let sequence: Mutex<SpectralSequence> = Mutex::new(Vec::with_capacity(total_steps));

        log::info!(
            "{}: {} steps of {:.4}s, {} bins, {} mono samples",
            label,
            total_steps,
            time_step,
            self.sample_size,
            mono.len()
        );

        for step in 0..total_steps {
            if self.cancelled.load(Ordering::SeqCst) {
                log::warn!("{}: cancelled before step {}", label, step);
                return Err(AnalysisError::Cancelled);
            }

            let current_time = step as f32 * time_step;
            let start = (current_time * clip.sample_rate as f32).floor() as usize;

            self.pool.install(|| -> Result<()> {
                let spectrum = dft::transform(&mono, start, self.sample_size)?;
                sequence
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(spectrum);
                Ok(())
            })?;

            let progress = (step + 1) as f32 / total_steps as f32;
            log::debug!("{}: step {} at sample {}", label, step, start);
            on_progress(progress, &format!("{} ({:.2}%)", label, progress * 100.0));
        }

        Ok(sequence.into_inner().unwrap_or_else(PoisonError::into_inner))
    }
}
