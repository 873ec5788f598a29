use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::audio::{wav, ClipSamples};
use crate::error::{AnalysisError, Result};
use crate::spectral::compare::{self, SimilarityReport};
use crate::spectral::{SequenceBuilder, SpectralSequence};

/// Score handed to UI callers when no comparison could run.
pub const NOT_READY_SCORE: f32 = -1.0;

/// Receives `(fraction, message)` progress updates.
pub type ProgressSink = Arc<dyn Fn(f32, &str) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreparationState {
    Idle,
    Preparing,
    Ready,
    Comparing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrepareOutcome {
    Prepared,
    /// Another run (or a comparison) was already active; nothing was done.
    Skipped,
    /// A clip was replaced while the run was in flight; its spectra were
    /// discarded and the state is back to `Idle`.
    Superseded,
}

/// Coordinates preparation and comparison of two clips.
///
/// Only one preparation runs at a time. Comparing while a preparation is in
/// flight is rejected with [`AnalysisError::NotReady`] rather than queued.
pub struct Orchestrator {
    builder: SequenceBuilder,
    time_step: f32,
    progress: ProgressSink,
    clips: Mutex<[Option<ClipSamples>; 2]>,
    /// Bumped on every clip change, under the `clips` lock.
    generation: AtomicU64,
    state: Mutex<PreparationState>,
    sequences: Mutex<(SpectralSequence, SpectralSequence)>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Orchestrator {
    pub fn new(builder: SequenceBuilder, time_step: f32) -> Self {
        Self::with_progress(builder, time_step, Arc::new(|_: f32, _: &str| {}))
    }

    pub fn with_progress(builder: SequenceBuilder, time_step: f32, progress: ProgressSink) -> Self {
        Self {
            builder,
            time_step,
            progress,
            clips: Mutex::new([None, None]),
            generation: AtomicU64::new(0),
            state: Mutex::new(PreparationState::Idle),
            sequences: Mutex::new((Vec::new(), Vec::new())),
        }
    }

    pub fn state(&self) -> PreparationState {
        *lock(&self.state)
    }

    fn report(&self, fraction: f32, message: &str) {
        (self.progress)(fraction, message);
    }

    /// Store clip 1 or 2. Replacing a clip invalidates prepared spectra.
    pub fn set_clip(&self, number: u8, clip: ClipSamples) -> Result<()> {
        let slot = slot_index(number)?;
        {
            let mut clips = lock(&self.clips);
            clips[slot] = Some(clip);
            self.generation.fetch_add(1, Ordering::SeqCst);
        }

        let mut state = lock(&self.state);
        if *state == PreparationState::Ready {
            *state = PreparationState::Idle;
        }
        Ok(())
    }

    /// Finish a captured clip: trim silence, keep it, and persist it as WAV
    /// under `output_dir` when one is given.
    ///
    /// A silent clip is rejected and leaves the slot untouched. A write
    /// failure is returned after the clip has been stored.
    pub fn record_clip(
        &self,
        number: u8,
        raw: &ClipSamples,
        threshold: f32,
        output_dir: Option<&Path>,
    ) -> Result<Option<PathBuf>> {
        slot_index(number)?;

        let Some(clip) = raw.trimmed(threshold) else {
            log::warn!("Clip {} is completely silent", number);
            self.report(1.0, &format!("Failed to record clip {}", number));
            return Err(AnalysisError::InvalidInput(format!(
                "clip {} is completely silent",
                number
            )));
        };

        self.set_clip(number, clip.clone())?;
        self.report(1.0, &format!("Clip {} recorded successfully", number));

        let Some(dir) = output_dir else {
            return Ok(None);
        };

        match wav::save_recording(&clip, dir, number) {
            Ok(path) => {
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
                self.report(1.0, &format!("Audio saved: {}", name.unwrap_or_default()));
                Ok(Some(path))
            }
            Err(e) => {
                log::error!("Error saving audio file: {}", e);
                self.report(1.0, "Error saving audio file");
                Err(e)
            }
        }
    }

    /// Stop an in-flight preparation before its next step.
    pub fn cancel(&self) {
        self.builder.cancel_flag().store(true, Ordering::SeqCst);
    }

    pub fn prepare(&self) -> Result<PrepareOutcome> {
        {
            let mut state = lock(&self.state);
            match *state {
                PreparationState::Preparing | PreparationState::Comparing => {
                    log::debug!("Preparation skipped, state is {:?}", *state);
                    return Ok(PrepareOutcome::Skipped);
                }
                _ => {
                    self.builder.reset_cancel();
                    *state = PreparationState::Preparing;
                }
            }
        }

        self.report(0.0, "Starting preparation...");

        match self.build_sequences() {
            Ok((generation, sequences)) => {
                let current = {
                    let mut held = lock(&self.sequences);
                    let mut state = lock(&self.state);
                    let current = self.generation.load(Ordering::SeqCst) == generation;
                    if current {
                        *held = sequences;
                        *state = PreparationState::Ready;
                    } else {
                        *state = PreparationState::Idle;
                    }
                    current
                };
                if !current {
                    log::warn!("Clips changed during preparation, discarding spectra");
                    self.report(0.0, "Clips changed during preparation");
                    return Ok(PrepareOutcome::Superseded);
                }
                self.report(1.0, "Audio preparation complete. Ready for comparison.");
                Ok(PrepareOutcome::Prepared)
            }
            Err(e) => {
                log::error!("Error during audio preparation: {}", e);
                *lock(&self.state) = PreparationState::Idle;
                self.report(0.0, "Error during preparation");
                Err(e)
            }
        }
    }

    /// Spectra for both clips, tagged with the clip generation they were
    /// built from.
    fn build_sequences(&self) -> Result<(u64, (SpectralSequence, SpectralSequence))> {
        let (generation, [first, second]) = {
            let clips = lock(&self.clips);
            (self.generation.load(Ordering::SeqCst), clips.clone())
        };
        let (Some(first), Some(second)) = (first, second) else {
            self.report(0.0, "Error: Missing audio clips");
            return Err(AnalysisError::InvalidInput(
                "both clips must be recorded before comparing".into(),
            ));
        };

        log::debug!("Building spectra of {} bins", self.builder.sample_size());
        {
            let mut sequences = lock(&self.sequences);
            sequences.0.clear();
            sequences.1.clear();
        }

        let progress = |f: f32, m: &str| self.report(f, m);
        let a = self
            .builder
            .build(&first, self.time_step, "Preparing audio 1", progress)?;
        let b = self
            .builder
            .build(&second, self.time_step, "Preparing audio 2", progress)?;
        Ok((generation, (a, b)))
    }

    /// Number of spectra currently held for each clip.
    pub fn sequence_lengths(&self) -> (usize, usize) {
        let sequences = lock(&self.sequences);
        (sequences.0.len(), sequences.1.len())
    }

    /// Compare the two clips, preparing them first when needed.
    pub fn compare(&self) -> Result<SimilarityReport> {
        match self.state() {
            PreparationState::Preparing | PreparationState::Comparing => {
                return Err(AnalysisError::NotReady)
            }
            PreparationState::Idle => {
                if self.prepare()? != PrepareOutcome::Prepared {
                    return Err(AnalysisError::NotReady);
                }
            }
            PreparationState::Ready => {}
        }

        {
            let mut state = lock(&self.state);
            if *state != PreparationState::Ready {
                return Err(AnalysisError::NotReady);
            }
            *state = PreparationState::Comparing;
        }

        self.report(0.5, "Starting comparison...");
        let result = {
            let sequences = lock(&self.sequences);
            compare::compare_with_progress(&sequences.0, &sequences.1, |f, m| self.report(f, m))
        };
        *lock(&self.state) = PreparationState::Ready;

        if let Ok(report) = &result {
            log::info!("Audio similarity: {:.2}%", report.score);
        }
        result
    }

    /// [`compare`](Self::compare) flattened to a score, with
    /// [`NOT_READY_SCORE`] standing in for any failure.
    pub fn compare_score(&self) -> f32 {
        match self.compare() {
            Ok(report) => report.score,
            Err(e) => {
                log::warn!("Comparison failed or is not ready yet: {}", e);
                NOT_READY_SCORE
            }
        }
    }
}

fn slot_index(number: u8) -> Result<usize> {
    match number {
        1 | 2 => Ok(number as usize - 1),
        _ => Err(AnalysisError::InvalidInput(format!(
            "clip number must be 1 or 2, got {}",
            number
        ))),
    }
}
