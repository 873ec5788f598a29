//! Spectral similarity of recorded clips, WAV persistence and live pitch
//! estimation.
//!
//! The comparison pipeline downmixes each clip, slides a direct DFT across
//! it at a fixed time step and scores the first spectra of both clips
//! against each other. See [`orchestrator::Orchestrator`] for the entry
//! point used by interactive callers.

pub mod audio;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod spectral;
pub mod stream;

pub use error::{AnalysisError, Result};
