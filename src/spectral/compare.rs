use serde::Serialize;

use super::dft::Spectrum;
use super::sequence::SpectralSequence;
use crate::error::{AnalysisError, Result};

/// Number of leading spectra consulted per sequence.
pub const SPECTRUM_COUNT: usize = 10;
/// Magnitude a bin must exceed (in either spectrum) to count.
pub const MIN_AMPLITUDE: f32 = 0.01;

/// Result of comparing one pair of spectra.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpectrumMatch {
    /// Similarity in percent.
    Similar(f32),
    /// No bin was loud enough in either spectrum.
    Inconclusive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOutcome {
    Scored,
    /// Every pair was inconclusive; the score is forced to zero.
    NoValidComparisons,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimilarityReport {
    /// Average similarity in [0, 100].
    pub score: f32,
    pub outcome: ComparisonOutcome,
    pub compared_pairs: usize,
    pub inconclusive_pairs: usize,
}

/// Mean absolute magnitude difference over significant bins, as a
/// percentage similarity clamped to [0, 100].
pub fn compare_spectrum(a: &Spectrum, b: &Spectrum) -> SpectrumMatch {
    let mut total_difference = 0.0f32;
    let mut significant_bins = 0usize;

    for (ca, cb) in a.iter().zip(b) {
        let ma = ca.magnitude();
        let mb = cb.magnitude();
        if ma > MIN_AMPLITUDE || mb > MIN_AMPLITUDE {
            total_difference += (ma - mb).abs();
            significant_bins += 1;
        }
    }

    if significant_bins == 0 {
        return SpectrumMatch::Inconclusive;
    }

    let average_difference = total_difference / significant_bins as f32;
    SpectrumMatch::Similar(((1.0 - average_difference) * 100.0).clamp(0.0, 100.0))
}

pub fn compare(a: &SpectralSequence, b: &SpectralSequence) -> Result<SimilarityReport> {
    compare_with_progress(a, b, |_, _| {})
}

/// Compare the first [`SPECTRUM_COUNT`] spectra of two equally long
/// sequences, reporting progress over the upper half of the range.
pub fn compare_with_progress<F>(
    a: &SpectralSequence,
    b: &SpectralSequence,
    mut on_progress: F,
) -> Result<SimilarityReport>
where
    F: FnMut(f32, &str),
{
    if a.len() != b.len() {
        on_progress(0.5, "Error: Frequency data counts do not match");
        return Err(AnalysisError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let count = SPECTRUM_COUNT.min(a.len());
    let mut total = 0.0f32;
    let mut compared_pairs = 0;
    let mut inconclusive_pairs = 0;

    for i in 0..count {
        if a[i].len() != b[i].len() {
            return Err(AnalysisError::LengthMismatch {
                left: a[i].len(),
                right: b[i].len(),
            });
        }

        match compare_spectrum(&a[i], &b[i]) {
            SpectrumMatch::Similar(similarity) => {
                total += similarity;
                compared_pairs += 1;
            }
            SpectrumMatch::Inconclusive => {
                log::debug!("Spectrum pair {} inconclusive, skipped", i);
                inconclusive_pairs += 1;
            }
        }

        let done = (i + 1) as f32 / count as f32;
        on_progress(
            0.5 + done * 0.5,
            &format!("Comparing spectrums ({:.0}%)", done * 100.0),
        );
    }

    if compared_pairs == 0 {
        log::warn!("No valid comparisons were made. The audio might be too quiet or empty.");
        on_progress(1.0, "Warning: No valid comparisons");
        return Ok(SimilarityReport {
            score: 0.0,
            outcome: ComparisonOutcome::NoValidComparisons,
            compared_pairs,
            inconclusive_pairs,
        });
    }

    let score = total / compared_pairs as f32;
    on_progress(1.0, &format!("Comparison complete. Similarity: {:.2}%", score));

    Ok(SimilarityReport {
        score,
        outcome: ComparisonOutcome::Scored,
        compared_pairs,
        inconclusive_pairs,
    })
}
