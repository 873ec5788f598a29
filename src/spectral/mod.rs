pub mod compare;
pub mod complex;
pub mod dft;
pub mod fft;
pub mod sequence;
pub mod window;

pub use compare::SimilarityReport;
pub use complex::Complex;
pub use dft::Spectrum;
pub use sequence::{SequenceBuilder, SpectralSequence};
