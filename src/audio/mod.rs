pub mod clip;
pub mod decode;
pub mod wav;

pub use clip::ClipSamples;
