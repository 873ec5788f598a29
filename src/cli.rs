use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "echomatch", about = "Spectral similarity and pitch estimation for recorded clips")]
pub struct Cli {
    /// Config file (defaults to echomatch.toml or the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compare two clips and print a 0-100 similarity score
    Compare {
        /// First clip (WAV, MP3, FLAC, OGG)
        first: PathBuf,

        /// Second clip
        second: PathBuf,

        /// Bins per spectrum
        #[arg(long, default_value_t = 1024)]
        sample_size: usize,

        /// Seconds between spectra
        #[arg(long, default_value_t = 0.01)]
        time_step: f32,

        /// Worker threads (0 = one per core)
        #[arg(long, default_value_t = 0)]
        workers: usize,

        /// Trim leading/trailing silence before comparing
        #[arg(long)]
        trim: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Trim silence from a clip and save it as 16-bit PCM WAV
    Trim {
        input: PathBuf,

        /// Clip number used in the saved file name
        #[arg(long, default_value_t = 1)]
        clip: u8,

        /// Amplitude a sample must exceed to count as sound
        #[arg(long, default_value_t = 0.01)]
        threshold: f32,

        /// Directory for the saved recording
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Estimate the dominant frequency of a whole clip
    Pitch { input: PathBuf },

    /// Replay a clip block by block as a live stream
    Listen {
        input: PathBuf,

        /// Samples per block (power of two)
        #[arg(long, default_value_t = 4096)]
        block_size: usize,

        /// Pause between blocks in milliseconds (0 = as fast as possible)
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,
    },
}
