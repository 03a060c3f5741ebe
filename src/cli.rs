use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "transmux")]
#[command(author, version, about = "Device-aware media analysis and conversion")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe a media file and display its track model
    Analyse {
        /// File to analyse
        #[arg(required = true)]
        file: PathBuf,

        /// Target device (see `devices` for identifiers)
        #[arg(short, long, default_value = "generic")]
        device: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert a media file for a target device
    Convert {
        /// Input file to convert
        #[arg(required = true)]
        file: PathBuf,

        /// Target device (see `devices` for identifiers)
        #[arg(short, long, default_value = "generic")]
        device: String,

        /// Output folder (overrides the configured one)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Burn the selected subtitle track into the video
        #[arg(long)]
        subtitles: bool,

        /// Recode the video even if the device could play it as-is
        #[arg(long)]
        force_recode: bool,

        /// Encode HEVC (H.265) on devices that support it
        #[arg(long)]
        hevc: bool,

        /// Produce a 30-second ringtone instead of a full audio track
        #[arg(long)]
        ringtone: bool,

        /// Audio track index to use instead of the default
        #[arg(long)]
        audio_track: Option<usize>,
    },

    /// Convert a DVD rip folder for a target device
    ConvertDisc {
        /// Disc folder (containing VIDEO_TS)
        #[arg(required = true)]
        path: PathBuf,

        /// Target device (see `devices` for identifiers)
        #[arg(short, long, default_value = "ps3")]
        device: String,

        /// Output folder (overrides the configured one)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the supported target devices
    Devices,

    /// Check that required external tools are available
    CheckTools,

    /// Display version information
    Version,
}
