//! Command-line interface for ringdeck
//!
//! Handles argument parsing, logging configuration, and building the
//! transport configuration.

use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use ringdeck_core::{PcmFormat, TransportConfiguration};

/// ringdeck - record into a ring buffer and play it back at the same time
#[derive(Parser, Debug)]
#[command(name = "ringdeck")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Increase logging verbosity
    /// -v = info, -vv = debug, -vvv = trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Sample rate in Hz
    #[arg(long, default_value_t = 44100)]
    pub sample_rate: u32,

    /// Channel count (1 or 2)
    #[arg(long, default_value_t = 1)]
    pub channels: u16,

    /// Bits per sample (8, 16, 24 or 32)
    #[arg(long, default_value_t = 16)]
    pub bits: u16,

    /// Ring buffer length in seconds
    #[arg(long, default_value_t = 5.0)]
    pub buffer_secs: f64,

    /// Control loop period in milliseconds
    #[arg(long, default_value_t = 10)]
    pub tick_ms: u64,

    /// How far playback trails a live recording, in milliseconds
    #[arg(long, default_value_t = 50)]
    pub guard_ms: u64,

    /// Start with looping enabled
    #[arg(long = "loop")]
    pub loop_enabled: bool,

    /// Capture device ID (see the 'd' command)
    #[arg(long)]
    pub capture_device: Option<String>,

    /// Where 'w' saves the recording
    #[arg(short, long, default_value = "record.wav")]
    pub output: PathBuf,

    /// Write a .metadata.json sidecar with every saved recording
    #[arg(long)]
    pub metadata: bool,

    /// Simulated capture speed relative to real time
    #[arg(long, default_value_t = 1.0)]
    pub capture_speed: f64,

    /// Simulated playback speed relative to real time
    #[arg(long, default_value_t = 1.0)]
    pub playback_speed: f64,

    /// Frequency of the simulated input tone in Hz
    #[arg(long, default_value_t = 440.0)]
    pub tone_hz: f64,
}

impl Args {
    /// Get the log level filter based on verbosity flags
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else {
            match self.verbose {
                0 => LevelFilter::Warn,
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }

    pub fn to_config(&self) -> TransportConfiguration {
        TransportConfiguration {
            format: PcmFormat::new(self.channels, self.bits, self.sample_rate),
            buffer_secs: self.buffer_secs,
            tick_interval_ms: self.tick_ms,
            guard_ms: self.guard_ms,
            loop_enabled: self.loop_enabled,
            capture_device_id: self.capture_device.clone(),
            output_path: self.output.clone(),
            write_metadata_sidecar: self.metadata,
        }
    }
}

/// Initialize the logging system based on CLI arguments
pub fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::new();

    // Keep dependencies quiet, our crates at the requested level
    builder.filter_level(LevelFilter::Warn);
    builder.filter_module("ringdeck_core", args.log_level());
    builder.filter_module("ringdeck", args.log_level());

    builder.format_timestamp_millis().init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_classic_five_second_take() {
        let args = Args::try_parse_from(["ringdeck"]).unwrap();
        let config = args.to_config();

        assert_eq!(config.format, PcmFormat::new(1, 16, 44100));
        assert_eq!(config.capacity_bytes(), 441000);
        assert!(!config.loop_enabled);
        assert_eq!(config.output_path, PathBuf::from("record.wav"));
        assert!(config.validate().is_ok());
        assert_eq!(args.log_level(), LevelFilter::Warn);
    }

    #[test]
    fn flags_flow_into_config() {
        let args = Args::try_parse_from([
            "ringdeck",
            "--channels",
            "2",
            "--sample-rate",
            "48000",
            "--loop",
            "--capture-device",
            "sim-line-in",
            "-o",
            "take.wav",
            "--metadata",
            "-vv",
        ])
        .unwrap();
        let config = args.to_config();

        assert_eq!(config.format.channels, 2);
        assert_eq!(config.format.sample_rate_hz, 48000);
        assert!(config.loop_enabled);
        assert_eq!(config.capture_device_id.as_deref(), Some("sim-line-in"));
        assert_eq!(config.output_path, PathBuf::from("take.wav"));
        assert!(config.write_metadata_sidecar);
        assert_eq!(args.log_level(), LevelFilter::Debug);
    }

    #[test]
    fn quiet_wins_over_verbose() {
        let args = Args::try_parse_from(["ringdeck", "-q", "-vvv"]).unwrap();
        assert_eq!(args.log_level(), LevelFilter::Error);
    }
}
