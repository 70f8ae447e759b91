//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::{FileStreamer, RangeEndPolicy, Throttle, DEFAULT_CHUNK_SIZE};

#[derive(Debug, Clone, Parser)]
#[command(name = "pdf-range-server")]
#[command(about = "Serve a directory of documents with HTTP Range support")]
pub struct Config {
    /// Directory holding the documents to serve
    #[arg(long, env = "PDF_ROOT", default_value = "static/pdfs")]
    pub root: PathBuf,

    /// Address to listen on
    #[arg(long, env = "PDF_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Maximum number of bytes read from disk per chunk
    #[arg(long, env = "PDF_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// How to treat a range end that lies past the end of the file
    #[arg(long, env = "PDF_RANGE_END", value_enum, default_value_t = RangeEndPolicy::Clamp)]
    pub range_end: RangeEndPolicy,

    /// Pause before every throttled piece, in milliseconds. Throttling is off when unset
    #[arg(long, env = "PDF_THROTTLE_DELAY_MS")]
    pub throttle_delay_ms: Option<u64>,

    /// Size of each throttled piece in bytes
    #[arg(long, env = "PDF_THROTTLE_CHUNK_SIZE", default_value_t = Throttle::DEFAULT_CHUNK_SIZE)]
    pub throttle_chunk_size: usize,
}

impl Config {
    pub fn serve_options(&self) -> ServeOptions {
        ServeOptions {
            root: self.root.clone(),
            streamer: FileStreamer::new(self.chunk_size),
            range_end: self.range_end,
            throttle: self
                .throttle_delay_ms
                .map(|ms| Throttle::new(Duration::from_millis(ms)).with_chunk_size(self.throttle_chunk_size)),
        }
    }
}

/// Everything request handlers need, fixed at startup.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub root: PathBuf,
    pub streamer: FileStreamer,
    pub range_end: RangeEndPolicy,
    pub throttle: Option<Throttle>,
}

impl ServeOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ServeOptions {
            root: root.into(),
            streamer: FileStreamer::default(),
            range_end: RangeEndPolicy::default(),
            throttle: None,
        }
    }
}
