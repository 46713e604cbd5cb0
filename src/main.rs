//! streamreader demo binary.
//!
//! Seeds an in-memory object store with a small stream, drives a few reads
//! through a `StreamReader`, and prints what happened. There is no network
//! server here — the real collaborators (`ObjectManager`, `ObjectReader`)
//! are external to this crate; this binary exists to exercise the library
//! against the bundled in-memory stand-in.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streamreader::cache::BlockCache;
use streamreader::config::ReaderConfig;
use streamreader::object::memory::InMemoryObjectStore;
use streamreader::stream::StreamReader;

const STREAM_ID: u64 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    let config = ReaderConfig::parse();
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    print_banner();

    let store = Arc::new(InMemoryObjectStore::new(STREAM_ID));
    // O1=[0,100), O2=[100,250), O3=[250,400) — the layout used by this
    // crate's own end-to-end tests.
    store.push_object(&[(0, 50, 50), (50, 100, 50)]);
    store.push_object(&[(100, 175, 75), (175, 250, 75)]);
    store.push_object(&[(250, 325, 75), (325, 400, 75)]);

    let cache = Arc::new(BlockCache::new(config.cache_capacity));
    let reader = StreamReader::new(STREAM_ID, store, cache, config, 0);

    info!("reading [0, 400) with a 4096 byte budget");
    match reader.read(0, 400, 4096).await {
        Ok(result) => {
            info!(
                "got {} batch(es), access_type={:?}",
                result.batches.len(),
                result.access_type
            );
            for batch in &result.batches {
                info!(
                    "  batch [{}, {}] ({} bytes)",
                    batch.first_offset(),
                    batch.last_offset(),
                    batch.size()
                );
            }
        }
        Err(e) => {
            error!("read failed: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let stats = reader.stats().await;
    info!(
        "stats: bytes_read={} batches_read={} cache_hits={} cache_misses={} retries={} readahead_inflight={}",
        stats.bytes_read,
        stats.batches_read,
        stats.cache_hits,
        stats.cache_misses,
        stats.retries,
        stats.readahead_bytes_inflight
    );

    ExitCode::SUCCESS
}

fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("streamreader v{}", version);
}

fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "streamreader=debug"
    } else {
        "streamreader=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| env_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
