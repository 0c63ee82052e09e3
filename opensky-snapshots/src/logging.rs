//! Diagnostic logging to stderr, filtered by `RUST_LOG`.
//!
//! Status lines meant for the operator are printed to stdout by `report`;
//! this is only for `debug!`/`trace!` detail.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    // A second init (tests, embedding) is harmless
    let _ = tracing_subscriber::registry().with(filter).with(fmt).try_init();
}
