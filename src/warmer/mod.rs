//! Warmer module: the HTTP side of cache warmup
//!
//! - `transport`: the network seam and its reqwest implementation
//! - `outcome`: per-URL response classification
//! - `fetcher`: bounded-concurrency batch warming with retry and backoff

mod fetcher;
mod outcome;
mod transport;

pub use fetcher::{Fetcher, RetryPolicy, RetryState};
pub use outcome::FetchOutcome;
pub use transport::{build_http_client, HttpTransport, Transport, TransportError};
