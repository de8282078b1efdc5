//! # Media Sorter
//!
//! Files photos, RAW images, video and audio into a dated folder tree.
//!
//! ## Core Philosophy
//! - **Never overwrite** - clashing names get a numeric suffix
//! - **Never file twice** - a content-hash index makes repeated runs idempotent
//! - **Earliest date wins** - when the same content turns up with two dates
//!
//! ## Architecture
//! The library is split into a core engine (front-end agnostic) and the CLI:
//! - `core` - The sorting engine
//! - `events` - Event-driven progress reporting
//! - `error` - Error types with context

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{Result, SorterError};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. `RUST_LOG` wins
/// over `default_level` when set. Calling it twice is harmless.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
