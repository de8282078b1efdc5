//! # Events Module
//!
//! Progress reporting for long-running sorts.
//!
//! The core emits events through a channel so any front end (CLI, GUI,
//! tests) can subscribe without the engine knowing about it. Sending is
//! fire-and-forget.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Sort(SortEvent::Progress(p)) = event {
//!             println!("{:.0}% {}", p.percent(), p.current_path.display());
//!         }
//!     }
//! });
//!
//! pipeline.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
