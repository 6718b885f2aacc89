//! A bounded, lock-free, multi-producer, multi-consumer FIFO queue.
//!
//! [`Queue`] is a fixed-capacity ring buffer for handing values between producer
//! and consumer threads. Each side coordinates through a pair of monotonic counters:
//! a cursor that threads advance to claim a slot and a barrier that they advance,
//! strictly in claim order, once they are done with it. No locks, no per-slot flags.
//!
//! ```
//! use lfring::Queue;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let queue = Arc::new(Queue::new(16).unwrap());
//! let consumer_queue = queue.clone();
//!
//! let consumer = thread::spawn(move || {
//!     let mut received = Vec::new();
//!
//!     while received.len() < 100 {
//!         if let Some(value) = consumer_queue.dequeue() {
//!             received.push(value);
//!         }
//!     }
//!
//!     received
//! });
//!
//! for i in 0..100 {
//!     let mut value = i;
//!
//!     while let Err(rejected) = queue.enqueue(value) {
//!         value = rejected;
//!     }
//! }
//!
//! assert_eq!(consumer.join().unwrap(), (0..100).collect::<Vec<_>>());
//! ```
#![deny(clippy::all)]
#![deny(clippy::assertions_on_result_states)]
#![deny(clippy::match_wild_err_arm)]
#![deny(clippy::allow_attributes_without_reason)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    reason = "Since we cannot make a constant function non-constant after its release,
    we need to look for a reason to make it constant, and not vice versa."
)]
#![allow(clippy::inline_always, reason = "We write highly optimized code.")]
#![allow(
    clippy::must_use_candidate,
    reason = "It is better to developer think about it."
)]
#![allow(
    clippy::module_name_repetitions,
    reason = "This is acceptable most of the time."
)]
#![allow(clippy::redundant_pub_crate, reason = "It improves readability.")]
#![allow(
    rustdoc::private_intra_doc_links,
    reason = "It allows to create more readable docs."
)]
pub mod backoff;
pub mod cache_padded;
pub mod capacity;
pub mod error;
#[cfg(all(lfring_loom, test))]
mod loom;
mod loom_bindings;
pub mod mpmc;
pub mod sequence;
#[cfg(all(test, not(lfring_loom)))]
mod test_lock;
#[cfg(all(test, not(lfring_loom)))]
mod test_utils;

pub use backoff::Backoff;
pub use capacity::Capacity;
pub use error::{ConfigError, ConfigResult};
pub use mpmc::{Queue, UnpaddedQueue};
