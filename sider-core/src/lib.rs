//! # Sider Core
//!
//! A single-node in-memory key-value store with per-entry expiry.
//!
//! ## Features
//!
//! - One exclusive lock guards the whole table, reads included
//! - Values are opaque bytes; expiry is an absolute epoch-nanosecond timestamp
//!   (`-1` means never)
//! - Expired entries stay visible until a sweep removes them
//! - Background [`Sweeper`] task with a configurable interval
//! - Whole-table snapshots to a file
//!
//! ## Example
//!
//! ```rust,no_run
//! use sider_core::{Store, Sweeper, SweeperConfig, NEVER_EXPIRES};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Store::load_from("sider.snapshot").unwrap_or_default();
//!
//!     // Sweep expired entries every 30 seconds
//!     let config = SweeperConfig::default().with_interval(Duration::from_secs(30));
//!     let sweeper = Sweeper::spawn(store.clone(), config);
//!
//!     store.set("user:123", &b"John Doe"[..], NEVER_EXPIRES);
//!     assert_eq!(store.ttl("user:123"), NEVER_EXPIRES);
//!
//!     store.save_to("sider.snapshot").unwrap();
//!     sweeper.join().await;
//! }
//! ```

mod config;
mod entry;
mod error;
mod snapshot;
mod store;
mod sweeper;

pub use config::SweeperConfig;
pub use entry::{now_nanos, Entry, NEVER_EXPIRES};
pub use error::{SnapshotError, StoreError};
pub use store::{Store, KEY_MISSING_TTL};
pub use sweeper::{Sweeper, SweeperHandle, MIN_SWEEP_INTERVAL};
