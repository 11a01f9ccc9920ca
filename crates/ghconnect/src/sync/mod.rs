//! In-process orchestration of a full sync.
//!
//! The drivers in [`crate::connector`] are stateless per call and leave
//! pacing and retries to their caller. This module is that caller for
//! standalone use: [`SyncRunner`] walks the resource tree, drains every page
//! token, and collects a [`Catalog`].
//!
//! # Example
//!
//! ```ignore
//! use ghconnect::sync::{SyncOptions, SyncRunner};
//!
//! let runner = SyncRunner::new(Arc::new(connector), SyncOptions::default(), cancel.clone());
//! let catalog = runner.run().await?;
//! println!("{} grants", catalog.grants.len());
//! ```

mod runner;
mod throttle;

pub use runner::{Catalog, SyncOptions, SyncRunner};
pub use throttle::{DEFAULT_REQUESTS_PER_SECOND, Throttle, delay_until_reset};
