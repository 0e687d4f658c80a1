//! # Event subscribers for the modvisor engine.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Registry/Scheduler/Loaders ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                                   ┌────────┴────────┐
//!                                                                   ▼                 ▼
//!                                                               LogWriter           Custom
//! ```

mod log;
mod subscribe;
mod subscriber_set;

pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;

pub(crate) use subscriber_set::panic_message;
