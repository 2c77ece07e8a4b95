//! A pool of worker threads serving OpenStreetMap datasets.
//!
//! Every dataset lives on exactly one worker, which owns its store, spatial index and tile
//! strategy. The [`RemoteCoordinator`] routes calls by dataset id, relays progress through an
//! [`EventBus`] and enforces an optional per-call deadline.

mod builder;
mod config;
mod coordinator;
mod events;
pub mod protocol;
mod worker;

pub use builder::RuntimeBuilder;
pub use config::RemoteConfig;
pub use coordinator::{RemoteCoordinator, StrategyFactory};
pub use events::{Event, EventBus, ListenerId, LogAdapter, ProgressEvent};
pub use protocol::{DatasetInfo, Nearby};
