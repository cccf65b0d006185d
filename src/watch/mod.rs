// src/watch/mod.rs

//! File watching and incremental rebuilds.
//!
//! This module is responsible for:
//! - Binding path specs to pipeline invocations ([`WatchSubscription`]).
//! - Deciding what to start, queue or cancel on each change batch
//!   ([`core::WatchCore`], pure and synchronous).
//! - Wiring up a debounced cross-platform filesystem watcher (`notify`).
//!
//! It does **not** know about the task graph; the `watch` task hands it a
//! fresh set of subscriptions once the initial build has succeeded.

pub mod core;
pub mod engine;
pub mod path_utils;
pub mod subscription;
pub mod watcher;

pub use engine::{WatchEngine, WatchEvent};
pub use subscription::{InvocationFuture, WatchSubscription};
pub use watcher::{WatcherHandle, spawn_watcher};
