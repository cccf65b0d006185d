// src/watch/engine.rs

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinSet};
use tracing::{debug, error, info};

use crate::config::ConfigSection;
use crate::errors::{BuildError, Result};
use crate::types::TriggerWhileRunningBehaviour;
use crate::watch::core::{WatchCommand, WatchCore};
use crate::watch::path_utils::project_relative;
use crate::watch::subscription::WatchSubscription;
use crate::watch::watcher::spawn_watcher;

/// Input of the watch loop.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// One debounced batch of changed paths (absolute or root-relative).
    Changed(Vec<PathBuf>),
}

/// Long-running watch session over a fixed set of subscriptions.
///
/// Each debounced batch of filesystem changes triggers every subscription
/// whose spec matches at least one changed path, at most once. Overlapping
/// triggers for the same subscription follow the configured
/// [`TriggerWhileRunningBehaviour`].
#[derive(Debug)]
pub struct WatchEngine {
    root: PathBuf,
    subscriptions: Vec<WatchSubscription>,
    behaviour: TriggerWhileRunningBehaviour,
    queue_length: usize,
    debounce: Duration,
}

impl WatchEngine {
    pub fn new(root: impl Into<PathBuf>, subscriptions: Vec<WatchSubscription>) -> Self {
        Self {
            root: root.into(),
            subscriptions,
            behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: 1,
            debounce: Duration::from_millis(100),
        }
    }

    /// Take overlap policy and debounce window from `[config]`.
    pub fn with_config(mut self, cfg: &ConfigSection) -> Self {
        self.behaviour = cfg.triggered_while_running_behaviour;
        self.queue_length = cfg.queue_length;
        self.debounce = Duration::from_millis(cfg.debounce_ms);
        self
    }

    pub fn with_behaviour(mut self, behaviour: TriggerWhileRunningBehaviour, queue_length: usize) -> Self {
        self.behaviour = behaviour;
        self.queue_length = queue_length;
        self
    }

    pub fn subscriptions(&self) -> &[WatchSubscription] {
        &self.subscriptions
    }

    /// Indices of the subscriptions matched by at least one of `paths`.
    pub fn matching(&self, paths: &[PathBuf]) -> Vec<usize> {
        let rel: Vec<String> = paths
            .iter()
            .filter_map(|p| project_relative(&self.root, p))
            .collect();

        self.subscriptions
            .iter()
            .enumerate()
            .filter(|(_, sub)| rel.iter().any(|p| sub.matches(p)))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Watch the filesystem until interrupted.
    ///
    /// Only returns on a fatal invocation error or if the watcher stops.
    pub async fn watch(mut self) -> Result<()> {
        // notify reports absolute, canonical paths.
        if let Ok(root) = self.root.canonicalize() {
            self.root = root;
        }
        let (tx, rx) = mpsc::unbounded_channel();

        let mut dirs: Vec<PathBuf> = self
            .subscriptions
            .iter()
            .map(|s| self.root.join(s.spec().base()))
            .collect();
        dirs.sort();
        dirs.dedup();

        let _watcher = spawn_watcher(&self.root, dirs, self.debounce, tx)?;
        self.run(rx).await
    }

    /// Drive the session from an explicit event stream.
    ///
    /// Returns `Ok(())` once `events` is closed and every started or queued
    /// invocation has finished.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<WatchEvent>) -> Result<()> {
        let mut core = WatchCore::new(self.subscriptions.len(), self.behaviour, self.queue_length);
        let mut running: JoinSet<(usize, u64, Result<()>)> = JoinSet::new();
        let mut handles: HashMap<(usize, u64), AbortHandle> = HashMap::new();
        let mut events_open = true;

        let names: Vec<&str> = self.subscriptions.iter().map(|s| s.name()).collect();
        info!(subscriptions = ?names, "watching for changes");

        loop {
            if !events_open && running.is_empty() {
                break;
            }

            let commands = tokio::select! {
                event = events.recv(), if events_open => match event {
                    Some(WatchEvent::Changed(paths)) => {
                        let matched = self.matching(&paths);
                        debug!(changed = paths.len(), ?matched, "change batch");
                        if !matched.is_empty() {
                            let triggered: Vec<&str> =
                                matched.iter().map(|&i| self.subscriptions[i].name()).collect();
                            info!(?triggered, "change detected");
                        }
                        core.handle_changes(&matched)
                    }
                    None => {
                        debug!("watch event stream closed");
                        events_open = false;
                        Vec::new()
                    }
                },
                Some(joined) = running.join_next(), if !running.is_empty() => match joined {
                    Ok((idx, generation, Ok(()))) => {
                        handles.remove(&(idx, generation));
                        core.handle_finished(idx, generation)
                    }
                    Ok((idx, _generation, Err(e))) => {
                        error!(
                            subscription = %self.subscriptions[idx].name(),
                            error = %e,
                            "fatal error; ending watch session"
                        );
                        running.abort_all();
                        return Err(e);
                    }
                    Err(e) if e.is_cancelled() => Vec::new(),
                    Err(e) => {
                        running.abort_all();
                        return Err(BuildError::Other(e.into()));
                    }
                },
            };

            for command in commands {
                match command {
                    WatchCommand::Start {
                        subscription,
                        generation,
                    } => {
                        let sub = &self.subscriptions[subscription];
                        debug!(subscription = %sub.name(), generation, "starting invocation");
                        let fut = sub.invoke();
                        let handle = running.spawn(async move { (subscription, generation, fut.await) });
                        handles.insert((subscription, generation), handle);
                    }
                    WatchCommand::Abort {
                        subscription,
                        generation,
                    } => {
                        if let Some(handle) = handles.remove(&(subscription, generation)) {
                            handle.abort();
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
