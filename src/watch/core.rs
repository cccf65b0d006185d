// src/watch/core.rs

//! Pure decision logic for the watch session.
//!
//! [`WatchCore`] tracks, per subscription, whether an invocation is running
//! and how many re-runs are queued behind it. It turns "these subscriptions
//! matched a change" and "this invocation finished" into [`WatchCommand`]s
//! for the async shell. No Tokio, no filesystem.

use tracing::{debug, warn};

use crate::types::TriggerWhileRunningBehaviour;

/// Instruction for the async shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchCommand {
    /// Start a new invocation of the subscription.
    Start { subscription: usize, generation: u64 },
    /// Abort the running invocation with this generation.
    Abort { subscription: usize, generation: u64 },
}

#[derive(Debug, Clone, Default)]
struct SubscriptionState {
    /// Generation of the running invocation, if any.
    running: Option<u64>,
    queued: usize,
}

#[derive(Debug)]
pub struct WatchCore {
    behaviour: TriggerWhileRunningBehaviour,
    queue_length: usize,
    states: Vec<SubscriptionState>,
    next_generation: u64,
}

impl WatchCore {
    /// `queue_length` is clamped to at least 1.
    pub fn new(
        subscriptions: usize,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
    ) -> Self {
        Self {
            behaviour,
            queue_length: queue_length.max(1),
            states: vec![SubscriptionState::default(); subscriptions],
            next_generation: 0,
        }
    }

    pub fn is_running(&self, subscription: usize) -> bool {
        self.states
            .get(subscription)
            .is_some_and(|s| s.running.is_some())
    }

    pub fn queued(&self, subscription: usize) -> usize {
        self.states.get(subscription).map_or(0, |s| s.queued)
    }

    /// Whether nothing is running or queued.
    pub fn is_idle(&self) -> bool {
        self.states
            .iter()
            .all(|s| s.running.is_none() && s.queued == 0)
    }

    /// One debounced batch matched these subscriptions. Duplicates in
    /// `matched` are ignored: a batch triggers each subscription once.
    pub fn handle_changes(&mut self, matched: &[usize]) -> Vec<WatchCommand> {
        let mut seen = Vec::new();
        let mut commands = Vec::new();

        for &idx in matched {
            if seen.contains(&idx) {
                continue;
            }
            seen.push(idx);

            let Some(state) = self.states.get(idx) else {
                warn!(subscription = idx, "change for unknown subscription; ignoring");
                continue;
            };

            match (state.running, self.behaviour) {
                (None, _) => commands.push(self.start(idx)),
                (Some(_), TriggerWhileRunningBehaviour::Queue) => {
                    let queue_length = self.queue_length;
                    let state = &mut self.states[idx];
                    if state.queued < queue_length {
                        state.queued += 1;
                        debug!(subscription = idx, queued = state.queued, "queued re-run");
                    } else {
                        debug!(subscription = idx, "queue full; change folded into pending re-run");
                    }
                }
                (Some(generation), TriggerWhileRunningBehaviour::Cancel) => {
                    debug!(subscription = idx, generation, "cancelling running invocation");
                    commands.push(WatchCommand::Abort {
                        subscription: idx,
                        generation,
                    });
                    self.states[idx].queued = 0;
                    commands.push(self.start(idx));
                }
            }
        }

        commands
    }

    /// The invocation `generation` of `subscription` finished (successfully
    /// or with a recoverable outcome). Stale generations are ignored.
    pub fn handle_finished(&mut self, subscription: usize, generation: u64) -> Vec<WatchCommand> {
        let Some(state) = self.states.get_mut(subscription) else {
            return Vec::new();
        };
        if state.running != Some(generation) {
            debug!(subscription, generation, "ignoring completion of superseded invocation");
            return Vec::new();
        }

        state.running = None;
        if state.queued > 0 {
            state.queued -= 1;
            return vec![self.start(subscription)];
        }
        Vec::new()
    }

    fn start(&mut self, subscription: usize) -> WatchCommand {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.states[subscription].running = Some(generation);
        WatchCommand::Start {
            subscription,
            generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TriggerWhileRunningBehaviour::{Cancel, Queue};

    #[test]
    fn idle_subscription_starts_immediately_once_per_batch() {
        let mut core = WatchCore::new(2, Queue, 1);
        let cmds = core.handle_changes(&[1, 1, 1]);
        assert_eq!(
            cmds,
            vec![WatchCommand::Start {
                subscription: 1,
                generation: 1
            }]
        );
        assert!(core.is_running(1));
        assert!(!core.is_running(0));
    }

    #[test]
    fn queue_mode_never_overlaps_and_caps_pending_reruns() {
        let mut core = WatchCore::new(1, Queue, 1);
        core.handle_changes(&[0]);

        assert!(core.handle_changes(&[0]).is_empty());
        assert!(core.handle_changes(&[0]).is_empty());
        assert_eq!(core.queued(0), 1);

        let cmds = core.handle_finished(0, 1);
        assert_eq!(
            cmds,
            vec![WatchCommand::Start {
                subscription: 0,
                generation: 2
            }]
        );
        assert!(core.handle_finished(0, 2).is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn cancel_mode_supersedes_running_invocation() {
        let mut core = WatchCore::new(1, Cancel, 1);
        core.handle_changes(&[0]);

        let cmds = core.handle_changes(&[0]);
        assert_eq!(
            cmds,
            vec![
                WatchCommand::Abort {
                    subscription: 0,
                    generation: 1
                },
                WatchCommand::Start {
                    subscription: 0,
                    generation: 2
                },
            ]
        );

        // The aborted invocation's late completion changes nothing.
        assert!(core.handle_finished(0, 1).is_empty());
        assert!(core.is_running(0));
        assert!(core.handle_finished(0, 2).is_empty());
        assert!(core.is_idle());
    }
}
