//! Debounced commits.
//!
//! Each watched surface has at most one live session. Arming a key replaces
//! its session (aborting the old timer) and starts a new quiescence period;
//! if nothing re-arms or cancels the key before the period ends, a commit for
//! the baseline value is delivered.
//!
//! Timers run as tokio tasks that report back over a channel. Every message
//! carries the generation of the session that produced it, and [`accept`]
//! discards messages from sessions that have since been replaced, so a timer
//! that loses a race with `arm` can never commit.
//!
//! [`accept`]: DebounceScheduler::accept

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

use crate::types::NodeId;

/// Which surface a session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    /// The panel's own input box
    Local,
    /// A bound target on the page
    Target(NodeId),
}

/// Message from a timer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    Tick {
        key: SessionKey,
        generation: u64,
        remaining_seconds: u32,
    },
    Commit {
        key: SessionKey,
        generation: u64,
    },
}

/// What an accepted timer message means for the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerOutput {
    Countdown {
        key: SessionKey,
        remaining_seconds: u32,
    },
    Commit {
        key: SessionKey,
        baseline_value: String,
    },
}

/// One in-flight quiescence wait
#[derive(Debug)]
struct DebounceSession {
    baseline_value: String,
    remaining_seconds: u32,
    generation: u64,
    timer: JoinHandle<()>,
}

/// Debounce scheduler keyed by surface
pub struct DebounceScheduler {
    sessions: HashMap<SessionKey, DebounceSession>,
    quiescence: Duration,
    tick: Duration,
    next_generation: u64,
    events_tx: mpsc::UnboundedSender<SchedulerEvent>,
}

impl DebounceScheduler {
    /// Timer messages are sent to `events_tx`; feed them back through
    /// [`DebounceScheduler::accept`].
    pub fn new(
        quiescence: Duration,
        tick: Duration,
        events_tx: mpsc::UnboundedSender<SchedulerEvent>,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            quiescence,
            tick,
            next_generation: 0,
            events_tx,
        }
    }

    /// Whole seconds shown when a session starts
    pub fn initial_countdown(&self) -> u32 {
        let millis = self.quiescence.as_millis();
        millis.div_ceil(1000) as u32
    }

    /// Start a new session for `key`, cancelling any existing one.
    /// Returns the initial countdown.
    pub fn arm(&mut self, key: SessionKey, current_value: &str) -> u32 {
        self.cancel(key);

        self.next_generation += 1;
        let generation = self.next_generation;
        let remaining_seconds = self.initial_countdown();
        let timer = tokio::spawn(run_timer(
            key,
            generation,
            Instant::now(),
            self.quiescence,
            self.tick,
            remaining_seconds,
            self.events_tx.clone(),
        ));

        debug!(
            "Armed {:?} (generation {}, {} chars)",
            key,
            generation,
            current_value.chars().count()
        );
        self.sessions.insert(
            key,
            DebounceSession {
                baseline_value: current_value.to_string(),
                remaining_seconds,
                generation,
                timer,
            },
        );
        remaining_seconds
    }

    /// Drop the session for `key` without committing. Returns `true` if one
    /// was active.
    pub fn cancel(&mut self, key: SessionKey) -> bool {
        match self.sessions.remove(&key) {
            Some(session) => {
                session.timer.abort();
                trace!("Cancelled {:?} (generation {})", key, session.generation);
                true
            }
            None => false,
        }
    }

    /// Cancel every session
    pub fn cancel_all(&mut self) -> bool {
        let keys: Vec<_> = self.sessions.keys().copied().collect();
        let mut any = false;
        for key in keys {
            any |= self.cancel(key);
        }
        any
    }

    pub fn is_active(&self, key: SessionKey) -> bool {
        self.sessions.contains_key(&key)
    }

    pub fn remaining_seconds(&self, key: SessionKey) -> Option<u32> {
        self.sessions.get(&key).map(|s| s.remaining_seconds)
    }

    pub fn baseline_value(&self, key: SessionKey) -> Option<&str> {
        self.sessions.get(&key).map(|s| s.baseline_value.as_str())
    }

    /// Validate a timer message. Stale generations yield `None`.
    pub fn accept(&mut self, event: SchedulerEvent) -> Option<SchedulerOutput> {
        match event {
            SchedulerEvent::Tick {
                key,
                generation,
                remaining_seconds,
            } => {
                let session = self.sessions.get_mut(&key)?;
                if session.generation != generation {
                    trace!("Dropping stale tick for {:?}", key);
                    return None;
                }
                session.remaining_seconds = remaining_seconds;
                Some(SchedulerOutput::Countdown {
                    key,
                    remaining_seconds,
                })
            }
            SchedulerEvent::Commit { key, generation } => {
                match self.sessions.get(&key) {
                    Some(session) if session.generation == generation => {}
                    _ => {
                        trace!("Dropping stale commit for {:?}", key);
                        return None;
                    }
                }
                let session = self.sessions.remove(&key)?;
                debug!("Commit for {:?} (generation {})", key, generation);
                Some(SchedulerOutput::Commit {
                    key,
                    baseline_value: session.baseline_value,
                })
            }
        }
    }
}

impl Drop for DebounceScheduler {
    fn drop(&mut self) {
        for session in self.sessions.values() {
            session.timer.abort();
        }
    }
}

/// Tick once per `tick` while time remains, then commit at the deadline
async fn run_timer(
    key: SessionKey,
    generation: u64,
    start: Instant,
    quiescence: Duration,
    tick: Duration,
    mut remaining_seconds: u32,
    tx: mpsc::UnboundedSender<SchedulerEvent>,
) {
    let deadline = start + quiescence;
    let mut next_tick = start + tick;

    while !tick.is_zero() && next_tick < deadline {
        sleep_until(next_tick).await;
        remaining_seconds = remaining_seconds.saturating_sub(1);
        if remaining_seconds > 0 {
            let event = SchedulerEvent::Tick {
                key,
                generation,
                remaining_seconds,
            };
            if tx.send(event).is_err() {
                return;
            }
        }
        next_tick += tick;
    }

    sleep_until(deadline).await;
    let _ = tx.send(SchedulerEvent::Commit { key, generation });
}
