//! Change detection on the bound target.
//!
//! Rich editors frequently do not fire a reliable input notification, so the
//! listener strategy depends on the surface kind. Every strategy ends in the
//! same place: a [`RawChange`] carrying a fresh content snapshot.

use crate::bridge;
use crate::host::{is_within, DomListener, HostEvent, HostPage};
use crate::types::{BridgeError, ElementKind, ElementRef, NodeId};
use std::time::Duration;
use tracing::{debug, trace};

/// One way of noticing that the target changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Value-changed (`input`) notification, read immediately
    ValueChanged,
    /// Key release, read after the settle delay
    KeyRelease { settle: Duration },
    /// Pointer release, read after the settle delay
    PointerRelease { settle: Duration },
    /// Subtree mutation observer, read immediately
    SubtreeMutation,
}

/// The set of strategies attached to one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchPlan {
    target: NodeId,
    strategies: Vec<Strategy>,
}

impl WatchPlan {
    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Add a strategy if it is not already part of the plan
    pub fn add(&mut self, strategy: Strategy) {
        if !self.strategies.contains(&strategy) {
            self.strategies.push(strategy);
        }
    }

    pub fn has_mutation_observer(&self) -> bool {
        self.strategies.contains(&Strategy::SubtreeMutation)
    }
}

/// What to do about an incoming host event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Not ours
    Ignore,
    /// Read the target now
    ReadNow,
    /// Read the target once the host editor has settled
    ReadAfter(Duration),
}

/// Normalized change report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    pub node: NodeId,
    pub content: String,
}

/// Attaches listeners to the bound target and interprets their events
pub struct ChangeDetector {
    plan: Option<WatchPlan>,
    key_settle: Duration,
    pointer_settle: Duration,
}

impl ChangeDetector {
    pub fn new(key_settle: Duration, pointer_settle: Duration) -> Self {
        Self {
            plan: None,
            key_settle,
            pointer_settle,
        }
    }

    /// Default strategies for a target's kind
    pub fn plan_for(&self, target: &ElementRef) -> WatchPlan {
        let mut strategies = vec![Strategy::ValueChanged];
        match target.kind() {
            ElementKind::PlainField => {}
            ElementKind::ContentEditableRegion | ElementKind::AriaTextboxRegion => {
                strategies.push(Strategy::KeyRelease {
                    settle: self.key_settle,
                });
                strategies.push(Strategy::PointerRelease {
                    settle: self.pointer_settle,
                });
            }
            // Containers get keyboard coverage; structural observation comes
            // from site adapters
            ElementKind::RichEditorContainer => {
                strategies.push(Strategy::KeyRelease {
                    settle: self.key_settle,
                });
            }
        }
        WatchPlan {
            target: target.node(),
            strategies,
        }
    }

    pub fn plan(&self) -> Option<&WatchPlan> {
        self.plan.as_ref()
    }

    /// Register the plan's listeners, replacing whatever was attached before
    pub fn attach(&mut self, host: &dyn HostPage, plan: WatchPlan) {
        self.detach(host);

        let node = plan.target;
        for strategy in &plan.strategies {
            match strategy {
                Strategy::ValueChanged => host.add_listener(node, DomListener::Input),
                Strategy::KeyRelease { .. } => host.add_listener(node, DomListener::KeyUp),
                Strategy::PointerRelease { .. } => host.add_listener(node, DomListener::MouseUp),
                Strategy::SubtreeMutation => host.observe_mutations(node),
            }
        }
        debug!(
            "Watching element {} with {} strategies",
            node,
            plan.strategies.len()
        );
        self.plan = Some(plan);
    }

    /// Remove every listener the current plan registered
    pub fn detach(&mut self, host: &dyn HostPage) {
        let Some(plan) = self.plan.take() else {
            return;
        };
        let node = plan.target;
        for strategy in &plan.strategies {
            match strategy {
                Strategy::ValueChanged => host.remove_listener(node, DomListener::Input),
                Strategy::KeyRelease { .. } => host.remove_listener(node, DomListener::KeyUp),
                Strategy::PointerRelease { .. } => {
                    host.remove_listener(node, DomListener::MouseUp)
                }
                Strategy::SubtreeMutation => host.disconnect_mutations(node),
            }
        }
        trace!("Detached listeners from element {}", node);
    }

    /// Decide whether a host event concerns the watched target
    pub fn classify_event(&self, host: &dyn HostPage, event: &HostEvent) -> Detection {
        let Some(plan) = &self.plan else {
            return Detection::Ignore;
        };

        let node = match event {
            HostEvent::Input { node }
            | HostEvent::KeyUp { node }
            | HostEvent::MouseUp { node }
            | HostEvent::Mutation { node } => *node,
            HostEvent::Click { .. } | HostEvent::Unload => return Detection::Ignore,
        };

        if !is_within(host, node, plan.target) {
            return Detection::Ignore;
        }

        let strategy = plan.strategies.iter().find(|s| {
            matches!(
                (event, s),
                (HostEvent::Input { .. }, Strategy::ValueChanged)
                    | (HostEvent::KeyUp { .. }, Strategy::KeyRelease { .. })
                    | (HostEvent::MouseUp { .. }, Strategy::PointerRelease { .. })
                    | (HostEvent::Mutation { .. }, Strategy::SubtreeMutation)
            )
        });

        match strategy {
            Some(Strategy::KeyRelease { settle }) | Some(Strategy::PointerRelease { settle }) => {
                Detection::ReadAfter(*settle)
            }
            Some(_) => Detection::ReadNow,
            None => Detection::Ignore,
        }
    }

    /// Take a content snapshot of the target
    pub fn snapshot(&self, host: &dyn HostPage, target: &ElementRef) -> Result<RawChange, BridgeError> {
        let content = bridge::get_content(host, target)?;
        Ok(RawChange {
            node: target.node(),
            content,
        })
    }
}
