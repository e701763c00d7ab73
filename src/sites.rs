//! Per-site adjustments to change detection.
//!
//! Some sites host editors that rebuild their DOM without firing any input
//! notification. Adapters are matched by hostname and get a chance to extend
//! the watch plan each time a target is bound (by selection or restore).

use crate::change_detector::{Strategy, WatchPlan};
use crate::config::SitesConfig;
use crate::types::ElementRef;
use tracing::debug;

pub trait SiteAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn matches(&self, hostname: &str) -> bool;

    /// Extend the plan for a freshly bound target
    fn refine(&self, target: &ElementRef, plan: &mut WatchPlan);
}

/// `true` when `hostname` is `domain` or one of its subdomains
pub fn host_matches(hostname: &str, domain: &str) -> bool {
    let hostname = hostname.trim_end_matches('.').to_ascii_lowercase();
    let domain = domain.trim_start_matches('.').to_ascii_lowercase();
    hostname == domain || hostname.ends_with(&format!(".{}", domain))
}

/// Observes the whole subtree of rich targets, for editors that only reveal
/// edits through DOM mutations (Reddit's comment box, for one)
pub struct MutationObserverAdapter {
    domain: String,
}

impl MutationObserverAdapter {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
        }
    }
}

impl SiteAdapter for MutationObserverAdapter {
    fn name(&self) -> &str {
        &self.domain
    }

    fn matches(&self, hostname: &str) -> bool {
        host_matches(hostname, &self.domain)
    }

    fn refine(&self, target: &ElementRef, plan: &mut WatchPlan) {
        if target.kind().is_rich() {
            plan.add(Strategy::SubtreeMutation);
        }
    }
}

/// Adapters active for one page
#[derive(Default)]
pub struct SiteRegistry {
    adapters: Vec<Box<dyn SiteAdapter>>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapters from configuration that apply to `hostname`
    pub fn for_host(config: &SitesConfig, hostname: &str) -> Self {
        let mut registry = Self::new();
        for domain in &config.mutation_observer_hosts {
            registry.register(Box::new(MutationObserverAdapter::new(domain)));
        }
        registry.adapters.retain(|a| a.matches(hostname));
        registry
    }

    pub fn register(&mut self, adapter: Box<dyn SiteAdapter>) {
        self.adapters.push(adapter);
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    pub fn refine(&self, target: &ElementRef, plan: &mut WatchPlan) {
        for adapter in &self.adapters {
            debug!("Site adapter {} refining plan for {}", adapter.name(), target.node());
            adapter.refine(target, plan);
        }
    }
}
