//! Interactive target selection.
//!
//! Selection mode installs a capture-phase click interceptor on the page; the
//! next click is consumed and the clicked node is classified by a fixed,
//! ordered rule chain. The mode always ends after that one click.

use crate::host::{closest, HostPage};
use crate::types::{ElementDescriptor, ElementKind, ElementRef, NodeId};
use tracing::{debug, info};

/// Draft.js content root, treated like an ARIA textbox
const DRAFT_EDITOR_CLASS: &str = "public-DraftEditor-content";

/// Selector state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    Idle,
    Selecting,
}

/// Result of the click that ends selection mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    Selected(ElementRef),
    /// The clicked node is not an editable surface
    Invalid,
}

type Rule = fn(&ElementSelector, &dyn HostPage, NodeId) -> Option<NodeId>;

/// Classification rules in priority order. The first rule that resolves a
/// node decides the kind.
const RULES: [(ElementKind, Rule); 4] = [
    (ElementKind::PlainField, ElementSelector::match_plain_field),
    (ElementKind::ContentEditableRegion, ElementSelector::match_content_editable),
    (ElementKind::AriaTextboxRegion, ElementSelector::match_aria_textbox),
    (ElementKind::RichEditorContainer, ElementSelector::match_rich_editor),
];

/// Click-capture selector
pub struct ElementSelector {
    state: SelectorState,
    /// Class markers identifying rich editor containers
    rich_editor_classes: Vec<String>,
    /// Class applied to the bound target
    marker_class: String,
}

impl ElementSelector {
    pub fn new(rich_editor_classes: Vec<String>, marker_class: String) -> Self {
        Self {
            state: SelectorState::Idle,
            rich_editor_classes,
            marker_class,
        }
    }

    pub fn state(&self) -> SelectorState {
        self.state
    }

    pub fn is_selecting(&self) -> bool {
        self.state == SelectorState::Selecting
    }

    /// Start capturing the next click. Returns `false` if already selecting.
    pub fn enter_selection_mode(&mut self, host: &dyn HostPage) -> bool {
        if self.is_selecting() {
            return false;
        }
        host.set_click_capture(true);
        self.state = SelectorState::Selecting;
        debug!("Selection mode entered");
        true
    }

    /// Abandon selection before a click lands. Returns `false` if idle.
    pub fn exit_selection_mode(&mut self, host: &dyn HostPage) -> bool {
        if !self.is_selecting() {
            return false;
        }
        host.set_click_capture(false);
        self.state = SelectorState::Idle;
        debug!("Selection mode exited");
        true
    }

    /// Flip between idle and selecting; returns the new state
    pub fn toggle_selection_mode(&mut self, host: &dyn HostPage) -> SelectorState {
        if self.is_selecting() {
            self.exit_selection_mode(host);
        } else {
            self.enter_selection_mode(host);
        }
        self.state
    }

    /// Handle a click swallowed by the interceptor.
    ///
    /// Returns `None` when selection mode is not active. Otherwise the mode
    /// is left regardless of the outcome.
    pub fn handle_click(&mut self, host: &dyn HostPage, node: NodeId) -> Option<SelectionOutcome> {
        if !self.is_selecting() {
            return None;
        }
        self.exit_selection_mode(host);

        match self.classify(host, node) {
            Some((resolved, kind)) => {
                let descriptor = self.describe(host, resolved);
                info!(
                    "Selected {} as {} (clicked {})",
                    descriptor.label(),
                    kind.as_str(),
                    node
                );
                Some(SelectionOutcome::Selected(ElementRef::new(
                    resolved, kind, descriptor,
                )))
            }
            None => {
                debug!("Clicked node {} is not an editable surface", node);
                Some(SelectionOutcome::Invalid)
            }
        }
    }

    /// Run the rule chain; returns the resolved node and its kind
    pub fn classify(&self, host: &dyn HostPage, node: NodeId) -> Option<(NodeId, ElementKind)> {
        RULES
            .iter()
            .find_map(|(kind, rule)| rule(self, host, node).map(|resolved| (resolved, *kind)))
    }

    fn match_plain_field(&self, host: &dyn HostPage, node: NodeId) -> Option<NodeId> {
        match host.tag_name(node).as_str() {
            "INPUT" | "TEXTAREA" => Some(node),
            _ => None,
        }
    }

    /// Resolves to the editing host (nearest node carrying the attribute)
    fn match_content_editable(&self, host: &dyn HostPage, node: NodeId) -> Option<NodeId> {
        if !host.is_content_editable(node) {
            return None;
        }
        closest(host, node, |id| host.attribute(id, "contenteditable").is_some()).or(Some(node))
    }

    fn match_aria_textbox(&self, host: &dyn HostPage, node: NodeId) -> Option<NodeId> {
        closest(host, node, |id| {
            host.attribute(id, "role").as_deref() == Some("textbox")
        })
        .or_else(|| closest(host, node, |id| host.has_class(id, DRAFT_EDITOR_CLASS)))
    }

    fn match_rich_editor(&self, host: &dyn HostPage, node: NodeId) -> Option<NodeId> {
        // Marker order matters: an outer `.editor` wins over an inner `.ql-editor`
        self.rich_editor_classes
            .iter()
            .find_map(|class| closest(host, node, |id| host.has_class(id, class)))
    }

    /// Persistable description of a node, without our own marker class
    pub fn describe(&self, host: &dyn HostPage, node: NodeId) -> ElementDescriptor {
        let class_name = host
            .class_name(node)
            .split_whitespace()
            .filter(|c| *c != self.marker_class)
            .collect::<Vec<_>>()
            .join(" ");

        ElementDescriptor {
            tag_name: host.tag_name(node),
            id: host.attribute(node, "id").unwrap_or_default(),
            name: host.attribute(node, "name").unwrap_or_default(),
            class_name,
        }
    }

    /// Highlight the bound target
    pub fn mark(&self, host: &dyn HostPage, target: &ElementRef) {
        host.add_class(target.node(), &self.marker_class);
    }

    pub fn unmark(&self, host: &dyn HostPage, target: &ElementRef) {
        host.remove_class(target.node(), &self.marker_class);
    }
}
