//! Headless in-memory host page.
//!
//! Models just enough of a document to exercise the bridge: a node tree with
//! attributes, form values and text, an editing-command implementation that
//! acts on the focused node, listener bookkeeping and subtree observation.
//! Registered listeners and observers deliver [`HostEvent`]s over the channel
//! passed to [`MemoryPage::connect`].

use super::{DomListener, EditCommand, HostEvent, HostPage, SyntheticEvent};
use crate::types::NodeId;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::trace;

/// Which editing commands the page honours
#[derive(Debug, Clone, Copy)]
pub struct EditingQuirks {
    /// `selectAll` + `delete` actually clears the focused node
    pub delete_supported: bool,
    /// `insertText` is available
    pub insert_text_supported: bool,
}

impl Default for EditingQuirks {
    fn default() -> Self {
        Self {
            delete_supported: true,
            insert_text_supported: true,
        }
    }
}

/// Description of a node to append
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    tag: String,
    attributes: BTreeMap<String, String>,
    value: Option<String>,
    text: String,
}

impl NodeSpec {
    pub fn new(tag: &str) -> Self {
        let tag = tag.to_uppercase();
        let value = match tag.as_str() {
            "INPUT" | "TEXTAREA" => Some(String::new()),
            _ => None,
        };
        Self {
            tag,
            value,
            ..Default::default()
        }
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn name(self, name: &str) -> Self {
        self.attr("name", name)
    }

    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    pub fn role(self, role: &str) -> Self {
        self.attr("role", role)
    }

    pub fn content_editable(self) -> Self {
        self.attr("contenteditable", "true")
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }
}

#[derive(Debug)]
struct MemNode {
    tag: String,
    attributes: BTreeMap<String, String>,
    value: Option<String>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attached: bool,
    listeners: HashSet<DomListener>,
    observed: bool,
}

#[derive(Debug)]
struct PageState {
    nodes: HashMap<NodeId, MemNode>,
    next_id: NodeId,
    body: NodeId,
    focused: Option<NodeId>,
    select_all: bool,
    click_capture: bool,
    quirks: EditingQuirks,
    events: Option<mpsc::UnboundedSender<HostEvent>>,
    dispatched: Vec<(NodeId, SyntheticEvent)>,
}

impl PageState {
    fn ancestors_or_self(&self, node: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            match self.nodes.get(&id) {
                Some(n) => {
                    chain.push(id);
                    current = n.parent;
                }
                None => break,
            }
        }
        chain
    }

    fn is_attached(&self, node: NodeId) -> bool {
        self.nodes.get(&node).map(|n| n.attached).unwrap_or(false)
    }

    fn text_content(&self, node: NodeId) -> String {
        let Some(n) = self.nodes.get(&node) else {
            return String::new();
        };
        let mut out = n.text.clone();
        for child in &n.children {
            out.push_str(&self.text_content(*child));
        }
        out
    }

    fn inner_text(&self, node: NodeId) -> String {
        let Some(n) = self.nodes.get(&node) else {
            return String::new();
        };
        let mut out = n.text.clone();
        for child in &n.children {
            let block = self
                .nodes
                .get(child)
                .map(|c| matches!(c.tag.as_str(), "DIV" | "P"))
                .unwrap_or(false);
            if block && !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&self.inner_text(*child));
        }
        out
    }

    fn clear_subtree_text(&mut self, node: NodeId) {
        let children = match self.nodes.get_mut(&node) {
            Some(n) => {
                n.text.clear();
                n.children.clone()
            }
            None => return,
        };
        for child in children {
            self.clear_subtree_text(child);
        }
    }

    fn detach_subtree(&mut self, node: NodeId) {
        let children = match self.nodes.get_mut(&node) {
            Some(n) => {
                n.attached = false;
                n.children.clone()
            }
            None => return,
        };
        for child in children {
            self.detach_subtree(child);
        }
    }

    fn is_editable(&self, node: NodeId) -> bool {
        for id in self.ancestors_or_self(node) {
            if let Some(flag) = self.nodes[&id].attributes.get("contenteditable") {
                return flag.is_empty() || flag.eq_ignore_ascii_case("true");
            }
        }
        false
    }

    /// Deliver `listener` if the node or one of its ancestors registered it
    fn notify(&self, node: NodeId, listener: DomListener) {
        let registered = self
            .ancestors_or_self(node)
            .iter()
            .any(|id| self.nodes[id].listeners.contains(&listener));
        if !registered {
            return;
        }
        let event = match listener {
            DomListener::Input => HostEvent::Input { node },
            DomListener::KeyUp => HostEvent::KeyUp { node },
            DomListener::MouseUp => HostEvent::MouseUp { node },
        };
        self.send(event);
    }

    /// Deliver a mutation record if the node lies in an observed subtree
    fn notify_mutation(&self, node: NodeId) {
        let observed = self
            .ancestors_or_self(node)
            .iter()
            .any(|id| self.nodes[id].observed);
        if observed {
            self.send(HostEvent::Mutation { node });
        }
    }

    fn send(&self, event: HostEvent) {
        if let Some(tx) = &self.events {
            trace!("MemoryPage event: {:?}", event);
            let _ = tx.send(event);
        }
    }
}

/// In-memory document
pub struct MemoryPage {
    hostname: String,
    state: Mutex<PageState>,
}

impl MemoryPage {
    /// Create an empty document with a `BODY` root
    pub fn new(hostname: &str) -> Self {
        let body = 1;
        let mut nodes = HashMap::new();
        nodes.insert(
            body,
            MemNode {
                tag: "BODY".to_string(),
                attributes: BTreeMap::new(),
                value: None,
                text: String::new(),
                parent: None,
                children: Vec::new(),
                attached: true,
                listeners: HashSet::new(),
                observed: false,
            },
        );

        Self {
            hostname: hostname.to_string(),
            state: Mutex::new(PageState {
                nodes,
                next_id: body + 1,
                body,
                focused: None,
                select_all: false,
                click_capture: false,
                quirks: EditingQuirks::default(),
                events: None,
                dispatched: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Route listener and observer events into `tx`
    pub fn connect(&self, tx: mpsc::UnboundedSender<HostEvent>) {
        self.lock().events = Some(tx);
    }

    pub fn body(&self) -> NodeId {
        self.lock().body
    }

    pub fn set_quirks(&self, quirks: EditingQuirks) {
        self.lock().quirks = quirks;
    }

    /// Append a new node under `parent` and return its handle
    pub fn append(&self, parent: NodeId, spec: NodeSpec) -> NodeId {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        let attached = state.is_attached(parent);
        state.nodes.insert(
            id,
            MemNode {
                tag: spec.tag,
                attributes: spec.attributes,
                value: spec.value,
                text: spec.text,
                parent: Some(parent),
                children: Vec::new(),
                attached,
                listeners: HashSet::new(),
                observed: false,
            },
        );
        if let Some(p) = state.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        id
    }

    /// Remove a node (and its subtree) from the document
    pub fn detach(&self, node: NodeId) {
        let mut state = self.lock();
        if let Some(parent) = state.nodes.get(&node).and_then(|n| n.parent) {
            if let Some(p) = state.nodes.get_mut(&parent) {
                p.children.retain(|c| *c != node);
            }
        }
        state.detach_subtree(node);
    }

    /// Simulate the user replacing a node's content by typing.
    ///
    /// Fires `input`, `keyup` and mutation notifications the way a browser
    /// would for keyboard input.
    pub fn type_text(&self, node: NodeId, text: &str) {
        let mut state = self.lock();
        let children = {
            let Some(n) = state.nodes.get_mut(&node) else {
                return;
            };
            match n.value.as_mut() {
                Some(value) => {
                    *value = text.to_string();
                    Vec::new()
                }
                None => {
                    n.text = text.to_string();
                    std::mem::take(&mut n.children)
                }
            }
        };
        for child in children {
            state.detach_subtree(child);
        }
        state.notify_mutation(node);
        state.notify(node, DomListener::Input);
        state.notify(node, DomListener::KeyUp);
    }

    /// Change a node's content without any keyboard activity (e.g. a script
    /// on the page rewrote it). Only mutation observers see this.
    pub fn rewrite_text(&self, node: NodeId, text: &str) {
        let mut state = self.lock();
        if let Some(n) = state.nodes.get_mut(&node) {
            n.text = text.to_string();
        }
        state.notify_mutation(node);
    }

    /// Simulate a mouse click. Returns `true` when the capture-phase
    /// interceptor consumed it.
    pub fn click(&self, node: NodeId) -> bool {
        let state = self.lock();
        if state.click_capture {
            state.send(HostEvent::Click { node });
            true
        } else {
            state.notify(node, DomListener::MouseUp);
            false
        }
    }

    /// Simulate the page being closed
    pub fn unload(&self) {
        self.lock().send(HostEvent::Unload);
    }

    pub fn click_capture_installed(&self) -> bool {
        self.lock().click_capture
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.lock().focused
    }

    pub fn listeners(&self, node: NodeId) -> HashSet<DomListener> {
        self.lock()
            .nodes
            .get(&node)
            .map(|n| n.listeners.clone())
            .unwrap_or_default()
    }

    pub fn is_observed(&self, node: NodeId) -> bool {
        self.lock()
            .nodes
            .get(&node)
            .map(|n| n.observed)
            .unwrap_or(false)
    }

    /// Synthetic events dispatched on `node`, oldest first
    pub fn dispatched(&self, node: NodeId) -> Vec<SyntheticEvent> {
        self.lock()
            .dispatched
            .iter()
            .filter(|(id, _)| *id == node)
            .map(|(_, event)| *event)
            .collect()
    }
}

impl HostPage for MemoryPage {
    fn hostname(&self) -> String {
        self.hostname.clone()
    }

    fn is_attached(&self, node: NodeId) -> bool {
        self.lock().is_attached(node)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.lock().nodes.get(&node).and_then(|n| n.parent)
    }

    fn tag_name(&self, node: NodeId) -> String {
        self.lock()
            .nodes
            .get(&node)
            .map(|n| n.tag.clone())
            .unwrap_or_default()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.lock()
            .nodes
            .get(&node)
            .and_then(|n| n.attributes.get(name).cloned())
    }

    fn is_content_editable(&self, node: NodeId) -> bool {
        self.lock().is_editable(node)
    }

    fn class_name(&self, node: NodeId) -> String {
        self.attribute(node, "class").unwrap_or_default()
    }

    fn add_class(&self, node: NodeId, class: &str) {
        let mut state = self.lock();
        if let Some(n) = state.nodes.get_mut(&node) {
            let entry = n.attributes.entry("class".to_string()).or_default();
            if !entry.split_whitespace().any(|c| c == class) {
                if !entry.is_empty() {
                    entry.push(' ');
                }
                entry.push_str(class);
            }
        }
    }

    fn remove_class(&self, node: NodeId, class: &str) {
        let mut state = self.lock();
        if let Some(n) = state.nodes.get_mut(&node) {
            if let Some(entry) = n.attributes.get_mut("class") {
                *entry = entry
                    .split_whitespace()
                    .filter(|c| *c != class)
                    .collect::<Vec<_>>()
                    .join(" ");
            }
        }
    }

    fn value(&self, node: NodeId) -> Option<String> {
        self.lock().nodes.get(&node).and_then(|n| n.value.clone())
    }

    fn set_value(&self, node: NodeId, value: &str) -> bool {
        let mut state = self.lock();
        match state.nodes.get_mut(&node).and_then(|n| n.value.as_mut()) {
            Some(v) => {
                *v = value.to_string();
                true
            }
            None => false,
        }
    }

    fn inner_text(&self, node: NodeId) -> Option<String> {
        let state = self.lock();
        if state.is_attached(node) {
            Some(state.inner_text(node))
        } else {
            None
        }
    }

    fn text_content(&self, node: NodeId) -> String {
        self.lock().text_content(node)
    }

    fn set_text_content(&self, node: NodeId, text: &str) {
        let mut state = self.lock();
        let children = match state.nodes.get_mut(&node) {
            Some(n) => {
                n.text = text.to_string();
                std::mem::take(&mut n.children)
            }
            None => return,
        };
        for child in children {
            state.detach_subtree(child);
        }
        state.notify_mutation(node);
    }

    fn focus(&self, node: NodeId) {
        let mut state = self.lock();
        if state.is_attached(node) {
            state.focused = Some(node);
            state.select_all = false;
        }
    }

    fn exec_command(&self, command: EditCommand<'_>) -> bool {
        let mut state = self.lock();
        let Some(focused) = state.focused else {
            return false;
        };
        let has_value = state
            .nodes
            .get(&focused)
            .map(|n| n.value.is_some())
            .unwrap_or(false);
        if !has_value && !state.is_editable(focused) {
            return false;
        }

        match command {
            EditCommand::SelectAll => {
                state.select_all = true;
                true
            }
            EditCommand::Delete => {
                if !state.quirks.delete_supported {
                    return false;
                }
                if state.select_all {
                    if let Some(v) = state.nodes.get_mut(&focused).and_then(|n| n.value.as_mut()) {
                        v.clear();
                    }
                    state.clear_subtree_text(focused);
                    state.select_all = false;
                    state.notify_mutation(focused);
                    state.notify(focused, DomListener::Input);
                }
                true
            }
            EditCommand::InsertText(text) => {
                if !state.quirks.insert_text_supported {
                    return false;
                }
                let select_all = std::mem::replace(&mut state.select_all, false);
                if select_all {
                    state.clear_subtree_text(focused);
                }
                if let Some(n) = state.nodes.get_mut(&focused) {
                    match n.value.as_mut() {
                        Some(v) => {
                            if select_all {
                                v.clear();
                            }
                            v.push_str(text);
                        }
                        None => n.text.push_str(text),
                    }
                }
                state.notify_mutation(focused);
                state.notify(focused, DomListener::Input);
                true
            }
        }
    }

    fn dispatch(&self, node: NodeId, event: SyntheticEvent) {
        let mut state = self.lock();
        state.dispatched.push((node, event));
        if event == SyntheticEvent::Input {
            state.notify(node, DomListener::Input);
        }
    }

    fn add_listener(&self, node: NodeId, listener: DomListener) {
        if let Some(n) = self.lock().nodes.get_mut(&node) {
            n.listeners.insert(listener);
        }
    }

    fn remove_listener(&self, node: NodeId, listener: DomListener) {
        if let Some(n) = self.lock().nodes.get_mut(&node) {
            n.listeners.remove(&listener);
        }
    }

    fn observe_mutations(&self, node: NodeId) {
        if let Some(n) = self.lock().nodes.get_mut(&node) {
            n.observed = true;
        }
    }

    fn disconnect_mutations(&self, node: NodeId) {
        if let Some(n) = self.lock().nodes.get_mut(&node) {
            n.observed = false;
        }
    }

    fn set_click_capture(&self, enabled: bool) {
        self.lock().click_capture = enabled;
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        let state = self.lock();
        let mut ids: Vec<_> = state
            .nodes
            .iter()
            .filter(|(_, n)| n.attached && n.attributes.get("id").map(String::as_str) == Some(id))
            .map(|(node, _)| *node)
            .collect();
        ids.sort_unstable();
        ids.first().copied()
    }

    fn elements_by_name(&self, name: &str) -> Vec<NodeId> {
        let state = self.lock();
        let mut ids: Vec<_> = state
            .nodes
            .iter()
            .filter(|(_, n)| {
                n.attached && n.attributes.get("name").map(String::as_str) == Some(name)
            })
            .map(|(node, _)| *node)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn elements_by_class_name(&self, class_names: &str) -> Vec<NodeId> {
        let wanted: Vec<&str> = class_names.split_whitespace().collect();
        if wanted.is_empty() {
            return Vec::new();
        }
        let state = self.lock();
        let mut ids: Vec<_> = state
            .nodes
            .iter()
            .filter(|(_, n)| {
                let classes = n.attributes.get("class").map(String::as_str).unwrap_or("");
                n.attached
                    && wanted
                        .iter()
                        .all(|w| classes.split_whitespace().any(|c| c == *w))
            })
            .map(|(node, _)| *node)
            .collect();
        ids.sort_unstable();
        ids
    }
}
