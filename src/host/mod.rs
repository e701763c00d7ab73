//! Host page integration.
//!
//! The bridge never touches a real DOM directly. Everything it needs from the
//! page (reading and replacing text, editing commands, listener registration,
//! liveness and lookup) goes through [`HostPage`]. Events the page produces
//! for registered listeners come back as [`HostEvent`]s over a channel.
//!
//! [`memory::MemoryPage`] is a headless implementation used by the CLI and the
//! test-suite.

pub mod memory;

use crate::types::NodeId;

/// Listener kinds the change detector can register on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomListener {
    /// `input` / value-changed notification
    Input,
    /// `keyup`
    KeyUp,
    /// `mouseup`
    MouseUp,
}

/// Notifications the bridge dispatches after a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticEvent {
    Input,
    Change,
}

/// Document-level editing primitives, applied to the focused node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditCommand<'a> {
    SelectAll,
    Delete,
    InsertText(&'a str),
}

/// Event delivered by the host for a registered listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Input { node: NodeId },
    KeyUp { node: NodeId },
    MouseUp { node: NodeId },
    /// Structural or character-data change inside an observed subtree
    Mutation { node: NodeId },
    /// Click swallowed by the capture-phase interceptor
    Click { node: NodeId },
    /// The page is going away
    Unload,
}

/// Everything the bridge requires from a host page.
///
/// Methods taking a node must tolerate detached or unknown nodes by returning
/// an empty/negative answer rather than panicking.
pub trait HostPage: Send + Sync {
    /// Hostname of the page, used to pick site adapters
    fn hostname(&self) -> String;

    /// Whether the node is still part of the document
    fn is_attached(&self, node: NodeId) -> bool;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Upper-case tag name (`INPUT`, `DIV`, ...)
    fn tag_name(&self, node: NodeId) -> String;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Computed editability (inherited from ancestors, like `isContentEditable`)
    fn is_content_editable(&self, node: NodeId) -> bool;

    /// Raw `class` attribute
    fn class_name(&self, node: NodeId) -> String;

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.class_name(node).split_whitespace().any(|c| c == class)
    }

    fn add_class(&self, node: NodeId, class: &str);

    fn remove_class(&self, node: NodeId, class: &str);

    /// Form-field value; `None` for nodes without one
    fn value(&self, node: NodeId) -> Option<String>;

    /// Assign a form-field value. Returns `false` when the node has no value.
    fn set_value(&self, node: NodeId, value: &str) -> bool;

    /// Rendered text, when the host can produce it
    fn inner_text(&self, node: NodeId) -> Option<String>;

    /// Raw concatenated text of the subtree
    fn text_content(&self, node: NodeId) -> String;

    /// Replace the whole subtree with a single text run
    fn set_text_content(&self, node: NodeId, text: &str);

    fn focus(&self, node: NodeId);

    /// Run an editing command against the focused node.
    /// Returns `false` when the command is unsupported.
    fn exec_command(&self, command: EditCommand<'_>) -> bool;

    fn dispatch(&self, node: NodeId, event: SyntheticEvent);

    fn add_listener(&self, node: NodeId, listener: DomListener);

    fn remove_listener(&self, node: NodeId, listener: DomListener);

    /// Observe child-list and character-data changes in the node's subtree
    fn observe_mutations(&self, node: NodeId);

    fn disconnect_mutations(&self, node: NodeId);

    /// Install or remove the capture-phase click interceptor
    fn set_click_capture(&self, enabled: bool);

    fn element_by_id(&self, id: &str) -> Option<NodeId>;

    fn elements_by_name(&self, name: &str) -> Vec<NodeId>;

    /// Elements carrying every class in the space-separated list
    fn elements_by_class_name(&self, class_names: &str) -> Vec<NodeId>;
}

/// Walk from `node` up through its ancestors and return the first match
pub fn closest<F>(host: &dyn HostPage, node: NodeId, mut predicate: F) -> Option<NodeId>
where
    F: FnMut(NodeId) -> bool,
{
    let mut current = Some(node);
    while let Some(id) = current {
        if predicate(id) {
            return Some(id);
        }
        current = host.parent(id);
    }
    None
}

/// Whether `node` is `ancestor` or lies inside its subtree
pub fn is_within(host: &dyn HostPage, node: NodeId, ancestor: NodeId) -> bool {
    closest(host, node, |id| id == ancestor).is_some()
}
