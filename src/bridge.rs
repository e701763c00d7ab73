//! Reading and writing text on a bound surface.
//!
//! Native fields are read and assigned through their value. Every other kind
//! is read through its rendered text and written by clearing it and inserting
//! the new text one character at a time, because some editors only pick up
//! incremental input. Writes always finish with synthetic `input` and
//! `change` notifications so page frameworks recompute their own state.

use crate::host::{EditCommand, HostPage, SyntheticEvent};
use crate::types::{BridgeError, ElementKind, ElementRef};
use tracing::{debug, warn};

/// What happened during a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteReport {
    /// The surface refused the normal write path and the text was replaced
    /// wholesale instead
    pub degraded: bool,
}

/// Read the current text of a surface
pub fn get_content(host: &dyn HostPage, target: &ElementRef) -> Result<String, BridgeError> {
    let node = target.node();
    if !host.is_attached(node) {
        return Err(BridgeError::Detached(node));
    }

    let content = match target.kind() {
        ElementKind::PlainField => host.value(node).unwrap_or_default(),
        ElementKind::ContentEditableRegion
        | ElementKind::AriaTextboxRegion
        | ElementKind::RichEditorContainer => host
            .inner_text(node)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| host.text_content(node)),
    };
    Ok(content)
}

/// Replace the text of a surface
pub fn set_content(
    host: &dyn HostPage,
    target: &ElementRef,
    text: &str,
) -> Result<WriteReport, BridgeError> {
    let node = target.node();
    if !host.is_attached(node) {
        return Err(BridgeError::Detached(node));
    }

    host.focus(node);
    let mut report = WriteReport::default();

    match target.kind() {
        ElementKind::PlainField => {
            if !host.set_value(node, text) {
                warn!(
                    "Element {} accepts no value assignment, replacing its text instead",
                    node
                );
                host.set_text_content(node, text);
                report.degraded = true;
            }
        }
        ElementKind::ContentEditableRegion
        | ElementKind::AriaTextboxRegion
        | ElementKind::RichEditorContainer => {
            if !type_into(host, target, text) {
                warn!(
                    "Element {} ({}) rejected text insertion, replacing its text instead",
                    node,
                    target.kind().as_str()
                );
                host.set_text_content(node, text);
                report.degraded = true;
            }
        }
    }

    host.dispatch(node, SyntheticEvent::Input);
    host.dispatch(node, SyntheticEvent::Change);
    debug!("Wrote {} chars to element {}", text.chars().count(), node);

    Ok(report)
}

/// Clear a rich surface and insert `text` character by character.
/// Returns `false` if the host does not support text insertion.
fn type_into(host: &dyn HostPage, target: &ElementRef, text: &str) -> bool {
    let node = target.node();

    host.exec_command(EditCommand::SelectAll);
    host.exec_command(EditCommand::Delete);
    let leftover = get_content(host, target).unwrap_or_default();
    if !leftover.trim().is_empty() {
        debug!("selectAll/delete left content behind in {}, clearing directly", node);
        host.set_text_content(node, "");
    }

    host.focus(node);
    let mut buf = [0u8; 4];
    for c in text.chars() {
        if !host.exec_command(EditCommand::InsertText(c.encode_utf8(&mut buf))) {
            return false;
        }
    }
    true
}

/// Collapse runs of whitespace and trim, for comparing rendered text
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
