//! Core types used throughout the translation bridge.
//!
//! This module defines the element handles the bridge works against, the
//! translation request/result pair, and the shared error types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Handle to a node on the host page (opaque, host-assigned)
pub type NodeId = u64;

/// Kind of editable surface, decided once at selection time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// Native `<input>` or `<textarea>`
    PlainField,
    /// Node with the `contenteditable` flag
    ContentEditableRegion,
    /// Node (or ancestor) with `role="textbox"`
    AriaTextboxRegion,
    /// Container carrying a known rich-editor class marker
    RichEditorContainer,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::PlainField => "plain_field",
            ElementKind::ContentEditableRegion => "content_editable",
            ElementKind::AriaTextboxRegion => "aria_textbox",
            ElementKind::RichEditorContainer => "rich_editor",
        }
    }

    /// Everything except a native field is written through editing commands
    pub fn is_rich(&self) -> bool {
        !matches!(self, ElementKind::PlainField)
    }
}

/// Serializable description of an element, used only to find it again
/// after a reload. Field names match the persisted JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDescriptor {
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub class_name: String,
}

impl ElementDescriptor {
    /// Short label for status messages, e.g. `textarea#comment`
    pub fn label(&self) -> String {
        let tag = self.tag_name.to_lowercase();
        if self.id.is_empty() {
            tag
        } else {
            format!("{}#{}", tag, self.id)
        }
    }
}

/// Classified handle to an editable surface.
///
/// The kind is fixed at construction; binding a different kind means
/// selecting again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    node: NodeId,
    kind: ElementKind,
    descriptor: ElementDescriptor,
}

impl ElementRef {
    pub fn new(node: NodeId, kind: ElementKind, descriptor: ElementDescriptor) -> Self {
        Self {
            node,
            kind,
            descriptor,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn descriptor(&self) -> &ElementDescriptor {
        &self.descriptor
    }
}

/// Translation engine selectable from the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineId {
    #[default]
    Google,
    DeepL,
}

impl EngineId {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineId::Google => "google",
            EngineId::DeepL => "deepl",
        }
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(EngineId::Google),
            "deepl" => Ok(EngineId::DeepL),
            other => Err(format!("unknown engine: {}", other)),
        }
    }
}

/// A request for the translation backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    source_text: String,
    engine: EngineId,
}

impl TranslationRequest {
    /// Build a request; `None` when the text is blank
    pub fn new(source_text: impl Into<String>, engine: EngineId) -> Option<Self> {
        let source_text = source_text.into();
        if source_text.trim().is_empty() {
            return None;
        }
        Some(Self {
            source_text,
            engine,
        })
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn engine(&self) -> EngineId {
        self.engine
    }
}

/// Outcome of one translation call. There are no partial results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationResult {
    Translated(String),
    Failed(String),
}

impl TranslationResult {
    /// The translated text when the call succeeded with something to show
    pub fn text(&self) -> Option<&str> {
        match self {
            TranslationResult::Translated(text) if !text.is_empty() => Some(text),
            _ => None,
        }
    }
}

/// Errors from reading or writing a bound surface
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Element {0} is no longer attached to the document")]
    Detached(NodeId),
}
