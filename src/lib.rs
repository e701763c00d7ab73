//! Translate Bridge - debounced translation between a panel and page inputs
//!
//! This crate keeps a small translation panel in sync with an editable
//! surface on a web page:
//!
//! - **Manual**: translate the panel's own input, optionally filling the
//!   result into a selected target input
//! - **Auto mode**: edits in the target are mirrored into the panel and,
//!   after a quiet period, translated and written back into the target
//!
//! # Architecture
//!
//! The page is reached only through the [`HostPage`] trait. A [`Session`]
//! owns all state and is driven by one event loop; panels talk to it through
//! a [`SessionHandle`] and listen for [`UiEvent`]s. Target kinds (native
//! fields, contenteditable regions, ARIA textboxes, rich editor containers)
//! are decided once at selection time and determine how content is read,
//! written and watched.

pub mod bridge;
pub mod change_detector;
pub mod config;
pub mod gate;
pub mod host;
pub mod persistence;
pub mod scheduler;
pub mod selector;
pub mod session;
pub mod sites;
pub mod translation;
pub mod types;

// Re-export commonly used types
pub use change_detector::{ChangeDetector, Detection, Strategy, WatchPlan};
pub use config::Config;
pub use gate::contains_source_language;
pub use host::memory::{MemoryPage, NodeSpec};
pub use host::{HostEvent, HostPage};
pub use persistence::{FileStore, MemoryStore, SelectionStore, StorageError, LAST_SELECTION_KEY};
pub use scheduler::{DebounceScheduler, SessionKey};
pub use selector::{ElementSelector, SelectionOutcome};
pub use session::{Session, SessionError, SessionHandle, SessionSnapshot, UiEvent};
pub use sites::{SiteAdapter, SiteRegistry};
pub use translation::{EngineRouter, TranslationBackend, TranslationError};
pub use types::{
    BridgeError, ElementDescriptor, ElementKind, ElementRef, EngineId, NodeId, TranslationRequest,
    TranslationResult,
};
