//! The translation session.
//!
//! A [`Session`] owns every piece of mutable state: the bound target, the
//! local surface, auto mode, the debounce scheduler and selection mode. It
//! runs as a single task driven by one `select!` loop over four inputs:
//!
//! - commands from the panel, sent through a [`SessionHandle`]
//! - [`HostEvent`]s produced by the page
//! - debounce timer messages
//! - internal messages from settle delays and translation calls
//!
//! Timers and translation calls run as separate tasks and report back over
//! channels, so the loop never waits on the network. Results carry a sequence
//! number and a result older than one already shown is dropped, which keeps
//! overlapping translations from overwriting newer output.

use crate::bridge::{self, normalize_whitespace};
use crate::change_detector::{ChangeDetector, Detection};
use crate::config::Config;
use crate::gate::contains_source_language;
use crate::host::{HostEvent, HostPage};
use crate::persistence::{self, SelectionStore};
use crate::scheduler::{DebounceScheduler, SchedulerEvent, SchedulerOutput, SessionKey};
use crate::selector::{ElementSelector, SelectionOutcome, SelectorState};
use crate::sites::SiteRegistry;
use crate::translation::{run_translation, TranslationBackend};
use crate::types::{
    ElementDescriptor, ElementRef, EngineId, NodeId, TranslationRequest, TranslationResult,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Updates for the panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Status line
    Status(String),
    /// Output area (translation, placeholder or error text)
    Output(String),
    /// Countdown for a pending commit; `None` clears it
    Countdown {
        key: SessionKey,
        remaining_seconds: Option<u32>,
    },
    /// Target content mirrored into the local surface
    LocalInput(String),
    AutoMode(bool),
    SelectionMode(bool),
    TargetChanged(Option<ElementDescriptor>),
    EngineChanged(EngineId),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session has stopped")]
    Closed,
}

/// Point-in-time view of session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub auto_mode: bool,
    pub selecting: bool,
    pub engine: EngineId,
    pub local_input: String,
    pub target: Option<ElementRef>,
    pub pending: Vec<SessionKey>,
}

type TextReply = oneshot::Sender<Option<String>>;

enum Command {
    Translate { reply: TextReply },
    Fill { reply: TextReply },
    Submit { reply: TextReply },
    EnterSelection { reply: oneshot::Sender<bool> },
    ExitSelection { reply: oneshot::Sender<bool> },
    ToggleSelection { reply: oneshot::Sender<bool> },
    ToggleAutoMode { reply: oneshot::Sender<bool> },
    Restore { reply: oneshot::Sender<bool> },
    SetLocalInput { text: String, reply: oneshot::Sender<()> },
    SetEngine { engine: EngineId, reply: oneshot::Sender<()> },
    Snapshot { reply: oneshot::Sender<SessionSnapshot> },
    Shutdown { reply: oneshot::Sender<()> },
}

/// Why a translation was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Purpose {
    /// Translate button: display only
    Manual,
    /// Fill button: always write to the target
    Fill,
    /// Debounced commit: write to the target in auto mode
    Commit(SessionKey),
}

enum Internal {
    /// A settle delay after key or pointer release has elapsed
    Settled { node: NodeId },
    Translated {
        seq: u64,
        purpose: Purpose,
        result: TranslationResult,
        reply: Option<TextReply>,
    },
}

/// Cloneable front for a running [`Session`]
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    host_tx: mpsc::UnboundedSender<HostEvent>,
}

impl SessionHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Translate the local surface. Resolves once the translation finishes
    /// with the translated text, or `None` if there was nothing usable.
    pub async fn translate(&self) -> Result<Option<String>, SessionError> {
        self.request(|reply| Command::Translate { reply }).await
    }

    /// Translate the local surface and write the result into the target.
    /// Resolves to the written text, or `None` if nothing was written: no
    /// target, no usable translation, a detached target, or a newer
    /// translation already shown.
    pub async fn fill_translation_to_target_input(&self) -> Result<Option<String>, SessionError> {
        self.request(|reply| Command::Fill { reply }).await
    }

    /// Keyboard submit: cancel pending commits, then fill if a target is
    /// bound or translate otherwise
    pub async fn submit(&self) -> Result<Option<String>, SessionError> {
        self.request(|reply| Command::Submit { reply }).await
    }

    pub async fn enter_selection_mode(&self) -> Result<bool, SessionError> {
        self.request(|reply| Command::EnterSelection { reply }).await
    }

    pub async fn exit_selection_mode(&self) -> Result<bool, SessionError> {
        self.request(|reply| Command::ExitSelection { reply }).await
    }

    /// Returns `true` when selection mode is now active
    pub async fn toggle_selection_mode(&self) -> Result<bool, SessionError> {
        self.request(|reply| Command::ToggleSelection { reply }).await
    }

    /// Returns the new auto mode state
    pub async fn toggle_auto_mode(&self) -> Result<bool, SessionError> {
        self.request(|reply| Command::ToggleAutoMode { reply }).await
    }

    /// Rebind the target remembered from a previous session
    pub async fn restore_last_selection(&self) -> Result<bool, SessionError> {
        self.request(|reply| Command::Restore { reply }).await
    }

    /// The user edited the local surface
    pub async fn set_local_input(&self, text: &str) -> Result<(), SessionError> {
        let text = text.to_string();
        self.request(|reply| Command::SetLocalInput { text, reply })
            .await
    }

    pub async fn set_engine(&self, engine: EngineId) -> Result<(), SessionError> {
        self.request(|reply| Command::SetEngine { engine, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Save the selection and stop the session
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    /// Feed a page event into the session
    pub fn host_event(&self, event: HostEvent) -> Result<(), SessionError> {
        self.host_tx.send(event).map_err(|_| SessionError::Closed)
    }

    /// Sender for hosts that push their own events
    pub fn host_sender(&self) -> mpsc::UnboundedSender<HostEvent> {
        self.host_tx.clone()
    }
}

/// Single-owner session state
pub struct Session {
    config: Config,
    host: Arc<dyn HostPage>,
    backend: Arc<dyn TranslationBackend>,
    store: Arc<dyn SelectionStore>,

    selector: ElementSelector,
    detector: ChangeDetector,
    scheduler: DebounceScheduler,
    sites: SiteRegistry,

    target: Option<ElementRef>,
    auto_mode: bool,
    engine: EngineId,
    /// Current content of the local surface
    local_input: String,
    /// Trimmed local value last acted on
    last_local: String,
    /// Normalized text of the last bridge write, per target
    last_write: Option<(NodeId, String)>,

    next_seq: u64,
    applied_seq: u64,

    commands_rx: mpsc::UnboundedReceiver<Command>,
    host_rx: mpsc::UnboundedReceiver<HostEvent>,
    scheduler_rx: mpsc::UnboundedReceiver<SchedulerEvent>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    ui_tx: mpsc::UnboundedSender<UiEvent>,
}

impl Session {
    /// Build a session and the handle and UI stream that drive it.
    /// Nothing happens until [`Session::run`] is polled.
    pub fn new(
        config: Config,
        host: Arc<dyn HostPage>,
        backend: Arc<dyn TranslationBackend>,
        store: Arc<dyn SelectionStore>,
    ) -> (Self, SessionHandle, mpsc::UnboundedReceiver<UiEvent>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (host_tx, host_rx) = mpsc::unbounded_channel();
        let (scheduler_tx, scheduler_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (ui_tx, ui_rx) = mpsc::unbounded_channel();

        let selector = ElementSelector::new(
            config.selection.rich_editor_classes.clone(),
            config.selection.marker_class.clone(),
        );
        let detector = ChangeDetector::new(
            config.timing.key_settle(),
            config.timing.pointer_settle(),
        );
        let scheduler = DebounceScheduler::new(
            config.timing.quiescence(),
            config.timing.countdown_tick(),
            scheduler_tx,
        );
        let sites = SiteRegistry::for_host(&config.sites, &host.hostname());

        let session = Self {
            auto_mode: config.general.auto_mode,
            engine: config.translation.engine,
            config,
            host,
            backend,
            store,
            selector,
            detector,
            scheduler,
            sites,
            target: None,
            local_input: String::new(),
            last_local: String::new(),
            last_write: None,
            next_seq: 0,
            applied_seq: 0,
            commands_rx,
            host_rx,
            scheduler_rx,
            internal_tx,
            internal_rx,
            ui_tx,
        };
        let handle = SessionHandle {
            commands: commands_tx,
            host_tx,
        };
        (session, handle, ui_rx)
    }

    /// Build a session and run it on a new task
    pub fn spawn(
        config: Config,
        host: Arc<dyn HostPage>,
        backend: Arc<dyn TranslationBackend>,
        store: Arc<dyn SelectionStore>,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<UiEvent>, JoinHandle<()>) {
        let (session, handle, ui_rx) = Self::new(config, host, backend, store);
        let task = tokio::spawn(session.run());
        (handle, ui_rx, task)
    }

    /// Run until shutdown, page unload, or every handle is dropped
    pub async fn run(mut self) {
        info!("Translation session started on {}", self.host.hostname());
        if !self.sites.is_empty() {
            let names = self.sites.names().join(", ");
            self.status(format!("Detected {}, compatibility mode enabled", names));
        }

        loop {
            // Page and timer input drains before panel commands so a command
            // always observes every event queued ahead of it
            tokio::select! {
                biased;

                Some(message) = self.internal_rx.recv() => self.on_internal(message),
                Some(event) = self.scheduler_rx.recv() => self.on_scheduler(event),
                Some(event) = self.host_rx.recv() => {
                    if event == HostEvent::Unload {
                        info!("Page unloading");
                        self.finish().await;
                        break;
                    }
                    self.on_host_event(event);
                }
                command = self.commands_rx.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.finish().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.on_command(command).await,
                    None => {
                        debug!("All session handles dropped");
                        self.finish().await;
                        break;
                    }
                },
            }
        }
        info!("Translation session stopped");
    }

    fn emit(&self, event: UiEvent) {
        trace!("UI: {:?}", event);
        let _ = self.ui_tx.send(event);
    }

    fn status(&self, message: impl Into<String>) {
        self.emit(UiEvent::Status(message.into()));
    }

    fn clear_countdown(&self, key: SessionKey) {
        self.emit(UiEvent::Countdown {
            key,
            remaining_seconds: None,
        });
    }

    fn cancel_pending(&mut self) {
        for key in self.pending_keys() {
            self.scheduler.cancel(key);
            self.clear_countdown(key);
        }
    }

    fn pending_keys(&self) -> Vec<SessionKey> {
        let mut keys = vec![SessionKey::Local];
        if let Some(target) = &self.target {
            keys.push(SessionKey::Target(target.node()));
        }
        keys.retain(|k| self.scheduler.is_active(*k));
        keys
    }

    /// Start the single pending commit, replacing any other
    fn arm(&mut self, key: SessionKey, value: &str) {
        self.cancel_pending();
        let remaining = self.scheduler.arm(key, value);
        self.emit(UiEvent::Countdown {
            key,
            remaining_seconds: Some(remaining),
        });
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Translate { reply } => self.translate(Purpose::Manual, reply),
            Command::Fill { reply } => self.fill(reply),
            Command::Submit { reply } => {
                self.cancel_pending();
                if self.target.is_some() {
                    self.fill(reply);
                } else {
                    self.translate(Purpose::Manual, reply);
                }
            }
            Command::EnterSelection { reply } => {
                let _ = reply.send(self.enter_selection_mode());
            }
            Command::ExitSelection { reply } => {
                let _ = reply.send(self.exit_selection_mode());
            }
            Command::ToggleSelection { reply } => {
                let selecting = if self.selector.is_selecting() {
                    self.exit_selection_mode();
                    false
                } else {
                    self.enter_selection_mode();
                    true
                };
                let _ = reply.send(selecting);
            }
            Command::ToggleAutoMode { reply } => {
                self.auto_mode = !self.auto_mode;
                info!("Auto mode {}", if self.auto_mode { "on" } else { "off" });
                self.emit(UiEvent::AutoMode(self.auto_mode));
                self.status(if self.auto_mode {
                    "Auto mode enabled"
                } else {
                    "Auto mode disabled"
                });
                let _ = reply.send(self.auto_mode);
            }
            Command::Restore { reply } => {
                let restored = self.restore_last_selection().await;
                let _ = reply.send(restored);
            }
            Command::SetLocalInput { text, reply } => {
                self.set_local_input(text);
                let _ = reply.send(());
            }
            Command::SetEngine { engine, reply } => {
                self.engine = engine;
                debug!("Engine set to {}", engine);
                self.emit(UiEvent::EngineChanged(engine));
                let _ = reply.send(());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(SessionSnapshot {
                    auto_mode: self.auto_mode,
                    selecting: self.selector.state() == SelectorState::Selecting,
                    engine: self.engine,
                    local_input: self.local_input.clone(),
                    target: self.target.clone(),
                    pending: self.pending_keys(),
                });
            }
            Command::Shutdown { reply } => {
                // Handled by the run loop
                let _ = reply.send(());
            }
        }
    }

    fn enter_selection_mode(&mut self) -> bool {
        let entered = self.selector.enter_selection_mode(self.host.as_ref());
        if entered {
            self.emit(UiEvent::SelectionMode(true));
            self.status("Click an input on the page to select it as the target");
        }
        entered
    }

    fn exit_selection_mode(&mut self) -> bool {
        let exited = self.selector.exit_selection_mode(self.host.as_ref());
        if exited {
            self.emit(UiEvent::SelectionMode(false));
            self.status("Selection mode cancelled");
        }
        exited
    }

    /// Local surface edit
    fn set_local_input(&mut self, text: String) {
        let trimmed = text.trim().to_string();
        self.local_input = text;
        if trimmed == self.last_local {
            return;
        }
        self.last_local = trimmed.clone();

        if trimmed.is_empty() || !contains_source_language(&trimmed) {
            trace!("Local input not eligible, cancelling pending commit");
            self.cancel_pending();
            return;
        }
        self.arm(SessionKey::Local, &trimmed);
    }

    /// Start a translation of the local surface
    fn translate(&mut self, purpose: Purpose, reply: TextReply) {
        let text = self.local_input.trim().to_string();
        if text.is_empty() {
            self.emit(UiEvent::Output("Please enter text to translate".to_string()));
            let _ = reply.send(None);
            return;
        }
        self.cancel_pending();
        self.dispatch(text, purpose, Some(reply));
    }

    fn fill(&mut self, reply: TextReply) {
        if self.target.is_none() {
            self.status("No target input selected");
            let _ = reply.send(None);
            return;
        }
        self.translate(Purpose::Fill, reply);
    }

    /// Spawn a backend call; the result comes back as [`Internal::Translated`]
    fn dispatch(&mut self, text: String, purpose: Purpose, reply: Option<TextReply>) {
        let Some(request) = TranslationRequest::new(text, self.engine) else {
            if let Some(reply) = reply {
                let _ = reply.send(None);
            }
            return;
        };

        self.next_seq += 1;
        let seq = self.next_seq;
        debug!("Translation {} ({:?}) via {}", seq, purpose, request.engine());
        self.emit(UiEvent::Output("Translating...".to_string()));
        self.status("Translating...");

        let backend = self.backend.clone();
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = run_translation(backend.as_ref(), &request).await;
            let _ = tx.send(Internal::Translated {
                seq,
                purpose,
                result,
                reply,
            });
        });
    }

    fn on_internal(&mut self, message: Internal) {
        match message {
            Internal::Settled { node } => {
                if self.target.as_ref().map(|t| t.node()) == Some(node) {
                    self.read_target();
                }
            }
            Internal::Translated {
                seq,
                purpose,
                result,
                reply,
            } => {
                let text = self.apply_translation(seq, purpose, &result);
                if let Some(reply) = reply {
                    let _ = reply.send(text);
                }
            }
        }
    }

    /// Show a finished translation and act on it. Returns the usable text.
    fn apply_translation(
        &mut self,
        seq: u64,
        purpose: Purpose,
        result: &TranslationResult,
    ) -> Option<String> {
        let text = result.text().map(str::to_string);
        if seq <= self.applied_seq {
            debug!(
                "Dropping translation {} (already showing {})",
                seq, self.applied_seq
            );
            return match purpose {
                Purpose::Fill => None,
                _ => text,
            };
        }
        self.applied_seq = seq;

        match result {
            TranslationResult::Translated(t) if t.is_empty() => {
                self.emit(UiEvent::Output("Translation result is empty".to_string()));
                self.status("Translation complete");
            }
            TranslationResult::Translated(t) => {
                self.emit(UiEvent::Output(t.clone()));
                self.status("Translation complete");
            }
            TranslationResult::Failed(reason) => {
                self.emit(UiEvent::Output(format!("Translation error: {}", reason)));
                self.status(format!("Translation failed: {}", reason));
            }
        }

        if let Some(t) = &text {
            match purpose {
                Purpose::Manual => {}
                Purpose::Fill => {
                    if !self.write_to_target(t, "Filled translation into the target input") {
                        return None;
                    }
                }
                Purpose::Commit(key) => {
                    if self.auto_mode && self.target.is_some() {
                        debug!("Auto mode write for {:?}", key);
                        self.write_to_target(t, "Auto mode: filled translation into the target");
                    }
                }
            }
        }
        text
    }

    fn write_to_target(&mut self, text: &str, done: &str) -> bool {
        let Some(target) = self.target.clone() else {
            self.status("No target input selected");
            return false;
        };

        match bridge::set_content(self.host.as_ref(), &target, text) {
            Ok(report) => {
                self.last_write = Some((target.node(), normalize_whitespace(text)));
                if report.degraded {
                    warn!("Degraded write to {}", target.descriptor().label());
                }
                self.status(done);
                true
            }
            Err(e) => {
                warn!("Write to target failed: {}", e);
                self.status("The target input is no longer on the page");
                false
            }
        }
    }

    fn on_scheduler(&mut self, event: SchedulerEvent) {
        match self.scheduler.accept(event) {
            Some(SchedulerOutput::Countdown {
                key,
                remaining_seconds,
            }) => self.emit(UiEvent::Countdown {
                key,
                remaining_seconds: Some(remaining_seconds),
            }),
            Some(SchedulerOutput::Commit {
                key,
                baseline_value,
            }) => {
                self.clear_countdown(key);
                info!("Input settled, translating");
                self.dispatch(baseline_value, Purpose::Commit(key), None);
            }
            None => {}
        }
    }

    fn on_host_event(&mut self, event: HostEvent) {
        if let HostEvent::Click { node } = event {
            self.on_click(node);
            return;
        }

        let Some(target) = &self.target else {
            return;
        };
        let node = target.node();
        match self.detector.classify_event(self.host.as_ref(), &event) {
            Detection::Ignore => {}
            Detection::ReadNow => self.read_target(),
            Detection::ReadAfter(settle) => {
                let tx = self.internal_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(settle).await;
                    let _ = tx.send(Internal::Settled { node });
                });
            }
        }
    }

    fn on_click(&mut self, node: NodeId) {
        let Some(outcome) = self.selector.handle_click(self.host.as_ref(), node) else {
            return;
        };
        self.emit(UiEvent::SelectionMode(false));
        match outcome {
            SelectionOutcome::Selected(element) => {
                let label = element.descriptor().label();
                self.bind(element);
                self.status(format!("Selected target: {}", label));
            }
            SelectionOutcome::Invalid => {
                self.status("The selected element is not a valid input, please select again");
            }
        }
    }

    /// Make `element` the target, replacing any previous one
    fn bind(&mut self, element: ElementRef) {
        if let Some(old) = self.target.take() {
            self.selector.unmark(self.host.as_ref(), &old);
            let key = SessionKey::Target(old.node());
            if self.scheduler.cancel(key) {
                self.clear_countdown(key);
            }
        }
        self.last_write = None;

        let host = self.host.as_ref();
        self.selector.mark(host, &element);
        let mut plan = self.detector.plan_for(&element);
        self.sites.refine(&element, &mut plan);
        self.detector.attach(host, plan);

        self.emit(UiEvent::TargetChanged(Some(element.descriptor().clone())));
        self.target = Some(element);
    }

    /// Snapshot the target and run it through the auto mode pipeline
    fn read_target(&mut self) {
        let Some(target) = self.target.clone() else {
            return;
        };
        match self.detector.snapshot(self.host.as_ref(), &target) {
            Ok(change) => self.on_target_change(change.node, &change.content),
            Err(e) => {
                warn!("Cannot read target: {}", e);
                self.status("The target input is no longer on the page");
            }
        }
    }

    fn on_target_change(&mut self, node: NodeId, content: &str) {
        if !self.auto_mode {
            trace!("Auto mode off, ignoring change on {}", node);
            return;
        }

        if let Some((written, value)) = &self.last_write {
            if *written == node && normalize_whitespace(content) == *value {
                trace!("Change on {} is our own write", node);
                return;
            }
        }

        let trimmed = content.trim();
        let key = SessionKey::Target(node);
        if trimmed.is_empty() {
            if self.scheduler.cancel(key) {
                self.clear_countdown(key);
            }
            return;
        }
        if !contains_source_language(trimmed) {
            return;
        }
        // Rich kinds report one edit through several listeners
        if self.scheduler.baseline_value(key) == Some(trimmed) {
            trace!("Change on {} already pending", node);
            return;
        }

        self.local_input = content.to_string();
        self.last_local = trimmed.to_string();
        self.emit(UiEvent::LocalInput(content.to_string()));
        self.arm(key, trimmed);
    }

    async fn restore_last_selection(&mut self) -> bool {
        let key = self.config.persistence.storage_key.clone();
        let descriptor = match persistence::load_descriptor(self.store.as_ref(), &key).await {
            Ok(Some(descriptor)) => descriptor,
            Ok(None) => {
                debug!("No saved selection");
                return false;
            }
            Err(e) => {
                warn!("Failed to load saved selection: {}", e);
                return false;
            }
        };

        let host = self.host.as_ref();
        let Some(candidate) = persistence::find_candidate(host, &descriptor) else {
            debug!("Saved selection {} not found on page", descriptor.label());
            return false;
        };
        let Some((node, kind)) = self.selector.classify(host, candidate) else {
            debug!("Saved selection {} is not editable here", descriptor.label());
            return false;
        };

        let element = ElementRef::new(node, kind, self.selector.describe(host, node));
        let label = element.descriptor().label();
        self.bind(element);
        info!("Restored target {}", label);
        self.status(format!("Restored target input: {}", label));
        true
    }

    /// Persist the selection and release the page
    async fn finish(&mut self) {
        self.scheduler.cancel_all();
        self.selector.exit_selection_mode(self.host.as_ref());
        self.detector.detach(self.host.as_ref());

        let Some(target) = &self.target else {
            return;
        };
        if !self.config.persistence.enabled {
            return;
        }
        let key = &self.config.persistence.storage_key;
        if let Err(e) = persistence::save_selection(self.store.as_ref(), key, target).await {
            warn!("Failed to save selection: {}", e);
        }
    }
}
