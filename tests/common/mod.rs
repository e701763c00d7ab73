//! Shared fixtures for session-level tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use translate_bridge::host::memory::{MemoryPage, NodeSpec};
use translate_bridge::{
    Config, EngineId, MemoryStore, NodeId, Session, SessionHandle, TranslationBackend,
    TranslationError, TranslationRequest, UiEvent,
};

#[derive(Clone)]
enum Reply {
    Text(String),
    Fail,
}

/// Backend that records every request and answers from a table
#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<String>>,
    replies: Mutex<HashMap<String, Reply>>,
    delays: Mutex<HashMap<String, Duration>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, source: &str, translation: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(source.to_string(), Reply::Text(translation.to_string()));
    }

    pub fn fail(&self, source: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(source.to_string(), Reply::Fail);
    }

    pub fn delay(&self, source: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(source.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl TranslationBackend for FakeBackend {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, TranslationError> {
        let text = request.source_text().to_string();
        self.calls.lock().unwrap().push(text.clone());

        let delay = self.delays.lock().unwrap().get(&text).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.replies.lock().unwrap().get(&text).cloned();
        match reply {
            Some(Reply::Text(t)) => Ok(t),
            Some(Reply::Fail) => Err(TranslationError::Status(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            )),
            None => Ok(format!("translated {} chars", text.chars().count())),
        }
    }

    fn engine(&self) -> EngineId {
        EngineId::Google
    }
}

/// A running session over a headless page
pub struct Harness {
    pub page: Arc<MemoryPage>,
    pub backend: Arc<FakeBackend>,
    pub store: Arc<MemoryStore>,
    pub handle: SessionHandle,
    pub ui: mpsc::UnboundedReceiver<UiEvent>,
    pub task: JoinHandle<()>,
}

impl Harness {
    pub fn start(hostname: &str) -> Self {
        Self::start_with(Arc::new(MemoryPage::new(hostname)), Arc::new(MemoryStore::new()))
    }

    pub fn start_with(page: Arc<MemoryPage>, store: Arc<MemoryStore>) -> Self {
        let backend = FakeBackend::new();
        let (handle, ui, task) = Session::spawn(
            Config::default(),
            page.clone(),
            backend.clone(),
            store.clone(),
        );
        page.connect(handle.host_sender());
        Self {
            page,
            backend,
            store,
            handle,
            ui,
            task,
        }
    }

    pub fn add(&self, spec: NodeSpec) -> NodeId {
        self.page.append(self.page.body(), spec)
    }

    /// Select `node` through the click interceptor
    pub async fn select(&self, node: NodeId) {
        assert!(self.handle.enter_selection_mode().await.unwrap());
        assert!(self.page.click(node));
        // Round-trip so the click is handled before returning
        self.handle.snapshot().await.unwrap();
    }

    pub async fn enable_auto_mode(&self) {
        assert!(self.handle.toggle_auto_mode().await.unwrap());
    }

    /// Everything the panel has been sent so far
    pub fn drain_ui(&mut self) -> Vec<UiEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.ui.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn statuses(events: &[UiEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                UiEvent::Status(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn outputs(events: &[UiEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                UiEvent::Output(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Let the paused clock run forward
pub async fn wait_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
