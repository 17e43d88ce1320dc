//! Scripted in-process backends shared by the engine tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kindred::engine::{ConversationEngine, EngineSettings};
use kindred::prompt::{ModelRequest, PromptLimits};
use kindred::providers::{ModelBackend, ProviderError, ReplyStream};
use kindred::store::MemoryStore;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// What the backend does for one `send`.
pub enum Script {
    /// Stream these fragments, then end.
    Fragments(Vec<&'static str>),
    /// Stream whatever the test pushes through the channel.
    Channel(mpsc::Receiver<Result<String, ProviderError>>),
    /// Reject the request with a status.
    Status(u16, &'static str),
    /// Never answer the request.
    Hang,
}

/// Backend replaying scripts in order and recording every request.
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedBackend {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn send(&self, request: &ModelRequest) -> Result<ReplyStream, ProviderError> {
        self.requests.lock().expect("lock").push(request.clone());
        let script = self.scripts.lock().expect("lock").pop_front();
        match script {
            Some(Script::Fragments(fragments)) => Ok(Box::pin(tokio_stream::iter(
                fragments.into_iter().map(|f| Ok(f.to_owned())),
            ))),
            Some(Script::Channel(rx)) => Ok(Box::pin(ReceiverStream::new(rx))),
            Some(Script::Status(status, message)) => Err(ProviderError::HttpStatus {
                status,
                message: message.to_owned(),
            }),
            Some(Script::Hang) => std::future::pending().await,
            None => Err(ProviderError::Unavailable("script exhausted".to_owned())),
        }
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

/// Deterministic settings with flourishes off.
pub fn settings() -> EngineSettings {
    EngineSettings {
        limits: PromptLimits::default(),
        flourishes: false,
        seed: Some(7),
        ..EngineSettings::default()
    }
}

/// Engine over `backend` and a fresh in-memory store.
pub fn engine_with(
    backend: Option<Arc<ScriptedBackend>>,
) -> (Arc<ConversationEngine>, Arc<MemoryStore>) {
    engine_with_settings(settings(), backend)
}

/// Like [`engine_with`], with custom settings.
pub fn engine_with_settings(
    settings: EngineSettings,
    backend: Option<Arc<ScriptedBackend>>,
) -> (Arc<ConversationEngine>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let backend = backend.map(|b| b as Arc<dyn ModelBackend>);
    let engine = ConversationEngine::new(settings, backend, store.clone())
        .expect("engine builds");
    (Arc::new(engine), store)
}
