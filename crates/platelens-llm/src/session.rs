use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use async_trait::async_trait;
use platelens_core::AnalysisError;
use tracing::{debug, warn};

/// Text produced by one generate call, plus engine metrics when available.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    pub text: String,
    pub eval_tokens: Option<u32>,
    pub tokens_per_sec: Option<f64>,
}

/// Single-use, exclusively owned conversational handle to the inference
/// engine. One generate call per session; `close` is idempotent.
#[async_trait]
pub trait InferenceSession: Send {
    fn model_label(&self) -> &str;

    fn push_prompt(&mut self, text: &str);

    fn push_image(&mut self, bytes: &[u8], mime_type: &str);

    async fn generate(&mut self) -> Result<Generation, AnalysisError>;

    fn close(&mut self);
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create(&self) -> Result<Box<dyn InferenceSession>, AnalysisError>;
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn acquire(&self) -> Result<SessionGuard, AnalysisError>;
}

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// Scoped ownership of a session. Dropping the guard closes the session and
/// fires the provider's release hook, on every exit path including unwinds.
pub struct SessionGuard {
    session: Box<dyn InferenceSession>,
    on_release: Option<ReleaseHook>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn InferenceSession>, on_release: ReleaseHook) -> Self {
        Self {
            session,
            on_release: Some(on_release),
        }
    }
}

impl Deref for SessionGuard {
    type Target = dyn InferenceSession;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session.as_mut()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.close();
        if let Some(hook) = self.on_release.take() {
            hook();
        }
    }
}

type WarmSlot = Arc<tokio::sync::Mutex<Option<Box<dyn InferenceSession>>>>;

/// Keeps at most one session warmed ahead of need. Acquisition hands out the
/// warmed session when the background task won the race, and falls back to
/// synchronous creation otherwise. Each release kicks off the next warm-up.
pub struct PrewarmingProvider {
    factory: Arc<dyn SessionFactory>,
    warmed: WarmSlot,
}

impl PrewarmingProvider {
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        let warmed: WarmSlot = Arc::new(tokio::sync::Mutex::new(None));
        spawn_warm(Arc::clone(&factory), Arc::clone(&warmed));
        Self { factory, warmed }
    }
}

#[async_trait]
impl SessionProvider for PrewarmingProvider {
    async fn acquire(&self) -> Result<SessionGuard, AnalysisError> {
        let warmed = self.warmed.lock().await.take();
        let session = match warmed {
            Some(session) => {
                debug!("SESSION: using pre-warmed session");
                session
            }
            None => {
                debug!("SESSION: no warmed session available, creating synchronously");
                self.factory.create().await?
            }
        };

        let factory = Arc::clone(&self.factory);
        let slot = Arc::clone(&self.warmed);
        Ok(SessionGuard::new(
            session,
            Box::new(move || spawn_warm(factory, slot)),
        ))
    }
}

fn spawn_warm(factory: Arc<dyn SessionFactory>, slot: WarmSlot) {
    // Warming is an optimization only; outside a runtime (release hook fired
    // during shutdown) it is skipped.
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        return;
    };

    handle.spawn(async move {
        match factory.create().await {
            Ok(session) => {
                *slot.lock().await = Some(session);
                debug!("SESSION: replacement session warmed");
            }
            Err(e) => warn!("SESSION: pre-warm failed: {}", e),
        }
    });
}
