pub mod invoker;
pub mod ollama;
pub mod session;

pub use invoker::invoke;
pub use ollama::{OllamaConfig, OllamaEngine};
pub use session::{
    Generation, InferenceSession, PrewarmingProvider, SessionFactory, SessionGuard,
    SessionProvider,
};
