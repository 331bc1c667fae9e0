pub mod error;
pub mod progress;
pub mod types;

pub use error::AnalysisError;
pub use progress::{NoProgress, ProgressObserver, ProgressUpdate, Stage, StageStatus, StageTimings};
pub use types::*;
