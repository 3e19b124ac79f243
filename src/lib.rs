pub mod adapter;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error_surface;
pub mod export;
pub mod history;
pub mod session;
pub mod share;
pub mod storage;
pub mod theme;
pub mod viewport;

pub use adapter::{RenderEngineAdapter, RenderOutcome};
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config};
pub use controller::{DebounceTimer, RenderAttempt, RenderController};
pub use engine::{CommandEngine, DiagramEngine, EngineDiagnostic, EngineOptions};
pub use error_surface::ErrorSurface;
pub use export::ExportError;
pub use history::{HistoryLog, HistorySnapshot};
pub use session::{DEFAULT_DOCUMENT, Session};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use theme::{Theme, ThemeId};
pub use viewport::{ViewportController, ViewportState};
