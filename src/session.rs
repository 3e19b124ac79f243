use std::time::{Duration, Instant};

use crate::adapter::{RenderEngineAdapter, RenderOutcome};
use crate::config::Config;
use crate::controller::{DebounceTimer, RenderAttempt, RenderController};
use crate::engine::DiagramEngine;
use crate::error_surface::ErrorSurface;
use crate::export::ExportError;
use crate::history::{HistoryLog, HistorySnapshot};
use crate::share;
use crate::storage::{HISTORY_KEY, SOURCE_KEY, Storage};
use crate::theme::{Theme, ThemeId};
use crate::viewport::ViewportController;

/// Shown when neither a share fragment nor persisted source exists.
pub const DEFAULT_DOCUMENT: &str = r#"flowchart TB
    subgraph Client["Client Layer"]
        A[Web Browser] --> B[Mobile App]
        B --> C[Desktop Client]
    end

    subgraph Gateway["API Gateway"]
        D[Load Balancer]
        E[Authentication]
        F[Rate Limiting]
    end

    subgraph Services["Microservices"]
        G[User Service]
        H[Payment Service]
        I[Notification Service]
    end

    subgraph Data["Data Layer"]
        K[(PostgreSQL)]
        M[(Redis Cache)]
        N[Message Queue]
    end

    Client --> D
    D --> E
    E --> F
    F --> G & H & I

    G --> K
    G --> M
    H --> K
    H --> N
    N --> I
"#;

pub struct Session<E> {
    config: Config,
    source: String,
    active_theme: ThemeId,
    adapter: RenderEngineAdapter<E>,
    controller: RenderController,
    viewport: ViewportController,
    history: HistoryLog,
    history_timer: DebounceTimer,
    storage: Box<dyn Storage>,
    markup: Option<String>,
    errors: ErrorSurface,
    started_at: Instant,
    epoch_millis: u64,
}

impl<E: DiagramEngine> Session<E> {
    /// `epoch_millis` is the wall-clock time corresponding to `now`; later
    /// instants are translated against it for history timestamps, so tests
    /// can run the whole session on fabricated time.
    pub fn new(
        engine: E,
        storage: Box<dyn Storage>,
        config: Config,
        now: Instant,
        epoch_millis: u64,
    ) -> Self {
        let active_theme = ThemeId::Notion;
        let theme = Theme::by_id(active_theme);
        let history = load_history(storage.as_ref(), config.history_cap);
        Self {
            adapter: RenderEngineAdapter::new(engine, &theme),
            controller: RenderController::new(Duration::from_millis(config.debounce_ms)),
            viewport: ViewportController::new(
                config.viewport.min_scale,
                config.viewport.max_scale,
                config.viewport.zoom_step,
            ),
            history,
            history_timer: DebounceTimer::new(Duration::from_millis(config.history_debounce_ms)),
            storage,
            config,
            source: String::new(),
            active_theme,
            markup: None,
            errors: ErrorSurface::default(),
            started_at: now,
            epoch_millis,
        }
    }

    /// Initial content precedence: share fragment, then persisted source,
    /// then the default document. A malformed fragment counts as absent.
    /// Startup content is not an edit: nothing is persisted until the user
    /// types, so opening a share link never overwrites saved work.
    pub fn load_initial(&mut self, fragment: Option<&str>, now: Instant) {
        let text = fragment
            .and_then(share::decode)
            .or_else(|| self.read_best_effort(SOURCE_KEY).filter(|s| !s.is_empty()))
            .unwrap_or_else(|| DEFAULT_DOCUMENT.to_string());
        self.apply_source(&text, now);
    }

    /// Editor keystroke (or snapshot restore). Blank text clears the
    /// display immediately without issuing an attempt and without setting
    /// an error; anything else restarts the quiescence window.
    pub fn update_source(&mut self, text: &str, now: Instant) {
        self.persist(SOURCE_KEY, text);
        self.apply_source(text, now);
    }

    fn apply_source(&mut self, text: &str, now: Instant) {
        self.source = text.to_string();

        if self.source.trim().is_empty() {
            self.controller.cancel_pending();
            self.history_timer.cancel();
            self.markup = None;
            self.errors.clear();
            self.viewport.content_cleared();
            return;
        }

        self.controller
            .note_change(&self.source, self.active_theme, now);
        self.history_timer.schedule(now);
    }

    /// Clear is a normal text change that persists the empty string.
    pub fn clear(&mut self, now: Instant) {
        self.update_source("", now);
    }

    /// Restore a history snapshot; re-enters the render pipeline like any
    /// other text change.
    pub fn restore_snapshot(&mut self, id: u64, now: Instant) -> bool {
        let Some(code) = self.history.get(id).map(|e| e.code.clone()) else {
            return false;
        };
        self.update_source(&code, now);
        true
    }

    /// Wipe the snapshot log and its persisted copy.
    pub fn clear_history(&mut self) {
        self.history.clear();
        if let Err(err) = self.storage.remove(HISTORY_KEY) {
            tracing::warn!(%err, "history removal failed, log cleared in memory only");
        }
    }

    /// Invalidates the engine configuration and enqueues exactly one new
    /// attempt even though the source is unchanged.
    pub fn switch_theme(&mut self, id: ThemeId, now: Instant) -> bool {
        if id == self.active_theme {
            return false;
        }
        self.active_theme = id;
        self.adapter.set_theme(&Theme::by_id(id));
        if !self.source.trim().is_empty() {
            self.controller
                .note_change(&self.source, self.active_theme, now);
        }
        true
    }

    /// Pump the timers; returns the attempt to execute when a quiescent
    /// period has completed.
    pub fn tick(&mut self, now: Instant) -> Option<RenderAttempt> {
        if self.history_timer.fire(now) {
            self.record_history(now);
        }
        self.controller.poll(now)
    }

    pub fn execute(&mut self, attempt: &RenderAttempt) -> RenderOutcome {
        self.adapter.run(&attempt.source)
    }

    /// A result whose sequence number is not the latest issued is
    /// discarded. Returns whether the outcome was applied.
    pub fn apply(&mut self, seq: u64, outcome: RenderOutcome) -> bool {
        if !self.controller.is_current(seq) {
            tracing::debug!(seq, "discarding result of superseded attempt");
            return false;
        }
        match outcome {
            RenderOutcome::Rendered { markup } => {
                self.markup = Some(markup);
                self.errors.clear();
                self.viewport.content_replaced();
            }
            RenderOutcome::Failed { message } => {
                // Stale-but-valid: the last good diagram stays on screen.
                self.errors.set(message);
            }
        }
        true
    }

    /// tick + execute + apply for hosts that render inline.
    pub fn run_due(&mut self, now: Instant) -> bool {
        match self.tick(now) {
            Some(attempt) => {
                let outcome = self.execute(&attempt);
                self.apply(attempt.seq, outcome)
            }
            None => false,
        }
    }

    /// Render the pending change immediately, skipping the remaining
    /// quiescence wait.
    pub fn flush(&mut self, now: Instant) -> bool {
        if self.history_timer.is_pending() {
            self.history_timer.cancel();
            self.record_history(now);
        }
        match self.controller.flush() {
            Some(attempt) => {
                let outcome = self.execute(&attempt);
                self.apply(attempt.seq, outcome)
            }
            None => false,
        }
    }

    pub fn complete_layout(&mut self, content_size: (f32, f32), viewport_size: (f32, f32)) -> bool {
        self.viewport.complete_layout(content_size, viewport_size)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn markup(&self) -> Option<&str> {
        self.markup.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.errors.current()
    }

    pub fn active_theme(&self) -> ThemeId {
        self.active_theme
    }

    pub fn themes(&self) -> Vec<Theme> {
        Theme::catalog()
    }

    pub fn history(&self) -> &[HistorySnapshot] {
        self.history.entries()
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut ViewportController {
        &mut self.viewport
    }

    pub fn share_fragment(&self) -> String {
        share::encode(&self.source)
    }

    /// Last successful markup, verbatim.
    pub fn export_svg(&self) -> Result<&str, ExportError> {
        self.markup.as_deref().ok_or(ExportError::NothingRendered)
    }

    #[cfg(feature = "png")]
    pub fn export_png(&self, scale: Option<f32>) -> Result<Vec<u8>, ExportError> {
        let markup = self.markup.as_deref().ok_or(ExportError::NothingRendered)?;
        crate::export::export_png(
            markup,
            scale.unwrap_or(self.config.export.png_scale),
            self.config.export.fallback(),
        )
    }

    pub fn export_fallback(&self) -> (f32, f32) {
        self.config.export.fallback()
    }

    fn record_history(&mut self, now: Instant) {
        if self.history.record(&self.source, self.wall_millis(now)) {
            match serde_json::to_string(self.history.entries()) {
                Ok(body) => self.persist(HISTORY_KEY, &body),
                Err(err) => tracing::warn!(%err, "history serialization failed"),
            }
        }
    }

    fn wall_millis(&self, now: Instant) -> u64 {
        self.epoch_millis + now.saturating_duration_since(self.started_at).as_millis() as u64
    }

    fn persist(&mut self, key: &str, value: &str) {
        if let Err(err) = self.storage.write(key, value) {
            tracing::warn!(%err, key, "storage write failed, continuing in memory");
        }
    }

    fn read_best_effort(&self, key: &str) -> Option<String> {
        match self.storage.read(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(%err, key, "storage read failed, continuing without");
                None
            }
        }
    }
}

fn load_history(storage: &dyn Storage, cap: usize) -> HistoryLog {
    let raw = match storage.read(HISTORY_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return HistoryLog::new(cap),
        Err(err) => {
            tracing::warn!(%err, "history load failed, starting empty");
            return HistoryLog::new(cap);
        }
    };
    match serde_json::from_str(&raw) {
        Ok(entries) => HistoryLog::from_entries(entries, cap),
        Err(err) => {
            tracing::warn!(%err, "persisted history is malformed, starting empty");
            HistoryLog::new(cap)
        }
    }
}
