use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use serde_json::{Value, json};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::theme::Theme;

/// Raw diagnostic text from a failed parse or render; never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EngineDiagnostic {
    pub message: String,
}

impl EngineDiagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Engine configuration derived from the active theme. Script execution
/// from diagram content is always disabled.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub theme: String,
    pub look: Option<String>,
    pub theme_variables: Value,
    pub font_family: String,
    pub use_max_width: bool,
}

impl EngineOptions {
    pub fn from_theme(theme: &Theme) -> Self {
        Self {
            theme: theme.engine_theme.clone(),
            look: theme.look.clone(),
            theme_variables: theme.theme_variables.clone(),
            font_family: theme.font_family.clone(),
            use_max_width: false,
        }
    }

    /// Mermaid-style config document handed to the engine.
    pub fn to_engine_json(&self) -> Value {
        let mut doc = json!({
            "theme": self.theme,
            "themeVariables": self.theme_variables,
            "fontFamily": self.font_family,
            "securityLevel": "strict",
            "flowchart": { "useMaxWidth": self.use_max_width, "htmlLabels": false },
            "sequence": { "useMaxWidth": self.use_max_width },
            "gantt": { "useMaxWidth": self.use_max_width },
            "journey": { "useMaxWidth": self.use_max_width },
            "class": { "useMaxWidth": self.use_max_width },
            "state": { "useMaxWidth": self.use_max_width },
            "er": { "useMaxWidth": self.use_max_width },
            "pie": { "useMaxWidth": self.use_max_width },
        });
        if let Some(look) = &self.look {
            doc["look"] = json!(look);
        }
        doc
    }
}

/// Call contract for the external rendering engine. `configure` must
/// precede any `render` whose theme may have changed since the last call;
/// the adapter tracks that with a dirty flag.
pub trait DiagramEngine {
    fn configure(&mut self, options: &EngineOptions) -> Result<(), EngineDiagnostic>;

    fn parse(&mut self, source: &str) -> Result<(), EngineDiagnostic>;

    fn render(&mut self, source: &str, render_id: &str) -> Result<String, EngineDiagnostic>;
}

struct CachedParse {
    source: String,
    markup: String,
}

/// Drives an external mermaid-cli compatible binary
/// (`program -i in.mmd -o out.svg [-c config.json]`). The subprocess has
/// no separable parse step, so `parse` performs the full run and caches
/// the markup for the following `render` of the same source.
pub struct CommandEngine {
    program: PathBuf,
    extra_args: Vec<String>,
    config_file: Option<NamedTempFile>,
    cached: Option<CachedParse>,
}

impl CommandEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
            config_file: None,
            cached: None,
        }
    }

    /// Extra arguments appended to every invocation.
    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.extra_args.extend(args);
        self
    }

    fn invoke(&self, source: &str) -> Result<String, EngineDiagnostic> {
        let dir = tempfile::tempdir().map_err(io_diagnostic)?;
        let input = dir.path().join("diagram.mmd");
        let output = dir.path().join("diagram.svg");
        std::fs::write(&input, source).map_err(io_diagnostic)?;

        let mut cmd = Command::new(&self.program);
        cmd.arg("-i").arg(&input).arg("-o").arg(&output);
        if let Some(config) = &self.config_file {
            cmd.arg("-c").arg(config.path());
        }
        cmd.args(&self.extra_args);

        let result = cmd.output().map_err(|err| {
            EngineDiagnostic::new(format!(
                "failed to launch renderer {}: {err}",
                self.program.display()
            ))
        })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let message = stderr.trim();
            if message.is_empty() {
                return Err(EngineDiagnostic::new(format!(
                    "renderer exited with {}",
                    result.status
                )));
            }
            return Err(EngineDiagnostic::new(message));
        }

        std::fs::read_to_string(&output).map_err(io_diagnostic)
    }
}

impl DiagramEngine for CommandEngine {
    fn configure(&mut self, options: &EngineOptions) -> Result<(), EngineDiagnostic> {
        let doc = options.to_engine_json();
        let mut file = NamedTempFile::new().map_err(io_diagnostic)?;
        let body = serde_json::to_string_pretty(&doc)
            .map_err(|err| EngineDiagnostic::new(err.to_string()))?;
        file.write_all(body.as_bytes()).map_err(io_diagnostic)?;
        file.flush().map_err(io_diagnostic)?;
        self.config_file = Some(file);
        self.cached = None;
        Ok(())
    }

    fn parse(&mut self, source: &str) -> Result<(), EngineDiagnostic> {
        let markup = self.invoke(source)?;
        self.cached = Some(CachedParse {
            source: source.to_string(),
            markup,
        });
        Ok(())
    }

    fn render(&mut self, source: &str, _render_id: &str) -> Result<String, EngineDiagnostic> {
        if let Some(cached) = self.cached.take() {
            if cached.source == source {
                return Ok(cached.markup);
            }
        }
        self.invoke(source)
    }
}

fn io_diagnostic(err: std::io::Error) -> EngineDiagnostic {
    EngineDiagnostic::new(err.to_string())
}
