use crate::engine::{DiagramEngine, EngineOptions};
use crate::theme::Theme;

/// Only `Rendered` replaces the displayed diagram; `Failed` touches the
/// error surface alone, leaving the last valid markup on screen.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Rendered { markup: String },
    Failed { message: String },
}

pub struct RenderEngineAdapter<E> {
    engine: E,
    options: EngineOptions,
    dirty: bool,
    next_render_id: u64,
}

impl<E: DiagramEngine> RenderEngineAdapter<E> {
    pub fn new(engine: E, theme: &Theme) -> Self {
        Self {
            engine,
            options: EngineOptions::from_theme(theme),
            dirty: true,
            next_render_id: 0,
        }
    }

    pub fn set_theme(&mut self, theme: &Theme) {
        self.options = EngineOptions::from_theme(theme);
        self.dirty = true;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[cfg(test)]
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Configure if stale, parse, render only on parse success. Every
    /// engine failure becomes a `Failed` outcome at this boundary.
    pub fn run(&mut self, source: &str) -> RenderOutcome {
        if self.dirty {
            if let Err(diag) = self.engine.configure(&self.options) {
                return RenderOutcome::Failed {
                    message: diag.message,
                };
            }
            self.dirty = false;
        }

        if let Err(diag) = self.engine.parse(source) {
            return RenderOutcome::Failed {
                message: diag.message,
            };
        }

        let render_id = self.fresh_render_id();
        match self.engine.render(source, &render_id) {
            Ok(markup) => RenderOutcome::Rendered { markup },
            Err(diag) => RenderOutcome::Failed {
                message: diag.message,
            },
        }
    }

    // Unique per call: engines that cache output keyed by a prior
    // identifier would otherwise return stale markup.
    fn fresh_render_id(&mut self) -> String {
        self.next_render_id += 1;
        format!("mermaid-live-{}", self.next_render_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineDiagnostic;

    #[derive(Default)]
    struct ProbeEngine {
        configures: usize,
        parses: usize,
        renders: usize,
        render_ids: Vec<String>,
        fail_parse: bool,
    }

    impl DiagramEngine for ProbeEngine {
        fn configure(&mut self, _options: &EngineOptions) -> Result<(), EngineDiagnostic> {
            self.configures += 1;
            Ok(())
        }

        fn parse(&mut self, _source: &str) -> Result<(), EngineDiagnostic> {
            self.parses += 1;
            if self.fail_parse {
                return Err(EngineDiagnostic::new("Parse error on line 1"));
            }
            Ok(())
        }

        fn render(&mut self, source: &str, render_id: &str) -> Result<String, EngineDiagnostic> {
            self.renders += 1;
            self.render_ids.push(render_id.to_string());
            Ok(format!("<svg>{source}</svg>"))
        }
    }

    #[test]
    fn configures_once_until_theme_changes() {
        let mut adapter = RenderEngineAdapter::new(ProbeEngine::default(), &Theme::notion());
        adapter.run("a");
        adapter.run("b");
        assert_eq!(adapter.engine.configures, 1);
        assert!(!adapter.is_dirty());

        adapter.set_theme(&Theme::sketch());
        assert!(adapter.is_dirty());
        adapter.run("c");
        assert_eq!(adapter.engine.configures, 2);
    }

    #[test]
    fn parse_failure_skips_render() {
        let engine = ProbeEngine {
            fail_parse: true,
            ..ProbeEngine::default()
        };
        let mut adapter = RenderEngineAdapter::new(engine, &Theme::notion());
        let outcome = adapter.run("flowchart TD\n  A -->");
        assert_eq!(
            outcome,
            RenderOutcome::Failed {
                message: "Parse error on line 1".to_string()
            }
        );
        assert_eq!(adapter.engine.parses, 1);
        assert_eq!(adapter.engine.renders, 0);
    }

    #[test]
    fn render_ids_are_never_reused() {
        let mut adapter = RenderEngineAdapter::new(ProbeEngine::default(), &Theme::notion());
        adapter.run("a");
        adapter.run("a");
        adapter.run("a");
        let ids = &adapter.engine.render_ids;
        assert_eq!(ids.len(), 3);
        assert!(ids.windows(2).all(|pair| pair[0] != pair[1]));
    }
}
