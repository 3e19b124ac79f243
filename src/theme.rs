use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Identifier into the fixed theme catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeId {
    Notion,
    Sketch,
}

impl ThemeId {
    pub const ALL: [ThemeId; 2] = [ThemeId::Notion, ThemeId::Sketch];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeId::Notion => "notion",
            ThemeId::Sketch => "sketch",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "notion" => Some(ThemeId::Notion),
            "sketch" => Some(ThemeId::Sketch),
            _ => None,
        }
    }
}

impl std::fmt::Display for ThemeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable theme record: engine-facing options plus display tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub id: ThemeId,
    pub name: String,
    /// Base palette name understood by the engine.
    pub engine_theme: String,
    /// Optional rendering style ("handDrawn" for the sketch theme).
    pub look: Option<String>,
    pub font_family: String,
    /// Engine theme variables, carried opaque as JSON.
    pub theme_variables: Value,
    pub background: String,
}

impl Theme {
    pub fn notion() -> Self {
        Self {
            id: ThemeId::Notion,
            name: "Notion Minimalist".to_string(),
            engine_theme: "neutral".to_string(),
            look: None,
            font_family: "Inter, sans-serif".to_string(),
            theme_variables: json!({
                "primaryColor": "#ffffff",
                "primaryTextColor": "#000000",
                "lineColor": "#333333",
                "mainBkg": "#ffffff",
                "textColor": "#000000",
                "fontFamily": "Inter, sans-serif",
            }),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn sketch() -> Self {
        Self {
            id: ThemeId::Sketch,
            name: "Sketch / Hand-Drawn".to_string(),
            engine_theme: "neutral".to_string(),
            look: Some("handDrawn".to_string()),
            font_family: "\"Comic Sans MS\", \"Chalkboard SE\", sans-serif".to_string(),
            theme_variables: json!({
                "lineColor": "#555555",
                "mainBkg": "#ffffff",
                "nodeBorder": "#333333",
                "fontFamily": "\"Comic Sans MS\", \"Chalkboard SE\", sans-serif",
            }),
            background: "#FDFBF7".to_string(),
        }
    }

    pub fn by_id(id: ThemeId) -> Self {
        match id {
            ThemeId::Notion => Self::notion(),
            ThemeId::Sketch => Self::sketch(),
        }
    }

    pub fn catalog() -> Vec<Self> {
        ThemeId::ALL.iter().map(|id| Self::by_id(*id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_all_ids() {
        let catalog = Theme::catalog();
        assert_eq!(catalog.len(), ThemeId::ALL.len());
        for (theme, id) in catalog.iter().zip(ThemeId::ALL) {
            assert_eq!(theme.id, id);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(ThemeId::parse("Notion"), Some(ThemeId::Notion));
        assert_eq!(ThemeId::parse(" SKETCH "), Some(ThemeId::Sketch));
        assert_eq!(ThemeId::parse("dracula"), None);
    }

    #[test]
    fn sketch_uses_hand_drawn_look() {
        let theme = Theme::sketch();
        assert_eq!(theme.look.as_deref(), Some("handDrawn"));
    }
}
