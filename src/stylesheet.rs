//! Color palettes for snapshots and loss charts
//!
//! Renderers refer to symbolic tokens (`asset-active`, `series-overlap`, ...)
//! which a palette resolves to concrete colors. Palettes load from TOML so a
//! frame sequence can be restyled without touching code.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading or parsing palettes
#[derive(Error, Debug)]
pub enum PaletteError {
    #[error("Failed to read palette file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse palette TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// A palette mapping symbolic colors to concrete values
#[derive(Debug, Clone)]
pub struct Palette {
    /// Optional name for the palette
    pub name: Option<String>,
    /// Color mappings: token name -> hex color
    pub colors: HashMap<String, String>,
}

/// TOML structure for deserializing palettes
#[derive(Deserialize)]
struct TomlPalette {
    metadata: Option<TomlMetadata>,
    #[serde(default)]
    colors: HashMap<String, String>,
}

#[derive(Deserialize)]
struct TomlMetadata {
    name: Option<String>,
}

const DEFAULT_COLORS: &[(&str, &str)] = &[
    ("background", "#ffffff"),
    ("boundary", "#333333"),
    ("boundary-fill", "#f5f5f5"),
    ("asset-active", "#ff9800"),
    ("asset-frozen", "#90a4ae"),
    ("label", "#1a1a1a"),
    ("axis", "#666666"),
    ("series-total", "#1a1a1a"),
    ("series-overlap", "#f44336"),
    ("series-existing", "#2196f3"),
    ("series-new", "#4caf50"),
    ("series-reachability", "#9c27b0"),
];

impl Palette {
    /// Load palette from TOML file
    pub fn from_file(path: &Path) -> Result<Self, PaletteError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load palette from TOML string
    pub fn from_str(content: &str) -> Result<Self, PaletteError> {
        let parsed: TomlPalette = toml::from_str(content)?;

        Ok(Palette {
            name: parsed.metadata.and_then(|m| m.name),
            colors: parsed.colors,
        })
    }

    /// Resolve a symbolic color token to a concrete value
    ///
    /// Returns None if the token is not defined in this palette.
    pub fn resolve(&self, token: &str) -> Option<&str> {
        self.colors.get(token).map(|s| s.as_str())
    }

    /// Resolve a token, falling back to the built-in palette, then to a
    /// category default
    pub fn resolve_or_default(&self, token: &str) -> String {
        if let Some(color) = self.resolve(token) {
            return color.to_string();
        }

        if let Some((_, color)) = DEFAULT_COLORS.iter().find(|(name, _)| *name == token) {
            return color.to_string();
        }

        if token.starts_with("series") {
            return "#666666".to_string();
        }
        if token.starts_with("asset") {
            return "#90a4ae".to_string();
        }
        "#333333".to_string()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            name: None,
            colors: DEFAULT_COLORS
                .iter()
                .map(|(token, color)| (token.to_string(), color.to_string()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> Palette {
        Palette {
            name: None,
            colors: HashMap::new(),
        }
    }

    #[test]
    fn test_default_palette() {
        let palette = Palette::default();
        assert_eq!(palette.resolve("asset-active"), Some("#ff9800"));
        assert_eq!(palette.resolve("series-overlap"), Some("#f44336"));
        assert_eq!(palette.resolve("nonexistent"), None);
    }

    #[test]
    fn test_resolve_or_default_fallback() {
        assert_eq!(empty().resolve_or_default("boundary"), "#333333");
        assert_eq!(empty().resolve_or_default("asset-frozen"), "#90a4ae");
    }

    #[test]
    fn test_resolve_or_default_category_fallback() {
        assert_eq!(empty().resolve_or_default("series-custom"), "#666666");
        assert_eq!(empty().resolve_or_default("asset-custom"), "#90a4ae");
        assert_eq!(empty().resolve_or_default("whatever"), "#333333");
    }

    #[test]
    fn test_parse_toml_with_metadata() {
        let toml_str = r##"
[metadata]
name = "Blueprint"

[colors]
asset-active = "#000000"
"##;
        let palette = Palette::from_str(toml_str).expect("Should parse");
        assert_eq!(palette.name, Some("Blueprint".to_string()));
        assert_eq!(palette.resolve("asset-active"), Some("#000000"));
        assert_eq!(palette.resolve_or_default("asset-frozen"), "#90a4ae");
    }

    #[test]
    fn test_invalid_toml_error() {
        let result = Palette::from_str("this is not valid toml {{{{");
        assert!(matches!(result, Err(PaletteError::ParseError(_))));
    }
}
