//! Configuration file support for `.docling-structure.toml`
//!
//! Files are looked up in:
//! - User home directory: `~/.docling-structure.toml` (user defaults)
//! - Project directory: `./.docling-structure.toml` (project defaults)
//! - Custom location via `--config` (replaces both)
//!
//! Precedence (highest to lowest):
//! 1. Command-line arguments (`--threshold`, `--row-tolerance`)
//! 2. Project config
//! 3. User config
//! 4. Built-in defaults

use anyhow::{Context, Result};
use docling_structure::{HeadingLevels, LabelTable, LayoutLabel, StructureConfigBuilder};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file in the home and project directories
pub const CONFIG_FILE_NAME: &str = ".docling-structure.toml";

/// Contents of a `.docling-structure.toml` file
///
/// ```toml
/// confidence_threshold = 0.4
/// row_tolerance = 15.0
/// close_default_section_on_page_change = true
/// class_labels = ["Caption", "Footnote", "Formula", "List-item", "Page-footer",
///                 "Page-header", "Picture", "Section-header", "Table", "Text", "Title"]
///
/// [heading_levels]
/// Title = 1
/// Section-header = 2
/// Page-header = 3
/// Caption = 4
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_threshold: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_tolerance: Option<f64>,

    /// Detector class names, index = class id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_labels: Option<Vec<String>>,

    /// Heading label name → level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_levels: Option<BTreeMap<String, u8>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_default_section_on_page_change: Option<bool>,
}

impl FileConfig {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load `~/.docling-structure.toml` and `./.docling-structure.toml`, merged
    ///
    /// Unreadable or malformed discovered files are skipped with a warning.
    pub fn discover() -> Self {
        let user = dirs::home_dir().and_then(|home| Self::load_optional(&home.join(CONFIG_FILE_NAME)));
        let project = Self::load_optional(&PathBuf::from(CONFIG_FILE_NAME));
        Self::merge(user, project)
    }

    fn load_optional(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Ignoring config {}: {e:#}", path.display());
                None
            }
        }
    }

    /// Merge configs: project values override user values
    pub fn merge(user: Option<Self>, project: Option<Self>) -> Self {
        let user = user.unwrap_or_default();
        let project = project.unwrap_or_default();
        Self {
            confidence_threshold: project.confidence_threshold.or(user.confidence_threshold),
            row_tolerance: project.row_tolerance.or(user.row_tolerance),
            class_labels: project.class_labels.or(user.class_labels),
            heading_levels: project.heading_levels.or(user.heading_levels),
            close_default_section_on_page_change: project
                .close_default_section_on_page_change
                .or(user.close_default_section_on_page_change),
        }
    }

    /// Apply the file values on top of the builder defaults
    pub fn apply(&self, mut builder: StructureConfigBuilder) -> Result<StructureConfigBuilder> {
        if let Some(threshold) = self.confidence_threshold {
            builder = builder.confidence_threshold(threshold);
        }
        if let Some(tolerance) = self.row_tolerance {
            builder = builder.row_tolerance(tolerance);
        }
        if let Some(names) = &self.class_labels {
            let table = LabelTable::from_names(names)
                .map_err(|e| anyhow::anyhow!("Invalid class_labels: {e}"))?;
            builder = builder.label_table(table);
        }
        if let Some(levels) = &self.heading_levels {
            let entries = levels
                .iter()
                .map(|(name, level)| {
                    name.parse::<LayoutLabel>()
                        .map(|label| (label, *level))
                        .map_err(|e| anyhow::anyhow!("Invalid heading_levels: {e}"))
                })
                .collect::<Result<Vec<_>>>()?;
            builder = builder.heading_levels(HeadingLevels::new(entries));
        }
        if let Some(close) = self.close_default_section_on_page_change {
            builder = builder.close_default_section_on_page_change(close);
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let config: FileConfig = toml::from_str(
            r#"
            confidence_threshold = 0.4
            row_tolerance = 12.5
            class_labels = ["Text", "Title"]

            [heading_levels]
            Title = 1
            Section-header = 2
            page_header = 3
            caption = 4
            "#,
        )
        .unwrap();

        let built = config.apply(StructureConfigBuilder::new()).unwrap().build().unwrap();
        assert_eq!(built.confidence_threshold, 0.4);
        assert_eq!(built.row_tolerance, 12.5);
        assert_eq!(built.label_table.resolve(1.0), LayoutLabel::Title);
        assert_eq!(built.heading_levels.level(LayoutLabel::PageHeader), Some(3));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<FileConfig>("threshold = 0.4").is_err());
    }

    #[test]
    fn test_project_overrides_user() {
        let user = FileConfig {
            confidence_threshold: Some(0.3),
            row_tolerance: Some(5.0),
            ..FileConfig::default()
        };
        let project = FileConfig {
            confidence_threshold: Some(0.7),
            ..FileConfig::default()
        };

        let merged = FileConfig::merge(Some(user), Some(project));
        assert_eq!(merged.confidence_threshold, Some(0.7));
        assert_eq!(merged.row_tolerance, Some(5.0));
        assert_eq!(FileConfig::merge(None, None), FileConfig::default());
    }

    #[test]
    fn test_bad_label_name() {
        let config = FileConfig {
            class_labels: Some(vec!["Text".to_string(), "Banner".to_string()]),
            ..FileConfig::default()
        };
        let err = config.apply(StructureConfigBuilder::new()).unwrap_err();
        assert!(err.to_string().contains("Banner"));
    }

    #[test]
    fn test_incomplete_heading_levels_fail_at_build() {
        let config = FileConfig {
            heading_levels: Some(BTreeMap::from([("Title".to_string(), 1)])),
            ..FileConfig::default()
        };
        let builder = config.apply(StructureConfigBuilder::new()).unwrap();
        assert!(builder.build().unwrap_err().is_config_error());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "row_tolerance = 30.0\n").unwrap();

        let config = FileConfig::load_from_file(&path).unwrap();
        assert_eq!(config.row_tolerance, Some(30.0));
        assert!(FileConfig::load_from_file(&dir.path().join("missing.toml")).is_err());
    }
}
