use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use super::error::ModelLoadError;

/// Ordered labels; position `i` names the classifier's `i`-th logit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    labels: Vec<String>,
}

/// The part of a HuggingFace `config.json` that names the output labels.
#[derive(Debug, Deserialize)]
struct ModelConfig {
    #[serde(default)]
    id2label: Option<HashMap<String, String>>,
}

impl CategoryTable {
    /// Validates and wraps a label list.
    ///
    /// Labels must be non-empty and unique, and the table itself must not be empty.
    pub fn new(labels: Vec<impl Into<String>>) -> Result<Self, ModelLoadError> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(ModelLoadError::InvalidCategories("Category table cannot be empty".into()));
        }
        if let Some(pos) = labels.iter().position(|l| l.trim().is_empty()) {
            return Err(ModelLoadError::InvalidCategories(format!(
                "Category {} has an empty label",
                pos
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = labels.iter().find(|l| !seen.insert(l.as_str())) {
            return Err(ModelLoadError::InvalidCategories(format!("Duplicate category '{}'", dup)));
        }
        Ok(Self { labels })
    }

    /// Parses either a JSON array of strings or one label per line.
    pub fn parse(contents: &str) -> Result<Self, ModelLoadError> {
        let trimmed = contents.trim_start();
        if trimmed.starts_with('[') {
            let labels: Vec<String> = serde_json::from_str(trimmed)
                .map_err(|e| {
                    ModelLoadError::InvalidCategories(format!("Malformed category list: {}", e))
                })?;
            return Self::new(labels);
        }
        Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>(),
        )
    }

    pub fn from_file(path: &Path) -> Result<Self, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::MissingFile(path.to_path_buf()));
        }
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Reads the `id2label` map of a HuggingFace `config.json`.
    pub fn from_model_config(path: &Path) -> Result<Self, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::MissingFile(path.to_path_buf()));
        }
        let config: ModelConfig = serde_json::from_str(&fs::read_to_string(path)?)
            .map_err(|e| {
                ModelLoadError::InvalidCategories(format!("Malformed {:?}: {}", path, e))
            })?;
        let id2label = config.id2label.ok_or_else(|| {
            ModelLoadError::InvalidCategories(format!("{:?} has no id2label map", path))
        })?;

        let mut indexed = id2label
            .into_iter()
            .map(|(id, label)| {
                id.parse::<usize>()
                    .map(|id| (id, label))
                    .map_err(|_| {
                        ModelLoadError::InvalidCategories(format!(
                            "Non-numeric label id '{}'",
                            id
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        indexed.sort_by_key(|(id, _)| *id);

        if let Some((pos, (id, _))) = indexed.iter().enumerate().find(|(pos, (id, _))| pos != id) {
            return Err(ModelLoadError::InvalidCategories(format!(
                "Label ids are not contiguous: expected {}, found {}",
                pos, id
            )));
        }

        Self::new(indexed.into_iter().map(|(_, label)| label).collect::<Vec<_>>())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_table() {
        assert!(CategoryTable::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_rejects_blank_and_duplicate_labels() {
        assert!(matches!(
            CategoryTable::new(vec!["science", " "]),
            Err(ModelLoadError::InvalidCategories(_))
        ));
        assert!(matches!(
            CategoryTable::new(vec!["science", "sports", "science"]),
            Err(ModelLoadError::InvalidCategories(_))
        ));
    }

    #[test]
    fn test_parse_json_array() {
        let table = CategoryTable::parse(r#"["World", "Sports", "Business", "Sci/Tech"]"#).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.get(3), Some("Sci/Tech"));
    }

    #[test]
    fn test_parse_line_list() {
        let table = CategoryTable::parse("World\n\n  Sports \nBusiness\n").unwrap();
        assert_eq!(table.labels(), &["World", "Sports", "Business"]);
    }

    #[test]
    fn test_model_config_orders_by_id() {
        let dir = std::env::temp_dir().join("topiclass-test-id2label");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        fs::write(
            &path,
            r#"{"architectures": ["BertForSequenceClassification"],
                "id2label": {"2": "Business", "0": "World", "10": "Travel", "1": "Sports",
                             "3": "a", "4": "b", "5": "c", "6": "d",
                             "7": "e", "8": "f", "9": "g"}}"#,
        )
        .unwrap();

        let table = CategoryTable::from_model_config(&path).unwrap();
        assert_eq!(table.len(), 11);
        assert_eq!(table.get(0), Some("World"));
        assert_eq!(table.get(2), Some("Business"));
        assert_eq!(table.get(10), Some("Travel"));
    }

    #[test]
    fn test_model_config_rejects_gaps() {
        let dir = std::env::temp_dir().join("topiclass-test-id2label-gap");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        fs::write(&path, r#"{"id2label": {"0": "World", "2": "Business"}}"#).unwrap();

        assert!(matches!(
            CategoryTable::from_model_config(&path),
            Err(ModelLoadError::InvalidCategories(_))
        ));
    }
}
