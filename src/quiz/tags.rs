use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::quiz::error::PackError;
use crate::quiz::scalar_to_string;

/// Tag code to the label shown in the weakness report.
#[derive(Debug, Clone, Default)]
pub struct TagsMap {
    labels: HashMap<String, String>,
}

impl TagsMap {
    pub fn new(labels: HashMap<String, String>) -> Self {
        Self { labels }
    }

    /// A missing file is an empty map.
    pub fn load(path: &Path) -> Result<Self, PackError> {
        if !path.exists() {
            log::info!("No tags map at {}, showing raw tags", path.display());
            return Ok(Self::default());
        }
        let body = fs::read_to_string(path).map_err(|source| PackError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if body.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: Option<HashMap<serde_yaml::Value, serde_yaml::Value>> =
            serde_yaml::from_str(&body).map_err(|source| PackError::Yaml {
                path: path.to_path_buf(),
                source,
            })?;

        let labels = raw
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(k, v)| Some((scalar_to_string(k)?, scalar_to_string(v)?)))
            .collect();
        Ok(Self { labels })
    }

    pub fn label<'a>(&'a self, tag: &'a str) -> &'a str {
        self.labels.get(tag).map(String::as_str).unwrap_or(tag)
    }

    /// Comma separated labels without duplicates, `—` for no tags.
    pub fn render(&self, tags: &[String]) -> String {
        if tags.is_empty() {
            return "—".to_string();
        }
        let mut seen = HashSet::new();
        tags.iter()
            .map(|tag| self.label(tag))
            .filter(|label| seen.insert(*label))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn render_maps_dedups_and_keeps_order() {
        let map = TagsMap::new(HashMap::from([
            ("sdlc".to_string(), "Жизненный цикл".to_string()),
            ("stlc".to_string(), "Жизненный цикл".to_string()),
            ("api".to_string(), "API".to_string()),
        ]));
        let tags = vec![
            "api".to_string(),
            "sdlc".to_string(),
            "unknown".to_string(),
            "stlc".to_string(),
        ];
        assert_eq!(map.render(&tags), "API, Жизненный цикл, unknown");
    }

    #[test]
    fn render_without_tags_is_dash() {
        assert_eq!(TagsMap::default().render(&[]), "—");
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let map = TagsMap::load(&dir.path().join("tags_map.yaml")).unwrap();
        assert_eq!(map.label("api"), "api");
    }

    #[test]
    fn load_stringifies_keys_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tags_map.yaml");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"api: API testing\n42: 100\n").unwrap();

        let map = TagsMap::load(&path).unwrap();
        assert_eq!(map.label("api"), "API testing");
        assert_eq!(map.label("42"), "100");
    }

    #[test]
    fn load_empty_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tags_map.yaml");
        File::create(&path).unwrap();
        assert!(TagsMap::load(&path).unwrap().labels.is_empty());
    }
}
