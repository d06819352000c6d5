use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{ManifestSource, REPEATED_SECTIONS};
use crate::error::{Error, Result};

type Entries = HashMap<String, String>;

#[derive(Debug, Clone)]
enum Section {
    Single(Entries),
    Repeated(Vec<Entries>),
}

/// A parsed manifest file
#[derive(Debug, Clone)]
pub struct Manifest {
    sections: HashMap<String, Section>,
    base_dir: PathBuf,
}

impl Manifest {
    /// Load a manifest; relative paths inside it resolve against its directory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut manifest = Self::parse(&text)?;
        manifest.base_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tracing::debug!(
            "loaded manifest {} ({} texture entries)",
            path.display(),
            manifest.count("texture")
        );
        Ok(manifest)
    }

    /// Parse manifest text with the default repeated sections
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with(text, REPEATED_SECTIONS)
    }

    /// Parse manifest text, treating `repeated` section names as repeatable
    pub fn parse_with(text: &str, repeated: &[&str]) -> Result<Self> {
        let mut sections: HashMap<String, Section> = HashMap::new();
        let mut current: Option<String> = None;

        for (number, raw) in text.lines().enumerate() {
            let line_no = number + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.len() >= 2 && line.starts_with('[') && line.ends_with(']') {
                let name = line[1..line.len() - 1].to_lowercase();
                let is_repeated = repeated.contains(&name.as_str());
                match sections.get_mut(&name) {
                    Some(Section::Repeated(list)) => list.push(Entries::new()),
                    Some(Section::Single(_)) => {}
                    None if is_repeated => {
                        sections.insert(name.clone(), Section::Repeated(vec![Entries::new()]));
                    }
                    None => {
                        sections.insert(name.clone(), Section::Single(Entries::new()));
                    }
                }
                current = Some(name);
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim().to_string();

            let Some(section_name) = current.as_deref() else {
                return Err(Error::ManifestParse {
                    line: line_no,
                    message: format!("'{key}' appears before any [section]"),
                });
            };
            let entries = match sections.get_mut(section_name) {
                Some(Section::Single(entries)) => entries,
                Some(Section::Repeated(list)) => match list.last_mut() {
                    Some(entries) => entries,
                    None => continue,
                },
                None => continue,
            };

            if entries.contains_key(&key) {
                return Err(Error::ManifestParse {
                    line: line_no,
                    message: format!("duplicate key '{key}' in [{section_name}]"),
                });
            }
            entries.insert(key, value);
        }

        Ok(Self {
            sections,
            base_dir: PathBuf::from("."),
        })
    }

    /// Directory the manifest was loaded from
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl ManifestSource for Manifest {
    fn value(&self, section: &str, key: &str) -> Option<&str> {
        match self.sections.get(&section.to_lowercase())? {
            Section::Single(entries) => entries.get(&key.to_lowercase()).map(String::as_str),
            Section::Repeated(_) => None,
        }
    }

    fn indexed_value(&self, section: &str, index: usize, key: &str) -> Option<&str> {
        match self.sections.get(&section.to_lowercase())? {
            Section::Repeated(list) => list
                .get(index)?
                .get(&key.to_lowercase())
                .map(String::as_str),
            Section::Single(_) => None,
        }
    }

    fn count(&self, section: &str) -> usize {
        match self.sections.get(&section.to_lowercase()) {
            Some(Section::Repeated(list)) => list.len(),
            _ => 0,
        }
    }
}
