//! Where module sources come from.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::diagnostics::CompilerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `.mojom` source text
    Mojom,
    /// Prebuilt module data (`<name>.json`)
    Data,
}

/// A source found by a loader. `name` identifies the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub name: String,
    pub kind: SourceKind,
}

pub trait SourceLoader {
    /// Find `import`, first next to `importer` and then wherever the loader
    /// looks. Root files are located with `importer = None`.
    fn locate(&self, import: &str, importer: Option<&str>) -> Option<Located>;

    fn read(&self, located: &Located) -> Result<String, CompilerError>;
}

fn data_name(name: &str) -> String {
    format!("{}.json", name)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Candidate names for `import`, in lookup order.
fn candidates(import: &str, importer: Option<&str>, search_paths: &[PathBuf]) -> Vec<String> {
    let mut names = Vec::new();
    match importer {
        Some(importer) => {
            let dir = Path::new(importer).parent().unwrap_or_else(|| Path::new(""));
            names.push(path_string(&dir.join(import)));
        }
        None => names.push(import.to_string()),
    }
    names.extend(search_paths.iter().map(|p| path_string(&p.join(import))));
    names.dedup();
    names
}

// ===== File system =====

/// Loads from disk: next to the importing file, then each search path.
#[derive(Debug, Clone, Default)]
pub struct FileSystemLoader {
    search_paths: Vec<PathBuf>,
}

impl FileSystemLoader {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        FileSystemLoader { search_paths }
    }
}

impl SourceLoader for FileSystemLoader {
    fn locate(&self, import: &str, importer: Option<&str>) -> Option<Located> {
        candidates(import, importer, &self.search_paths)
            .into_iter()
            .find_map(|name| {
                if Path::new(&name).is_file() {
                    Some(Located {
                        name,
                        kind: SourceKind::Mojom,
                    })
                } else if Path::new(&data_name(&name)).is_file() {
                    Some(Located {
                        name,
                        kind: SourceKind::Data,
                    })
                } else {
                    None
                }
            })
    }

    fn read(&self, located: &Located) -> Result<String, CompilerError> {
        let path = match located.kind {
            SourceKind::Mojom => located.name.clone(),
            SourceKind::Data => data_name(&located.name),
        };
        log::trace!("reading {}", path);
        std::fs::read_to_string(&path).map_err(|e| CompilerError::Io {
            path,
            message: e.to_string(),
        })
    }
}

// ===== In memory =====

/// Sources held in memory, keyed by module name. Used by tests and tools
/// that already have the text at hand.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: &str, text: &str) -> Self {
        self.add(name, text);
        self
    }

    pub fn add(&mut self, name: &str, text: &str) {
        self.files.insert(name.to_string(), text.to_string());
    }
}

impl SourceLoader for MemoryLoader {
    fn locate(&self, import: &str, importer: Option<&str>) -> Option<Located> {
        let mut names = candidates(import, importer, &[]);
        if importer.is_some() {
            names.push(import.to_string());
        }
        names.into_iter().find_map(|name| {
            if self.files.contains_key(&name) {
                Some(Located {
                    name,
                    kind: SourceKind::Mojom,
                })
            } else if self.files.contains_key(&data_name(&name)) {
                Some(Located {
                    name,
                    kind: SourceKind::Data,
                })
            } else {
                None
            }
        })
    }

    fn read(&self, located: &Located) -> Result<String, CompilerError> {
        let key = match located.kind {
            SourceKind::Mojom => located.name.clone(),
            SourceKind::Data => data_name(&located.name),
        };
        self.files.get(&key).cloned().ok_or_else(|| CompilerError::Io {
            path: key,
            message: "no such file".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_prefer_importer_directory() {
        let names = candidates("a.mojom", Some("sub/b.mojom"), &[PathBuf::from("inc")]);
        assert_eq!(names, vec!["sub/a.mojom", "inc/a.mojom"]);
        assert_eq!(candidates("b.mojom", None, &[]), vec!["b.mojom"]);
    }

    #[test]
    fn test_memory_loader_finds_data() {
        let loader = MemoryLoader::new()
            .with_file("sub/b.mojom", "")
            .with_file("base.mojom.json", "{}");
        let found = loader.locate("base.mojom", Some("sub/b.mojom")).unwrap();
        assert_eq!(found.name, "base.mojom");
        assert_eq!(found.kind, SourceKind::Data);
        assert_eq!(loader.read(&found).unwrap(), "{}");
        assert!(loader.locate("missing.mojom", None).is_none());
    }

    #[test]
    fn test_file_system_loader_search_paths() {
        let dir = tempfile::tempdir().unwrap();
        let inc = dir.path().join("inc");
        std::fs::create_dir(&inc).unwrap();
        std::fs::write(inc.join("a.mojom"), "struct A {};").unwrap();
        let importer = path_string(&dir.path().join("b.mojom"));

        let loader = FileSystemLoader::new(vec![inc.clone()]);
        let found = loader.locate("a.mojom", Some(&importer)).unwrap();
        assert_eq!(found.name, path_string(&inc.join("a.mojom")));
        assert_eq!(loader.read(&found).unwrap(), "struct A {};");
    }
}
