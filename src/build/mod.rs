//! Compilation driver.
//!
//! Locates mojom sources through a [`SourceLoader`], compiles every module
//! at most once, and tracks the chain of in-progress imports so cycles are
//! caught before they recurse and failures in dependencies report how they
//! were reached.

pub mod loader;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::codegen::BackendKind;
use crate::diagnostics::{CompilerError, DataError, ImportCycleError};
use crate::model::{module_from_data, Module};
use crate::parser::parse_source;
use crate::translate::{translate, ImportResolver};

pub use loader::{FileSystemLoader, Located, MemoryLoader, SourceKind, SourceLoader};

// ===== Options =====

/// Settings for one `compile` run.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Extra directories searched for imports, in order
    pub search_paths: Vec<PathBuf>,
    pub backends: Vec<BackendKind>,
    pub output_dir: PathBuf,
    /// Template directory overriding the builtin templates
    pub template_dir: Option<PathBuf>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            search_paths: Vec::new(),
            backends: BackendKind::ALL.to_vec(),
            output_dir: PathBuf::from("."),
            template_dir: None,
        }
    }
}

// ===== Compilation =====

/// Owns the module memo table and the in-progress import stack.
pub struct Compilation {
    loader: Box<dyn SourceLoader>,
    modules: HashMap<String, Arc<Module>>,
    /// Root cause of every module that failed to compile
    failed: HashMap<String, CompilerError>,
    stack: Vec<String>,
}

impl Compilation {
    pub fn new(loader: Box<dyn SourceLoader>) -> Self {
        Compilation {
            loader,
            modules: HashMap::new(),
            failed: HashMap::new(),
            stack: Vec::new(),
        }
    }

    /// Compile a root file and, recursively, everything it imports.
    pub fn compile(&mut self, path: &str) -> Result<Arc<Module>, CompilerError> {
        let located = self
            .loader
            .locate(path, None)
            .ok_or_else(|| CompilerError::Io {
                path: path.to_string(),
                message: "file not found".to_string(),
            })?;
        self.compile_located(located)
    }

    /// Every module compiled so far, keyed by name.
    pub fn modules(&self) -> &HashMap<String, Arc<Module>> {
        &self.modules
    }

    fn compile_located(&mut self, located: Located) -> Result<Arc<Module>, CompilerError> {
        if let Some(module) = self.modules.get(&located.name) {
            log::trace!("{}: already compiled", located.name);
            return Ok(module.clone());
        }
        if let Some(cause) = self.failed.get(&located.name) {
            log::trace!("{}: already failed", located.name);
            return Err(match cause {
                CompilerError::ImportCycle(_) => cause.clone(),
                _ if self.stack.is_empty() => cause.clone(),
                _ => {
                    let mut stack = self.stack.clone();
                    stack.push(located.name);
                    CompilerError::Import {
                        stack,
                        source: Box::new(cause.clone()),
                    }
                }
            });
        }
        if self.stack.contains(&located.name) {
            let mut stack = self.stack.clone();
            stack.push(located.name);
            return Err(ImportCycleError { stack }.into());
        }

        self.stack.push(located.name.clone());
        let result = self.load(&located).map_err(|error| match error {
            e @ (CompilerError::Import { .. } | CompilerError::ImportCycle(_)) => e,
            e if self.stack.len() > 1 => CompilerError::Import {
                stack: self.stack.clone(),
                source: Box::new(e),
            },
            e => e,
        });
        self.stack.pop();

        let module = match result {
            Ok(module) => Arc::new(module),
            Err(e) => {
                self.failed.insert(located.name, e.root_cause().clone());
                return Err(e);
            }
        };
        self.modules.insert(located.name, module.clone());
        Ok(module)
    }

    fn load(&mut self, located: &Located) -> Result<Module, CompilerError> {
        let text = self.loader.read(located)?;
        match located.kind {
            SourceKind::Mojom => {
                let start = Instant::now();
                let tree = parse_source(&text, &located.name)?;
                log::debug!(
                    "parsed {} ({} imports, {} definitions) in {:.2?}",
                    located.name,
                    tree.imports.len(),
                    tree.definitions.len(),
                    start.elapsed()
                );
                translate(&tree, self)
            }
            SourceKind::Data => {
                let data_error = |error| CompilerError::Data {
                    name: located.name.clone(),
                    error,
                };
                let data: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
                    data_error(DataError::Json {
                        message: e.to_string(),
                    })
                })?;
                log::debug!("loaded module data for {}", located.name);
                module_from_data(&data).map_err(data_error)
            }
        }
    }
}

impl ImportResolver for Compilation {
    fn resolve(&mut self, import: &str, importer: &str) -> Result<Arc<Module>, CompilerError> {
        let located = self
            .loader
            .locate(import, Some(importer))
            .ok_or_else(|| CompilerError::ImportNotFound {
                import: import.to_string(),
                importer: importer.to_string(),
            })?;
        log::trace!("{}: '{}' resolved to {}", importer, import, located.name);
        self.compile_located(located)
    }
}

// ===== Multi-file build =====

pub struct BuildResult {
    /// Root modules that compiled, in input order
    pub modules: Vec<Arc<Module>>,
    pub errors: Vec<CompilerError>,
}

/// Compile every `.mojom` file matching the given glob patterns.
pub fn build(patterns: &[&str], options: &CompileOptions) -> BuildResult {
    let build_start = Instant::now();
    let mut errors = Vec::new();

    log::debug!("Phase 1: Resolving glob patterns: {:?}", patterns);
    let paths = resolve_globs(patterns, &mut errors);
    log::debug!("Phase 1 complete: found {} files", paths.len());

    log::debug!("Phase 2: Compiling {} root files", paths.len());
    let loader = FileSystemLoader::new(options.search_paths.clone());
    let mut compilation = Compilation::new(Box::new(loader));
    let mut modules = Vec::new();
    for path in &paths {
        let name = path.to_string_lossy();
        match compilation.compile(&name) {
            Ok(module) => modules.push(module),
            Err(e) => {
                log::debug!("  failed {}: {}", name, e.code());
                if errors.iter().any(|seen| seen.root_cause() == e.root_cause()) {
                    log::debug!("  {}: failure already reported", name);
                } else {
                    errors.push(e);
                }
            }
        }
    }

    log::debug!(
        "Build finished: {} modules, {} errors in {:.2?}",
        modules.len(),
        errors.len(),
        build_start.elapsed()
    );
    BuildResult { modules, errors }
}

/// Expand glob patterns into a sorted, deduplicated list of `.mojom` files.
/// A pattern that matches nothing is kept as a literal path so the missing
/// file is reported when it is compiled.
fn resolve_globs(patterns: &[&str], errors: &mut Vec<CompilerError>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for &pattern in patterns {
        match glob::glob(pattern) {
            Ok(entries) => {
                let before = paths.len();
                for entry in entries {
                    match entry {
                        Ok(path) => {
                            if path.extension().map_or(false, |ext| ext == "mojom") {
                                paths.push(path);
                            }
                        }
                        Err(e) => errors.push(CompilerError::Io {
                            path: e.path().to_string_lossy().into_owned(),
                            message: e.to_string(),
                        }),
                    }
                }
                if paths.len() == before {
                    paths.push(PathBuf::from(pattern));
                }
            }
            Err(e) => errors.push(CompilerError::Io {
                path: pattern.to_string(),
                message: format!("invalid glob pattern: {}", e),
            }),
        }
    }
    paths.sort();
    paths.dedup();
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compilation(files: &[(&str, &str)]) -> Compilation {
        let mut loader = MemoryLoader::new();
        for (name, text) in files {
            loader.add(name, text);
        }
        Compilation::new(Box::new(loader))
    }

    #[test]
    fn test_shared_import_compiled_once() {
        let mut c = compilation(&[
            ("base.mojom", "struct Point { int32 x; };"),
            ("a.mojom", "import \"base.mojom\";\nstruct A { Point p; };"),
            ("top.mojom", "import \"a.mojom\";\nimport \"base.mojom\";\nstruct T { A a; Point p; };"),
        ]);
        let top = c.compile("top.mojom").unwrap();
        assert_eq!(c.modules().len(), 3);
        assert!(Arc::ptr_eq(&top.imports[0].imports[0], &top.imports[1]));
    }

    #[test]
    fn test_import_cycle_stack() {
        let mut c = compilation(&[
            ("x.mojom", "import \"y.mojom\";"),
            ("y.mojom", "import \"x.mojom\";"),
        ]);
        let err = c.compile("x.mojom").unwrap_err();
        match &err {
            CompilerError::ImportCycle(cycle) => {
                assert_eq!(cycle.stack, vec!["x.mojom", "y.mojom", "x.mojom"]);
            }
            other => panic!("expected an import cycle, got {:?}", other),
        }
        assert_eq!(
            err.to_string(),
            "x.mojom: error: import cycle detected\n  x.mojom was imported by y.mojom\n  y.mojom was imported by x.mojom"
        );
    }

    #[test]
    fn test_dependency_error_carries_stack() {
        let mut c = compilation(&[
            ("x.mojom", "import \"y.mojom\";"),
            ("y.mojom", "import \"z.mojom\";"),
            ("z.mojom", "struct Z { Missing m; };"),
        ]);
        let err = c.compile("x.mojom").unwrap_err();
        assert!(matches!(&err, CompilerError::Import { stack, .. } if stack.len() == 3));
        assert_eq!(
            err.to_string(),
            "z.mojom:1: error: unresolved type 'Missing' in field 'm' of struct Z\n  z.mojom was imported by y.mojom\n  y.mojom was imported by x.mojom"
        );
        assert_eq!(err.code(), "Translate.UnresolvedType");
    }

    #[test]
    fn test_failed_import_is_not_compiled_again() {
        let mut c = compilation(&[
            ("broken.mojom", "struct B { Missing m; };"),
            ("a.mojom", "import \"broken.mojom\";"),
            ("b.mojom", "import \"broken.mojom\";"),
        ]);
        let first = c.compile("a.mojom").unwrap_err();
        let second = c.compile("b.mojom").unwrap_err();
        assert_eq!(first.root_cause(), second.root_cause());
        assert!(second.to_string().ends_with("\n  broken.mojom was imported by b.mojom"));
        assert!(c.modules().is_empty());

        // The cached failure is returned unwrapped when asked for directly.
        assert_eq!(&c.compile("broken.mojom").unwrap_err(), first.root_cause());
    }

    #[test]
    fn test_root_errors_are_not_wrapped() {
        let mut c = compilation(&[("x.mojom", "struct {")]);
        assert!(matches!(c.compile("x.mojom"), Err(CompilerError::Parse(_))));
    }

    #[test]
    fn test_default_options() {
        let options = CompileOptions::default();
        assert_eq!(options.backends.len(), 4);
        assert!(options.search_paths.is_empty());
        assert!(options.template_dir.is_none());
    }
}
