//! Backend-agnostic generation driver.
//!
//! A [`Backend`] names the artifacts it wants for a module, the template
//! that renders each one, and the filters and globals those templates use.
//! The driver hands every template the same parameters:
//! `{module: <module data>, globals: <backend globals>, item: <artifact item>}`.

pub mod common;
pub mod cpp;
pub mod java;
pub mod js;
pub mod python;
pub mod render;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value as Json};

use crate::diagnostics::{CompilerError, GenerationError};
use crate::model::{module_to_data, DeclRef, Kind, KindTable, Module};

pub use render::{BuiltinTemplates, Filter, Filters, Renderer, TemplateDir, TemplateSource};

/// Output path → rendered text.
pub type GeneratedFiles = BTreeMap<String, String>;

/// One output file a backend wants for a module.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub output_path: String,
    pub template: String,
    /// Exposed to the template as `item`; `null` for whole-module artifacts
    pub item: Json,
}

impl Artifact {
    pub fn new(output_path: impl Into<String>, template: impl Into<String>) -> Self {
        Artifact {
            output_path: output_path.into(),
            template: template.into(),
            item: Json::Null,
        }
    }

    pub fn with_item(mut self, item: Json) -> Self {
        self.item = item;
        self
    }
}

pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    fn artifacts(&self, module: &Module) -> Vec<Artifact>;

    /// Filters on top of the shared naming filters.
    fn filters(&self, module: &Module) -> Filters;

    fn globals(&self, module: &Module) -> Json;

    /// Templates included by other templates as partials.
    fn partials(&self) -> &'static [&'static str] {
        &[]
    }
}

// ===== Backend selection =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum BackendKind {
    Cpp,
    Js,
    Python,
    Java,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Cpp,
        BackendKind::Js,
        BackendKind::Python,
        BackendKind::Java,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Cpp => "cpp",
            BackendKind::Js => "js",
            BackendKind::Python => "python",
            BackendKind::Java => "java",
        }
    }

    pub fn backend(self) -> Box<dyn Backend> {
        match self {
            BackendKind::Cpp => Box::new(cpp::CppBackend),
            BackendKind::Js => Box::new(js::JsBackend),
            BackendKind::Python => Box::new(python::PythonBackend),
            BackendKind::Java => Box::new(java::JavaBackend),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ===== Driver =====

/// Render every artifact `backend` declares for `module`.
pub fn generate(
    module: &Module,
    backend: &dyn Backend,
    templates: &dyn TemplateSource,
) -> Result<GeneratedFiles, GenerationError> {
    let start = Instant::now();
    let mut filters = shared_filters();
    filters.extend(backend.filters(module));
    let mut renderer = Renderer::new(backend.name(), templates, filters);
    for partial in backend.partials() {
        renderer.register(partial)?;
    }

    let data = module_to_data(module);
    let globals = backend.globals(module);
    let mut files = GeneratedFiles::new();
    for artifact in backend.artifacts(module) {
        let params = json!({
            "module": data,
            "globals": globals,
            "item": artifact.item,
        });
        let text = renderer.render(&artifact.template, &params)?;
        log::trace!("{}: rendered {} from {}", backend.name(), artifact.output_path, artifact.template);
        files.insert(artifact.output_path, text);
    }

    log::debug!(
        "{}: generated {} files for {} in {:.2?}",
        backend.name(),
        files.len(),
        module.name,
        start.elapsed()
    );
    Ok(files)
}

/// Run each requested backend on its own thread. Results come back in the
/// order the backends were requested; one backend failing does not affect
/// the others.
pub fn generate_all(
    module: &Module,
    backends: &[BackendKind],
    templates: &dyn TemplateSource,
) -> Vec<(BackendKind, Result<GeneratedFiles, GenerationError>)> {
    std::thread::scope(|s| {
        let handles: Vec<_> = backends
            .iter()
            .map(|&kind| {
                let handle = s.spawn(move || generate(module, kind.backend().as_ref(), templates));
                (kind, handle)
            })
            .collect();
        handles
            .into_iter()
            .map(|(kind, handle)| {
                let result = handle.join().unwrap_or_else(|_| {
                    Err(GenerationError::Render {
                        backend: kind.name().to_string(),
                        path: module.name.clone(),
                        message: "backend panicked".to_string(),
                    })
                });
                (kind, result)
            })
            .collect()
    })
}

/// True when `name` is a relative path that stays below its base.
fn is_contained(name: &Path) -> bool {
    name.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Resolve `.` and `..` lexically, against `cwd` for relative paths.
fn normalize(path: &Path, cwd: &Path) -> PathBuf {
    let mut normal = PathBuf::new();
    for component in cwd.join(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normal.pop();
            }
            other => normal.push(other),
        }
    }
    normal
}

/// Make the output paths of `module`'s artifacts relative. Artifacts sit
/// under the module's directory; when that directory is absolute or leaves
/// its base through `..`, it is re-rooted at the longest of `bases` (and
/// `cwd`) that contains it, or dropped when none does.
pub fn relocate(files: GeneratedFiles, module_name: &str, cwd: &Path, bases: &[PathBuf]) -> GeneratedFiles {
    let dir = common::module_dir(module_name);
    if is_contained(Path::new(&dir)) {
        return files;
    }
    let absolute = normalize(Path::new(&dir), cwd);
    let relative = std::iter::once(cwd.to_path_buf())
        .chain(bases.iter().map(|base| normalize(base, cwd)))
        .filter_map(|base| absolute.strip_prefix(&base).ok().map(Path::to_path_buf))
        .min_by_key(|rest| rest.components().count())
        .unwrap_or_default();
    log::debug!("{}: writing outputs under '{}'", module_name, relative.display());

    files
        .into_iter()
        .map(|(name, text)| {
            let rest = name.strip_prefix(dir.as_str()).unwrap_or(&name);
            (relative.join(rest).to_string_lossy().into_owned(), text)
        })
        .collect()
}

/// Write generated files under `output_dir`. Every file is first staged in
/// a temporary file beside its destination; the staged files are renamed
/// into place only once all of them were written. Paths that would land
/// outside `output_dir` are refused before anything is written.
pub fn write_files(files: &GeneratedFiles, output_dir: &Path) -> Result<Vec<PathBuf>, CompilerError> {
    use std::io::Write;

    let io_error = |path: &Path, e: &dyn fmt::Display| CompilerError::Io {
        path: path.to_string_lossy().into_owned(),
        message: e.to_string(),
    };

    if let Some(name) = files.keys().find(|name| !is_contained(Path::new(name))) {
        return Err(io_error(
            Path::new(name),
            &"output path is outside the output directory",
        ));
    }

    let mut staged = Vec::with_capacity(files.len());
    for (name, text) in files {
        let path = output_dir.join(name);
        let dir = path.parent().unwrap_or(output_dir);
        std::fs::create_dir_all(dir).map_err(|e| io_error(dir, &e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| io_error(dir, &e))?;
        tmp.write_all(text.as_bytes()).map_err(|e| io_error(&path, &e))?;
        staged.push((tmp, path));
    }

    let mut written: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for (tmp, path) in staged {
        if let Err(e) = tmp.persist(&path) {
            for done in &written {
                let _ = std::fs::remove_file(done);
            }
            return Err(io_error(&path, &e.error));
        }
        log::info!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

// ===== Shared filters =====

fn shared_filters() -> Filters {
    let mut filters = Filters::new();
    filters.insert("lower_first".into(), render::string_filter(common::lower_first));
    filters.insert("upper_camel".into(), render::string_filter(common::upper_camel));
    filters.insert("snake_case".into(), render::string_filter(common::snake_case));
    filters.insert("constant_case".into(), render::string_filter(common::constant_case));
    filters.insert("quote".into(), render::string_filter(common::quote));
    filters.insert(
        "present".into(),
        Arc::new(|args: &[Json]| -> Result<Json, String> {
            Ok(Json::Bool(args.first().map_or(false, |v| !v.is_null())))
        }),
    );
    filters.insert("by_ordinal".into(), Arc::new(by_ordinal));
    filters
}

/// Members sorted by their `ordinal` key.
fn by_ordinal(args: &[Json]) -> Result<Json, String> {
    let items = match args.first() {
        Some(Json::Array(items)) => items,
        Some(Json::Null) => return Ok(Json::Array(Vec::new())),
        _ => return Err("expected an array of members".to_string()),
    };
    let mut sorted = items.clone();
    sorted.sort_by_key(|item| item.get("ordinal").and_then(Json::as_u64).unwrap_or(u64::MAX));
    Ok(Json::Array(sorted))
}

/// A value in module data, as kind-aware literal filters see it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Literal<'a> {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(&'a str),
    Enum { decl: DeclRef, label: &'a str },
    Default,
}

pub(crate) fn literal<'a>(value: &'a Json, table: &KindTable) -> Result<Literal<'a>, String> {
    match value {
        Json::Bool(b) => Ok(Literal::Bool(*b)),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Ok(Literal::Int(i)),
            None => n
                .as_f64()
                .map(Literal::Float)
                .ok_or_else(|| format!("unrepresentable number {}", n)),
        },
        Json::String(s) => Ok(Literal::String(s)),
        Json::Object(obj) if obj.contains_key("default") => Ok(Literal::Default),
        Json::Object(obj) => {
            let spec = obj.get("enum").and_then(Json::as_str).ok_or("malformed value")?;
            let label = obj.get("label").and_then(Json::as_str).ok_or("malformed value")?;
            match table.parse(spec).map_err(|e| e.to_string())? {
                Kind::Enum(decl) => Ok(Literal::Enum { decl, label }),
                other => Err(format!("'{}' is not an enum", other)),
            }
        }
        other => Err(format!("not a value: {}", other)),
    }
}

/// Filter over the kind spec in the first argument.
pub(crate) fn kind_filter(
    table: Arc<KindTable>,
    f: impl Fn(&Kind) -> String + Send + Sync + 'static,
) -> Filter {
    Arc::new(move |args: &[Json]| -> Result<Json, String> {
        let kind = table.parse(render::first_str(args)?).map_err(|e| e.to_string())?;
        Ok(Json::String(f(&kind)))
    })
}

/// Filter over `(value, kind spec)`. A `null` value reaches `f` as `None`.
pub(crate) fn value_filter(
    table: Arc<KindTable>,
    f: impl Fn(Option<Literal<'_>>, &Kind) -> Result<String, String> + Send + Sync + 'static,
) -> Filter {
    Arc::new(move |args: &[Json]| -> Result<Json, String> {
        let spec = match args.get(1) {
            Some(Json::String(spec)) => spec,
            _ => return Err("expected (value, kind) arguments".to_string()),
        };
        let kind = table.parse(spec).map_err(|e| e.to_string())?;
        let value = match args.first() {
            None | Some(Json::Null) => None,
            Some(v) => Some(literal(v, &table)?),
        };
        Ok(Json::String(f(value, &kind)?))
    })
}

/// Float literal text that always reads back as a float.
pub(crate) fn float_text(x: f64) -> Result<String, String> {
    if !x.is_finite() {
        return Err(format!("{} has no literal form", x));
    }
    let text = format!("{:?}", x);
    if text.contains(|c| matches!(c, '.' | 'e' | 'E')) {
        Ok(text)
    } else {
        Ok(format!("{}.0", text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Field, Struct};

    fn module() -> Module {
        let mut m = Module::new("sub/test.mojom", "test");
        let mut s = Struct::new("Point", &m.name);
        s.fields.push(Field::new("y", Kind::Int32, Some(1)));
        s.fields.push(Field::new("x", Kind::Int32, Some(0)));
        m.structs.push(s);
        m
    }

    #[test]
    fn test_by_ordinal() {
        let fields = json!([{"name": "y", "ordinal": 1}, {"name": "x", "ordinal": 0}]);
        let sorted = by_ordinal(&[fields]).unwrap();
        assert_eq!(sorted[0]["name"], "x");
        assert_eq!(sorted[1]["name"], "y");
        assert!(by_ordinal(&[json!("nope")]).is_err());
    }

    #[test]
    fn test_literal_decoding() {
        let mut m = module();
        m.enums.push(crate::model::Enum::new("Color", &m.name));
        let table = KindTable::for_module(&m);
        assert_eq!(literal(&json!(3), &table), Ok(Literal::Int(3)));
        assert_eq!(literal(&json!(1.5), &table), Ok(Literal::Float(1.5)));
        assert_eq!(literal(&json!({"default": true}), &table), Ok(Literal::Default));
        assert_eq!(
            literal(&json!({"enum": "x:test.Color", "label": "RED", "value": 0}), &table),
            Ok(Literal::Enum {
                decl: DeclRef::new("sub/test.mojom", "test", "Color"),
                label: "RED"
            })
        );
        assert!(literal(&json!({"enum": "x:test.Point", "label": "A", "value": 0}), &table).is_err());
    }

    #[test]
    fn test_float_text() {
        assert_eq!(float_text(2.0).unwrap(), "2.0");
        assert_eq!(float_text(0.25).unwrap(), "0.25");
        assert_eq!(float_text(1e300).unwrap(), "1e300");
        assert!(float_text(f64::INFINITY).is_err());
    }

    #[test]
    fn test_backend_kind_names() {
        let names: Vec<&str> = BackendKind::ALL.iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["cpp", "js", "python", "java"]);
        for kind in BackendKind::ALL {
            assert_eq!(kind.backend().name(), kind.name());
        }
    }

    #[test]
    fn test_generate_all_isolates_failures() {
        struct OnlyCpp;
        impl TemplateSource for OnlyCpp {
            fn load(&self, path: &str) -> std::io::Result<String> {
                if path.starts_with("cpp/") {
                    BuiltinTemplates.load(path)
                } else {
                    Err(std::io::Error::new(std::io::ErrorKind::NotFound, path.to_string()))
                }
            }
        }
        let m = module();
        let results = generate_all(&m, &[BackendKind::Cpp, BackendKind::Js], &OnlyCpp);
        assert_eq!(results[0].0, BackendKind::Cpp);
        let cpp = results[0].1.as_ref().unwrap();
        assert!(cpp.contains_key("sub/test.mojom.h"));
        let js_err = results[1].1.as_ref().unwrap_err();
        assert_eq!(js_err.code(), "MissingTemplate");
        assert_eq!(js_err.backend(), "js");
    }

    #[test]
    fn test_write_files_refuses_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        for name in ["../escape.txt", "/tmp/absolute.txt"] {
            let mut files = GeneratedFiles::new();
            files.insert("inside.txt".to_string(), "kept out".to_string());
            files.insert(name.to_string(), "nope".to_string());
            let err = write_files(&files, &out).unwrap_err();
            assert_eq!(err.code(), "Io");
            assert!(err.to_string().contains("outside the output directory"), "{}", err);
        }
        assert!(!out.join("inside.txt").exists());
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn test_relocate_outputs() {
        let cwd = Path::new("/work/run");
        let files = |names: &[&str]| -> GeneratedFiles {
            names.iter().map(|n| (n.to_string(), String::new())).collect()
        };
        let keys = |files: GeneratedFiles| -> Vec<String> { files.into_keys().collect() };

        // Relative names below the working directory are left alone.
        let kept = relocate(files(&["sub/a.mojom.js"]), "sub/a.mojom", cwd, &[]);
        assert_eq!(keys(kept), vec!["sub/a.mojom.js"]);

        // Absolute names are re-rooted at the longest containing base.
        let bases = [PathBuf::from("/src"), PathBuf::from("/src/idl")];
        let moved = relocate(
            files(&["/src/idl/net/a.mojom.h", "/src/idl/net/org/x/A.java"]),
            "/src/idl/net/a.mojom",
            cwd,
            &bases,
        );
        assert_eq!(keys(moved), vec!["net/a.mojom.h", "net/org/x/A.java"]);

        let under_cwd = relocate(files(&["/work/run/a.mojom.js"]), "/work/run/a.mojom", cwd, &[]);
        assert_eq!(keys(under_cwd), vec!["a.mojom.js"]);

        // Outside every base only the file name is kept.
        let climbed = relocate(files(&["../other/b.mojom.js"]), "../other/b.mojom", cwd, &[]);
        assert_eq!(keys(climbed), vec!["b.mojom.js"]);
    }

    #[test]
    fn test_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = GeneratedFiles::new();
        files.insert("sub/a.txt".to_string(), "hello".to_string());
        let written = write_files(&files, dir.path()).unwrap();
        assert_eq!(written, vec![dir.path().join("sub/a.txt")]);
        assert_eq!(std::fs::read_to_string(&written[0]).unwrap(), "hello");
    }
}
