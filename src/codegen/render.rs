//! Template rendering on top of handlebars.
//!
//! Templates are looked up through a [`TemplateSource`] the first time they
//! are rendered. Named filters are registered as handlebars helpers, so
//! `{{cpp_type kind}}` calls the backend's `cpp_type` filter with the field's
//! kind spec. Rendering is strict: a reference to a missing key fails.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use handlebars::{
    Context, Handlebars, Helper, HelperDef, RenderContext, RenderError, ScopedJson,
};
use serde_json::Value as Json;

use crate::diagnostics::GenerationError;

/// A named filter: positional helper arguments in, one JSON value out.
pub type Filter = Arc<dyn Fn(&[Json]) -> Result<Json, String> + Send + Sync>;

pub type Filters = BTreeMap<String, Filter>;

/// Wrap a plain string transformation as a filter over its first argument.
pub fn string_filter(f: fn(&str) -> String) -> Filter {
    Arc::new(move |args: &[Json]| -> Result<Json, String> {
        Ok(Json::String(f(first_str(args)?)))
    })
}

/// The first argument as a string, or a filter error.
pub fn first_str(args: &[Json]) -> Result<&str, String> {
    match args.first() {
        Some(Json::String(s)) => Ok(s),
        Some(other) => Err(format!("expected a string argument, found {}", other)),
        None => Err("missing argument".to_string()),
    }
}

// ===== Template sources =====

pub trait TemplateSource: Send + Sync {
    /// Template text for a backend-relative path such as `cpp/module.h.hbs`.
    fn load(&self, path: &str) -> io::Result<String>;
}

/// Templates compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

macro_rules! builtin_templates {
    ($($path:literal),* $(,)?) => {
        const BUILTIN: &[(&str, &str)] = &[
            $(($path, include_str!(concat!("../../templates/", $path))),)*
        ];
    };
}

builtin_templates!(
    "cpp/module.h.hbs",
    "cpp/module-internal.h.hbs",
    "cpp/module.cc.hbs",
    "js/module.js.hbs",
    "python/module.py.hbs",
    "java/struct.java.hbs",
    "java/union.java.hbs",
    "java/enum.java.hbs",
    "java/interface.java.hbs",
    "java/constants.java.hbs",
    "java/enum_body.hbs",
);

impl BuiltinTemplates {
    pub fn paths() -> impl Iterator<Item = &'static str> {
        BUILTIN.iter().map(|(path, _)| *path)
    }
}

impl TemplateSource for BuiltinTemplates {
    fn load(&self, path: &str) -> io::Result<String> {
        BUILTIN
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, text)| text.to_string())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }
}

/// Templates read from a directory laid out like the builtin set.
#[derive(Debug, Clone)]
pub struct TemplateDir {
    root: PathBuf,
}

impl TemplateDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        TemplateDir { root: root.into() }
    }
}

impl TemplateSource for TemplateDir {
    fn load(&self, path: &str) -> io::Result<String> {
        std::fs::read_to_string(self.root.join(path))
    }
}

// ===== Renderer =====

struct FilterHelper {
    name: String,
    filter: Filter,
    failure: Arc<Mutex<Option<(String, String)>>>,
}

impl HelperDef for FilterHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'reg, 'rc>, RenderError> {
        let args: Vec<Json> = h.params().iter().map(|p| p.value().clone()).collect();
        match (self.filter)(&args) {
            Ok(value) => Ok(ScopedJson::Derived(value)),
            Err(message) => {
                if let Ok(mut slot) = self.failure.lock() {
                    slot.get_or_insert_with(|| (self.name.clone(), message.clone()));
                }
                Err(RenderError::new(format!("filter '{}': {}", self.name, message)))
            }
        }
    }
}

/// One backend's handlebars registry plus its filters.
pub struct Renderer<'a> {
    backend: &'static str,
    registry: Handlebars<'a>,
    templates: &'a dyn TemplateSource,
    failure: Arc<Mutex<Option<(String, String)>>>,
}

impl<'a> Renderer<'a> {
    pub fn new(backend: &'static str, templates: &'a dyn TemplateSource, filters: Filters) -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        let failure = Arc::new(Mutex::new(None));
        for (name, filter) in filters {
            let helper = FilterHelper {
                name: name.clone(),
                filter,
                failure: failure.clone(),
            };
            registry.register_helper(&name, Box::new(helper));
        }
        Renderer {
            backend,
            registry,
            templates,
            failure,
        }
    }

    /// Make `path` available as a partial (`{{> path}}`) without rendering it.
    pub fn register(&mut self, path: &str) -> Result<(), GenerationError> {
        if self.registry.has_template(path) {
            return Ok(());
        }
        let text = self.templates.load(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => GenerationError::MissingTemplate {
                backend: self.backend.to_string(),
                path: path.to_string(),
            },
            _ => GenerationError::Template {
                backend: self.backend.to_string(),
                path: path.to_string(),
                message: e.to_string(),
            },
        })?;
        self.registry
            .register_template_string(path, text)
            .map_err(|e| GenerationError::Template {
                backend: self.backend.to_string(),
                path: path.to_string(),
                message: e.to_string(),
            })
    }

    /// Render one template with `params`.
    pub fn render(&mut self, path: &str, params: &Json) -> Result<String, GenerationError> {
        self.register(path)?;
        self.registry.render(path, params).map_err(|e| {
            let failed_filter = self.failure.lock().ok().and_then(|mut slot| slot.take());
            match failed_filter {
                Some((filter, message)) => GenerationError::Filter {
                    backend: self.backend.to_string(),
                    path: path.to_string(),
                    filter,
                    message,
                },
                None => GenerationError::Render {
                    backend: self.backend.to_string(),
                    path: path.to_string(),
                    message: e.to_string(),
                },
            }
        })
    }
}
