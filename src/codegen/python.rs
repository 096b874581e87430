//! Python bindings: one module of enums, dataclasses and abstract
//! interface classes per mojom file.

use std::sync::Arc;

use serde_json::{json, Value as Json};

use crate::model::{DeclRef, Kind, KindTable, Module};

use super::common::{escape_reserved, is_python_reserved, module_dir, module_stem, quote, snake_case};
use super::render::string_filter;
use super::{float_text, kind_filter, value_filter, Artifact, Backend, Filters, Literal};

pub struct PythonBackend;

impl Backend for PythonBackend {
    fn name(&self) -> &'static str {
        "python"
    }

    fn artifacts(&self, module: &Module) -> Vec<Artifact> {
        let path = format!("{}{}_mojom.py", module_dir(&module.name), module_stem(&module.name));
        vec![Artifact::new(path, "python/module.py.hbs")]
    }

    fn filters(&self, module: &Module) -> Filters {
        let table = Arc::new(KindTable::for_module(module));
        let names = Arc::new(Names {
            module: module.name.clone(),
        });
        let mut filters = Filters::new();
        filters.insert("symbol".into(), string_filter(symbol));
        filters.insert("py_name".into(), string_filter(py_name));
        let n = names.clone();
        filters.insert("python_type".into(), kind_filter(table.clone(), move |k| n.type_hint(k)));
        let n = names.clone();
        filters.insert(
            "python_value".into(),
            value_filter(table.clone(), move |v, k| n.value(v, k)),
        );
        let n = names.clone();
        filters.insert(
            "python_default".into(),
            value_filter(table, move |v, k| n.field_default(v, k)),
        );
        filters
    }

    fn globals(&self, module: &Module) -> Json {
        let imports: Vec<Json> = module
            .imports
            .iter()
            .map(|import| {
                json!({
                    "module": python_module(&import.name),
                    "alias": alias(&import.name),
                })
            })
            .collect();
        json!({ "imports": imports })
    }
}

fn symbol(name: &str) -> String {
    escape_reserved(name, is_python_reserved)
}

/// Method and field names in Python style: `DoThing` → `do_thing`.
fn py_name(name: &str) -> String {
    symbol(&snake_case(name))
}

/// Importable module path: `sub/base.mojom` → `sub.base_mojom`.
fn python_module(module_name: &str) -> String {
    let dir = module_dir(module_name).replace('/', ".");
    format!("{}{}_mojom", dir, module_stem(module_name))
}

fn alias(module_name: &str) -> String {
    format!("{}_mojom", module_stem(module_name))
}

struct Names {
    module: String,
}

impl Names {
    fn reference(&self, decl: &DeclRef) -> String {
        if decl.module == self.module {
            decl.name.clone()
        } else {
            format!("{}.{}", alias(&decl.module), decl.name)
        }
    }

    /// Type hint; declarations are quoted so forward references work.
    fn type_hint(&self, kind: &Kind) -> String {
        match kind {
            Kind::Bool => "bool".into(),
            Kind::Float | Kind::Double => "float".into(),
            Kind::String => "str".into(),
            k if k.is_integer() => "int".into(),
            Kind::Array { element, .. } => format!("List[{}]", self.type_hint(element)),
            Kind::Map { key, value } => {
                format!("Dict[{}, {}]", self.type_hint(key), self.type_hint(value))
            }
            Kind::Struct(decl) | Kind::Union(decl) | Kind::Enum(decl) | Kind::Interface(decl) => {
                format!("'{}'", self.reference(decl))
            }
            Kind::InterfaceRequest(_) => "InterfaceRequest".into(),
            Kind::Nullable(inner) => format!("Optional[{}]", self.type_hint(inner)),
            _ => "Handle".into(),
        }
    }

    /// Literal for a constant value.
    fn value(&self, value: Option<Literal<'_>>, kind: &Kind) -> Result<String, String> {
        let Some(value) = value else {
            return Ok("None".into());
        };
        Ok(match value {
            Literal::Bool(true) => "True".into(),
            Literal::Bool(false) => "False".into(),
            Literal::Int(n) => n.to_string(),
            Literal::Float(x) => float_text(x)?,
            Literal::String(s) => quote(s),
            Literal::Enum { decl, label } => format!("{}.{}", self.reference(&decl), label),
            Literal::Default => match kind.non_nullable() {
                Kind::Struct(decl) => format!("{}()", self.reference(decl)),
                _ => "None".into(),
            },
        })
    }

    /// Dataclass field default. Fields without one get the zero value of
    /// their kind; anything that must not be evaluated in the class body is
    /// deferred through a factory.
    fn field_default(&self, value: Option<Literal<'_>>, kind: &Kind) -> Result<String, String> {
        let Some(value) = value else {
            return Ok(match kind {
                Kind::Bool => "False".into(),
                Kind::Float | Kind::Double => "0.0".into(),
                Kind::String => "''".into(),
                k if k.is_integer() => "0".into(),
                Kind::Enum(_) => "0".into(),
                Kind::Array { .. } => "dataclasses.field(default_factory=list)".into(),
                Kind::Map { .. } => "dataclasses.field(default_factory=dict)".into(),
                _ => "None".into(),
            });
        };
        let deferred = match &value {
            Literal::Enum { decl, .. } => decl.name.contains('.'),
            Literal::Default => kind.non_nullable().decl().is_some(),
            _ => false,
        };
        let text = self.value(Some(value), kind)?;
        if deferred {
            Ok(format!("dataclasses.field(default_factory=lambda: {})", text))
        } else {
            Ok(text)
        }
    }
}
