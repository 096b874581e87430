//! JavaScript bindings: one AMD module per mojom file, built on the mojo
//! `codec` runtime.

use std::sync::Arc;

use serde_json::{json, Value as Json};

use crate::model::{DeclRef, Kind, KindTable, Module};

use super::common::{escape_reserved, is_js_reserved, module_dir, module_stem, quote};
use super::render::string_filter;
use super::{float_text, kind_filter, value_filter, Artifact, Backend, Filters, Literal};

pub struct JsBackend;

impl Backend for JsBackend {
    fn name(&self) -> &'static str {
        "js"
    }

    fn artifacts(&self, module: &Module) -> Vec<Artifact> {
        let path = format!("{}{}.mojom.js", module_dir(&module.name), module_stem(&module.name));
        vec![Artifact::new(path, "js/module.js.hbs")]
    }

    fn filters(&self, module: &Module) -> Filters {
        let table = Arc::new(KindTable::for_module(module));
        let names = Arc::new(Names {
            module: module.name.clone(),
        });
        let mut filters = Filters::new();
        filters.insert("symbol".into(), string_filter(symbol));
        let n = names.clone();
        filters.insert("js_codec".into(), kind_filter(table.clone(), move |k| n.codec(k)));
        let n = names.clone();
        filters.insert(
            "js_default".into(),
            value_filter(table, move |v, k| n.default_value(v, k)),
        );
        filters
    }

    fn globals(&self, module: &Module) -> Json {
        let imports: Vec<Json> = module
            .imports
            .iter()
            .map(|import| json!({"path": import.name, "alias": alias(&import.name)}))
            .collect();
        json!({ "imports": imports })
    }
}

fn symbol(name: &str) -> String {
    escape_reserved(name, is_js_reserved)
}

/// Local variable an imported module is bound to: `sub/base.mojom` → `base$`.
fn alias(module_name: &str) -> String {
    format!("{}$", module_stem(module_name))
}

/// Naming relative to the module being generated.
struct Names {
    module: String,
}

impl Names {
    /// `Foo`, `Outer.Inner`, or `base$.Foo` for a declaration from an import.
    fn reference(&self, decl: &DeclRef) -> String {
        if decl.module == self.module {
            decl.name.clone()
        } else {
            format!("{}.{}", alias(&decl.module), decl.name)
        }
    }

    fn codec(&self, kind: &Kind) -> String {
        match kind {
            Kind::Bool => "codec.Uint8".into(),
            Kind::Int8 => "codec.Int8".into(),
            Kind::Int16 => "codec.Int16".into(),
            Kind::Int32 => "codec.Int32".into(),
            Kind::Int64 => "codec.Int64".into(),
            Kind::Uint8 => "codec.Uint8".into(),
            Kind::Uint16 => "codec.Uint16".into(),
            Kind::Uint32 => "codec.Uint32".into(),
            Kind::Uint64 => "codec.Uint64".into(),
            Kind::Float => "codec.Float".into(),
            Kind::Double => "codec.Double".into(),
            Kind::String => "codec.String".into(),
            Kind::Handle
            | Kind::MessagePipe
            | Kind::DataPipeConsumer
            | Kind::DataPipeProducer
            | Kind::SharedBuffer => "codec.Handle".into(),
            Kind::Array { element, length } => match length {
                Some(n) => format!("new codec.ArrayOf({}, {})", self.codec(element), n),
                None => format!("new codec.ArrayOf({})", self.codec(element)),
            },
            Kind::Map { key, value } => {
                format!("new codec.MapOf({}, {})", self.codec(key), self.codec(value))
            }
            Kind::Struct(decl) => format!("new codec.PointerTo({})", self.reference(decl)),
            Kind::Union(decl) => format!("new codec.Union({})", self.reference(decl)),
            Kind::Enum(decl) => format!("new codec.Enum({})", self.reference(decl)),
            Kind::Interface(decl) => format!("new codec.Interface({}Ptr)", self.reference(decl)),
            Kind::InterfaceRequest(_) => "codec.InterfaceRequest".into(),
            Kind::Nullable(inner) => match inner.as_ref() {
                Kind::String => "codec.NullableString".into(),
                Kind::Array { element, length } => match length {
                    Some(n) => format!("new codec.NullableArrayOf({}, {})", self.codec(element), n),
                    None => format!("new codec.NullableArrayOf({})", self.codec(element)),
                },
                Kind::Map { key, value } => format!(
                    "new codec.NullableMapOf({}, {})",
                    self.codec(key),
                    self.codec(value)
                ),
                Kind::Struct(decl) => {
                    format!("new codec.NullablePointerTo({})", self.reference(decl))
                }
                Kind::Union(decl) => format!("new codec.NullableUnion({})", self.reference(decl)),
                Kind::Interface(decl) => {
                    format!("new codec.NullableInterface({}Ptr)", self.reference(decl))
                }
                Kind::InterfaceRequest(_) => "codec.NullableInterfaceRequest".into(),
                _ => "codec.NullableHandle".into(),
            },
        }
    }

    /// Initial value of a field: its default if it has one, else the zero
    /// value of its kind.
    fn default_value(&self, value: Option<Literal<'_>>, kind: &Kind) -> Result<String, String> {
        let Some(value) = value else {
            return Ok(match kind {
                Kind::Bool => "false".into(),
                Kind::Float | Kind::Double => "0.0".into(),
                k if k.is_integer() => "0".into(),
                Kind::Enum(_) => "0".into(),
                _ => "null".into(),
            });
        };
        Ok(match value {
            Literal::Bool(b) => b.to_string(),
            Literal::Int(n) => n.to_string(),
            Literal::Float(x) => float_text(x)?,
            Literal::String(s) => quote(s),
            Literal::Enum { decl, label } => format!("{}.{}", self.reference(&decl), label),
            Literal::Default => match kind.non_nullable() {
                Kind::Struct(decl) => format!("new {}()", self.reference(decl)),
                _ => "null".into(),
            },
        })
    }
}
