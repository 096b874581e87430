//! C++ bindings: a public header, an internal header with the wire data
//! classes, and a source file per module.

use std::sync::Arc;

use serde_json::{json, Value as Json};

use crate::model::{DeclRef, Kind, KindTable, Module};

use super::common::{escape_reserved, is_cpp_reserved, module_dir, module_stem, quote};
use super::render::string_filter;
use super::{float_text, kind_filter, value_filter, Artifact, Backend, Filters, Literal};

pub struct CppBackend;

impl Backend for CppBackend {
    fn name(&self) -> &'static str {
        "cpp"
    }

    fn artifacts(&self, module: &Module) -> Vec<Artifact> {
        let base = format!("{}{}.mojom", module_dir(&module.name), module_stem(&module.name));
        vec![
            Artifact::new(format!("{}.h", base), "cpp/module.h.hbs"),
            Artifact::new(format!("{}-internal.h", base), "cpp/module-internal.h.hbs"),
            Artifact::new(format!("{}.cc", base), "cpp/module.cc.hbs"),
        ]
    }

    fn filters(&self, module: &Module) -> Filters {
        let table = Arc::new(KindTable::for_module(module));
        let mut filters = Filters::new();
        filters.insert("symbol".into(), string_filter(symbol));
        filters.insert("cpp_type".into(), kind_filter(table.clone(), cpp_type));
        filters.insert("cpp_data_type".into(), kind_filter(table.clone(), cpp_data_type));
        filters.insert("cpp_const_type".into(), kind_filter(table.clone(), cpp_const_type));
        filters.insert("cpp_value".into(), value_filter(table, cpp_value));
        filters
    }

    fn globals(&self, module: &Module) -> Json {
        let base = format!("{}{}.mojom", module_dir(&module.name), module_stem(&module.name));
        let namespaces: Vec<&str> = module
            .namespace
            .split('.')
            .filter(|part| !part.is_empty())
            .collect();
        let imports: Vec<Json> = module
            .imports
            .iter()
            .map(|import| {
                let base = format!("{}{}.mojom", module_dir(&import.name), module_stem(&import.name));
                json!({
                    "header": format!("{}.h", base),
                    "internal_header": format!("{}-internal.h", base),
                })
            })
            .collect();
        json!({
            "header": format!("{}.h", base),
            "internal_header": format!("{}-internal.h", base),
            "header_guard": header_guard(&format!("{}.h", base)),
            "internal_header_guard": header_guard(&format!("{}-internal.h", base)),
            "namespaces": namespaces,
            "imports": imports,
        })
    }
}

fn symbol(name: &str) -> String {
    escape_reserved(name, is_cpp_reserved)
}

/// `sub/base.mojom.h` → `SUB_BASE_MOJOM_H_`.
fn header_guard(path: &str) -> String {
    let mut guard: String = path
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    guard.push('_');
    guard
}

/// `::ns::Outer::Inner` for a declaration.
fn qualified(decl: &DeclRef) -> String {
    let mut name = String::new();
    for part in decl.namespace.split('.').filter(|p| !p.is_empty()) {
        name.push_str("::");
        name.push_str(part);
    }
    for part in decl.name.split('.') {
        name.push_str("::");
        name.push_str(part);
    }
    name
}

/// Wire-data class for a struct or union: `::ns::internal::Name_Data`.
fn data_class(decl: &DeclRef) -> String {
    let mut name = String::new();
    for part in decl.namespace.split('.').filter(|p| !p.is_empty()) {
        name.push_str("::");
        name.push_str(part);
    }
    format!("{}::internal::{}_Data", name, decl.name.replace('.', "_"))
}

pub fn cpp_type(kind: &Kind) -> String {
    match kind {
        Kind::Bool => "bool".into(),
        Kind::Int8 => "int8_t".into(),
        Kind::Int16 => "int16_t".into(),
        Kind::Int32 => "int32_t".into(),
        Kind::Int64 => "int64_t".into(),
        Kind::Uint8 => "uint8_t".into(),
        Kind::Uint16 => "uint16_t".into(),
        Kind::Uint32 => "uint32_t".into(),
        Kind::Uint64 => "uint64_t".into(),
        Kind::Float => "float".into(),
        Kind::Double => "double".into(),
        Kind::String => "std::string".into(),
        Kind::Handle => "mojo::ScopedHandle".into(),
        Kind::MessagePipe => "mojo::ScopedMessagePipeHandle".into(),
        Kind::DataPipeConsumer => "mojo::ScopedDataPipeConsumerHandle".into(),
        Kind::DataPipeProducer => "mojo::ScopedDataPipeProducerHandle".into(),
        Kind::SharedBuffer => "mojo::ScopedSharedBufferHandle".into(),
        Kind::Array { element, length: None } => format!("std::vector<{}>", cpp_type(element)),
        Kind::Array { element, length: Some(n) } => {
            format!("std::array<{}, {}>", cpp_type(element), n)
        }
        Kind::Map { key, value } => format!("std::map<{}, {}>", cpp_type(key), cpp_type(value)),
        Kind::Struct(decl) | Kind::Union(decl) | Kind::Interface(decl) => {
            format!("{}Ptr", qualified(decl))
        }
        Kind::Enum(decl) => qualified(decl),
        Kind::InterfaceRequest(target) => {
            format!("mojo::InterfaceRequest<{}>", qualified(target.decl()))
        }
        Kind::Nullable(inner) => match inner.as_ref() {
            // Pointer and handle kinds already have an empty state.
            Kind::String | Kind::Array { .. } | Kind::Map { .. } => {
                format!("std::optional<{}>", cpp_type(inner))
            }
            other => cpp_type(other),
        },
    }
}

/// Field type inside the wire-data classes of the internal header.
pub fn cpp_data_type(kind: &Kind) -> String {
    match kind {
        Kind::Enum(_) => "int32_t".into(),
        Kind::String => "mojo::internal::Pointer<mojo::internal::String_Data>".into(),
        Kind::Handle
        | Kind::MessagePipe
        | Kind::DataPipeConsumer
        | Kind::DataPipeProducer
        | Kind::SharedBuffer
        | Kind::InterfaceRequest(_) => "mojo::internal::Handle_Data".into(),
        Kind::Interface(_) => "mojo::internal::Interface_Data".into(),
        Kind::Array { element, .. } => format!(
            "mojo::internal::Pointer<mojo::internal::Array_Data<{}>>",
            cpp_data_type(element)
        ),
        Kind::Map { key, value } => format!(
            "mojo::internal::Pointer<mojo::internal::Map_Data<{}, {}>>",
            cpp_data_type(key),
            cpp_data_type(value)
        ),
        Kind::Struct(decl) => format!("mojo::internal::Pointer<{}>", data_class(decl)),
        Kind::Union(decl) => data_class(decl),
        Kind::Nullable(inner) => cpp_data_type(inner),
        primitive => cpp_type(primitive),
    }
}

/// Declared type of a constant, `const` included.
pub fn cpp_const_type(kind: &Kind) -> String {
    match kind {
        Kind::String => "const char* const".into(),
        other => format!("const {}", cpp_type(other)),
    }
}

fn cpp_value(value: Option<Literal<'_>>, kind: &Kind) -> Result<String, String> {
    let Some(value) = value else {
        return Ok("{}".into());
    };
    Ok(match value {
        Literal::Bool(b) => b.to_string(),
        Literal::Int(n) => match kind {
            Kind::Int64 if n == i64::MIN => "(-INT64_C(9223372036854775807) - 1)".into(),
            Kind::Int64 => format!("INT64_C({})", n),
            Kind::Uint64 => format!("UINT64_C({})", n),
            Kind::Uint32 => format!("{}U", n),
            Kind::Float => format!("{}.0f", n),
            Kind::Double => format!("{}.0", n),
            _ => n.to_string(),
        },
        Literal::Float(x) => match kind {
            Kind::Float => format!("{}f", float_text(x)?),
            _ => float_text(x)?,
        },
        Literal::String(s) => quote(s),
        Literal::Enum { decl, label } => format!("{}::{}", qualified(&decl), label),
        Literal::Default => match kind.non_nullable() {
            Kind::Struct(decl) => format!("{}::New()", qualified(decl)),
            _ => "{}".into(),
        },
    })
}
