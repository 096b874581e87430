//! Java bindings: one source file per top-level declaration, plus a
//! `<Module>Constants` class when the module declares constants.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value as Json};

use crate::model::{module_to_data, AttributeValue, DeclRef, Kind, KindTable, Module};

use super::common::{
    escape_reserved, is_java_reserved, lower_first, module_dir, module_stem, quote, upper_camel,
};
use super::render::string_filter;
use super::{float_text, kind_filter, value_filter, Artifact, Backend, Filters, Literal};

const DEFAULT_PACKAGE_PREFIX: &str = "org.chromium.mojom";

pub struct JavaBackend;

impl Backend for JavaBackend {
    fn name(&self) -> &'static str {
        "java"
    }

    fn artifacts(&self, module: &Module) -> Vec<Artifact> {
        let dir = format!(
            "{}{}/",
            module_dir(&module.name),
            java_package(module).replace('.', "/")
        );
        let data = module_to_data(module);
        let mut artifacts = Vec::new();
        let groups = [
            ("structs", "java/struct.java.hbs"),
            ("unions", "java/union.java.hbs"),
            ("enums", "java/enum.java.hbs"),
            ("interfaces", "java/interface.java.hbs"),
        ];
        for (key, template) in groups {
            for item in data[key].as_array().into_iter().flatten() {
                let name = item["name"].as_str().unwrap_or_default();
                artifacts.push(
                    Artifact::new(format!("{}{}.java", dir, name), template).with_item(item.clone()),
                );
            }
        }
        if !module.constants.is_empty() {
            artifacts.push(Artifact::new(
                format!("{}{}.java", dir, constants_class(module)),
                "java/constants.java.hbs",
            ));
        }
        artifacts
    }

    fn filters(&self, module: &Module) -> Filters {
        let table = Arc::new(KindTable::for_module(module));
        let names = Arc::new(Names::new(module));
        let mut filters = Filters::new();
        filters.insert("symbol".into(), string_filter(symbol));
        filters.insert("java_field".into(), string_filter(java_field));
        let n = names.clone();
        filters.insert("java_type".into(), kind_filter(table.clone(), move |k| n.java_type(k)));
        let n = names.clone();
        filters.insert(
            "java_value".into(),
            value_filter(table, move |v, k| n.value(v, k)),
        );
        filters
    }

    fn globals(&self, module: &Module) -> Json {
        json!({
            "package": java_package(module),
            "constants_class": constants_class(module),
        })
    }

    fn partials(&self) -> &'static [&'static str] {
        &["java/enum_body.hbs"]
    }
}

fn symbol(name: &str) -> String {
    escape_reserved(name, is_java_reserved)
}

/// Field and method names: `some_field` → `someField`.
fn java_field(name: &str) -> String {
    symbol(&lower_first(&upper_camel(name)))
}

/// `JavaPackage` module attribute, else derived from the namespace.
pub fn java_package(module: &Module) -> String {
    if let Some(AttributeValue::String(package)) = module.attributes.get("JavaPackage") {
        return package.clone();
    }
    if module.namespace.is_empty() {
        DEFAULT_PACKAGE_PREFIX.to_string()
    } else {
        format!("{}.{}", DEFAULT_PACKAGE_PREFIX, module.namespace)
    }
}

/// `sub/base_types.mojom` → `BaseTypesConstants`.
pub fn constants_class(module: &Module) -> String {
    format!("{}Constants", upper_camel(module_stem(&module.name)))
}

/// Java packages of the module and everything it imports, by module name.
struct Names {
    packages: HashMap<String, String>,
}

impl Names {
    fn new(module: &Module) -> Self {
        let mut packages = HashMap::new();
        let mut pending = vec![module];
        while let Some(m) = pending.pop() {
            if packages.contains_key(&m.name) {
                continue;
            }
            packages.insert(m.name.clone(), java_package(m));
            pending.extend(m.imports.iter().map(|i| i.as_ref()));
        }
        Names { packages }
    }

    fn reference(&self, decl: &DeclRef) -> String {
        match self.packages.get(&decl.module) {
            Some(package) => format!("{}.{}", package, decl.name),
            None => decl.name.clone(),
        }
    }

    fn java_type(&self, kind: &Kind) -> String {
        match kind {
            Kind::Bool => "boolean".into(),
            Kind::Int8 | Kind::Uint8 => "byte".into(),
            Kind::Int16 | Kind::Uint16 => "short".into(),
            Kind::Int32 | Kind::Uint32 => "int".into(),
            Kind::Int64 | Kind::Uint64 => "long".into(),
            Kind::Float => "float".into(),
            Kind::Double => "double".into(),
            Kind::String => "String".into(),
            Kind::Handle => "org.chromium.mojo.system.UntypedHandle".into(),
            Kind::MessagePipe => "org.chromium.mojo.system.MessagePipeHandle".into(),
            Kind::DataPipeConsumer => "org.chromium.mojo.system.DataPipe.ConsumerHandle".into(),
            Kind::DataPipeProducer => "org.chromium.mojo.system.DataPipe.ProducerHandle".into(),
            Kind::SharedBuffer => "org.chromium.mojo.system.SharedBufferHandle".into(),
            Kind::Array { element, .. } => format!("{}[]", self.java_type(element)),
            Kind::Map { key, value } => format!(
                "java.util.Map<{}, {}>",
                self.boxed(key),
                self.boxed(value)
            ),
            Kind::Struct(decl) | Kind::Union(decl) | Kind::Interface(decl) => self.reference(decl),
            // Enum values travel as ints.
            Kind::Enum(_) => "int".into(),
            Kind::InterfaceRequest(target) => format!(
                "org.chromium.mojo.bindings.InterfaceRequest<{}>",
                self.reference(target.decl())
            ),
            Kind::Nullable(inner) => self.java_type(inner),
        }
    }

    /// Type usable as a generic argument.
    fn boxed(&self, kind: &Kind) -> String {
        match kind {
            Kind::Bool => "Boolean".into(),
            Kind::Int8 | Kind::Uint8 => "Byte".into(),
            Kind::Int16 | Kind::Uint16 => "Short".into(),
            Kind::Int32 | Kind::Uint32 | Kind::Enum(_) => "Integer".into(),
            Kind::Int64 | Kind::Uint64 => "Long".into(),
            Kind::Float => "Float".into(),
            Kind::Double => "Double".into(),
            other => self.java_type(other),
        }
    }

    fn value(&self, value: Option<Literal<'_>>, kind: &Kind) -> Result<String, String> {
        let Some(value) = value else {
            return Ok("null".into());
        };
        Ok(match value {
            Literal::Bool(b) => b.to_string(),
            Literal::Int(n) => match kind {
                Kind::Int64 | Kind::Uint64 => format!("{}L", n),
                Kind::Int8 | Kind::Uint8 => format!("(byte) {}", n),
                Kind::Int16 | Kind::Uint16 => format!("(short) {}", n),
                // Unsigned 32-bit values above i32::MAX wrap like the wire does.
                Kind::Uint32 if n > i32::MAX as i64 => format!("(int) {}L", n),
                Kind::Float => format!("{}.0f", n),
                Kind::Double => format!("{}.0", n),
                _ => n.to_string(),
            },
            Literal::Float(x) => match kind {
                Kind::Float => format!("{}f", float_text(x)?),
                _ => float_text(x)?,
            },
            Literal::String(s) => quote(s),
            Literal::Enum { decl, label } => format!("{}.{}", self.reference(&decl), label),
            Literal::Default => match kind.non_nullable() {
                Kind::Struct(decl) => format!("new {}()", self.reference(decl)),
                _ => "null".into(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Constant, Enum, Struct, Value};

    fn module() -> Module {
        let mut base = Module::new("sub/base.mojom", "base");
        base.attributes.insert(
            "JavaPackage".to_string(),
            AttributeValue::String("org.example.base".to_string()),
        );
        let mut m = Module::new("sub/app_types.mojom", "app");
        m.imports.push(Arc::new(base));
        m.structs.push(Struct::new("Point", &m.name));
        m.enums.push(Enum::new("Color", &m.name));
        m.constants.push(Constant::new("kMax", Kind::Int32, Value::Int(3)));
        m
    }

    #[test]
    fn test_packages_and_paths() {
        let m = module();
        assert_eq!(java_package(&m), "org.chromium.mojom.app");
        assert_eq!(java_package(&m.imports[0]), "org.example.base");
        assert_eq!(constants_class(&m), "AppTypesConstants");
        let paths: Vec<String> = JavaBackend
            .artifacts(&m)
            .into_iter()
            .map(|a| a.output_path)
            .collect();
        assert_eq!(
            paths,
            vec![
                "sub/org/chromium/mojom/app/Point.java",
                "sub/org/chromium/mojom/app/Color.java",
                "sub/org/chromium/mojom/app/AppTypesConstants.java",
            ]
        );
    }

    #[test]
    fn test_java_types() {
        let names = Names::new(&module());
        let imported = Kind::Struct(DeclRef::new("sub/base.mojom", "base", "Thing"));
        assert_eq!(names.java_type(&imported), "org.example.base.Thing");
        assert_eq!(names.java_type(&Kind::array(Kind::Uint8)), "byte[]");
        assert_eq!(
            names.java_type(&Kind::map(Kind::String, Kind::Int64)),
            "java.util.Map<String, Long>"
        );
    }

    #[test]
    fn test_java_values() {
        let names = Names::new(&module());
        assert_eq!(names.value(Some(Literal::Int(7)), &Kind::Int64).unwrap(), "7L");
        assert_eq!(names.value(Some(Literal::Int(1)), &Kind::Int8).unwrap(), "(byte) 1");
        assert_eq!(
            names.value(Some(Literal::Int(4_000_000_000)), &Kind::Uint32).unwrap(),
            "(int) 4000000000L"
        );
        assert_eq!(java_field("some_field"), "someField");
        assert_eq!(java_field("Native"), "native_");
    }
}
