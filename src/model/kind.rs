//! Resolved type references and their spec-string encoding.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::diagnostics::{DataError, TranslateError};

use super::Module;

/// Names one declaration: owning module, its namespace, and the dotted path
/// inside the module (`Outer.Inner` for nested enums).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclRef {
    pub module: String,
    pub namespace: String,
    pub name: String,
}

impl DeclRef {
    pub fn new(
        module: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        DeclRef {
            module: module.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// `ns.Path`, or just `Path` for a module without a namespace.
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Last segment of the in-module path.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

/// Target of an interface request. Only [`Kind::interface_request`] builds one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceRef(DeclRef);

impl InterfaceRef {
    pub fn decl(&self) -> &DeclRef {
        &self.0
    }
}

/// A fully resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float,
    Double,
    String,
    Handle,
    MessagePipe,
    DataPipeConsumer,
    DataPipeProducer,
    SharedBuffer,
    Array {
        element: Box<Kind>,
        length: Option<u32>,
    },
    Map {
        key: Box<Kind>,
        value: Box<Kind>,
    },
    Struct(DeclRef),
    Union(DeclRef),
    Enum(DeclRef),
    Interface(DeclRef),
    InterfaceRequest(InterfaceRef),
    Nullable(Box<Kind>),
}

const PRIMITIVE_SPECS: &[(&str, Kind)] = &[
    ("h:d:c", Kind::DataPipeConsumer),
    ("h:d:p", Kind::DataPipeProducer),
    ("h:m", Kind::MessagePipe),
    ("h:s", Kind::SharedBuffer),
    ("i16", Kind::Int16),
    ("i32", Kind::Int32),
    ("i64", Kind::Int64),
    ("u16", Kind::Uint16),
    ("u32", Kind::Uint32),
    ("u64", Kind::Uint64),
    ("i8", Kind::Int8),
    ("u8", Kind::Uint8),
    ("b", Kind::Bool),
    ("f", Kind::Float),
    ("d", Kind::Double),
    ("s", Kind::String),
    ("h", Kind::Handle),
];

impl Kind {
    /// Build `r:<interface>`; anything but an interface kind is rejected.
    pub fn interface_request(target: &Kind) -> Result<Kind, TranslateError> {
        match target {
            Kind::Interface(decl) => Ok(Kind::InterfaceRequest(InterfaceRef(decl.clone()))),
            other => Err(TranslateError::InvalidInterfaceRequest {
                target_name: other.spec(),
            }),
        }
    }

    pub fn array(element: Kind) -> Kind {
        Kind::Array {
            element: Box::new(element),
            length: None,
        }
    }

    pub fn fixed_array(element: Kind, length: u32) -> Kind {
        Kind::Array {
            element: Box::new(element),
            length: Some(length),
        }
    }

    pub fn map(key: Kind, value: Kind) -> Kind {
        Kind::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn nullable(inner: Kind) -> Kind {
        Kind::Nullable(Box::new(inner))
    }

    /// Mojom spelling of a primitive name, as used in source files.
    pub fn primitive(name: &str) -> Option<Kind> {
        let kind = match name {
            "bool" => Kind::Bool,
            "int8" => Kind::Int8,
            "int16" => Kind::Int16,
            "int32" => Kind::Int32,
            "int64" => Kind::Int64,
            "uint8" => Kind::Uint8,
            "uint16" => Kind::Uint16,
            "uint32" => Kind::Uint32,
            "uint64" => Kind::Uint64,
            "float" => Kind::Float,
            "double" => Kind::Double,
            "string" => Kind::String,
            _ => return None,
        };
        Some(kind)
    }

    /// `handle<subtype>` spelling.
    pub fn handle(subtype: Option<&str>) -> Option<Kind> {
        let kind = match subtype {
            None => Kind::Handle,
            Some("message_pipe") => Kind::MessagePipe,
            Some("data_pipe_consumer") => Kind::DataPipeConsumer,
            Some("data_pipe_producer") => Kind::DataPipeProducer,
            Some("shared_buffer") => Kind::SharedBuffer,
            Some(_) => return None,
        };
        Some(kind)
    }

    /// Canonical spec string.
    pub fn spec(&self) -> String {
        match self {
            Kind::Array { element, length } => match length {
                Some(n) => format!("a{}:{}", n, element.spec()),
                None => format!("a:{}", element.spec()),
            },
            Kind::Map { key, value } => format!("m[{}][{}]", key.spec(), value.spec()),
            Kind::Struct(decl) | Kind::Union(decl) | Kind::Enum(decl) | Kind::Interface(decl) => {
                format!("x:{}", decl.qualified_name())
            }
            Kind::InterfaceRequest(target) => format!("r:x:{}", target.decl().qualified_name()),
            Kind::Nullable(inner) => format!("?{}", inner.spec()),
            primitive => PRIMITIVE_SPECS
                .iter()
                .find(|(_, k)| k == primitive)
                .map(|(spec, _)| spec.to_string())
                .unwrap_or_default(),
        }
    }

    /// Parse a spec string, resolving `x:` names through `table`.
    pub fn parse_spec(spec: &str, table: &KindTable) -> Result<Kind, DataError> {
        let (kind, rest) = parse_prefix(spec, spec, table)?;
        if !rest.is_empty() {
            return Err(DataError::InvalidKindSpec {
                spec: spec.to_string(),
            });
        }
        Ok(kind)
    }

    pub fn decl(&self) -> Option<&DeclRef> {
        match self {
            Kind::Struct(d) | Kind::Union(d) | Kind::Enum(d) | Kind::Interface(d) => Some(d),
            Kind::InterfaceRequest(target) => Some(target.decl()),
            _ => None,
        }
    }

    /// Strip one level of nullability.
    pub fn non_nullable(&self) -> &Kind {
        match self {
            Kind::Nullable(inner) => inner,
            other => other,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, Kind::Nullable(_))
    }

    /// Kinds that are pointers or handles on the wire and so may be null.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Kind::String
                | Kind::Handle
                | Kind::MessagePipe
                | Kind::DataPipeConsumer
                | Kind::DataPipeProducer
                | Kind::SharedBuffer
                | Kind::Array { .. }
                | Kind::Map { .. }
                | Kind::Struct(_)
                | Kind::Union(_)
                | Kind::Interface(_)
                | Kind::InterfaceRequest(_)
        )
    }

    pub fn is_handle(&self) -> bool {
        matches!(
            self,
            Kind::Handle
                | Kind::MessagePipe
                | Kind::DataPipeConsumer
                | Kind::DataPipeProducer
                | Kind::SharedBuffer
                | Kind::Interface(_)
                | Kind::InterfaceRequest(_)
        )
    }

    pub fn is_integer(&self) -> bool {
        self.int_range().is_some()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Kind::Float | Kind::Double)
    }

    /// Kinds usable as map keys.
    pub fn is_map_key(&self) -> bool {
        self.is_integer()
            || self.is_float()
            || matches!(self, Kind::Bool | Kind::String | Kind::Enum(_))
    }

    /// Inclusive value range of an integer kind. Values are held as `i64`,
    /// so `uint64` tops out at `i64::MAX`.
    pub fn int_range(&self) -> Option<(i64, i64)> {
        let range = match self {
            Kind::Int8 => (i8::MIN as i64, i8::MAX as i64),
            Kind::Int16 => (i16::MIN as i64, i16::MAX as i64),
            Kind::Int32 => (i32::MIN as i64, i32::MAX as i64),
            Kind::Int64 => (i64::MIN, i64::MAX),
            Kind::Uint8 => (0, u8::MAX as i64),
            Kind::Uint16 => (0, u16::MAX as i64),
            Kind::Uint32 => (0, u32::MAX as i64),
            Kind::Uint64 => (0, i64::MAX),
            _ => return None,
        };
        Some(range)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spec())
    }
}

fn invalid(spec: &str) -> DataError {
    DataError::InvalidKindSpec {
        spec: spec.to_string(),
    }
}

/// Parse one kind from the front of `input`, returning the unconsumed rest.
fn parse_prefix<'a>(
    input: &'a str,
    whole: &str,
    table: &KindTable,
) -> Result<(Kind, &'a str), DataError> {
    if let Some(rest) = input.strip_prefix('?') {
        let (inner, rest) = parse_prefix(rest, whole, table)?;
        return Ok((Kind::nullable(inner), rest));
    }
    if let Some(rest) = input.strip_prefix("r:") {
        let (target, rest) = parse_prefix(rest, whole, table)?;
        let kind = Kind::interface_request(&target).map_err(|_| invalid(whole))?;
        return Ok((kind, rest));
    }
    if let Some(rest) = input.strip_prefix("x:") {
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(invalid(whole));
        }
        let name = &rest[..end];
        let kind = table.resolve(name)?.clone();
        return Ok((kind, &rest[end..]));
    }
    if let Some(rest) = input.strip_prefix("m[") {
        let (key, rest) = parse_prefix(rest, whole, table)?;
        let rest = rest.strip_prefix("][").ok_or_else(|| invalid(whole))?;
        let (value, rest) = parse_prefix(rest, whole, table)?;
        let rest = rest.strip_prefix(']').ok_or_else(|| invalid(whole))?;
        return Ok((Kind::map(key, value), rest));
    }
    if let Some(rest) = input.strip_prefix('a') {
        let colon = rest.find(':').ok_or_else(|| invalid(whole))?;
        let length = match &rest[..colon] {
            "" => None,
            digits => Some(digits.parse::<u32>().map_err(|_| invalid(whole))?),
        };
        let (element, rest) = parse_prefix(&rest[colon + 1..], whole, table)?;
        let kind = Kind::Array {
            element: Box::new(element),
            length,
        };
        return Ok((kind, rest));
    }
    PRIMITIVE_SPECS
        .iter()
        .find(|(spec, _)| input.starts_with(spec))
        .map(|(spec, kind)| (kind.clone(), &input[spec.len()..]))
        .ok_or_else(|| invalid(whole))
}

// ===== Kind table =====

/// Declarations visible from one module, keyed by qualified name.
///
/// Mirrors translation scoping: the module's own declarations shadow those of
/// its direct imports, and a name declared by two different imports is
/// ambiguous. Transitive imports are not visible.
#[derive(Debug, Clone, Default)]
pub struct KindTable {
    kinds: HashMap<String, Kind>,
    ambiguous: HashMap<String, Vec<String>>,
}

impl KindTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table of everything declared in `module` and its direct imports.
    pub fn for_module(module: &Module) -> Self {
        let mut table = KindTable::new();
        for kind in module.declared_kinds() {
            table.insert(kind);
        }
        let local: HashSet<String> = table.kinds.keys().cloned().collect();
        for import in &module.imports {
            for kind in import.declared_kinds() {
                if let Some(decl) = kind.decl() {
                    if !local.contains(&decl.qualified_name()) {
                        table.insert(kind);
                    }
                }
            }
        }
        table
    }

    /// Register a declaration kind. A second, different declaration under
    /// the same name makes that name ambiguous.
    pub fn insert(&mut self, kind: Kind) {
        let Some(decl) = kind.decl() else {
            return;
        };
        let name = decl.qualified_name();
        match self.kinds.get(&name) {
            None => {
                self.kinds.insert(name, kind);
            }
            Some(existing) if *existing == kind => {}
            Some(existing) => {
                let first = existing.decl().map(|d| d.module.clone()).unwrap_or_default();
                let candidates = self.ambiguous.entry(name).or_insert_with(|| vec![first]);
                candidates.push(decl.module.clone());
            }
        }
    }

    /// Unambiguous declaration kind for `qualified_name`.
    pub fn lookup(&self, qualified_name: &str) -> Option<&Kind> {
        if self.ambiguous.contains_key(qualified_name) {
            return None;
        }
        self.kinds.get(qualified_name)
    }

    fn resolve(&self, qualified_name: &str) -> Result<&Kind, DataError> {
        if let Some(modules) = self.ambiguous.get(qualified_name) {
            return Err(DataError::AmbiguousKind {
                spec: format!("x:{}", qualified_name),
                modules: modules.join(", "),
            });
        }
        self.kinds.get(qualified_name).ok_or_else(|| DataError::UnknownKind {
            spec: format!("x:{}", qualified_name),
        })
    }

    pub fn parse(&self, spec: &str) -> Result<Kind, DataError> {
        Kind::parse_spec(spec, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> KindTable {
        let mut table = KindTable::new();
        table.insert(Kind::Struct(DeclRef::new("a.mojom", "sample", "Foo")));
        table.insert(Kind::Interface(DeclRef::new("a.mojom", "sample", "Port")));
        table.insert(Kind::Enum(DeclRef::new("a.mojom", "sample", "Foo.Color")));
        table.insert(Kind::Struct(DeclRef::new("b.mojom", "", "Bare")));
        table
    }

    #[test]
    fn test_primitive_specs() {
        assert_eq!(Kind::Int32.spec(), "i32");
        assert_eq!(Kind::Uint8.spec(), "u8");
        assert_eq!(Kind::DataPipeConsumer.spec(), "h:d:c");
        assert_eq!(Kind::String.spec(), "s");
    }

    #[test]
    fn test_container_specs() {
        let foo = Kind::Struct(DeclRef::new("a.mojom", "sample", "Foo"));
        assert_eq!(Kind::array(foo.clone()).spec(), "a:x:sample.Foo");
        assert_eq!(Kind::fixed_array(Kind::Uint8, 16).spec(), "a16:u8");
        assert_eq!(
            Kind::map(Kind::String, Kind::nullable(foo)).spec(),
            "m[s][?x:sample.Foo]"
        );
        let bare = Kind::Struct(DeclRef::new("b.mojom", "", "Bare"));
        assert_eq!(bare.spec(), "x:Bare");
    }

    #[test]
    fn test_interface_request_rejects_struct() {
        let kind = Kind::Struct(DeclRef::new("test.mojom", "", "TestStruct"));
        let err = Kind::interface_request(&kind).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Interface request requires 'x:TestStruct' to be an interface."
        );
    }

    #[test]
    fn test_interface_request_accepts_interface() {
        let port = Kind::Interface(DeclRef::new("a.mojom", "sample", "Port"));
        let request = Kind::interface_request(&port).unwrap();
        assert_eq!(request.spec(), "r:x:sample.Port");
        assert_eq!(request.decl().map(|d| d.name.as_str()), Some("Port"));
    }

    #[test]
    fn test_parse_spec_nested() {
        let table = table();
        for spec in [
            "b",
            "h:d:p",
            "a:a4:i16",
            "m[s][a:?x:sample.Foo]",
            "m[x:sample.Foo.Color][m[u64][d]]",
            "?r:x:sample.Port",
            "x:Bare",
        ] {
            let kind = table.parse(spec).unwrap();
            assert_eq!(kind.spec(), spec);
        }
    }

    #[test]
    fn test_parse_spec_errors() {
        let table = table();
        assert!(matches!(
            table.parse("x:sample.Missing"),
            Err(DataError::UnknownKind { .. })
        ));
        assert!(matches!(
            table.parse("r:x:sample.Foo"),
            Err(DataError::InvalidKindSpec { .. })
        ));
        assert!(matches!(table.parse("i32z"), Err(DataError::InvalidKindSpec { .. })));
        assert!(matches!(table.parse("m[s]"), Err(DataError::InvalidKindSpec { .. })));
    }

    #[test]
    fn test_table_sees_direct_imports_only() {
        use std::sync::Arc;

        use crate::model::Struct;

        let mut deep = Module::new("a2.mojom", "sample");
        deep.structs.push(Struct::new("Point", "a2.mojom"));
        deep.structs.push(Struct::new("Deep", "a2.mojom"));
        let mut middle = Module::new("b.mojom", "other");
        middle.imports.push(Arc::new(deep));
        let mut direct = Module::new("a.mojom", "sample");
        direct.structs.push(Struct::new("Point", "a.mojom"));

        let mut root = Module::new("c.mojom", "root");
        root.imports.push(Arc::new(middle));
        root.imports.push(Arc::new(direct));
        let table = KindTable::for_module(&root);

        assert_eq!(
            table.parse("x:sample.Point").unwrap(),
            Kind::Struct(DeclRef::new("a.mojom", "sample", "Point"))
        );
        assert!(matches!(
            table.parse("x:sample.Deep"),
            Err(DataError::UnknownKind { .. })
        ));
    }

    #[test]
    fn test_table_collisions() {
        use std::sync::Arc;

        use crate::model::Struct;

        let mut first = Module::new("x.mojom", "shared");
        first.structs.push(Struct::new("Point", "x.mojom"));
        let mut second = Module::new("y.mojom", "shared");
        second.structs.push(Struct::new("Point", "y.mojom"));

        let mut root = Module::new("root.mojom", "root");
        root.imports.push(Arc::new(first.clone()));
        root.imports.push(Arc::new(second));
        let table = KindTable::for_module(&root);
        let err = table.parse("a:x:shared.Point").unwrap_err();
        assert_eq!(
            err.to_string(),
            "kind 'x:shared.Point' is declared by more than one import: x.mojom, y.mojom"
        );

        // A local declaration shadows the imported one.
        let mut local = Module::new("root.mojom", "shared");
        local.structs.push(Struct::new("Point", "root.mojom"));
        local.imports.push(Arc::new(first));
        assert_eq!(
            KindTable::for_module(&local).parse("x:shared.Point").unwrap(),
            Kind::Struct(DeclRef::new("root.mojom", "shared", "Point"))
        );
    }

    #[test]
    fn test_reference_kinds() {
        assert!(Kind::String.is_reference());
        assert!(!Kind::Int32.is_reference());
        assert!(!Kind::Enum(DeclRef::new("a", "", "E")).is_reference());
        assert!(Kind::Enum(DeclRef::new("a", "", "E")).is_map_key());
        assert!(!Kind::array(Kind::Bool).is_map_key());
        assert_eq!(Kind::Uint8.int_range(), Some((0, 255)));
    }
}
