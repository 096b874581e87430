//! The semantic module model.
//!
//! A [`Module`] is built once per compilation unit by the translator (or
//! decoded from module data) and is immutable afterwards. Imported modules
//! are shared through `Arc` so every backend thread can read the same graph.

pub mod data;
pub mod kind;

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use data::{module_from_data, module_to_data};
pub use kind::{DeclRef, InterfaceRef, Kind, KindTable};

/// Attribute value as written in `[Key=Value]`; a bare key is `Bool(true)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    String(String),
}

/// Attributes in the order they were written.
pub type Attributes = IndexMap<String, AttributeValue>;

/// An evaluated constant value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Enum {
        kind: DeclRef,
        label: String,
        value: i64,
    },
    /// `default`: the default-constructed value of a struct-typed field.
    Default,
}

impl Value {
    pub fn describe(&self) -> String {
        match self {
            Value::Bool(b) => format!("bool {}", b),
            Value::Int(n) => format!("integer {}", n),
            Value::Float(x) => format!("float {}", x),
            Value::String(s) => format!("string {:?}", s),
            Value::Enum { kind, label, .. } => format!("enum value {}.{}", kind.name, label),
            Value::Default => "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    /// Source file identifier, e.g. `sub/base.mojom`
    pub name: String,
    /// Dotted namespace; empty without a `module` statement
    pub namespace: String,
    pub attributes: Attributes,
    pub imports: Vec<Arc<Module>>,
    pub structs: Vec<Struct>,
    pub unions: Vec<Union>,
    pub enums: Vec<Enum>,
    pub interfaces: Vec<Interface>,
    pub constants: Vec<Constant>,
}

impl Module {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Reference to a declaration of this module by in-module path.
    pub fn decl_ref(&self, path: impl Into<String>) -> DeclRef {
        DeclRef::new(self.name.clone(), self.namespace.clone(), path)
    }

    pub fn find_struct(&self, name: &str) -> Option<&Struct> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn find_union(&self, name: &str) -> Option<&Union> {
        self.unions.iter().find(|u| u.name == name)
    }

    pub fn find_interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// Look up an enum by in-module path (`Color` or `Outer.Color`).
    pub fn find_enum(&self, path: &str) -> Option<&Enum> {
        match path.split_once('.') {
            None => self.enums.iter().find(|e| e.name == path),
            Some((outer, inner)) => {
                let nested = self
                    .find_struct(outer)
                    .map(|s| &s.enums)
                    .or_else(|| self.find_interface(outer).map(|i| &i.enums))?;
                nested.iter().find(|e| e.name == inner)
            }
        }
    }

    /// Kinds of every struct, union, enum and interface declared here,
    /// nested enums included, in declaration order.
    pub fn declared_kinds(&self) -> Vec<Kind> {
        let mut kinds = Vec::new();
        for s in &self.structs {
            kinds.push(Kind::Struct(self.decl_ref(&s.name)));
            for e in &s.enums {
                kinds.push(Kind::Enum(self.decl_ref(format!("{}.{}", s.name, e.name))));
            }
        }
        for u in &self.unions {
            kinds.push(Kind::Union(self.decl_ref(&u.name)));
        }
        for e in &self.enums {
            kinds.push(Kind::Enum(self.decl_ref(&e.name)));
        }
        for i in &self.interfaces {
            kinds.push(Kind::Interface(self.decl_ref(&i.name)));
            for e in &i.enums {
                kinds.push(Kind::Enum(self.decl_ref(format!("{}.{}", i.name, e.name))));
            }
        }
        kinds
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Struct {
    pub name: String,
    /// Name of the owning module
    pub module: String,
    pub attributes: Attributes,
    pub fields: Vec<Field>,
    pub enums: Vec<Enum>,
    pub constants: Vec<Constant>,
}

impl Struct {
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        Struct {
            name: name.into(),
            module: module.into(),
            attributes: Attributes::new(),
            fields: Vec::new(),
            enums: Vec::new(),
            constants: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: Kind,
    pub ordinal: Option<u32>,
    pub default_value: Option<Value>,
    pub attributes: Attributes,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: Kind, ordinal: Option<u32>) -> Self {
        Field {
            name: name.into(),
            kind,
            ordinal,
            default_value: None,
            attributes: Attributes::new(),
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Union {
    pub name: String,
    pub module: String,
    pub attributes: Attributes,
    pub fields: Vec<Field>,
}

impl Union {
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        Union {
            name: name.into(),
            module: module.into(),
            attributes: Attributes::new(),
            fields: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enum {
    pub name: String,
    pub module: String,
    pub attributes: Attributes,
    pub fields: Vec<EnumField>,
}

impl Enum {
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        Enum {
            name: name.into(),
            module: module.into(),
            attributes: Attributes::new(),
            fields: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumField {
    pub name: String,
    pub value: i64,
    pub attributes: Attributes,
}

impl EnumField {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        EnumField {
            name: name.into(),
            value,
            attributes: Attributes::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Interface {
    pub name: String,
    pub module: String,
    pub attributes: Attributes,
    /// Name of the client interface (`[Client=Name]`)
    pub client: Option<String>,
    pub methods: Vec<Method>,
    pub enums: Vec<Enum>,
    pub constants: Vec<Constant>,
}

impl Interface {
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        Interface {
            name: name.into(),
            module: module.into(),
            attributes: Attributes::new(),
            client: None,
            methods: Vec::new(),
            enums: Vec::new(),
            constants: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub ordinal: u32,
    pub attributes: Attributes,
    pub parameters: Vec<Parameter>,
    /// `None` without a `=>` clause; `Some(vec![])` for `=> ()`
    pub response_parameters: Option<Vec<Parameter>>,
}

impl Method {
    pub fn new(name: impl Into<String>, ordinal: u32) -> Self {
        Method {
            name: name.into(),
            ordinal,
            attributes: Attributes::new(),
            parameters: Vec::new(),
            response_parameters: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub kind: Kind,
    pub ordinal: u32,
    pub attributes: Attributes,
}

impl Parameter {
    pub fn new(name: impl Into<String>, kind: Kind, ordinal: u32) -> Self {
        Parameter {
            name: name.into(),
            kind,
            ordinal,
            attributes: Attributes::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub name: String,
    pub kind: Kind,
    pub value: Value,
    pub attributes: Attributes,
}

impl Constant {
    pub fn new(name: impl Into<String>, kind: Kind, value: Value) -> Self {
        Constant {
            name: name.into(),
            kind,
            value,
            attributes: Attributes::new(),
        }
    }
}
