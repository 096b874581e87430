//! Symbol tables for one module being translated.
//!
//! Declarations of the module itself are looked up from the innermost scope
//! outward; declarations of direct imports are found by fully qualified name
//! or under the import's namespace, and must match exactly one import.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cst::{QualifiedName, TypeExpr};
use crate::diagnostics::TranslateError;
use crate::interner;
use crate::model::{Kind, Module, Value};

/// A value declared in the module being translated; evaluated lazily.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum LocalValue {
    Const(usize),
    EnumLabel { enum_index: usize, label: usize },
}

/// Result of looking up a value name.
#[derive(Debug, Clone)]
pub(crate) enum ValueTarget {
    Local(LocalValue),
    Imported(Value),
}

struct ImportedScope {
    module: String,
    namespace: String,
    types: HashMap<String, Kind>,
    values: HashMap<String, Value>,
}

pub(crate) struct Scope {
    namespace: String,
    types: HashMap<String, Kind>,
    values: HashMap<String, LocalValue>,
    imports: Vec<ImportedScope>,
}

/// `prefix.name`, or `name` under the root scope.
pub(crate) fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Candidate qualified names for `name` seen from `scope_path`, innermost first.
fn scope_walk(name: &str, scope_path: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    let mut prefix = scope_path;
    loop {
        candidates.push(qualify(prefix, name));
        if prefix.is_empty() {
            break;
        }
        prefix = prefix.rsplit_once('.').map(|(outer, _)| outer).unwrap_or("");
    }
    candidates
}

impl Scope {
    pub fn new(namespace: &str, imports: &[Arc<Module>]) -> Self {
        Scope {
            namespace: namespace.to_string(),
            types: HashMap::new(),
            values: HashMap::new(),
            imports: imports.iter().map(|m| imported_scope(m)).collect(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn add_type(&mut self, qualified: String, kind: Kind) {
        self.types.insert(qualified, kind);
    }

    pub fn add_value(&mut self, qualified: String, value: LocalValue) {
        self.values.insert(qualified, value);
    }

    /// Find a declaration kind by dotted name.
    pub fn lookup_type(&self, name: &str, scope_path: &str) -> Result<Option<Kind>, TranslateError> {
        let candidates = scope_walk(name, scope_path);
        if let Some(kind) = candidates.iter().find_map(|c| self.types.get(c)) {
            return Ok(Some(kind.clone()));
        }
        self.lookup_imported(name, &candidates, |scope| &scope.types)
    }

    /// Find a constant or enum label by dotted name. `hint` is an extra
    /// innermost scope, used to find bare labels of an enum-typed target.
    pub fn lookup_value(
        &self,
        name: &str,
        scope_path: &str,
        hint: Option<&str>,
    ) -> Result<Option<ValueTarget>, TranslateError> {
        let mut candidates = Vec::new();
        if let Some(hint) = hint {
            candidates.push(qualify(hint, name));
        }
        candidates.extend(scope_walk(name, scope_path));
        if let Some(local) = candidates.iter().find_map(|c| self.values.get(c)) {
            return Ok(Some(ValueTarget::Local(*local)));
        }
        Ok(self
            .lookup_imported(name, &candidates, |scope| &scope.values)?
            .map(ValueTarget::Imported))
    }

    fn lookup_imported<T: Clone>(
        &self,
        name: &str,
        candidates: &[String],
        table: impl Fn(&ImportedScope) -> &HashMap<String, T>,
    ) -> Result<Option<T>, TranslateError> {
        let mut hits: Vec<(String, T)> = Vec::new();
        for import in &self.imports {
            let under_namespace = qualify(&import.namespace, name);
            let found = candidates
                .iter()
                .chain(std::iter::once(&under_namespace))
                .find_map(|c| table(import).get(c).map(|t| (c, t)));
            if let Some((qualified, item)) = found {
                let id = format!("{}:{}", import.module, qualified);
                if !hits.iter().any(|(existing, _)| *existing == id) {
                    hits.push((id, item.clone()));
                }
            }
        }
        match hits.len() {
            0 => Ok(None),
            1 => Ok(hits.pop().map(|(_, item)| item)),
            _ => Err(TranslateError::AmbiguousReference {
                name: name.to_string(),
                candidates: hits.into_iter().map(|(id, _)| id).collect(),
            }),
        }
    }

    /// Resolve a written type to a kind.
    pub fn resolve_type(
        &self,
        ty: &TypeExpr,
        scope_path: &str,
        context: &str,
    ) -> Result<Kind, TranslateError> {
        match ty {
            TypeExpr::Named { name, .. } => {
                if let [single] = name.parts.as_slice() {
                    if let Some(kind) = Kind::primitive(&interner::name(*single)) {
                        return Ok(kind);
                    }
                }
                self.resolve_decl(name, scope_path, context)
            }
            TypeExpr::Array {
                element, length, ..
            } => {
                let element = self.resolve_type(element, scope_path, context)?;
                match length {
                    None => Ok(Kind::array(element)),
                    Some(n) => match u32::try_from(*n) {
                        Ok(n) => Ok(Kind::fixed_array(element, n)),
                        Err(_) => Err(TranslateError::ValueOutOfRange {
                            context: context.to_string(),
                            kind: "array length".to_string(),
                            value: n.to_string(),
                        }),
                    },
                }
            }
            TypeExpr::Map { key, value, .. } => {
                let key = self.resolve_type(key, scope_path, context)?;
                if key.is_nullable() || !key.is_map_key() {
                    return Err(TranslateError::InvalidMapKey {
                        kind: key.spec(),
                        context: context.to_string(),
                    });
                }
                let value = self.resolve_type(value, scope_path, context)?;
                Ok(Kind::map(key, value))
            }
            TypeExpr::Handle { subtype, .. } => {
                let subtype = subtype.map(interner::name);
                Kind::handle(subtype.as_deref()).ok_or_else(|| TranslateError::UnresolvedType {
                    name: format!("handle<{}>", subtype.unwrap_or_default()),
                    context: context.to_string(),
                })
            }
            TypeExpr::InterfaceRequest { name, .. } => {
                let target = self.resolve_decl(name, scope_path, context)?;
                Kind::interface_request(&target)
            }
            TypeExpr::Nullable { inner, .. } => {
                let inner = self.resolve_type(inner, scope_path, context)?;
                if !inner.is_reference() {
                    return Err(TranslateError::InvalidNullable {
                        kind: inner.spec(),
                        context: context.to_string(),
                    });
                }
                Ok(Kind::nullable(inner))
            }
        }
    }

    fn resolve_decl(
        &self,
        name: &QualifiedName,
        scope_path: &str,
        context: &str,
    ) -> Result<Kind, TranslateError> {
        let dotted = name.to_dotted();
        self.lookup_type(&dotted, scope_path)?
            .ok_or_else(|| TranslateError::UnresolvedType {
                name: dotted,
                context: context.to_string(),
            })
    }
}

fn imported_scope(module: &Module) -> ImportedScope {
    let types = module
        .declared_kinds()
        .into_iter()
        .filter_map(|kind| kind.decl().map(|d| (d.qualified_name(), kind.clone())))
        .collect();

    let mut values = HashMap::new();
    let ns = module.namespace.as_str();
    let mut add_constants = |prefix: &str, constants: &[crate::model::Constant]| {
        for c in constants {
            values.insert(qualify(prefix, &c.name), c.value.clone());
        }
    };
    add_constants(ns, &module.constants);
    for s in &module.structs {
        add_constants(&qualify(ns, &s.name), &s.constants);
    }
    for i in &module.interfaces {
        add_constants(&qualify(ns, &i.name), &i.constants);
    }

    let mut enums: Vec<(String, &crate::model::Enum)> =
        module.enums.iter().map(|e| (e.name.clone(), e)).collect();
    for s in &module.structs {
        enums.extend(s.enums.iter().map(|e| (format!("{}.{}", s.name, e.name), e)));
    }
    for i in &module.interfaces {
        enums.extend(i.enums.iter().map(|e| (format!("{}.{}", i.name, e.name), e)));
    }
    for (path, e) in enums {
        let decl = module.decl_ref(path);
        let qualified = decl.qualified_name();
        for field in &e.fields {
            values.insert(
                qualify(&qualified, &field.name),
                Value::Enum {
                    kind: decl.clone(),
                    label: field.name.clone(),
                    value: field.value,
                },
            );
        }
    }

    ImportedScope {
        module: module.name.clone(),
        namespace: module.namespace.clone(),
        types,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Constant, DeclRef, Struct};

    #[test]
    fn test_scope_walk_order() {
        assert_eq!(
            scope_walk("Color", "sample.Outer"),
            vec!["sample.Outer.Color", "sample.Color", "Color"]
        );
        assert_eq!(scope_walk("Foo", ""), vec!["Foo"]);
    }

    #[test]
    fn test_innermost_declaration_wins() {
        let mut scope = Scope::new("sample", &[]);
        scope.add_type("sample.Color".into(), Kind::Enum(DeclRef::new("a", "sample", "Color")));
        scope.add_type(
            "sample.Outer.Color".into(),
            Kind::Enum(DeclRef::new("a", "sample", "Outer.Color")),
        );
        let inner = scope.lookup_type("Color", "sample.Outer").unwrap().unwrap();
        assert_eq!(inner.spec(), "x:sample.Outer.Color");
        let outer = scope.lookup_type("Color", "sample").unwrap().unwrap();
        assert_eq!(outer.spec(), "x:sample.Color");
    }

    fn import_with_point(name: &str, namespace: &str) -> Arc<Module> {
        let mut module = Module::new(name, namespace);
        module.structs.push(Struct::new("Point", name));
        module
            .constants
            .push(Constant::new("kLimit", Kind::Int32, Value::Int(4)));
        Arc::new(module)
    }

    #[test]
    fn test_import_lookup_by_namespace() {
        let scope = Scope::new("app", &[import_with_point("geo.mojom", "geo")]);
        let bare = scope.lookup_type("Point", "app").unwrap().unwrap();
        let qualified = scope.lookup_type("geo.Point", "app").unwrap().unwrap();
        assert_eq!(bare, qualified);
        assert!(matches!(
            scope.lookup_value("kLimit", "app", None).unwrap(),
            Some(ValueTarget::Imported(Value::Int(4)))
        ));
    }

    #[test]
    fn test_ambiguous_import_reference() {
        let scope = Scope::new(
            "app",
            &[
                import_with_point("a.mojom", "a"),
                import_with_point("b.mojom", "b"),
            ],
        );
        let err = scope.lookup_type("Point", "app").unwrap_err();
        assert_eq!(err.code(), "AmbiguousReference");
        assert!(scope.lookup_type("a.Point", "app").unwrap().is_some());
    }
}
