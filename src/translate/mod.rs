//! Translation of a parse tree into a semantic [`Module`].
//!
//! Passes run in order: import resolution, declaration registration, type
//! resolution with constant evaluation and ordinal assignment, then member
//! validation. Import failures abort immediately; everything after that is
//! collected and reported together.

pub mod consts;
pub mod ordinals;
pub mod scope;
pub mod validate;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use crate::cst::*;
use crate::diagnostics::{CompilerError, TranslateDiagnostic, TranslateError};
use crate::interner;
use crate::model::{self, AttributeValue, Attributes, Kind, Module};

pub use ordinals::assign_ordinals;

use consts::{Evaluator, PendingConst, PendingEnum};
use scope::{qualify, LocalValue, Scope};
use validate::{validate_members, Member, MemberSet};

/// Supplies translated modules for `import` statements.
pub trait ImportResolver {
    /// Module for `import` as written in the file `importer`.
    fn resolve(&mut self, import: &str, importer: &str) -> Result<Arc<Module>, CompilerError>;
}

/// Prebuilt modules keyed by import path.
impl ImportResolver for HashMap<String, Arc<Module>> {
    fn resolve(&mut self, import: &str, importer: &str) -> Result<Arc<Module>, CompilerError> {
        self.get(import)
            .cloned()
            .ok_or_else(|| CompilerError::ImportNotFound {
                import: import.to_string(),
                importer: importer.to_string(),
            })
    }
}

/// Translate errors of one file, in the order they were found.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    filename: String,
    items: Vec<TranslateDiagnostic>,
}

impl Diagnostics {
    fn new(filename: &str) -> Self {
        Diagnostics {
            filename: filename.to_string(),
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, line: u32, error: TranslateError) {
        self.items.push(TranslateDiagnostic {
            filename: self.filename.clone(),
            line,
            error,
        });
    }

    fn finish<T>(self, value: T) -> Result<T, CompilerError> {
        if self.items.is_empty() {
            Ok(value)
        } else {
            Err(CompilerError::Translate(self.items))
        }
    }
}

/// Translate one parse tree, resolving its imports through `resolver`.
pub fn translate(
    tree: &ParseTree,
    resolver: &mut dyn ImportResolver,
) -> Result<Module, CompilerError> {
    let start = Instant::now();
    let mut imports = Vec::with_capacity(tree.imports.len());
    for import in &tree.imports {
        log::trace!("{}: import '{}'", tree.filename, import.path);
        imports.push(resolver.resolve(&import.path, &tree.filename)?);
    }

    let mut translator = Translator::new(tree, imports);
    translator.register_declarations();
    let module = translator.build_module();
    validate_members(&translator.member_sets, &mut translator.diags);

    log::debug!(
        "translated {} ({} errors) in {:.2?}",
        tree.filename,
        translator.diags.items.len(),
        start.elapsed()
    );
    translator.diags.finish(module)
}

fn attributes(attrs: &[Attribute]) -> Attributes {
    attrs
        .iter()
        .map(|attr| {
            let value = match &attr.value {
                None => AttributeValue::Bool(true),
                Some(AttributeLiteral::Bool(b)) => AttributeValue::Bool(*b),
                Some(AttributeLiteral::Integer(n)) => AttributeValue::Int(*n),
                Some(AttributeLiteral::String(s)) => AttributeValue::String(s.clone()),
                Some(AttributeLiteral::Name(name)) => AttributeValue::String(name.to_dotted()),
            };
            (interner::name(attr.key), value)
        })
        .collect()
}

struct Translator<'t> {
    tree: &'t ParseTree,
    namespace: String,
    imports: Vec<Arc<Module>>,
    eval: Evaluator<'t>,
    diags: Diagnostics,
    declared: HashSet<String>,
    member_sets: Vec<MemberSet>,
    // Declaration order cursors, shared by registration and building
    next_const: usize,
    next_enum: usize,
}

impl<'t> Translator<'t> {
    fn new(tree: &'t ParseTree, imports: Vec<Arc<Module>>) -> Self {
        let namespace = tree
            .module
            .as_ref()
            .map(|m| m.name.to_dotted())
            .unwrap_or_default();
        Translator {
            tree,
            eval: Evaluator::new(Scope::new(&namespace, &imports)),
            namespace,
            imports,
            diags: Diagnostics::new(&tree.filename),
            declared: HashSet::new(),
            member_sets: Vec::new(),
            next_const: 0,
            next_enum: 0,
        }
    }

    fn decl_ref(&self, path: &str) -> model::DeclRef {
        model::DeclRef::new(self.tree.filename.clone(), self.namespace.clone(), path)
    }

    // ===== Declaration registration =====

    /// Claim `parent.name`; a second claim is a duplicate declaration.
    fn declare(&mut self, parent: &str, name: &str, line: u32) -> bool {
        if self.declared.insert(qualify(parent, name)) {
            return true;
        }
        let scope = if parent.is_empty() {
            self.tree.filename.clone()
        } else {
            parent.to_string()
        };
        self.diags.push(
            line,
            TranslateError::DuplicateDeclaration {
                name: name.to_string(),
                scope,
            },
        );
        false
    }

    fn register_declarations(&mut self) {
        let tree = self.tree;
        let ns = self.namespace.clone();
        for def in &tree.definitions {
            match def {
                Definition::Struct(s) => {
                    let name = interner::name(s.name);
                    let path = qualify(&ns, &name);
                    if self.declare(&ns, &name, s.span.line()) {
                        let kind = Kind::Struct(self.decl_ref(&name));
                        self.eval.scope.add_type(path.clone(), kind);
                    }
                    for member in &s.members {
                        match member {
                            StructMember::Enum(e) => self.register_enum(e, &path, &name),
                            StructMember::Const(c) => self.register_const(c, &path),
                            StructMember::Field(_) => {}
                        }
                    }
                }
                Definition::Union(u) => {
                    let name = interner::name(u.name);
                    if self.declare(&ns, &name, u.span.line()) {
                        let kind = Kind::Union(self.decl_ref(&name));
                        self.eval.scope.add_type(qualify(&ns, &name), kind);
                    }
                }
                Definition::Enum(e) => self.register_enum(e, &ns, ""),
                Definition::Interface(i) => {
                    let name = interner::name(i.name);
                    let path = qualify(&ns, &name);
                    if self.declare(&ns, &name, i.span.line()) {
                        let kind = Kind::Interface(self.decl_ref(&name));
                        self.eval.scope.add_type(path.clone(), kind);
                    }
                    for member in &i.members {
                        match member {
                            InterfaceMember::Enum(e) => self.register_enum(e, &path, &name),
                            InterfaceMember::Const(c) => self.register_const(c, &path),
                            InterfaceMember::Method(_) => {}
                        }
                    }
                }
                Definition::Const(c) => self.register_const(c, &ns),
            }
        }
    }

    /// `parent` is the enclosing qualified scope, `prefix` the enclosing
    /// in-module path (empty at the top level).
    fn register_enum(&mut self, e: &'t EnumDef, parent: &str, prefix: &str) {
        let name = interner::name(e.name);
        let path = qualify(parent, &name);
        let decl = self.decl_ref(&qualify(prefix, &name));
        if self.declare(parent, &name, e.span.line()) {
            self.eval.scope.add_type(path.clone(), Kind::Enum(decl.clone()));
        }
        let enum_index = self.eval.enums.len();
        self.eval.enums.push(PendingEnum { def: e, decl });
        for (label, value) in e.values.iter().enumerate() {
            let label_name = interner::name(value.name);
            if self.declare(&path, &label_name, value.span.line()) {
                self.eval.scope.add_value(
                    qualify(&path, &label_name),
                    LocalValue::EnumLabel { enum_index, label },
                );
            }
        }
    }

    fn register_const(&mut self, c: &'t ConstDef, parent: &str) {
        let name = interner::name(c.name);
        let index = self.eval.consts.len();
        self.eval.consts.push(PendingConst {
            def: c,
            scope_path: parent.to_string(),
        });
        if self.declare(parent, &name, c.span.line()) {
            self.eval
                .scope
                .add_value(qualify(parent, &name), LocalValue::Const(index));
        }
    }

    // ===== Module construction =====

    fn build_module(&mut self) -> Module {
        let tree = self.tree;
        let mut module = Module::new(tree.filename.clone(), self.namespace.clone());
        module.imports = self.imports.clone();
        if let Some(decl) = &tree.module {
            module.attributes = attributes(&decl.attributes);
        }
        for def in &tree.definitions {
            match def {
                Definition::Struct(s) => module.structs.push(self.build_struct(s)),
                Definition::Union(u) => module.unions.push(self.build_union(u)),
                Definition::Enum(e) => module.enums.push(self.build_enum(e)),
                Definition::Interface(i) => module.interfaces.push(self.build_interface(i)),
                Definition::Const(c) => module.constants.extend(self.build_const(c)),
            }
        }
        module
    }

    /// Resolve a kind, reporting failures at `line`.
    fn resolve(&mut self, ty: &TypeExpr, scope_path: &str, context: &str, line: u32) -> Option<Kind> {
        match self.eval.scope.resolve_type(ty, scope_path, context) {
            Ok(kind) => Some(kind),
            Err(e) => {
                self.diags.push(line, e);
                None
            }
        }
    }

    /// Build fields with assigned ordinals and record them for validation.
    fn build_fields(
        &mut self,
        fields: &[&'t FieldDef],
        owner: &str,
        scope_path: &str,
        line: u32,
        dense: bool,
    ) -> Vec<model::Field> {
        let explicit: Vec<Option<u32>> = fields.iter().map(|f| f.ordinal).collect();
        let assigned = assign_ordinals(&explicit);
        let mut members = Vec::with_capacity(fields.len());
        let mut built = Vec::with_capacity(fields.len());

        for (&f, ordinal) in fields.iter().zip(assigned) {
            let name = interner::name(f.name);
            let line_no = f.span.line();
            members.push(Member {
                name: name.clone(),
                ordinal,
                line: line_no,
            });
            let context = format!("field '{}' of {}", name, owner);
            let Some(kind) = self.resolve(&f.ty, scope_path, &context, line_no) else {
                continue;
            };
            let mut field = model::Field::new(name, kind, Some(ordinal));
            field.attributes = attributes(&f.attributes);
            if let Some(expr) = &f.default {
                match self.eval.field_default(expr, &field.kind, scope_path, &context, &mut self.diags) {
                    Ok(value) => field.default_value = value,
                    Err(e) => self.diags.push(line_no, e),
                }
            }
            built.push(field);
        }

        self.member_sets.push(MemberSet {
            scope: owner.to_string(),
            line,
            dense,
            members,
        });
        built
    }

    fn build_struct(&mut self, s: &'t StructDef) -> model::Struct {
        let name = interner::name(s.name);
        let path = qualify(&self.namespace, &name);
        let mut result = model::Struct::new(name.clone(), self.tree.filename.clone());
        result.attributes = attributes(&s.attributes);

        let mut fields = Vec::new();
        for member in &s.members {
            match member {
                StructMember::Field(f) => fields.push(f),
                StructMember::Enum(e) => result.enums.push(self.build_enum(e)),
                StructMember::Const(c) => result.constants.extend(self.build_const(c)),
            }
        }
        let owner = format!("struct {}", name);
        result.fields = self.build_fields(&fields, &owner, &path, s.span.line(), true);
        result
    }

    fn build_union(&mut self, u: &'t UnionDef) -> model::Union {
        let name = interner::name(u.name);
        let path = qualify(&self.namespace, &name);
        let mut result = model::Union::new(name.clone(), self.tree.filename.clone());
        result.attributes = attributes(&u.attributes);
        let fields: Vec<&FieldDef> = u.fields.iter().collect();
        let owner = format!("union {}", name);
        result.fields = self.build_fields(&fields, &owner, &path, u.span.line(), false);
        result
    }

    fn build_enum(&mut self, e: &'t EnumDef) -> model::Enum {
        let index = self.next_enum;
        self.next_enum += 1;
        let mut result = model::Enum::new(interner::name(e.name), self.tree.filename.clone());
        result.attributes = attributes(&e.attributes);
        for (label, def) in e.values.iter().enumerate() {
            if let Some(value) = self.eval.enum_label(index, label, &mut self.diags) {
                let mut field = model::EnumField::new(interner::name(def.name), value);
                field.attributes = attributes(&def.attributes);
                result.fields.push(field);
            }
        }
        result
    }

    fn build_const(&mut self, c: &'t ConstDef) -> Option<model::Constant> {
        let index = self.next_const;
        self.next_const += 1;
        let (kind, value) = self.eval.constant(index, &mut self.diags)?;
        let mut constant = model::Constant::new(interner::name(c.name), kind, value);
        constant.attributes = attributes(&c.attributes);
        Some(constant)
    }

    fn build_interface(&mut self, i: &'t InterfaceDef) -> model::Interface {
        let name = interner::name(i.name);
        let path = qualify(&self.namespace, &name);
        let mut result = model::Interface::new(name.clone(), self.tree.filename.clone());
        result.attributes = attributes(&i.attributes);
        result.client = self.resolve_client(i, &name);

        let mut methods = Vec::new();
        for member in &i.members {
            match member {
                InterfaceMember::Method(m) => methods.push(m),
                InterfaceMember::Enum(e) => result.enums.push(self.build_enum(e)),
                InterfaceMember::Const(c) => result.constants.extend(self.build_const(c)),
            }
        }

        let explicit: Vec<Option<u32>> = methods.iter().map(|m| m.ordinal).collect();
        let mut members = Vec::with_capacity(methods.len());
        for (m, ordinal) in methods.iter().zip(assign_ordinals(&explicit)) {
            let method_name = interner::name(m.name);
            members.push(Member {
                name: method_name.clone(),
                ordinal,
                line: m.span.line(),
            });
            let qualified_method = format!("{}.{}", name, method_name);
            let mut method = model::Method::new(method_name, ordinal);
            method.attributes = attributes(&m.attributes);
            method.parameters =
                self.build_parameters(&m.params, &format!("method {}", qualified_method), &path, m.span.line());
            method.response_parameters = m.response.as_ref().map(|response| {
                let owner = format!("response of method {}", qualified_method);
                self.build_parameters(response, &owner, &path, m.span.line())
            });
            result.methods.push(method);
        }
        self.member_sets.push(MemberSet {
            scope: format!("interface {}", name),
            line: i.span.line(),
            dense: false,
            members,
        });
        result
    }

    fn build_parameters(
        &mut self,
        params: &[ParamDef],
        owner: &str,
        scope_path: &str,
        line: u32,
    ) -> Vec<model::Parameter> {
        let explicit: Vec<Option<u32>> = params.iter().map(|p| p.ordinal).collect();
        let mut members = Vec::with_capacity(params.len());
        let mut built = Vec::with_capacity(params.len());
        for (p, ordinal) in params.iter().zip(assign_ordinals(&explicit)) {
            let name = interner::name(p.name);
            members.push(Member {
                name: name.clone(),
                ordinal,
                line: p.span.line(),
            });
            let context = format!("parameter '{}' of {}", name, owner);
            if let Some(kind) = self.resolve(&p.ty, scope_path, &context, p.span.line()) {
                let mut param = model::Parameter::new(name, kind, ordinal);
                param.attributes = attributes(&p.attributes);
                built.push(param);
            }
        }
        self.member_sets.push(MemberSet {
            scope: owner.to_string(),
            line,
            dense: false,
            members,
        });
        built
    }

    /// `[Client=Name]` must name an interface.
    fn resolve_client(&mut self, i: &InterfaceDef, interface: &str) -> Option<String> {
        let attr = i
            .attributes
            .iter()
            .rev()
            .find(|a| interner::name(a.key) == "Client")?;
        let line = attr.span.line();
        let name = match &attr.value {
            Some(AttributeLiteral::Name(name)) => name.to_dotted(),
            Some(AttributeLiteral::String(s)) => s.clone(),
            _ => {
                self.diags.push(
                    line,
                    TranslateError::InvalidClient {
                        name: "<missing>".to_string(),
                        interface: interface.to_string(),
                    },
                );
                return None;
            }
        };
        match self.eval.scope.lookup_type(&name, &self.namespace) {
            Ok(Some(Kind::Interface(_))) => Some(name),
            Ok(Some(_)) => {
                self.diags.push(
                    line,
                    TranslateError::InvalidClient {
                        name,
                        interface: interface.to_string(),
                    },
                );
                None
            }
            Ok(None) => {
                self.diags.push(
                    line,
                    TranslateError::UnresolvedType {
                        name,
                        context: format!("client of interface '{}'", interface),
                    },
                );
                None
            }
            Err(e) => {
                self.diags.push(line, e);
                None
            }
        }
    }
}
