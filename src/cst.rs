//! Syntax tree for mojom sources.
//!
//! The parser produces these nodes without any semantic resolution: type
//! names are kept as dotted names, constant values as unevaluated
//! expressions. Every node keeps its source span for diagnostics.

use crate::interner;
use crate::lexer::token::Ident;
use crate::span::Span;

/// One parsed `.mojom` file
#[derive(Debug, Clone, PartialEq)]
pub struct ParseTree {
    pub filename: String,
    pub module: Option<ModuleDecl>,
    pub imports: Vec<ImportDecl>,
    pub definitions: Vec<Definition>,
}

/// `module foo.bar;`
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDecl {
    pub span: Span,
    pub attributes: Vec<Attribute>,
    pub name: QualifiedName,
}

/// `import "path.mojom";`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub span: Span,
    pub path: String,
}

/// Dotted name (`Foo`, `ns.Foo`, `Outer.Inner`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub parts: Vec<Ident>,
}

impl QualifiedName {
    pub fn to_dotted(&self) -> String {
        interner::join(&self.parts)
    }
}

/// `[Key=Value, Flag]`
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub span: Span,
    pub key: Ident,
    pub value: Option<AttributeLiteral>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeLiteral {
    Name(QualifiedName),
    String(String),
    Integer(i64),
    Bool(bool),
}

/// Top-level declaration
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Struct(StructDef),
    Union(UnionDef),
    Enum(EnumDef),
    Interface(InterfaceDef),
    Const(ConstDef),
}

impl Definition {
    pub fn span(&self) -> Span {
        match self {
            Definition::Struct(d) => d.span,
            Definition::Union(d) => d.span,
            Definition::Enum(d) => d.span,
            Definition::Interface(d) => d.span,
            Definition::Const(d) => d.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub span: Span,
    pub attributes: Vec<Attribute>,
    pub name: Ident,
    pub members: Vec<StructMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StructMember {
    Field(FieldDef),
    Enum(EnumDef),
    Const(ConstDef),
}

/// Struct or union field: `kind name@ordinal = default;`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub span: Span,
    pub attributes: Vec<Attribute>,
    pub ty: TypeExpr,
    pub name: Ident,
    pub ordinal: Option<u32>,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionDef {
    pub span: Span,
    pub attributes: Vec<Attribute>,
    pub name: Ident,
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub span: Span,
    pub attributes: Vec<Attribute>,
    pub name: Ident,
    pub values: Vec<EnumValueDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueDef {
    pub span: Span,
    pub attributes: Vec<Attribute>,
    pub name: Ident,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDef {
    pub span: Span,
    pub attributes: Vec<Attribute>,
    pub name: Ident,
    pub members: Vec<InterfaceMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterfaceMember {
    Method(MethodDef),
    Enum(EnumDef),
    Const(ConstDef),
}

/// `Name@ordinal(params) => (response);`
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    pub span: Span,
    pub attributes: Vec<Attribute>,
    pub name: Ident,
    pub ordinal: Option<u32>,
    pub params: Vec<ParamDef>,
    /// `None` when the method has no `=>` clause
    pub response: Option<Vec<ParamDef>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDef {
    pub span: Span,
    pub attributes: Vec<Attribute>,
    pub ty: TypeExpr,
    pub name: Ident,
    pub ordinal: Option<u32>,
}

/// `const kind NAME = expr;`
#[derive(Debug, Clone, PartialEq)]
pub struct ConstDef {
    pub span: Span,
    pub attributes: Vec<Attribute>,
    pub ty: TypeExpr,
    pub name: Ident,
    pub value: Expr,
}

/// Type as written in the source
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// Primitive or user-defined name; resolved by the translator
    Named { span: Span, name: QualifiedName },
    Array {
        span: Span,
        element: Box<TypeExpr>,
        length: Option<u64>,
    },
    Map {
        span: Span,
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    /// `handle` or `handle<message_pipe>`
    Handle { span: Span, subtype: Option<Ident> },
    /// `Name&`
    InterfaceRequest { span: Span, name: QualifiedName },
    Nullable { span: Span, inner: Box<TypeExpr> },
}

impl TypeExpr {
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Named { span, .. }
            | TypeExpr::Array { span, .. }
            | TypeExpr::Map { span, .. }
            | TypeExpr::Handle { span, .. }
            | TypeExpr::InterfaceRequest { span, .. }
            | TypeExpr::Nullable { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        };
        f.write_str(op)
    }
}

/// Unevaluated constant expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Integer { span: Span, value: u64 },
    Float { span: Span, value: f64 },
    String { span: Span, value: String },
    Bool { span: Span, value: bool },
    /// The `default` keyword
    Default { span: Span },
    Name { span: Span, name: QualifiedName },
    Unary {
        span: Span,
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        span: Span,
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Integer { span, .. }
            | Expr::Float { span, .. }
            | Expr::String { span, .. }
            | Expr::Bool { span, .. }
            | Expr::Default { span }
            | Expr::Name { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. } => *span,
        }
    }
}
