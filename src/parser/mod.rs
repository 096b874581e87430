//! Recursive-descent parser for mojom.
//!
//! Consumes the lazy token stream from the lexer and produces a
//! [`ParseTree`]. No names are resolved here; forward references and
//! references into not-yet-loaded imports are kept as dotted names.

pub mod lexer_adapter;

use crate::cst::*;
use crate::diagnostics::{CompilerError, LexError, ParseError};
use crate::lexer::{tokenize, Ident, SpannedToken, Token};
use crate::span::Span;
use lexer_adapter::TokenCursor;

/// Parse a token stream into a syntax tree.
pub fn parse<I>(tokens: I, filename: &str) -> Result<ParseTree, CompilerError>
where
    I: IntoIterator<Item = Result<SpannedToken, LexError>>,
{
    let mut parser = Parser::new(tokens.into_iter(), filename);
    parser.parse_file()
}

/// Lex and parse a source text.
pub fn parse_source(source: &str, filename: &str) -> Result<ParseTree, CompilerError> {
    parse(tokenize(source), filename)
}

struct Parser<I> {
    cursor: TokenCursor<I>,
    filename: String,
}

impl<I> Parser<I>
where
    I: Iterator<Item = Result<SpannedToken, LexError>>,
{
    fn new(tokens: I, filename: &str) -> Self {
        Self {
            cursor: TokenCursor::new(tokens),
            filename: filename.to_string(),
        }
    }

    // ===== Token helpers =====

    fn lex_error(&self, error: LexError) -> CompilerError {
        CompilerError::Lex {
            filename: self.filename.clone(),
            error,
        }
    }

    fn error<T>(&self, span: Span, message: impl Into<String>) -> Result<T, CompilerError> {
        Err(CompilerError::Parse(ParseError {
            filename: self.filename.clone(),
            line: span.pos.line,
            column: span.pos.column,
            message: message.into(),
        }))
    }

    fn peek(&mut self) -> Result<Option<Token>, CompilerError> {
        match self.cursor.peek_token() {
            Ok(token) => Ok(token.cloned()),
            Err(e) => Err(self.lex_error(e)),
        }
    }

    fn peek_is(&mut self, expected: &Token) -> Result<bool, CompilerError> {
        match self.cursor.peek_token() {
            Ok(token) => Ok(token == Some(expected)),
            Err(e) => Err(self.lex_error(e)),
        }
    }

    /// Span of the next token, or of the last token at end of input.
    fn peek_span(&mut self) -> Result<Span, CompilerError> {
        match self.cursor.peek() {
            Ok(Some(t)) => Ok(t.span),
            Ok(None) => Ok(self.cursor.last_span()),
            Err(e) => Err(self.lex_error(e)),
        }
    }

    fn advance(&mut self) -> Result<Option<SpannedToken>, CompilerError> {
        self.cursor.advance().map_err(|e| self.lex_error(e))
    }

    fn unexpected<T>(&mut self, what: &str) -> Result<T, CompilerError> {
        let span = self.peek_span()?;
        match self.peek()? {
            Some(token) => self.error(span, format!("expected {}, found {}", what, token.describe())),
            None => self.error(span, format!("expected {}, found end of file", what)),
        }
    }

    fn eat(&mut self, expected: &Token) -> Result<Option<Span>, CompilerError> {
        if self.peek_is(expected)? {
            Ok(self.advance()?.map(|t| t.span))
        } else {
            Ok(None)
        }
    }

    fn expect(&mut self, expected: Token) -> Result<Span, CompilerError> {
        match self.eat(&expected)? {
            Some(span) => Ok(span),
            None => self.unexpected(&format!("'{}'", expected)),
        }
    }

    fn expect_name(&mut self, what: &str) -> Result<(Ident, Span), CompilerError> {
        if let Some(Token::Name(ident)) = self.peek()? {
            let span = self.peek_span()?;
            self.advance()?;
            return Ok((ident, span));
        }
        self.unexpected(what)
    }

    fn eat_ordinal(&mut self) -> Result<Option<u32>, CompilerError> {
        if let Some(Token::Ordinal(ordinal)) = self.peek()? {
            self.advance()?;
            return Ok(Some(ordinal));
        }
        Ok(None)
    }

    fn qualified_name(&mut self, what: &str) -> Result<(QualifiedName, Span), CompilerError> {
        let (first, mut span) = self.expect_name(what)?;
        let mut parts = vec![first];
        while self.eat(&Token::Dot)?.is_some() {
            let (part, part_span) = self.expect_name("a name after '.'")?;
            parts.push(part);
            span = span.merge(part_span);
        }
        Ok((QualifiedName { parts }, span))
    }

    // ===== File structure =====

    fn parse_file(&mut self) -> Result<ParseTree, CompilerError> {
        let mut pending_attrs = self.attributes()?;
        let mut module = None;

        if self.peek_is(&Token::Module)? {
            let start = self.expect(Token::Module)?;
            let (name, _) = self.qualified_name("a module name")?;
            let end = self.expect(Token::Semicolon)?;
            module = Some(ModuleDecl {
                span: start.merge(end),
                attributes: std::mem::take(&mut pending_attrs),
                name,
            });
        }

        let mut imports = Vec::new();
        while self.peek_is(&Token::Import)? {
            if !pending_attrs.is_empty() {
                let span = pending_attrs[0].span;
                return self.error(span, "attributes are not allowed on import statements");
            }
            let start = self.expect(Token::Import)?;
            let path = match self.peek()? {
                Some(Token::String(path)) => {
                    self.advance()?;
                    path
                }
                _ => return self.unexpected("an import path string"),
            };
            let end = self.expect(Token::Semicolon)?;
            imports.push(ImportDecl {
                span: start.merge(end),
                path,
            });
            pending_attrs = self.attributes()?;
        }

        let mut definitions = Vec::new();
        loop {
            if self.peek()?.is_none() {
                if let Some(attr) = pending_attrs.first() {
                    let span = attr.span;
                    return self.error(span, "attributes must be followed by a declaration");
                }
                break;
            }
            let attributes = std::mem::take(&mut pending_attrs);
            definitions.push(self.definition(attributes)?);
            pending_attrs = self.attributes()?;
        }

        Ok(ParseTree {
            filename: self.filename.clone(),
            module,
            imports,
            definitions,
        })
    }

    fn attributes(&mut self) -> Result<Vec<Attribute>, CompilerError> {
        let mut attributes = Vec::new();
        if self.eat(&Token::LBracket)?.is_none() {
            return Ok(attributes);
        }
        if self.eat(&Token::RBracket)?.is_some() {
            return Ok(attributes);
        }
        loop {
            let (key, span) = self.expect_name("an attribute name")?;
            let value = if self.eat(&Token::Equals)?.is_some() {
                Some(self.attribute_literal()?)
            } else {
                None
            };
            attributes.push(Attribute { span, key, value });
            if self.eat(&Token::Comma)?.is_none() {
                self.expect(Token::RBracket)?;
                return Ok(attributes);
            }
        }
    }

    fn attribute_literal(&mut self) -> Result<AttributeLiteral, CompilerError> {
        match self.peek()? {
            Some(Token::Name(_)) => Ok(AttributeLiteral::Name(self.qualified_name("a name")?.0)),
            Some(Token::String(s)) => {
                self.advance()?;
                Ok(AttributeLiteral::String(s))
            }
            Some(Token::True) => {
                self.advance()?;
                Ok(AttributeLiteral::Bool(true))
            }
            Some(Token::False) => {
                self.advance()?;
                Ok(AttributeLiteral::Bool(false))
            }
            Some(Token::Integer(_)) | Some(Token::Minus) => {
                let span = self.peek_span()?;
                let negative = self.eat(&Token::Minus)?.is_some();
                match self.advance()?.map(|t| t.node) {
                    Some(Token::Integer(n)) if n <= i64::MAX as u64 => {
                        let n = n as i64;
                        Ok(AttributeLiteral::Integer(if negative { -n } else { n }))
                    }
                    _ => self.error(span, "expected an integer attribute value"),
                }
            }
            _ => self.unexpected("an attribute value"),
        }
    }

    // ===== Declarations =====

    fn definition(&mut self, attributes: Vec<Attribute>) -> Result<Definition, CompilerError> {
        match self.peek()? {
            Some(Token::Struct) => Ok(Definition::Struct(self.struct_def(attributes)?)),
            Some(Token::Union) => Ok(Definition::Union(self.union_def(attributes)?)),
            Some(Token::Enum) => Ok(Definition::Enum(self.enum_def(attributes)?)),
            Some(Token::Interface) => Ok(Definition::Interface(self.interface_def(attributes)?)),
            Some(Token::Const) => Ok(Definition::Const(self.const_def(attributes)?)),
            Some(Token::Module) => {
                let span = self.peek_span()?;
                self.error(span, "the module statement must come before imports and declarations")
            }
            Some(Token::Import) => {
                let span = self.peek_span()?;
                self.error(span, "imports must come before declarations")
            }
            _ => self.unexpected("a declaration"),
        }
    }

    fn struct_def(&mut self, attributes: Vec<Attribute>) -> Result<StructDef, CompilerError> {
        let start = self.expect(Token::Struct)?;
        let (name, _) = self.expect_name("a struct name")?;
        self.expect(Token::LBrace)?;
        let mut members = Vec::new();
        loop {
            let attrs = self.attributes()?;
            if attrs.is_empty() && self.peek_is(&Token::RBrace)? {
                break;
            }
            let member = match self.peek()? {
                Some(Token::Enum) => StructMember::Enum(self.enum_def(attrs)?),
                Some(Token::Const) => StructMember::Const(self.const_def(attrs)?),
                _ => StructMember::Field(self.field_def(attrs, true)?),
            };
            members.push(member);
        }
        self.expect(Token::RBrace)?;
        let end = self.expect(Token::Semicolon)?;
        Ok(StructDef {
            span: start.merge(end),
            attributes,
            name,
            members,
        })
    }

    fn field_def(
        &mut self,
        attributes: Vec<Attribute>,
        allow_default: bool,
    ) -> Result<FieldDef, CompilerError> {
        let ty = self.type_expr()?;
        let (name, _) = self.expect_name("a field name")?;
        let ordinal = self.eat_ordinal()?;
        let default = match self.eat(&Token::Equals)? {
            Some(span) if !allow_default => {
                return self.error(span, "union fields cannot have default values");
            }
            Some(_) => Some(self.expr()?),
            None => None,
        };
        let end = self.expect(Token::Semicolon)?;
        Ok(FieldDef {
            span: ty.span().merge(end),
            attributes,
            ty,
            name,
            ordinal,
            default,
        })
    }

    fn union_def(&mut self, attributes: Vec<Attribute>) -> Result<UnionDef, CompilerError> {
        let start = self.expect(Token::Union)?;
        let (name, _) = self.expect_name("a union name")?;
        self.expect(Token::LBrace)?;
        let mut fields = Vec::new();
        loop {
            let attrs = self.attributes()?;
            if attrs.is_empty() && self.peek_is(&Token::RBrace)? {
                break;
            }
            fields.push(self.field_def(attrs, false)?);
        }
        self.expect(Token::RBrace)?;
        let end = self.expect(Token::Semicolon)?;
        Ok(UnionDef {
            span: start.merge(end),
            attributes,
            name,
            fields,
        })
    }

    fn enum_def(&mut self, attributes: Vec<Attribute>) -> Result<EnumDef, CompilerError> {
        let start = self.expect(Token::Enum)?;
        let (name, _) = self.expect_name("an enum name")?;
        self.expect(Token::LBrace)?;
        let mut values = Vec::new();
        loop {
            let attrs = self.attributes()?;
            if attrs.is_empty() && self.peek_is(&Token::RBrace)? {
                break;
            }
            let (label, span) = self.expect_name("an enum value name")?;
            let value = match self.eat(&Token::Equals)? {
                Some(_) => Some(self.expr()?),
                None => None,
            };
            values.push(EnumValueDef {
                span,
                attributes: attrs,
                name: label,
                value,
            });
            if self.eat(&Token::Comma)?.is_none() {
                break;
            }
        }
        self.expect(Token::RBrace)?;
        let end = self.expect(Token::Semicolon)?;
        Ok(EnumDef {
            span: start.merge(end),
            attributes,
            name,
            values,
        })
    }

    fn interface_def(&mut self, attributes: Vec<Attribute>) -> Result<InterfaceDef, CompilerError> {
        let start = self.expect(Token::Interface)?;
        let (name, _) = self.expect_name("an interface name")?;
        self.expect(Token::LBrace)?;
        let mut members = Vec::new();
        loop {
            let attrs = self.attributes()?;
            if attrs.is_empty() && self.peek_is(&Token::RBrace)? {
                break;
            }
            let member = match self.peek()? {
                Some(Token::Enum) => InterfaceMember::Enum(self.enum_def(attrs)?),
                Some(Token::Const) => InterfaceMember::Const(self.const_def(attrs)?),
                _ => InterfaceMember::Method(self.method_def(attrs)?),
            };
            members.push(member);
        }
        self.expect(Token::RBrace)?;
        let end = self.expect(Token::Semicolon)?;
        Ok(InterfaceDef {
            span: start.merge(end),
            attributes,
            name,
            members,
        })
    }

    fn method_def(&mut self, attributes: Vec<Attribute>) -> Result<MethodDef, CompilerError> {
        let (name, start) = self.expect_name("a method name")?;
        let ordinal = self.eat_ordinal()?;
        let params = self.param_list()?;
        let response = match self.eat(&Token::FatArrow)? {
            Some(_) => Some(self.param_list()?),
            None => None,
        };
        let end = self.expect(Token::Semicolon)?;
        Ok(MethodDef {
            span: start.merge(end),
            attributes,
            name,
            ordinal,
            params,
            response,
        })
    }

    fn param_list(&mut self) -> Result<Vec<ParamDef>, CompilerError> {
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        if self.eat(&Token::RParen)?.is_some() {
            return Ok(params);
        }
        loop {
            let attributes = self.attributes()?;
            let ty = self.type_expr()?;
            let (name, name_span) = self.expect_name("a parameter name")?;
            let ordinal = self.eat_ordinal()?;
            params.push(ParamDef {
                span: ty.span().merge(name_span),
                attributes,
                ty,
                name,
                ordinal,
            });
            if self.eat(&Token::Comma)?.is_none() {
                self.expect(Token::RParen)?;
                return Ok(params);
            }
        }
    }

    fn const_def(&mut self, attributes: Vec<Attribute>) -> Result<ConstDef, CompilerError> {
        let start = self.expect(Token::Const)?;
        let ty = self.type_expr()?;
        let (name, _) = self.expect_name("a constant name")?;
        self.expect(Token::Equals)?;
        let value = self.expr()?;
        let end = self.expect(Token::Semicolon)?;
        Ok(ConstDef {
            span: start.merge(end),
            attributes,
            ty,
            name,
            value,
        })
    }

    // ===== Types =====

    fn type_expr(&mut self) -> Result<TypeExpr, CompilerError> {
        let (name, span) = self.qualified_name("a type")?;
        let keyword = match name.parts.as_slice() {
            [single] => crate::interner::resolve(*single),
            _ => None,
        };
        let base = match keyword.as_deref() {
            Some("array") if self.peek_is(&Token::LAngle)? => {
                self.expect(Token::LAngle)?;
                let element = self.type_expr()?;
                let length = match self.eat(&Token::Comma)? {
                    Some(_) => match self.advance()?.map(|t| t.node) {
                        Some(Token::Integer(n)) => Some(n),
                        _ => return self.error(span, "expected a fixed array length"),
                    },
                    None => None,
                };
                let end = self.expect(Token::RAngle)?;
                TypeExpr::Array {
                    span: span.merge(end),
                    element: Box::new(element),
                    length,
                }
            }
            Some("map") if self.peek_is(&Token::LAngle)? => {
                self.expect(Token::LAngle)?;
                let key = self.type_expr()?;
                self.expect(Token::Comma)?;
                let value = self.type_expr()?;
                let end = self.expect(Token::RAngle)?;
                TypeExpr::Map {
                    span: span.merge(end),
                    key: Box::new(key),
                    value: Box::new(value),
                }
            }
            Some("handle") => {
                if self.eat(&Token::LAngle)?.is_some() {
                    let (subtype, _) = self.expect_name("a handle type")?;
                    let end = self.expect(Token::RAngle)?;
                    TypeExpr::Handle {
                        span: span.merge(end),
                        subtype: Some(subtype),
                    }
                } else {
                    TypeExpr::Handle {
                        span,
                        subtype: None,
                    }
                }
            }
            _ => match self.eat(&Token::Amp)? {
                Some(end) => TypeExpr::InterfaceRequest {
                    span: span.merge(end),
                    name,
                },
                None => TypeExpr::Named { span, name },
            },
        };
        match self.eat(&Token::Question)? {
            Some(end) => Ok(TypeExpr::Nullable {
                span: base.span().merge(end),
                inner: Box::new(base),
            }),
            None => Ok(base),
        }
    }

    // ===== Expressions =====

    fn expr(&mut self) -> Result<Expr, CompilerError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek()? {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance()?;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                span: lhs.span().merge(rhs.span()),
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn term(&mut self) -> Result<Expr, CompilerError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek()? {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            self.advance()?;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                span: lhs.span().merge(rhs.span()),
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, CompilerError> {
        let op = match self.peek()? {
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Minus) => UnaryOp::Minus,
            _ => return self.primary(),
        };
        let start = self.peek_span()?;
        self.advance()?;
        let operand = self.unary()?;
        Ok(Expr::Unary {
            span: start.merge(operand.span()),
            op,
            operand: Box::new(operand),
        })
    }

    fn primary(&mut self) -> Result<Expr, CompilerError> {
        let span = self.peek_span()?;
        let expr = match self.peek()? {
            Some(Token::Integer(value)) => Expr::Integer { span, value },
            Some(Token::Float(value)) => Expr::Float { span, value },
            Some(Token::String(value)) => Expr::String { span, value },
            Some(Token::True) => Expr::Bool { span, value: true },
            Some(Token::False) => Expr::Bool { span, value: false },
            Some(Token::Default) => Expr::Default { span },
            Some(Token::Name(_)) => {
                let (name, span) = self.qualified_name("a name")?;
                return Ok(Expr::Name { span, name });
            }
            Some(Token::LParen) => {
                self.advance()?;
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                return Ok(inner);
            }
            _ => return self.unexpected("a value"),
        };
        self.advance()?;
        Ok(expr)
    }
}
