//! Constant expression evaluation.
//!
//! Constants and enum labels are evaluated on first use and memoized, so
//! they may refer to each other in any order. Supported forms: literals,
//! `default`, names of constants and enum labels, unary `+`/`-`, and binary
//! `+ - * / %` over numbers plus `+` over strings.

use std::collections::HashMap;

use crate::cst::{BinaryOp, ConstDef, EnumDef, Expr, UnaryOp};
use crate::diagnostics::TranslateError;
use crate::interner;
use crate::model::{DeclRef, Kind, Value};

use super::scope::{LocalValue, Scope, ValueTarget};
use super::Diagnostics;

/// A constant declared in the module, with the path of its enclosing scope.
pub(crate) struct PendingConst<'t> {
    pub def: &'t ConstDef,
    pub scope_path: String,
}

pub(crate) struct PendingEnum<'t> {
    pub def: &'t EnumDef,
    pub decl: DeclRef,
}

enum Slot {
    InProgress,
    Done(Value),
    Failed,
}

/// Failure while evaluating one expression.
enum EvalError {
    Error(TranslateError),
    /// A referenced value already failed and was reported.
    Poisoned,
}

impl From<TranslateError> for EvalError {
    fn from(e: TranslateError) -> Self {
        EvalError::Error(e)
    }
}

/// Where an expression is evaluated.
struct EvalContext<'a> {
    scope_path: &'a str,
    /// Enum whose bare labels are visible, for enum-typed targets
    enum_hint: Option<String>,
    description: &'a str,
}

pub(crate) struct Evaluator<'t> {
    pub scope: Scope,
    pub consts: Vec<PendingConst<'t>>,
    pub enums: Vec<PendingEnum<'t>>,
    const_kinds: HashMap<usize, Kind>,
    slots: HashMap<LocalValue, Slot>,
}

fn unsupported(context: &str, detail: String) -> TranslateError {
    TranslateError::UnsupportedExpression {
        context: context.to_string(),
        detail,
    }
}

/// Constants may only have primitive, string or enum kinds.
fn is_constant_kind(kind: &Kind) -> bool {
    kind.is_integer() || kind.is_float() || matches!(kind, Kind::Bool | Kind::String | Kind::Enum(_))
}

/// Check `value` against `kind`, widening integers where a float is expected.
/// Floats must be finite and fit the declared width.
pub(crate) fn check_value(kind: &Kind, value: Value, context: &str) -> Result<Value, TranslateError> {
    let target = kind.non_nullable();
    let mismatch = |value: &Value| TranslateError::ConstantTypeMismatch {
        context: context.to_string(),
        expected: kind.spec(),
        found: value.describe(),
    };
    if let (Some((min, max)), Value::Int(n)) = (target.int_range(), &value) {
        if *n < min || *n > max {
            return Err(TranslateError::ValueOutOfRange {
                context: context.to_string(),
                kind: kind.spec(),
                value: n.to_string(),
            });
        }
        return Ok(value);
    }
    let float = match &value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    };
    if let (true, Some(x)) = (target.is_float(), float) {
        let limit = if *target == Kind::Float { f32::MAX as f64 } else { f64::MAX };
        if !x.is_finite() || x.abs() > limit {
            return Err(TranslateError::ValueOutOfRange {
                context: context.to_string(),
                kind: kind.spec(),
                value: x.to_string(),
            });
        }
        return Ok(Value::Float(x));
    }
    match (target, &value) {
        (Kind::Bool, Value::Bool(_)) => Ok(value),
        (Kind::String, Value::String(_)) => Ok(value),
        (Kind::Enum(expected), Value::Enum { kind: found, .. }) if expected == found => Ok(value),
        (Kind::Struct(_), Value::Default) => Ok(value),
        _ => Err(mismatch(&value)),
    }
}

impl<'t> Evaluator<'t> {
    pub fn new(scope: Scope) -> Self {
        Evaluator {
            scope,
            consts: Vec::new(),
            enums: Vec::new(),
            const_kinds: HashMap::new(),
            slots: HashMap::new(),
        }
    }

    /// Kind and value of a declared constant, or `None` once it has failed.
    pub fn constant(&mut self, index: usize, diags: &mut Diagnostics) -> Option<(Kind, Value)> {
        let value = self.ensure(LocalValue::Const(index), "", diags).ok()?;
        let kind = self.const_kinds.get(&index)?.clone();
        Some((kind, value))
    }

    /// Integer value of one enum label, or `None` once it has failed.
    pub fn enum_label(&mut self, enum_index: usize, label: usize, diags: &mut Diagnostics) -> Option<i64> {
        match self.ensure(LocalValue::EnumLabel { enum_index, label }, "", diags) {
            Ok(Value::Enum { value, .. }) => Some(value),
            _ => None,
        }
    }

    /// Evaluate a field default against the field's kind. Failures of
    /// referenced constants are reported at their own declarations.
    pub fn field_default(
        &mut self,
        expr: &'t Expr,
        kind: &Kind,
        scope_path: &str,
        description: &str,
        diags: &mut Diagnostics,
    ) -> Result<Option<Value>, TranslateError> {
        let cx = EvalContext {
            scope_path,
            enum_hint: enum_hint(kind),
            description,
        };
        match self.eval(expr, &cx, diags) {
            Ok(value) => check_value(kind, value, description).map(Some),
            Err(EvalError::Error(e)) => Err(e),
            Err(EvalError::Poisoned) => Ok(None),
        }
    }

    /// Evaluate a local value once; failures are reported at its declaration.
    fn ensure(
        &mut self,
        target: LocalValue,
        name: &str,
        diags: &mut Diagnostics,
    ) -> Result<Value, EvalError> {
        match self.slots.get(&target) {
            Some(Slot::Done(value)) => return Ok(value.clone()),
            Some(Slot::Failed) => return Err(EvalError::Poisoned),
            Some(Slot::InProgress) => {
                return Err(EvalError::Error(TranslateError::CircularConstant {
                    name: name.to_string(),
                }))
            }
            None => {}
        }
        self.slots.insert(target, Slot::InProgress);
        let result = match target {
            LocalValue::Const(index) => self.compute_const(index, diags),
            LocalValue::EnumLabel { enum_index, label } => {
                self.compute_label(enum_index, label, diags)
            }
        };
        match result {
            Ok(value) => {
                self.slots.insert(target, Slot::Done(value.clone()));
                Ok(value)
            }
            Err(error) => {
                if let EvalError::Error(e) = error {
                    diags.push(self.line_of(target), e);
                }
                self.slots.insert(target, Slot::Failed);
                Err(EvalError::Poisoned)
            }
        }
    }

    fn line_of(&self, target: LocalValue) -> u32 {
        match target {
            LocalValue::Const(index) => self.consts[index].def.span.line(),
            LocalValue::EnumLabel { enum_index, label } => {
                self.enums[enum_index].def.values[label].span.line()
            }
        }
    }

    fn compute_const(&mut self, index: usize, diags: &mut Diagnostics) -> Result<Value, EvalError> {
        let pending = &self.consts[index];
        let def = pending.def;
        let scope_path = pending.scope_path.clone();
        let name = interner::name(def.name);
        let description = format!("constant '{}'", name);

        let kind = self.scope.resolve_type(&def.ty, &scope_path, &description)?;
        if !is_constant_kind(&kind) {
            return Err(TranslateError::InvalidConstantKind {
                name,
                kind: kind.spec(),
            }
            .into());
        }
        self.const_kinds.insert(index, kind.clone());
        let cx = EvalContext {
            scope_path: &scope_path,
            enum_hint: enum_hint(&kind),
            description: &description,
        };
        let value = self.eval(&def.value, &cx, diags)?;
        Ok(check_value(&kind, value, &description)?)
    }

    fn compute_label(
        &mut self,
        enum_index: usize,
        label: usize,
        diags: &mut Diagnostics,
    ) -> Result<Value, EvalError> {
        let pending = &self.enums[enum_index];
        let def = pending.def;
        let decl = pending.decl.clone();
        let value_def = &def.values[label];
        let label_name = interner::name(value_def.name);
        let description = format!("enum value '{}.{}'", decl.name, label_name);

        let value = match &value_def.value {
            Some(expr) => {
                let scope_path = decl.qualified_name();
                let cx = EvalContext {
                    scope_path: &scope_path,
                    enum_hint: None,
                    description: &description,
                };
                match self.eval(expr, &cx, diags)? {
                    Value::Int(n) | Value::Enum { value: n, .. } => n,
                    other => {
                        return Err(TranslateError::ConstantTypeMismatch {
                            context: description,
                            expected: Kind::Int32.spec(),
                            found: other.describe(),
                        }
                        .into())
                    }
                }
            }
            None if label == 0 => 0,
            None => {
                let previous = LocalValue::EnumLabel {
                    enum_index,
                    label: label - 1,
                };
                match self.ensure(previous, &label_name, diags)? {
                    Value::Enum { value, .. } => value + 1,
                    _ => return Err(EvalError::Poisoned),
                }
            }
        };
        if i32::try_from(value).is_err() {
            return Err(TranslateError::ValueOutOfRange {
                context: description,
                kind: Kind::Int32.spec(),
                value: value.to_string(),
            }
            .into());
        }
        Ok(Value::Enum {
            kind: decl,
            label: label_name,
            value,
        })
    }

    fn eval(
        &mut self,
        expr: &'t Expr,
        cx: &EvalContext<'_>,
        diags: &mut Diagnostics,
    ) -> Result<Value, EvalError> {
        match expr {
            Expr::Integer { value, .. } => i64::try_from(*value).map(Value::Int).map_err(|_| {
                EvalError::from(TranslateError::ValueOutOfRange {
                    context: cx.description.to_string(),
                    kind: Kind::Int64.spec(),
                    value: value.to_string(),
                })
            }),
            Expr::Float { value, .. } => Ok(Value::Float(*value)),
            Expr::String { value, .. } => Ok(Value::String(value.clone())),
            Expr::Bool { value, .. } => Ok(Value::Bool(*value)),
            Expr::Default { .. } => Ok(Value::Default),
            Expr::Name { name, .. } => {
                let dotted = name.to_dotted();
                let target = self
                    .scope
                    .lookup_value(&dotted, cx.scope_path, cx.enum_hint.as_deref())?;
                match target {
                    Some(ValueTarget::Imported(value)) => Ok(value),
                    Some(ValueTarget::Local(local)) => self.ensure(local, &dotted, diags),
                    None => Err(TranslateError::UnresolvedValue {
                        name: dotted,
                        context: cx.description.to_string(),
                    }
                    .into()),
                }
            }
            Expr::Unary { op, operand, .. } => {
                if let (UnaryOp::Minus, Expr::Integer { value, .. }) = (op, operand.as_ref()) {
                    if *value == i64::MIN.unsigned_abs() {
                        return Ok(Value::Int(i64::MIN));
                    }
                }
                let value = self.eval(operand, cx, diags)?;
                Ok(apply_unary(*op, value, cx.description)?)
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                let lhs = self.eval(lhs, cx, diags)?;
                let rhs = self.eval(rhs, cx, diags)?;
                Ok(apply_binary(*op, lhs, rhs, cx.description)?)
            }
        }
    }
}

fn enum_hint(kind: &Kind) -> Option<String> {
    match kind.non_nullable() {
        Kind::Enum(decl) => Some(decl.qualified_name()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<Value> {
    match value {
        Value::Int(n) => Some(Value::Int(*n)),
        Value::Enum { value, .. } => Some(Value::Int(*value)),
        Value::Float(x) => Some(Value::Float(*x)),
        _ => None,
    }
}

fn apply_unary(op: UnaryOp, value: Value, context: &str) -> Result<Value, TranslateError> {
    let sign = match op {
        UnaryOp::Plus => "+",
        UnaryOp::Minus => "-",
    };
    let number = as_number(&value)
        .ok_or_else(|| unsupported(context, format!("cannot apply '{}' to {}", sign, value.describe())))?;
    match (op, number) {
        (UnaryOp::Plus, n) => Ok(n),
        (UnaryOp::Minus, Value::Int(n)) => n.checked_neg().map(Value::Int).ok_or_else(|| {
            TranslateError::ValueOutOfRange {
                context: context.to_string(),
                kind: Kind::Int64.spec(),
                value: format!("-({})", n),
            }
        }),
        (UnaryOp::Minus, Value::Float(x)) => Ok(Value::Float(-x)),
        (_, other) => Err(unsupported(context, format!("cannot apply '{}' to {}", sign, other.describe()))),
    }
}

fn apply_binary(op: BinaryOp, lhs: Value, rhs: Value, context: &str) -> Result<Value, TranslateError> {
    if let (BinaryOp::Add, Value::String(a), Value::String(b)) = (op, &lhs, &rhs) {
        return Ok(Value::String(format!("{}{}", a, b)));
    }
    let invalid = || {
        unsupported(
            context,
            format!("cannot apply '{}' to {} and {}", op, lhs.describe(), rhs.describe()),
        )
    };
    let (a, b) = match (as_number(&lhs), as_number(&rhs)) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(invalid()),
    };
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => {
            if b == 0 && matches!(op, BinaryOp::Div | BinaryOp::Mod) {
                return Err(unsupported(context, "division by zero".to_string()));
            }
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div => a.checked_div(b),
                BinaryOp::Mod => a.checked_rem(b),
            };
            result.map(Value::Int).ok_or_else(|| TranslateError::ValueOutOfRange {
                context: context.to_string(),
                kind: Kind::Int64.spec(),
                value: format!("{} {} {}", a, op, b),
            })
        }
        (a, b) => {
            let (a, b) = (to_float(&a), to_float(&b));
            match op {
                BinaryOp::Add => Ok(Value::Float(a + b)),
                BinaryOp::Sub => Ok(Value::Float(a - b)),
                BinaryOp::Mul => Ok(Value::Float(a * b)),
                BinaryOp::Div if b == 0.0 => Err(unsupported(context, "division by zero".to_string())),
                BinaryOp::Div => Ok(Value::Float(a / b)),
                BinaryOp::Mod => Err(invalid()),
            }
        }
    }
}

fn to_float(value: &Value) -> f64 {
    match value {
        Value::Int(n) => *n as f64,
        Value::Float(x) => *x,
        _ => 0.0,
    }
}
