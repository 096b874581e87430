use std::fmt;

use thiserror::Error;

/// Malformed token: unterminated string/comment or an unrecognized character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
    pub message: String,
    /// Full text of the offending line
    pub line_text: String,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: error: {}", self.line, self.column, self.message)?;
        if !self.line_text.is_empty() {
            let pad: String = self
                .line_text
                .chars()
                .take(self.column.saturating_sub(1) as usize)
                .map(|c| if c == '\t' { '\t' } else { ' ' })
                .collect();
            write!(f, "\n  {}\n  {}^", self.line_text, pad)?;
        }
        Ok(())
    }
}

impl std::error::Error for LexError {}

/// Grammar violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{filename}:{line}:{column}: error: {message}")]
pub struct ParseError {
    pub filename: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

/// A cycle in the import graph. `stack` runs from the root file to the
/// module that was imported a second time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: error: import cycle detected{}", .stack.last().map(String::as_str).unwrap_or("<unknown>"), format_import_stack(.stack))]
pub struct ImportCycleError {
    pub stack: Vec<String>,
}

/// Semantic errors found while translating a parse tree into a module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("unresolved type '{name}' in {context}")]
    UnresolvedType { name: String, context: String },

    #[error("Interface request requires '{target_name}' to be an interface.")]
    InvalidInterfaceRequest { target_name: String },

    #[error("'{name}' is already declared in {scope}")]
    DuplicateDeclaration { name: String, scope: String },

    #[error("ordinal @{ordinal} of '{name}' is already used in {scope}")]
    DuplicateOrdinal { ordinal: u32, name: String, scope: String },

    #[error("ordinals in {scope} must be dense: @{missing} is missing")]
    NonDenseOrdinals { scope: String, missing: u32 },

    #[error("kind '{kind}' in {context} cannot be nullable")]
    InvalidNullable { kind: String, context: String },

    #[error("kind '{kind}' in {context} cannot be used as a map key")]
    InvalidMapKey { kind: String, context: String },

    #[error("client '{name}' of interface '{interface}' is not an interface")]
    InvalidClient { name: String, interface: String },

    #[error("unresolved value '{name}' in {context}")]
    UnresolvedValue { name: String, context: String },

    #[error("'{name}' is ambiguous, candidates: {}", .candidates.join(", "))]
    AmbiguousReference { name: String, candidates: Vec<String> },

    #[error("unsupported expression in {context}: {detail}")]
    UnsupportedExpression { context: String, detail: String },

    #[error("{context} expects a value of kind '{expected}', found {found}")]
    ConstantTypeMismatch {
        context: String,
        expected: String,
        found: String,
    },

    #[error("value {value} of {context} is out of range for kind '{kind}'")]
    ValueOutOfRange {
        context: String,
        kind: String,
        value: String,
    },

    #[error("constant '{name}' cannot have kind '{kind}'")]
    InvalidConstantKind { name: String, kind: String },

    #[error("'{name}' is defined in terms of itself")]
    CircularConstant { name: String },
}

impl TranslateError {
    pub fn code(&self) -> &'static str {
        match self {
            TranslateError::UnresolvedType { .. } => "UnresolvedType",
            TranslateError::InvalidInterfaceRequest { .. } => "InvalidInterfaceRequest",
            TranslateError::DuplicateDeclaration { .. } => "DuplicateDeclaration",
            TranslateError::DuplicateOrdinal { .. } => "DuplicateOrdinal",
            TranslateError::NonDenseOrdinals { .. } => "NonDenseOrdinals",
            TranslateError::InvalidNullable { .. } => "InvalidNullable",
            TranslateError::InvalidMapKey { .. } => "InvalidMapKey",
            TranslateError::InvalidClient { .. } => "InvalidClient",
            TranslateError::UnresolvedValue { .. } => "UnresolvedValue",
            TranslateError::AmbiguousReference { .. } => "AmbiguousReference",
            TranslateError::UnsupportedExpression { .. } => "UnsupportedExpression",
            TranslateError::ConstantTypeMismatch { .. } => "ConstantTypeMismatch",
            TranslateError::ValueOutOfRange { .. } => "ValueOutOfRange",
            TranslateError::InvalidConstantKind { .. } => "InvalidConstantKind",
            TranslateError::CircularConstant { .. } => "CircularConstant",
        }
    }
}

/// A translate error pinned to a file and line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{filename}:{line}: error: {error}")]
pub struct TranslateDiagnostic {
    pub filename: String,
    pub line: u32,
    pub error: TranslateError,
}

/// Malformed module data handed to `model::module_from_data`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("missing key '{key}' in {context}")]
    MissingKey { key: String, context: String },

    #[error("expected {expected} for '{key}' in {context}")]
    InvalidValue {
        key: String,
        context: String,
        expected: &'static str,
    },

    #[error("malformed kind spec '{spec}'")]
    InvalidKindSpec { spec: String },

    #[error("kind '{spec}' does not name a visible declaration")]
    UnknownKind { spec: String },

    #[error("kind '{spec}' is declared by more than one import: {modules}")]
    AmbiguousKind { spec: String, modules: String },

    #[error("malformed JSON: {message}")]
    Json { message: String },
}

/// Template or render failure inside one backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("{backend}: error: template '{path}' not found")]
    MissingTemplate { backend: String, path: String },

    #[error("{backend}: error: invalid template '{path}': {message}")]
    Template {
        backend: String,
        path: String,
        message: String,
    },

    #[error("{backend}: error: failed to render '{path}': {message}")]
    Render {
        backend: String,
        path: String,
        message: String,
    },

    #[error("{backend}: error: filter '{filter}' failed in '{path}': {message}")]
    Filter {
        backend: String,
        path: String,
        filter: String,
        message: String,
    },
}

impl GenerationError {
    pub fn backend(&self) -> &str {
        match self {
            GenerationError::MissingTemplate { backend, .. }
            | GenerationError::Template { backend, .. }
            | GenerationError::Render { backend, .. }
            | GenerationError::Filter { backend, .. } => backend,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::MissingTemplate { .. } => "MissingTemplate",
            GenerationError::Template { .. } => "Template",
            GenerationError::Render { .. } => "Render",
            GenerationError::Filter { .. } => "Filter",
        }
    }
}

/// Every failure the front end can produce for one compilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilerError {
    #[error("{path}: error: {message}")]
    Io { path: String, message: String },

    #[error("{importer}: error: cannot find import '{import}'")]
    ImportNotFound { import: String, importer: String },

    #[error("{filename}:{error}")]
    Lex { filename: String, error: LexError },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    ImportCycle(#[from] ImportCycleError),

    #[error("{}", .0.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("\n"))]
    Translate(Vec<TranslateDiagnostic>),

    #[error("{name}: error: invalid module data: {error}")]
    Data { name: String, error: DataError },

    /// Failure inside an imported file; `stack` runs from the root file to the failing import.
    #[error("{source}{}", format_import_stack(.stack))]
    Import {
        stack: Vec<String>,
        source: Box<CompilerError>,
    },
}

impl CompilerError {
    pub fn code(&self) -> String {
        match self {
            CompilerError::Io { .. } => "Io".into(),
            CompilerError::ImportNotFound { .. } => "ImportNotFound".into(),
            CompilerError::Lex { .. } => "LexError".into(),
            CompilerError::Parse(_) => "ParseError".into(),
            CompilerError::ImportCycle(_) => "ImportCycle".into(),
            CompilerError::Translate(diags) => match diags.first() {
                Some(d) if diags.len() == 1 => format!("Translate.{}", d.error.code()),
                _ => "Translate".into(),
            },
            CompilerError::Data { .. } => "DataError".into(),
            CompilerError::Import { source, .. } => source.code(),
        }
    }

    /// The failure itself, without the import chain that reached it.
    pub fn root_cause(&self) -> &CompilerError {
        match self {
            CompilerError::Import { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The translate errors carried by this error, looking through import wrappers.
    pub fn translate_errors(&self) -> Vec<&TranslateError> {
        match self {
            CompilerError::Translate(diags) => diags.iter().map(|d| &d.error).collect(),
            CompilerError::Import { source, .. } => source.translate_errors(),
            _ => Vec::new(),
        }
    }
}

/// Render an import stack (root first) as one "was imported by" line per
/// link, most recent import first. A single-element stack renders as "".
pub fn format_import_stack(stack: &[String]) -> String {
    stack
        .windows(2)
        .rev()
        .map(|link| format!("\n  {} was imported by {}", link[1], link[0]))
        .collect()
}
