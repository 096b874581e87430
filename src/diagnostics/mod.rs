//! Structured compiler diagnostics.
//!
//! Lex and parse errors abort the current file, translate errors are
//! collected per file, and failures inside imported files carry the import
//! stack that led to them.

pub mod error;

pub use error::{
    format_import_stack, CompilerError, DataError, GenerationError, ImportCycleError, LexError,
    ParseError, TranslateDiagnostic, TranslateError,
};
