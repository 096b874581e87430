//! Mojom interface definition language compiler
//!
//! Pipeline:
//! 1. Logos-based lexer producing a lazy token stream
//! 2. Recursive-descent parser building a syntax tree
//! 3. Translator resolving imports, names, constants and ordinals into a
//!    [`model::Module`]
//! 4. Template-driven backends rendering bindings for C++, JavaScript,
//!    Python and Java

pub mod span;
pub mod interner;
pub mod lexer;
pub mod cst;
pub mod parser;
pub mod diagnostics;
pub mod model;
pub mod translate;
pub mod build;
pub mod codegen;

// Re-export main types
pub use build::{build, BuildResult, Compilation, CompileOptions};
pub use codegen::{generate, generate_all, Backend, BackendKind, GeneratedFiles};
pub use diagnostics::CompilerError;
pub use lexer::{lex, tokenize, Token};
pub use model::{module_from_data, module_to_data, Kind, Module};
pub use parser::{parse, parse_source};
pub use translate::{translate, ImportResolver};
