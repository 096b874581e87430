//! Mojom lexer.
//!
//! `tokenize` returns a lazy, single-pass iterator over the tokens of a
//! source text. Whitespace and comments are dropped; every token carries a
//! span with its byte range and 1-based line/column.

pub mod logos_lexer;
pub mod token;

pub use token::{Ident, Token};

use logos::Logos;

use crate::diagnostics::LexError;
use crate::span::{LineTracker, Span, Spanned};

/// Lexer output: token with span
pub type SpannedToken = Spanned<Token>;

/// Lazy token stream over one source text.
///
/// Stops after the first error.
pub struct Tokenizer<'src> {
    inner: logos::Lexer<'src, Token>,
    lines: LineTracker<'src>,
    failed: bool,
}

/// Main lexer entry point
pub fn tokenize(source: &str) -> Tokenizer<'_> {
    Tokenizer {
        inner: Token::lexer(source),
        lines: LineTracker::new(source),
        failed: false,
    }
}

/// Lex the whole source eagerly.
pub fn lex(source: &str) -> Result<Vec<SpannedToken>, LexError> {
    tokenize(source).collect()
}

impl<'src> Iterator for Tokenizer<'src> {
    type Item = Result<SpannedToken, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let result = self.inner.next()?;
            let range = self.inner.span();
            let pos = self.lines.locate(range.start);
            match result {
                Ok(token) if token.is_comment() => continue,
                Ok(token) => {
                    log::trace!("token {:?} at {}:{}", token, pos.line, pos.column);
                    return Some(Ok(Spanned::new(
                        token,
                        Span::new(range.start, range.end, pos),
                    )));
                }
                Err(()) => {
                    self.failed = true;
                    return Some(Err(LexError {
                        line: pos.line,
                        column: pos.column,
                        offset: range.start,
                        message: logos_lexer::describe_lex_failure(self.inner.slice()),
                        line_text: self.lines.current_line_text().to_string(),
                    }));
                }
            }
        }
    }
}
