use crate::diagnostics::LexError;
use crate::lexer::{SpannedToken, Token};
use crate::span::Span;

/// One-token lookahead over a lazy token stream.
pub struct TokenCursor<I> {
    tokens: I,
    lookahead: Option<SpannedToken>,
    last_span: Span,
}

impl<I> TokenCursor<I>
where
    I: Iterator<Item = Result<SpannedToken, LexError>>,
{
    pub fn new(tokens: I) -> Self {
        Self {
            tokens,
            lookahead: None,
            last_span: Span::default(),
        }
    }

    pub fn peek(&mut self) -> Result<Option<&SpannedToken>, LexError> {
        if self.lookahead.is_none() {
            match self.tokens.next() {
                Some(Ok(token)) => self.lookahead = Some(token),
                Some(Err(e)) => return Err(e),
                None => {}
            }
        }
        Ok(self.lookahead.as_ref())
    }

    pub fn peek_token(&mut self) -> Result<Option<&Token>, LexError> {
        Ok(self.peek()?.map(|t| &t.node))
    }

    pub fn advance(&mut self) -> Result<Option<SpannedToken>, LexError> {
        self.peek()?;
        let token = self.lookahead.take();
        if let Some(t) = &token {
            self.last_span = t.span;
        }
        Ok(token)
    }

    /// Span of the most recently consumed token, used for end-of-input errors.
    pub fn last_span(&self) -> Span {
        self.last_span
    }
}
