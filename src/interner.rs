use string_interner::{DefaultBackend, DefaultSymbol, StringInterner};

/// Type alias for our symbol type
pub type Symbol = DefaultSymbol;

/// Type alias for our string interner
type Interner = StringInterner<DefaultBackend>;

thread_local! {
    static INTERNER: std::cell::RefCell<Interner> =
        std::cell::RefCell::new(StringInterner::new());
}

/// Intern a string and return its symbol
pub fn intern(s: &str) -> Symbol {
    INTERNER.with(|interner| interner.borrow_mut().get_or_intern(s))
}

/// Resolve a symbol back to its string
pub fn resolve(sym: Symbol) -> Option<String> {
    INTERNER.with(|interner| interner.borrow().resolve(sym).map(|s| s.to_string()))
}

/// Resolve a symbol, yielding an empty string for symbols interned on another thread.
pub fn name(sym: Symbol) -> String {
    resolve(sym).unwrap_or_default()
}

/// Join the parts of a dotted name (`foo.bar.Baz`).
pub fn join(parts: &[Symbol]) -> String {
    parts.iter().map(|s| name(*s)).collect::<Vec<_>>().join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let a = intern("Foo");
        let b = intern("Foo");
        assert_eq!(a, b);
        assert_eq!(resolve(a).as_deref(), Some("Foo"));
    }

    #[test]
    fn test_join_dotted() {
        let parts = [intern("sample"), intern("Bar")];
        assert_eq!(join(&parts), "sample.Bar");
    }
}
