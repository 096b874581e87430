use crate::lexer::token::Token;

/// Parse string escape sequences
pub(crate) fn parse_string(s: &str) -> Option<String> {
    let mut result = String::new();
    let mut i = 0;
    let bytes = s.as_bytes();

    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 1;
            if i >= bytes.len() {
                break;
            }
            match bytes[i] {
                b'n' => {
                    result.push('\n');
                    i += 1;
                }
                b't' => {
                    result.push('\t');
                    i += 1;
                }
                b'r' => {
                    result.push('\r');
                    i += 1;
                }
                b'\\' => {
                    result.push('\\');
                    i += 1;
                }
                b'"' => {
                    result.push('"');
                    i += 1;
                }
                b'\'' => {
                    result.push('\'');
                    i += 1;
                }
                b'0' => {
                    result.push('\0');
                    i += 1;
                }
                b'x' | b'u' => {
                    let max_digits = if bytes[i] == b'x' { 2 } else { 4 };
                    i += 1;
                    let start = i;
                    while i < bytes.len() && i - start < max_digits && bytes[i].is_ascii_hexdigit() {
                        i += 1;
                    }
                    if i == start {
                        return None;
                    }
                    let code = u32::from_str_radix(&s[start..i], 16).ok()?;
                    result.push(char::from_u32(code)?);
                }
                _ => {
                    // Unknown escape
                    return None;
                }
            }
        } else {
            // Regular character (may be multi-byte UTF-8)
            let c = s[i..].chars().next()?;
            result.push(c);
            i += c.len_utf8();
        }
    }

    Some(result)
}

/// Skip a `/* ... */` comment. Mojom block comments do not nest.
pub(crate) fn lex_block_comment(lex: &mut logos::Lexer<Token>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        // Unclosed block comment
        None => false,
    }
}

/// Pick the message for a slice logos refused to tokenize.
pub(crate) fn describe_lex_failure(slice: &str) -> String {
    if slice.starts_with("/*") {
        "unterminated block comment".to_string()
    } else if slice.starts_with('"') {
        if slice.len() > 1 && slice.ends_with('"') {
            "invalid escape sequence in string literal".to_string()
        } else {
            "unterminated string literal".to_string()
        }
    } else if slice.starts_with('@') {
        "invalid ordinal; expected '@' followed by a 32-bit integer".to_string()
    } else if slice.starts_with(|c: char| c.is_ascii_digit()) {
        format!("invalid numeric literal '{}'", slice)
    } else {
        match slice.chars().next() {
            Some(c) => format!("unexpected character '{}'", c),
            None => "unexpected end of input".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logos::Logos;

    fn raw(source: &str) -> Vec<Token> {
        Token::lexer(source)
            .map(|t| t.expect("lex failure"))
            .filter(|t| !t.is_comment())
            .collect()
    }

    #[test]
    fn test_keywords() {
        let tokens = raw("module import struct union enum interface const true false default");
        assert_eq!(
            tokens,
            vec![
                Token::Module,
                Token::Import,
                Token::Struct,
                Token::Union,
                Token::Enum,
                Token::Interface,
                Token::Const,
                Token::True,
                Token::False,
                Token::Default,
            ]
        );
    }

    #[test]
    fn test_type_names_are_plain_names() {
        let tokens = raw("int32 array map handle structure");
        assert_eq!(tokens.len(), 5);
        assert!(tokens.iter().all(|t| matches!(t, Token::Name(_))));
    }

    #[test]
    fn test_literals() {
        let tokens = raw(r#"42 0x1F 3.25 1e3 "hi\n" @7"#);
        assert_eq!(tokens[0], Token::Integer(42));
        assert_eq!(tokens[1], Token::Integer(31));
        assert_eq!(tokens[2], Token::Float(3.25));
        assert_eq!(tokens[3], Token::Float(1000.0));
        assert_eq!(tokens[4], Token::String("hi\n".to_string()));
        assert_eq!(tokens[5], Token::Ordinal(7));
    }

    #[test]
    fn test_punctuation() {
        let tokens = raw("=> = & ? < > % ;");
        assert_eq!(
            tokens,
            vec![
                Token::FatArrow,
                Token::Equals,
                Token::Amp,
                Token::Question,
                Token::LAngle,
                Token::RAngle,
                Token::Percent,
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_comments_are_tokens() {
        let all: Vec<Token> = Token::lexer("// line\n/* block\n */ foo")
            .map(|t| t.unwrap())
            .collect();
        assert_eq!(all[0], Token::LineComment);
        assert_eq!(all[1], Token::BlockComment);
        assert!(matches!(all[2], Token::Name(_)));
    }

    #[test]
    fn test_unterminated_block_comment_fails() {
        let results: Vec<_> = Token::lexer("foo /* never closed").collect();
        assert!(results.iter().any(|r| r.is_err()));
    }

    #[test]
    fn test_parse_string_escapes() {
        assert_eq!(parse_string(r"a\tb").as_deref(), Some("a\tb"));
        assert_eq!(parse_string(r"\x41é").as_deref(), Some("Aé"));
        assert_eq!(parse_string(r#"\"q\""#).as_deref(), Some("\"q\""));
        assert_eq!(parse_string(r"\q"), None);
    }

    #[test]
    fn test_describe_lex_failure() {
        assert_eq!(describe_lex_failure("/*"), "unterminated block comment");
        assert_eq!(describe_lex_failure("\"abc"), "unterminated string literal");
        assert_eq!(describe_lex_failure("$"), "unexpected character '$'");
    }
}
