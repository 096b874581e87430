use logos::Logos;

use crate::interner::{self, Symbol};
use crate::lexer::logos_lexer::{lex_block_comment, parse_string};

/// Interned string symbol for identifiers
pub type Ident = Symbol;

/// Tokens in the mojom language
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // Keywords
    #[token("module")]
    Module,
    #[token("import")]
    Import,
    #[token("struct")]
    Struct,
    #[token("union")]
    Union,
    #[token("enum")]
    Enum,
    #[token("interface")]
    Interface,
    #[token("const")]
    Const,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("default")]
    Default,

    // Identifiers (type names such as int32 or array are plain names)
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| interner::intern(lex.slice()))]
    Name(Ident),

    // Literals
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u64>().ok())]
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| u64::from_str_radix(&lex.slice()[2..], 16).ok())]
    Integer(u64),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r#""([^"\\\n]|\\[^\n])*""#, |lex| {
        let s = lex.slice();
        parse_string(&s[1..s.len() - 1])
    })]
    String(String),

    /// `@<digits>` wire position
    #[regex(r"@[0-9]+", |lex| lex.slice()[1..].parse::<u32>().ok())]
    Ordinal(u32),

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("<")]
    LAngle,
    #[token(">")]
    RAngle,

    // Punctuation and operators
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("&")]
    Amp,
    #[token("?")]
    Question,
    #[token("=")]
    Equals,
    #[token("=>")]
    FatArrow,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    // Comments (dropped by the tokenizer)
    #[regex(r"//[^\n]*")]
    LineComment,
    #[token("/*", lex_block_comment)]
    BlockComment,
}

impl Token {
    pub fn is_comment(&self) -> bool {
        matches!(self, Token::LineComment | Token::BlockComment)
    }

    /// Human-readable description used in parse errors
    pub fn describe(&self) -> String {
        match self {
            Token::Name(id) => format!("name '{}'", interner::name(*id)),
            Token::Integer(n) => format!("integer {}", n),
            Token::Float(f) => format!("float {}", f),
            Token::String(s) => format!("string {:?}", s),
            Token::Ordinal(o) => format!("ordinal @{}", o),
            other => format!("'{}'", other),
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Module => write!(f, "module"),
            Token::Import => write!(f, "import"),
            Token::Struct => write!(f, "struct"),
            Token::Union => write!(f, "union"),
            Token::Enum => write!(f, "enum"),
            Token::Interface => write!(f, "interface"),
            Token::Const => write!(f, "const"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Default => write!(f, "default"),
            Token::Name(ident) => write!(f, "{}", interner::name(*ident)),
            Token::Integer(n) => write!(f, "{}", n),
            Token::Float(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "{:?}", s),
            Token::Ordinal(o) => write!(f, "@{}", o),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LAngle => write!(f, "<"),
            Token::RAngle => write!(f, ">"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Amp => write!(f, "&"),
            Token::Question => write!(f, "?"),
            Token::Equals => write!(f, "="),
            Token::FatArrow => write!(f, "=>"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::LineComment => write!(f, "//"),
            Token::BlockComment => write!(f, "/* */"),
        }
    }
}
