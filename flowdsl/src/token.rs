//! Lexical tokens of the dataflow language.
//!
//! A [`Token`] pairs the source text it was scanned from with a [`TokenKind`]
//! and the [`Span`] it covers. Kinds are a flat tagged enum; grouped questions
//! ("is this any opening bracket?", "is this any identifier?") are answered by
//! the `is_*` category tests rather than by the enum layout.

use flowscan::{Element, Span};
use smartstring::alias::String;
use std::fmt;

/// The four bracketed group shapes of the language.
///
/// Which shape a group has is decided by the bracket pair that opened it, so
/// the configured characters stay independent of the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Container {
    /// `( ... )`
    List = 0,
    /// `[ ... ]`
    Vector = 1,
    /// `{ ... }`
    Set = 2,
    /// `⟨ ... ⟩`
    Scalar = 3,
}

impl Container {
    pub const COUNT: usize = 4;
    pub const ALL: [Container; Container::COUNT] = [
        Container::List,
        Container::Vector,
        Container::Set,
        Container::Scalar,
    ];
    pub const STRS: &[&str] = &["list", "vector", "set", "scalar"];
}

impl From<Container> for usize {
    fn from(c: Container) -> Self {
        c as usize
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Container::STRS[usize::from(*self)])
    }
}

/// Classification of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Quoted literal; `text` holds the content.
    Literal,
    /// Run of ASCII digits.
    Integer,
    /// Digits, decimal separator, digits, optional exponent.
    Real,
    /// Plain identifier, including `@name`/`#name` marker forms.
    Identifier,
    /// Dotted identifier such as `lib.Adder`.
    QualifiedIdentifier,
    /// Run of symbol characters such as `+` or `<=`.
    SymbolIdentifier,
    /// `define`
    Define,
    /// `instantiate`
    Instantiate,
    /// `signal`
    Signal,
    /// `bus`
    Bus,
    /// `<-`
    Assignment,
    /// `->`
    Association,
    /// Opening bracket of the given container.
    Open(Container),
    /// Closing bracket of the given container.
    Close(Container),
    /// Statement terminator.
    Executor,
    /// List delimiter.
    Separator,
    /// End of input; repeats forever.
    EndOfFile,
}

impl TokenKind {
    /// Maps a reserved word to its keyword kind.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        match word {
            "define" => Some(TokenKind::Define),
            "instantiate" => Some(TokenKind::Instantiate),
            "signal" => Some(TokenKind::Signal),
            "bus" => Some(TokenKind::Bus),
            _ => None,
        }
    }

    #[inline]
    pub fn is_bracket_open(self) -> bool {
        matches!(self, TokenKind::Open(_))
    }

    #[inline]
    pub fn is_bracket_close(self) -> bool {
        matches!(self, TokenKind::Close(_))
    }

    /// Any of the three identifier kinds.
    #[inline]
    pub fn is_identifier(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier | TokenKind::QualifiedIdentifier | TokenKind::SymbolIdentifier
        )
    }

    /// An identifier spelled with letters rather than symbol characters.
    #[inline]
    pub fn is_text_identifier(self) -> bool {
        matches!(self, TokenKind::Identifier | TokenKind::QualifiedIdentifier)
    }

    #[inline]
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Define | TokenKind::Instantiate | TokenKind::Signal | TokenKind::Bus
        )
    }

    #[inline]
    pub fn is_number(self) -> bool {
        matches!(self, TokenKind::Integer | TokenKind::Real)
    }

    /// Literals and numbers.
    #[inline]
    pub fn is_constant(self) -> bool {
        self == TokenKind::Literal || self.is_number()
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Open(c) => write!(f, "open {c}"),
            TokenKind::Close(c) => write!(f, "close {c}"),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

/// A scanned token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Source text; for literals, the de-stuffed content without quotes.
    pub text: String,
    /// What the token is.
    pub kind: TokenKind,
    /// Source range of the token.
    pub span: Span,
    /// Quote character a literal was written with.
    pub quote: Option<char>,
}

impl Token {
    /// A token of `kind` spelled `text`.
    pub fn new(text: impl Into<String>, kind: TokenKind, span: Span) -> Self {
        Self {
            text: text.into(),
            kind,
            span,
            quote: None,
        }
    }

    /// A literal with de-stuffed content `text`, written between `quote`s.
    pub fn literal(text: impl Into<String>, quote: char, span: Span) -> Self {
        Self {
            quote: Some(quote),
            ..Self::new(text, TokenKind::Literal, span)
        }
    }

    /// The end-of-file token at `span`.
    pub fn eof(span: Span) -> Self {
        Self::new("", TokenKind::EndOfFile, span)
    }

    #[inline]
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// True for a plain identifier spelled exactly `word`.
    #[inline]
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text.as_str() == word
    }
}

impl Element for Token {
    type Kind = TokenKind;

    #[inline]
    fn kind(&self) -> TokenKind {
        self.kind
    }

    fn describe(&self) -> String {
        match self.kind {
            TokenKind::EndOfFile => String::from("end of input"),
            TokenKind::Literal => {
                let q = self.quote.unwrap_or('"');
                let mut s = String::new();
                s.push(q);
                for c in self.text.chars() {
                    if c == q {
                        s.push(q);
                    }
                    s.push(c);
                }
                s.push(q);
                s
            }
            _ => self.text.clone(),
        }
    }

    fn span(&self) -> Option<Span> {
        Some(self.span)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.kind, self.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_tests() {
        assert!(TokenKind::Open(Container::Scalar).is_bracket_open());
        assert!(!TokenKind::Close(Container::List).is_bracket_open());
        assert!(TokenKind::Close(Container::Set).is_bracket_close());
        assert!(TokenKind::SymbolIdentifier.is_identifier());
        assert!(!TokenKind::SymbolIdentifier.is_text_identifier());
        assert!(TokenKind::QualifiedIdentifier.is_text_identifier());
        assert!(TokenKind::Bus.is_keyword());
        assert!(!TokenKind::Identifier.is_keyword());
        assert!(TokenKind::Real.is_number());
        assert!(TokenKind::Literal.is_constant());
        assert!(!TokenKind::Literal.is_number());
    }

    #[test]
    fn exactly_four_reserved_words() {
        for (w, k) in [
            ("define", TokenKind::Define),
            ("instantiate", TokenKind::Instantiate),
            ("signal", TokenKind::Signal),
            ("bus", TokenKind::Bus),
        ] {
            assert_eq!(TokenKind::keyword(w), Some(k));
        }
        for w in ["in", "out", "entity", "architecture", "Define"] {
            assert_eq!(TokenKind::keyword(w), None);
        }
    }

    #[test]
    fn describe_and_display() {
        let lit = Token::new("a\"b", TokenKind::Literal, Span::default());
        assert_eq!(lit.describe().as_str(), "\"a\"\"b\"");
        let lit = Token::literal("it's", '\'', Span::default());
        assert_eq!(lit.describe().as_str(), "'it''s'");
        assert_eq!(Token::eof(Span::default()).describe().as_str(), "end of input");
        let open = Token::new("(", TokenKind::Open(Container::List), Span::default());
        assert_eq!(open.to_string(), "open list(\"(\")");
        assert!(Token::new("in", TokenKind::Identifier, Span::default()).is_word("in"));
    }
}
