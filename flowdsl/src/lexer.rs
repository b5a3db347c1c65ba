//! Hand-written, configurable lexer for the dataflow language.
//!
//! [`Lexer`] pulls characters through a [`Cursor`] and produces one [`Token`]
//! per [`next_token`](Lexer::next_token) call. Characters with a syntactic
//! role (quote, brackets, executor, separator, decimal separator) come from
//! [`LexerConfig`], and symbol runs such as `<=` are delimited by what the
//! session's [`OperatorTable`] knows, so defining a new operator changes how
//! later input is tokenized.
//!
//! The lexer is itself a [`Source`] of tokens; the parser runs a second
//! [`Cursor`] over it.

use crate::{LexerConfig, OperatorTable, Token, TokenKind};
use flowscan::{Cursor, EOF_CHAR, Error, Position, Result, Source, Span};
use smartstring::alias::String;
use unicode_general_category::{GeneralCategory, get_general_category};

/// Counters kept by a [`Lexer`] since construction or the last reset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LexerStats {
    /// Tokens produced, including every end-of-file token.
    pub tokens: usize,
    /// Characters consumed, counting re-reads after a rollback.
    pub chars: usize,
    /// Speculative scans abandoned with a rollback.
    pub rollbacks: usize,
}

/// Streaming tokenizer over a character [`Source`].
pub struct Lexer<S>
where
    S: Source<Item = char>,
{
    input: Cursor<S>,
    config: LexerConfig,
    opers: OperatorTable,
    /// Position of the next unconsumed character.
    pos: Position,
    /// Positions saved alongside the cursor's marks.
    saved: Vec<Position>,
    stats: LexerStats,
}

impl<S> Lexer<S>
where
    S: Source<Item = char>,
{
    pub fn new(source: S, config: LexerConfig, opers: OperatorTable) -> Self {
        Self {
            input: Cursor::new(source, config.limits),
            config,
            opers,
            pos: Position::default(),
            saved: Vec::new(),
            stats: LexerStats::default(),
        }
    }

    /// Restarts on a new source with a new operator table.
    pub fn reset(&mut self, source: S, opers: OperatorTable) -> S {
        log::debug!("lexer reset after {:?}", self.stats);
        self.opers = opers;
        self.pos = Position::default();
        self.saved.clear();
        self.stats = LexerStats::default();
        self.input.reset(source)
    }

    pub fn config(&self) -> &LexerConfig {
        &self.config
    }

    pub fn opers(&self) -> &OperatorTable {
        &self.opers
    }

    pub fn opers_mut(&mut self) -> &mut OperatorTable {
        &mut self.opers
    }

    pub fn stats(&self) -> LexerStats {
        self.stats.clone()
    }

    /// Position of the next character to be scanned.
    pub fn position(&self) -> Position {
        self.pos
    }

    /// Scans the next token. Once the input is exhausted every call returns
    /// an [`TokenKind::EndOfFile`] token.
    pub fn next_token(&mut self) -> Result<Token> {
        let token = self.scan()?;
        self.stats.tokens += 1;
        log::trace!("TOKEN: {} at {}", token, token.span);
        Ok(token)
    }

    fn scan(&mut self) -> Result<Token> {
        loop {
            let c = self.peek(0)?;
            let start = self.pos;

            if c != '\n' && self.is_blank(c) {
                self.bump()?;
                continue;
            }
            if c == self.config.quote {
                return self.literal();
            }
            if c.is_ascii_digit() {
                return self.number();
            }
            if (c == '@' || c == '#') && is_ident_start(self.peek(1)?) {
                let mut text = String::new();
                text.push(self.bump()?);
                return self.identifier(text, start);
            }
            if is_ident_start(c) {
                return self.identifier(String::new(), start);
            }
            if let Some(kind) = arrow(c, self.peek(1)?) {
                self.bump()?;
                self.bump()?;
                return Ok(self.token_from(arrow_text(kind), kind, start));
            }
            if let Some(k) = self.config.opening(c) {
                return self.single(TokenKind::Open(k), start);
            }
            if let Some(k) = self.config.closing(c) {
                return self.single(TokenKind::Close(k), start);
            }
            if c == self.config.executor {
                return self.single(TokenKind::Executor, start);
            }
            if c == self.config.separator {
                return self.single(TokenKind::Separator, start);
            }
            if c == '\n' {
                self.bump()?;
                loop {
                    let next = self.peek(0)?;
                    if !self.is_blank(next) {
                        break;
                    }
                    self.bump()?;
                }
                continue;
            }
            if c == EOF_CHAR {
                return Ok(Token::eof(Span::point(start)));
            }
            if is_symbolish(c) {
                return self.symbol(start);
            }
            return Err(Error::UnexpectedCharacter { ch: c, position: start });
        }
    }

    /// Whitespace without a configured role.
    #[inline]
    fn is_blank(&self, c: char) -> bool {
        c.is_whitespace() && c != self.config.executor && c != self.config.separator
    }

    #[inline]
    fn peek(&mut self, k: usize) -> Result<char> {
        Ok(*self.input.lookahead_at(k)?)
    }

    fn bump(&mut self) -> Result<char> {
        let c = self.input.consume()?;
        if c != EOF_CHAR {
            self.pos.advance(c);
            self.stats.chars += 1;
        }
        Ok(c)
    }

    fn mark(&mut self) {
        self.input.mark();
        self.saved.push(self.pos);
    }

    fn commit(&mut self) {
        self.input.commit_mark();
        self.saved.pop();
    }

    fn rollback(&mut self) {
        self.input.rollback_mark();
        if let Some(pos) = self.saved.pop() {
            self.pos = pos;
        }
        self.stats.rollbacks += 1;
    }

    fn token_from(&self, text: impl Into<String>, kind: TokenKind, start: Position) -> Token {
        Token::new(text, kind, Span::new(start, self.pos))
    }

    fn single(&mut self, kind: TokenKind, start: Position) -> Result<Token> {
        let mut text = String::new();
        text.push(self.bump()?);
        Ok(self.token_from(text, kind, start))
    }

    fn literal(&mut self) -> Result<Token> {
        let start = self.pos;
        let quote = self.bump()?;
        let mut text = String::new();
        loop {
            let c = self.bump()?;
            if c == EOF_CHAR {
                return Err(Error::UnterminatedLiteral { position: start });
            }
            if c == quote {
                if self.peek(0)? != quote {
                    break;
                }
                self.bump()?;
            }
            text.push(c);
        }
        Ok(Token::literal(text, quote, Span::new(start, self.pos)))
    }

    fn digits(&mut self, text: &mut String) -> Result<()> {
        while self.peek(0)?.is_ascii_digit() {
            text.push(self.bump()?);
        }
        Ok(())
    }

    fn number(&mut self) -> Result<Token> {
        let start = self.pos;
        let fmt = self.config.number;
        let mut text = String::new();
        self.digits(&mut text)?;

        if self.peek(0)? != fmt.decimal_separator || !self.peek(1)?.is_ascii_digit() {
            return Ok(self.token_from(text, TokenKind::Integer, start));
        }
        text.push(self.bump()?);
        self.digits(&mut text)?;

        if fmt.is_exponent_marker(self.peek(0)?) {
            self.mark();
            let mut exponent = String::new();
            exponent.push(self.bump()?);
            let c = self.peek(0)?;
            if c == fmt.negative_sign || c == '+' {
                exponent.push(self.bump()?);
            }
            if self.peek(0)?.is_ascii_digit() {
                self.digits(&mut exponent)?;
                self.commit();
                text.push_str(&exponent);
            } else {
                log::trace!("no exponent after {:?}, rolling back", text.as_str());
                self.rollback();
            }
        }
        Ok(self.token_from(text, TokenKind::Real, start))
    }

    fn identifier(&mut self, mut text: String, start: Position) -> Result<Token> {
        let marked = !text.is_empty();
        self.ident_run(&mut text)?;
        let mut kind = TokenKind::Identifier;
        while self.peek(0)? == '.' && is_ident_start(self.peek(1)?) {
            text.push(self.bump()?);
            self.ident_run(&mut text)?;
            kind = TokenKind::QualifiedIdentifier;
        }
        if kind == TokenKind::Identifier && !marked {
            if let Some(k) = TokenKind::keyword(&text) {
                kind = k;
            }
        }
        Ok(self.token_from(text, kind, start))
    }

    fn ident_run(&mut self, text: &mut String) -> Result<()> {
        text.push(self.bump()?);
        while is_ident_continue(self.peek(0)?) {
            text.push(self.bump()?);
        }
        Ok(())
    }

    /// Longest registered symbol at the cursor, or a single symbol character.
    fn symbol(&mut self, start: Position) -> Result<Token> {
        let mut run = String::new();
        run.push(self.peek(0)?);
        let mut len = 1;
        let mut best = 1;
        loop {
            let c = self.peek(len)?;
            if !is_symbolish(c) || arrow(c, self.peek(len + 1)?).is_some() {
                break;
            }
            run.push(c);
            if !self.opers.has_symbol_prefix(&run) {
                break;
            }
            len += 1;
            if self.opers.contains_symbol(&run, None) {
                best = len;
            }
        }
        let mut text = String::new();
        for _ in 0..best {
            text.push(self.bump()?);
        }
        Ok(self.token_from(text, TokenKind::SymbolIdentifier, start))
    }
}

impl<S> Source for Lexer<S>
where
    S: Source<Item = char>,
{
    type Item = Token;

    fn read(&mut self, buf: &mut [Token]) -> Result<usize> {
        for slot in buf.iter_mut() {
            *slot = self.next_token()?;
        }
        Ok(buf.len())
    }

    fn end_marker(&self) -> Token {
        Token::eof(Span::point(self.pos))
    }
}

fn arrow(c: char, next: char) -> Option<TokenKind> {
    match (c, next) {
        ('<', '-') => Some(TokenKind::Assignment),
        ('-', '>') => Some(TokenKind::Association),
        _ => None,
    }
}

fn arrow_text(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Assignment => "<-",
        _ => "->",
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_'
        || matches!(
            get_general_category(c),
            GeneralCategory::UppercaseLetter
                | GeneralCategory::LowercaseLetter
                | GeneralCategory::TitlecaseLetter
                | GeneralCategory::OtherLetter
        )
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Math, currency, modifier and other symbols, dash and connector
/// punctuation, other punctuation, and modifier letters.
fn is_symbolish(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::MathSymbol
            | GeneralCategory::CurrencySymbol
            | GeneralCategory::ModifierSymbol
            | GeneralCategory::OtherSymbol
            | GeneralCategory::DashPunctuation
            | GeneralCategory::ConnectorPunctuation
            | GeneralCategory::OtherPunctuation
            | GeneralCategory::ModifierLetter
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Container, Notation, OperatorDescriptor};
    use flowscan::{CharGuard, IterSource, ReaderSource};

    type Text = IterSource<CharGuard<std::vec::IntoIter<char>>>;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn lexer(s: &str) -> Lexer<Text> {
        Lexer::new(
            IterSource::from_text(s),
            LexerConfig::default(),
            OperatorTable::standard(),
        )
    }

    fn lex_with<S: Source<Item = char>>(lx: &mut Lexer<S>) -> Result<Vec<Token>> {
        let mut ts = Vec::new();
        loop {
            let t = lx.next_token()?;
            if t.kind == TokenKind::EndOfFile {
                return Ok(ts);
            }
            ts.push(t);
        }
    }

    fn lex(s: &str) -> Result<Vec<Token>> {
        lex_with(&mut lexer(s))
    }

    fn kinds(s: &str) -> Vec<TokenKind> {
        lex(s).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn texts(s: &str) -> Vec<std::string::String> {
        lex(s)
            .unwrap()
            .into_iter()
            .map(|t| t.text.to_string())
            .collect()
    }

    #[test]
    fn numbers() {
        init();
        use TokenKind::*;
        assert_eq!(kinds("123"), [Integer]);
        assert_eq!(kinds("12.5"), [Real]);
        assert_eq!(kinds("12.5e-3"), [Real]);
        assert_eq!(texts("12.5e-3 1.0E+7 2.5e4"), ["12.5e-3", "1.0E+7", "2.5e4"]);
        assert_eq!(kinds("12."), [Integer, SymbolIdentifier]);
    }

    #[test]
    fn incomplete_exponent_is_rolled_back() {
        init();
        let mut lx = lexer("12.5e");
        let t = lx.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::Real);
        assert_eq!(t.text.as_str(), "12.5");
        assert_eq!(lx.position().column, 4);
        assert_eq!(lx.stats().rollbacks, 1);
        let e = lx.next_token().unwrap();
        assert_eq!(e.kind, TokenKind::Identifier);
        assert_eq!(e.text.as_str(), "e");

        let ts = lex("1.5e-x").unwrap();
        assert_eq!(ts[0].text.as_str(), "1.5");
        assert_eq!(ts[1].text.as_str(), "e");
        assert_eq!(ts[2].text.as_str(), "-");
    }

    #[test]
    fn literals_are_destuffed() {
        init();
        let ts = lex(r#""a""b" "" "x y""#).unwrap();
        assert!(ts.len() == 3);
        assert!(ts.iter().all(|t| t.kind == TokenKind::Literal));
        assert_eq!(ts[0].text.as_str(), "a\"b");
        assert_eq!(ts[1].text.as_str(), "");
        assert_eq!(ts[2].text.as_str(), "x y");
    }

    #[test]
    fn unterminated_literal() {
        init();
        match lex("x <- \"abc") {
            Err(Error::UnterminatedLiteral { position }) => {
                assert_eq!(position, Position::new(0, 5));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            lex("\"ab\"\"\n"),
            Err(Error::UnterminatedLiteral { .. })
        ));
    }

    #[test]
    fn identifiers_and_keywords() {
        init();
        use TokenKind::*;
        assert_eq!(
            kinds("define instantiate signal bus in out entity _x1 λ"),
            [Define, Instantiate, Signal, Bus, Identifier, Identifier, Identifier, Identifier, Identifier]
        );
        assert_eq!(kinds("lib.Adder a.b.c"), [QualifiedIdentifier, QualifiedIdentifier]);
        assert_eq!(texts("lib.Adder"), ["lib.Adder"]);
        assert_eq!(kinds("@bus #signal @"), [Identifier, Identifier, SymbolIdentifier]);
        assert_eq!(texts("@bus #signal"), ["@bus", "#signal"]);
    }

    #[test]
    fn arrows_take_priority() {
        init();
        use TokenKind::*;
        assert_eq!(kinds("a<-b"), [Identifier, Assignment, Identifier]);
        assert_eq!(kinds("x->1"), [Identifier, Association, Integer]);
        assert_eq!(kinds("a <- -b"), [Identifier, Assignment, SymbolIdentifier, Identifier]);
    }

    #[test]
    fn brackets_and_punctuation() {
        init();
        use TokenKind::*;
        assert_eq!(
            kinds("( [ { ⟨ ⟩ } ] ) ; ,"),
            [
                Open(Container::List),
                Open(Container::Vector),
                Open(Container::Set),
                Open(Container::Scalar),
                Close(Container::Scalar),
                Close(Container::Set),
                Close(Container::Vector),
                Close(Container::List),
                Executor,
                Separator,
            ]
        );
    }

    #[test]
    fn configured_characters() {
        init();
        use TokenKind::*;
        let cfg = LexerConfig::default()
            .with_executor('\n')
            .with_separator(';')
            .with_quote('\'')
            .with_brackets(Container::Scalar, '<', '>');
        let mut lx = Lexer::new(
            IterSource::from_text("<a; 'it''s'>\nb"),
            cfg,
            OperatorTable::standard(),
        );
        let ts = lex_with(&mut lx).unwrap();
        let ks: Vec<_> = ts.iter().map(|t| t.kind).collect();
        assert_eq!(
            ks,
            [
                Open(Container::Scalar),
                Identifier,
                Separator,
                Literal,
                Close(Container::Scalar),
                Executor,
                Identifier
            ]
        );
        assert_eq!(ts[3].text.as_str(), "it's");
    }

    #[test]
    fn whitespace_executor_and_separator_are_kept() {
        init();
        use TokenKind::*;
        let cfg = LexerConfig::default().with_executor('\t').with_separator('\r');
        let mut lx = Lexer::new(
            IterSource::from_text("a\tb \r c\n\td"),
            cfg,
            OperatorTable::standard(),
        );
        let ks: Vec<_> = lex_with(&mut lx).unwrap().into_iter().map(|t| t.kind).collect();
        assert_eq!(
            ks,
            [Identifier, Executor, Identifier, Separator, Identifier, Executor, Identifier]
        );
    }

    #[test]
    fn newline_runs_are_skipped() {
        init();
        let ts = lex("a\n\n  \n\t b").unwrap();
        assert!(ts.len() == 2);
        assert_eq!(ts[1].span.start, Position::new(3, 2));
    }

    #[test]
    fn symbol_runs_follow_the_table() {
        init();
        let mut opers = OperatorTable::standard();
        opers.register(OperatorDescriptor::new("LessEqual", "<=", Notation::LeftAssocInfix, 70));
        opers.register(OperatorDescriptor::new("Compare", "<=>", Notation::LeftAssocInfix, 70));
        let mut lx = Lexer::new(
            IterSource::from_text("a<=b <=>c <=!d *-e ≤"),
            LexerConfig::default(),
            opers,
        );
        let ts = lex_with(&mut lx).unwrap();
        let texts: Vec<&str> = ts.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(
            texts,
            ["a", "<=", "b", "<=>", "c", "<=", "!", "d", "*", "-", "e", "≤"]
        );
        assert!(ts.iter().filter(|t| !t.kind.is_text_identifier()).all(|t| t.kind == TokenKind::SymbolIdentifier));
    }

    #[test]
    fn symbol_run_stops_before_arrows() {
        init();
        let mut opers = OperatorTable::standard();
        opers.register(OperatorDescriptor::new("Weird", "*<", Notation::Postfix, 1));
        let mut lx = Lexer::new(IterSource::from_text("a*<-b"), LexerConfig::default(), opers);
        let ks: Vec<_> = lex_with(&mut lx).unwrap().into_iter().map(|t| t.kind).collect();
        use TokenKind::*;
        assert_eq!(ks, [Identifier, SymbolIdentifier, Assignment, Identifier]);
    }

    #[test]
    fn unexpected_character() {
        init();
        match lex("a ( \u{0007}") {
            Err(Error::UnexpectedCharacter { ch, position }) => {
                assert_eq!(ch, '\u{0007}');
                assert_eq!(position, Position::new(0, 4));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn end_of_file_repeats() {
        init();
        let mut lx = lexer("x");
        lx.next_token().unwrap();
        for _ in 0..5 {
            assert_eq!(lx.next_token().unwrap().kind, TokenKind::EndOfFile);
        }
        assert_eq!(lx.stats().tokens, 6);
    }

    #[test]
    fn spans_cover_tokens() {
        init();
        let ts = lex("ab <- \"q\"\n  12.5").unwrap();
        assert_eq!(ts[0].span, flowscan::Span::new(Position::new(0, 0), Position::new(0, 2)));
        assert_eq!(ts[1].span.start, Position::new(0, 3));
        assert_eq!(ts[2].span.end, Position::new(0, 9));
        assert_eq!(ts[3].span.start, Position::new(1, 2));
        assert_eq!(ts[3].span.end, Position::new(1, 6));
    }

    #[test]
    fn reads_from_io() {
        init();
        let mut lx = Lexer::new(
            ReaderSource::new("σ <- ⟨1, 2⟩;".as_bytes()),
            LexerConfig::default(),
            OperatorTable::standard(),
        );
        let ts = lex_with(&mut lx).unwrap();
        assert!(ts.len() == 8);
        assert_eq!(ts[0].text.as_str(), "σ");
    }

    #[test]
    fn reset_starts_over() {
        init();
        let mut lx = lexer("a b c");
        lx.next_token().unwrap();
        lx.reset(IterSource::from_text("zz"), OperatorTable::new());
        assert_eq!(lx.next_token().unwrap().text.as_str(), "zz");
        assert!(lx.opers().is_empty());
        assert_eq!(lx.stats().tokens, 1);
    }
}
