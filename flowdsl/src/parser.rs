//! Statement grammar and runtime operator-precedence expressions.
//!
//! [`Parser`] drives a token [`Cursor`] over a [`Lexer`] and reports every
//! construct to a [`GraphBuilder`]. Statements are recognised by recursive
//! descent:
//!
//! ```text
//! define entity <Label> <symbol> <notation> [<precedence>] [in <names>] [out <names>] [bus <names>]
//! define architecture <Name> <entity> { <statement> ; ... }
//! instantiate <entity> [in <bindings>] [out <bindings>] [bus <names>]
//! signal <names>
//! bus <names>
//! <name> [, <name>]* <- <expression>
//! <expression>
//! ```
//!
//! Expressions are parsed by precedence climbing over explicit operand and
//! operator stacks. Which symbols are operators, and how tightly they bind,
//! is looked up in the session's [`OperatorTable`] at the moment each token
//! is examined; nothing about operators is fixed in the grammar.

use crate::{
    Binding, ConstantKind, Container, EntityDefinition, Fixity, GraphBuilder, Lexer, LexerConfig,
    LexerStats, Notation, OperatorDescriptor, OperatorTable, Token, TokenKind,
};
use flowscan::{Cursor, Result, Source};
use smartstring::alias::String;

/// One parsed statement, with the builder's nodes where the statement
/// produced any.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement<N> {
    /// `define entity`; the symbol is registered by the time this returns.
    EntityDefinition(EntityDefinition),
    /// `define architecture` with its parsed body.
    Architecture {
        name: String,
        entity: String,
        body: Vec<Statement<N>>,
    },
    /// Output nodes returned by the builder.
    Instantiation { entity: String, outputs: Vec<N> },
    SignalDeclaration(Vec<N>),
    BusDeclaration(Vec<N>),
    /// `targets <- value`, already passed to [`GraphBuilder::assign`].
    Assignment { targets: Vec<N>, value: N },
    /// A bare expression.
    Expression(N),
}

/// A parse session over one character source.
///
/// The session owns its [`OperatorTable`]; `define entity` statements add to
/// it, and [`reset`](Parser::reset) swaps it together with the input.
pub struct Parser<S>
where
    S: Source<Item = char>,
{
    tokens: Cursor<Lexer<S>>,
    statements: usize,
}

impl<S> Parser<S>
where
    S: Source<Item = char>,
{
    /// Starts a session on `source`. Both cursors buffer within
    /// `config.limits`.
    pub fn new(source: S, config: LexerConfig, opers: OperatorTable) -> Self {
        let limits = config.limits;
        Self {
            tokens: Cursor::new(Lexer::new(source, config, opers), limits),
            statements: 0,
        }
    }

    /// Restarts on a new source with a new operator table, discarding
    /// buffered tokens and outstanding marks.
    pub fn reset(&mut self, source: S, opers: OperatorTable) {
        log::debug!("parser reset after {} statement(s)", self.statements);
        let config = self.tokens.source().config().clone();
        self.tokens.reset(Lexer::new(source, config, opers));
        self.statements = 0;
    }

    /// The session's operator table, including symbols defined so far.
    pub fn opers(&self) -> &OperatorTable {
        self.tokens.source().opers()
    }

    pub fn opers_mut(&mut self) -> &mut OperatorTable {
        self.tokens.source_mut().opers_mut()
    }

    /// Counters of the underlying lexer.
    pub fn lexer_stats(&self) -> LexerStats {
        self.tokens.source().stats()
    }

    /// Parses the next statement. Returns `Ok(None)` at end of input, and
    /// keeps doing so on further calls.
    pub fn parse_statement<B>(&mut self, b: &mut B) -> Result<Option<Statement<B::Node>>>
    where
        B: GraphBuilder,
    {
        while self.tokens.accept(TokenKind::Executor)?.is_some() {}
        if self.peek_kind()? == TokenKind::EndOfFile {
            return Ok(None);
        }
        let stmt = self.statement(b)?;
        if self.tokens.accept(TokenKind::Executor)?.is_none()
            && self.peek_kind()? != TokenKind::EndOfFile
        {
            return Err(self.tokens.mismatch("Executor"));
        }
        self.statements += 1;
        log::debug!("statement {} parsed", self.statements);
        Ok(Some(stmt))
    }

    /// Parses statements until end of input.
    pub fn parse_all<B>(&mut self, b: &mut B) -> Result<Vec<Statement<B::Node>>>
    where
        B: GraphBuilder,
    {
        let mut stmts = Vec::new();
        while let Some(stmt) = self.parse_statement(b)? {
            stmts.push(stmt);
        }
        Ok(stmts)
    }

    #[inline]
    fn peek(&mut self) -> Result<&Token> {
        self.tokens.peek()
    }

    #[inline]
    fn peek_kind(&mut self) -> Result<TokenKind> {
        self.tokens.kind_at(0)
    }

    fn statement<B: GraphBuilder>(&mut self, b: &mut B) -> Result<Statement<B::Node>> {
        match self.peek_kind()? {
            TokenKind::Define => {
                self.tokens.consume()?;
                if self.accept_word("entity")? {
                    self.entity_definition(b)
                } else if self.accept_word("architecture")? {
                    self.architecture(b)
                } else {
                    Err(self.tokens.mismatch("entity or architecture"))
                }
            }
            TokenKind::Instantiate => self.instantiation(b),
            TokenKind::Signal => {
                self.tokens.consume()?;
                let names = self.names()?;
                let nodes = names
                    .iter()
                    .map(|n| b.declare_signal(n))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                Ok(Statement::SignalDeclaration(nodes))
            }
            TokenKind::Bus => {
                self.tokens.consume()?;
                let names = self.names()?;
                let nodes = names
                    .iter()
                    .map(|n| b.declare_bus(n))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                Ok(Statement::BusDeclaration(nodes))
            }
            _ => match self.assignment_targets()? {
                Some(names) => {
                    let targets = names
                        .iter()
                        .map(|n| b.lookup_or_create_named_signal(n))
                        .collect::<anyhow::Result<Vec<_>>>()?;
                    let value = self.expression(b)?;
                    b.assign(&targets, &value)?;
                    Ok(Statement::Assignment { targets, value })
                }
                None => Ok(Statement::Expression(self.expression(b)?)),
            },
        }
    }

    fn accept_word(&mut self, word: &str) -> Result<bool> {
        if self.peek()?.is_word(word) {
            self.tokens.consume()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// `name [, name]*`, all plain or qualified identifiers.
    fn names(&mut self) -> Result<Vec<String>> {
        let mut names = vec![self.name()?];
        while self.tokens.accept(TokenKind::Separator)?.is_some() {
            names.push(self.name()?);
        }
        Ok(names)
    }

    fn name(&mut self) -> Result<String> {
        if self.peek_kind()?.is_text_identifier() {
            Ok(self.tokens.consume()?.text)
        } else {
            Err(self.tokens.mismatch("identifier"))
        }
    }

    /// An entity reference: its label or its symbol.
    fn entity_ref(&mut self) -> Result<String> {
        let kind = self.peek_kind()?;
        if kind.is_identifier() || kind == TokenKind::Literal {
            Ok(self.tokens.consume()?.text)
        } else {
            Err(self.tokens.mismatch("entity name"))
        }
    }

    /// A symbol in a definition. Adjacent symbol tokens are joined, so a new
    /// multi-character symbol can be written before the table knows it.
    fn symbol(&mut self) -> Result<String> {
        match self.peek_kind()? {
            TokenKind::Literal | TokenKind::Identifier | TokenKind::QualifiedIdentifier => {
                Ok(self.tokens.consume()?.text)
            }
            TokenKind::SymbolIdentifier => {
                let first = self.tokens.consume()?;
                let mut text = first.text;
                let mut end = first.span.end;
                loop {
                    let next = self.peek()?;
                    if next.kind != TokenKind::SymbolIdentifier || next.span.start != end {
                        break;
                    }
                    let next = self.tokens.consume()?;
                    text.push_str(&next.text);
                    end = next.span.end;
                }
                Ok(text)
            }
            _ => Err(self.tokens.mismatch("operator symbol")),
        }
    }

    fn entity_definition<B: GraphBuilder>(&mut self, b: &mut B) -> Result<Statement<B::Node>> {
        let label = self.name()?;
        let symbol = self.symbol()?;

        let t = self.peek()?;
        let notation = match t.text.parse::<Notation>() {
            Ok(n) if t.kind == TokenKind::Identifier => n,
            _ => return Err(self.tokens.mismatch("notation")),
        };
        self.tokens.consume()?;

        let mut precedence = 0;
        if self.peek_kind()? == TokenKind::Integer {
            precedence = match self.peek()?.text.parse::<u32>() {
                Ok(p) => p,
                Err(_) => return Err(self.tokens.mismatch("precedence")),
            };
            self.tokens.consume()?;
        }

        let inputs = if self.accept_word("in")? { self.names()? } else { Vec::new() };
        let outputs = if self.accept_word("out")? { self.names()? } else { Vec::new() };
        let buses = if self.tokens.accept(TokenKind::Bus)?.is_some() {
            self.names()?
        } else {
            Vec::new()
        };

        let def = EntityDefinition {
            label,
            symbol,
            notation,
            precedence,
            inputs,
            outputs,
            buses,
        };
        b.define_entity(&def)?;
        self.opers_mut().register(def.descriptor());
        Ok(Statement::EntityDefinition(def))
    }

    fn architecture<B: GraphBuilder>(&mut self, b: &mut B) -> Result<Statement<B::Node>> {
        let name = self.name()?;
        let entity = self.entity_ref()?;
        let close = TokenKind::Close(Container::Set);
        self.tokens.match_kind(TokenKind::Open(Container::Set))?;
        b.begin_architecture(&name, &entity)?;

        let mut body = Vec::new();
        loop {
            while self.tokens.accept(TokenKind::Executor)?.is_some() {}
            if self.tokens.accept(close)?.is_some() {
                break;
            }
            body.push(self.statement(b)?);
            if self.tokens.accept(TokenKind::Executor)?.is_none() {
                self.tokens.match_kind(close)?;
                break;
            }
        }

        b.end_architecture()?;
        log::debug!("architecture {name} with {} statement(s)", body.len());
        Ok(Statement::Architecture { name, entity, body })
    }

    fn instantiation<B: GraphBuilder>(&mut self, b: &mut B) -> Result<Statement<B::Node>> {
        self.tokens.match_kind(TokenKind::Instantiate)?;
        let entity = self.entity_ref()?;

        let inputs = if self.accept_word("in")? {
            self.bindings(b, false)?
        } else {
            Vec::new()
        };
        let outputs = if self.accept_word("out")? {
            self.bindings(b, true)?
        } else {
            Vec::new()
        };
        let mut buses = Vec::new();
        if self.tokens.accept(TokenKind::Bus)?.is_some() {
            for name in self.names()? {
                buses.push(b.lookup_named_bus(&name)?);
            }
        }

        let outputs = b.instantiate(&entity, inputs, outputs, buses)?;
        Ok(Statement::Instantiation { entity, outputs })
    }

    /// Separator-delimited port bindings. Output values are signal names,
    /// input values are expressions.
    fn bindings<B: GraphBuilder>(
        &mut self,
        b: &mut B,
        outputs: bool,
    ) -> Result<Vec<Binding<B::Node>>> {
        let mut list = Vec::new();
        loop {
            let label = if self.peek_kind()? == TokenKind::Identifier
                && self.tokens.kind_at(1)? == TokenKind::Association
            {
                let label = self.tokens.consume()?.text;
                self.tokens.consume()?;
                Some(label)
            } else {
                None
            };
            let value = if outputs {
                let name = self.name()?;
                b.lookup_or_create_named_signal(&name)?
            } else {
                self.expression(b)?
            };
            list.push(Binding { label, value });
            if self.tokens.accept(TokenKind::Separator)?.is_none() {
                return Ok(list);
            }
        }
    }

    /// Speculatively scans `name [, name]* <-`. On success the tokens stay
    /// consumed; otherwise the cursor is rolled back.
    fn assignment_targets(&mut self) -> Result<Option<Vec<String>>> {
        self.tokens.mark();
        let mut names = Vec::new();
        loop {
            if !self.peek_kind()?.is_text_identifier() {
                break;
            }
            names.push(self.tokens.consume()?.text);
            if self.tokens.accept(TokenKind::Separator)?.is_some() {
                continue;
            }
            if self.tokens.accept(TokenKind::Assignment)?.is_some() {
                self.tokens.commit_mark();
                return Ok(Some(names));
            }
            break;
        }
        self.tokens.rollback_mark();
        Ok(None)
    }

    /// Parses a full expression.
    fn expression<B: GraphBuilder>(&mut self, b: &mut B) -> Result<B::Node> {
        self.climb(b, None)
    }

    /// Precedence climbing. With `bound`, stops at any operator that does not
    /// bind tighter than `bound`, which is how prefix operands are delimited.
    fn climb<B: GraphBuilder>(&mut self, b: &mut B, bound: Option<u32>) -> Result<B::Node> {
        let binds = |prec: u32| bound.is_none_or(|limit| prec < limit);

        let mut operands = vec![self.operand(b)?];
        let mut operators: Vec<OperatorDescriptor> = Vec::new();
        loop {
            while let Some(op) = self.operator_at(Fixity::Infix)? {
                if !binds(op.precedence) {
                    break;
                }
                while operators.last().is_some_and(|top| reduces_before(top, &op)) {
                    reduce(b, &mut operands, &mut operators)?;
                }
                self.tokens.consume()?;
                operators.push(op);
                operands.push(self.operand(b)?);
            }
            while !operators.is_empty() {
                reduce(b, &mut operands, &mut operators)?;
            }

            let mut applied = false;
            while let Some(op) = self.operator_at(Fixity::Postfix)? {
                if !binds(op.precedence) {
                    break;
                }
                self.tokens.consume()?;
                let arg = pop(&mut operands);
                log::trace!("apply postfix {}", op.entity);
                operands.push(b.function_application(&op, vec![arg])?);
                applied = true;
            }
            let more = match self.operator_at(Fixity::Infix)? {
                Some(op) => binds(op.precedence),
                None => false,
            };
            if !(applied && more) {
                return Ok(pop(&mut operands));
            }
        }
    }

    /// The registration of the next token in `fixity`, if it has one.
    fn operator_at(&mut self, fixity: Fixity) -> Result<Option<OperatorDescriptor>> {
        let t = self.peek()?;
        if !t.kind.is_identifier() {
            return Ok(None);
        }
        let text = t.text.clone();
        Ok(self.opers().get(&text, fixity).cloned())
    }

    fn operand<B: GraphBuilder>(&mut self, b: &mut B) -> Result<B::Node> {
        let kind = self.peek_kind()?;
        match kind {
            TokenKind::Literal | TokenKind::Integer | TokenKind::Real => {
                let t = self.tokens.consume()?;
                let ck = match kind {
                    TokenKind::Literal => ConstantKind::Literal,
                    TokenKind::Integer => ConstantKind::Integer,
                    _ => ConstantKind::Real,
                };
                Ok(b.constant(ck, &t.text)?)
            }
            TokenKind::Open(_) => {
                let (container, mut items) = self.group(b)?;
                if container == Container::List && items.len() == 1 {
                    Ok(pop(&mut items))
                } else {
                    Ok(b.encapsulate(container, items)?)
                }
            }
            TokenKind::Identifier | TokenKind::QualifiedIdentifier | TokenKind::SymbolIdentifier => {
                let symbolic = kind == TokenKind::SymbolIdentifier;
                let text = self.peek()?.text.clone();
                let known = self.opers().contains_symbol(&text, None);
                if self.tokens.kind_at(1)? == TokenKind::Open(Container::List) && (known || !symbolic)
                {
                    return self.call(b);
                }
                if let Some(op) = self.operator_at(Fixity::Prefix)? {
                    return self.prefix(b, op);
                }
                if symbolic {
                    return Err(self.tokens.unexpected_operand());
                }
                let t = self.tokens.consume()?;
                Ok(b.lookup_or_create_named_signal(&t.text)?)
            }
            _ => Err(self.tokens.unexpected_operand()),
        }
    }

    fn prefix<B: GraphBuilder>(&mut self, b: &mut B, op: OperatorDescriptor) -> Result<B::Node> {
        self.tokens.consume()?;
        let arg = self.climb(b, Some(op.precedence))?;
        log::trace!("apply prefix {}", op.entity);
        Ok(b.function_application(&op, vec![arg])?)
    }

    fn call<B: GraphBuilder>(&mut self, b: &mut B) -> Result<B::Node> {
        let name = self.tokens.consume()?.text;
        let (_, args) = self.group(b)?;
        let op = match self.opers().resolve_function(&name, args.len()) {
            Some(op) => op.clone(),
            None => OperatorDescriptor::ad_hoc(&name, args.len()),
        };
        log::trace!("apply {}/{}", op.entity, args.len());
        Ok(b.function_application(&op, args)?)
    }

    /// A bracketed, separator-delimited group of expressions.
    fn group<B: GraphBuilder>(&mut self, b: &mut B) -> Result<(Container, Vec<B::Node>)> {
        let container = match self.tokens.consume()?.kind {
            TokenKind::Open(c) => c,
            other => unreachable!("group starts at {other}"),
        };
        let close = TokenKind::Close(container);
        let mut items = Vec::new();
        if self.tokens.accept(close)?.is_some() {
            return Ok((container, items));
        }
        loop {
            items.push(self.expression(b)?);
            if self.tokens.accept(TokenKind::Separator)?.is_none() {
                self.tokens.match_kind(close)?;
                return Ok((container, items));
            }
        }
    }
}

/// Whether `top`, already on the operator stack, must be applied before
/// `incoming` is pushed.
fn reduces_before(top: &OperatorDescriptor, incoming: &OperatorDescriptor) -> bool {
    top.precedence < incoming.precedence
        || (top.precedence == incoming.precedence && !incoming.is_right_assoc())
}

fn reduce<B: GraphBuilder>(
    b: &mut B,
    operands: &mut Vec<B::Node>,
    operators: &mut Vec<OperatorDescriptor>,
) -> Result<()> {
    let op = match operators.pop() {
        Some(op) => op,
        None => unreachable!("reduce with an empty operator stack"),
    };
    let rhs = pop(operands);
    let lhs = pop(operands);
    log::trace!("reduce {} {:?}", op.entity, op.symbol.as_str());
    operands.push(b.function_application(&op, vec![lhs, rhs])?);
    Ok(())
}

fn pop<N>(operands: &mut Vec<N>) -> N {
    match operands.pop() {
        Some(n) => n,
        None => unreachable!("operand stack underflow"),
    }
}
