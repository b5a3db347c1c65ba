//! Released under the terms of the GNU Lesser General Public License, version 3.0
//! or (at your option) any later version (LGPL-3.0-or-later).
//!
//! Streaming lexer and operator-precedence parser for a dataflow description
//! language.
//!
//! Source text describes entities (named operations with input, output and
//! bus ports), their architectures, instances, signals and buses. Operators
//! are not fixed by the grammar: every session carries an [`OperatorTable`]
//! that `define entity` statements extend while the input is being read, so a
//! newly defined symbol is usable in the very next statement.
//!
//! The parser has no graph model of its own. Each construct is reported to a
//! [`GraphBuilder`]; [`TreeBuilder`] is a reference implementation that
//! records printable expression trees.
//!
//! Key components:
//! - `config`: the configurable characters and buffer limits
//! - `token`: [`Token`], [`TokenKind`] and bracket [`Container`]s
//! - `oper`: operator notation, precedence and the runtime [`OperatorTable`]
//! - `lexer`: the character-level scanner, itself a token [`flowscan::Source`]
//! - `builder`: the [`GraphBuilder`] seam
//! - `parser`: statements and precedence-climbing expressions
//! - `tree`: the [`TreeBuilder`] reference builder
//!
//! # Examples
//!
//! ```rust
//! # use flowdsl::{LexerConfig, OperatorTable, Parser, Statement, TreeBuilder};
//! # use flowscan::IterSource;
//! let src = "define entity Shift << leftinfix 55 in a, b out y;\n\
//!            z <- 1 << 2 + 3;";
//! let mut p = Parser::new(
//!     IterSource::from_text(src),
//!     LexerConfig::default(),
//!     OperatorTable::standard(),
//! );
//! let mut b = TreeBuilder::new();
//! let stmts = p.parse_all(&mut b)?;
//! assert!(matches!(stmts[0], Statement::EntityDefinition(_)));
//! assert_eq!(b.assignments()[0].value.to_string(), "Add(Shift(1, 2), 3)");
//! # Ok::<(), flowscan::Error>(())
//! ```

pub mod builder;
pub mod config;
pub mod lexer;
pub mod oper;
pub mod parser;
pub mod token;
pub mod tree;

pub use crate::builder::{Binding, ConstantKind, EntityDefinition, GraphBuilder};
pub use crate::config::{BracketPair, LexerConfig, NumberFormat};
pub use crate::lexer::{Lexer, LexerStats};
pub use crate::oper::{
    Fixity, Notation, OperatorDescriptor, OperatorSlots, OperatorTable, ParseNotationError,
};
pub use crate::parser::{Parser, Statement};
pub use crate::token::{Container, Token, TokenKind};
pub use crate::tree::{Architecture, Assignment, Expr, Instance, TreeBuilder};
