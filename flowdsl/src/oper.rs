//! Operator definitions and precedence handling.
//!
//! This module defines the runtime operator table consulted by the lexer
//! (to delimit symbol runs) and by the parser (to resolve prefix, infix and
//! postfix applications). Operators are not part of the grammar: they are
//! registered at any time before use, including by `define entity`
//! statements in the input itself.
//!
//! # Components
//! - [`Notation`]: how an operator is written relative to its operands.
//! - [`Fixity`]: the syntactic slot a notation occupies (function, prefix,
//!   infix or postfix).
//! - [`OperatorDescriptor`]: one registration record.
//! - [`OperatorTable`]: symbol to per-fixity descriptors, in insertion order.
//!
//! # Precedence
//! A precedence group is an integer class where **lower values bind tighter**:
//! with the [`standard`](OperatorTable::standard) table `^` (19) binds tighter
//! than `*` (50), which binds tighter than `+` (60).

use indexmap::IndexMap;
use smartstring::alias::String;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How an operator is written relative to its operands.
///
/// | Variant | Example | Text |
/// |---------|---------|------|
/// | [`Notation::None`] | `max(a, b)` | `none` |
/// | [`Notation::Prefix`] | `-a` | `prefix` |
/// | [`Notation::Postfix`] | `a!` | `postfix` |
/// | [`Notation::LeftAssocInfix`] | `a - b - c` = `(a - b) - c` | `leftinfix` |
/// | [`Notation::RightAssocInfix`] | `a ^ b ^ c` = `a ^ (b ^ c)` | `rightinfix` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Notation {
    /// Not an operator; applied in function form only.
    None = 0,
    Prefix = 1,
    Postfix = 2,
    LeftAssocInfix = 3,
    RightAssocInfix = 4,
}

impl Notation {
    /// The total number of notation variants.
    pub const COUNT: usize = 5;

    /// String representations of each variant, in declaration order.
    pub const STRS: &[&str] = &["none", "prefix", "postfix", "leftinfix", "rightinfix"];

    /// The table slot this notation is registered under.
    pub fn fixity(self) -> Fixity {
        match self {
            Notation::None => Fixity::Function,
            Notation::Prefix => Fixity::Prefix,
            Notation::Postfix => Fixity::Postfix,
            Notation::LeftAssocInfix | Notation::RightAssocInfix => Fixity::Infix,
        }
    }

    #[inline]
    pub fn is_infix(self) -> bool {
        matches!(self, Notation::LeftAssocInfix | Notation::RightAssocInfix)
    }
}

impl From<Notation> for usize {
    fn from(n: Notation) -> Self {
        n as usize
    }
}

impl fmt::Display for Notation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Notation::STRS[usize::from(*self)])
    }
}

/// Error returned when a string names no [`Notation`].
#[derive(Debug, Clone, Error)]
#[error("invalid notation: {0}")]
pub struct ParseNotationError(String);

impl FromStr for Notation {
    type Err = ParseNotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Notation::None),
            "prefix" => Ok(Notation::Prefix),
            "postfix" => Ok(Notation::Postfix),
            "leftinfix" => Ok(Notation::LeftAssocInfix),
            "rightinfix" => Ok(Notation::RightAssocInfix),
            other => Err(ParseNotationError(String::from(other))),
        }
    }
}

impl TryFrom<&str> for Notation {
    type Error = ParseNotationError;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Syntactic slot of an operator registration.
///
/// Both infix notations share the [`Fixity::Infix`] slot, so a symbol is
/// either left- or right-associative, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Fixity {
    /// Function form, `f(x, y)`.
    Function = 0,
    Prefix = 1,
    Infix = 2,
    Postfix = 3,
}

impl Fixity {
    pub const COUNT: usize = 4;
    pub const STRS: &[&str] = &["function", "prefix", "infix", "postfix"];

    /// Number of operands an application in this slot takes, if fixed.
    pub fn required_arity(self) -> Option<usize> {
        match self {
            Fixity::Function => None,
            Fixity::Prefix | Fixity::Postfix => Some(1),
            Fixity::Infix => Some(2),
        }
    }
}

impl From<Fixity> for usize {
    fn from(f: Fixity) -> Self {
        f as usize
    }
}

impl fmt::Display for Fixity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Fixity::STRS[usize::from(*self)])
    }
}

/// One operator registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorDescriptor {
    /// Surface text, e.g. `+` or `max`.
    pub symbol: String,
    /// Entity the operator applies, e.g. `Add` for `+`.
    pub entity: String,
    pub notation: Notation,
    /// Precedence group; lower binds tighter. Ignored for [`Notation::None`].
    pub precedence: u32,
    /// Operand count of a function-form entry; `None` accepts any count.
    pub arity: Option<usize>,
}

impl OperatorDescriptor {
    pub fn new(
        entity: impl Into<String>,
        symbol: impl Into<String>,
        notation: Notation,
        precedence: u32,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            entity: entity.into(),
            notation,
            precedence,
            arity: None,
        }
    }

    /// A function-form entry taking `arity` operands.
    pub fn function(entity: impl Into<String>, symbol: impl Into<String>, arity: usize) -> Self {
        Self {
            arity: Some(arity),
            ..Self::new(entity, symbol, Notation::None, 0)
        }
    }

    /// Descriptor for a name applied in function form without a registration.
    pub fn ad_hoc(name: &str, arity: usize) -> Self {
        Self::function(name, name, arity)
    }

    #[inline]
    pub fn fixity(&self) -> Fixity {
        self.notation.fixity()
    }

    #[inline]
    pub fn is_right_assoc(&self) -> bool {
        self.notation == Notation::RightAssocInfix
    }

    /// Whether this entry can be applied to `arity` operands.
    pub fn accepts(&self, arity: usize) -> bool {
        match self.fixity().required_arity().or(self.arity) {
            Some(n) => n == arity,
            None => true,
        }
    }
}

impl fmt::Display for OperatorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} {} {}",
            self.entity,
            self.symbol.as_str(),
            self.notation,
            self.precedence
        )
    }
}

/// Descriptors of one symbol, indexed by [`Fixity`].
#[derive(Debug, Clone, Default)]
pub struct OperatorSlots {
    tab: [Option<OperatorDescriptor>; Fixity::COUNT],
}

impl OperatorSlots {
    pub const fn new() -> Self {
        Self {
            tab: [const { None }; Fixity::COUNT],
        }
    }

    /// Returns `true` if any operator (non-function) slot is filled.
    pub fn is_operator(&self) -> bool {
        self.tab[1..].iter().any(Option::is_some)
    }

    pub fn get(&self, fixity: Fixity) -> Option<&OperatorDescriptor> {
        self.tab[usize::from(fixity)].as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperatorDescriptor> {
        self.tab.iter().flatten()
    }
}

impl std::ops::Index<Fixity> for OperatorSlots {
    type Output = Option<OperatorDescriptor>;

    fn index(&self, i: Fixity) -> &Self::Output {
        &self.tab[usize::from(i)]
    }
}

impl std::ops::IndexMut<Fixity> for OperatorSlots {
    fn index_mut(&mut self, i: Fixity) -> &mut Self::Output {
        &mut self.tab[usize::from(i)]
    }
}

static EMPTY_SLOTS: OperatorSlots = OperatorSlots::new();

/// Mutable registry of operators, owned by one parse session.
///
/// Lookups of symbols that were never registered simply miss; the parser
/// reads a miss as "not an operator here".
#[derive(Debug, Clone, Default)]
pub struct OperatorTable {
    map: IndexMap<String, OperatorSlots>,
}

impl OperatorTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            map: IndexMap::new(),
        }
    }

    /// The arithmetic operators every session starts with.
    ///
    /// | Symbol | Entity | Notation | Precedence |
    /// |--------|--------|----------|------------|
    /// | `+` | `Add` | leftinfix | 60 |
    /// | `-` | `Subtract` | leftinfix | 60 |
    /// | `*` | `Multiply` | leftinfix | 50 |
    /// | `/` | `Divide` | leftinfix | 50 |
    /// | `^` | `Power` | rightinfix | 19 |
    /// | `-` | `Negate` | prefix | 10 |
    /// | `!` | `Factorial` | postfix | 5 |
    pub fn standard() -> Self {
        let mut t = Self::new();
        for (entity, symbol, notation, precedence) in [
            ("Add", "+", Notation::LeftAssocInfix, 60),
            ("Subtract", "-", Notation::LeftAssocInfix, 60),
            ("Multiply", "*", Notation::LeftAssocInfix, 50),
            ("Divide", "/", Notation::LeftAssocInfix, 50),
            ("Power", "^", Notation::RightAssocInfix, 19),
            ("Negate", "-", Notation::Prefix, 10),
            ("Factorial", "!", Notation::Postfix, 5),
        ] {
            t.register(OperatorDescriptor::new(entity, symbol, notation, precedence));
        }
        t
    }

    /// Number of distinct symbols.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Adds `desc`, replacing and returning any entry with the same symbol
    /// and fixity.
    pub fn register(&mut self, desc: OperatorDescriptor) -> Option<OperatorDescriptor> {
        let fixity = desc.fixity();
        let slots = self
            .map
            .entry(desc.symbol.clone())
            .or_insert_with(OperatorSlots::new);
        log::debug!("register operator {desc}");
        let old = slots[fixity].replace(desc);
        if let Some(old) = &old {
            log::debug!("operator {old} replaced");
        }
        old
    }

    /// All registrations of `symbol`.
    pub fn slots(&self, symbol: &str) -> &OperatorSlots {
        self.map.get(symbol).unwrap_or(&EMPTY_SLOTS)
    }

    /// Returns `true` if `symbol` is registered, with `notation` when given.
    pub fn contains_symbol(&self, symbol: &str, notation: Option<Notation>) -> bool {
        match notation {
            None => self.map.contains_key(symbol),
            Some(n) => self.lookup(symbol, n, None).is_some(),
        }
    }

    /// Returns `true` if some registered symbol starts with `prefix`.
    pub fn has_symbol_prefix(&self, prefix: &str) -> bool {
        self.map.keys().any(|k| k.starts_with(prefix))
    }

    /// Exact lookup by symbol, notation and, optionally, operand count.
    pub fn lookup(
        &self,
        symbol: &str,
        notation: Notation,
        arity: Option<usize>,
    ) -> Option<&OperatorDescriptor> {
        self.slots(symbol)
            .get(notation.fixity())
            .filter(|d| d.notation == notation)
            .filter(|d| arity.is_none_or(|n| d.accepts(n)))
    }

    /// Lookup by slot, regardless of associativity.
    pub fn get(&self, symbol: &str, fixity: Fixity) -> Option<&OperatorDescriptor> {
        self.slots(symbol).get(fixity)
    }

    /// Finds the descriptor to apply when `name` is called with `arity`
    /// arguments: a function entry first, then the prefix (one argument) or
    /// infix (two arguments) entry.
    pub fn resolve_function(&self, name: &str, arity: usize) -> Option<&OperatorDescriptor> {
        let slots = self.slots(name);
        slots
            .get(Fixity::Function)
            .filter(|d| d.accepts(arity))
            .or_else(|| match arity {
                1 => slots.get(Fixity::Prefix),
                2 => slots.get(Fixity::Infix),
                _ => None,
            })
    }

    /// Iterates over every registration in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &OperatorDescriptor> {
        self.map.values().flat_map(OperatorSlots::iter)
    }
}
