//! The semantic seam between the parser and a graph model.
//!
//! The parser never inspects nodes. Everything with meaning (constants,
//! signals, buses, applications, entities and architectures) is delegated to
//! a [`GraphBuilder`]. Builder hooks return [`anyhow::Result`], and a failure
//! aborts the parse as [`flowscan::Error::Builder`].

use crate::{Container, Notation, OperatorDescriptor};
use anyhow::Result;
use smartstring::alias::String;

/// Which constant production produced a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantKind {
    Literal,
    Integer,
    Real,
}

/// One port binding of an instantiation: `label -> value` or a positional
/// `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding<N> {
    pub label: Option<String>,
    pub value: N,
}

impl<N> Binding<N> {
    pub fn positional(value: N) -> Self {
        Self { label: None, value }
    }

    pub fn labeled(label: impl Into<String>, value: N) -> Self {
        Self {
            label: Some(label.into()),
            value,
        }
    }
}

/// Everything a `define entity` statement declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDefinition {
    /// Entity name, e.g. `Add`.
    pub label: String,
    /// Surface symbol, e.g. `+`.
    pub symbol: String,
    pub notation: Notation,
    pub precedence: u32,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub buses: Vec<String>,
}

impl EntityDefinition {
    /// The operator registration that makes the symbol usable in expressions.
    pub fn descriptor(&self) -> OperatorDescriptor {
        let mut desc = OperatorDescriptor::new(
            self.label.clone(),
            self.symbol.clone(),
            self.notation,
            self.precedence,
        );
        if self.notation == Notation::None && !self.inputs.is_empty() {
            desc.arity = Some(self.inputs.len());
        }
        desc
    }
}

/// Factory for the nodes of a dataflow graph.
pub trait GraphBuilder {
    /// Opaque node handle.
    type Node: Clone;

    fn constant(&mut self, kind: ConstantKind, text: &str) -> Result<Self::Node>;

    /// Applies `op` to `args`, which has the operator's arity for prefix,
    /// infix and postfix applications.
    fn function_application(
        &mut self,
        op: &OperatorDescriptor,
        args: Vec<Self::Node>,
    ) -> Result<Self::Node>;

    /// Wraps the items of a bracketed group.
    fn encapsulate(&mut self, container: Container, items: Vec<Self::Node>) -> Result<Self::Node>;

    /// Resolves a signal reference, creating the signal on first use.
    fn lookup_or_create_named_signal(&mut self, name: &str) -> Result<Self::Node>;

    /// Resolves a bus reference; unknown buses are an error.
    fn lookup_named_bus(&mut self, name: &str) -> Result<Self::Node>;

    fn declare_signal(&mut self, name: &str) -> Result<Self::Node>;

    fn declare_bus(&mut self, name: &str) -> Result<Self::Node>;

    /// Drives every signal in `targets` from `value`.
    fn assign(&mut self, targets: &[Self::Node], value: &Self::Node) -> Result<()>;

    fn define_entity(&mut self, def: &EntityDefinition) -> Result<()>;

    /// Opens the body of architecture `name` implementing `entity`, given by
    /// label or symbol.
    fn begin_architecture(&mut self, name: &str, entity: &str) -> Result<()>;

    fn end_architecture(&mut self) -> Result<()>;

    /// Instantiates `entity` (label or symbol) and returns the nodes standing
    /// for its outputs.
    fn instantiate(
        &mut self,
        entity: &str,
        inputs: Vec<Binding<Self::Node>>,
        outputs: Vec<Binding<Self::Node>>,
        buses: Vec<Self::Node>,
    ) -> Result<Vec<Self::Node>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_descriptor() {
        let def = EntityDefinition {
            label: "Maximum".into(),
            symbol: "max".into(),
            notation: Notation::None,
            precedence: 0,
            inputs: vec!["a".into(), "b".into()],
            outputs: vec!["m".into()],
            buses: vec![],
        };
        let desc = def.descriptor();
        assert_eq!(desc.arity, Some(2));
        assert_eq!(desc.entity.as_str(), "Maximum");
        assert!(desc.accepts(2));
        assert!(!desc.accepts(3));

        let infix = EntityDefinition {
            notation: Notation::LeftAssocInfix,
            precedence: 70,
            ..def
        };
        assert_eq!(infix.descriptor().arity, None);
    }
}
