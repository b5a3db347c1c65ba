//! A reference [`GraphBuilder`] that records what it is told.
//!
//! [`TreeBuilder`] turns every expression into a printable [`Expr`] tree and
//! keeps tables of declared signals and buses, defined entities,
//! architectures, assignments and instances. It checks what a graph model
//! would check (unknown buses and entities, port counts, architecture nesting)
//! but performs no propagation.
//!
//! ```rust
//! # use flowdsl::{LexerConfig, OperatorTable, Parser, Statement, TreeBuilder};
//! # use flowscan::IterSource;
//! let mut b = TreeBuilder::new();
//! let mut p = Parser::new(
//!     IterSource::from_text("y <- 2 + 3 * x;"),
//!     LexerConfig::default(),
//!     OperatorTable::standard(),
//! );
//! let stmts = p.parse_all(&mut b)?;
//! assert_eq!(stmts.len(), 1);
//! assert_eq!(b.assignments()[0].value.to_string(), "Add(2, Multiply(3, x))");
//! # Ok::<(), flowscan::Error>(())
//! ```

use crate::{Binding, ConstantKind, Container, EntityDefinition, GraphBuilder, OperatorDescriptor};
use anyhow::{Result, bail};
use indexmap::{IndexMap, IndexSet};
use smartstring::alias::String;
use std::fmt;

/// Expression tree produced by [`TreeBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(String),
    Integer(String),
    Real(String),
    Signal(String),
    Bus(String),
    /// Application of an entity, e.g. `Add(2, 3)`.
    Apply { entity: String, args: Vec<Expr> },
    Group { container: Container, items: Vec<Expr> },
    /// Unbound output `port` of instance number `instance`.
    Port { instance: usize, port: String },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(s) => write!(f, "{:?}", s.as_str()),
            Expr::Integer(s) | Expr::Real(s) | Expr::Signal(s) | Expr::Bus(s) => {
                f.write_str(s)
            }
            Expr::Apply { entity, args } => {
                f.write_str(entity)?;
                write_items(f, "(", args, ")")
            }
            Expr::Group { container, items } => {
                let (open, close) = match container {
                    Container::List => ("(", ")"),
                    Container::Vector => ("[", "]"),
                    Container::Set => ("{", "}"),
                    Container::Scalar => ("⟨", "⟩"),
                };
                write_items(f, open, items, close)
            }
            Expr::Port { instance, port } => write!(f, "#{instance}.{port}"),
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, open: &str, items: &[Expr], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

/// A recorded `targets <- value` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub targets: Vec<Expr>,
    pub value: Expr,
    /// Architecture whose body contained the assignment.
    pub architecture: Option<String>,
}

/// A recorded instantiation.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub entity: String,
    pub inputs: Vec<Binding<Expr>>,
    pub outputs: Vec<Binding<Expr>>,
    pub buses: Vec<Expr>,
    pub architecture: Option<String>,
}

/// A recorded architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Architecture {
    pub entity: String,
    /// Number of assignments and instances in the body.
    pub statements: usize,
}

/// Reference [`GraphBuilder`] building [`Expr`] trees.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    signals: IndexSet<String>,
    buses: IndexSet<String>,
    entities: IndexMap<String, EntityDefinition>,
    architectures: IndexMap<String, Architecture>,
    current: Option<String>,
    assignments: Vec<Assignment>,
    instances: Vec<Instance>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signals(&self) -> impl Iterator<Item = &str> {
        self.signals.iter().map(String::as_str)
    }

    pub fn buses(&self) -> impl Iterator<Item = &str> {
        self.buses.iter().map(String::as_str)
    }

    /// Finds an entity by label, then by symbol.
    pub fn entity(&self, name: &str) -> Option<&EntityDefinition> {
        self.entities
            .get(name)
            .or_else(|| self.entities.values().find(|e| e.symbol.as_str() == name))
    }

    pub fn architecture(&self, name: &str) -> Option<&Architecture> {
        self.architectures.get(name)
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    fn count_statement(&mut self) {
        if let Some(name) = &self.current {
            if let Some(arch) = self.architectures.get_mut(name) {
                arch.statements += 1;
            }
        }
    }
}

/// Checks `bindings` against `ports` and returns, per port, the bound value.
fn bind_ports(
    what: &str,
    entity: &str,
    ports: &[String],
    bindings: &[Binding<Expr>],
) -> Result<Vec<Option<Expr>>> {
    let mut bound = vec![None; ports.len()];
    let mut next = 0;
    for b in bindings {
        let i = match &b.label {
            Some(label) => match ports.iter().position(|p| p == label) {
                Some(i) => i,
                None => bail!("entity {:?} has no {} port {:?}", entity, what, label),
            },
            None => {
                next += 1;
                next - 1
            }
        };
        if i >= ports.len() {
            bail!(
                "entity {:?} takes {} {} port(s), {} bound",
                entity,
                ports.len(),
                what,
                bindings.len()
            );
        }
        if bound[i].is_some() {
            bail!("{} port {:?} of {:?} bound twice", what, ports[i], entity);
        }
        bound[i] = Some(b.value.clone());
    }
    Ok(bound)
}

impl GraphBuilder for TreeBuilder {
    type Node = Expr;

    fn constant(&mut self, kind: ConstantKind, text: &str) -> Result<Expr> {
        let text = String::from(text);
        Ok(match kind {
            ConstantKind::Literal => Expr::Literal(text),
            ConstantKind::Integer => Expr::Integer(text),
            ConstantKind::Real => Expr::Real(text),
        })
    }

    fn function_application(&mut self, op: &OperatorDescriptor, args: Vec<Expr>) -> Result<Expr> {
        if let Some(def) = self.entity(&op.entity) {
            if !def.inputs.is_empty() && def.inputs.len() != args.len() {
                bail!(
                    "entity {:?} takes {} input(s), applied to {}",
                    def.label,
                    def.inputs.len(),
                    args.len()
                );
            }
        }
        Ok(Expr::Apply {
            entity: op.entity.clone(),
            args,
        })
    }

    fn encapsulate(&mut self, container: Container, items: Vec<Expr>) -> Result<Expr> {
        Ok(Expr::Group { container, items })
    }

    fn lookup_or_create_named_signal(&mut self, name: &str) -> Result<Expr> {
        if self.buses.contains(name) {
            bail!("{:?} is a bus, not a signal", name);
        }
        self.signals.insert(String::from(name));
        Ok(Expr::Signal(String::from(name)))
    }

    fn lookup_named_bus(&mut self, name: &str) -> Result<Expr> {
        if !self.buses.contains(name) {
            bail!("no bus named {:?}", name);
        }
        Ok(Expr::Bus(String::from(name)))
    }

    fn declare_signal(&mut self, name: &str) -> Result<Expr> {
        if self.buses.contains(name) {
            bail!("{:?} is already declared as a bus", name);
        }
        self.signals.insert(String::from(name));
        Ok(Expr::Signal(String::from(name)))
    }

    fn declare_bus(&mut self, name: &str) -> Result<Expr> {
        if self.signals.contains(name) {
            bail!("{:?} is already declared as a signal", name);
        }
        self.buses.insert(String::from(name));
        Ok(Expr::Bus(String::from(name)))
    }

    fn assign(&mut self, targets: &[Expr], value: &Expr) -> Result<()> {
        if let Some(t) = targets.iter().find(|t| !matches!(t, Expr::Signal(_))) {
            bail!("cannot assign to {}", t);
        }
        self.count_statement();
        self.assignments.push(Assignment {
            targets: targets.to_vec(),
            value: value.clone(),
            architecture: self.current.clone(),
        });
        Ok(())
    }

    fn define_entity(&mut self, def: &EntityDefinition) -> Result<()> {
        if self.entities.contains_key(def.label.as_str()) {
            bail!("entity {:?} is already defined", def.label);
        }
        self.entities.insert(def.label.clone(), def.clone());
        Ok(())
    }

    fn begin_architecture(&mut self, name: &str, entity: &str) -> Result<()> {
        if let Some(outer) = &self.current {
            bail!("architecture {:?} cannot be nested in {:?}", name, outer);
        }
        let Some(def) = self.entity(entity) else {
            bail!("architecture {:?} implements unknown entity {:?}", name, entity);
        };
        if self.architectures.contains_key(name) {
            bail!("architecture {:?} is already defined", name);
        }
        let arch = Architecture {
            entity: def.label.clone(),
            statements: 0,
        };
        self.architectures.insert(String::from(name), arch);
        self.current = Some(String::from(name));
        Ok(())
    }

    fn end_architecture(&mut self) -> Result<()> {
        if self.current.take().is_none() {
            bail!("no architecture is open");
        }
        Ok(())
    }

    fn instantiate(
        &mut self,
        entity: &str,
        inputs: Vec<Binding<Expr>>,
        outputs: Vec<Binding<Expr>>,
        buses: Vec<Expr>,
    ) -> Result<Vec<Expr>> {
        let Some(def) = self.entity(entity) else {
            bail!("cannot instantiate unknown entity {:?}", entity);
        };
        let label = def.label.clone();
        bind_ports("input", &label, &def.inputs, &inputs)?;
        let bound = bind_ports("output", &label, &def.outputs, &outputs)?;
        if buses.len() > def.buses.len() {
            bail!(
                "entity {:?} takes {} bus(es), {} bound",
                label,
                def.buses.len(),
                buses.len()
            );
        }

        let instance = self.instances.len();
        let result = bound
            .into_iter()
            .zip(&def.outputs)
            .map(|(b, port)| {
                b.unwrap_or_else(|| Expr::Port {
                    instance,
                    port: port.clone(),
                })
            })
            .collect();

        self.count_statement();
        self.instances.push(Instance {
            entity: label,
            inputs,
            outputs,
            buses,
            architecture: self.current.clone(),
        });
        Ok(result)
    }
}
