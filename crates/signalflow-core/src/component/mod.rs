//! The component tree.
//!
//! A graph is described as a tree of [`Component`]s. Leaves are
//! [`AtomicComponent`]s that do the actual processing; interior nodes are
//! [`CompositeComponent`]s that group children and declare how their ports are
//! wired. Composites exist only at description time: flattening replaces them
//! by direct atomic-to-atomic connections.

mod atomic;
mod composite;
mod connection;

pub use atomic::{AtomicComponent, Process};
pub use composite::CompositeComponent;
pub(crate) use composite::parameter_compatibility;
pub use connection::{
    AudioConnection, AudioEndpoint, ConnectionRegistry, ParameterConnection, ParameterEndpoint,
    THIS,
};

use crate::port::PortSet;

/// A node of the component tree.
#[derive(Debug)]
pub enum Component {
    /// A processing leaf.
    Atomic(AtomicComponent),
    /// A grouping node.
    Composite(CompositeComponent),
}

impl Component {
    /// Local name.
    pub fn name(&self) -> &str {
        match self {
            Self::Atomic(c) => c.name(),
            Self::Composite(c) => c.name(),
        }
    }

    /// Boundary ports.
    pub fn ports(&self) -> &PortSet {
        match self {
            Self::Atomic(c) => c.ports(),
            Self::Composite(c) => c.ports(),
        }
    }

    /// Returns true for leaves.
    pub fn is_atomic(&self) -> bool {
        matches!(self, Self::Atomic(_))
    }
}

impl From<AtomicComponent> for Component {
    fn from(component: AtomicComponent) -> Self {
        Self::Atomic(component)
    }
}

impl From<CompositeComponent> for Component {
    fn from(component: CompositeComponent) -> Self {
        Self::Composite(component)
    }
}
