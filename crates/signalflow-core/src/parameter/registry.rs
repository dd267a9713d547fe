//! Registry of protocol instance constructors.
//!
//! The flattener creates one protocol instance per flat parameter connection.
//! It cannot name the concrete instance type (that depends on the parameter
//! type and protocol chosen by the two components), so it looks the pair up
//! in a [`ParameterRegistry`] that was filled before the graph was built.
//!
//! ```rust
//! use signalflow_core::{ParameterRegistry, ProtocolKind, ScalarParameter, Parameter};
//!
//! let registry = ParameterRegistry::new();
//! assert!(registry.contains(ScalarParameter::TYPE, ProtocolKind::DoubleBuffering));
//! ```

use std::any::Any;
use std::sync::Arc;

use super::{
    ListenerPosition, MatrixParameter, Parameter, ParameterConfig, ParameterType,
    ScalarParameter, StringParameter, VectorParameter,
};
use crate::protocol::{DoubleBuffering, MessageQueue, Protocol, ProtocolKind, SharedData};

/// A type-erased protocol instance shared by producer and consumer.
pub(crate) type SharedInstance = Arc<dyn Any + Send + Sync>;

/// Factory function type for protocol instances.
type InstanceFactory = fn(&ParameterConfig) -> SharedInstance;

/// Internal entry in the registry.
struct RegistryEntry {
    parameter_type: ParameterType,
    protocol: ProtocolKind,
    factory: InstanceFactory,
}

fn instantiate<T: Parameter, P: Protocol>(config: &ParameterConfig) -> SharedInstance {
    Arc::new(P::instantiate::<T>(config))
}

/// Maps (parameter type, protocol) pairs to instance constructors.
///
/// Populate it before building any graph; the flattener only reads it.
pub struct ParameterRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for ParameterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterRegistry {
    /// Create a registry with every built-in parameter type under all three protocols.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(15),
        };
        registry.register::<ScalarParameter>();
        registry.register::<VectorParameter>();
        registry.register::<MatrixParameter>();
        registry.register::<StringParameter>();
        registry.register::<ListenerPosition>();
        registry
    }

    /// Create a registry with no entries.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a parameter type under all three protocols.
    pub fn register<T: Parameter>(&mut self) {
        self.register_protocol::<T, MessageQueue>();
        self.register_protocol::<T, DoubleBuffering>();
        self.register_protocol::<T, SharedData>();
    }

    /// Register a parameter type under one protocol, replacing an earlier entry.
    pub fn register_protocol<T: Parameter, P: Protocol>(&mut self) {
        let factory: InstanceFactory = instantiate::<T, P>;
        match self.position(T::TYPE, P::KIND) {
            Some(index) => self.entries[index].factory = factory,
            None => self.entries.push(RegistryEntry {
                parameter_type: T::TYPE,
                protocol: P::KIND,
                factory,
            }),
        }
    }

    fn position(&self, parameter_type: ParameterType, protocol: ProtocolKind) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.parameter_type == parameter_type && e.protocol == protocol)
    }

    /// Returns true if the pair has a constructor.
    pub fn contains(&self, parameter_type: ParameterType, protocol: ProtocolKind) -> bool {
        self.position(parameter_type, protocol).is_some()
    }

    /// Create a protocol instance for the pair, if registered.
    pub(crate) fn create(
        &self,
        parameter_type: ParameterType,
        protocol: ProtocolKind,
        config: &ParameterConfig,
    ) -> Option<SharedInstance> {
        self.position(parameter_type, protocol)
            .map(|index| (self.entries[index].factory)(config))
    }

    /// Look up a registered parameter type by tag name.
    pub fn parameter_type(&self, name: &str) -> Option<ParameterType> {
        self.entries
            .iter()
            .map(|e| e.parameter_type)
            .find(|t| t.name() == name)
    }

    /// All registered parameter types, sorted by tag.
    pub fn parameter_types(&self) -> Vec<ParameterType> {
        let mut types: Vec<ParameterType> = self.entries.iter().map(|e| e.parameter_type).collect();
        types.sort_unstable();
        types.dedup();
        types
    }

    /// Number of (parameter type, protocol) entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
