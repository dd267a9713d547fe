//! Symbolic connection declarations.
//!
//! A composite records its connections by name. Nothing is resolved until the
//! graph is flattened; the registry only stores what was declared, in order.

use core::fmt;

use crate::channel::ChannelIndexSet;

/// Reserved endpoint name referring to the declaring composite itself.
pub const THIS: &str = "this";

/// One side of an audio connection: a component, one of its ports and the
/// channels used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioEndpoint {
    /// Child name or [`THIS`].
    pub component: String,
    /// Port name on that component.
    pub port: String,
    /// Channels of the port, in connection order.
    pub indices: ChannelIndexSet,
}

impl fmt::Display for AudioEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}[{}]", self.component, self.port, self.indices)
    }
}

/// Declared audio connection. Sender channel `i` feeds receiver channel `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioConnection {
    /// Producing side.
    pub sender: AudioEndpoint,
    /// Consuming side.
    pub receiver: AudioEndpoint,
}

/// One side of a parameter connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterEndpoint {
    /// Child name or [`THIS`].
    pub component: String,
    /// Port name on that component.
    pub port: String,
}

impl fmt::Display for ParameterEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.port)
    }
}

/// Declared parameter connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterConnection {
    /// Producing side.
    pub sender: ParameterEndpoint,
    /// Consuming side.
    pub receiver: ParameterEndpoint,
}

/// Connections declared inside one composite, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionRegistry {
    audio: Vec<AudioConnection>,
    parameter: Vec<ParameterConnection>,
}

impl ConnectionRegistry {
    /// Declared audio connections.
    pub fn audio(&self) -> &[AudioConnection] {
        &self.audio
    }

    /// Declared parameter connections.
    pub fn parameter(&self) -> &[ParameterConnection] {
        &self.parameter
    }

    /// Total number of declarations.
    pub fn len(&self) -> usize {
        self.audio.len() + self.parameter.len()
    }

    /// Returns true if nothing was declared.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn push_audio(&mut self, connection: AudioConnection) {
        self.audio.push(connection);
    }

    pub(crate) fn push_parameter(&mut self, connection: ParameterConnection) {
        self.parameter.push(connection);
    }
}
