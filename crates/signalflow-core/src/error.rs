//! Error types for graph setup and block processing.
//!
//! Setup failures ([`GraphError`]) abort graph construction immediately; there is
//! no partial-graph recovery. Block-time failures ([`ProcessError`]) are fatal for
//! the current block only and are reported back to the caller of
//! [`SignalFlow::process`](crate::SignalFlow::process).

use std::borrow::Cow;

use thiserror::Error;

/// Errors raised while building, flattening or scheduling a graph.
///
/// Every variant identifies the offending component, port or channel so the
/// caller can report an actionable message. None of these can occur once a
/// [`SignalFlow`](crate::SignalFlow) has been constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A port or child name is already taken within the same scope.
    #[error("duplicate name '{name}' in '{scope}'")]
    DuplicateName {
        /// Component in which the collision happened.
        scope: String,
        /// The colliding name.
        name: String,
    },

    /// A connection references a component or port that does not exist.
    #[error("unknown endpoint '{endpoint}' in '{scope}'")]
    UnknownEndpoint {
        /// Composite in which the connection was declared.
        scope: String,
        /// The unresolved `component` or `component.port` reference.
        endpoint: String,
    },

    /// Sender and receiver index sets of a connection differ in size.
    #[error("size mismatch in '{scope}': '{sender}' has {sender_len} channels, '{receiver}' has {receiver_len}")]
    SizeMismatch {
        /// Composite in which the connection was declared.
        scope: String,
        /// Sender endpoint.
        sender: String,
        /// Number of sender channels.
        sender_len: usize,
        /// Receiver endpoint.
        receiver: String,
        /// Number of receiver channels.
        receiver_len: usize,
    },

    /// A channel index exceeds the width of the referenced port.
    #[error("channel {channel} out of range for '{endpoint}' (width {width})")]
    ChannelOutOfRange {
        /// The `component.port` reference.
        endpoint: String,
        /// The offending channel index.
        channel: usize,
        /// Width of the port.
        width: usize,
    },

    /// Port kinds, directions or sample types of a connection are incompatible.
    #[error("type mismatch between '{sender}' and '{receiver}': {reason}")]
    TypeMismatch {
        /// Sender endpoint.
        sender: String,
        /// Receiver endpoint.
        receiver: String,
        /// What did not match.
        reason: String,
    },

    /// An atomic input has no producer after flattening.
    #[error("unconnected input '{component}.{port}'{}", channel_suffix(.channel))]
    UnconnectedInput {
        /// Fully-qualified component name.
        component: String,
        /// Port name.
        port: String,
        /// Offending channel (`None` for parameter ports).
        channel: Option<usize>,
    },

    /// An input channel or parameter input is fed by more than one connection.
    #[error("input '{component}.{port}'{} has more than one producer", channel_suffix(.channel))]
    MultipleProducers {
        /// Fully-qualified component name.
        component: String,
        /// Port name.
        port: String,
        /// Offending channel (`None` for parameter ports).
        channel: Option<usize>,
    },

    /// Parameter type, configuration or protocol differ between two endpoints.
    #[error("protocol mismatch between '{sender}' and '{receiver}': {reason}")]
    ProtocolMismatch {
        /// Sender endpoint.
        sender: String,
        /// Receiver endpoint.
        receiver: String,
        /// What did not match.
        reason: String,
    },

    /// No protocol constructor is registered for a parameter type and protocol.
    #[error("no factory registered for parameter type '{parameter_type}' with protocol '{protocol}'")]
    UnregisteredParameter {
        /// Parameter type tag.
        parameter_type: String,
        /// Protocol name.
        protocol: String,
    },

    /// The audio dependency graph contains a cycle.
    #[error("cyclic audio graph through: {}", .components.join(", "))]
    CyclicGraph {
        /// Components that could not be ordered.
        components: Vec<String>,
    },

    /// A channel index set could not be built or parsed.
    #[error("invalid channel index set: {0}")]
    InvalidIndexSet(String),

    /// The flow configuration is unusable (zero block length, bad alignment).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

fn channel_suffix(channel: &Option<usize>) -> String {
    channel.map(|c| format!(" channel {c}")).unwrap_or_default()
}

/// Failure reported by an atomic component's process operation.
///
/// Construct with a static message on the audio thread so the error path does
/// not allocate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ComponentError(Cow<'static, str>);

impl ComponentError {
    /// Creates an error from a static message.
    pub const fn new(message: &'static str) -> Self {
        Self(Cow::Borrowed(message))
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<String> for ComponentError {
    fn from(message: String) -> Self {
        Self(Cow::Owned(message))
    }
}

/// Errors returned by the block-processing entry point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    /// The caller supplied the wrong number of capture or playback channels.
    #[error("expected {expected} {direction} channels, got {actual}")]
    ChannelCount {
        /// `"capture"` or `"playback"`.
        direction: &'static str,
        /// Channels declared by the graph.
        expected: usize,
        /// Channels supplied.
        actual: usize,
    },

    /// A capture or playback buffer does not hold exactly one block.
    #[error("{direction} channel {channel} holds {actual} samples, block length is {expected}")]
    BlockLength {
        /// `"capture"` or `"playback"`.
        direction: &'static str,
        /// Channel index.
        channel: usize,
        /// Configured block length.
        expected: usize,
        /// Samples supplied.
        actual: usize,
    },

    /// An atomic component failed while processing the block.
    #[error("component '{component}' failed: {source}")]
    Component {
        /// Fully-qualified component name.
        component: String,
        /// Error returned by the component.
        #[source]
        source: ComponentError,
    },
}
