//! Parameter communication protocols.
//!
//! A protocol decides how a parameter value crosses from producer to consumer:
//!
//! | Protocol | Producer | Consumer | Threads |
//! |----------|----------|----------|---------|
//! | [`MessageQueue`] | `enqueue` | `front` / `pop` | any |
//! | [`DoubleBuffering`] | `publish` / `update` | `data` | any |
//! | [`SharedData`] | `set` / `update` | `data` | audio thread only |
//!
//! Protocols are zero-sized marker types; [`Protocol::Instance`] names the
//! concrete storage for a given parameter type.

mod double_buffering;
mod message_queue;
mod shared_data;

use core::fmt;
use core::str::FromStr;

pub use double_buffering::DoubleBufferingInstance;
pub use message_queue::MessageQueueInstance;
pub use shared_data::SharedDataInstance;

use crate::error::GraphError;
use crate::parameter::{Parameter, ParameterConfig};

/// Runtime tag for a protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProtocolKind {
    /// Unbounded FIFO of values.
    MessageQueue,
    /// Latest-value-wins front/back slots.
    DoubleBuffering,
    /// Single storage location, ordered by the schedule.
    SharedData,
}

impl ProtocolKind {
    /// Snake-case name used in text and configuration files.
    pub const fn name(self) -> &'static str {
        match self {
            Self::MessageQueue => "message_queue",
            Self::DoubleBuffering => "double_buffering",
            Self::SharedData => "shared_data",
        }
    }

    /// Returns true if producer and consumer may live on different threads.
    pub const fn crosses_threads(self) -> bool {
        !matches!(self, Self::SharedData)
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProtocolKind {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "message_queue" => Ok(Self::MessageQueue),
            "double_buffering" => Ok(Self::DoubleBuffering),
            "shared_data" => Ok(Self::SharedData),
            other => Err(GraphError::InvalidConfiguration(format!(
                "unknown protocol '{other}'"
            ))),
        }
    }
}

/// A parameter communication protocol.
pub trait Protocol: Send + Sync + 'static {
    /// Runtime tag.
    const KIND: ProtocolKind;

    /// Storage shared by producer and consumer for parameter type `T`.
    type Instance<T: Parameter>: Send + Sync + 'static;

    /// Creates the storage; reads before the first write observe
    /// `T::from_config(config)`.
    fn instantiate<T: Parameter>(config: &ParameterConfig) -> Self::Instance<T>;
}

/// Unbounded FIFO protocol. Nothing is lost or reordered.
#[derive(Debug, Clone, Copy)]
pub enum MessageQueue {}

/// Front/back slot protocol. Consumers always see the latest complete value.
#[derive(Debug, Clone, Copy)]
pub enum DoubleBuffering {}

/// Single-slot protocol for producers and consumers on the audio thread.
#[derive(Debug, Clone, Copy)]
pub enum SharedData {}

impl Protocol for MessageQueue {
    const KIND: ProtocolKind = ProtocolKind::MessageQueue;
    type Instance<T: Parameter> = MessageQueueInstance<T>;

    fn instantiate<T: Parameter>(config: &ParameterConfig) -> Self::Instance<T> {
        MessageQueueInstance::with_fallback(T::from_config(config))
    }
}

impl Protocol for DoubleBuffering {
    const KIND: ProtocolKind = ProtocolKind::DoubleBuffering;
    type Instance<T: Parameter> = DoubleBufferingInstance<T>;

    fn instantiate<T: Parameter>(config: &ParameterConfig) -> Self::Instance<T> {
        DoubleBufferingInstance::new(T::from_config(config))
    }
}

impl Protocol for SharedData {
    const KIND: ProtocolKind = ProtocolKind::SharedData;
    type Instance<T: Parameter> = SharedDataInstance<T>;

    fn instantiate<T: Parameter>(config: &ParameterConfig) -> Self::Instance<T> {
        SharedDataInstance::new(T::from_config(config))
    }
}
