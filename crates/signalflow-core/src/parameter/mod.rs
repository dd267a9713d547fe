//! Parameter types.
//!
//! A parameter is a typed, non-audio value exchanged between components (or
//! between the graph and other threads) through one of the communication
//! [protocols](crate::protocol). Each parameter type carries a type tag and
//! knows how to build its default value from a [`ParameterConfig`]; that
//! default is what a consumer observes before the first write.

mod registry;
mod types;

use core::fmt;

pub use registry::ParameterRegistry;
pub(crate) use registry::SharedInstance;
pub use types::{
    ListenerPosition, MatrixParameter, ScalarParameter, StringParameter, VectorParameter,
};

/// Type tag identifying a parameter type.
///
/// Two parameter ports are compatible only if their tags are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterType(&'static str);

impl ParameterType {
    /// Creates a tag. Tags should be unique per Rust type.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Tag name.
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Shape of a parameter value, fixed at port registration.
///
/// Both ends of a parameter connection must declare the same configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ParameterConfig {
    /// No shape information.
    #[default]
    None,
    /// A vector of `size` elements.
    Vector {
        /// Number of elements.
        size: usize,
    },
    /// A `rows` x `columns` matrix.
    Matrix {
        /// Number of rows.
        rows: usize,
        /// Number of columns.
        columns: usize,
    },
    /// A string of at most `max_length` bytes.
    String {
        /// Capacity reserved up front.
        max_length: usize,
    },
}

impl fmt::Display for ParameterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Vector { size } => write!(f, "vector[{size}]"),
            Self::Matrix { rows, columns } => write!(f, "matrix[{rows}x{columns}]"),
            Self::String { max_length } => write!(f, "string[{max_length}]"),
        }
    }
}

/// A value type that can travel through a parameter port.
pub trait Parameter: Clone + Send + Sync + 'static {
    /// Type tag.
    const TYPE: ParameterType;

    /// Builds the value observed before the first write.
    fn from_config(config: &ParameterConfig) -> Self;
}
