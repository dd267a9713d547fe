//! Port descriptors and typed port handles.
//!
//! Every component owns a [`PortSet`]. Ports are registered once, during
//! construction; the set rejects duplicate names immediately. The typed
//! registration helpers return small `Copy` handles ([`AudioInput`],
//! [`AudioOutput`], [`ParameterInput`], [`ParameterOutput`]) that an atomic
//! component keeps and later presents to its
//! [`ProcessContext`](crate::ProcessContext) to reach its data.

use core::fmt;
use core::marker::PhantomData;

use crate::error::GraphError;
use crate::parameter::{Parameter, ParameterConfig, ParameterType};
use crate::protocol::{Protocol, ProtocolKind};
use crate::sample::{Sample, SampleType};

/// Data flow direction of a port, seen from the component that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Data flows into the component.
    Input,
    /// Data flows out of the component.
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input => "input",
            Self::Output => "output",
        })
    }
}

/// What a port carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortKind {
    /// A fixed number of audio channels of one sample type.
    Audio {
        /// Sample format of every channel.
        sample_type: SampleType,
        /// Number of channels.
        width: usize,
    },
    /// A typed parameter exchanged through a protocol.
    Parameter {
        /// Parameter type tag.
        parameter_type: ParameterType,
        /// Communication protocol.
        protocol: ProtocolKind,
        /// Shape of the parameter value.
        config: ParameterConfig,
    },
}

impl PortKind {
    /// Audio width, or `None` for parameter ports.
    pub fn audio_width(&self) -> Option<usize> {
        match self {
            Self::Audio { width, .. } => Some(*width),
            Self::Parameter { .. } => None,
        }
    }
}

/// A named port on a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    name: String,
    direction: Direction,
    kind: PortKind,
}

impl PortDescriptor {
    /// Port name, unique within its component.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Port direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Port kind.
    pub fn kind(&self) -> &PortKind {
        &self.kind
    }

    /// Returns true for audio ports.
    pub fn is_audio(&self) -> bool {
        matches!(self.kind, PortKind::Audio { .. })
    }
}

/// The ports of one component, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortSet {
    owner: String,
    ports: Vec<PortDescriptor>,
}

impl PortSet {
    /// Creates an empty port set for the named component.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            ports: Vec::new(),
        }
    }

    /// Name of the owning component.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Registers an untyped port and returns its index.
    ///
    /// # Errors
    ///
    /// [`GraphError::DuplicateName`] if a port with the same name exists.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        direction: Direction,
        kind: PortKind,
    ) -> Result<usize, GraphError> {
        let name = name.into();
        if self.find(&name).is_some() {
            return Err(GraphError::DuplicateName {
                scope: self.owner.clone(),
                name,
            });
        }
        self.ports.push(PortDescriptor {
            name,
            direction,
            kind,
        });
        Ok(self.ports.len() - 1)
    }

    /// Registers an audio input of `width` channels.
    pub fn audio_input<S: Sample>(
        &mut self,
        name: impl Into<String>,
        width: usize,
    ) -> Result<AudioInput<S>, GraphError> {
        let index = self.register(name, Direction::Input, audio_kind::<S>(width))?;
        Ok(AudioInput::new(index, width))
    }

    /// Registers an audio output of `width` channels.
    pub fn audio_output<S: Sample>(
        &mut self,
        name: impl Into<String>,
        width: usize,
    ) -> Result<AudioOutput<S>, GraphError> {
        let index = self.register(name, Direction::Output, audio_kind::<S>(width))?;
        Ok(AudioOutput::new(index, width))
    }

    /// Registers a parameter input using protocol `P`.
    pub fn parameter_input<T: Parameter, P: Protocol>(
        &mut self,
        name: impl Into<String>,
        config: ParameterConfig,
    ) -> Result<ParameterInput<T, P>, GraphError> {
        let index = self.register(name, Direction::Input, parameter_kind::<T, P>(config))?;
        Ok(ParameterInput::new(index))
    }

    /// Registers a parameter output using protocol `P`.
    pub fn parameter_output<T: Parameter, P: Protocol>(
        &mut self,
        name: impl Into<String>,
        config: ParameterConfig,
    ) -> Result<ParameterOutput<T, P>, GraphError> {
        let index = self.register(name, Direction::Output, parameter_kind::<T, P>(config))?;
        Ok(ParameterOutput::new(index))
    }

    /// Looks a port up by name.
    pub fn find(&self, name: &str) -> Option<(usize, &PortDescriptor)> {
        self.ports
            .iter()
            .enumerate()
            .find(|(_, port)| port.name == name)
    }

    /// Port at `index`.
    pub fn get(&self, index: usize) -> Option<&PortDescriptor> {
        self.ports.get(index)
    }

    /// Iterates the ports in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &PortDescriptor> {
        self.ports.iter()
    }

    /// Number of ports.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Returns true if no ports are registered.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Total channel count over all audio ports of one direction and sample type.
    pub fn audio_channels(&self, direction: Direction, sample_type: SampleType) -> usize {
        self.ports
            .iter()
            .filter(|port| port.direction == direction)
            .filter_map(|port| match port.kind {
                PortKind::Audio {
                    sample_type: s,
                    width,
                } if s == sample_type => Some(width),
                _ => None,
            })
            .sum()
    }
}

fn audio_kind<S: Sample>(width: usize) -> PortKind {
    PortKind::Audio {
        sample_type: S::TYPE,
        width,
    }
}

fn parameter_kind<T: Parameter, P: Protocol>(config: ParameterConfig) -> PortKind {
    PortKind::Parameter {
        parameter_type: T::TYPE,
        protocol: P::KIND,
        config,
    }
}

macro_rules! audio_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name<S> {
            index: usize,
            width: usize,
            _sample: PhantomData<fn() -> S>,
        }

        impl<S> $name<S> {
            pub(crate) fn new(index: usize, width: usize) -> Self {
                Self {
                    index,
                    width,
                    _sample: PhantomData,
                }
            }

            /// Index of the port within its component.
            pub fn index(&self) -> usize {
                self.index
            }

            /// Number of channels.
            pub fn width(&self) -> usize {
                self.width
            }
        }

        impl<S> Clone for $name<S> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<S> Copy for $name<S> {}

        impl<S> fmt::Debug for $name<S> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("index", &self.index)
                    .field("width", &self.width)
                    .finish()
            }
        }
    };
}

macro_rules! parameter_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name<T, P> {
            index: usize,
            _marker: PhantomData<fn() -> (T, P)>,
        }

        impl<T, P> $name<T, P> {
            pub(crate) fn new(index: usize) -> Self {
                Self {
                    index,
                    _marker: PhantomData,
                }
            }

            /// Index of the port within its component.
            pub fn index(&self) -> usize {
                self.index
            }
        }

        impl<T, P> Clone for $name<T, P> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T, P> Copy for $name<T, P> {}

        impl<T, P> fmt::Debug for $name<T, P> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("index", &self.index)
                    .finish()
            }
        }
    };
}

audio_handle!(
    /// Handle to an audio input port carrying samples of type `S`.
    AudioInput
);
audio_handle!(
    /// Handle to an audio output port carrying samples of type `S`.
    AudioOutput
);
parameter_handle!(
    /// Handle to a parameter input of type `T` using protocol `P`.
    ParameterInput
);
parameter_handle!(
    /// Handle to a parameter output of type `T` using protocol `P`.
    ParameterOutput
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::ScalarParameter;
    use crate::protocol::{DoubleBuffering, MessageQueue};

    #[test]
    fn duplicate_port_name_rejected() {
        let mut ports = PortSet::new("gain");
        ports.audio_input::<f32>("in", 2).unwrap();
        let err = ports.audio_output::<f32>("in", 2).unwrap_err();
        assert_eq!(
            err,
            GraphError::DuplicateName {
                scope: "gain".to_string(),
                name: "in".to_string(),
            }
        );
    }

    #[test]
    fn handles_carry_index_and_width() {
        let mut ports = PortSet::new("mixer");
        let a = ports.audio_input::<f32>("a", 2).unwrap();
        let b = ports.audio_input::<f64>("b", 4).unwrap();
        let level = ports
            .parameter_input::<ScalarParameter, DoubleBuffering>("level", ParameterConfig::None)
            .unwrap();
        assert_eq!((a.index(), a.width()), (0, 2));
        assert_eq!((b.index(), b.width()), (1, 4));
        assert_eq!(level.index(), 2);
        assert_eq!(ports.len(), 3);
    }

    #[test]
    fn port_kinds_record_types() {
        let mut ports = PortSet::new("c");
        ports.audio_output::<f64>("out", 3).unwrap();
        ports
            .parameter_output::<ScalarParameter, MessageQueue>("events", ParameterConfig::None)
            .unwrap();

        let (_, out) = ports.find("out").unwrap();
        assert_eq!(
            out.kind(),
            &PortKind::Audio {
                sample_type: SampleType::F64,
                width: 3
            }
        );
        let (index, events) = ports.find("events").unwrap();
        assert_eq!(index, 1);
        assert_eq!(events.direction(), Direction::Output);
        assert!(matches!(
            events.kind(),
            PortKind::Parameter {
                protocol: ProtocolKind::MessageQueue,
                ..
            }
        ));
    }

    #[test]
    fn audio_channel_totals() {
        let mut ports = PortSet::new("c");
        ports.audio_input::<f32>("a", 2).unwrap();
        ports.audio_input::<f32>("b", 3).unwrap();
        ports.audio_input::<f64>("c", 5).unwrap();
        ports.audio_output::<f32>("d", 7).unwrap();
        assert_eq!(ports.audio_channels(Direction::Input, SampleType::F32), 5);
        assert_eq!(ports.audio_channels(Direction::Input, SampleType::F64), 5);
        assert_eq!(ports.audio_channels(Direction::Output, SampleType::F32), 7);
    }
}
