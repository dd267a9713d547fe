//! signalflow core - a real-time audio graph runtime
//!
//! Applications describe their audio processing as a tree of components,
//! connect ports once at setup, and then call a single block-processing entry
//! point from the audio thread.
//!
//! # Core Abstractions
//!
//! ## Component Model
//!
//! - [`AtomicComponent`] - a leaf wrapping a [`Process`] implementation
//! - [`CompositeComponent`] - a named group of children plus the connections
//!   between them and its own ports ([`THIS`])
//! - [`PortSet`] - typed port registration returning handles
//!   ([`AudioInput`], [`AudioOutput`], [`ParameterInput`], [`ParameterOutput`])
//! - [`ChannelIndexSet`] - which channels of a port a connection uses
//!
//! ## Runtime
//!
//! - [`GraphFlattener`] - resolves composite boundaries into direct connections
//! - [`ExecutionSchedule`] - topological order with a name tie-break
//! - [`CommunicationArea`] - aligned row arena shared by all components
//! - [`SignalFlow`] - setup plus [`SignalFlow::process`]
//!
//! ## Parameters
//!
//! Non-audio values travel through one of three protocols:
//!
//! - [`MessageQueue`] - unbounded FIFO, nothing lost or reordered
//! - [`DoubleBuffering`] - latest value wins, never torn
//! - [`SharedData`] - one slot, ordered by the schedule (audio thread only)
//!
//! Protocol instances are created through a [`ParameterRegistry`].
//!
//! # Example
//!
//! ```rust
//! use signalflow_core::{
//!     AtomicComponent, AudioInput, AudioOutput, ComponentError, CompositeComponent,
//!     DoubleBuffering, FlowConfig, ParameterConfig, ParameterInput, ParameterRegistry,
//!     Process, ProcessContext, ScalarParameter, SignalFlow, THIS,
//! };
//!
//! struct Gain {
//!     input: AudioInput<f32>,
//!     output: AudioOutput<f32>,
//!     level: ParameterInput<ScalarParameter, DoubleBuffering>,
//! }
//!
//! impl Process for Gain {
//!     fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ComponentError> {
//!         let level = ctx.parameters.input(&self.level)?.data().0;
//!         let input = ctx.inputs.port(&self.input);
//!         let mut output = ctx.outputs.port(&self.output);
//!         for (o, i) in output.channel_mut(0).iter_mut().zip(input.channel(0)) {
//!             *o = i * level;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let gain = AtomicComponent::build("gain", |ports| {
//!     Ok(Gain {
//!         input: ports.audio_input("in", 1)?,
//!         output: ports.audio_output("out", 1)?,
//!         level: ports.parameter_input("level", ParameterConfig::None)?,
//!     })
//! })?;
//!
//! let mut root = CompositeComponent::new("root");
//! root.ports_mut().audio_input::<f32>("in", 1)?;
//! root.ports_mut().audio_output::<f32>("out", 1)?;
//! root.ports_mut()
//!     .parameter_input::<ScalarParameter, DoubleBuffering>("level", ParameterConfig::None)?;
//! root.add_child(gain)?;
//! root.connect_audio_ports(THIS, "in", "gain", "in")?;
//! root.connect_audio_ports("gain", "out", THIS, "out")?;
//! root.register_parameter_connection(THIS, "level", "gain", "level")?;
//!
//! let mut flow = SignalFlow::new(root, FlowConfig::new(4, 48_000.0), &ParameterRegistry::new())?;
//! let level = flow.parameter_producer::<ScalarParameter, DoubleBuffering>("level")?;
//! level.publish(ScalarParameter(0.5));
//!
//! let input = [1.0f32; 4];
//! let mut output = [0.0f32; 4];
//! flow.process(&[&input], &mut [&mut output])?;
//! assert_eq!(output, [0.5; 4]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: setup allocates everything; blocks never allocate
//! - **Fail fast**: every setup error names the offending component, port or
//!   channel, and nothing is built on failure
//! - **No unsafe**: disjoint row access comes from slice splitting

pub mod channel;
pub mod component;
pub mod error;
pub mod graph;
pub mod parameter;
pub mod port;
pub mod protocol;
pub mod sample;

// Re-export main types at crate root
pub use channel::ChannelIndexSet;
pub use component::{
    AtomicComponent, AudioConnection, AudioEndpoint, Component, CompositeComponent,
    ConnectionRegistry, ParameterConnection, ParameterEndpoint, Process, THIS,
};
pub use error::{ComponentError, GraphError, ProcessError};
pub use graph::{
    AudioInputs, AudioOutputs, CommunicationArea, DEFAULT_ALIGNMENT, ExecutionSchedule,
    FlatGraph, FlatNode, FlowConfig, GraphFlattener, InputChannels, OutputChannels,
    ParameterConsumer, ParameterProducer, ParameterSender, Parameters, ProcessContext,
    SampleRows, SignalFlow,
};
pub use parameter::{
    ListenerPosition, MatrixParameter, Parameter, ParameterConfig, ParameterRegistry,
    ParameterType, ScalarParameter, StringParameter, VectorParameter,
};
pub use port::{
    AudioInput, AudioOutput, Direction, ParameterInput, ParameterOutput, PortDescriptor,
    PortKind, PortSet,
};
pub use protocol::{
    DoubleBuffering, DoubleBufferingInstance, MessageQueue, MessageQueueInstance, Protocol,
    ProtocolKind, SharedData, SharedDataInstance,
};
pub use sample::{Sample, SampleType};
