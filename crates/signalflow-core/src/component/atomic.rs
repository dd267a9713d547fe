//! Atomic (leaf) components.

use core::fmt;

use crate::error::{ComponentError, GraphError};
use crate::graph::ProcessContext;
use crate::port::PortSet;

/// Per-block processing of a leaf component.
///
/// `process` is called once per block on the audio thread, after every
/// component it depends on has run. It must not allocate, lock contended
/// resources or block.
///
/// ```rust
/// use signalflow_core::{AudioInput, AudioOutput, ComponentError, Process, ProcessContext};
///
/// struct Invert {
///     input: AudioInput<f32>,
///     output: AudioOutput<f32>,
/// }
///
/// impl Process for Invert {
///     fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ComponentError> {
///         let input = ctx.inputs.port(&self.input);
///         let mut output = ctx.outputs.port(&self.output);
///         for ch in 0..self.output.width() {
///             for (o, i) in output.channel_mut(ch).iter_mut().zip(input.channel(ch)) {
///                 *o = -*i;
///             }
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Process: Send {
    /// Processes one block.
    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ComponentError>;

    /// Clears internal state (delay lines, envelopes). Called off the block path.
    fn reset(&mut self) {}
}

/// A leaf of the component tree: ports plus a processor.
pub struct AtomicComponent {
    name: String,
    ports: PortSet,
    processor: Box<dyn Process>,
}

impl AtomicComponent {
    /// Builds a component. `setup` registers the ports and returns the
    /// processor holding the port handles.
    ///
    /// # Errors
    ///
    /// Propagates registration errors from `setup`.
    pub fn build<P, F>(name: impl Into<String>, setup: F) -> Result<Self, GraphError>
    where
        P: Process + 'static,
        F: FnOnce(&mut PortSet) -> Result<P, GraphError>,
    {
        let name = name.into();
        let mut ports = PortSet::new(name.clone());
        let processor = setup(&mut ports)?;
        Ok(Self {
            name,
            ports,
            processor: Box::new(processor),
        })
    }

    /// Local name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered ports.
    pub fn ports(&self) -> &PortSet {
        &self.ports
    }

    pub(crate) fn into_processor(self) -> Box<dyn Process> {
        self.processor
    }
}

impl fmt::Debug for AtomicComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicComponent")
            .field("name", &self.name)
            .field("ports", &self.ports)
            .finish_non_exhaustive()
    }
}
