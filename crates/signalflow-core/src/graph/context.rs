//! Per-block view handed to an atomic component.
//!
//! A component's output rows are contiguous in the communication area. For
//! each call the area is split into shared access to every row outside that
//! range and mutable access to the rows inside it, so a component can read
//! its producers and write its outputs without copies or locks.

use core::any::Any;
use core::marker::PhantomData;
use core::ops::Range;
use std::sync::Arc;

use crate::error::ComponentError;
use crate::parameter::Parameter;
use crate::port::{AudioInput, AudioOutput, ParameterInput, ParameterOutput};
use crate::protocol::{DoubleBuffering, MessageQueue, Protocol, SharedData};
use crate::sample::{Sample, SampleType};

/// What a port resolved to at setup time.
pub(crate) enum PortBinding {
    /// Row index per channel (rows belong to producers).
    AudioInput {
        sample_type: SampleType,
        rows: Vec<usize>,
    },
    /// First row of the port, relative to the component's own rows.
    AudioOutput {
        sample_type: SampleType,
        first_row: usize,
        width: usize,
    },
    ParameterInput(Option<Arc<dyn Any + Send + Sync>>),
    ParameterOutput(Vec<Arc<dyn Any + Send + Sync>>),
    /// Port kind and handle kind disagree; nothing is bound.
    Unbound,
}

/// Shared access to every row of one sample type except the caller's own.
pub struct RowsView<'a, S> {
    head: &'a [S],
    tail: &'a [S],
    own: Range<usize>,
    stride: usize,
    block_length: usize,
}

impl<'a, S> RowsView<'a, S> {
    pub(crate) fn new(
        head: &'a mut [S],
        tail: &'a mut [S],
        own: Range<usize>,
        stride: usize,
        block_length: usize,
    ) -> Self {
        Self {
            head,
            tail,
            own,
            stride,
            block_length,
        }
    }

    /// Row `row` of the area. Rows in the caller's own range read as empty.
    pub fn row(&self, row: usize) -> &'a [S] {
        let (slice, local) = if row < self.own.start {
            (self.head, row)
        } else if row >= self.own.end {
            (self.tail, row - self.own.end)
        } else {
            return &[];
        };
        let start = local * self.stride;
        &slice[start..start + self.block_length]
    }
}

/// Mutable access to the caller's own rows of one sample type.
pub struct OwnRows<'a, S> {
    rows: &'a mut [S],
    stride: usize,
    block_length: usize,
}

impl<'a, S> OwnRows<'a, S> {
    pub(crate) fn new(rows: &'a mut [S], stride: usize, block_length: usize) -> Self {
        Self {
            rows,
            stride,
            block_length,
        }
    }

    /// The `width` rows starting at local row `first`.
    pub fn port_mut(&mut self, first: usize, width: usize) -> OutputChannels<'_, S> {
        let start = first * self.stride;
        let end = (first + width) * self.stride;
        OutputChannels {
            data: &mut self.rows[start..end],
            stride: self.stride,
            block_length: self.block_length,
        }
    }
}

/// The channels of one audio input port.
pub struct InputChannels<'s, S> {
    view: &'s RowsView<'s, S>,
    rows: &'s [usize],
}

impl<'s, S> InputChannels<'s, S> {
    /// Number of channels.
    pub fn width(&self) -> usize {
        self.rows.len()
    }

    /// Samples of channel `channel`.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= width()`.
    pub fn channel(&self, channel: usize) -> &'s [S] {
        self.view.row(self.rows[channel])
    }

    /// Iterates the channels in order.
    pub fn iter(&self) -> impl Iterator<Item = &'s [S]> + '_ {
        self.rows.iter().map(|&row| self.view.row(row))
    }
}

/// The channels of one audio output port.
pub struct OutputChannels<'s, S> {
    data: &'s mut [S],
    stride: usize,
    block_length: usize,
}

impl<S: Copy> OutputChannels<'_, S> {
    /// Number of channels.
    pub fn width(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.data.len() / self.stride
        }
    }

    /// Samples of channel `channel`, mutably.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= width()`.
    pub fn channel_mut(&mut self, channel: usize) -> &mut [S] {
        let start = channel * self.stride;
        &mut self.data[start..start + self.block_length]
    }

    /// Iterates the channels mutably, in order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut [S]> + '_ {
        let block_length = self.block_length;
        self.data
            .chunks_exact_mut(self.stride.max(1))
            .map(move |chunk| &mut chunk[..block_length])
    }

    /// Writes `value` to every sample of every channel.
    pub fn fill(&mut self, value: S) {
        for channel in self.iter_mut() {
            channel.fill(value);
        }
    }
}

/// Audio inputs of the running component.
pub struct AudioInputs<'a> {
    pub(crate) f32: RowsView<'a, f32>,
    pub(crate) f64: RowsView<'a, f64>,
    bindings: &'a [PortBinding],
}

impl AudioInputs<'_> {
    /// Channels of the input port behind `handle`.
    ///
    /// A handle that does not match an audio input of this component in
    /// position, sample type and width yields a port of width zero.
    pub fn port<S: Sample>(&self, handle: &AudioInput<S>) -> InputChannels<'_, S> {
        let rows = match self.bindings.get(handle.index()) {
            Some(PortBinding::AudioInput { sample_type, rows })
                if *sample_type == S::TYPE && rows.len() == handle.width() =>
            {
                rows.as_slice()
            }
            _ => &[],
        };
        InputChannels {
            view: S::view(self),
            rows,
        }
    }
}

/// Audio outputs of the running component.
pub struct AudioOutputs<'a> {
    pub(crate) f32: OwnRows<'a, f32>,
    pub(crate) f64: OwnRows<'a, f64>,
    bindings: &'a [PortBinding],
}

impl AudioOutputs<'_> {
    /// Channels of the output port behind `handle`.
    ///
    /// A handle that does not match an audio output of this component in
    /// position, sample type and width yields a port of width zero.
    pub fn port<S: Sample>(&mut self, handle: &AudioOutput<S>) -> OutputChannels<'_, S> {
        let first_row = match self.bindings.get(handle.index()) {
            Some(PortBinding::AudioOutput {
                sample_type,
                first_row,
                width,
            }) if *sample_type == S::TYPE && *width == handle.width() => *first_row,
            _ => {
                return OutputChannels {
                    data: &mut [],
                    stride: 0,
                    block_length: 0,
                };
            }
        };
        S::own(self).port_mut(first_row, handle.width())
    }
}

/// Parameter ports of the running component.
pub struct Parameters<'a> {
    bindings: &'a [PortBinding],
}

impl<'a> Parameters<'a> {
    /// The protocol instance feeding the parameter input behind `handle`.
    ///
    /// # Errors
    ///
    /// Fails if the handle does not belong to this component.
    pub fn input<T: Parameter, P: Protocol>(
        &self,
        handle: &ParameterInput<T, P>,
    ) -> Result<&'a P::Instance<T>, ComponentError> {
        match self.bindings.get(handle.index()) {
            Some(PortBinding::ParameterInput(Some(instance))) => instance
                .downcast_ref::<P::Instance<T>>()
                .ok_or(ComponentError::new("parameter input has a different type")),
            _ => Err(ComponentError::new("handle is not a bound parameter input")),
        }
    }

    /// The sending side of the parameter output behind `handle`.
    ///
    /// An output with no consumers, or a handle from another component,
    /// yields a sender that discards every value.
    pub fn output<T: Parameter, P: Protocol>(
        &self,
        handle: &ParameterOutput<T, P>,
    ) -> ParameterSender<'a, T, P> {
        let instances = match self.bindings.get(handle.index()) {
            Some(PortBinding::ParameterOutput(instances)) => instances.as_slice(),
            _ => &[],
        };
        ParameterSender {
            instances,
            _marker: PhantomData,
        }
    }
}

/// Sending side of a parameter output; fans out to every connected consumer.
pub struct ParameterSender<'a, T, P> {
    instances: &'a [Arc<dyn Any + Send + Sync>],
    _marker: PhantomData<fn() -> (T, P)>,
}

impl<T: Parameter, P: Protocol> ParameterSender<'_, T, P> {
    /// Number of connected consumers.
    pub fn connections(&self) -> usize {
        self.instances.len()
    }

    /// Visits the protocol instance of every consumer.
    pub fn for_each(&self, mut f: impl FnMut(&P::Instance<T>)) {
        for instance in self.instances {
            if let Some(instance) = instance.downcast_ref::<P::Instance<T>>() {
                f(instance);
            }
        }
    }

    fn send(&self, value: T, mut deliver: impl FnMut(&P::Instance<T>, T)) {
        let Some((last, rest)) = self.instances.split_last() else {
            return;
        };
        for instance in rest {
            if let Some(instance) = instance.downcast_ref::<P::Instance<T>>() {
                deliver(instance, value.clone());
            }
        }
        if let Some(instance) = last.downcast_ref::<P::Instance<T>>() {
            deliver(instance, value);
        }
    }
}

impl<T: Parameter> ParameterSender<'_, T, MessageQueue> {
    /// Enqueues `value` for every consumer.
    pub fn enqueue(&self, value: T) {
        self.send(value, |queue, value| queue.enqueue(value));
    }
}

impl<T: Parameter> ParameterSender<'_, T, DoubleBuffering> {
    /// Publishes `value` to every consumer.
    pub fn publish(&self, value: T) {
        self.send(value, |buffer, value| buffer.publish(value));
    }
}

impl<T: Parameter> ParameterSender<'_, T, SharedData> {
    /// Stores `value` for every consumer.
    pub fn set(&self, value: T) {
        self.send(value, |slot, value| slot.set(value));
    }
}

/// Everything an atomic component may touch while processing one block.
pub struct ProcessContext<'a> {
    /// Audio input ports.
    pub inputs: AudioInputs<'a>,
    /// Audio output ports.
    pub outputs: AudioOutputs<'a>,
    /// Parameter ports.
    pub parameters: Parameters<'a>,
    block_length: usize,
    sample_rate: f32,
}

impl<'a> ProcessContext<'a> {
    pub(crate) fn new(
        (f32_in, f32_out): (RowsView<'a, f32>, OwnRows<'a, f32>),
        (f64_in, f64_out): (RowsView<'a, f64>, OwnRows<'a, f64>),
        bindings: &'a [PortBinding],
        block_length: usize,
        sample_rate: f32,
    ) -> Self {
        Self {
            inputs: AudioInputs {
                f32: f32_in,
                f64: f64_in,
                bindings,
            },
            outputs: AudioOutputs {
                f32: f32_out,
                f64: f64_out,
                bindings,
            },
            parameters: Parameters { bindings },
            block_length,
            sample_rate,
        }
    }

    /// Samples per channel in this block.
    pub fn block_length(&self) -> usize {
        self.block_length
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}
