//! The runtime: setup of a component tree and per-block execution.
//!
//! [`SignalFlow::new`] runs every setup phase once: configuration checks,
//! flattening, scheduling, row assignment and port binding. The result is a
//! frozen graph whose [`process`](SignalFlow::process) call runs every atomic
//! component exactly once per block in schedule order, without allocating.
//!
//! # Row layout
//!
//! `f32` rows are laid out as capture channels first, then the output channels
//! of every atomic in schedule order, then playback channels. `f64` rows hold
//! atomic outputs only. Because each component's outputs are contiguous, the
//! area can be split into "everything else" (shared) and "mine" (mutable) for
//! each call.

use core::ops::Range;
use std::collections::HashMap;
use std::sync::Arc;

use super::buffer::CommunicationArea;
use super::context::{PortBinding, ProcessContext};
use super::external::{ParameterConsumer, ParameterProducer};
use super::flatten::{FlatGraph, FlatNode, GraphFlattener};
use super::schedule::ExecutionSchedule;
use crate::component::{AtomicComponent, CompositeComponent, Process};
use crate::error::{GraphError, ProcessError};
use crate::parameter::{Parameter, ParameterRegistry, SharedInstance};
use crate::port::{Direction, PortKind, PortSet};
use crate::protocol::Protocol;
use crate::sample::SampleType;

/// Default row alignment in bytes (one AVX register).
pub const DEFAULT_ALIGNMENT: usize = 32;

/// Block-level settings fixed at setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowConfig {
    /// Samples per channel per block.
    pub block_length: usize,
    /// Sample rate in Hz, passed through to components.
    pub sample_rate: f32,
    /// Row alignment in bytes; a power of two.
    pub alignment: usize,
}

impl FlowConfig {
    /// Settings with the default alignment.
    pub fn new(block_length: usize, sample_rate: f32) -> Self {
        Self {
            block_length,
            sample_rate,
            alignment: DEFAULT_ALIGNMENT,
        }
    }

    /// Replaces the row alignment.
    #[must_use]
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    /// Checks the settings.
    ///
    /// # Errors
    ///
    /// [`GraphError::InvalidConfiguration`] for a zero block length, an
    /// alignment that is not a power of two, or a sample rate that is not a
    /// positive finite number.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.block_length == 0 {
            return Err(GraphError::InvalidConfiguration(
                "block length must be at least one sample".to_string(),
            ));
        }
        if !self.alignment.is_power_of_two() {
            return Err(GraphError::InvalidConfiguration(format!(
                "alignment {} is not a power of two",
                self.alignment
            )));
        }
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(GraphError::InvalidConfiguration(format!(
                "sample rate {} is not a positive number",
                self.sample_rate
            )));
        }
        Ok(())
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self::new(64, 48_000.0)
    }
}

/// An atomic component with everything it needs at block time.
struct ScheduledComponent {
    name: String,
    processor: Box<dyn Process>,
    bindings: Vec<PortBinding>,
    f32_rows: Range<usize>,
    f64_rows: Range<usize>,
}

/// Where one playback channel takes its samples from.
#[derive(Debug, Clone, Copy)]
struct PlaybackRoute {
    row: usize,
    source: Option<usize>,
}

/// A set-up graph ready to process blocks.
pub struct SignalFlow {
    config: FlowConfig,
    flat: FlatGraph,
    schedule: ExecutionSchedule,
    components: Vec<ScheduledComponent>,
    area: CommunicationArea,
    capture_channels: usize,
    playback: Vec<PlaybackRoute>,
    producers: HashMap<usize, Vec<SharedInstance>>,
    consumers: HashMap<usize, SharedInstance>,
}

impl SignalFlow {
    /// Builds the runtime for the tree rooted at `root`.
    ///
    /// The root's audio ports are the capture (inputs) and playback (outputs)
    /// channels and must carry `f32`. Its parameter ports are reachable through
    /// [`parameter_producer`](Self::parameter_producer) and
    /// [`parameter_consumer`](Self::parameter_consumer).
    ///
    /// # Errors
    ///
    /// Any [`GraphError`] from configuration checks, flattening or scheduling.
    /// Nothing is built on failure.
    pub fn new(
        root: CompositeComponent,
        config: FlowConfig,
        registry: &ParameterRegistry,
    ) -> Result<Self, GraphError> {
        config.validate()?;
        check_external_ports(root.ports())?;

        let flat = GraphFlattener::new(registry).flatten(&root)?;
        let schedule = ExecutionSchedule::compute(&flat)?;

        let layout = RowLayout::assign(&flat, &schedule);
        let playback = layout.playback_routes(&flat);
        let (producers, consumers) = external_parameters(&flat, registry)?;

        let mut atomics = Vec::with_capacity(flat.atomics().len());
        root.into_atomics(&mut atomics);
        let mut positions = vec![usize::MAX; flat.atomics().len()];
        for (position, &index) in schedule.order().iter().enumerate() {
            positions[index] = position;
        }
        let mut indexed: Vec<(usize, AtomicComponent)> = atomics.into_iter().enumerate().collect();
        indexed.sort_by_key(|(index, _)| positions[*index]);

        let components = indexed
            .into_iter()
            .map(|(index, atomic)| {
                let f32_rows = layout.f32_ranges[index].clone();
                let f64_rows = layout.f64_ranges[index].clone();
                let bindings = bind_ports(&flat, &layout, index);
                ScheduledComponent {
                    name: flat.atomics()[index].path.clone(),
                    processor: atomic.into_processor(),
                    bindings,
                    f32_rows,
                    f64_rows,
                }
            })
            .collect::<Vec<_>>();

        let area = CommunicationArea::new(
            layout.f32_rows,
            layout.f64_rows,
            config.block_length,
            config.alignment,
        )?;

        #[cfg(feature = "tracing")]
        {
            tracing::debug!(
                f32_rows = layout.f32_rows,
                f64_rows = layout.f64_rows,
                capture = layout.capture_channels,
                playback = playback.len(),
                stride_f32 = area.rows::<f32>().stride(),
                "communication area"
            );
            for component in &components {
                tracing::debug!(
                    component = %component.name,
                    f32_rows = ?component.f32_rows,
                    f64_rows = ?component.f64_rows,
                    "output rows"
                );
            }
        }

        Ok(Self {
            config,
            capture_channels: layout.capture_channels,
            flat,
            schedule,
            components,
            area,
            playback,
            producers,
            consumers,
        })
    }

    /// Processes one block.
    ///
    /// `capture` must hold one slice per capture channel and `playback` one per
    /// playback channel, each exactly one block long.
    ///
    /// # Errors
    ///
    /// - [`ProcessError::ChannelCount`] / [`ProcessError::BlockLength`] if the
    ///   buffers do not match the graph; nothing is processed
    /// - [`ProcessError::Component`] if a component fails; the rest of the block
    ///   is skipped and playback is left untouched
    pub fn process(
        &mut self,
        capture: &[&[f32]],
        playback: &mut [&mut [f32]],
    ) -> Result<(), ProcessError> {
        let block_length = self.config.block_length;
        check_buffers("capture", self.capture_channels, block_length, capture.iter().map(|c| c.len()))?;
        check_buffers("playback", self.playback.len(), block_length, playback.iter().map(|c| c.len()))?;

        for (row, samples) in capture.iter().enumerate() {
            self.area.f32.row_mut(row).copy_from_slice(samples);
        }

        let sample_rate = self.config.sample_rate;
        for component in &mut self.components {
            let f32_split = self.area.f32.split_around(component.f32_rows.clone());
            let f64_split = self.area.f64.split_around(component.f64_rows.clone());
            let mut ctx = ProcessContext::new(
                f32_split,
                f64_split,
                &component.bindings,
                block_length,
                sample_rate,
            );
            component
                .processor
                .process(&mut ctx)
                .map_err(|source| ProcessError::Component {
                    component: component.name.clone(),
                    source,
                })?;
        }

        for (route, out) in self.playback.iter().zip(playback.iter_mut()) {
            match route.source {
                Some(source) => self.area.f32.copy_row(source, route.row),
                None => self.area.f32.row_mut(route.row).fill(0.0),
            }
            out.copy_from_slice(self.area.f32.row(route.row));
        }
        Ok(())
    }

    /// Resets every component and zeroes the communication area.
    pub fn reset(&mut self) {
        for component in &mut self.components {
            component.processor.reset();
        }
        self.area.clear();
    }

    /// Block settings.
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Execution order.
    pub fn schedule(&self) -> &ExecutionSchedule {
        &self.schedule
    }

    /// The flattened graph.
    pub fn flat_graph(&self) -> &FlatGraph {
        &self.flat
    }

    /// Number of capture channels expected by [`process`](Self::process).
    pub fn capture_channels(&self) -> usize {
        self.capture_channels
    }

    /// Number of playback channels expected by [`process`](Self::process).
    pub fn playback_channels(&self) -> usize {
        self.playback.len()
    }

    /// The row arena.
    pub fn communication_area(&self) -> &CommunicationArea {
        &self.area
    }

    /// Producer handle for the root parameter input `port`.
    ///
    /// # Errors
    ///
    /// - [`GraphError::UnknownEndpoint`] if the root has no parameter input
    ///   called `port`
    /// - [`GraphError::ProtocolMismatch`] if `T` or `P` differ from the port's
    ///   declaration
    pub fn parameter_producer<T: Parameter, P: Protocol>(
        &self,
        port: &str,
    ) -> Result<ParameterProducer<T, P>, GraphError> {
        let index = self.external_parameter::<T, P>(port, Direction::Input)?;
        let instances = self
            .producers
            .get(&index)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|instance| self.downcast_instance::<T, P>(port, instance))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ParameterProducer::new(instances))
    }

    /// Consumer handle for the root parameter output `port`.
    ///
    /// # Errors
    ///
    /// - [`GraphError::UnknownEndpoint`] if the root has no parameter output
    ///   called `port`
    /// - [`GraphError::ProtocolMismatch`] if `T` or `P` differ from the port's
    ///   declaration
    pub fn parameter_consumer<T: Parameter, P: Protocol>(
        &self,
        port: &str,
    ) -> Result<ParameterConsumer<T, P>, GraphError> {
        let index = self.external_parameter::<T, P>(port, Direction::Output)?;
        let instance = self
            .consumers
            .get(&index)
            .ok_or_else(|| self.unknown_port(port))?;
        self.downcast_instance::<T, P>(port, instance)
            .map(ParameterConsumer::new)
    }

    /// Recovers the typed protocol instance. Fails when another Rust type was
    /// registered under the same parameter type tag.
    fn downcast_instance<T: Parameter, P: Protocol>(
        &self,
        port: &str,
        instance: &SharedInstance,
    ) -> Result<Arc<P::Instance<T>>, GraphError> {
        Arc::clone(instance)
            .downcast::<P::Instance<T>>()
            .map_err(|_| GraphError::TypeMismatch {
                sender: format!("{}<{}>", core::any::type_name::<T>(), P::KIND),
                receiver: format!("{}.{port}", self.flat.root()),
                reason: format!(
                    "instance behind type tag '{}' holds a different Rust type",
                    T::TYPE
                ),
            })
    }

    fn external_parameter<T: Parameter, P: Protocol>(
        &self,
        port: &str,
        direction: Direction,
    ) -> Result<usize, GraphError> {
        let ports = self.flat.external_ports();
        let Some((index, descriptor)) = ports.find(port) else {
            return Err(self.unknown_port(port));
        };
        let PortKind::Parameter {
            parameter_type,
            protocol,
            ..
        } = descriptor.kind()
        else {
            return Err(self.unknown_port(port));
        };
        if descriptor.direction() != direction {
            return Err(self.unknown_port(port));
        }
        if *parameter_type != T::TYPE || *protocol != P::KIND {
            return Err(GraphError::ProtocolMismatch {
                sender: format!("{}<{}>", T::TYPE, P::KIND),
                receiver: self.flat.describe(FlatNode::External, index),
                reason: format!("port carries {parameter_type} over {protocol}"),
            });
        }
        Ok(index)
    }

    fn unknown_port(&self, port: &str) -> GraphError {
        GraphError::UnknownEndpoint {
            scope: self.flat.root().to_string(),
            endpoint: port.to_string(),
        }
    }
}

impl core::fmt::Debug for SignalFlow {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SignalFlow")
            .field("config", &self.config)
            .field("schedule", &self.schedule.names().collect::<Vec<_>>())
            .field("capture_channels", &self.capture_channels)
            .field("playback_channels", &self.playback.len())
            .finish_non_exhaustive()
    }
}

/// Root audio ports face the hardware (`f32` only); root parameter ports face
/// other threads (no Shared Data).
fn check_external_ports(ports: &PortSet) -> Result<(), GraphError> {
    for descriptor in ports.iter() {
        match descriptor.kind() {
            PortKind::Audio { sample_type, .. } if *sample_type != SampleType::F32 => {
                return Err(GraphError::TypeMismatch {
                    sender: format!("{}.{}", ports.owner(), descriptor.name()),
                    receiver: "audio interface".to_string(),
                    reason: format!("external audio ports carry f32, not {sample_type}"),
                });
            }
            PortKind::Parameter { protocol, .. } if !protocol.crosses_threads() => {
                return Err(GraphError::ProtocolMismatch {
                    sender: format!("{}.{}", ports.owner(), descriptor.name()),
                    receiver: "external thread".to_string(),
                    reason: format!("{protocol} cannot cross threads"),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

fn check_buffers(
    direction: &'static str,
    expected: usize,
    block_length: usize,
    lengths: impl ExactSizeIterator<Item = usize>,
) -> Result<(), ProcessError> {
    if lengths.len() != expected {
        return Err(ProcessError::ChannelCount {
            direction,
            expected,
            actual: lengths.len(),
        });
    }
    for (channel, actual) in lengths.enumerate() {
        if actual != block_length {
            return Err(ProcessError::BlockLength {
                direction,
                channel,
                expected: block_length,
                actual,
            });
        }
    }
    Ok(())
}

/// Row indices chosen at setup.
struct RowLayout {
    /// First row of every source port, in its sample type's row set.
    sources: HashMap<(FlatNode, usize), usize>,
    /// First playback row of every root audio output port.
    playback_ports: HashMap<usize, usize>,
    f32_ranges: Vec<Range<usize>>,
    f64_ranges: Vec<Range<usize>>,
    capture_channels: usize,
    playback_first: usize,
    f32_rows: usize,
    f64_rows: usize,
}

impl RowLayout {
    fn assign(flat: &FlatGraph, schedule: &ExecutionSchedule) -> Self {
        let mut sources = HashMap::new();
        let mut f32_next = 0;
        for (port, descriptor) in flat.external_ports().iter().enumerate() {
            if descriptor.direction() == Direction::Input
                && let Some(width) = descriptor.kind().audio_width()
            {
                sources.insert((FlatNode::External, port), f32_next);
                f32_next += width;
            }
        }
        let capture_channels = f32_next;

        let count = flat.atomics().len();
        let mut f32_ranges = vec![0..0; count];
        let mut f64_ranges = vec![0..0; count];
        let mut f64_next = 0;
        for &index in schedule.order() {
            let (f32_start, f64_start) = (f32_next, f64_next);
            for (port, descriptor) in flat.atomics()[index].ports.iter().enumerate() {
                let PortKind::Audio { sample_type, width } = descriptor.kind() else {
                    continue;
                };
                if descriptor.direction() != Direction::Output {
                    continue;
                }
                let next = match sample_type {
                    SampleType::F32 => &mut f32_next,
                    SampleType::F64 => &mut f64_next,
                };
                sources.insert((FlatNode::Atomic(index), port), *next);
                *next += width;
            }
            f32_ranges[index] = f32_start..f32_next;
            f64_ranges[index] = f64_start..f64_next;
        }

        let playback_first = f32_next;
        let mut playback_ports = HashMap::new();
        for (port, descriptor) in flat.external_ports().iter().enumerate() {
            if descriptor.direction() == Direction::Output
                && let Some(width) = descriptor.kind().audio_width()
            {
                playback_ports.insert(port, f32_next);
                f32_next += width;
            }
        }

        Self {
            sources,
            playback_ports,
            f32_ranges,
            f64_ranges,
            capture_channels,
            playback_first,
            f32_rows: f32_next,
            f64_rows: f64_next,
        }
    }

    /// One route per playback channel, in port order.
    fn playback_routes(&self, flat: &FlatGraph) -> Vec<PlaybackRoute> {
        let first = self.playback_first;
        let mut routes: Vec<PlaybackRoute> = (first..self.f32_rows)
            .map(|row| PlaybackRoute { row, source: None })
            .collect();
        for connection in flat.audio_connections() {
            if connection.receiver.node != FlatNode::External {
                continue;
            }
            let (Some(&port_row), Some(&source_row)) = (
                self.playback_ports.get(&connection.receiver.port),
                self.sources
                    .get(&(connection.sender.node, connection.sender.port)),
            ) else {
                continue;
            };
            let pairs = connection
                .sender
                .indices
                .iter()
                .zip(connection.receiver.indices.iter());
            for (s_channel, r_channel) in pairs {
                routes[port_row + r_channel - first].source = Some(source_row + s_channel);
            }
        }
        routes
    }
}

/// Resolves every port of atomic `index` to rows or protocol instances.
fn bind_ports(flat: &FlatGraph, layout: &RowLayout, index: usize) -> Vec<PortBinding> {
    let node = FlatNode::Atomic(index);
    let ports = &flat.atomics()[index].ports;
    ports
        .iter()
        .enumerate()
        .map(|(port, descriptor)| match (descriptor.kind(), descriptor.direction()) {
            (PortKind::Audio { sample_type, width }, Direction::Input) => {
                let mut rows = vec![0; *width];
                for connection in flat.audio_connections() {
                    if connection.receiver.node != node || connection.receiver.port != port {
                        continue;
                    }
                    let Some(&first) = layout
                        .sources
                        .get(&(connection.sender.node, connection.sender.port))
                    else {
                        continue;
                    };
                    let pairs = connection
                        .sender
                        .indices
                        .iter()
                        .zip(connection.receiver.indices.iter());
                    for (s_channel, r_channel) in pairs {
                        rows[r_channel] = first + s_channel;
                    }
                }
                PortBinding::AudioInput {
                    sample_type: *sample_type,
                    rows,
                }
            }
            (PortKind::Audio { sample_type, width }, Direction::Output) => {
                let own = match sample_type {
                    SampleType::F32 => &layout.f32_ranges[index],
                    SampleType::F64 => &layout.f64_ranges[index],
                };
                layout
                    .sources
                    .get(&(node, port))
                    .map_or(PortBinding::Unbound, |&row| PortBinding::AudioOutput {
                        sample_type: *sample_type,
                        first_row: row - own.start,
                        width: *width,
                    })
            }
            (PortKind::Parameter { .. }, Direction::Input) => PortBinding::ParameterInput(
                flat.parameter_connections()
                    .iter()
                    .find(|c| c.receiver.node == node && c.receiver.port == port)
                    .map(|c| Arc::clone(&c.instance)),
            ),
            (PortKind::Parameter { .. }, Direction::Output) => PortBinding::ParameterOutput(
                flat.parameter_connections()
                    .iter()
                    .filter(|c| c.sender.node == node && c.sender.port == port)
                    .map(|c| Arc::clone(&c.instance))
                    .collect(),
            ),
        })
        .collect()
}

type ExternalParameters = (HashMap<usize, Vec<SharedInstance>>, HashMap<usize, SharedInstance>);

/// Collects the protocol instances behind the root's parameter ports.
///
/// A root output with no producer still gets an instance, so its consumer
/// observes the configured default.
fn external_parameters(
    flat: &FlatGraph,
    registry: &ParameterRegistry,
) -> Result<ExternalParameters, GraphError> {
    let mut producers: HashMap<usize, Vec<SharedInstance>> = HashMap::new();
    let mut consumers = HashMap::new();
    for connection in flat.parameter_connections() {
        if connection.sender.node == FlatNode::External {
            producers
                .entry(connection.sender.port)
                .or_default()
                .push(Arc::clone(&connection.instance));
        }
        if connection.receiver.node == FlatNode::External {
            consumers.insert(connection.receiver.port, Arc::clone(&connection.instance));
        }
    }

    for (port, descriptor) in flat.external_ports().iter().enumerate() {
        let PortKind::Parameter {
            parameter_type,
            protocol,
            config,
        } = descriptor.kind()
        else {
            continue;
        };
        if descriptor.direction() == Direction::Output && !consumers.contains_key(&port) {
            let instance = registry
                .create(*parameter_type, *protocol, config)
                .ok_or_else(|| GraphError::UnregisteredParameter {
                    parameter_type: parameter_type.to_string(),
                    protocol: protocol.to_string(),
                })?;
            consumers.insert(port, instance);
        }
    }
    Ok((producers, consumers))
}
