//! Graph flattening.
//!
//! Flattening turns the component tree into direct connections between atomic
//! components and the root's external ports. Composite boundaries disappear:
//! every atomic input channel is traced back through any number of composite
//! pass-through connections until it reaches its real producer, either an
//! atomic output channel or an external capture channel.
//!
//! # Resolution
//!
//! 1. Walk the tree depth-first and give every component a node id and a
//!    fully-qualified path (`root.group.leaf`).
//! 2. Record, for every receiving channel of every declared connection, the
//!    sending channel that feeds it (the *feed map*). A channel fed twice is
//!    rejected here.
//! 3. For every atomic input channel and external playback channel, follow the
//!    feed map until a terminal source is reached. A missing feed is an
//!    unconnected input; a chain that revisits itself is a cycle.
//! 4. Group consecutive channels of each declared connection that resolve to
//!    the same source port into one [`FlatAudioConnection`].
//!
//! Parameter connections follow the same steps without the channel dimension,
//! and each resulting connection gets its own protocol instance from the
//! [`ParameterRegistry`].

use std::collections::HashMap;
use std::fmt;

use crate::channel::ChannelIndexSet;
use crate::component::{CompositeComponent, Component, THIS, parameter_compatibility};
use crate::error::GraphError;
use crate::parameter::{ParameterConfig, ParameterRegistry, ParameterType, SharedInstance};
use crate::port::{Direction, PortKind, PortSet};
use crate::protocol::ProtocolKind;

/// Where a flattened endpoint lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FlatNode {
    /// The root composite's boundary (capture, playback and external parameters).
    External,
    /// The atomic component with this index (depth-first order).
    Atomic(usize),
}

/// One side of a flattened audio connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatAudioEndpoint {
    /// Owning node.
    pub node: FlatNode,
    /// Port index on that node.
    pub port: usize,
    /// Channels of the port.
    pub indices: ChannelIndexSet,
}

/// A direct audio connection between atomic components or external ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatAudioConnection {
    /// Producing side.
    pub sender: FlatAudioEndpoint,
    /// Consuming side.
    pub receiver: FlatAudioEndpoint,
}

/// One side of a flattened parameter connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatParameterEndpoint {
    /// Owning node.
    pub node: FlatNode,
    /// Port index on that node.
    pub port: usize,
}

/// A direct parameter connection with its protocol instance.
#[derive(Clone)]
pub struct FlatParameterConnection {
    /// Producing side.
    pub sender: FlatParameterEndpoint,
    /// Consuming side.
    pub receiver: FlatParameterEndpoint,
    /// Parameter type carried.
    pub parameter_type: ParameterType,
    /// Protocol used.
    pub protocol: ProtocolKind,
    /// Shape of the value.
    pub config: ParameterConfig,
    pub(crate) instance: SharedInstance,
}

impl fmt::Debug for FlatParameterConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatParameterConnection")
            .field("sender", &self.sender)
            .field("receiver", &self.receiver)
            .field("parameter_type", &self.parameter_type)
            .field("protocol", &self.protocol)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// An atomic component as seen after flattening.
#[derive(Debug, Clone)]
pub struct FlatAtomic {
    /// Fully-qualified name.
    pub path: String,
    /// Its ports.
    pub ports: PortSet,
}

/// Result of flattening: atomics plus direct connections.
#[derive(Debug, Clone)]
pub struct FlatGraph {
    root: String,
    atomics: Vec<FlatAtomic>,
    external: PortSet,
    audio: Vec<FlatAudioConnection>,
    parameter: Vec<FlatParameterConnection>,
}

impl FlatGraph {
    /// Name of the root composite.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Atomic components in depth-first order; [`FlatNode::Atomic`] indexes this.
    pub fn atomics(&self) -> &[FlatAtomic] {
        &self.atomics
    }

    /// Boundary ports of the root composite.
    pub fn external_ports(&self) -> &PortSet {
        &self.external
    }

    /// Flattened audio connections.
    pub fn audio_connections(&self) -> &[FlatAudioConnection] {
        &self.audio
    }

    /// Flattened parameter connections.
    pub fn parameter_connections(&self) -> &[FlatParameterConnection] {
        &self.parameter
    }

    /// Index of the atomic with fully-qualified name `path`.
    pub fn atomic_index(&self, path: &str) -> Option<usize> {
        self.atomics.iter().position(|a| a.path == path)
    }

    /// Ports of a node.
    pub fn ports(&self, node: FlatNode) -> &PortSet {
        match node {
            FlatNode::External => &self.external,
            FlatNode::Atomic(index) => &self.atomics[index].ports,
        }
    }

    /// `path.port` name of an endpoint, for messages.
    pub fn describe(&self, node: FlatNode, port: usize) -> String {
        let owner = match node {
            FlatNode::External => self.root.as_str(),
            FlatNode::Atomic(index) => self.atomics[index].path.as_str(),
        };
        let port = self.ports(node).get(port).map_or("?", |p| p.name());
        format!("{owner}.{port}")
    }
}

/// Turns a component tree into a [`FlatGraph`].
pub struct GraphFlattener<'r> {
    registry: &'r ParameterRegistry,
}

/// (tree node, port index)
type PortKey = (usize, usize);
/// (tree node, port index, channel)
type ChannelKey = (usize, usize, usize);

struct TreeNode<'t> {
    path: String,
    ports: &'t PortSet,
    atomic: Option<usize>,
}

/// A declared connection whose receiver is an atomic input or a root output.
struct PendingAudio {
    receiver: usize,
    port: usize,
    indices: ChannelIndexSet,
}

/// Bookkeeping for one flattening run.
struct Collector<'t> {
    nodes: Vec<TreeNode<'t>>,
    atomics: usize,
    audio_feeds: HashMap<ChannelKey, ChannelKey>,
    parameter_feeds: HashMap<PortKey, PortKey>,
    audio_sinks: Vec<PendingAudio>,
    parameter_sinks: Vec<PortKey>,
}

const ROOT: usize = 0;

impl<'r> GraphFlattener<'r> {
    /// Creates a flattener that instantiates protocols through `registry`.
    pub fn new(registry: &'r ParameterRegistry) -> Self {
        Self { registry }
    }

    /// Flattens the tree rooted at `root`.
    ///
    /// # Errors
    ///
    /// - [`GraphError::MultipleProducers`] for a channel or parameter fed twice
    /// - [`GraphError::UnconnectedInput`] for an atomic input with no producer
    /// - [`GraphError::TypeMismatch`] / [`GraphError::ProtocolMismatch`] when the
    ///   resolved endpoints disagree
    /// - [`GraphError::CyclicGraph`] for a pass-through chain that loops
    /// - [`GraphError::UnregisteredParameter`] for a parameter pair missing
    ///   from the registry
    pub fn flatten(&self, root: &CompositeComponent) -> Result<FlatGraph, GraphError> {
        let mut collector = Collector {
            nodes: Vec::new(),
            atomics: 0,
            audio_feeds: HashMap::new(),
            parameter_feeds: HashMap::new(),
            audio_sinks: Vec::new(),
            parameter_sinks: Vec::new(),
        };
        collector.visit(root, root.name().to_string())?;
        collector.check_atomic_inputs()?;

        let audio = collector.flat_audio()?;
        let parameter = collector.flat_parameters(self.registry)?;

        let atomics = collector
            .nodes
            .iter()
            .filter(|node| node.atomic.is_some())
            .map(|node| FlatAtomic {
                path: node.path.clone(),
                ports: node.ports.clone(),
            })
            .collect::<Vec<_>>();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            root = root.name(),
            atomics = atomics.len(),
            audio = audio.len(),
            parameter = parameter.len(),
            "flattened component tree"
        );

        Ok(FlatGraph {
            root: root.name().to_string(),
            atomics,
            external: root.ports().clone(),
            audio,
            parameter,
        })
    }
}

impl<'t> Collector<'t> {
    fn push(&mut self, path: String, ports: &'t PortSet, atomic: bool) -> usize {
        let atomic = atomic.then(|| {
            self.atomics += 1;
            self.atomics - 1
        });
        self.nodes.push(TreeNode {
            path,
            ports,
            atomic,
        });
        self.nodes.len() - 1
    }

    /// Depth-first registration of `composite` and everything below it.
    fn visit(&mut self, composite: &'t CompositeComponent, path: String) -> Result<usize, GraphError> {
        let id = self.push(path, composite.ports(), false);
        let mut children: HashMap<&str, usize> = HashMap::with_capacity(composite.children().len());
        for child in composite.children() {
            let child_path = format!("{}.{}", self.nodes[id].path, child.name());
            let child_id = match child {
                Component::Atomic(atomic) => self.push(child_path, atomic.ports(), true),
                Component::Composite(inner) => self.visit(inner, child_path)?,
            };
            children.insert(child.name(), child_id);
        }

        let resolve = |component: &str, port: &str| -> Result<PortKey, GraphError> {
            let node = if component == THIS {
                Some(id)
            } else {
                children.get(component).copied()
            };
            node.and_then(|node| {
                self.nodes[node]
                    .ports
                    .find(port)
                    .map(|(index, _)| (node, index))
            })
            .ok_or_else(|| GraphError::UnknownEndpoint {
                scope: self.nodes[id].path.clone(),
                endpoint: format!("{component}.{port}"),
            })
        };

        let mut audio = Vec::new();
        for connection in composite.connections().audio() {
            let sender = resolve(&connection.sender.component, &connection.sender.port)?;
            let receiver = resolve(&connection.receiver.component, &connection.receiver.port)?;
            audio.push((sender, receiver, connection));
        }
        let mut parameter = Vec::new();
        for connection in composite.connections().parameter() {
            let sender = resolve(&connection.sender.component, &connection.sender.port)?;
            let receiver = resolve(&connection.receiver.component, &connection.receiver.port)?;
            parameter.push((sender, receiver));
        }

        for ((s_node, s_port), (r_node, r_port), connection) in audio {
            let pairs = connection
                .sender
                .indices
                .iter()
                .zip(connection.receiver.indices.iter());
            for (s_channel, r_channel) in pairs {
                let key = (r_node, r_port, r_channel);
                if self.audio_feeds.insert(key, (s_node, s_port, s_channel)).is_some() {
                    return Err(GraphError::MultipleProducers {
                        component: self.nodes[r_node].path.clone(),
                        port: self.port_name((r_node, r_port)).to_string(),
                        channel: Some(r_channel),
                    });
                }
            }
            if self.is_sink(r_node) {
                self.audio_sinks.push(PendingAudio {
                    receiver: r_node,
                    port: r_port,
                    indices: connection.receiver.indices.clone(),
                });
            }
        }

        for (sender, receiver) in parameter {
            if self.parameter_feeds.insert(receiver, sender).is_some() {
                return Err(GraphError::MultipleProducers {
                    component: self.nodes[receiver.0].path.clone(),
                    port: self.port_name(receiver).to_string(),
                    channel: None,
                });
            }
            if self.is_sink(receiver.0) {
                self.parameter_sinks.push(receiver);
            }
        }
        Ok(id)
    }

    /// Atomic inputs and root outputs are where resolution starts.
    fn is_sink(&self, node: usize) -> bool {
        node == ROOT || self.nodes[node].atomic.is_some()
    }

    fn port_name(&self, (node, port): PortKey) -> &str {
        self.nodes[node].ports.get(port).map_or("?", |p| p.name())
    }

    fn describe(&self, (node, port): PortKey) -> String {
        format!("{}.{}", self.nodes[node].path, self.port_name((node, port)))
    }

    fn direction(&self, (node, port): PortKey) -> Option<Direction> {
        self.nodes[node].ports.get(port).map(|p| p.direction())
    }

    /// Atomic outputs and root inputs produce data; everything else forwards it.
    fn is_source(&self, key: PortKey) -> bool {
        match self.direction(key) {
            Some(Direction::Output) => self.nodes[key.0].atomic.is_some(),
            Some(Direction::Input) => key.0 == ROOT,
            None => false,
        }
    }

    fn flat_node(&self, node: usize) -> FlatNode {
        self.nodes[node].atomic.map_or(FlatNode::External, FlatNode::Atomic)
    }

    /// Follows the audio feed map from `start` to its producer.
    fn resolve_audio(&self, start: ChannelKey) -> Result<Option<ChannelKey>, GraphError> {
        let mut key = start;
        for _ in 0..=self.audio_feeds.len() {
            let Some(&source) = self.audio_feeds.get(&key) else {
                return Ok(None);
            };
            if self.is_source((source.0, source.1)) {
                return Ok(Some(source));
            }
            key = source;
        }
        Err(GraphError::CyclicGraph {
            components: vec![self.describe((key.0, key.1))],
        })
    }

    /// Follows the parameter feed map from `start` to its producer.
    fn resolve_parameter(&self, start: PortKey) -> Result<Option<PortKey>, GraphError> {
        let mut key = start;
        for _ in 0..=self.parameter_feeds.len() {
            let Some(&source) = self.parameter_feeds.get(&key) else {
                return Ok(None);
            };
            if self.is_source(source) {
                return Ok(Some(source));
            }
            key = source;
        }
        Err(GraphError::CyclicGraph {
            components: vec![self.describe(key)],
        })
    }

    /// Every atomic input channel must resolve to exactly one producer of a
    /// matching type.
    fn check_atomic_inputs(&self) -> Result<(), GraphError> {
        for (node, tree_node) in self.nodes.iter().enumerate() {
            if tree_node.atomic.is_none() {
                continue;
            }
            for (port, descriptor) in tree_node.ports.iter().enumerate() {
                if descriptor.direction() != Direction::Input {
                    continue;
                }
                match descriptor.kind() {
                    PortKind::Audio { sample_type, width } => {
                        for channel in 0..*width {
                            let Some(source) = self.resolve_audio((node, port, channel))? else {
                                return Err(GraphError::UnconnectedInput {
                                    component: tree_node.path.clone(),
                                    port: descriptor.name().to_string(),
                                    channel: Some(channel),
                                });
                            };
                            let source_kind = self.nodes[source.0].ports.get(source.1).map(|p| p.kind());
                            if let Some(PortKind::Audio { sample_type: source_type, .. }) = source_kind
                                && source_type != sample_type
                            {
                                return Err(GraphError::TypeMismatch {
                                    sender: self.describe((source.0, source.1)),
                                    receiver: self.describe((node, port)),
                                    reason: format!(
                                        "sample type {source_type} cannot feed {sample_type}"
                                    ),
                                });
                            }
                        }
                    }
                    PortKind::Parameter { .. } => {
                        if self.resolve_parameter((node, port))?.is_none() {
                            return Err(GraphError::UnconnectedInput {
                                component: tree_node.path.clone(),
                                port: descriptor.name().to_string(),
                                channel: None,
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolves every sink connection and groups channels by source port.
    fn flat_audio(&self) -> Result<Vec<FlatAudioConnection>, GraphError> {
        let mut flat = Vec::with_capacity(self.audio_sinks.len());
        for sink in &self.audio_sinks {
            let receiver = self.flat_node(sink.receiver);
            let mut group: Option<(PortKey, Vec<usize>, Vec<usize>)> = None;
            for r_channel in sink.indices.iter() {
                let source = self.resolve_audio((sink.receiver, sink.port, r_channel))?;
                let Some((s_node, s_port, s_channel)) = source else {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        port = %self.describe((sink.receiver, sink.port)),
                        channel = r_channel,
                        "external output has no producer; it will play silence"
                    );
                    flush(&mut flat, group.take(), self, receiver, sink.port);
                    continue;
                };
                match &mut group {
                    Some((key, senders, receivers)) if *key == (s_node, s_port) => {
                        senders.push(s_channel);
                        receivers.push(r_channel);
                    }
                    _ => {
                        flush(&mut flat, group.take(), self, receiver, sink.port);
                        group = Some(((s_node, s_port), vec![s_channel], vec![r_channel]));
                    }
                }
            }
            flush(&mut flat, group, self, receiver, sink.port);
        }
        Ok(flat)
    }

    /// Resolves every parameter sink and creates its protocol instance.
    fn flat_parameters(
        &self,
        registry: &ParameterRegistry,
    ) -> Result<Vec<FlatParameterConnection>, GraphError> {
        let mut flat = Vec::with_capacity(self.parameter_sinks.len());
        for &sink in &self.parameter_sinks {
            let Some(source) = self.resolve_parameter(sink)? else {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    port = %self.describe(sink),
                    "external parameter output has no producer"
                );
                continue;
            };
            let sender_kind = self.nodes[source.0].ports.get(source.1).map(|p| p.kind());
            let receiver_kind = self.nodes[sink.0].ports.get(sink.1).map(|p| p.kind());
            let (Some(sender_kind), Some(receiver_kind)) = (sender_kind, receiver_kind) else {
                continue;
            };
            parameter_compatibility(sender_kind, receiver_kind).map_err(|reason| {
                GraphError::ProtocolMismatch {
                    sender: self.describe(source),
                    receiver: self.describe(sink),
                    reason,
                }
            })?;
            let PortKind::Parameter {
                parameter_type,
                protocol,
                config,
            } = receiver_kind
            else {
                continue;
            };
            let instance = registry
                .create(*parameter_type, *protocol, config)
                .ok_or_else(|| GraphError::UnregisteredParameter {
                    parameter_type: parameter_type.to_string(),
                    protocol: protocol.to_string(),
                })?;
            flat.push(FlatParameterConnection {
                sender: FlatParameterEndpoint {
                    node: self.flat_node(source.0),
                    port: source.1,
                },
                receiver: FlatParameterEndpoint {
                    node: self.flat_node(sink.0),
                    port: sink.1,
                },
                parameter_type: *parameter_type,
                protocol: *protocol,
                config: *config,
                instance,
            });
        }
        Ok(flat)
    }
}

/// Emits a grouped run of channels as one flat connection.
fn flush(
    flat: &mut Vec<FlatAudioConnection>,
    group: Option<(PortKey, Vec<usize>, Vec<usize>)>,
    collector: &Collector<'_>,
    receiver: FlatNode,
    receiver_port: usize,
) {
    let Some(((s_node, s_port), senders, receivers)) = group else {
        return;
    };
    flat.push(FlatAudioConnection {
        sender: FlatAudioEndpoint {
            node: collector.flat_node(s_node),
            port: s_port,
            indices: ChannelIndexSet::from_indices(senders),
        },
        receiver: FlatAudioEndpoint {
            node: receiver,
            port: receiver_port,
            indices: ChannelIndexSet::from_indices(receivers),
        },
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::tests::passthrough;
    use crate::component::{AtomicComponent, Process};
    use crate::error::ComponentError;
    use crate::graph::ProcessContext;
    use crate::parameter::ScalarParameter;
    use crate::protocol::{DoubleBuffering, MessageQueue};

    fn stereo_root() -> CompositeComponent {
        let mut root = CompositeComponent::new("root");
        root.ports_mut().audio_input::<f32>("in", 2).unwrap();
        root.ports_mut().audio_output::<f32>("out", 2).unwrap();
        root
    }

    fn flatten(root: &CompositeComponent) -> Result<FlatGraph, GraphError> {
        GraphFlattener::new(&ParameterRegistry::new()).flatten(root)
    }

    #[test]
    fn flat_graph_is_unchanged() {
        let mut root = stereo_root();
        root.add_child(passthrough("a", 2)).unwrap();
        root.connect_audio_ports(THIS, "in", "a", "in").unwrap();
        root.register_audio_connection("a", "out", [1, 0], THIS, "out", [0, 1])
            .unwrap();

        let flat = flatten(&root).unwrap();
        assert_eq!(flat.atomics().len(), 1);
        assert_eq!(flat.audio_connections().len(), 2);
        let into_a = &flat.audio_connections()[0];
        assert_eq!(into_a.sender.node, FlatNode::External);
        assert_eq!(into_a.receiver.node, FlatNode::Atomic(0));
        assert_eq!(into_a.sender.indices, ChannelIndexSet::full(2));
        let out = &flat.audio_connections()[1];
        assert_eq!(out.sender.indices.to_vec(), vec![1, 0]);
        assert_eq!(out.receiver.indices.to_vec(), vec![0, 1]);
    }

    #[test]
    fn nested_composite_resolves_through() {
        let mut inner = CompositeComponent::new("inner");
        inner.ports_mut().audio_input::<f32>("in", 2).unwrap();
        inner.ports_mut().audio_output::<f32>("out", 2).unwrap();
        inner.add_child(passthrough("leaf", 2)).unwrap();
        inner.connect_audio_ports(THIS, "in", "leaf", "in").unwrap();
        inner.connect_audio_ports("leaf", "out", THIS, "out").unwrap();

        let mut root = stereo_root();
        root.add_child(passthrough("pre", 2)).unwrap();
        root.add_child(inner).unwrap();
        root.connect_audio_ports(THIS, "in", "pre", "in").unwrap();
        root.connect_audio_ports("pre", "out", "inner", "in").unwrap();
        root.connect_audio_ports("inner", "out", THIS, "out").unwrap();

        let flat = flatten(&root).unwrap();
        let paths: Vec<&str> = flat.atomics().iter().map(|a| a.path.as_str()).collect();
        assert_eq!(paths, vec!["root.pre", "root.inner.leaf"]);

        let leaf = flat.atomic_index("root.inner.leaf").unwrap();
        let pre = flat.atomic_index("root.pre").unwrap();
        let into_leaf = flat
            .audio_connections()
            .iter()
            .find(|c| c.receiver.node == FlatNode::Atomic(leaf))
            .unwrap();
        assert_eq!(into_leaf.sender.node, FlatNode::Atomic(pre));
        assert_eq!(into_leaf.sender.indices, ChannelIndexSet::full(2));

        let to_playback = flat
            .audio_connections()
            .iter()
            .find(|c| c.receiver.node == FlatNode::External)
            .unwrap();
        assert_eq!(to_playback.sender.node, FlatNode::Atomic(leaf));
    }

    #[test]
    fn split_sources_become_separate_connections() {
        let mut root = stereo_root();
        root.add_child(passthrough("l", 1)).unwrap();
        root.add_child(passthrough("r", 1)).unwrap();
        root.register_audio_connection(THIS, "in", [0], "l", "in", [0]).unwrap();
        root.register_audio_connection(THIS, "in", [1], "r", "in", [0]).unwrap();
        root.register_audio_connection("l", "out", [0], THIS, "out", [0]).unwrap();
        root.register_audio_connection("r", "out", [0], THIS, "out", [1]).unwrap();

        let flat = flatten(&root).unwrap();
        assert_eq!(flat.audio_connections().len(), 4);
    }

    #[test]
    fn unconnected_channel_is_named() {
        let mut root = stereo_root();
        root.add_child(passthrough("mix", 2)).unwrap();
        root.register_audio_connection(THIS, "in", [0], "mix", "in", [0]).unwrap();
        root.connect_audio_ports("mix", "out", THIS, "out").unwrap();

        let err = flatten(&root).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnconnectedInput {
                component: "root.mix".to_string(),
                port: "in".to_string(),
                channel: Some(1),
            }
        );
    }

    #[test]
    fn unconnected_through_composite_boundary() {
        let mut inner = CompositeComponent::new("inner");
        inner.ports_mut().audio_input::<f32>("in", 1).unwrap();
        inner.add_child(passthrough("leaf", 1)).unwrap();
        inner.connect_audio_ports(THIS, "in", "leaf", "in").unwrap();

        let mut root = stereo_root();
        root.add_child(inner).unwrap();

        let err = flatten(&root).unwrap_err();
        assert!(matches!(
            err,
            GraphError::UnconnectedInput { ref component, channel: Some(0), .. }
                if component == "root.inner.leaf"
        ));
    }

    #[test]
    fn double_feed_rejected() {
        let mut root = stereo_root();
        root.add_child(passthrough("a", 2)).unwrap();
        root.connect_audio_ports(THIS, "in", "a", "in").unwrap();
        root.register_audio_connection(THIS, "in", [0], "a", "in", [1]).unwrap();

        let err = flatten(&root).unwrap_err();
        assert!(matches!(
            err,
            GraphError::MultipleProducers { channel: Some(1), .. }
        ));
    }

    #[test]
    fn pass_through_loop_is_cyclic() {
        let mut inner = CompositeComponent::new("loop");
        inner.ports_mut().audio_input::<f32>("in", 1).unwrap();
        inner.ports_mut().audio_output::<f32>("out", 1).unwrap();
        inner.connect_audio_ports(THIS, "in", THIS, "out").unwrap();

        let mut root = stereo_root();
        root.add_child(inner).unwrap();
        root.add_child(passthrough("tap", 1)).unwrap();
        root.connect_audio_ports("loop", "out", "loop", "in").unwrap();
        root.connect_audio_ports("loop", "out", "tap", "in").unwrap();

        assert!(matches!(
            flatten(&root),
            Err(GraphError::CyclicGraph { .. })
        ));
    }

    #[test]
    fn unconnected_playback_is_silence_not_error() {
        let mut root = stereo_root();
        root.add_child(passthrough("a", 1)).unwrap();
        root.register_audio_connection(THIS, "in", [0], "a", "in", [0]).unwrap();
        root.register_audio_connection("a", "out", [0], THIS, "out", [0]).unwrap();

        let flat = flatten(&root).unwrap();
        let to_playback: Vec<_> = flat
            .audio_connections()
            .iter()
            .filter(|c| c.receiver.node == FlatNode::External)
            .collect();
        assert_eq!(to_playback.len(), 1);
        assert_eq!(to_playback[0].receiver.indices.to_vec(), vec![0]);
    }

    struct Level;

    impl Process for Level {
        fn process(&mut self, _ctx: &mut ProcessContext<'_>) -> Result<(), ComponentError> {
            Ok(())
        }
    }

    fn level_sink(name: &str) -> AtomicComponent {
        AtomicComponent::build(name, |ports| {
            ports.parameter_input::<ScalarParameter, DoubleBuffering>(
                "level",
                ParameterConfig::None,
            )?;
            Ok(Level)
        })
        .unwrap()
    }

    #[test]
    fn parameter_instance_per_connection() {
        let mut root = CompositeComponent::new("root");
        root.ports_mut()
            .parameter_input::<ScalarParameter, DoubleBuffering>("level", ParameterConfig::None)
            .unwrap();
        root.add_child(level_sink("a")).unwrap();
        root.add_child(level_sink("b")).unwrap();
        root.register_parameter_connection(THIS, "level", "a", "level").unwrap();
        root.register_parameter_connection(THIS, "level", "b", "level").unwrap();

        let flat = flatten(&root).unwrap();
        let connections = flat.parameter_connections();
        assert_eq!(connections.len(), 2);
        assert_eq!(connections[0].sender.node, FlatNode::External);
        assert!(!std::sync::Arc::ptr_eq(
            &connections[0].instance,
            &connections[1].instance
        ));
    }

    #[test]
    fn unconnected_parameter_input() {
        let mut root = CompositeComponent::new("root");
        root.add_child(level_sink("gain")).unwrap();
        let err = flatten(&root).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnconnectedInput {
                component: "root.gain".to_string(),
                port: "level".to_string(),
                channel: None,
            }
        );
    }

    #[test]
    fn missing_registry_entry() {
        let mut root = CompositeComponent::new("root");
        root.ports_mut()
            .parameter_input::<ScalarParameter, MessageQueue>("events", ParameterConfig::None)
            .unwrap();
        root.add_child(
            AtomicComponent::build("sink", |ports| {
                ports.parameter_input::<ScalarParameter, MessageQueue>(
                    "events",
                    ParameterConfig::None,
                )?;
                Ok(Level)
            })
            .unwrap(),
        )
        .unwrap();
        root.register_parameter_connection(THIS, "events", "sink", "events")
            .unwrap();

        let err = GraphFlattener::new(&ParameterRegistry::empty())
            .flatten(&root)
            .unwrap_err();
        assert!(matches!(err, GraphError::UnregisteredParameter { .. }));
    }
}
