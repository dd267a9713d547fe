//! Composite components.
//!
//! A composite owns named children and declares connections between them and
//! its own boundary ports. Declarations are checked locally as they are made
//! (names, widths, directions, sample types); whole-graph properties are
//! checked when the tree is flattened.

use super::connection::{
    AudioConnection, AudioEndpoint, ConnectionRegistry, ParameterConnection, ParameterEndpoint,
    THIS,
};
use super::{AtomicComponent, Component};
use crate::channel::ChannelIndexSet;
use crate::error::GraphError;
use crate::port::{Direction, PortDescriptor, PortKind, PortSet};

/// Interior node of the component tree.
#[derive(Debug)]
pub struct CompositeComponent {
    name: String,
    ports: PortSet,
    children: Vec<Component>,
    connections: ConnectionRegistry,
}

/// Which side of a connection an endpoint is on.
#[derive(Clone, Copy)]
enum Role {
    Sender,
    Receiver,
}

impl CompositeComponent {
    /// Creates an empty composite.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            ports: PortSet::new(name.clone()),
            name,
            children: Vec::new(),
            connections: ConnectionRegistry::default(),
        }
    }

    /// Local name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Boundary ports.
    pub fn ports(&self) -> &PortSet {
        &self.ports
    }

    /// Boundary ports, for registration.
    pub fn ports_mut(&mut self) -> &mut PortSet {
        &mut self.ports
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[Component] {
        &self.children
    }

    /// Child by local name.
    pub fn child(&self, name: &str) -> Option<&Component> {
        self.children.iter().find(|c| c.name() == name)
    }

    /// Declared connections.
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Adds a child.
    ///
    /// # Errors
    ///
    /// [`GraphError::DuplicateName`] if a sibling already uses the name or the
    /// name is the reserved [`THIS`].
    pub fn add_child(&mut self, child: impl Into<Component>) -> Result<(), GraphError> {
        let child = child.into();
        if child.name() == THIS || self.child(child.name()).is_some() {
            return Err(GraphError::DuplicateName {
                scope: self.name.clone(),
                name: child.name().to_string(),
            });
        }
        self.children.push(child);
        Ok(())
    }

    /// Declares an audio connection between channel subsets.
    ///
    /// Sender channel `sender_indices[i]` feeds receiver channel
    /// `receiver_indices[i]`. Either component may be [`THIS`].
    ///
    /// # Errors
    ///
    /// - [`GraphError::UnknownEndpoint`] for an unknown component or port
    /// - [`GraphError::SizeMismatch`] if the index sets differ in length
    /// - [`GraphError::ChannelOutOfRange`] for an index past the port width
    /// - [`GraphError::TypeMismatch`] for a non-audio port, a port facing the
    ///   wrong way or differing sample types
    pub fn register_audio_connection(
        &mut self,
        sender: &str,
        sender_port: &str,
        sender_indices: impl Into<ChannelIndexSet>,
        receiver: &str,
        receiver_port: &str,
        receiver_indices: impl Into<ChannelIndexSet>,
    ) -> Result<(), GraphError> {
        let connection = AudioConnection {
            sender: AudioEndpoint {
                component: sender.to_string(),
                port: sender_port.to_string(),
                indices: sender_indices.into(),
            },
            receiver: AudioEndpoint {
                component: receiver.to_string(),
                port: receiver_port.to_string(),
                indices: receiver_indices.into(),
            },
        };
        self.check_audio(&connection)?;
        self.connections.push_audio(connection);
        Ok(())
    }

    /// Connects every channel of one audio port to the same channel of another.
    ///
    /// # Errors
    ///
    /// As [`register_audio_connection`](Self::register_audio_connection); ports of
    /// different widths fail with [`GraphError::SizeMismatch`].
    pub fn connect_audio_ports(
        &mut self,
        sender: &str,
        sender_port: &str,
        receiver: &str,
        receiver_port: &str,
    ) -> Result<(), GraphError> {
        let sender_width = self.audio_width(sender, sender_port)?;
        let receiver_width = self.audio_width(receiver, receiver_port)?;
        self.register_audio_connection(
            sender,
            sender_port,
            ChannelIndexSet::full(sender_width),
            receiver,
            receiver_port,
            ChannelIndexSet::full(receiver_width),
        )
    }

    /// Declares a parameter connection.
    ///
    /// # Errors
    ///
    /// - [`GraphError::UnknownEndpoint`] for an unknown component or port
    /// - [`GraphError::TypeMismatch`] for a non-parameter port or wrong direction
    /// - [`GraphError::ProtocolMismatch`] if type, configuration or protocol differ
    pub fn register_parameter_connection(
        &mut self,
        sender: &str,
        sender_port: &str,
        receiver: &str,
        receiver_port: &str,
    ) -> Result<(), GraphError> {
        let connection = ParameterConnection {
            sender: ParameterEndpoint {
                component: sender.to_string(),
                port: sender_port.to_string(),
            },
            receiver: ParameterEndpoint {
                component: receiver.to_string(),
                port: receiver_port.to_string(),
            },
        };
        self.check_parameter(&connection)?;
        self.connections.push_parameter(connection);
        Ok(())
    }

    /// Ports visible from inside this composite under `component`.
    fn endpoint_ports(&self, component: &str) -> Option<&PortSet> {
        if component == THIS {
            Some(&self.ports)
        } else {
            self.child(component).map(Component::ports)
        }
    }

    fn lookup(&self, component: &str, port: &str) -> Result<&PortDescriptor, GraphError> {
        let ports = self
            .endpoint_ports(component)
            .ok_or_else(|| GraphError::UnknownEndpoint {
                scope: self.name.clone(),
                endpoint: component.to_string(),
            })?;
        ports
            .find(port)
            .map(|(_, descriptor)| descriptor)
            .ok_or_else(|| GraphError::UnknownEndpoint {
                scope: self.name.clone(),
                endpoint: format!("{component}.{port}"),
            })
    }

    fn audio_width(&self, component: &str, port: &str) -> Result<usize, GraphError> {
        let descriptor = self.lookup(component, port)?;
        descriptor
            .kind()
            .audio_width()
            .ok_or_else(|| GraphError::TypeMismatch {
                sender: format!("{component}.{port}"),
                receiver: format!("{component}.{port}"),
                reason: "not an audio port".to_string(),
            })
    }

    /// Checks that `descriptor` faces the right way for `role`.
    ///
    /// Inside a composite, producers are child outputs and the composite's own
    /// inputs; consumers are child inputs and the composite's own outputs.
    fn check_direction(
        component: &str,
        descriptor: &PortDescriptor,
        role: Role,
    ) -> Result<(), String> {
        let is_this = component == THIS;
        let expected = match (role, is_this) {
            (Role::Sender, false) | (Role::Receiver, true) => Direction::Output,
            (Role::Sender, true) | (Role::Receiver, false) => Direction::Input,
        };
        if descriptor.direction() == expected {
            return Ok(());
        }
        let side = match role {
            Role::Sender => "sender",
            Role::Receiver => "receiver",
        };
        Err(format!(
            "{side} '{component}.{}' is an {} and cannot act as {side} here",
            descriptor.name(),
            descriptor.direction()
        ))
    }

    fn check_audio(&self, connection: &AudioConnection) -> Result<(), GraphError> {
        let sender = &connection.sender;
        let receiver = &connection.receiver;
        let sender_port = self.lookup(&sender.component, &sender.port)?;
        let receiver_port = self.lookup(&receiver.component, &receiver.port)?;

        let mismatch = |reason: String| GraphError::TypeMismatch {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            reason,
        };

        let (
            PortKind::Audio {
                sample_type: sender_type,
                width: sender_width,
            },
            PortKind::Audio {
                sample_type: receiver_type,
                width: receiver_width,
            },
        ) = (sender_port.kind(), receiver_port.kind())
        else {
            return Err(mismatch("audio connection between non-audio ports".to_string()));
        };

        Self::check_direction(&sender.component, sender_port, Role::Sender).map_err(mismatch)?;
        Self::check_direction(&receiver.component, receiver_port, Role::Receiver)
            .map_err(mismatch)?;

        if sender.indices.len() != receiver.indices.len() {
            return Err(GraphError::SizeMismatch {
                scope: self.name.clone(),
                sender: sender.to_string(),
                sender_len: sender.indices.len(),
                receiver: receiver.to_string(),
                receiver_len: receiver.indices.len(),
            });
        }

        for (endpoint, width) in [(sender, *sender_width), (receiver, *receiver_width)] {
            if let Some(channel) = endpoint.indices.max_index()
                && channel >= width
            {
                return Err(GraphError::ChannelOutOfRange {
                    endpoint: format!("{}.{}", endpoint.component, endpoint.port),
                    channel,
                    width,
                });
            }
        }

        if sender_type != receiver_type {
            return Err(mismatch(format!(
                "sample type {sender_type} cannot feed {receiver_type}"
            )));
        }
        Ok(())
    }

    fn check_parameter(&self, connection: &ParameterConnection) -> Result<(), GraphError> {
        let sender = &connection.sender;
        let receiver = &connection.receiver;
        let sender_port = self.lookup(&sender.component, &sender.port)?;
        let receiver_port = self.lookup(&receiver.component, &receiver.port)?;

        let mismatch = |reason: String| GraphError::TypeMismatch {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            reason,
        };
        if sender_port.is_audio() || receiver_port.is_audio() {
            return Err(mismatch(
                "parameter connection between non-parameter ports".to_string(),
            ));
        }
        Self::check_direction(&sender.component, sender_port, Role::Sender).map_err(mismatch)?;
        Self::check_direction(&receiver.component, receiver_port, Role::Receiver)
            .map_err(mismatch)?;

        parameter_compatibility(sender_port.kind(), receiver_port.kind()).map_err(|reason| {
            GraphError::ProtocolMismatch {
                sender: sender.to_string(),
                receiver: receiver.to_string(),
                reason,
            }
        })
    }

    /// Moves the atomic leaves out of the tree in depth-first order.
    pub(crate) fn into_atomics(self, out: &mut Vec<AtomicComponent>) {
        for child in self.children {
            match child {
                Component::Atomic(atomic) => out.push(atomic),
                Component::Composite(composite) => composite.into_atomics(out),
            }
        }
    }
}

/// Compares the parameter type, configuration and protocol of two ports.
pub(crate) fn parameter_compatibility(sender: &PortKind, receiver: &PortKind) -> Result<(), String> {
    let (
        PortKind::Parameter {
            parameter_type: sender_type,
            protocol: sender_protocol,
            config: sender_config,
        },
        PortKind::Parameter {
            parameter_type: receiver_type,
            protocol: receiver_protocol,
            config: receiver_config,
        },
    ) = (sender, receiver)
    else {
        return Err("not a parameter port".to_string());
    };
    if sender_type != receiver_type {
        return Err(format!(
            "parameter type '{sender_type}' cannot feed '{receiver_type}'"
        ));
    }
    if sender_config != receiver_config {
        return Err(format!(
            "configuration {sender_config} differs from {receiver_config}"
        ));
    }
    if sender_protocol != receiver_protocol {
        return Err(format!(
            "protocol {sender_protocol} differs from {receiver_protocol}"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::tests::{passthrough, passthrough_f64};
    use crate::parameter::{ParameterConfig, ScalarParameter, VectorParameter};
    use crate::protocol::{DoubleBuffering, MessageQueue};

    fn two_children() -> CompositeComponent {
        let mut root = CompositeComponent::new("root");
        root.ports_mut().audio_input::<f32>("in", 2).unwrap();
        root.ports_mut().audio_output::<f32>("out", 2).unwrap();
        root.add_child(passthrough("a", 2)).unwrap();
        root.add_child(passthrough("b", 2)).unwrap();
        root
    }

    #[test]
    fn duplicate_child_rejected() {
        let mut root = two_children();
        let err = root.add_child(passthrough("a", 1)).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateName { ref name, .. } if name == "a"));
        let err = root.add_child(passthrough(THIS, 1)).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateName { .. }));
    }

    #[test]
    fn connection_is_recorded() {
        let mut root = two_children();
        root.connect_audio_ports(THIS, "in", "a", "in").unwrap();
        root.register_audio_connection("a", "out", [1, 0], "b", "in", [0, 1])
            .unwrap();
        assert_eq!(root.connections().audio().len(), 2);
        assert_eq!(
            root.connections().audio()[1].sender.indices,
            ChannelIndexSet::from_indices([1, 0])
        );
    }

    #[test]
    fn unknown_endpoints() {
        let mut root = two_children();
        let err = root
            .connect_audio_ports("missing", "out", "a", "in")
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownEndpoint {
                scope: "root".to_string(),
                endpoint: "missing".to_string(),
            }
        );
        let err = root
            .register_audio_connection("a", "nope", 0..1, "b", "in", 0..1)
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownEndpoint { ref endpoint, .. } if endpoint == "a.nope"));
    }

    #[test]
    fn size_mismatch() {
        let mut root = two_children();
        let err = root
            .register_audio_connection("a", "out", 0..2, "b", "in", 0..1)
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::SizeMismatch {
                sender_len: 2,
                receiver_len: 1,
                ..
            }
        ));
    }

    #[test]
    fn channel_out_of_range() {
        let mut root = two_children();
        let err = root
            .register_audio_connection("a", "out", [2], "b", "in", [0])
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::ChannelOutOfRange {
                endpoint: "a.out".to_string(),
                channel: 2,
                width: 2,
            }
        );
    }

    #[test]
    fn wrong_direction_rejected() {
        let mut root = two_children();
        // child input used as a sender
        let err = root.connect_audio_ports("a", "in", "b", "in").unwrap_err();
        assert!(matches!(err, GraphError::TypeMismatch { .. }));
        // composite output used as a sender
        let err = root.connect_audio_ports(THIS, "out", "a", "in").unwrap_err();
        assert!(matches!(err, GraphError::TypeMismatch { .. }));
        // composite input used as a receiver
        let err = root.connect_audio_ports("a", "out", THIS, "in").unwrap_err();
        assert!(matches!(err, GraphError::TypeMismatch { .. }));
    }

    #[test]
    fn sample_type_mismatch() {
        let mut root = two_children();
        root.add_child(passthrough_f64("wide", 2)).unwrap();
        let err = root.connect_audio_ports("a", "out", "wide", "in").unwrap_err();
        assert!(matches!(err, GraphError::TypeMismatch { ref reason, .. } if reason.contains("f32")));
    }

    #[test]
    fn parameter_checks() {
        let mut root = CompositeComponent::new("root");
        root.ports_mut()
            .parameter_input::<ScalarParameter, DoubleBuffering>("gain", ParameterConfig::None)
            .unwrap();
        root.ports_mut()
            .parameter_input::<ScalarParameter, MessageQueue>("events", ParameterConfig::None)
            .unwrap();
        root.ports_mut()
            .parameter_input::<VectorParameter, DoubleBuffering>(
                "weights",
                ParameterConfig::Vector { size: 4 },
            )
            .unwrap();
        root.ports_mut()
            .parameter_output::<ScalarParameter, DoubleBuffering>("gain_out", ParameterConfig::None)
            .unwrap();
        root.ports_mut()
            .parameter_output::<VectorParameter, DoubleBuffering>(
                "weights_out",
                ParameterConfig::Vector { size: 8 },
            )
            .unwrap();

        root.register_parameter_connection(THIS, "gain", THIS, "gain_out")
            .unwrap();

        let err = root
            .register_parameter_connection(THIS, "events", THIS, "gain_out")
            .unwrap_err();
        assert!(matches!(err, GraphError::ProtocolMismatch { ref reason, .. } if reason.contains("protocol")));

        let err = root
            .register_parameter_connection(THIS, "weights", THIS, "weights_out")
            .unwrap_err();
        assert!(matches!(err, GraphError::ProtocolMismatch { ref reason, .. } if reason.contains("configuration")));

        let err = root
            .register_parameter_connection(THIS, "weights", THIS, "gain_out")
            .unwrap_err();
        assert!(matches!(err, GraphError::ProtocolMismatch { ref reason, .. } if reason.contains("type")));
    }
}
