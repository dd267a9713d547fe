//! Handles for parameters that cross the graph boundary.
//!
//! Parameter ports declared on the root composite connect the graph to other
//! threads: a network or control thread feeds a root parameter input through a
//! [`ParameterProducer`], and reads a root parameter output through a
//! [`ParameterConsumer`].

use core::fmt;
use core::ops::Deref;
use std::sync::Arc;

use crate::parameter::Parameter;
use crate::protocol::{DoubleBuffering, MessageQueue, Protocol};

/// Producer side of a root parameter input.
///
/// Cloneable and `Send`; every clone feeds the same consumers.
pub struct ParameterProducer<T: Parameter, P: Protocol> {
    instances: Arc<[Arc<P::Instance<T>>]>,
}

impl<T: Parameter, P: Protocol> ParameterProducer<T, P> {
    pub(crate) fn new(instances: Vec<Arc<P::Instance<T>>>) -> Self {
        Self {
            instances: instances.into(),
        }
    }

    /// Number of components fed by this port.
    pub fn connections(&self) -> usize {
        self.instances.len()
    }

    /// Visits the protocol instance of every consumer.
    pub fn for_each(&self, f: impl FnMut(&P::Instance<T>)) {
        self.instances.iter().map(|i| &**i).for_each(f);
    }

    fn send(&self, value: T, mut deliver: impl FnMut(&P::Instance<T>, T)) {
        let Some((last, rest)) = self.instances.split_last() else {
            return;
        };
        for instance in rest {
            deliver(instance, value.clone());
        }
        deliver(last, value);
    }
}

impl<T: Parameter> ParameterProducer<T, MessageQueue> {
    /// Enqueues `value` for every consumer.
    pub fn enqueue(&self, value: T) {
        self.send(value, |queue, value| queue.enqueue(value));
    }
}

impl<T: Parameter> ParameterProducer<T, DoubleBuffering> {
    /// Publishes `value` to every consumer.
    pub fn publish(&self, value: T) {
        self.send(value, |buffer, value| buffer.publish(value));
    }

    /// Publishes a modified copy of each consumer's current value.
    pub fn update(&self, mut f: impl FnMut(&mut T)) {
        for instance in self.instances.iter() {
            instance.update(&mut f);
        }
    }
}

impl<T: Parameter, P: Protocol> Clone for ParameterProducer<T, P> {
    fn clone(&self) -> Self {
        Self {
            instances: Arc::clone(&self.instances),
        }
    }
}

impl<T: Parameter, P: Protocol> fmt::Debug for ParameterProducer<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterProducer")
            .field("parameter_type", &T::TYPE)
            .field("protocol", &P::KIND)
            .field("connections", &self.instances.len())
            .finish()
    }
}

/// Consumer side of a root parameter output.
///
/// Dereferences to the protocol instance (`MessageQueueInstance`,
/// `DoubleBufferingInstance`).
pub struct ParameterConsumer<T: Parameter, P: Protocol> {
    instance: Arc<P::Instance<T>>,
}

impl<T: Parameter, P: Protocol> ParameterConsumer<T, P> {
    pub(crate) fn new(instance: Arc<P::Instance<T>>) -> Self {
        Self { instance }
    }
}

impl<T: Parameter, P: Protocol> Deref for ParameterConsumer<T, P> {
    type Target = P::Instance<T>;

    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}

impl<T: Parameter, P: Protocol> Clone for ParameterConsumer<T, P> {
    fn clone(&self) -> Self {
        Self {
            instance: Arc::clone(&self.instance),
        }
    }
}

impl<T: Parameter, P: Protocol> fmt::Debug for ParameterConsumer<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterConsumer")
            .field("parameter_type", &T::TYPE)
            .field("protocol", &P::KIND)
            .finish()
    }
}
