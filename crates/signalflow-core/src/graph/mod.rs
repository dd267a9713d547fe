//! Graph runtime.
//!
//! Setup happens once: the component tree is [flattened](GraphFlattener) into
//! direct connections between atomic components, the atomics are put in a
//! frozen [`ExecutionSchedule`], and every output channel gets a row in the
//! aligned [`CommunicationArea`]. [`SignalFlow`] then runs the schedule once per
//! block.
//!
//! ```text
//! CompositeComponent ──flatten──▶ FlatGraph ──schedule──▶ ExecutionSchedule
//!                                      │                        │
//!                                      └──────rows──────▶ SignalFlow::process
//! ```

pub(crate) mod buffer;
pub(crate) mod context;
mod external;
mod flatten;
mod offline;
mod processing;
mod schedule;

pub use buffer::{CommunicationArea, SampleRows};
pub use context::{
    AudioInputs, AudioOutputs, InputChannels, OutputChannels, OwnRows, ParameterSender,
    Parameters, ProcessContext, RowsView,
};
pub use external::{ParameterConsumer, ParameterProducer};
pub use flatten::{
    FlatAtomic, FlatAudioConnection, FlatAudioEndpoint, FlatGraph, FlatNode,
    FlatParameterConnection, FlatParameterEndpoint, GraphFlattener,
};
pub use processing::{DEFAULT_ALIGNMENT, FlowConfig, SignalFlow};
pub use schedule::ExecutionSchedule;
