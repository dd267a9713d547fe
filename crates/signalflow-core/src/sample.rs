//! Audio sample types.
//!
//! The runtime carries two sample formats, `f32` and `f64`. Each has its own
//! row set in the [`CommunicationArea`](crate::CommunicationArea), and typed port
//! handles select the right one at compile time through the sealed [`Sample`]
//! trait.

use core::fmt;

use crate::graph::buffer::{CommunicationArea, SampleRows};
use crate::graph::context::{AudioInputs, AudioOutputs, OwnRows, RowsView};

/// Runtime tag for a sample format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SampleType {
    /// 32-bit IEEE float.
    F32,
    /// 64-bit IEEE float.
    F64,
}

impl SampleType {
    /// Short lowercase name (`"f32"` / `"f64"`).
    pub const fn name(self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A sample format supported by the communication area.
///
/// Implemented for `f32` and `f64` only.
pub trait Sample: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static + sealed::Rows {
    /// Runtime tag of this format.
    const TYPE: SampleType;
}

impl Sample for f32 {
    const TYPE: SampleType = SampleType::F32;
}

impl Sample for f64 {
    const TYPE: SampleType = SampleType::F64;
}

pub(crate) mod sealed {
    use super::{AudioInputs, AudioOutputs, CommunicationArea, OwnRows, RowsView, SampleRows};

    /// Selects the row set belonging to a sample format.
    pub trait Rows: Sized {
        fn area(area: &CommunicationArea) -> &SampleRows<Self>;
        fn area_mut(area: &mut CommunicationArea) -> &mut SampleRows<Self>;
        fn view<'s, 'a>(inputs: &'s AudioInputs<'a>) -> &'s RowsView<'a, Self>;
        fn own<'s, 'a>(outputs: &'s mut AudioOutputs<'a>) -> &'s mut OwnRows<'a, Self>;
    }

    impl Rows for f32 {
        fn area(area: &CommunicationArea) -> &SampleRows<Self> {
            &area.f32
        }

        fn area_mut(area: &mut CommunicationArea) -> &mut SampleRows<Self> {
            &mut area.f32
        }

        fn view<'s, 'a>(inputs: &'s AudioInputs<'a>) -> &'s RowsView<'a, Self> {
            &inputs.f32
        }

        fn own<'s, 'a>(outputs: &'s mut AudioOutputs<'a>) -> &'s mut OwnRows<'a, Self> {
            &mut outputs.f32
        }
    }

    impl Rows for f64 {
        fn area(area: &CommunicationArea) -> &SampleRows<Self> {
            &area.f64
        }

        fn area_mut(area: &mut CommunicationArea) -> &mut SampleRows<Self> {
            &mut area.f64
        }

        fn view<'s, 'a>(inputs: &'s AudioInputs<'a>) -> &'s RowsView<'a, Self> {
            &inputs.f64
        }

        fn own<'s, 'a>(outputs: &'s mut AudioOutputs<'a>) -> &'s mut OwnRows<'a, Self> {
            &mut outputs.f64
        }
    }
}
