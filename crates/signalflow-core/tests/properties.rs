//! Property-based tests for signalflow-core.
//!
//! Channel index set text round trips and range arithmetic, plus determinism
//! of setup and processing under arbitrary child insertion order.

use proptest::prelude::*;
use signalflow_core::{
    AtomicComponent, AudioInput, AudioOutput, ChannelIndexSet, ComponentError,
    CompositeComponent, FlowConfig, ParameterRegistry, Process, ProcessContext, SignalFlow, THIS,
};

const BLOCK: usize = 16;

struct Through {
    input: AudioInput<f32>,
    output: AudioOutput<f32>,
}

impl Process for Through {
    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ComponentError> {
        let input = ctx.inputs.port(&self.input);
        ctx.outputs
            .port(&self.output)
            .channel_mut(0)
            .copy_from_slice(input.channel(0));
        Ok(())
    }
}

fn through(name: &str) -> AtomicComponent {
    AtomicComponent::build(name, |ports| {
        Ok(Through {
            input: ports.audio_input("in", 1)?,
            output: ports.audio_output("out", 1)?,
        })
    })
    .unwrap()
}

/// A chain `stage0 -> stage1 -> ...`, children added in `order`.
fn chain(order: &[usize]) -> SignalFlow {
    let mut root = CompositeComponent::new("root");
    root.ports_mut().audio_input::<f32>("in", 1).unwrap();
    root.ports_mut().audio_output::<f32>("out", 1).unwrap();
    for &stage in order {
        root.add_child(through(&format!("stage{stage}"))).unwrap();
    }
    let last = order.len() - 1;
    root.connect_audio_ports(THIS, "in", "stage0", "in").unwrap();
    for stage in 0..last {
        root.connect_audio_ports(
            &format!("stage{stage}"),
            "out",
            &format!("stage{}", stage + 1),
            "in",
        )
        .unwrap();
    }
    root.connect_audio_ports(&format!("stage{last}"), "out", THIS, "out")
        .unwrap();
    SignalFlow::new(
        root,
        FlowConfig::new(BLOCK, 48_000.0),
        &ParameterRegistry::new(),
    )
    .unwrap()
}

fn permutation() -> impl Strategy<Value = Vec<usize>> {
    (1usize..8).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Display output parses back to the same index sequence.
    #[test]
    fn index_set_text_round_trip(indices in prop::collection::vec(0usize..64, 0..12)) {
        let set = ChannelIndexSet::from_indices(indices.clone());
        let text = set.to_string();
        let parsed: ChannelIndexSet = text.parse().unwrap();
        prop_assert_eq!(parsed.to_vec(), indices, "text form was {:?}", text);
    }

    /// `len`, `get` and `iter` agree with the materialised sequence.
    #[test]
    fn index_set_accessors_agree(indices in prop::collection::vec(0usize..64, 0..12)) {
        let set = ChannelIndexSet::from_indices(indices.clone());
        prop_assert_eq!(set.len(), indices.len());
        prop_assert_eq!(set.iter().len(), indices.len());
        for (position, &index) in indices.iter().enumerate() {
            prop_assert_eq!(set.get(position), Some(index));
        }
        prop_assert_eq!(set.get(indices.len()), None);
        prop_assert_eq!(set.max_index(), indices.iter().copied().max());
    }

    /// Strided ranges stay inside `[start, end)` (or `(end, start]` when
    /// counting down) and move by exactly `step`.
    #[test]
    fn strided_range_arithmetic(
        start in 0usize..64,
        end in 0usize..64,
        step in prop_oneof![-8isize..=-1, 1isize..=8],
    ) {
        let set = ChannelIndexSet::strided(start, end, step).unwrap();
        let indices = set.to_vec();
        for pair in indices.windows(2) {
            prop_assert_eq!(pair[1] as isize - pair[0] as isize, step);
        }
        for &index in &indices {
            if step > 0 {
                prop_assert!(index >= start && index < end);
            } else {
                prop_assert!(index <= start && index > end);
            }
        }
        if let Some(&first) = indices.first() {
            prop_assert_eq!(first, start);
        }
    }

    /// The same chain built in any insertion order schedules identically and
    /// passes the signal through unchanged.
    #[test]
    fn chain_is_order_independent(
        order in permutation(),
        signal in prop::collection::vec(-1.0f32..=1.0, BLOCK),
    ) {
        let sorted: Vec<usize> = (0..order.len()).collect();
        let mut reference = chain(&sorted);
        let mut shuffled = chain(&order);

        let expected: Vec<&str> = reference.schedule().names().collect();
        let actual: Vec<&str> = shuffled.schedule().names().collect();
        prop_assert_eq!(expected, actual);

        let mut out_a = vec![0.0f32; BLOCK];
        let mut out_b = vec![0.0f32; BLOCK];
        reference.process(&[&signal], &mut [&mut out_a]).unwrap();
        shuffled.process(&[&signal], &mut [&mut out_b]).unwrap();
        prop_assert_eq!(&out_a, &signal);
        prop_assert_eq!(out_a, out_b);
    }
}
