//! Channel index sets.
//!
//! A [`ChannelIndexSet`] addresses an ordered subset of a port's channels. It is
//! stored either as an arithmetic range (start, step, length) or as an explicit
//! list; ranges never materialise their elements.
//!
//! The text form used by declarative front ends follows the usual
//! `start:end` / `start:step:end` notation with an **inclusive** end, and
//! comma-separated items are concatenated:
//!
//! ```rust
//! use signalflow_core::ChannelIndexSet;
//!
//! let set: ChannelIndexSet = "0:2:6".parse().unwrap();
//! assert_eq!(set.to_vec(), vec![0, 2, 4, 6]);
//!
//! let set: ChannelIndexSet = "3, 0:1".parse().unwrap();
//! assert_eq!(set.to_vec(), vec![3, 0, 1]);
//! ```

use core::fmt;
use core::ops::Range;
use core::str::FromStr;

use crate::error::GraphError;

/// Ordered sequence of channel indices.
///
/// Equality compares the index sequences, not the storage form: the range
/// `0..3` equals the list `[0, 1, 2]`.
#[derive(Clone, Debug)]
pub struct ChannelIndexSet {
    repr: Repr,
}

#[derive(Clone, Debug)]
enum Repr {
    /// `start, start + step, ...` with `len` elements, all non-negative.
    Range { start: usize, step: isize, len: usize },
    List(Vec<usize>),
}

impl ChannelIndexSet {
    /// All channels of a port of the given width: `0, 1, ..., width - 1`.
    pub fn full(width: usize) -> Self {
        Self::from_parts(0, 1, width)
    }

    /// A single channel.
    pub fn single(index: usize) -> Self {
        Self::from_parts(index, 1, 1)
    }

    /// A contiguous ascending range (end exclusive). An inverted range is empty.
    pub fn range(range: Range<usize>) -> Self {
        Self::from_parts(range.start, 1, range.end.saturating_sub(range.start))
    }

    /// A strided range from `start` towards `end` (exclusive).
    ///
    /// A negative `step` counts down. Fails if `step` is zero.
    pub fn strided(start: usize, end: usize, step: isize) -> Result<Self, GraphError> {
        if step == 0 {
            return Err(GraphError::InvalidIndexSet(
                "range step must not be zero".to_string(),
            ));
        }
        let magnitude = step.unsigned_abs();
        let len = if step > 0 {
            end.saturating_sub(start).div_ceil(magnitude)
        } else {
            start.saturating_sub(end).div_ceil(magnitude)
        };
        Ok(Self::from_parts(start, step, len))
    }

    /// Builds a set from explicit indices.
    ///
    /// Arithmetic progressions are stored in range form.
    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        let indices: Vec<usize> = indices.into_iter().collect();
        match indices.as_slice() {
            [] => Self::from_parts(0, 1, 0),
            [only] => Self::single(*only),
            [first, second, rest @ ..] => {
                let step = signed_difference(*first, *second);
                let mut prev = *second;
                let arithmetic = step.is_some_and(|step| step != 0)
                    && rest.iter().all(|&i| {
                        let ok = signed_difference(prev, i) == step;
                        prev = i;
                        ok
                    });
                if let (true, Some(step)) = (arithmetic, step) {
                    Self::from_parts(*first, step, indices.len())
                } else {
                    Self {
                        repr: Repr::List(indices),
                    }
                }
            }
        }
    }

    fn from_parts(start: usize, step: isize, len: usize) -> Self {
        Self {
            repr: Repr::Range { start, step, len },
        }
    }

    /// Number of indices. Computed without materialising ranges.
    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Range { len, .. } => *len,
            Repr::List(list) => list.len(),
        }
    }

    /// Returns true if the set holds no indices.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the set is stored in range form.
    pub fn is_range(&self) -> bool {
        matches!(self.repr, Repr::Range { .. })
    }

    /// Returns the index at `position`, if any.
    pub fn get(&self, position: usize) -> Option<usize> {
        match &self.repr {
            Repr::Range { start, step, len } => {
                if position >= *len {
                    return None;
                }
                let offset = step.unsigned_abs().checked_mul(position)?;
                if *step > 0 {
                    start.checked_add(offset)
                } else {
                    start.checked_sub(offset)
                }
            }
            Repr::List(list) => list.get(position).copied(),
        }
    }

    /// Largest index in the set.
    pub fn max_index(&self) -> Option<usize> {
        match &self.repr {
            Repr::Range { len: 0, .. } => None,
            Repr::Range { start, step, len } => {
                if *step > 0 {
                    self.get(len - 1)
                } else {
                    Some(*start)
                }
            }
            Repr::List(list) => list.iter().copied().max(),
        }
    }

    /// Iterates the indices in order.
    pub fn iter(&self) -> Indices<'_> {
        Indices {
            set: self,
            position: 0,
        }
    }

    /// Collects the indices into a vector.
    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }
}

/// `to - from` as a signed step, if it fits.
fn signed_difference(from: usize, to: usize) -> Option<isize> {
    if to >= from {
        isize::try_from(to - from).ok()
    } else {
        isize::try_from(from - to).ok().map(|d| -d)
    }
}

impl PartialEq for ChannelIndexSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for ChannelIndexSet {}

impl From<Range<usize>> for ChannelIndexSet {
    fn from(range: Range<usize>) -> Self {
        Self::range(range)
    }
}

impl From<Vec<usize>> for ChannelIndexSet {
    fn from(indices: Vec<usize>) -> Self {
        Self::from_indices(indices)
    }
}

impl<const N: usize> From<[usize; N]> for ChannelIndexSet {
    fn from(indices: [usize; N]) -> Self {
        Self::from_indices(indices)
    }
}

impl<'a> IntoIterator for &'a ChannelIndexSet {
    type Item = usize;
    type IntoIter = Indices<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the indices of a [`ChannelIndexSet`].
#[derive(Clone, Debug)]
pub struct Indices<'a> {
    set: &'a ChannelIndexSet,
    position: usize,
}

impl Iterator for Indices<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let index = self.set.get(self.position)?;
        self.position += 1;
        Some(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.set.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Indices<'_> {}

impl fmt::Display for ChannelIndexSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Range { len: 0, .. } => Ok(()),
            Repr::Range { start, len: 1, .. } => write!(f, "{start}"),
            Repr::Range { start, step, len } => {
                let last = self.get(len - 1).unwrap_or(*start);
                if *step == 1 {
                    write!(f, "{start}:{last}")
                } else {
                    write!(f, "{start}:{step}:{last}")
                }
            }
            Repr::List(list) => {
                for (i, index) in list.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{index}")?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for ChannelIndexSet {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::from_parts(0, 1, 0));
        }
        let mut items: Vec<Self> = Vec::new();
        for item in s.split(',') {
            items.push(parse_item(item.trim())?);
        }
        if items.len() == 1 {
            return Ok(items.remove(0));
        }
        Ok(Self::from_indices(items.iter().flat_map(|set| set.iter())))
    }
}

/// Parses one `n`, `a:b` or `a:s:b` item (inclusive end).
fn parse_item(item: &str) -> Result<ChannelIndexSet, GraphError> {
    let invalid = |reason: &str| GraphError::InvalidIndexSet(format!("'{item}': {reason}"));
    let index = |text: &str| {
        text.trim()
            .parse::<usize>()
            .map_err(|_| invalid("expected a non-negative integer"))
    };

    let parts: Vec<&str> = item.split(':').collect();
    match parts.as_slice() {
        [single] => Ok(ChannelIndexSet::single(index(single)?)),
        [first, last] => {
            let (first, last) = (index(first)?, index(last)?);
            if last < first {
                return Err(invalid("end lies before start"));
            }
            let len = (last - first)
                .checked_add(1)
                .ok_or_else(|| invalid("range holds more indices than fit in usize"))?;
            Ok(ChannelIndexSet::from_parts(first, 1, len))
        }
        [first, step, last] => {
            let (first, last) = (index(first)?, index(last)?);
            let step: isize = step
                .trim()
                .parse()
                .map_err(|_| invalid("expected an integer step"))?;
            if step == 0 {
                return Err(invalid("step must not be zero"));
            }
            if (step > 0 && last < first) || (step < 0 && last > first) {
                return Err(invalid("step does not move towards the end"));
            }
            let len = (first.abs_diff(last) / step.unsigned_abs())
                .checked_add(1)
                .ok_or_else(|| invalid("range holds more indices than fit in usize"))?;
            Ok(ChannelIndexSet::from_parts(first, step, len))
        }
        _ => Err(invalid("too many ':' separators")),
    }
}
