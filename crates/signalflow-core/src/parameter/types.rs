//! Built-in parameter types.

use super::{Parameter, ParameterConfig, ParameterType};

/// A single `f32` value (gain, frequency, mix).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScalarParameter(pub f32);

impl Parameter for ScalarParameter {
    const TYPE: ParameterType = ParameterType::new("scalar");

    fn from_config(_config: &ParameterConfig) -> Self {
        Self(0.0)
    }
}

/// A fixed-size vector of `f32` values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorParameter(pub Vec<f32>);

impl Parameter for VectorParameter {
    const TYPE: ParameterType = ParameterType::new("vector");

    fn from_config(config: &ParameterConfig) -> Self {
        match config {
            ParameterConfig::Vector { size } => Self(vec![0.0; *size]),
            _ => Self(Vec::new()),
        }
    }
}

/// A dense row-major `f32` matrix, e.g. a decoder or panning matrix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatrixParameter {
    rows: usize,
    columns: usize,
    data: Vec<f32>,
}

impl MatrixParameter {
    /// Zero matrix of the given shape.
    pub fn zeros(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            data: vec![0.0; rows * columns],
        }
    }

    /// Identity matrix (ones on the main diagonal).
    pub fn identity(rows: usize, columns: usize) -> Self {
        let mut matrix = Self::zeros(rows, columns);
        for i in 0..rows.min(columns) {
            matrix.data[i * columns + i] = 1.0;
        }
        matrix
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Element at (`row`, `column`); `None` outside the matrix.
    pub fn get(&self, row: usize, column: usize) -> Option<f32> {
        (row < self.rows && column < self.columns).then(|| self.data[row * self.columns + column])
    }

    /// Sets the element at (`row`, `column`). Out-of-range writes are ignored.
    pub fn set(&mut self, row: usize, column: usize, value: f32) {
        if row < self.rows && column < self.columns {
            self.data[row * self.columns + column] = value;
        }
    }

    /// One row as a slice.
    pub fn row(&self, row: usize) -> &[f32] {
        let start = row * self.columns;
        &self.data[start..start + self.columns]
    }

    /// All elements in row-major order.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

impl Parameter for MatrixParameter {
    const TYPE: ParameterType = ParameterType::new("matrix");

    fn from_config(config: &ParameterConfig) -> Self {
        match config {
            ParameterConfig::Matrix { rows, columns } => Self::zeros(*rows, *columns),
            _ => Self::default(),
        }
    }
}

/// A text value with a capacity reserved up front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringParameter(String);

impl StringParameter {
    /// The current text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Replaces the text, reusing the existing allocation when it fits.
    pub fn set(&mut self, text: &str) {
        self.0.clear();
        self.0.push_str(text);
    }
}

impl From<&str> for StringParameter {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl Parameter for StringParameter {
    const TYPE: ParameterType = ParameterType::new("string");

    fn from_config(config: &ParameterConfig) -> Self {
        match config {
            ParameterConfig::String { max_length } => Self(String::with_capacity(*max_length)),
            _ => Self::default(),
        }
    }
}

/// Listener position and orientation for spatial renderers.
///
/// Position in metres, orientation in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ListenerPosition {
    /// Position along x.
    pub x: f32,
    /// Position along y.
    pub y: f32,
    /// Position along z.
    pub z: f32,
    /// Rotation about the vertical axis.
    pub yaw: f32,
    /// Rotation about the lateral axis.
    pub pitch: f32,
    /// Rotation about the frontal axis.
    pub roll: f32,
}

impl Parameter for ListenerPosition {
    const TYPE: ParameterType = ParameterType::new("listener_position");

    fn from_config(_config: &ParameterConfig) -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_config() {
        let v = VectorParameter::from_config(&ParameterConfig::Vector { size: 4 });
        assert_eq!(v.0, vec![0.0; 4]);

        let m = MatrixParameter::from_config(&ParameterConfig::Matrix {
            rows: 2,
            columns: 3,
        });
        assert_eq!((m.rows(), m.columns()), (2, 3));
        assert!(m.as_slice().iter().all(|&x| x == 0.0));

        let s = StringParameter::from_config(&ParameterConfig::String { max_length: 32 });
        assert!(s.as_str().is_empty());
        assert!(s.0.capacity() >= 32);
    }

    #[test]
    fn matrix_access() {
        let mut m = MatrixParameter::identity(2, 2);
        assert_eq!(m.get(1, 1), Some(1.0));
        assert_eq!(m.get(0, 1), Some(0.0));
        assert_eq!(m.get(2, 0), None);
        m.set(0, 1, 0.5);
        assert_eq!(m.row(0), &[1.0, 0.5]);
    }

    #[test]
    fn string_set_reuses_capacity() {
        let mut s = StringParameter::from_config(&ParameterConfig::String { max_length: 64 });
        let before = s.0.capacity();
        s.set("front left");
        assert_eq!(s.as_str(), "front left");
        assert_eq!(s.0.capacity(), before);
    }

    #[test]
    fn type_tags_are_distinct() {
        let tags = [
            ScalarParameter::TYPE,
            VectorParameter::TYPE,
            MatrixParameter::TYPE,
            StringParameter::TYPE,
            ListenerPosition::TYPE,
        ];
        for (i, a) in tags.iter().enumerate() {
            for b in &tags[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
