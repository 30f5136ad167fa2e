use crate::error::{TensorError, TensorResult};
use serde::{Deserialize, Serialize};

/// Dimensions of a tensor. LotGuard only builds vectors `[n]` and
/// row-major matrices `[rows, cols]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Size along a specific axis.
    pub fn dim(&self, axis: usize) -> TensorResult<usize> {
        self.dims.get(axis).copied().ok_or(TensorError::InvalidAxis {
            axis,
            ndim: self.ndim(),
        })
    }

    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.dims.clone()
    }

    /// Row-major strides.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1usize; self.dims.len()];
        for i in (0..self.dims.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    /// Resulting shape when broadcasting `a` against `b` (NumPy rules).
    pub fn broadcast_shape(a: &Shape, b: &Shape) -> TensorResult<Shape> {
        let ndim = a.ndim().max(b.ndim());
        let padded = |s: &Shape, i: usize| -> usize {
            if i < ndim - s.ndim() {
                1
            } else {
                s.dims[i - (ndim - s.ndim())]
            }
        };

        let mut out = Vec::with_capacity(ndim);
        for i in 0..ndim {
            let (da, db) = (padded(a, i), padded(b, i));
            let d = match (da, db) {
                _ if da == db => da,
                (1, _) => db,
                (_, 1) => da,
                _ => {
                    return Err(TensorError::BroadcastError {
                        a: a.to_vec(),
                        b: b.to_vec(),
                    })
                }
            };
            out.push(d);
        }
        Ok(Shape::new(out))
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dims: Vec<String> = self.dims.iter().map(|d| d.to_string()).collect();
        write!(f, "({})", dims.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_shape() {
        let s = Shape::new(vec![70, 2]);
        assert_eq!(s.ndim(), 2);
        assert_eq!(s.numel(), 140);
        assert_eq!(s.dim(1).unwrap(), 2);
        assert!(s.dim(2).is_err());
        assert_eq!(s.strides(), vec![2, 1]);
        assert_eq!(s.to_string(), "(70, 2)");
    }

    #[test]
    fn test_broadcast_row_against_matrix() {
        let m = Shape::new(vec![5, 2]);
        let row = Shape::new(vec![1, 2]);
        assert_eq!(Shape::broadcast_shape(&m, &row).unwrap().dims(), &[5, 2]);

        let v = Shape::new(vec![2]);
        assert_eq!(Shape::broadcast_shape(&m, &v).unwrap().dims(), &[5, 2]);
    }

    #[test]
    fn test_broadcast_error() {
        let a = Shape::new(vec![3, 2]);
        let b = Shape::new(vec![3, 3]);
        assert!(Shape::broadcast_shape(&a, &b).is_err());
    }
}
