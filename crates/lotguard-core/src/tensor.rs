use crate::dtype::Float;
use crate::error::{TensorError, TensorResult};
use crate::shape::Shape;

use serde::{Deserialize, Serialize};

/// Dense row-major tensor holding feature matrices `[samples, features]`
/// and label / probability vectors `[samples]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct Tensor<T: Float> {
    data: Vec<T>,
    shape: Shape,
}

// ─── Construction ───────────────────────────────────────────────────────────

impl<T: Float> Tensor<T> {
    pub fn new(data: Vec<T>, shape: Vec<usize>) -> TensorResult<Self> {
        let shape = Shape::new(shape);
        if data.len() != shape.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: shape.to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Tensor { data, shape })
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        let shape = Shape::new(shape);
        Tensor {
            data: vec![T::ZERO; shape.numel()],
            shape,
        }
    }

    /// 1-D tensor copied from a slice.
    pub fn from_slice(data: &[T]) -> Self {
        Tensor {
            data: data.to_vec(),
            shape: Shape::new(vec![data.len()]),
        }
    }

    /// Matrix from rows. Every row must have the same width.
    pub fn from_vec2d(rows: &[Vec<T>]) -> TensorResult<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(TensorError::ShapeMismatch {
                expected: vec![cols],
                got: vec![bad.len()],
            });
        }
        Tensor::new(rows.concat(), vec![rows.len(), cols])
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn shape_vec(&self) -> Vec<usize> {
        self.shape.to_vec()
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Rows of a matrix, or elements of a vector.
    pub fn nrows(&self) -> usize {
        self.shape.dims().first().copied().unwrap_or(0)
    }

    /// Columns of a matrix; 1 for vectors.
    pub fn ncols(&self) -> usize {
        self.shape.dims().get(1).copied().unwrap_or(1)
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    fn matrix_dims(&self, op: &str) -> TensorResult<(usize, usize)> {
        match self.shape.dims() {
            &[rows, cols] => Ok((rows, cols)),
            _ => Err(TensorError::InvalidOperation(format!(
                "{op}() needs a matrix, got shape {}",
                self.shape
            ))),
        }
    }

    /// Row `i` of a matrix.
    pub fn row(&self, i: usize) -> TensorResult<&[T]> {
        let (rows, cols) = self.matrix_dims("row")?;
        if i >= rows {
            return Err(TensorError::IndexOutOfBounds { index: i, axis: 0, size: rows });
        }
        Ok(&self.data[i * cols..(i + 1) * cols])
    }

    /// Column `j` of a matrix, copied into a vector.
    pub fn col(&self, j: usize) -> TensorResult<Tensor<T>> {
        let (_, cols) = self.matrix_dims("col")?;
        if j >= cols {
            return Err(TensorError::IndexOutOfBounds { index: j, axis: 1, size: cols });
        }
        let data: Vec<T> = self.data.chunks(cols).map(|r| r[j]).collect();
        Ok(Tensor::from_slice(&data))
    }

    /// Gather rows (of a matrix) or elements (of a vector) in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> TensorResult<Tensor<T>> {
        let rows = self.nrows();
        let width = self.ncols();
        let mut data = Vec::with_capacity(indices.len() * width);
        for &i in indices {
            if i >= rows {
                return Err(TensorError::IndexOutOfBounds { index: i, axis: 0, size: rows });
            }
            data.extend_from_slice(&self.data[i * width..(i + 1) * width]);
        }
        let mut shape = self.shape_vec();
        shape[0] = indices.len();
        Tensor::new(data, shape)
    }

    /// Insert an axis of length 1.
    pub fn unsqueeze(&self, axis: usize) -> TensorResult<Tensor<T>> {
        if axis > self.ndim() {
            return Err(TensorError::InvalidAxis { axis, ndim: self.ndim() });
        }
        let mut dims = self.shape_vec();
        dims.insert(axis, 1);
        Ok(Tensor {
            data: self.data.clone(),
            shape: Shape::new(dims),
        })
    }

    // ─── Element-wise ───────────────────────────────────────────────────────

    pub fn apply<F: Fn(T) -> T>(&self, f: F) -> Tensor<T> {
        Tensor {
            data: self.data.iter().map(|&x| f(x)).collect(),
            shape: self.shape.clone(),
        }
    }

    fn zip_with<F: Fn(T, T) -> T>(&self, other: &Tensor<T>, op: F) -> TensorResult<Tensor<T>> {
        if self.shape == other.shape {
            let data = self.data.iter().zip(&other.data).map(|(&a, &b)| op(a, b)).collect();
            return Ok(Tensor { data, shape: self.shape.clone() });
        }

        let shape = Shape::broadcast_shape(&self.shape, &other.shape)?;
        let strides = shape.strides();
        let lhs = BroadcastIndex::new(&self.shape, shape.ndim());
        let rhs = BroadcastIndex::new(&other.shape, shape.ndim());
        let data = (0..shape.numel())
            .map(|flat| {
                let (mut a, mut b, mut rest) = (0, 0, flat);
                for (d, &stride) in strides.iter().enumerate() {
                    let idx = rest / stride;
                    rest %= stride;
                    a += lhs.offset(d, idx);
                    b += rhs.offset(d, idx);
                }
                op(self.data[a], other.data[b])
            })
            .collect();
        Ok(Tensor { data, shape })
    }

    /// Broadcasting subtraction.
    pub fn sub(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        self.zip_with(other, |a, b| a - b)
    }

    /// Broadcasting division.
    pub fn div(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        self.zip_with(other, |a, b| a / b)
    }

    // ─── Reductions ─────────────────────────────────────────────────────────

    /// Sum along `axis`, dropping that axis.
    fn sum_axis(&self, axis: usize) -> TensorResult<Tensor<T>> {
        let len = self.shape.dim(axis)?;
        let dims = self.shape.dims();
        let inner: usize = dims[axis + 1..].iter().product();
        let outer: usize = dims[..axis].iter().product();

        let mut out = vec![T::ZERO; outer * inner];
        for (k, &v) in self.data.iter().enumerate() {
            let o = k / (len * inner);
            let i = k % inner;
            out[o * inner + i] = out[o * inner + i] + v;
        }

        let mut kept = dims.to_vec();
        kept.remove(axis);
        if kept.is_empty() {
            kept.push(1);
        }
        Tensor::new(out, kept)
    }

    pub fn mean_axis(&self, axis: usize) -> TensorResult<Tensor<T>> {
        let n = self.shape.dim(axis)?;
        if n == 0 {
            return Err(TensorError::InvalidOperation("mean over an empty axis".to_string()));
        }
        let count = T::from_usize(n);
        Ok(self.sum_axis(axis)?.apply(|s| s / count))
    }

    /// Population variance (ddof = 0).
    pub fn var_axis(&self, axis: usize) -> TensorResult<Tensor<T>> {
        let count = T::from_usize(self.shape.dim(axis)?);
        let centered = self.sub(&self.mean_axis(axis)?.unsqueeze(axis)?)?;
        Ok(centered.apply(|d| d * d).sum_axis(axis)?.apply(|s| s / count))
    }

    pub fn std_axis(&self, axis: usize) -> TensorResult<Tensor<T>> {
        Ok(self.var_axis(axis)?.apply(T::sqrt))
    }
}

/// Offset of a broadcast operand for one output coordinate.
struct BroadcastIndex {
    pad: usize,
    dims: Vec<usize>,
    strides: Vec<usize>,
}

impl BroadcastIndex {
    fn new(shape: &Shape, out_ndim: usize) -> Self {
        BroadcastIndex {
            pad: out_ndim - shape.ndim(),
            dims: shape.to_vec(),
            strides: shape.strides(),
        }
    }

    fn offset(&self, d: usize, idx: usize) -> usize {
        match d.checked_sub(self.pad) {
            Some(d) if self.dims[d] > 1 => idx * self.strides[d],
            _ => 0,
        }
    }
}
