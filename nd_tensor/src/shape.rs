//! Shape, stride and broadcasting utilities for tensors.

use std::fmt;

use crate::error::{Result, TensorError};

/// A tensor shape (dimensions).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Shape(pub Vec<usize>);

impl Shape {
    /// Create a new shape from dimensions.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Get dimension at index.
    pub fn dim(&self, idx: usize) -> usize {
        self.0[idx]
    }

    /// Get dimensions as slice.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Total number of elements. Zero when any dimension is zero.
    pub fn numel(&self) -> usize {
        self.0.iter().product()
    }

    /// Compute row-major (C-contiguous) strides for this shape.
    pub fn contiguous_strides(&self) -> Strides {
        let ndim = self.0.len();
        if ndim == 0 {
            return Strides(vec![]);
        }

        let mut strides = vec![1usize; ndim];
        for i in (0..ndim - 1).rev() {
            strides[i] = strides[i + 1] * self.0[i + 1];
        }
        Strides(strides)
    }

    /// Check if two shapes are broadcast-compatible.
    /// Returns the broadcast result shape if compatible.
    pub fn broadcast_with(&self, other: &Shape) -> Option<Shape> {
        let ndim = self.ndim().max(other.ndim());
        let mut result = vec![0usize; ndim];

        for i in 0..ndim {
            let d1 = if i < ndim - self.ndim() {
                1
            } else {
                self.0[i - (ndim - self.ndim())]
            };
            let d2 = if i < ndim - other.ndim() {
                1
            } else {
                other.0[i - (ndim - other.ndim())]
            };

            if d1 == d2 {
                result[i] = d1;
            } else if d1 == 1 {
                result[i] = d2;
            } else if d2 == 1 {
                result[i] = d1;
            } else {
                return None;
            }
        }

        Some(Shape(result))
    }
}

/// Infer the common shape two tensors broadcast to.
///
/// Shapes are aligned from the trailing dimension; each pair of extents must
/// be equal or contain a 1. Missing leading dimensions count as 1.
pub fn infer_broadcast_shape(a: &Shape, b: &Shape) -> Result<Shape> {
    a.broadcast_with(b).ok_or_else(|| TensorError::ShapeMismatch {
        lhs: a.clone(),
        rhs: b.clone(),
    })
}

/// Map a possibly negative dimension index into `[0, rank)`.
///
/// Negative values count from the end, so `-1` is the last dimension.
pub fn wrap_dim(dim: i64, rank: usize) -> Result<usize> {
    let rank_i = rank as i64;
    let wrapped = if dim < 0 { dim + rank_i } else { dim };
    if wrapped < 0 || wrapped >= rank_i {
        return Err(TensorError::AxisOutOfRange { axis: dim, rank });
    }
    Ok(wrapped as usize)
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.0)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        if self.0.len() == 1 {
            write!(f, ",")?;
        }
        write!(f, ")")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(v: Vec<usize>) -> Self {
        Shape(v)
    }
}

impl From<&[usize]> for Shape {
    fn from(s: &[usize]) -> Self {
        Shape(s.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(s: [usize; N]) -> Self {
        Shape(s.to_vec())
    }
}

/// Tensor strides (step size in each dimension).
///
/// A stride of 0 marks a broadcast dimension: every index along it reads the
/// same element.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Strides(pub Vec<usize>);

impl Strides {
    pub fn new(strides: Vec<usize>) -> Self {
        Strides(strides)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

/// Borrowed view of how a tensor's elements sit in its storage.
#[derive(Clone, Copy, Debug)]
pub struct Layout<'a> {
    pub shape: &'a Shape,
    pub strides: &'a Strides,
    pub offset: usize,
}

impl<'a> Layout<'a> {
    pub fn new(shape: &'a Shape, strides: &'a Strides, offset: usize) -> Self {
        Layout {
            shape,
            strides,
            offset,
        }
    }

    /// Storage step between consecutive elements along `dim`.
    pub fn stride(&self, dim: usize) -> usize {
        self.strides.0[dim]
    }

    /// Storage offset of element 0 of every lane along `dim`.
    ///
    /// A lane is the 1-d run of elements obtained by fixing every index except
    /// `dim`. Lanes are yielded in row-major order over the remaining
    /// dimensions, so two tensors of the same shape produce matching lane
    /// sequences regardless of their strides.
    pub fn lane_offsets(&self, dim: usize) -> Vec<usize> {
        let dims = self.shape.dims();
        let strides = self.strides.as_slice();
        let outer: Vec<usize> = (0..dims.len()).filter(|&d| d != dim).collect();
        let lanes: usize = outer.iter().map(|&d| dims[d]).product();
        if lanes == 0 || dims[dim] == 0 {
            return Vec::new();
        }

        let mut offsets = Vec::with_capacity(lanes);
        let mut index = vec![0usize; outer.len()];
        for _ in 0..lanes {
            let base: usize = outer
                .iter()
                .zip(index.iter())
                .map(|(&d, &i)| i * strides[d])
                .sum();
            offsets.push(self.offset + base);

            // Odometer increment, rightmost dimension first
            for k in (0..outer.len()).rev() {
                index[k] += 1;
                if index[k] < dims[outer[k]] {
                    break;
                }
                index[k] = 0;
            }
        }
        offsets
    }

    /// True when two distinct indices can address the same storage element.
    pub fn has_internal_overlap(&self) -> bool {
        self.shape
            .dims()
            .iter()
            .zip(self.strides.as_slice())
            .any(|(&extent, &stride)| extent > 1 && stride == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_shape_basics() {
        let s = Shape::new(vec![2, 3, 4]);
        assert_eq!(s.ndim(), 3);
        assert_eq!(s.dim(0), 2);
        assert_eq!(s.dim(1), 3);
        assert_eq!(s.dim(2), 4);
        assert_eq!(s.numel(), 24);
    }

    #[test]
    fn test_scalar_and_zero_sized() {
        let s = Shape::new(vec![]);
        assert_eq!(s.ndim(), 0);
        assert_eq!(s.numel(), 1);
        assert!(s.contiguous_strides().as_slice().is_empty());

        assert_eq!(Shape::new(vec![0]).numel(), 0);
        assert_eq!(Shape::new(vec![4, 0, 3]).numel(), 0);
    }

    #[test]
    fn test_contiguous_strides() {
        let s = Shape::new(vec![2, 3, 4]);
        assert_eq!(s.contiguous_strides().0, vec![12, 4, 1]);

        let s2 = Shape::new(vec![3, 4]);
        assert_eq!(s2.contiguous_strides().0, vec![4, 1]);
    }

    #[rstest]
    #[case(vec![2, 3], vec![2, 3], vec![2, 3])]
    #[case(vec![2, 3], vec![], vec![2, 3])]
    #[case(vec![3, 4], vec![2, 3, 4], vec![2, 3, 4])]
    #[case(vec![1, 4], vec![3, 1], vec![3, 4])]
    #[case(vec![3], vec![4, 3], vec![4, 3])]
    #[case(vec![5, 1, 3], vec![2, 3], vec![5, 2, 3])]
    fn test_infer_broadcast_shape(
        #[case] a: Vec<usize>,
        #[case] b: Vec<usize>,
        #[case] expected: Vec<usize>,
    ) {
        let out = infer_broadcast_shape(&Shape::new(a.clone()), &Shape::new(b.clone())).unwrap();
        assert_eq!(out, Shape::new(expected.clone()));
        // Broadcasting is symmetric
        let flipped = infer_broadcast_shape(&Shape::new(b), &Shape::new(a)).unwrap();
        assert_eq!(flipped, Shape::new(expected));
    }

    #[test]
    fn test_broadcast_incompatible() {
        let a = Shape::new(vec![2, 3]);
        let b = Shape::new(vec![2, 4]);
        assert_eq!(a.broadcast_with(&b), None);

        let err = infer_broadcast_shape(&a, &b).unwrap_err();
        assert_eq!(
            err,
            TensorError::ShapeMismatch {
                lhs: a,
                rhs: b
            }
        );
    }

    #[rstest]
    #[case(0, 3, 0)]
    #[case(2, 3, 2)]
    #[case(-1, 3, 2)]
    #[case(-3, 3, 0)]
    fn test_wrap_dim(#[case] dim: i64, #[case] rank: usize, #[case] expected: usize) {
        assert_eq!(wrap_dim(dim, rank).unwrap(), expected);
    }

    #[rstest]
    #[case(3, 3)]
    #[case(-4, 3)]
    #[case(0, 0)]
    #[case(-1, 0)]
    fn test_wrap_dim_out_of_range(#[case] dim: i64, #[case] rank: usize) {
        assert_eq!(
            wrap_dim(dim, rank),
            Err(TensorError::AxisOutOfRange { axis: dim, rank })
        );
    }

    #[test]
    fn test_lane_offsets_last_dim() {
        let shape = Shape::new(vec![2, 3]);
        let strides = shape.contiguous_strides();
        let layout = Layout::new(&shape, &strides, 0);
        assert_eq!(layout.lane_offsets(1), vec![0, 3]);
        assert_eq!(layout.stride(1), 1);
    }

    #[test]
    fn test_lane_offsets_middle_dim() {
        // [2, 3, 2] with lanes along dim 1: fix (i, k)
        let shape = Shape::new(vec![2, 3, 2]);
        let strides = shape.contiguous_strides();
        let layout = Layout::new(&shape, &strides, 0);
        assert_eq!(layout.lane_offsets(1), vec![0, 1, 6, 7]);
        assert_eq!(layout.stride(1), 2);
    }

    #[test]
    fn test_lane_offsets_broadcast_and_offset() {
        // A [3] vector broadcast to [4, 3] starting at storage offset 5
        let shape = Shape::new(vec![4, 3]);
        let strides = Strides::new(vec![0, 1]);
        let layout = Layout::new(&shape, &strides, 5);
        assert_eq!(layout.lane_offsets(1), vec![5, 5, 5, 5]);
        assert!(layout.has_internal_overlap());
    }

    #[test]
    fn test_lane_offsets_empty() {
        let shape = Shape::new(vec![0, 3]);
        let strides = shape.contiguous_strides();
        let layout = Layout::new(&shape, &strides, 0);
        assert!(layout.lane_offsets(1).is_empty());
        assert!(!layout.has_internal_overlap());
    }
}
