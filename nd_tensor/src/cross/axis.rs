//! Default axis selection for the cross product.

use crate::error::{Result, TensorError};
use crate::shape::Shape;

/// Pick the cross-product axis.
///
/// An explicit `dim` is returned as given; it is wrapped later against the
/// broadcast rank. Otherwise the first dimension of extent 3 is used, scanning
/// left to right. A shape such as `[3, 3]` therefore resolves to 0 even
/// though dimension 1 would also qualify.
pub fn resolve_axis(dim: Option<i64>, shape: &[usize]) -> Result<i64> {
    if let Some(dim) = dim {
        return Ok(dim);
    }

    shape
        .iter()
        .position(|&extent| extent == 3)
        .map(|i| i as i64)
        .ok_or_else(|| TensorError::NoSuitableAxis {
            shape: Shape::from(shape),
        })
}
