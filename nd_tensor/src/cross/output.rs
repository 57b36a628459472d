//! Output buffer policy: allocate, resize with a warning, or reuse.

use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::tensor::Tensor;

/// What to do with a caller-supplied output before the kernel runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPlan {
    /// Output holds no elements; give it the target shape silently.
    Allocate,
    /// Output holds data of the wrong shape; resize it and warn that the
    /// previous contents are discarded.
    ResizeWithWarning,
    /// Output already has the target shape; write into it as is.
    Reuse,
}

impl OutputPlan {
    pub fn decide(out: &Tensor, target: &Shape) -> Self {
        if out.shape() == target {
            OutputPlan::Reuse
        } else if out.is_empty() {
            OutputPlan::Allocate
        } else {
            OutputPlan::ResizeWithWarning
        }
    }

    /// Check that the plan can be carried out without the kernel writing two
    /// lanes to the same element. Only reused outputs keep their strides.
    pub fn check(self, out: &Tensor) -> Result<()> {
        if self == OutputPlan::Reuse && out.layout().has_internal_overlap() {
            return Err(TensorError::InternalOverlap {
                shape: out.shape().clone(),
                strides: out.strides().clone(),
            });
        }
        Ok(())
    }

    /// Bring `out` to `target`. Leaves the storage untouched for `Reuse`.
    pub fn apply(self, out: &mut Tensor, target: &Shape) {
        match self {
            OutputPlan::Reuse => {}
            OutputPlan::Allocate => out.resize_(target),
            OutputPlan::ResizeWithWarning => {
                log::warn!(
                    "An output with {} elements was resized from shape {} to {}; its previous \
                     contents are discarded. Pass an empty tensor or one of the required shape \
                     to avoid this warning.",
                    out.numel(),
                    out.shape(),
                    target
                );
                out.resize_(target);
            }
        }
        log::trace!("output plan {:?} -> {}", self, target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::TensorOptions;
    use crate::shape::Strides;

    fn zeros(shape: Vec<usize>) -> Tensor {
        Tensor::empty(shape, TensorOptions::default())
    }

    #[test]
    fn test_decide() {
        let target = Shape::new(vec![4, 3]);
        assert_eq!(OutputPlan::decide(&zeros(vec![0]), &target), OutputPlan::Allocate);
        assert_eq!(
            OutputPlan::decide(&zeros(vec![2, 3]), &target),
            OutputPlan::ResizeWithWarning
        );
        assert_eq!(OutputPlan::decide(&zeros(vec![4, 3]), &target), OutputPlan::Reuse);
    }

    #[test]
    fn test_decide_empty_target_is_reused() {
        let target = Shape::new(vec![0, 3]);
        assert_eq!(OutputPlan::decide(&zeros(vec![0, 3]), &target), OutputPlan::Reuse);
        assert_eq!(OutputPlan::decide(&zeros(vec![0]), &target), OutputPlan::Allocate);
    }

    #[test]
    fn test_reuse_leaves_storage_alone() {
        let mut out = zeros(vec![4, 3]);
        let ptr = out.data_ptr();
        OutputPlan::Reuse.apply(&mut out, &Shape::new(vec![4, 3]));
        assert_eq!(out.data_ptr(), ptr);
    }

    #[test]
    fn test_allocate_and_resize_reach_target() {
        let target = Shape::new(vec![2, 3]);

        let mut out = zeros(vec![0]);
        OutputPlan::Allocate.apply(&mut out, &target);
        assert_eq!(out.shape(), &target);
        assert!(out.is_contiguous());

        let mut out = zeros(vec![5]);
        OutputPlan::ResizeWithWarning.apply(&mut out, &target);
        assert_eq!(out.shape(), &target);
        assert_eq!(out.numel(), 6);
    }

    #[test]
    fn test_check_rejects_overlapping_reuse() {
        let out = zeros(vec![3]).expand(&Shape::new(vec![2, 3])).unwrap();
        let plan = OutputPlan::decide(&out, &Shape::new(vec![2, 3]));
        assert_eq!(plan, OutputPlan::Reuse);
        assert_eq!(
            plan.check(&out).unwrap_err(),
            TensorError::InternalOverlap {
                shape: Shape::new(vec![2, 3]),
                strides: Strides::new(vec![0, 1])
            }
        );

        // A resized output gets fresh contiguous strides, so overlap is fine
        assert!(OutputPlan::ResizeWithWarning.check(&out).is_ok());
    }
}
