//! CPU backend for nd_tensor.
//!
//! Provides [`CpuCrossKernel`], a strided cross-product kernel for `f32` and
//! `f64`, and [`register`] to install it for [`Device::Cpu`].

use std::sync::Arc;

use nd_tensor::prelude::*;
use nd_tensor::register_cross_kernel;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

mod config;

pub use config::CpuConfig;

/// Register the CPU kernel with the default configuration.
///
/// Returns `false` if a CPU kernel was already registered.
pub fn register() -> bool {
    register_with(CpuConfig::default())
}

/// Register the CPU kernel with `config`.
pub fn register_with(config: CpuConfig) -> bool {
    register_cross_kernel(Device::Cpu, Arc::new(CpuCrossKernel::new(config)))
}

/// Cross product on host memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuCrossKernel {
    config: CpuConfig,
}

impl CpuCrossKernel {
    pub fn new(config: CpuConfig) -> Self {
        CpuCrossKernel { config }
    }

    fn cross_typed<T: Element>(
        &self,
        out: &mut Tensor,
        input: &Tensor,
        other: &Tensor,
        dim: usize,
    ) -> Result<()> {
        let lanes = Lanes::new(out, input, other, dim);
        let a = input.as_slice::<T>()?;
        let b = other.as_slice::<T>()?;
        let o = out.as_mut_slice::<T>()?;

        if self.config.is_parallel(lanes.len()) {
            lanes.run_parallel(a, b, o);
        } else {
            lanes.run(a, b, o);
        }
        Ok(())
    }
}

impl CrossKernel for CpuCrossKernel {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn cross(&self, out: &mut Tensor, input: &Tensor, other: &Tensor, dim: usize) -> Result<()> {
        match out.dtype() {
            DType::F32 => self.cross_typed::<f32>(out, input, other, dim),
            DType::F64 => self.cross_typed::<f64>(out, input, other, dim),
        }
    }
}

/// Storage offsets of every lane of the three operands.
struct Lanes {
    a: Vec<usize>,
    b: Vec<usize>,
    out: Vec<usize>,
    a_stride: usize,
    b_stride: usize,
    out_stride: usize,
}

impl Lanes {
    fn new(out: &Tensor, input: &Tensor, other: &Tensor, dim: usize) -> Self {
        let (la, lb, lo) = (input.layout(), other.layout(), out.layout());
        Lanes {
            a: la.lane_offsets(dim),
            b: lb.lane_offsets(dim),
            out: lo.lane_offsets(dim),
            a_stride: la.stride(dim),
            b_stride: lb.stride(dim),
            out_stride: lo.stride(dim),
        }
    }

    fn len(&self) -> usize {
        self.out.len()
    }

    #[inline]
    fn compute<T: Element>(&self, a: &[T], b: &[T], lane: usize) -> [T; 3] {
        cross3(
            load3(a, self.a[lane], self.a_stride),
            load3(b, self.b[lane], self.b_stride),
        )
    }

    #[inline]
    fn store<T: Element>(&self, o: &mut [T], lane: usize, v: [T; 3]) {
        let base = self.out[lane];
        o[base] = v[0];
        o[base + self.out_stride] = v[1];
        o[base + 2 * self.out_stride] = v[2];
    }

    fn run<T: Element>(&self, a: &[T], b: &[T], o: &mut [T]) {
        for lane in 0..self.len() {
            let v = self.compute(a, b, lane);
            self.store(o, lane, v);
        }
    }

    /// Compute lanes on the rayon pool, then scatter serially. Output lanes
    /// can interleave in storage, so the scatter stays single-threaded.
    #[cfg(feature = "parallel")]
    fn run_parallel<T: Element>(&self, a: &[T], b: &[T], o: &mut [T]) {
        log::trace!("cpu cross: {} lanes on {} threads", self.len(), rayon::current_num_threads());
        let values: Vec<[T; 3]> = (0..self.len())
            .into_par_iter()
            .map(|lane| self.compute(a, b, lane))
            .collect();
        for (lane, v) in values.into_iter().enumerate() {
            self.store(o, lane, v);
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn run_parallel<T: Element>(&self, a: &[T], b: &[T], o: &mut [T]) {
        self.run(a, b, o);
    }
}

#[inline]
fn load3<T: Copy>(data: &[T], base: usize, stride: usize) -> [T; 3] {
    [data[base], data[base + stride], data[base + 2 * stride]]
}

/// `a × b` for a single pair of 3-vectors.
#[inline]
pub fn cross3<T: Element>(a: [T; 3], b: [T; 3]) -> [T; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use nd_tensor::{prepare, Strides, TensorOptions};

    fn t(data: Vec<f32>, shape: Vec<usize>) -> Tensor {
        Tensor::from_vec(data, shape).unwrap()
    }

    /// Run the kernel directly on prepared operands.
    fn run(kernel: &CpuCrossKernel, a: &Tensor, b: &Tensor, dim: i64, out: &mut Tensor) {
        let p = prepare(a, b, Some(dim)).unwrap();
        if out.shape() != &p.out_shape {
            out.resize_(&p.out_shape);
        }
        kernel.cross(out, &p.input, &p.other, p.dim).unwrap();
    }

    #[test]
    fn test_cross3() {
        assert_eq!(cross3([1.0f32, 0.0, 0.0], [0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
        assert_eq!(cross3([1.0f64, 2.0, 3.0], [4.0, 5.0, 6.0]), [-3.0, 6.0, -3.0]);
    }

    #[test]
    fn test_kernel_leading_axis() {
        // Vectors laid out along dim 0 of a [3, 2] tensor: columns are vectors
        let a = t(vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0], vec![3, 2]);
        let b = t(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0], vec![3, 2]);
        let mut out = Tensor::empty(vec![3, 2], a.options());
        run(&CpuCrossKernel::default(), &a, &b, 0, &mut out);
        // col 0: (1,0,0)x(0,1,0) = (0,0,1); col 1: (0,1,0)x(0,0,1) = (1,0,0)
        assert_eq!(
            out.to_vec::<f32>().unwrap(),
            vec![0.0, 1.0, 0.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn test_kernel_reads_broadcast_view() {
        let a = t(vec![1.0, 2.0, 3.0], vec![3]);
        let b = t(vec![4.0, 5.0, 6.0, 1.0, 2.0, 3.0], vec![2, 3]);
        let mut out = Tensor::empty(vec![2, 3], a.options());
        run(&CpuCrossKernel::default(), &a, &b, 1, &mut out);
        assert_eq!(
            out.to_vec::<f32>().unwrap(),
            vec![-3.0, 6.0, -3.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_kernel_writes_strided_output() {
        let a = t(vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0], vec![2, 3]);
        let b = t(vec![0.0, 1.0, 0.0, 0.0, 0.0, 1.0], vec![2, 3]);
        // Column-major [2, 3] output: strides [1, 2]
        let mut out = Tensor::empty(vec![3, 2], a.options())
            .transpose(0, 1)
            .unwrap();
        assert_eq!(out.strides(), &Strides::new(vec![1, 2]));

        let p = prepare(&a, &b, Some(1)).unwrap();
        CpuCrossKernel::default()
            .cross(&mut out, &p.input, &p.other, p.dim)
            .unwrap();
        assert_eq!(
            out.to_vec::<f32>().unwrap(),
            vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0]
        );
        assert_eq!(
            out.as_slice::<f32>().unwrap(),
            &[0.0, 1.0, 0.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn test_kernel_f64() {
        let a = Tensor::from_vec(vec![0.0f64, 0.0, 2.0], vec![3]).unwrap();
        let b = Tensor::from_vec(vec![3.0f64, 0.0, 0.0], vec![3]).unwrap();
        let mut out = Tensor::empty(vec![3], TensorOptions::default().with_dtype(DType::F64));
        run(&CpuCrossKernel::default(), &a, &b, 0, &mut out);
        assert_eq!(out.to_vec::<f64>().unwrap(), vec![0.0, 6.0, 0.0]);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let n = 257;
        let a: Vec<f32> = (0..n * 3).map(|i| (i % 7) as f32 - 3.0).collect();
        let b: Vec<f32> = (0..n * 3).map(|i| (i % 5) as f32 * 0.5).collect();
        let a = t(a, vec![n, 3]);
        let b = t(b, vec![n, 3]);

        let mut serial = Tensor::empty(vec![n, 3], a.options());
        run(&CpuCrossKernel::new(CpuConfig::serial()), &a, &b, 1, &mut serial);

        let mut parallel = Tensor::empty(vec![n, 3], a.options());
        let eager = CpuCrossKernel::new(CpuConfig::new().with_parallel_threshold(1));
        run(&eager, &a, &b, 1, &mut parallel);

        assert_eq!(serial.to_vec::<f32>().unwrap(), parallel.to_vec::<f32>().unwrap());
    }
}
