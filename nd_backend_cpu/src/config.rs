//! CPU kernel configuration.

/// Tuning knobs for [`CpuCrossKernel`](crate::CpuCrossKernel).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuConfig {
    /// Lane count from which lanes are computed on the rayon pool.
    /// Ignored without the `parallel` feature.
    pub parallel_threshold: usize,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 16_384,
        }
    }
}

impl CpuConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallel_threshold(mut self, lanes: usize) -> Self {
        self.parallel_threshold = lanes;
        self
    }

    /// Never go parallel.
    pub fn serial() -> Self {
        Self::default().with_parallel_threshold(usize::MAX)
    }

    /// Whether `lanes` lanes should be split across threads.
    pub fn is_parallel(&self, lanes: usize) -> bool {
        cfg!(feature = "parallel") && lanes >= self.parallel_threshold
    }
}
