//! Metal backend implementation.

use std::sync::Arc;

use metal::{Buffer, CommandQueue, ComputePipelineState, Device, MTLResourceOptions, MTLSize};

use nd_backend_cpu::CpuCrossKernel;
use nd_tensor::prelude::*;
use nd_tensor::register_cross_kernel;

/// Metal compute shader for the cross product.
///
/// One thread per lane. Offset tables give element 0 of each lane in the
/// operand's storage; `strides` holds the step along the cross axis for
/// (a, b, out).
const SHADER_SOURCE: &str = r#"
#include <metal_stdlib>
using namespace metal;

kernel void cross_f(device const float* a [[buffer(0)]],
                    device const float* b [[buffer(1)]],
                    device float* out [[buffer(2)]],
                    device const uint* a_base [[buffer(3)]],
                    device const uint* b_base [[buffer(4)]],
                    device const uint* out_base [[buffer(5)]],
                    constant uint3& strides [[buffer(6)]],
                    uint id [[thread_position_in_grid]]) {
    uint ia = a_base[id];
    uint ib = b_base[id];
    uint io = out_base[id];

    float a0 = a[ia];
    float a1 = a[ia + strides.x];
    float a2 = a[ia + 2 * strides.x];
    float b0 = b[ib];
    float b1 = b[ib + strides.y];
    float b2 = b[ib + 2 * strides.y];

    out[io] = a1 * b2 - a2 * b1;
    out[io + strides.z] = a2 * b0 - a0 * b2;
    out[io + 2 * strides.z] = a0 * b1 - a1 * b0;
}
"#;

const KERNEL_NAME: &str = "cross_f";

fn kernel_error(message: impl Into<String>) -> TensorError {
    TensorError::Kernel {
        device: nd_tensor::Device::Metal,
        message: message.into(),
    }
}

/// Register the Metal kernel.
///
/// Returns `false` when no Metal device is available or a Metal kernel was
/// already registered.
pub fn register() -> bool {
    match MetalContext::new() {
        Ok(ctx) => register_cross_kernel(
            nd_tensor::Device::Metal,
            Arc::new(MetalCrossKernel::new(Arc::new(ctx))),
        ),
        Err(err) => {
            log::warn!("Metal backend not registered: {}", err);
            false
        }
    }
}

/// Metal device, queue and compiled cross pipeline.
pub struct MetalContext {
    device: Device,
    command_queue: CommandQueue,
    pipeline: ComputePipelineState,
}

impl MetalContext {
    /// Create a context on the system default device and build the shader.
    pub fn new() -> Result<Self> {
        let device = Device::system_default().ok_or_else(|| kernel_error("no Metal device"))?;
        let command_queue = device.new_command_queue();

        let options = metal::CompileOptions::new();
        let library = device
            .new_library_with_source(SHADER_SOURCE, &options)
            .map_err(kernel_error)?;
        let function = library
            .get_function(KERNEL_NAME, None)
            .map_err(kernel_error)?;
        let pipeline = device
            .new_compute_pipeline_state_with_function(&function)
            .map_err(kernel_error)?;

        Ok(MetalContext {
            device,
            command_queue,
            pipeline,
        })
    }

    fn create_buffer_with_data<T>(&self, data: &[T]) -> Buffer {
        let size_bytes = std::mem::size_of_val(data);
        self.device.new_buffer_with_data(
            data.as_ptr() as *const _,
            size_bytes as u64,
            MTLResourceOptions::StorageModeShared,
        )
    }
}

/// Cross product on the GPU for `f32`; `f64` runs on the host.
#[derive(Clone)]
pub struct MetalCrossKernel {
    context: Arc<MetalContext>,
    host: CpuCrossKernel,
}

impl MetalCrossKernel {
    pub fn new(context: Arc<MetalContext>) -> Self {
        MetalCrossKernel {
            context,
            host: CpuCrossKernel::default(),
        }
    }

    fn cross_f32(&self, out: &mut Tensor, input: &Tensor, other: &Tensor, dim: usize) -> Result<()> {
        let ctx = &self.context;
        let a_base = lane_table(input, dim)?;
        let b_base = lane_table(other, dim)?;
        let o_base = lane_table(out, dim)?;
        let strides: [u32; 4] = [
            to_u32(input.layout().stride(dim))?,
            to_u32(other.layout().stride(dim))?,
            to_u32(out.layout().stride(dim))?,
            0,
        ];
        let lanes = o_base.len();

        let a_buf = ctx.create_buffer_with_data(input.as_slice::<f32>()?);
        let b_buf = ctx.create_buffer_with_data(other.as_slice::<f32>()?);
        // Seeded with current contents: a strided output may own elements
        // that no lane writes.
        let o_buf = ctx.create_buffer_with_data(out.as_slice::<f32>()?);
        let a_base_buf = ctx.create_buffer_with_data(&a_base);
        let b_base_buf = ctx.create_buffer_with_data(&b_base);
        let o_base_buf = ctx.create_buffer_with_data(&o_base);

        let command_buffer = ctx.command_queue.new_command_buffer();
        let encoder = command_buffer.new_compute_command_encoder();

        encoder.set_compute_pipeline_state(&ctx.pipeline);
        encoder.set_buffer(0, Some(&a_buf), 0);
        encoder.set_buffer(1, Some(&b_buf), 0);
        encoder.set_buffer(2, Some(&o_buf), 0);
        encoder.set_buffer(3, Some(&a_base_buf), 0);
        encoder.set_buffer(4, Some(&b_base_buf), 0);
        encoder.set_buffer(5, Some(&o_base_buf), 0);
        encoder.set_bytes(
            6,
            std::mem::size_of_val(&strides) as u64,
            strides.as_ptr() as *const _,
        );

        let thread_group_size = MTLSize::new(256, 1, 1);
        let grid_size = MTLSize::new(lanes as u64, 1, 1);
        encoder.dispatch_threads(grid_size, thread_group_size);
        encoder.end_encoding();

        command_buffer.commit();
        command_buffer.wait_until_completed();

        let dst = out.as_mut_slice::<f32>()?;
        let ptr = o_buf.contents() as *const f32;
        // SAFETY: o_buf was created from a slice of dst.len() f32 values and
        // the command buffer has completed.
        let src = unsafe { std::slice::from_raw_parts(ptr, dst.len()) };
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl CrossKernel for MetalCrossKernel {
    fn name(&self) -> &'static str {
        "metal"
    }

    fn cross(&self, out: &mut Tensor, input: &Tensor, other: &Tensor, dim: usize) -> Result<()> {
        match out.dtype() {
            DType::F32 => self.cross_f32(out, input, other, dim),
            // Metal has no double precision
            DType::F64 => self.host.cross(out, input, other, dim),
        }
    }
}

fn to_u32(v: usize) -> Result<u32> {
    u32::try_from(v).map_err(|_| kernel_error(format!("offset {} exceeds u32 range", v)))
}

fn lane_table(t: &Tensor, dim: usize) -> Result<Vec<u32>> {
    t.layout().lane_offsets(dim).into_iter().map(to_u32).collect()
}
