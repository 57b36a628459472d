//! nd-cross: command-line demo for the broadcasting cross product.
//!
//! Usage:
//!   nd-cross --input <VALUES> --other <VALUES> [OPTIONS]
//!
//! Examples:
//!   nd-cross --input 1,0,0 --other 0,1,0
//!   nd-cross --input 1,2,3 --other 4,5,6,7,8,9 --other-shape 2,3 --dim -1
//!   nd-cross --input 1,2,3,4,5,6 --input-shape 3,2 --other 0,0,1,0,0,1 --other-shape 3,2 --dtype f64

use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use nd_backend_cpu::CpuConfig;
use nd_tensor::prelude::*;

/// Cross product of two broadcastable tensors of 3-vectors.
#[derive(Parser, Debug)]
#[command(name = "nd-cross")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Values of the first operand, row-major
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    input: Vec<f64>,

    /// Shape of the first operand (defaults to a flat vector)
    #[arg(long, value_delimiter = ',')]
    input_shape: Option<Vec<usize>>,

    /// Values of the second operand, row-major
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    other: Vec<f64>,

    /// Shape of the second operand (defaults to a flat vector)
    #[arg(long, value_delimiter = ',')]
    other_shape: Option<Vec<usize>>,

    /// Cross-product axis; negative counts from the end. Inferred when omitted
    #[arg(short, long, allow_negative_numbers = true)]
    dim: Option<i64>,

    /// Element type
    #[arg(long, default_value = "f32")]
    dtype: ElementType,

    /// Lane count from which the CPU kernel runs in parallel
    #[arg(long)]
    parallel_threshold: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ElementType {
    F32,
    F64,
}

fn build(values: &[f64], shape: Option<&[usize]>, dtype: ElementType) -> Result<Tensor> {
    let shape = shape.map(<[usize]>::to_vec).unwrap_or_else(|| vec![values.len()]);
    match dtype {
        ElementType::F32 => {
            let data: Vec<f32> = values.iter().map(|&v| v as f32).collect();
            Tensor::from_vec(data, shape)
        }
        ElementType::F64 => Tensor::from_vec(values.to_vec(), shape),
    }
}

fn values_of(t: &Tensor) -> Result<Vec<f64>> {
    match t.dtype() {
        DType::F32 => Ok(t.to_vec::<f32>()?.into_iter().map(f64::from).collect()),
        DType::F64 => t.to_vec::<f64>(),
    }
}

fn run(args: &Args) -> Result<()> {
    let input = build(&args.input, args.input_shape.as_deref(), args.dtype)?;
    let other = build(&args.other, args.other_shape.as_deref(), args.dtype)?;
    log::info!(
        "input {} x other {} ({}), dim {:?}",
        input.shape(),
        other.shape(),
        input.dtype(),
        args.dim
    );

    let out = cross(&input, &other, args.dim)?;

    println!("shape: {}", out.shape());
    let values = values_of(&out)?;
    let row = out.dims().last().copied().unwrap_or(1).max(1);
    for chunk in values.chunks(row) {
        let line: Vec<String> = chunk.iter().map(|v| format!("{:>10.4}", v)).collect();
        println!("{}", line.join(" "));
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = CpuConfig::default();
    if let Some(lanes) = args.parallel_threshold {
        config = config.with_parallel_threshold(lanes);
    }
    nd_backend_cpu::register_with(config);
    log::debug!("kernels: {:?}", nd_tensor::global_registry());

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
