//! tessel: rewriting passes for a tensor/loop IR targeting GPUs.
//!
//! The workspace is split the same way the crates are named:
//! - [`ir`]: the expression tree, walkers, printer and tensor registry
//! - [`optim`]: variable substitution, read-cache index elimination, unrolling
//! - [`runtime`]: kernel launch descriptors
//!
//! [`pipeline`] chains the passes for one GPU kernel.

pub mod pipeline;

pub use tessel_ir as ir;
pub use tessel_optim as optim;
pub use tessel_runtime as runtime;

pub use pipeline::{
    PipelineConfig, PipelineError, PipelineStats, infer_launch_config, lower_gpu_kernel,
    lower_gpu_kernel_with_config,
};
