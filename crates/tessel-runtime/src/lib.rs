//! Host-side runtime types for compiled tessel kernels.

pub mod launch;

pub use launch::{
    BufferHandle, Dim3, KernelLaunch, LaunchConfig, LaunchError, MAX_CUDA_CARDS,
    MAX_THREADS_PER_BLOCK, PodValue, StreamHandle,
};
