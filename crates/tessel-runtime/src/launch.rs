//! Launch descriptors for compiled GPU kernels.
//!
//! A [`KernelLaunch`] carries everything a driver needs to start a kernel:
//! the kernel symbol, its packed arguments, grid and block dimensions and an
//! optional stream. Construction validates the geometry and argument
//! devices; nothing here talks to a driver.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of GPU devices a launch may address.
pub const MAX_CUDA_CARDS: usize = 10;

/// Upper bound on `block.x * block.y * block.z`.
pub const MAX_THREADS_PER_BLOCK: u64 = 1024;

/// Grid or block extent along the three launch axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display("({x}, {y}, {z})")]
pub struct Dim3 {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Dim3 {
    pub const ONE: Dim3 = Dim3 { x: 1, y: 1, z: 1 };

    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Product of the three extents, saturating at `u64::MAX`.
    pub fn volume(self) -> u64 {
        u64::from(self.x)
            .saturating_mul(u64::from(self.y))
            .saturating_mul(u64::from(self.z))
    }

    fn zero_axis(self) -> Option<char> {
        [('x', self.x), ('y', self.y), ('z', self.z)]
            .into_iter()
            .find_map(|(axis, extent)| (extent == 0).then_some(axis))
    }
}

impl Default for Dim3 {
    fn default() -> Self {
        Self::ONE
    }
}

/// Opaque driver stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display("stream#{_0}")]
pub struct StreamHandle(pub u64);

/// Device memory region passed to a kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferHandle {
    pub device: usize,
    pub address: u64,
    pub len: usize,
}

/// One kernel argument: a scalar or a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PodValue {
    Int(i64),
    Float(f64),
    Buffer(BufferHandle),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, Error)]
pub enum LaunchError {
    #[display("{what} dimension `{dim}` is zero")]
    ZeroDimension { what: &'static str, dim: char },

    #[display("block of {threads} threads exceeds the limit of {limit}")]
    TooManyThreads { threads: u64, limit: u64 },

    #[display("argument {index} lives on device {device}, but only {cards} devices are addressable")]
    InvalidDevice {
        index: usize,
        device: usize,
        cards: usize,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfig {
    pub grid: Dim3,
    pub block: Dim3,
    pub stream: Option<StreamHandle>,
}

impl LaunchConfig {
    pub fn new(grid: Dim3, block: Dim3) -> Self {
        Self {
            grid,
            block,
            stream: None,
        }
    }

    pub fn with_stream(mut self, stream: StreamHandle) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Threads launched across the whole grid.
    pub fn total_threads(&self) -> u64 {
        self.grid.volume().saturating_mul(self.block.volume())
    }

    pub fn validate(&self) -> Result<(), LaunchError> {
        for (what, dims) in [("grid", self.grid), ("block", self.block)] {
            if let Some(dim) = dims.zero_axis() {
                return Err(LaunchError::ZeroDimension { what, dim });
            }
        }
        let threads = self.block.volume();
        if threads > MAX_THREADS_PER_BLOCK {
            return Err(LaunchError::TooManyThreads {
                threads,
                limit: MAX_THREADS_PER_BLOCK,
            });
        }
        Ok(())
    }
}

/// A validated kernel launch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KernelLaunch {
    kernel: String,
    args: Vec<PodValue>,
    config: LaunchConfig,
}

impl KernelLaunch {
    pub fn new(
        kernel: impl Into<String>,
        args: Vec<PodValue>,
        config: LaunchConfig,
    ) -> Result<Self, LaunchError> {
        config.validate()?;
        for (index, arg) in args.iter().enumerate() {
            if let PodValue::Buffer(buffer) = arg
                && buffer.device >= MAX_CUDA_CARDS
            {
                return Err(LaunchError::InvalidDevice {
                    index,
                    device: buffer.device,
                    cards: MAX_CUDA_CARDS,
                });
            }
        }
        let kernel = kernel.into();
        debug!(
            kernel = %kernel,
            grid = %config.grid,
            block = %config.block,
            args = args.len(),
            stream = ?config.stream,
            "prepared kernel launch"
        );
        Ok(Self {
            kernel,
            args,
            config,
        })
    }

    pub fn kernel(&self) -> &str {
        &self.kernel
    }

    pub fn args(&self) -> &[PodValue] {
        &self.args
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }
}
