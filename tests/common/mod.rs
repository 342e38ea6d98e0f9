//! Shared kernel builders for integration tests.

use tessel::ir::{Expr, MemoryType, ScalarType, Tensor, TensorRegistry, read_cache_name};

/// Registry for a kernel reading `A` and `B` through caches and writing `C`.
///
/// `A_read_cache` lives in thread-local memory, `B_read_cache` in block-shared
/// memory.
#[allow(dead_code)]
pub fn cached_registry() -> TensorRegistry {
    let tensor = |name: &str, memory| {
        Tensor::new(
            name,
            vec![Expr::int(128), Expr::int(2)],
            ScalarType::Float32,
            memory,
        )
    };
    [
        tensor("A", MemoryType::GpuGlobal),
        tensor("B", MemoryType::GpuGlobal),
        tensor("C", MemoryType::GpuGlobal),
        tensor(&read_cache_name("A"), MemoryType::GpuLocal),
        tensor(&read_cache_name("B"), MemoryType::GpuShared),
    ]
    .into_iter()
    .collect()
}

/// `((blockIdx.x * 32) + threadIdx.x)`
#[allow(dead_code)]
pub fn global_row() -> Expr {
    Expr::add(
        Expr::mul(Expr::var("blockIdx.x"), 32),
        Expr::var("threadIdx.x"),
    )
}
