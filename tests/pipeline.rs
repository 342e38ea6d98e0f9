mod common;

use common::{cached_registry, global_row};
use insta::assert_snapshot;
use tessel::ir::{Expr, For, ForKind, GpuAxis, TensorRegistry, Var};
use tessel::optim::OptimError;
use tessel::runtime::Dim3;
use tessel::{PipelineConfig, PipelineError, lower_gpu_kernel, lower_gpu_kernel_with_config};

/// Each thread stages two elements of `A` and one of `B` before writing `C`.
fn staged_kernel() -> Expr {
    let stage_a = For::new(
        Var::new("k"),
        0,
        2,
        Expr::store(
            "A_read_cache",
            vec![Expr::var("threadIdx.x"), Expr::var("k")],
            Expr::load("A", vec![global_row(), Expr::var("k")]),
        ),
    )
    .with_kind(ForKind::Unrolled);
    let stage_b = Expr::store(
        "B_read_cache",
        vec![Expr::var("blockIdx.x"), Expr::var("threadIdx.x")],
        Expr::load("B", vec![Expr::var("blockIdx.x"), Expr::var("threadIdx.x")]),
    );
    let write_c = Expr::store(
        "C",
        vec![global_row()],
        Expr::add(
            Expr::load("A_read_cache", vec![Expr::var("threadIdx.x"), Expr::int(0)]),
            Expr::load("A_read_cache", vec![Expr::var("threadIdx.x"), Expr::int(1)]),
        ),
    );

    let threads = For::new(
        Var::new("threadIdx.x"),
        0,
        32,
        Expr::block(vec![stage_a.into(), stage_b, write_c]),
    )
    .with_kind(ForKind::GpuThread(GpuAxis::X));
    For::new(Var::new("blockIdx.x"), 0, 4, threads.into())
        .with_kind(ForKind::GpuBlock(GpuAxis::X))
        .into()
}

#[test]
fn test_lower_staged_kernel() {
    let mut kernel = staged_kernel();
    let stats = lower_gpu_kernel(&mut kernel, &cached_registry()).expect("kernel lowers");

    assert_snapshot!(kernel.to_string(), @r"
    blockIdx.x for (blockIdx.x, 0, 4) {
      threadIdx.x for (threadIdx.x, 0, 32) {
        A_read_cache[0, 0] = A[((blockIdx.x * 32) + threadIdx.x), 0]
        A_read_cache[0, 1] = A[((blockIdx.x * 32) + threadIdx.x), 1]
        B_read_cache[0, threadIdx.x] = B[blockIdx.x, threadIdx.x]
        C[((blockIdx.x * 32) + threadIdx.x)] = (A_read_cache[0, 0] + A_read_cache[0, 1])
      }
    }
    ");
    assert_eq!(stats.unrolled_loops, 1);
    assert_eq!(stats.localized_loops, 2);
    // four thread-index slots in the local cache, one block index in the shared one
    assert_eq!(stats.replaced_indices, 5);
    assert_eq!(stats.launch.grid, Dim3::new(4, 1, 1));
    assert_eq!(stats.launch.block, Dim3::new(32, 1, 1));
}

#[test]
fn test_localization_can_be_disabled() {
    let mut kernel = staged_kernel();
    let config = PipelineConfig {
        unroll: false,
        localize_read_caches: false,
        ..PipelineConfig::default()
    };
    let stats =
        lower_gpu_kernel_with_config(&mut kernel, &cached_registry(), config).expect("kernel lowers");
    assert_eq!(kernel, staged_kernel());
    assert_eq!(stats.unrolled_loops, 0);
    assert_eq!(stats.replaced_indices, 0);
    assert_eq!(stats.launch.total_threads(), 128);
}

#[test]
fn test_registry_miss_leaves_kernel_untouched() {
    let registry: TensorRegistry = cached_registry()
        .iter()
        .filter(|tensor| tensor.name != "C")
        .cloned()
        .collect();
    let mut kernel = staged_kernel();

    let err = lower_gpu_kernel(&mut kernel, &registry).unwrap_err();
    assert!(matches!(
        &err,
        PipelineError::Optim(OptimError::UnknownTensor { name }) if name == "C"
    ));
    assert_eq!(
        err.to_string(),
        "read-cache localization failed: tensor `C` is not in the tensor registry"
    );
    assert_eq!(kernel, staged_kernel());
}

#[test]
fn test_oversized_block_is_rejected() {
    let body = Expr::store("C", vec![Expr::var("threadIdx.y")], 0);
    let inner = For::new(Var::new("threadIdx.y"), 0, 64, body)
        .with_kind(ForKind::GpuThread(GpuAxis::Y));
    let mut kernel: Expr = For::new(Var::new("threadIdx.x"), 0, 32, inner.into())
        .with_kind(ForKind::GpuThread(GpuAxis::X))
        .into();
    let err = lower_gpu_kernel(&mut kernel, &cached_registry()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid launch geometry: block of 2048 threads exceeds the limit of 1024"
    );
}

#[test]
fn test_block_volume_past_u64_is_rejected() {
    let extent = Expr::int(4_000_000_000);
    let body = Expr::store("C", vec![Expr::var("threadIdx.z")], 0);
    let z = For::new(Var::new("threadIdx.z"), 0, extent.clone(), body)
        .with_kind(ForKind::GpuThread(GpuAxis::Z));
    let y = For::new(Var::new("threadIdx.y"), 0, extent.clone(), z.into())
        .with_kind(ForKind::GpuThread(GpuAxis::Y));
    let mut kernel: Expr = For::new(Var::new("threadIdx.x"), 0, extent, y.into())
        .with_kind(ForKind::GpuThread(GpuAxis::X))
        .into();
    let before = kernel.clone();
    let err = lower_gpu_kernel(&mut kernel, &cached_registry()).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("invalid launch geometry: block of {} threads exceeds the limit of 1024", u64::MAX)
    );
    assert_eq!(kernel, before);
}
