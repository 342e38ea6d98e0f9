//! Read-cache index elimination for GPU kernels.
//!
//! A read cache holds the slice of a larger tensor that one thread (local
//! memory) or one block (shared memory) works on. The thread or block index
//! that selected the slice is implicit in which thread or block owns the
//! cache, so addressing the cache by that index again is redundant. This pass
//! replaces the index variable, typically by `0`, inside the *addressing*
//! expressions of loads and stores on read caches, and nowhere else:
//!
//! ```text
//! for (k, 0, 4) {                          for (k, 0, 4) {
//!   A_read_cache[threadIdx.x, k] =    =>     A_read_cache[0, k] =
//!     A[threadIdx.x, k]                        A[threadIdx.x, k]
//! }                                        }
//! ```
//!
//! A tensor is a read cache when its name ends in
//! [`READ_CACHE_SUFFIX`](tessel_ir::READ_CACHE_SUFFIX) and its buffer is
//! [`MemoryType::GpuLocal`]. Setting
//! [`CacheIndexConfig::treat_block_index_as_local`] admits read caches of any
//! memory type; callers set it when eliminating a block index, where
//! block-shared caches are as private to the block as local ones are to a
//! thread.

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use tessel_ir::mutate::ExprMutator;
use tessel_ir::{
    Expr, Load, MemoryType, Store, TensorRegistry, Var, WalkAction, is_read_cache_name,
};
use tracing::{debug, trace};

use crate::error::{OptimError, OptimResult};

/// Configuration for read-cache index elimination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheIndexConfig {
    /// Treat every read cache as eligible regardless of its memory type.
    /// Default: false (only `GpuLocal` caches are eligible).
    pub treat_block_index_as_local: bool,
}

/// Result of running read-cache index elimination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheIndexResult {
    /// Variable slots overwritten with the replacement.
    pub replaced_count: usize,
    /// Loads and stores classified as eligible read-cache accesses.
    pub cache_accesses: usize,
}

/// Replace `var` by `replacement` in the addressing of read-cache accesses in
/// the body of the loop `root`.
///
/// # Panics
///
/// Panics if `root` is not a `for`/`poly_for`, or if an access in its body
/// names a tensor missing from `registry`. Both mean the caller broke the
/// pass's preconditions; continuing would emit a wrong kernel. The tree is
/// left untouched when this happens.
pub fn eliminate_cache_index(
    root: &mut Expr,
    var: &Var,
    replacement: &Expr,
    registry: &TensorRegistry,
    treat_block_index_as_local: bool,
) {
    let config = CacheIndexConfig {
        treat_block_index_as_local,
    };
    if let Err(err) = try_eliminate_cache_index_with_config(root, var, replacement, registry, config)
    {
        panic!("read-cache index elimination aborted: {err}");
    }
}

/// Fallible form of [`eliminate_cache_index`].
pub fn try_eliminate_cache_index(
    root: &mut Expr,
    var: &Var,
    replacement: &Expr,
    registry: &TensorRegistry,
    treat_block_index_as_local: bool,
) -> OptimResult<CacheIndexResult> {
    let config = CacheIndexConfig {
        treat_block_index_as_local,
    };
    try_eliminate_cache_index_with_config(root, var, replacement, registry, config)
}

/// Run read-cache index elimination with custom configuration.
///
/// Every load and store in the loop body is checked against `registry`
/// before anything is rewritten, so an `Err` leaves `root` unchanged.
pub fn try_eliminate_cache_index_with_config(
    root: &mut Expr,
    var: &Var,
    replacement: &Expr,
    registry: &TensorRegistry,
    config: CacheIndexConfig,
) -> OptimResult<CacheIndexResult> {
    let body = loop_body_mut(root)?;
    check_accesses(body, registry)?;

    let mut mutator = CacheIndexElimination {
        var,
        replacement,
        registry,
        config,
        active: false,
        result: CacheIndexResult::default(),
    };
    mutator.visit_expr(body);

    debug!(
        var = %var.name,
        replacement = %replacement,
        treat_block_index_as_local = config.treat_block_index_as_local,
        replaced = mutator.result.replaced_count,
        cache_accesses = mutator.result.cache_accesses,
        "eliminated read-cache index"
    );
    Ok(mutator.result)
}

/// The loop header is outside the pass; only the body is rewritten.
fn loop_body_mut(root: &mut Expr) -> OptimResult<&mut Expr> {
    match root {
        Expr::For(node) => Ok(&mut *node.body),
        Expr::PolyFor(node) => Ok(&mut *node.body),
        other => Err(OptimError::NotALoop {
            found: other.kind_name(),
        }),
    }
}

/// Make sure every access in `body` addresses a registered tensor.
fn check_accesses(body: &Expr, registry: &TensorRegistry) -> OptimResult<()> {
    let outcome = body.walk(|node| {
        let (access, tensor) = match node {
            Expr::Load(load) => ("load", &*load.tensor),
            Expr::Store(store) => ("store", &*store.tensor),
            _ => return ControlFlow::Continue(WalkAction::Advance),
        };
        match tensor {
            Expr::Tensor(tensor) if registry.contains(&tensor.name) => {
                ControlFlow::Continue(WalkAction::Advance)
            }
            Expr::Tensor(tensor) => ControlFlow::Break(OptimError::UnknownTensor {
                name: tensor.name.clone(),
            }),
            other => ControlFlow::Break(OptimError::MissingTensor {
                access,
                found: other.kind_name(),
            }),
        }
    });
    match outcome {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(err) => Err(err),
    }
}

struct CacheIndexElimination<'a> {
    var: &'a Var,
    replacement: &'a Expr,
    registry: &'a TensorRegistry,
    config: CacheIndexConfig,
    /// Set while visiting the addressing of an eligible access.
    active: bool,
    result: CacheIndexResult,
}

impl CacheIndexElimination<'_> {
    fn is_cache_access(&self, tensor_name: Option<&str>) -> bool {
        let Some(name) = tensor_name else {
            return false;
        };
        if !is_read_cache_name(name) {
            return false;
        }
        self.registry.get(name).is_some_and(|tensor| {
            tensor.memory_type() == MemoryType::GpuLocal || self.config.treat_block_index_as_local
        })
    }

    /// Run `f` with `active` set to `active`, then restore the previous value.
    fn scoped(&mut self, active: bool, f: impl FnOnce(&mut Self)) {
        let saved = self.active;
        self.active = active;
        f(self);
        self.active = saved;
    }
}

impl ExprMutator for CacheIndexElimination<'_> {
    fn visit_var(&mut self, slot: &mut Expr) {
        if !self.active {
            return;
        }
        let Expr::Var(var) = slot else {
            return;
        };
        if !var.same_name(self.var) {
            return;
        }
        trace!(var = %var.name, "replacing read-cache index");
        *slot = self.replacement.clone();
        self.result.replaced_count += 1;
    }

    fn visit_store(&mut self, node: &mut Store) {
        let is_cache = self.is_cache_access(node.tensor_name());
        trace!(tensor = ?node.tensor_name(), is_cache, "store");
        if is_cache {
            self.result.cache_accesses += 1;
        }
        self.scoped(is_cache, |this| {
            for index in &mut node.indices {
                this.visit_expr(index);
            }
            this.visit_expr(&mut node.tensor);
        });
        // The stored value is data, not addressing.
        self.visit_expr(&mut node.value);
    }

    fn visit_load(&mut self, node: &mut Load) {
        let is_cache = self.is_cache_access(node.tensor_name());
        trace!(tensor = ?node.tensor_name(), is_cache, "load");
        if is_cache {
            self.result.cache_accesses += 1;
        }
        self.scoped(is_cache, |this| {
            this.visit_expr(&mut node.tensor);
            for index in &mut node.indices {
                this.visit_expr(index);
            }
        });
    }
}
