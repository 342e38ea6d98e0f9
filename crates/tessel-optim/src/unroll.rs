//! Full unrolling of loops marked [`ForKind::Unrolled`].
//!
//! Each eligible loop is replaced by a block holding one copy of its body per
//! iteration, with the induction variable substituted by `min + k`. Inner
//! loops are unrolled before the loops that contain them.

use serde::{Deserialize, Serialize};
use tessel_ir::mutate::{ExprMutator, walk_expr};
use tessel_ir::{Expr, ForKind};
use tracing::{debug, trace};

use crate::replace_var::substitute;

/// Configuration for loop unrolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnrollConfig {
    /// Loops with a larger extent are left alone. Default: 64.
    pub max_extent: i64,
}

impl Default for UnrollConfig {
    fn default() -> Self {
        Self { max_extent: 64 }
    }
}

/// Unroll every eligible loop in `root` using default configuration.
///
/// Returns the number of loops unrolled.
pub fn unroll_loops(root: &mut Expr) -> usize {
    unroll_loops_with_config(root, UnrollConfig::default())
}

/// Unroll with custom configuration.
///
/// A loop is eligible when it is marked `Unrolled` and both bounds are
/// integer immediates with `0 <= extent <= max_extent`. Anything else stays a
/// loop.
pub fn unroll_loops_with_config(root: &mut Expr, config: UnrollConfig) -> usize {
    let mut unroller = Unroller {
        config,
        unrolled: 0,
    };
    unroller.visit_expr(root);
    debug!(
        unrolled = unroller.unrolled,
        max_extent = config.max_extent,
        "unrolled loops"
    );
    unroller.unrolled
}

struct Unroller {
    config: UnrollConfig,
    unrolled: usize,
}

impl Unroller {
    /// Constant bounds of `expr` if it is an unrollable loop.
    fn bounds(&self, expr: &Expr) -> Option<(i64, i64)> {
        let Expr::For(node) = expr else {
            return None;
        };
        if node.kind != ForKind::Unrolled {
            return None;
        }
        let min = node.min.as_int()?;
        let extent = node.extent.as_int()?;
        if !(0..=self.config.max_extent).contains(&extent) {
            return None;
        }
        // every `min + k` must be representable
        min.checked_add(extent)?;
        Some((min, extent))
    }
}

impl ExprMutator for Unroller {
    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr(self, expr);

        let Some((min, extent)) = self.bounds(expr) else {
            return;
        };
        let Expr::For(node) = &*expr else {
            return;
        };
        trace!(var = %node.loop_var, min, extent, "unrolling loop");
        let copies = (min..min + extent)
            .map(|value| {
                let mut copy = (*node.body).clone();
                substitute(&mut copy, &node.loop_var, &Expr::int(value));
                copy
            })
            .collect();
        *expr = Expr::block(copies);
        self.unrolled += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use tessel_ir::{For, Var};

    fn unrolled(var: &str, min: impl Into<Expr>, extent: impl Into<Expr>, body: Expr) -> Expr {
        For::new(Var::new(var), min, extent, body)
            .with_kind(ForKind::Unrolled)
            .into()
    }

    #[test]
    fn test_unroll_simple_loop() {
        let body = Expr::store("A", vec![Expr::var("i")], Expr::mul(Expr::var("i"), 2));
        let mut tree = unrolled("i", 1, 3, body);
        assert_eq!(unroll_loops(&mut tree), 1);
        assert_snapshot!(tree.to_string(), @r"
        A[1] = (1 * 2)
        A[2] = (2 * 2)
        A[3] = (3 * 2)
        ");
    }

    #[test]
    fn test_inner_loops_first() {
        let inner = unrolled(
            "j",
            0,
            2,
            Expr::store("A", vec![Expr::var("i"), Expr::var("j")], 0),
        );
        let mut tree = unrolled("i", 0, 2, inner);
        assert_eq!(unroll_loops(&mut tree), 2);
        assert_snapshot!(tree.to_string(), @r"
        A[0, 0] = 0
        A[0, 1] = 0
        A[1, 0] = 0
        A[1, 1] = 0
        ");
    }

    #[test]
    fn test_ineligible_loops_are_kept() {
        let body = || Expr::store("A", vec![Expr::var("i")], 0);
        let mut tree = Expr::block(vec![
            For::new(Var::new("i"), 0, 4, body()).into(),
            unrolled("i", 0, Expr::var("n"), body()),
            unrolled("i", 0, 65, body()),
            unrolled("i", 0, -1, body()),
        ]);
        let before = tree.clone();
        assert_eq!(unroll_loops(&mut tree), 0);
        assert_eq!(tree, before);
    }

    #[test]
    fn test_max_extent_is_configurable() {
        let body = Expr::store("A", vec![Expr::var("i")], 0);
        let mut tree = unrolled("i", 0, 4, body);
        let before = tree.clone();
        assert_eq!(unroll_loops_with_config(&mut tree, UnrollConfig { max_extent: 3 }), 0);
        assert_eq!(tree, before);
        assert_eq!(unroll_loops_with_config(&mut tree, UnrollConfig { max_extent: 4 }), 1);
        assert!(!tree.mentions_var("i"));
    }

    #[test]
    fn test_overflowing_bounds_stay_a_loop() {
        let mut tree = unrolled("i", i64::MAX - 1, 4, Expr::store("A", vec![Expr::var("i")], 0));
        let before = tree.clone();
        assert_eq!(unroll_loops(&mut tree), 0);
        assert_eq!(tree, before);

        let mut tree = unrolled("i", i64::MAX - 2, 2, Expr::store("A", vec![Expr::var("i")], 0));
        assert_eq!(unroll_loops(&mut tree), 1);
        assert_eq!(
            tree,
            Expr::block(vec![
                Expr::store("A", vec![Expr::int(i64::MAX - 2)], 0),
                Expr::store("A", vec![Expr::int(i64::MAX - 1)], 0),
            ])
        );
    }

    #[test]
    fn test_zero_extent_becomes_empty_block() {
        let mut tree = unrolled("i", 0, 0, Expr::store("A", vec![Expr::var("i")], 0));
        assert_eq!(unroll_loops(&mut tree), 1);
        assert_eq!(tree, Expr::block(vec![]));
    }
}
