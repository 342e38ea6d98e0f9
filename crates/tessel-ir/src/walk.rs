//! Read-only recursive traversal.
//!
//! Mirrors the shape of the mutating walker in [`crate::mutate`], but takes a
//! callback that can stop early or skip a subtree.
//!
//! # Example
//!
//! ```
//! use std::ops::ControlFlow;
//! use tessel_ir::{Expr, WalkAction};
//!
//! let expr = Expr::add(Expr::load("A", vec![Expr::var("i")]), Expr::var("j"));
//!
//! // Collect every variable name, skipping load indices.
//! let mut names = Vec::new();
//! let _ = expr.walk::<()>(|node| match node {
//!     Expr::Var(var) => {
//!         names.push(var.name.clone());
//!         ControlFlow::Continue(WalkAction::Advance)
//!     }
//!     Expr::Load(_) => ControlFlow::Continue(WalkAction::Skip),
//!     _ => ControlFlow::Continue(WalkAction::Advance),
//! });
//! assert_eq!(names, ["j"]);
//! ```

use std::ops::ControlFlow;

use crate::ir::Expr;

/// Controls whether to descend into children during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Continue walking and descend into children.
    Advance,
    /// Skip the children of the current node.
    Skip,
}

// Internal helper to avoid recursion limit issues with impl FnMut
fn walk_internal<B>(
    expr: &Expr,
    f: &mut dyn FnMut(&Expr) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    match f(expr) {
        ControlFlow::Break(b) => return ControlFlow::Break(b),
        ControlFlow::Continue(WalkAction::Skip) => return ControlFlow::Continue(()),
        ControlFlow::Continue(WalkAction::Advance) => {}
    }
    for child in expr.children() {
        walk_internal(child, f)?;
    }
    ControlFlow::Continue(())
}

impl Expr {
    /// Walk this node and its descendants in pre-order, applying `f` to each.
    ///
    /// Returns `ControlFlow::Break(b)` if the callback returns `Break(b)`.
    /// The callback can return `Continue(Skip)` to skip a node's children.
    pub fn walk<B>(
        &self,
        mut f: impl FnMut(&Expr) -> ControlFlow<B, WalkAction>,
    ) -> ControlFlow<B, ()> {
        walk_internal(self, &mut f)
    }

    /// Whether a variable called `name` occurs in an expression slot of this
    /// subtree. Loop induction variables are bindings and do not count.
    pub fn mentions_var(&self, name: &str) -> bool {
        self.walk(|node| match node {
            Expr::Var(var) if var.is_named(name) => ControlFlow::Break(()),
            _ => ControlFlow::Continue(WalkAction::Advance),
        })
        .is_break()
    }

    /// Number of expression slots holding a variable called `name`.
    pub fn count_var(&self, name: &str) -> usize {
        let mut count = 0;
        let _ = self.walk::<()>(|node| {
            if let Expr::Var(var) = node
                && var.is_named(name)
            {
                count += 1;
            }
            ControlFlow::Continue(WalkAction::Advance)
        });
        count
    }
}
