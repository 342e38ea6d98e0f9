//! Substitute a variable by an expression throughout a subtree.
//!
//! Used for loop specialization, unrolling and renaming during lowering.
//! Matching is by name only (see [`Var::same_name`]); every insertion site
//! receives its own clone of the replacement.

use tessel_ir::mutate::{ExprMutator, walk_for, walk_poly_for};
use tessel_ir::{Expr, For, PolyFor, Var};
use tracing::{debug, trace};

/// Replace every occurrence of `var` in `root` by a copy of `replacement`.
///
/// Loop headers are rewritten too, but only when `replacement` is itself a
/// variable: a `for`/`poly_for` must bind a variable, so a header whose
/// induction variable is `var` keeps it when `replacement` is any other
/// expression, and only the loop's bounds and body are substituted.
///
/// Finding no occurrence is not an error; the tree is left as is.
pub fn substitute(root: &mut Expr, var: &Var, replacement: &Expr) {
    let mut substitution = Substitution::new(var, replacement);
    substitution.apply(root);
    debug!(
        var = %var.name,
        replacement = %replacement,
        replaced = substitution.replaced(),
        headers = substitution.headers_renamed(),
        "substituted variable"
    );
}

/// Mutator behind [`substitute`], exposed for callers that want the counts.
pub struct Substitution<'a> {
    var: &'a Var,
    replacement: &'a Expr,
    replaced: usize,
    headers_renamed: usize,
}

impl<'a> Substitution<'a> {
    pub fn new(var: &'a Var, replacement: &'a Expr) -> Self {
        Self {
            var,
            replacement,
            replaced: 0,
            headers_renamed: 0,
        }
    }

    pub fn apply(&mut self, root: &mut Expr) {
        self.visit_expr(root);
    }

    /// Number of expression slots overwritten so far.
    pub fn replaced(&self) -> usize {
        self.replaced
    }

    /// Number of loop headers whose induction variable was renamed.
    pub fn headers_renamed(&self) -> usize {
        self.headers_renamed
    }

    fn rename_header(&mut self, binding: &mut Var) {
        if !binding.same_name(self.var) {
            return;
        }
        if let Expr::Var(replacement) = self.replacement {
            trace!(from = %binding, to = %replacement, "renaming loop header");
            *binding = replacement.clone();
            self.headers_renamed += 1;
        }
    }
}

impl ExprMutator for Substitution<'_> {
    fn visit_var(&mut self, slot: &mut Expr) {
        let Expr::Var(var) = slot else {
            return;
        };
        if !var.same_name(self.var) {
            return;
        }
        trace!(var = %var.name, "replacing variable");
        *slot = self.replacement.clone();
        self.replaced += 1;
    }

    fn visit_for(&mut self, node: &mut For) {
        walk_for(self, node);
        self.rename_header(&mut node.loop_var);
    }

    fn visit_poly_for(&mut self, node: &mut PolyFor) {
        walk_poly_for(self, node);
        self.rename_header(&mut node.iterator);
    }
}
