//! In-place mutating traversal.
//!
//! [`ExprMutator`] has one handler per node kind the rewriting passes care
//! about. Each handler's default implementation recurses through the matching
//! `walk_*` function, so an implementor overrides only the kinds it rewrites
//! and calls back into `walk_*` (or visits selected children itself) to keep
//! descending. Every other kind falls back to [`walk_children`], which visits
//! all child slots in [`Expr::children_mut`] order.
//!
//! Per-pass state lives in the implementor; the walker itself is stateless.

use crate::ir::{Expr, For, Load, PolyFor, Store};

pub trait ExprMutator {
    /// Entry point for every slot. Dispatches on the node kind.
    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr(self, expr);
    }

    /// Called with a slot holding an [`Expr::Var`]. Handlers may overwrite the
    /// slot. Variables have no children, so there is nothing to walk.
    fn visit_var(&mut self, _slot: &mut Expr) {}

    fn visit_for(&mut self, node: &mut For) {
        walk_for(self, node);
    }

    fn visit_poly_for(&mut self, node: &mut PolyFor) {
        walk_poly_for(self, node);
    }

    fn visit_load(&mut self, node: &mut Load) {
        walk_load(self, node);
    }

    fn visit_store(&mut self, node: &mut Store) {
        walk_store(self, node);
    }
}

pub fn walk_expr<M: ExprMutator + ?Sized>(mutator: &mut M, expr: &mut Expr) {
    if expr.is_var() {
        mutator.visit_var(expr);
        return;
    }
    match expr {
        Expr::For(node) => mutator.visit_for(node),
        Expr::PolyFor(node) => mutator.visit_poly_for(node),
        Expr::Load(node) => mutator.visit_load(node),
        Expr::Store(node) => mutator.visit_store(node),
        other => walk_children(mutator, other),
    }
}

/// Visit every child slot of `expr`.
pub fn walk_children<M: ExprMutator + ?Sized>(mutator: &mut M, expr: &mut Expr) {
    for child in expr.children_mut() {
        mutator.visit_expr(child);
    }
}

pub fn walk_for<M: ExprMutator + ?Sized>(mutator: &mut M, node: &mut For) {
    mutator.visit_expr(&mut node.min);
    mutator.visit_expr(&mut node.extent);
    mutator.visit_expr(&mut node.body);
}

pub fn walk_poly_for<M: ExprMutator + ?Sized>(mutator: &mut M, node: &mut PolyFor) {
    mutator.visit_expr(&mut node.init);
    mutator.visit_expr(&mut node.condition);
    mutator.visit_expr(&mut node.inc);
    mutator.visit_expr(&mut node.body);
}

pub fn walk_load<M: ExprMutator + ?Sized>(mutator: &mut M, node: &mut Load) {
    mutator.visit_expr(&mut node.tensor);
    for index in &mut node.indices {
        mutator.visit_expr(index);
    }
}

pub fn walk_store<M: ExprMutator + ?Sized>(mutator: &mut M, node: &mut Store) {
    for index in &mut node.indices {
        mutator.visit_expr(index);
    }
    mutator.visit_expr(&mut node.tensor);
    mutator.visit_expr(&mut node.value);
}
