//! Textual rendering of IR trees.
//!
//! Statements (`for`, `poly_for`, `if`, blocks) print one per line with
//! two-space indentation; everything else prints inline.

use std::fmt::{self, Write};

use crate::ir::{Expr, ForKind, Var};

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Printer { out: f, indent: 0 }.node(self)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Display for ForKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForKind::Serial => f.write_str("serial"),
            ForKind::Parallel => f.write_str("parallel"),
            ForKind::Vectorized => f.write_str("vectorize"),
            ForKind::Unrolled => f.write_str("unroll"),
            ForKind::GpuBlock(axis) => write!(f, "blockIdx.{axis}"),
            ForKind::GpuThread(axis) => write!(f, "threadIdx.{axis}"),
        }
    }
}

struct Printer<'a, 'b> {
    out: &'a mut fmt::Formatter<'b>,
    indent: usize,
}

impl Printer<'_, '_> {
    fn pad(&mut self) -> fmt::Result {
        for _ in 0..self.indent {
            self.out.write_str("  ")?;
        }
        Ok(())
    }

    fn list(&mut self, exprs: &[Expr]) -> fmt::Result {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.out.write_str(", ")?;
            }
            self.node(expr)?;
        }
        Ok(())
    }

    fn access(&mut self, tensor: &Expr, indices: &[Expr]) -> fmt::Result {
        self.node(tensor)?;
        self.out.write_char('[')?;
        self.list(indices)?;
        self.out.write_char(']')
    }

    /// `{`, the statements of `body` one level deeper, then `}` on its own line.
    fn body(&mut self, body: &Expr) -> fmt::Result {
        self.out.write_char('{')?;
        self.indent += 1;
        let stmts = match body {
            Expr::Block(stmts) => stmts.as_slice(),
            other => std::slice::from_ref(other),
        };
        for stmt in stmts {
            self.out.write_char('\n')?;
            self.pad()?;
            self.node(stmt)?;
        }
        self.indent -= 1;
        self.out.write_char('\n')?;
        self.pad()?;
        self.out.write_char('}')
    }

    fn node(&mut self, expr: &Expr) -> fmt::Result {
        match expr {
            Expr::IntImm(value) => write!(self.out, "{value}"),
            Expr::FloatImm(value) => write!(self.out, "{value:?}"),
            Expr::Var(var) => self.out.write_str(&var.name),
            Expr::Binary(node) if node.op.is_call_like() => {
                write!(self.out, "{}(", node.op)?;
                self.node(&node.lhs)?;
                self.out.write_str(", ")?;
                self.node(&node.rhs)?;
                self.out.write_char(')')
            }
            Expr::Binary(node) => {
                self.out.write_char('(')?;
                self.node(&node.lhs)?;
                write!(self.out, " {} ", node.op)?;
                self.node(&node.rhs)?;
                self.out.write_char(')')
            }
            Expr::Select(node) => {
                self.out.write_str("select(")?;
                self.node(&node.condition)?;
                self.out.write_str(", ")?;
                self.node(&node.true_value)?;
                self.out.write_str(", ")?;
                self.node(&node.false_value)?;
                self.out.write_char(')')
            }
            Expr::Call(node) => {
                write!(self.out, "{}(", node.name)?;
                self.list(&node.args)?;
                self.out.write_char(')')
            }
            Expr::Tensor(node) => self.out.write_str(&node.name),
            Expr::Load(node) => self.access(&node.tensor, &node.indices),
            Expr::Store(node) => {
                self.access(&node.tensor, &node.indices)?;
                self.out.write_str(" = ")?;
                self.node(&node.value)
            }
            Expr::For(node) => {
                if node.kind != ForKind::Serial {
                    write!(self.out, "{} ", node.kind)?;
                }
                write!(self.out, "for ({}, ", node.loop_var)?;
                self.node(&node.min)?;
                self.out.write_str(", ")?;
                self.node(&node.extent)?;
                self.out.write_str(") ")?;
                self.body(&node.body)
            }
            Expr::PolyFor(node) => {
                write!(self.out, "poly_for ({}, ", node.iterator)?;
                self.node(&node.init)?;
                self.out.write_str(", ")?;
                self.node(&node.condition)?;
                self.out.write_str(", ")?;
                self.node(&node.inc)?;
                self.out.write_str(") ")?;
                self.body(&node.body)
            }
            Expr::IfThenElse(node) => {
                self.out.write_str("if (")?;
                self.node(&node.condition)?;
                self.out.write_str(") ")?;
                self.body(&node.then_case)?;
                if let Some(else_case) = &node.else_case {
                    self.out.write_str(" else ")?;
                    self.body(else_case)?;
                }
                Ok(())
            }
            Expr::Block(stmts) => {
                for (i, stmt) in stmts.iter().enumerate() {
                    if i > 0 {
                        self.out.write_char('\n')?;
                        self.pad()?;
                    }
                    self.node(stmt)?;
                }
                Ok(())
            }
        }
    }
}
