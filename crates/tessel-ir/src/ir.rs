//! Expression tree for the tensor loop IR.
//!
//! The tree is owned top-down: every child lives in a `Box` or `Vec` of its
//! parent, so cloning a node is a deep copy and no two slots ever alias.
//! Passes mutate the tree in place through [`crate::mutate::ExprMutator`].

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub type Identifier = String;

/// Scalar element type of variables and tensors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum ScalarType {
    #[default]
    #[display("i32")]
    Int32,
    #[display("i64")]
    Int64,
    #[display("f32")]
    Float32,
    #[display("f64")]
    Float64,
    #[display("bool")]
    Bool,
}

/// A named scalar variable.
///
/// Variables have no identity beyond their name: the same logical variable
/// appears as many independent nodes throughout a tree. Use [`Var::same_name`]
/// to decide whether two nodes denote the same variable. `PartialEq` also
/// compares `dtype` and is meant for structural comparison of trees.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Var {
    pub name: Identifier,
    pub dtype: ScalarType,
}

impl Var {
    pub fn new(name: impl Into<Identifier>) -> Self {
        Self::with_dtype(name, ScalarType::default())
    }

    pub fn with_dtype(name: impl Into<Identifier>, dtype: ScalarType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }

    /// Name equality, the only notion of variable identity in the IR.
    pub fn same_name(&self, other: &Var) -> bool {
        self.name == other.name
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name == name
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum BinaryOp {
    #[display("+")]
    Add,
    #[display("-")]
    Sub,
    #[display("*")]
    Mul,
    #[display("/")]
    Div,
    #[display("%")]
    Mod,
    #[display("min")]
    Min,
    #[display("max")]
    Max,
    #[display("<")]
    Lt,
    #[display("<=")]
    Le,
    #[display(">")]
    Gt,
    #[display(">=")]
    Ge,
    #[display("==")]
    Eq,
    #[display("!=")]
    Ne,
    #[display("&&")]
    And,
    #[display("||")]
    Or,
}

impl BinaryOp {
    /// Whether the operator prints as a call (`min(a, b)`) rather than infix.
    pub fn is_call_like(self) -> bool {
        matches!(self, BinaryOp::Min | BinaryOp::Max)
    }
}

/// GPU launch axis a loop can be bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum GpuAxis {
    #[display("x")]
    X,
    #[display("y")]
    Y,
    #[display("z")]
    Z,
}

/// How a `For` loop is executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForKind {
    #[default]
    Serial,
    Parallel,
    Vectorized,
    Unrolled,
    /// Bound to `blockIdx.<axis>`.
    GpuBlock(GpuAxis),
    /// Bound to `threadIdx.<axis>`.
    GpuThread(GpuAxis),
}

impl ForKind {
    pub fn is_gpu_bound(self) -> bool {
        matches!(self, ForKind::GpuBlock(_) | ForKind::GpuThread(_))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Binary {
    pub op: BinaryOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Select {
    pub condition: Box<Expr>,
    pub true_value: Box<Expr>,
    pub false_value: Box<Expr>,
}

/// Call to an intrinsic or extern function.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub name: Identifier,
    pub args: Vec<Expr>,
}

/// Reference to a tensor by name. Memory placement is not stored here; it is
/// resolved through a [`crate::tensor::TensorRegistry`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TensorRef {
    pub name: Identifier,
    pub shape: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub tensor: Box<Expr>,
    pub indices: Vec<Expr>,
}

impl Load {
    /// Name of the accessed tensor, if the tensor slot holds a tensor reference.
    pub fn tensor_name(&self) -> Option<&str> {
        tensor_name_of(&self.tensor)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub tensor: Box<Expr>,
    pub indices: Vec<Expr>,
    pub value: Box<Expr>,
}

impl Store {
    pub fn tensor_name(&self) -> Option<&str> {
        tensor_name_of(&self.tensor)
    }
}

fn tensor_name_of(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Tensor(tensor) => Some(&tensor.name),
        _ => None,
    }
}

/// Counted loop `for (loop_var = min; loop_var < min + extent; ++loop_var)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct For {
    pub loop_var: Var,
    pub min: Box<Expr>,
    pub extent: Box<Expr>,
    pub kind: ForKind,
    pub body: Box<Expr>,
}

impl For {
    pub fn new(loop_var: Var, min: impl Into<Expr>, extent: impl Into<Expr>, body: Expr) -> Self {
        Self {
            loop_var,
            min: Box::new(min.into()),
            extent: Box::new(extent.into()),
            kind: ForKind::Serial,
            body: Box::new(body),
        }
    }

    pub fn with_kind(mut self, kind: ForKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Loop in the polyhedral form `for (iterator = init; condition; iterator += inc)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolyFor {
    pub iterator: Var,
    pub init: Box<Expr>,
    pub condition: Box<Expr>,
    pub inc: Box<Expr>,
    pub body: Box<Expr>,
}

impl PolyFor {
    pub fn new(
        iterator: Var,
        init: impl Into<Expr>,
        condition: Expr,
        inc: impl Into<Expr>,
        body: Expr,
    ) -> Self {
        Self {
            iterator,
            init: Box::new(init.into()),
            condition: Box::new(condition),
            inc: Box::new(inc.into()),
            body: Box::new(body),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IfThenElse {
    pub condition: Box<Expr>,
    pub then_case: Box<Expr>,
    pub else_case: Option<Box<Expr>>,
}

/// An IR node.
#[derive(Clone, Debug, PartialEq, From, Serialize, Deserialize)]
pub enum Expr {
    IntImm(i64),
    FloatImm(f64),
    Var(Var),
    Binary(Binary),
    Select(Select),
    Call(Call),
    Tensor(TensorRef),
    Load(Load),
    Store(Store),
    For(For),
    PolyFor(PolyFor),
    IfThenElse(IfThenElse),
    Block(Vec<Expr>),
}

impl Expr {
    pub fn int(value: i64) -> Self {
        Expr::IntImm(value)
    }

    pub fn float(value: f64) -> Self {
        Expr::FloatImm(value)
    }

    pub fn var(name: impl Into<Identifier>) -> Self {
        Expr::Var(Var::new(name))
    }

    pub fn binary(op: BinaryOp, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Expr::Binary(Binary {
            op,
            lhs: Box::new(lhs.into()),
            rhs: Box::new(rhs.into()),
        })
    }

    pub fn add(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn sub(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Sub, lhs, rhs)
    }

    pub fn mul(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Mul, lhs, rhs)
    }

    pub fn lt(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Lt, lhs, rhs)
    }

    pub fn select(condition: Expr, true_value: Expr, false_value: Expr) -> Self {
        Expr::Select(Select {
            condition: Box::new(condition),
            true_value: Box::new(true_value),
            false_value: Box::new(false_value),
        })
    }

    pub fn call(name: impl Into<Identifier>, args: Vec<Expr>) -> Self {
        Expr::Call(Call {
            name: name.into(),
            args,
        })
    }

    /// Shape-less reference to the tensor `name`.
    pub fn tensor(name: impl Into<Identifier>) -> Self {
        Expr::Tensor(TensorRef {
            name: name.into(),
            shape: Vec::new(),
        })
    }

    pub fn load(tensor: impl Into<Identifier>, indices: Vec<Expr>) -> Self {
        Expr::Load(Load {
            tensor: Box::new(Self::tensor(tensor)),
            indices,
        })
    }

    pub fn store(tensor: impl Into<Identifier>, indices: Vec<Expr>, value: impl Into<Expr>) -> Self {
        Expr::Store(Store {
            tensor: Box::new(Self::tensor(tensor)),
            indices,
            value: Box::new(value.into()),
        })
    }

    pub fn if_then_else(condition: Expr, then_case: Expr, else_case: Option<Expr>) -> Self {
        Expr::IfThenElse(IfThenElse {
            condition: Box::new(condition),
            then_case: Box::new(then_case),
            else_case: else_case.map(Box::new),
        })
    }

    pub fn block(stmts: Vec<Expr>) -> Self {
        Expr::Block(stmts)
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Expr::Var(_))
    }

    pub fn as_var(&self) -> Option<&Var> {
        match self {
            Expr::Var(var) => Some(var),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Expr::IntImm(value) => Some(*value),
            _ => None,
        }
    }

    /// Short lowercase name of the node kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::IntImm(_) => "int",
            Expr::FloatImm(_) => "float",
            Expr::Var(_) => "var",
            Expr::Binary(_) => "binary",
            Expr::Select(_) => "select",
            Expr::Call(_) => "call",
            Expr::Tensor(_) => "tensor",
            Expr::Load(_) => "load",
            Expr::Store(_) => "store",
            Expr::For(_) => "for",
            Expr::PolyFor(_) => "poly_for",
            Expr::IfThenElse(_) => "if_then_else",
            Expr::Block(_) => "block",
        }
    }

    /// Direct children in traversal order.
    ///
    /// Loop headers contribute their bound expressions but not their induction
    /// variable, which is a binding rather than an expression slot.
    pub fn children(&self) -> SmallVec<[&Expr; 4]> {
        let mut children = SmallVec::new();
        match self {
            Expr::IntImm(_) | Expr::FloatImm(_) | Expr::Var(_) => {}
            Expr::Binary(node) => {
                children.push(&*node.lhs);
                children.push(&*node.rhs);
            }
            Expr::Select(node) => {
                children.push(&*node.condition);
                children.push(&*node.true_value);
                children.push(&*node.false_value);
            }
            Expr::Call(node) => children.extend(node.args.iter()),
            Expr::Tensor(node) => children.extend(node.shape.iter()),
            Expr::Load(node) => {
                children.push(&*node.tensor);
                children.extend(node.indices.iter());
            }
            Expr::Store(node) => {
                children.extend(node.indices.iter());
                children.push(&*node.tensor);
                children.push(&*node.value);
            }
            Expr::For(node) => {
                children.push(&*node.min);
                children.push(&*node.extent);
                children.push(&*node.body);
            }
            Expr::PolyFor(node) => {
                children.push(&*node.init);
                children.push(&*node.condition);
                children.push(&*node.inc);
                children.push(&*node.body);
            }
            Expr::IfThenElse(node) => {
                children.push(&*node.condition);
                children.push(&*node.then_case);
                children.extend(node.else_case.as_deref());
            }
            Expr::Block(stmts) => children.extend(stmts.iter()),
        }
        children
    }

    /// Mutable counterpart of [`Expr::children`], same order.
    pub fn children_mut(&mut self) -> SmallVec<[&mut Expr; 4]> {
        let mut children = SmallVec::new();
        match self {
            Expr::IntImm(_) | Expr::FloatImm(_) | Expr::Var(_) => {}
            Expr::Binary(node) => {
                children.push(&mut *node.lhs);
                children.push(&mut *node.rhs);
            }
            Expr::Select(node) => {
                children.push(&mut *node.condition);
                children.push(&mut *node.true_value);
                children.push(&mut *node.false_value);
            }
            Expr::Call(node) => children.extend(node.args.iter_mut()),
            Expr::Tensor(node) => children.extend(node.shape.iter_mut()),
            Expr::Load(node) => {
                children.push(&mut *node.tensor);
                children.extend(node.indices.iter_mut());
            }
            Expr::Store(node) => {
                children.extend(node.indices.iter_mut());
                children.push(&mut *node.tensor);
                children.push(&mut *node.value);
            }
            Expr::For(node) => {
                children.push(&mut *node.min);
                children.push(&mut *node.extent);
                children.push(&mut *node.body);
            }
            Expr::PolyFor(node) => {
                children.push(&mut *node.init);
                children.push(&mut *node.condition);
                children.push(&mut *node.inc);
                children.push(&mut *node.body);
            }
            Expr::IfThenElse(node) => {
                children.push(&mut *node.condition);
                children.push(&mut *node.then_case);
                children.extend(node.else_case.as_deref_mut());
            }
            Expr::Block(stmts) => children.extend(stmts.iter_mut()),
        }
        children
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::IntImm(value.into())
    }
}

impl From<&Var> for Expr {
    fn from(var: &Var) -> Self {
        Expr::Var(var.clone())
    }
}
