//! Tree-shaped IR for tensor loop programs.
//!
//! Nodes are plain owned values ([`Expr`]); passes rewrite them in place with
//! an [`ExprMutator`] and inspect them with [`Expr::walk`]. Memory placement
//! of tensors is kept out of the tree in a [`TensorRegistry`].

pub mod axis;
pub mod ir;
pub mod mutate;
pub mod printer;
pub mod tensor;
pub mod walk;

pub use ir::{
    Binary, BinaryOp, Call, Expr, For, ForKind, GpuAxis, Identifier, IfThenElse, Load, PolyFor,
    ScalarType, Select, Store, TensorRef, Var,
};
pub use mutate::ExprMutator;
pub use tensor::{
    Buffer, MemoryType, READ_CACHE_SUFFIX, Tensor, TensorRegistry, is_read_cache_name,
    read_cache_name,
};
pub use walk::WalkAction;
