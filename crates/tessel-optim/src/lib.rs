//! Rewriting passes over the tessel IR.
//!
//! - [`substitute`]: replace a variable by an expression everywhere.
//! - [`eliminate_cache_index`]: drop the thread/block index from read-cache
//!   addressing.
//! - [`unroll_loops`]: fully unroll small constant loops.

pub mod cache_index;
pub mod error;
pub mod replace_var;
pub mod unroll;

pub use cache_index::{
    CacheIndexConfig, CacheIndexResult, eliminate_cache_index, try_eliminate_cache_index,
    try_eliminate_cache_index_with_config,
};
pub use error::{OptimError, OptimResult};
pub use replace_var::{Substitution, substitute};
pub use unroll::{UnrollConfig, unroll_loops, unroll_loops_with_config};
