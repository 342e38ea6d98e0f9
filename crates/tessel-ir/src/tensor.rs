//! Tensors, their backing buffers, and the registry that maps names to them.

use std::collections::BTreeMap;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::ir::{Expr, Identifier, ScalarType};

/// Name suffix the lowering pipeline gives to read-cache tensors.
pub const READ_CACHE_SUFFIX: &str = "read_cache";

/// Whether `name` follows the read-cache naming convention.
///
/// The suffix alone is not enough: the name must be strictly longer than
/// [`READ_CACHE_SUFFIX`].
pub fn is_read_cache_name(name: &str) -> bool {
    name.len() > READ_CACHE_SUFFIX.len() && name.ends_with(READ_CACHE_SUFFIX)
}

/// Name of the read cache created for tensor `base`.
pub fn read_cache_name(base: &str) -> Identifier {
    format!("{base}_{READ_CACHE_SUFFIX}")
}

/// Where a buffer lives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum MemoryType {
    #[default]
    #[display("host")]
    Host,
    #[display("gpu_global")]
    GpuGlobal,
    /// Shared by the threads of one block.
    #[display("gpu_shared")]
    GpuShared,
    /// Private to one thread (registers or local memory).
    #[display("gpu_local")]
    GpuLocal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buffer {
    pub name: Identifier,
    pub memory_type: MemoryType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub name: Identifier,
    pub shape: Vec<Expr>,
    pub dtype: ScalarType,
    pub buffer: Buffer,
}

impl Tensor {
    /// Create a tensor backed by a fresh buffer named `_<name>`.
    pub fn new(
        name: impl Into<Identifier>,
        shape: Vec<Expr>,
        dtype: ScalarType,
        memory_type: MemoryType,
    ) -> Self {
        let name = name.into();
        let buffer = Buffer {
            name: format!("_{name}"),
            memory_type,
        };
        Self {
            name,
            shape,
            dtype,
            buffer,
        }
    }

    pub fn memory_type(&self) -> MemoryType {
        self.buffer.memory_type
    }

    pub fn is_read_cache(&self) -> bool {
        is_read_cache_name(&self.name)
    }
}

/// Name → tensor lookup built once during lowering.
///
/// Passes only read from the registry. It holds no interior mutability, so a
/// shared `&TensorRegistry` can be queried from several threads at once.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TensorRegistry {
    tensors: BTreeMap<Identifier, Tensor>,
}

impl TensorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tensor`, returning the tensor previously registered under the
    /// same name.
    pub fn insert(&mut self, tensor: Tensor) -> Option<Tensor> {
        self.tensors.insert(tensor.name.clone(), tensor)
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tensor> {
        self.tensors.values()
    }
}

impl FromIterator<Tensor> for TensorRegistry {
    fn from_iter<I: IntoIterator<Item = Tensor>>(iter: I) -> Self {
        let mut registry = Self::new();
        registry.extend(iter);
        registry
    }
}

impl Extend<Tensor> for TensorRegistry {
    fn extend<I: IntoIterator<Item = Tensor>>(&mut self, iter: I) {
        for tensor in iter {
            self.insert(tensor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_cache_name_requires_prefix() {
        assert!(is_read_cache_name("A_read_cache"));
        assert!(is_read_cache_name("xread_cache"));
        assert!(!is_read_cache_name("read_cache"));
        assert!(!is_read_cache_name("A_read_cache_1"));
        assert!(!is_read_cache_name("output"));
    }

    #[test]
    fn test_read_cache_name_roundtrips_convention() {
        let name = read_cache_name("weights");
        assert_eq!(name, "weights_read_cache");
        assert!(is_read_cache_name(&name));
    }

    #[test]
    fn test_registry_lookup() {
        let registry: TensorRegistry = [
            Tensor::new("A", vec![Expr::int(4)], ScalarType::Float32, MemoryType::GpuGlobal),
            Tensor::new(
                "A_read_cache",
                vec![Expr::int(1)],
                ScalarType::Float32,
                MemoryType::GpuLocal,
            ),
        ]
        .into_iter()
        .collect();

        assert_eq!(registry.len(), 2);
        let cache = registry.get("A_read_cache").expect("registered");
        assert_eq!(cache.memory_type(), MemoryType::GpuLocal);
        assert_eq!(cache.buffer.name, "_A_read_cache");
        assert!(cache.is_read_cache());
        assert!(registry.get("B").is_none());
    }

    #[test]
    fn test_insert_replaces_same_name() {
        let mut registry = TensorRegistry::new();
        assert!(
            registry
                .insert(Tensor::new("A", vec![], ScalarType::Int32, MemoryType::Host))
                .is_none()
        );
        let previous = registry.insert(Tensor::new(
            "A",
            vec![],
            ScalarType::Int32,
            MemoryType::GpuShared,
        ));
        assert_eq!(previous.map(|t| t.memory_type()), Some(MemoryType::Host));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_is_shareable_across_threads() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<TensorRegistry>();
    }
}
