//! Type registry: hash → descriptor storage.
//!
//! # Storage model
//!
//! Descriptors are built outside the lock, published once behind
//! `Box::leak` (process-lifetime storage: a descriptor is never destroyed
//! or relocated while reachable), and indexed by [`TypeHash`] plus a
//! name → hash reverse index. Links between descriptors are hashes, so a
//! child type can register before its super exists; the registry resolves
//! links on demand.
//!
//! # Two-phase bring-up
//!
//! `descriptor_of::<T>()` first inserts `T`'s finished descriptor, then —
//! with no lock held — runs the dependency hooks the builder collected
//! (super type, pure type, field types, method signature types). Because
//! every hook is itself an idempotent `descriptor_of` call and presence
//! in the map terminates recursion, mutually referential types and
//! self-referential pointer fields settle in any registration order.
//!
//! # Thread safety
//!
//! Insertion is the only guarded operation (`parking_lot::RwLock`); the
//! read paths take the shared lock only. Racing registrations of the same
//! type resolve to whichever insert won; the loser's freshly built
//! descriptor is discarded before it ever leaks. Per-descriptor mutation
//! happens only inside the owning type's `describe` call, before
//! publication, so it needs no synchronization.

use std::fmt;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::descriptor::{TypeBuilder, TypeDescriptor};
use crate::error::RegistrationError;
use crate::reflect::Reflect;
use crate::type_hash::TypeHash;

/// Policy for duplicate property/method names during registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Last registration wins (shadowing allowed).
    #[default]
    Override,
    /// A duplicate name fails the type's registration.
    Reject,
}

#[derive(Default)]
struct RegistryInner {
    types: FxHashMap<TypeHash, &'static TypeDescriptor>,
    by_name: FxHashMap<&'static str, TypeHash>,
}

/// Process-wide (or test-local) table mapping type identity to its
/// descriptor. Append-only.
pub struct TypeRegistry {
    inner: RwLock<RegistryInner>,
    policy: DuplicatePolicy,
}

impl TypeRegistry {
    /// Create an empty registry with the default `Override` policy.
    pub fn new() -> Self {
        Self::with_policy(DuplicatePolicy::default())
    }

    /// Create an empty registry with an explicit duplicate policy.
    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            policy,
        }
    }

    /// The process-wide registry instance.
    pub fn global() -> &'static TypeRegistry {
        static GLOBAL: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::new);
        &GLOBAL
    }

    /// The registry's duplicate policy.
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Return the singleton descriptor for `T`, constructing and
    /// registering it on first call.
    ///
    /// Panics if `T`'s registration path violates the duplicate policy;
    /// use [`Self::try_descriptor_of`] to observe the error instead.
    pub fn descriptor_of<T: Reflect>(&self) -> &'static TypeDescriptor {
        self.try_descriptor_of::<T>()
            .unwrap_or_else(|error| panic!("type registration failed: {error}"))
    }

    /// Fallible variant of [`Self::descriptor_of`].
    pub fn try_descriptor_of<T: Reflect>(&self) -> Result<&'static TypeDescriptor, RegistrationError> {
        let hash = T::type_hash();
        if let Some(descriptor) = self.inner.read().types.get(&hash).copied() {
            return Ok(descriptor);
        }

        // Build outside the lock; the registration path may be re-entered
        // by dependency hooks.
        let mut builder = TypeBuilder::new::<T>(self.policy);
        T::describe(&mut builder);
        let (descriptor, deps) = builder.finish()?;

        let published = {
            let mut inner = self.inner.write();
            if let Some(existing) = inner.types.get(&hash) {
                *existing
            } else {
                let leaked: &'static TypeDescriptor = Box::leak(Box::new(descriptor));
                inner.types.insert(hash, leaked);
                inner.by_name.insert(leaked.name(), hash);
                leaked
            }
        };

        for ensure in deps {
            ensure(self);
        }
        Ok(published)
    }

    /// Look up a descriptor by identity hash.
    pub fn get(&self, hash: TypeHash) -> Option<&'static TypeDescriptor> {
        self.inner.read().types.get(&hash).copied()
    }

    /// Look up a descriptor by type name.
    pub fn get_by_name(&self, name: &str) -> Option<&'static TypeDescriptor> {
        let inner = self.inner.read();
        let hash = inner.by_name.get(name)?;
        inner.types.get(hash).copied()
    }

    /// Whether a descriptor with this hash is registered.
    pub fn contains(&self, hash: TypeHash) -> bool {
        self.inner.read().types.contains_key(&hash)
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.inner.read().types.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every registered descriptor, for inspection.
    pub fn descriptors(&self) -> Vec<&'static TypeDescriptor> {
        self.inner.read().types.values().copied().collect()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.len())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeBuilder;
    use crate::reflect::TypeRef;

    #[derive(Clone)]
    struct Root {
        id: u32,
    }

    unsafe impl Reflect for Root {
        fn describe(builder: &mut TypeBuilder) {
            builder.property::<u32>("id", core::mem::offset_of!(Root, id));
        }
    }

    #[derive(Clone)]
    #[repr(C)]
    struct Branch {
        base: Root,
    }

    unsafe impl Reflect for Branch {
        fn super_link() -> Option<TypeRef> {
            Some(TypeRef::of::<Root>())
        }
    }

    #[test]
    fn repeated_lookup_returns_identical_pointer() {
        let registry = TypeRegistry::new();
        let first = registry.descriptor_of::<Root>();
        let second = registry.descriptor_of::<Root>();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn child_registration_pulls_in_super() {
        let registry = TypeRegistry::new();
        // Register the child first: the super must appear via phase two.
        let branch = registry.descriptor_of::<Branch>();
        assert_eq!(branch.super_hash(), Some(TypeHash::of::<Root>()));
        assert!(registry.get(TypeHash::of::<Root>()).is_some());
    }

    #[test]
    fn lookup_by_name() {
        let registry = TypeRegistry::new();
        let descriptor = registry.descriptor_of::<Root>();
        assert!(std::ptr::eq(
            registry.get_by_name(descriptor.name()).unwrap(),
            descriptor
        ));
        assert!(registry.get_by_name("no::such::Type").is_none());
    }

    #[test]
    fn field_types_are_ensured() {
        let registry = TypeRegistry::new();
        registry.descriptor_of::<Root>();
        assert!(registry.contains(TypeHash::of::<u32>()));
    }

    #[test]
    fn registries_are_isolated() {
        let a = TypeRegistry::new();
        let b = TypeRegistry::new();
        a.descriptor_of::<Root>();
        assert!(b.get(TypeHash::of::<Root>()).is_none());
        assert!(b.is_empty());
    }

    #[test]
    fn global_registry_is_a_singleton() {
        let first = TypeRegistry::global().descriptor_of::<Root>();
        let second = TypeRegistry::global().descriptor_of::<Root>();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn lookup_miss_returns_none() {
        let registry = TypeRegistry::new();
        assert!(registry.get(TypeHash::from_name("ghost")).is_none());
        assert!(!registry.contains(TypeHash::from_name("ghost")));
    }

    #[test]
    fn descriptors_snapshot_contains_registrations() {
        let registry = TypeRegistry::new();
        let root = registry.descriptor_of::<Root>();
        assert!(registry.descriptors().iter().any(|d| std::ptr::eq(*d, root)));
    }
}
