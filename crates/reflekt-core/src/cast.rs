//! Safe polymorphic casting over the descriptor graph.
//!
//! [`TypeRegistry::cast_ref`] replaces language-level downcasting for
//! reflectable hierarchies. The algorithm runs in strict order, first
//! match wins:
//!
//! 1. a null input (raw-pointer form only) is null out, no further checks;
//! 2. identical pure types: a no-op cast;
//! 3. the destination's pure type is an ancestor of the source's: a safe
//!    upcast, total for every valid ancestor, decided without touching
//!    the object;
//! 4. only when the static checks are inconclusive, the object's own
//!    [`runtime_hash`] is consulted: equal to the destination, or the
//!    destination is one of its ancestors — a validated downcast or
//!    cross-cast;
//! 5. otherwise the cast fails with `None`/null.
//!
//! Pointer-likeness of both sides is enforced by the signatures
//! themselves: the API only accepts and produces references and raw
//! pointers, and a successful cast preserves address identity.
//!
//! Stage 4 resolves ancestry through the registry, so a downcast can only
//! be validated once the concrete type has registered (the registration
//! hook does this at startup).
//!
//! [`runtime_hash`]: crate::reflect::Reflect::runtime_hash

use crate::reflect::{Reflect, pure_hash_of};
use crate::registry::TypeRegistry;
use crate::type_hash::TypeHash;

/// Identity comparison of two type hashes.
#[inline]
pub fn is_same(a: TypeHash, b: TypeHash) -> bool {
    a == b
}

/// Identity comparison of two static types.
#[inline]
pub fn is_same_type<A: Reflect, B: Reflect>() -> bool {
    A::type_hash() == B::type_hash()
}

impl TypeRegistry {
    /// Whether `ancestor` appears in `descendant`'s super chain.
    ///
    /// Strict: a type is not its own child. Iterative, O(chain depth).
    pub fn is_child(&self, ancestor: TypeHash, descendant: TypeHash) -> bool {
        let mut current = self.get(descendant).and_then(|d| d.super_hash());
        while let Some(hash) = current {
            if hash == ancestor {
                return true;
            }
            current = self.get(hash).and_then(|d| d.super_hash());
        }
        false
    }

    /// Typed variant of [`Self::is_child`]; registers the descendant (and
    /// thereby its chain) if needed.
    pub fn is_child_of<Ancestor: Reflect, Descendant: Reflect>(&self) -> bool {
        self.descriptor_of::<Descendant>();
        self.is_child(Ancestor::type_hash(), Descendant::type_hash())
    }

    /// Safe cast between reflectable types through a shared reference.
    ///
    /// Returns the same address reinterpreted as `To` when one of the
    /// stages succeeds, `None` otherwise.
    pub fn cast_ref<'a, To: Reflect, From: Reflect>(&self, from: &'a From) -> Option<&'a To> {
        if self.cast_allowed::<To, From>(from) {
            Some(unsafe { &*(from as *const From).cast::<To>() })
        } else {
            None
        }
    }

    /// Mutable variant of [`Self::cast_ref`].
    pub fn cast_mut<'a, To: Reflect, From: Reflect>(&self, from: &'a mut From) -> Option<&'a mut To> {
        if self.cast_allowed::<To, From>(from) {
            Some(unsafe { &mut *(from as *mut From).cast::<To>() })
        } else {
            None
        }
    }

    /// Raw-pointer variant: null in is null out, a failed cast is null.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must point to a live object of type `From` (the
    /// dynamic stage reads its runtime descriptor through it).
    pub unsafe fn cast_ptr<To: Reflect, From: Reflect>(&self, ptr: *mut From) -> *mut To {
        if ptr.is_null() {
            return std::ptr::null_mut();
        }
        let from = unsafe { &*ptr };
        if self.cast_allowed::<To, From>(from) {
            ptr.cast()
        } else {
            std::ptr::null_mut()
        }
    }

    fn cast_allowed<To: Reflect, From: Reflect>(&self, from: &From) -> bool {
        let to_pure = pure_hash_of::<To>();
        let from_pure = pure_hash_of::<From>();

        // Static checks: same type, then upcast along the super chain.
        if to_pure == from_pure {
            return true;
        }
        self.descriptor_of::<From>();
        if self.is_child(to_pure, from_pure) {
            return true;
        }

        // Dynamic check: the object reports its most-derived type.
        let dynamic = from.runtime_hash();
        dynamic == to_pure || self.is_child(to_pure, dynamic)
    }
}
