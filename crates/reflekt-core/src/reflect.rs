//! The contract a reflectable type satisfies.
//!
//! The engine never generates registration code itself; a code-generation
//! hook (or a hand-written impl, as the tests do) supplies an
//! implementation of [`Reflect`] per type. Everything else — descriptor
//! construction, super resolution, property access, method invocation,
//! casting — is driven off this trait.
//!
//! # Safety contract
//!
//! `Reflect` is an `unsafe` trait because the engine performs raw offset
//! arithmetic and pointer reinterpretation based on its answers:
//!
//! - byte offsets passed to [`TypeBuilder::property`] must locate a field
//!   of exactly the declared type inside the implementing type's layout;
//! - a type declaring [`Reflect::super_link`] must be `#[repr(C)]` with
//!   the super type embedded as its first field, so that a pointer to the
//!   type is also a valid pointer to every ancestor;
//! - [`Reflect::runtime_hash`] must report the hash of the most-derived
//!   type actually stored at `self`'s address.
//!
//! Reference-typed fields are not supported: no `Reflect` impl exists for
//! `&T`/`&mut T`, so registering one fails at compile time (an offset
//! cannot meaningfully be computed for a reference field).
//!
//! [`TypeBuilder::property`]: crate::descriptor::TypeBuilder::property

use crate::descriptor::TypeBuilder;
use crate::qualifiers::TypeQualifiers;
use crate::registry::TypeRegistry;
use crate::type_hash::TypeHash;

/// A forward reference to another reflectable type.
///
/// Carries the referenced type's hash plus a hook that registers its
/// descriptor into a given registry. Links between descriptors are stored
/// as hashes and resolved through the registry, so the referenced type
/// does not need to be registered yet when the link is recorded — the
/// registry runs the hooks in a second phase after inserting the owner.
#[derive(Clone, Copy)]
pub struct TypeRef {
    hash: TypeHash,
    ensure: fn(&TypeRegistry),
}

impl TypeRef {
    /// Create a reference to `T`.
    pub fn of<T: Reflect>() -> Self {
        Self {
            hash: T::type_hash(),
            ensure: ensure_descriptor::<T>,
        }
    }

    /// The referenced type's identity hash.
    #[inline]
    pub fn hash(&self) -> TypeHash {
        self.hash
    }

    pub(crate) fn ensure_fn(&self) -> fn(&TypeRegistry) {
        self.ensure
    }
}

impl core::fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("TypeRef").field(&self.hash).finish()
    }
}

/// Register `T`'s descriptor into `registry` (idempotent).
pub(crate) fn ensure_descriptor<T: Reflect>(registry: &TypeRegistry) {
    registry.descriptor_of::<T>();
}

/// Contract for reflectable types.
///
/// See the [module documentation](self) for the safety contract.
pub unsafe trait Reflect: 'static {
    /// Human-readable, process-unique type name.
    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        core::any::type_name::<Self>()
    }

    /// Stable identity hash, derived from [`Reflect::type_name`].
    fn type_hash() -> TypeHash
    where
        Self: Sized,
    {
        TypeHash::of::<Self>()
    }

    /// Qualifier flags; empty for unqualified (pure) types.
    fn qualifiers() -> TypeQualifiers
    where
        Self: Sized,
    {
        TypeQualifiers::empty()
    }

    /// The declared super type, linking this type into an inheritance
    /// chain. `None` for chain roots and plain data types.
    fn super_link() -> Option<TypeRef>
    where
        Self: Sized,
    {
        None
    }

    /// The pure (unqualified) type. `None` means the type is its own pure
    /// type; pointer impls link to their pointee here.
    fn pure_link() -> Option<TypeRef>
    where
        Self: Sized,
    {
        None
    }

    /// Registration path: declare properties and methods on the builder.
    ///
    /// This is the only place a descriptor is ever mutated; once the
    /// registry publishes it, it is immutable for the process lifetime.
    fn describe(builder: &mut TypeBuilder)
    where
        Self: Sized,
    {
        let _ = builder;
    }

    /// Report the most-derived type of the object stored at `self`.
    ///
    /// The default returns the static hash, which is correct for
    /// non-polymorphic types. Hierarchy roots that are accessed through
    /// base references store a `TypeHash` field written by the
    /// most-derived constructor and override this to read it; downcasts
    /// are only validated through this accessor.
    fn runtime_hash(&self) -> TypeHash
    where
        Self: Sized,
    {
        Self::type_hash()
    }
}

/// Hash of `T`'s pure type (itself when unqualified).
pub(crate) fn pure_hash_of<T: Reflect>() -> TypeHash {
    match T::pure_link() {
        Some(link) => link.hash(),
        None => T::type_hash(),
    }
}

macro_rules! impl_reflect_leaf {
    ($($ty:ty),* $(,)?) => {
        $(
            unsafe impl Reflect for $ty {}
        )*
    };
}

impl_reflect_leaf!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, (),
    String,
);

unsafe impl<T: Reflect> Reflect for *mut T {
    fn qualifiers() -> TypeQualifiers {
        TypeQualifiers::POINTER | TypeQualifiers::MUTABLE
    }

    fn pure_link() -> Option<TypeRef> {
        Some(TypeRef::of::<T>())
    }
}

unsafe impl<T: Reflect> Reflect for *const T {
    fn qualifiers() -> TypeQualifiers {
        TypeQualifiers::POINTER | TypeQualifiers::CONST
    }

    fn pure_link() -> Option<TypeRef> {
        Some(TypeRef::of::<T>())
    }
}

// Erased callable signature types, used as method-type descriptors.
macro_rules! impl_reflect_signature {
    ($($arg:ident),*) => {
        unsafe impl<Ret: Reflect $(, $arg: Reflect)*> Reflect for fn($($arg),*) -> Ret {}
    };
}

impl_reflect_signature!();
impl_reflect_signature!(A0);
impl_reflect_signature!(A0, A1);
impl_reflect_signature!(A0, A1, A2);
impl_reflect_signature!(A0, A1, A2, A3);
