//! Runtime type metadata for types that opt in.
//!
//! `reflekt-core` maintains a graph of [`TypeDescriptor`] nodes — one per
//! reflectable type, holding its identity hash, optional super link, and
//! name-keyed property/method maps — inside an append-only
//! [`TypeRegistry`]. On top of the graph it provides:
//!
//! - type-erased field access by name, including container-valued fields
//!   traversed through a uniform opaque cursor;
//! - type-erased method invocation by name, with signature narrowing via
//!   safe downcast;
//! - a safe polymorphic cast combining static super-chain checks with the
//!   object's own runtime descriptor.
//!
//! Types opt in by implementing the [`Reflect`] contract (normally done
//! by a code-generation hook; the tests implement it by hand). The
//! engine owns no reflected instances, performs no I/O, and degrades
//! every runtime lookup failure to `None`/default rather than panicking.

mod cast;
mod container;
mod descriptor;
mod error;
mod method;
mod property;
mod qualifiers;
mod reflect;
mod registry;
mod type_hash;

pub use cast::{is_same, is_same_type};
pub use container::{
    ContainerInfo, ContainerOps, ContainerShape, ElementIter, ErasedIter, ITER_STORAGE_BYTES,
    IterOps, MapEntry, ReflectArray, ReflectMap, ReflectSet,
};
pub use descriptor::{TypeBuilder, TypeDescriptor};
pub use error::{InvokeError, RegistrationError};
pub use method::{
    ConstMemberTag, ErasedCall, MemberTag, MethodDescriptor, MethodFn, MethodKind, StaticTag,
};
pub use property::PropertyDescriptor;
pub use qualifiers::TypeQualifiers;
pub use reflect::{Reflect, TypeRef};
pub use registry::{DuplicatePolicy, TypeRegistry};
pub use type_hash::{TypeHash, hash_constants};

/// Descriptor lookup against the process-wide registry.
pub fn descriptor_of<T: Reflect>() -> &'static TypeDescriptor {
    TypeRegistry::global().descriptor_of::<T>()
}

/// Safe cast against the process-wide registry.
pub fn cast_ref<'a, To: Reflect, From: Reflect>(from: &'a From) -> Option<&'a To> {
    TypeRegistry::global().cast_ref(from)
}

/// Mutable safe cast against the process-wide registry.
pub fn cast_mut<'a, To: Reflect, From: Reflect>(from: &'a mut From) -> Option<&'a mut To> {
    TypeRegistry::global().cast_mut(from)
}
