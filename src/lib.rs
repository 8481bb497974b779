//! Runtime type metadata: descriptor graph, registry, type-erased
//! property access, method invocation, and safe polymorphic casts.
//!
//! This crate re-exports the engine from `reflekt-core`. See the
//! [`Reflect`] contract for how a type opts in, and [`TypeRegistry`] for
//! lookup and casting.

pub use reflekt_core::{
    ConstMemberTag, ContainerInfo, ContainerOps, ContainerShape, DuplicatePolicy, ElementIter,
    ErasedCall, ErasedIter, ITER_STORAGE_BYTES, InvokeError, IterOps, MapEntry, MemberTag,
    MethodDescriptor, MethodFn, MethodKind, PropertyDescriptor, Reflect, ReflectArray, ReflectMap,
    ReflectSet, RegistrationError, StaticTag, TypeBuilder, TypeDescriptor, TypeHash,
    TypeQualifiers, TypeRef, TypeRegistry, cast_mut, cast_ref, descriptor_of, hash_constants,
    is_same, is_same_type,
};

/// Commonly used items.
pub mod prelude {
    pub use crate::{
        DuplicatePolicy, MapEntry, MethodKind, PropertyDescriptor, Reflect, TypeBuilder,
        TypeDescriptor, TypeHash, TypeRef, TypeRegistry, cast_mut, cast_ref, descriptor_of,
    };
}
