//! Method metadata and type-erased invocation.
//!
//! A registered method is stored behind two layers of erasure. The inner
//! layer is a `Box<dyn ErasedCall<Ret, Args>>` — a callable seam
//! parameterized only by return type and argument tuple, never by the
//! owning class (the owning class is closed over by the thunk). The
//! outer layer is `Box<dyn Any>`, which lets descriptors of any signature
//! live in one map.
//!
//! Invocation reverses the erasure: [`MethodDescriptor::invoke`] narrows
//! the `dyn Any` back to the concrete `(Ret, Args)`-shaped box with the
//! language's safe downcast, exactly the way object casts recover
//! concrete types from erased pointers. A failed narrowing (wrong
//! signature) or an incompatible instance degrades to a default return
//! value and performs no call; `try_invoke` is the diagnostic variant.

use std::any::Any;
use std::fmt;

use crate::error::InvokeError;
use crate::reflect::{Reflect, TypeRef};
use crate::registry::TypeRegistry;
use crate::type_hash::TypeHash;

/// How a method binds to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Instance method taking `&mut Owner`.
    Member,
    /// Instance method taking `&Owner`.
    ConstMember,
    /// Associated function; ignores the instance.
    Static,
}

/// Erased callable seam: return type and argument tuple only.
pub trait ErasedCall<Ret, Args>: Send + Sync {
    /// Call through with an opaque instance pointer.
    ///
    /// # Safety
    ///
    /// For member kinds, `instance` must point to a live object of the
    /// owning type (or a descendant laid out with it as prefix), with
    /// exclusive access if the method mutates. Static thunks ignore it.
    unsafe fn call(&self, instance: *mut (), args: Args) -> Ret;
}

impl<Ret, Args, F> ErasedCall<Ret, Args> for F
where
    F: Fn(*mut (), Args) -> Ret + Send + Sync,
{
    unsafe fn call(&self, instance: *mut (), args: Args) -> Ret {
        self(instance, args)
    }
}

/// Type-erased callable metadata plus invocation.
pub struct MethodDescriptor {
    owner: TypeHash,
    signature: TypeHash,
    name: &'static str,
    kind: MethodKind,
    invoker: Box<dyn Any + Send + Sync>,
}

impl MethodDescriptor {
    pub(crate) fn from_fn<M, F: MethodFn<M>>(owner: TypeHash, name: &'static str, f: F) -> Self {
        Self {
            owner,
            signature: F::signature().hash(),
            name,
            kind: F::KIND,
            invoker: f.erase(),
        }
    }

    /// Hash of the owning type.
    #[inline]
    pub fn owner_hash(&self) -> TypeHash {
        self.owner
    }

    /// Identity of the erased callable signature (`fn(Args..) -> Ret`),
    /// registered as an ordinary type descriptor.
    #[inline]
    pub fn signature_hash(&self) -> TypeHash {
        self.signature
    }

    /// Method name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Member / const-member / static.
    #[inline]
    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    /// Invoke with a mutable instance; any failure degrades to
    /// `Ret::default()` with no call and no side effect.
    pub fn invoke<Ret, Args, O>(&self, registry: &TypeRegistry, instance: &mut O, args: Args) -> Ret
    where
        Ret: Default + 'static,
        Args: 'static,
        O: Reflect,
    {
        self.try_invoke(registry, instance, args).unwrap_or_default()
    }

    /// Diagnostic variant of [`Self::invoke`].
    pub fn try_invoke<Ret, Args, O>(
        &self,
        registry: &TypeRegistry,
        instance: &mut O,
        args: Args,
    ) -> Result<Ret, InvokeError>
    where
        Ret: 'static,
        Args: 'static,
        O: Reflect,
    {
        let call = self.narrow::<Ret, Args>()?;
        self.check_instance(registry, instance.runtime_hash())?;
        Ok(unsafe { call.call((instance as *mut O).cast(), args) })
    }

    /// Invoke through a shared instance; refuses mutating member methods.
    /// Any failure degrades to `Ret::default()`.
    pub fn invoke_const<Ret, Args, O>(
        &self,
        registry: &TypeRegistry,
        instance: &O,
        args: Args,
    ) -> Ret
    where
        Ret: Default + 'static,
        Args: 'static,
        O: Reflect,
    {
        self.try_invoke_const(registry, instance, args)
            .unwrap_or_default()
    }

    /// Diagnostic variant of [`Self::invoke_const`].
    pub fn try_invoke_const<Ret, Args, O>(
        &self,
        registry: &TypeRegistry,
        instance: &O,
        args: Args,
    ) -> Result<Ret, InvokeError>
    where
        Ret: 'static,
        Args: 'static,
        O: Reflect,
    {
        if self.kind == MethodKind::Member {
            return Err(InvokeError::RequiresMut { name: self.name });
        }
        let call = self.narrow::<Ret, Args>()?;
        self.check_instance(registry, instance.runtime_hash())?;
        // Const thunks never write through the pointer; the mutable cast
        // only satisfies the erased seam.
        Ok(unsafe { call.call((instance as *const O).cast_mut().cast(), args) })
    }

    fn narrow<Ret: 'static, Args: 'static>(
        &self,
    ) -> Result<&dyn ErasedCall<Ret, Args>, InvokeError> {
        self.invoker
            .downcast_ref::<Box<dyn ErasedCall<Ret, Args>>>()
            .map(|boxed| &**boxed)
            .ok_or(InvokeError::SignatureMismatch { name: self.name })
    }

    fn check_instance(
        &self,
        registry: &TypeRegistry,
        runtime: TypeHash,
    ) -> Result<(), InvokeError> {
        if self.kind == MethodKind::Static {
            return Ok(());
        }
        if runtime == self.owner || registry.is_child(self.owner, runtime) {
            return Ok(());
        }
        Err(InvokeError::IncompatibleInstance {
            owner: registry
                .get(self.owner)
                .map(|descriptor| descriptor.name())
                .unwrap_or("<unregistered>"),
        })
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("owner", &self.owner)
            .field("signature", &self.signature)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Marker for `fn(&mut Owner, ..) -> Ret` registrations.
pub struct MemberTag;
/// Marker for `fn(&Owner, ..) -> Ret` registrations.
pub struct ConstMemberTag;
/// Marker for `fn(..) -> Ret` registrations.
pub struct StaticTag;

/// Factory contract deducing owner, constness, return type, and argument
/// tuple purely from a function-pointer type, and producing the erased
/// invoker.
pub trait MethodFn<Marker>: 'static {
    /// Return type.
    type Ret: Reflect;
    /// Argument tuple.
    type Args: 'static;

    /// Deduced binding kind.
    const KIND: MethodKind;

    /// Reference to the erased signature type `fn(Args..) -> Ret`.
    fn signature() -> TypeRef;

    /// Produce the erased invoker (`Box<dyn Any>` wrapping a
    /// `Box<dyn ErasedCall<Ret, Args>>`).
    fn erase(self) -> Box<dyn Any + Send + Sync>;
}

macro_rules! impl_method_fn {
    ($($arg:ident : $idx:tt),*) => {
        impl<C: Reflect, Ret: Reflect $(, $arg: Reflect)*> MethodFn<MemberTag>
            for fn(&mut C $(, $arg)*) -> Ret
        {
            type Ret = Ret;
            type Args = ($($arg,)*);
            const KIND: MethodKind = MethodKind::Member;

            fn signature() -> TypeRef {
                TypeRef::of::<fn($($arg),*) -> Ret>()
            }

            fn erase(self) -> Box<dyn Any + Send + Sync> {
                let f = self;
                let thunk = move |instance: *mut (), _args: ($($arg,)*)| -> Ret {
                    let this = unsafe { &mut *instance.cast::<C>() };
                    f(this $(, _args.$idx)*)
                };
                Box::new(Box::new(thunk) as Box<dyn ErasedCall<Ret, ($($arg,)*)>>)
            }
        }

        impl<C: Reflect, Ret: Reflect $(, $arg: Reflect)*> MethodFn<ConstMemberTag>
            for fn(&C $(, $arg)*) -> Ret
        {
            type Ret = Ret;
            type Args = ($($arg,)*);
            const KIND: MethodKind = MethodKind::ConstMember;

            fn signature() -> TypeRef {
                TypeRef::of::<fn($($arg),*) -> Ret>()
            }

            fn erase(self) -> Box<dyn Any + Send + Sync> {
                let f = self;
                let thunk = move |instance: *mut (), _args: ($($arg,)*)| -> Ret {
                    let this = unsafe { &*instance.cast_const().cast::<C>() };
                    f(this $(, _args.$idx)*)
                };
                Box::new(Box::new(thunk) as Box<dyn ErasedCall<Ret, ($($arg,)*)>>)
            }
        }

        impl<Ret: Reflect $(, $arg: Reflect)*> MethodFn<StaticTag>
            for fn($($arg),*) -> Ret
        {
            type Ret = Ret;
            type Args = ($($arg,)*);
            const KIND: MethodKind = MethodKind::Static;

            fn signature() -> TypeRef {
                TypeRef::of::<fn($($arg),*) -> Ret>()
            }

            fn erase(self) -> Box<dyn Any + Send + Sync> {
                let f = self;
                let thunk = move |_instance: *mut (), _args: ($($arg,)*)| -> Ret {
                    f($(_args.$idx),*)
                };
                Box::new(Box::new(thunk) as Box<dyn ErasedCall<Ret, ($($arg,)*)>>)
            }
        }
    };
}

impl_method_fn!();
impl_method_fn!(A0: 0);
impl_method_fn!(A0: 0, A1: 1);
impl_method_fn!(A0: 0, A1: 1, A2: 2);
impl_method_fn!(A0: 0, A1: 1, A2: 2, A3: 3);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeBuilder;
    use crate::registry::TypeRegistry;

    #[derive(Clone)]
    struct Counter {
        value: i32,
    }

    impl Counter {
        fn bump(&mut self, amount: i32) {
            self.value += amount;
        }

        fn scaled(&self, factor: i32) -> i32 {
            self.value * factor
        }

        fn combine(a: i32, b: i32) -> i32 {
            a + b
        }
    }

    unsafe impl Reflect for Counter {
        fn describe(builder: &mut TypeBuilder) {
            builder
                .method("bump", Counter::bump as fn(&mut Counter, i32))
                .method("scaled", Counter::scaled as fn(&Counter, i32) -> i32)
                .method("combine", Counter::combine as fn(i32, i32) -> i32);
        }
    }

    #[test]
    fn member_invoke_matches_direct_call() {
        let registry = TypeRegistry::new();
        let descriptor = registry.descriptor_of::<Counter>();
        let mut counter = Counter { value: 1 };

        let bump = descriptor.method("bump").unwrap();
        assert_eq!(bump.kind(), MethodKind::Member);
        bump.invoke::<(), _, _>(&registry, &mut counter, (5,));
        assert_eq!(counter.value, 6);
    }

    #[test]
    fn const_member_invoke_returns_value() {
        let registry = TypeRegistry::new();
        let descriptor = registry.descriptor_of::<Counter>();
        let mut counter = Counter { value: 3 };

        let scaled = descriptor.method("scaled").unwrap();
        assert_eq!(scaled.kind(), MethodKind::ConstMember);
        let through_mut: i32 = scaled.invoke(&registry, &mut counter, (4,));
        assert_eq!(through_mut, 12);
        let through_ref: i32 = scaled.invoke_const(&registry, &counter, (2,));
        assert_eq!(through_ref, 6);
    }

    #[test]
    fn static_invoke_ignores_instance() {
        let registry = TypeRegistry::new();
        let descriptor = registry.descriptor_of::<Counter>();
        let counter = Counter { value: 0 };

        let combine = descriptor.method("combine").unwrap();
        assert_eq!(combine.kind(), MethodKind::Static);
        let sum: i32 = combine.invoke_const(&registry, &counter, (2, 3));
        assert_eq!(sum, 5);
    }

    #[test]
    fn mismatched_signature_is_noop_default() {
        let registry = TypeRegistry::new();
        let descriptor = registry.descriptor_of::<Counter>();
        let mut counter = Counter { value: 1 };

        let bump = descriptor.method("bump").unwrap();
        // Wrong argument type: no call, default return, state untouched.
        let result: i32 = bump.invoke(&registry, &mut counter, (String::from("five"),));
        assert_eq!(result, 0);
        assert_eq!(counter.value, 1);

        let err = bump
            .try_invoke::<(), _, _>(&registry, &mut counter, (2.5f64,))
            .unwrap_err();
        assert!(matches!(err, InvokeError::SignatureMismatch { name: "bump" }));
        assert_eq!(counter.value, 1);
    }

    #[test]
    fn member_method_requires_mut_instance() {
        let registry = TypeRegistry::new();
        let descriptor = registry.descriptor_of::<Counter>();
        let counter = Counter { value: 1 };

        let bump = descriptor.method("bump").unwrap();
        let err = bump
            .try_invoke_const::<(), _, _>(&registry, &counter, (5,))
            .unwrap_err();
        assert!(matches!(err, InvokeError::RequiresMut { name: "bump" }));
        assert_eq!(counter.value, 1);
    }

    #[test]
    fn incompatible_instance_is_rejected() {
        let registry = TypeRegistry::new();
        let descriptor = registry.descriptor_of::<Counter>();

        let bump = descriptor.method("bump").unwrap();
        let mut stranger = 9u64;
        let err = bump
            .try_invoke::<(), _, _>(&registry, &mut stranger, (5,))
            .unwrap_err();
        assert!(matches!(err, InvokeError::IncompatibleInstance { .. }));
    }

    #[test]
    fn method_lookup_miss_is_none() {
        let registry = TypeRegistry::new();
        let descriptor = registry.descriptor_of::<Counter>();
        assert!(descriptor.method("reset").is_none());
    }

    #[test]
    fn signature_descriptor_is_registered() {
        let registry = TypeRegistry::new();
        let descriptor = registry.descriptor_of::<Counter>();
        let scaled = descriptor.method("scaled").unwrap();

        assert_eq!(scaled.signature_hash(), TypeHash::of::<fn(i32) -> i32>());
        assert!(registry.get(scaled.signature_hash()).is_some());
    }
}
