//! Field metadata and type-erased accessors.
//!
//! A [`PropertyDescriptor`] records a field's declared type, its byte
//! offset inside the owner's layout, and a captured copy-assignment thunk.
//! The checked accessors ([`PropertyDescriptor::get`],
//! [`PropertyDescriptor::set`]) validate both the instance and the
//! requested type before touching memory and degrade to `None`/`false` on
//! any mismatch; the raw accessors skip validation entirely and are the
//! documented unsafe escape hatch for privileged callers such as
//! serializers.
//!
//! Type compatibility rules:
//!
//! - value fields require an exact declared-type match in both directions;
//! - pointer fields may be *read* as any ancestor of the declared pointee
//!   and *written* with any descendant of it, mirroring the cast rules.

use std::fmt;

use crate::container::{ContainerInfo, ContainerOps, ContainerShape, ElementIter, ErasedIter};
use crate::qualifiers::TypeQualifiers;
use crate::reflect::{Reflect, pure_hash_of};
use crate::registry::TypeRegistry;
use crate::type_hash::TypeHash;

/// Copy-assignment thunk: clones the value at `src` into the slot at
/// `dst`. Captured per concrete field type at registration time.
pub(crate) type AssignFn = unsafe fn(*mut (), *const ());

unsafe fn assign_value<P: Clone>(dst: *mut (), src: *const ()) {
    let dst = unsafe { &mut *dst.cast::<P>() };
    let src = unsafe { &*src.cast::<P>() };
    dst.clone_from(src);
}

/// Field metadata plus type-erased get/set.
pub struct PropertyDescriptor {
    owner: TypeHash,
    property_type: TypeHash,
    pure_type: TypeHash,
    type_qualifiers: TypeQualifiers,
    offset: usize,
    name: &'static str,
    assign: AssignFn,
    container: Option<ContainerInfo>,
}

impl PropertyDescriptor {
    pub(crate) fn new<P: Reflect + Clone>(
        owner: TypeHash,
        name: &'static str,
        offset: usize,
    ) -> Self {
        Self {
            owner,
            property_type: P::type_hash(),
            pure_type: pure_hash_of::<P>(),
            type_qualifiers: P::qualifiers(),
            offset,
            name,
            assign: assign_value::<P>,
            container: None,
        }
    }

    pub(crate) fn with_container(mut self, shape: ContainerShape, ops: ContainerOps) -> Self {
        self.container = Some(ContainerInfo::new(shape, ops));
        self
    }

    /// Hash of the owning type.
    #[inline]
    pub fn owner_hash(&self) -> TypeHash {
        self.owner
    }

    /// Hash of the declared field type.
    #[inline]
    pub fn type_hash(&self) -> TypeHash {
        self.property_type
    }

    /// Hash of the declared field type's pure form.
    #[inline]
    pub fn pure_type_hash(&self) -> TypeHash {
        self.pure_type
    }

    /// Byte offset of the field inside the owner's layout.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Field name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Container metadata, if this is an array/set/map-valued field.
    #[inline]
    pub fn container(&self) -> Option<&ContainerInfo> {
        self.container.as_ref()
    }

    /// Read the field as `P`.
    ///
    /// Returns a reference to the field slot when `P` matches the declared
    /// type — exactly for value fields; for pointer fields, `P` may also
    /// be a pointer to any ancestor of the declared pointee. Any mismatch
    /// (including an instance that is not the owning type or a descendant
    /// of it) returns `None`.
    pub fn get<'a, P: Reflect, O: Reflect>(
        &self,
        registry: &TypeRegistry,
        instance: &'a O,
    ) -> Option<&'a P> {
        if !self.instance_compatible(registry, instance) || !self.read_compatible::<P>(registry) {
            return None;
        }
        let base = (instance as *const O).cast::<u8>();
        Some(unsafe { &*base.add(self.offset).cast::<P>() })
    }

    /// Mutable variant of [`Self::get`], with the same compatibility rules.
    pub fn get_mut<'a, P: Reflect, O: Reflect>(
        &self,
        registry: &TypeRegistry,
        instance: &'a mut O,
    ) -> Option<&'a mut P> {
        if !self.instance_compatible(registry, instance) || !self.read_compatible::<P>(registry) {
            return None;
        }
        let base = (instance as *mut O).cast::<u8>();
        Some(unsafe { &mut *base.add(self.offset).cast::<P>() })
    }

    /// Write the field from `value`.
    ///
    /// Value fields require `V` to be exactly the declared type; pointer
    /// fields also accept a pointer to any descendant of the declared
    /// pointee. On a match the write goes through the captured
    /// copy-assignment thunk and `true` is returned; on any mismatch the
    /// field is left unchanged and `false` is returned.
    pub fn set<V: Reflect, O: Reflect>(
        &self,
        registry: &TypeRegistry,
        instance: &mut O,
        value: &V,
    ) -> bool {
        if !self.instance_compatible(registry, instance) || !self.write_compatible::<V>(registry) {
            return false;
        }
        unsafe {
            self.set_raw((instance as *mut O).cast(), (value as *const V).cast());
        }
        true
    }

    /// Compute the raw address of the field inside `instance`.
    ///
    /// # Safety
    ///
    /// Unchecked offset arithmetic: `instance` must point to a live object
    /// of the owning type (or a descendant laid out with the owner as
    /// prefix). No type validation is performed.
    pub unsafe fn raw_address(&self, instance: *const ()) -> *const () {
        unsafe { instance.cast::<u8>().add(self.offset).cast() }
    }

    /// Write the field through the captured thunk with no validation.
    ///
    /// # Safety
    ///
    /// `instance` must satisfy the [`Self::raw_address`] contract and
    /// `value` must point to a live value of the declared field type.
    /// Anything else is undefined behavior; this path exists for
    /// privileged callers that have already validated types.
    pub unsafe fn set_raw(&self, instance: *mut (), value: *const ()) {
        let slot = unsafe { instance.cast::<u8>().add(self.offset) };
        unsafe { (self.assign)(slot.cast::<()>(), value) };
    }

    /// Erased cursor positioned at the first element of a container field.
    ///
    /// Returns `None` for scalar fields or when the instance fails the
    /// owner check.
    pub fn begin_iter<'a, O: Reflect>(
        &self,
        registry: &TypeRegistry,
        instance: &'a O,
    ) -> Option<ErasedIter<'a>> {
        let container = self.container.as_ref()?;
        if !self.instance_compatible(registry, instance) {
            return None;
        }
        let base = unsafe { self.raw_address((instance as *const O).cast()) };
        Some(unsafe { container.begin(base) })
    }

    /// Erased cursor positioned one past the last element; pairs with
    /// [`Self::begin_iter`] for manual traversal.
    pub fn end_iter<'a, O: Reflect>(
        &self,
        registry: &TypeRegistry,
        instance: &'a O,
    ) -> Option<ErasedIter<'a>> {
        let container = self.container.as_ref()?;
        if !self.instance_compatible(registry, instance) {
            return None;
        }
        let base = unsafe { self.raw_address((instance as *const O).cast()) };
        Some(unsafe { container.end(base) })
    }

    /// Iterate the elements of a container field.
    pub fn elements<'a, O: Reflect>(
        &self,
        registry: &TypeRegistry,
        instance: &'a O,
    ) -> Option<ElementIter<'a>> {
        let begin = self.begin_iter(registry, instance)?;
        let end = self.end_iter(registry, instance)?;
        Some(ElementIter::new(begin, end))
    }

    fn instance_compatible<O: Reflect>(&self, registry: &TypeRegistry, instance: &O) -> bool {
        let runtime = instance.runtime_hash();
        runtime == self.owner || registry.is_child(self.owner, runtime)
    }

    fn read_compatible<P: Reflect>(&self, registry: &TypeRegistry) -> bool {
        let requested = P::type_hash();
        if requested == self.property_type {
            return true;
        }
        if self.type_qualifiers.is_pointer() && P::qualifiers().is_pointer() {
            // Reading a pointer slot as a base pointer is allowed.
            return registry.is_child(pure_hash_of::<P>(), self.pure_type);
        }
        false
    }

    fn write_compatible<V: Reflect>(&self, registry: &TypeRegistry) -> bool {
        let incoming = V::type_hash();
        if incoming == self.property_type {
            return true;
        }
        if self.type_qualifiers.is_pointer() && V::qualifiers().is_pointer() {
            // Storing a descendant pointer into a base-pointer slot is allowed.
            return registry.is_child(self.pure_type, pure_hash_of::<V>());
        }
        false
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("owner", &self.owner)
            .field("type", &self.property_type)
            .field("offset", &self.offset)
            .field("name", &self.name)
            .field("container", &self.container.as_ref().map(|c| c.shape()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeBuilder;
    use crate::registry::TypeRegistry;

    #[derive(Clone)]
    struct Gauge {
        level: i32,
        scale: f32,
    }

    unsafe impl Reflect for Gauge {
        fn describe(builder: &mut TypeBuilder) {
            builder
                .property::<i32>("level", core::mem::offset_of!(Gauge, level))
                .property::<f32>("scale", core::mem::offset_of!(Gauge, scale));
        }
    }

    #[test]
    fn scalar_round_trip() {
        let registry = TypeRegistry::new();
        let descriptor = registry.descriptor_of::<Gauge>();
        let mut gauge = Gauge {
            level: 3,
            scale: 1.5,
        };

        let level = descriptor.property("level").unwrap();
        assert_eq!(level.get::<i32, _>(&registry, &gauge), Some(&3));
        assert!(level.set(&registry, &mut gauge, &42i32));
        assert_eq!(gauge.level, 42);
    }

    #[test]
    fn wrong_type_read_is_none() {
        let registry = TypeRegistry::new();
        let descriptor = registry.descriptor_of::<Gauge>();
        let gauge = Gauge {
            level: 3,
            scale: 1.5,
        };

        let level = descriptor.property("level").unwrap();
        assert_eq!(level.get::<f32, _>(&registry, &gauge), None);
        assert_eq!(level.get::<u32, _>(&registry, &gauge), None);
    }

    #[test]
    fn wrong_type_write_is_noop() {
        let registry = TypeRegistry::new();
        let descriptor = registry.descriptor_of::<Gauge>();
        let mut gauge = Gauge {
            level: 3,
            scale: 1.5,
        };

        let level = descriptor.property("level").unwrap();
        assert!(!level.set(&registry, &mut gauge, &2.0f32));
        assert!(!level.set(&registry, &mut gauge, &String::from("nope")));
        assert_eq!(gauge.level, 3);
    }

    #[test]
    fn wrong_instance_is_rejected() {
        let registry = TypeRegistry::new();
        let descriptor = registry.descriptor_of::<Gauge>();

        let stranger = 7u64;
        let level = descriptor.property("level").unwrap();
        assert_eq!(level.get::<i32, _>(&registry, &stranger), None);
    }

    #[test]
    fn get_mut_writes_through() {
        let registry = TypeRegistry::new();
        let descriptor = registry.descriptor_of::<Gauge>();
        let mut gauge = Gauge {
            level: 3,
            scale: 1.5,
        };

        let scale = descriptor.property("scale").unwrap();
        *scale.get_mut::<f32, _>(&registry, &mut gauge).unwrap() = 4.0;
        assert_eq!(gauge.scale, 4.0);
    }

    #[test]
    fn raw_access_bypasses_checks() {
        let registry = TypeRegistry::new();
        let descriptor = registry.descriptor_of::<Gauge>();
        let mut gauge = Gauge {
            level: 3,
            scale: 1.5,
        };

        let level = descriptor.property("level").unwrap();
        let value = 99i32;
        unsafe {
            level.set_raw((&mut gauge as *mut Gauge).cast(), (&value as *const i32).cast());
            let slot = level.raw_address((&gauge as *const Gauge).cast());
            assert_eq!(*slot.cast::<i32>(), 99);
        }
        assert_eq!(gauge.level, 99);
    }

    #[test]
    fn metadata_accessors() {
        let registry = TypeRegistry::new();
        let descriptor = registry.descriptor_of::<Gauge>();
        let level = descriptor.property("level").unwrap();

        assert_eq!(level.owner_hash(), TypeHash::of::<Gauge>());
        assert_eq!(level.type_hash(), TypeHash::of::<i32>());
        assert_eq!(level.pure_type_hash(), TypeHash::of::<i32>());
        assert_eq!(level.name(), "level");
        assert_eq!(level.offset(), core::mem::offset_of!(Gauge, level));
        assert!(level.container().is_none());
        assert!(level.begin_iter(&registry, &Gauge { level: 0, scale: 0.0 }).is_none());
    }
}
