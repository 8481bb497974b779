//! Registry bring-up, duplicate policy, and isolation behavior.

use core::mem::offset_of;

use reflekt::prelude::*;
use reflekt::RegistrationError;

#[repr(C)]
#[derive(Clone)]
struct Creature {
    type_hash: TypeHash,
    age: u32,
}

unsafe impl Reflect for Creature {
    fn describe(builder: &mut TypeBuilder) {
        builder.property::<u32>("age", offset_of!(Creature, age));
    }

    fn runtime_hash(&self) -> TypeHash {
        self.type_hash
    }
}

#[repr(C)]
#[derive(Clone)]
struct Wolf {
    base: Creature,
    pack: u32,
}

unsafe impl Reflect for Wolf {
    fn super_link() -> Option<TypeRef> {
        Some(TypeRef::of::<Creature>())
    }

    fn describe(builder: &mut TypeBuilder) {
        builder.property::<u32>("pack", offset_of!(Wolf, pack));
    }

    fn runtime_hash(&self) -> TypeHash {
        self.base.type_hash
    }
}

#[repr(C)]
#[derive(Clone)]
struct DireWolf {
    base: Wolf,
    scars: u32,
}

unsafe impl Reflect for DireWolf {
    fn super_link() -> Option<TypeRef> {
        Some(TypeRef::of::<Wolf>())
    }

    fn runtime_hash(&self) -> TypeHash {
        self.base.base.type_hash
    }
}

/// Registers its single property twice under the same name.
#[derive(Clone)]
struct Shadowed {
    first: i32,
    second: i32,
}

unsafe impl Reflect for Shadowed {
    fn describe(builder: &mut TypeBuilder) {
        builder
            .property::<i32>("value", offset_of!(Shadowed, first))
            .property::<i32>("value", offset_of!(Shadowed, second));
    }
}

#[test]
fn leaf_first_registration_builds_whole_chain() {
    let registry = TypeRegistry::new();

    // Registering only the most-derived type must pull in every ancestor,
    // regardless of declaration order across init units.
    let leaf = registry.descriptor_of::<DireWolf>();
    assert_eq!(leaf.super_hash(), Some(TypeHash::of::<Wolf>()));
    assert!(registry.get(TypeHash::of::<Wolf>()).is_some());
    assert!(registry.get(TypeHash::of::<Creature>()).is_some());
    assert!(registry.is_child_of::<Creature, DireWolf>());
}

#[test]
fn duplicate_name_overrides_by_default() {
    let registry = TypeRegistry::new();
    assert_eq!(registry.policy(), DuplicatePolicy::Override);

    let descriptor = registry.descriptor_of::<Shadowed>();
    assert_eq!(descriptor.property_count(), 1);

    // Last registration wins: the surviving entry reads the second field.
    let value = descriptor.property("value").unwrap();
    let shadowed = Shadowed {
        first: 1,
        second: 2,
    };
    assert_eq!(value.get::<i32, _>(&registry, &shadowed), Some(&2));
}

#[test]
fn duplicate_name_rejected_under_reject_policy() {
    let registry = TypeRegistry::with_policy(DuplicatePolicy::Reject);
    let error = registry.try_descriptor_of::<Shadowed>().unwrap_err();
    assert_eq!(
        error,
        RegistrationError::DuplicateProperty {
            owner: core::any::type_name::<Shadowed>(),
            name: "value",
        }
    );
    // The failed type was not published.
    assert!(registry.get(TypeHash::of::<Shadowed>()).is_none());
}

#[test]
fn registries_are_isolated_instances() {
    let a = TypeRegistry::new();
    let b = TypeRegistry::new();

    a.descriptor_of::<Creature>();
    assert!(a.get(TypeHash::of::<Creature>()).is_some());
    assert!(b.get(TypeHash::of::<Creature>()).is_none());
}

#[test]
fn name_lookup_matches_hash_lookup() {
    let registry = TypeRegistry::new();
    let descriptor = registry.descriptor_of::<Wolf>();

    let by_name = registry.get_by_name(descriptor.name()).unwrap();
    assert!(core::ptr::eq(by_name, descriptor));
    assert!(registry.get_by_name("not::a::Type").is_none());
}

#[test]
fn descriptor_metadata_is_exposed() {
    let registry = TypeRegistry::new();
    let descriptor = registry.descriptor_of::<Wolf>();

    assert_eq!(descriptor.hash(), TypeHash::of::<Wolf>());
    assert_eq!(descriptor.pure_hash(), descriptor.hash());
    assert!(!descriptor.is_pointer());
    assert_eq!(descriptor.property_count(), 1);
    assert_eq!(descriptor.method_count(), 0);

    let pointer = registry.descriptor_of::<*mut Wolf>();
    assert!(pointer.is_pointer());
    assert_eq!(pointer.pure_hash(), descriptor.hash());
}
