//! Per-type metadata nodes and their construction.
//!
//! A [`TypeDescriptor`] is one node in the descriptor graph: identity,
//! optional super link, pure link, and the property/method maps. Links to
//! other descriptors are stored as [`TypeHash`] values and resolved
//! through the registry, never as pointers — the graph survives
//! registration in any order and can be inspected as plain data.
//!
//! Descriptors are built through [`TypeBuilder`] inside the owning type's
//! [`Reflect::describe`] call and are immutable once the registry
//! publishes them.
//!
//! [`Reflect::describe`]: crate::reflect::Reflect::describe

use std::fmt;

use rustc_hash::FxHashMap;

use crate::container::{ContainerShape, ReflectArray, ReflectMap, ReflectSet};
use crate::error::RegistrationError;
use crate::method::{MethodDescriptor, MethodFn};
use crate::property::PropertyDescriptor;
use crate::qualifiers::TypeQualifiers;
use crate::reflect::{Reflect, ensure_descriptor, pure_hash_of};
use crate::registry::{DuplicatePolicy, TypeRegistry};
use crate::type_hash::TypeHash;

/// Hook that lazily registers a dependency descriptor; collected during
/// building and run by the registry after the owner is inserted.
pub(crate) type EnsureFn = fn(&TypeRegistry);

/// Metadata node for one reflectable type.
pub struct TypeDescriptor {
    name: &'static str,
    hash: TypeHash,
    super_hash: Option<TypeHash>,
    pure_hash: TypeHash,
    qualifiers: TypeQualifiers,
    properties: FxHashMap<&'static str, PropertyDescriptor>,
    methods: FxHashMap<&'static str, MethodDescriptor>,
}

impl TypeDescriptor {
    /// Type name, exactly as the contract reported it.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Identity hash. Descriptor equality is defined by this alone.
    #[inline]
    pub fn hash(&self) -> TypeHash {
        self.hash
    }

    /// Hash of the declared super type, if any.
    #[inline]
    pub fn super_hash(&self) -> Option<TypeHash> {
        self.super_hash
    }

    /// Hash of the pure (unqualified) type; equals [`Self::hash`] for
    /// types that carry no qualifiers.
    #[inline]
    pub fn pure_hash(&self) -> TypeHash {
        self.pure_hash
    }

    /// Qualifier flags.
    #[inline]
    pub fn qualifiers(&self) -> TypeQualifiers {
        self.qualifiers
    }

    /// Whether this descriptor describes a pointer type.
    #[inline]
    pub fn is_pointer(&self) -> bool {
        self.qualifiers.is_pointer()
    }

    /// Look up a property by name. A miss returns `None`.
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    /// Look up a method by name. A miss returns `None`.
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.get(name)
    }

    /// Iterate over all registered properties (unspecified order).
    pub fn properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.values()
    }

    /// Iterate over all registered methods (unspecified order).
    pub fn methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.values()
    }

    /// Number of registered properties.
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Number of registered methods.
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for TypeDescriptor {}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("hash", &self.hash)
            .field("super_hash", &self.super_hash)
            .field("pure_hash", &self.pure_hash)
            .field("qualifiers", &self.qualifiers)
            .field("properties", &self.properties.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Builder for a [`TypeDescriptor`], live only during the owning type's
/// registration path.
pub struct TypeBuilder {
    name: &'static str,
    hash: TypeHash,
    super_hash: Option<TypeHash>,
    pure_hash: TypeHash,
    qualifiers: TypeQualifiers,
    properties: FxHashMap<&'static str, PropertyDescriptor>,
    methods: FxHashMap<&'static str, MethodDescriptor>,
    deps: Vec<EnsureFn>,
    policy: DuplicatePolicy,
    error: Option<RegistrationError>,
}

impl TypeBuilder {
    pub(crate) fn new<T: Reflect>(policy: DuplicatePolicy) -> Self {
        let mut deps = Vec::new();
        let super_hash = T::super_link().map(|link| {
            deps.push(link.ensure_fn());
            link.hash()
        });
        if let Some(link) = T::pure_link() {
            deps.push(link.ensure_fn());
        }
        Self {
            name: T::type_name(),
            hash: T::type_hash(),
            super_hash,
            pure_hash: pure_hash_of::<T>(),
            qualifiers: T::qualifiers(),
            properties: FxHashMap::default(),
            methods: FxHashMap::default(),
            deps,
            policy,
            error: None,
        }
    }

    /// Declare a scalar field at `offset` bytes into the owner's layout.
    ///
    /// `P` is the field's declared type; the `Clone` bound captures the
    /// copy-assignment thunk used by `set`/`set_raw`.
    pub fn property<P: Reflect + Clone>(&mut self, name: &'static str, offset: usize) -> &mut Self {
        let descriptor = PropertyDescriptor::new::<P>(self.hash, name, offset);
        self.add_property(name, descriptor, &[ensure_descriptor::<P>]);
        self
    }

    /// Declare an array-shaped container field (for example `Vec<T>`).
    pub fn array_property<C: ReflectArray + Clone>(
        &mut self,
        name: &'static str,
        offset: usize,
    ) -> &mut Self {
        let shape = ContainerShape::Array {
            element: C::Element::type_hash(),
        };
        let descriptor = PropertyDescriptor::new::<C>(self.hash, name, offset)
            .with_container(shape, C::container_ops());
        self.add_property(
            name,
            descriptor,
            &[ensure_descriptor::<C>, ensure_descriptor::<C::Element>],
        );
        self
    }

    /// Declare a set-shaped container field (for example `HashSet<T>`).
    pub fn set_property<C: ReflectSet + Clone>(
        &mut self,
        name: &'static str,
        offset: usize,
    ) -> &mut Self {
        let shape = ContainerShape::Set {
            element: C::Element::type_hash(),
            key: C::Key::type_hash(),
        };
        let descriptor = PropertyDescriptor::new::<C>(self.hash, name, offset)
            .with_container(shape, C::container_ops());
        self.add_property(
            name,
            descriptor,
            &[
                ensure_descriptor::<C>,
                ensure_descriptor::<C::Element>,
                ensure_descriptor::<C::Key>,
            ],
        );
        self
    }

    /// Declare a map-shaped container field (for example `HashMap<K, V>`).
    ///
    /// The element type iterated over is [`MapEntry<K, V>`], a record
    /// holding the key and value handles at fixed byte offsets.
    ///
    /// [`MapEntry<K, V>`]: crate::container::MapEntry
    pub fn map_property<C: ReflectMap + Clone>(
        &mut self,
        name: &'static str,
        offset: usize,
    ) -> &mut Self {
        let descriptor = PropertyDescriptor::new::<C>(self.hash, name, offset)
            .with_container(C::entry_shape(), C::container_ops());
        self.add_property(
            name,
            descriptor,
            &[
                ensure_descriptor::<C>,
                ensure_descriptor::<C::Key>,
                ensure_descriptor::<C::Value>,
            ],
        );
        self
    }

    /// Declare a callable member.
    ///
    /// Accepts member (`fn(&mut Owner, ..) -> R`), const-member
    /// (`fn(&Owner, ..) -> R`), and static (`fn(..) -> R`) function
    /// pointers; the kind, signature, and erased invoker are deduced from
    /// the pointer type.
    pub fn method<M, F: MethodFn<M>>(&mut self, name: &'static str, f: F) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        if self.policy == DuplicatePolicy::Reject && self.methods.contains_key(name) {
            self.error = Some(RegistrationError::DuplicateMethod {
                owner: self.name,
                name,
            });
            return self;
        }
        let signature = F::signature();
        self.deps.push(signature.ensure_fn());
        self.methods
            .insert(name, MethodDescriptor::from_fn(self.hash, name, f));
        self
    }

    fn add_property(
        &mut self,
        name: &'static str,
        descriptor: PropertyDescriptor,
        deps: &[EnsureFn],
    ) {
        if self.error.is_some() {
            return;
        }
        if self.policy == DuplicatePolicy::Reject && self.properties.contains_key(name) {
            self.error = Some(RegistrationError::DuplicateProperty {
                owner: self.name,
                name,
            });
            return;
        }
        self.properties.insert(name, descriptor);
        self.deps.extend_from_slice(deps);
    }

    pub(crate) fn finish(self) -> Result<(TypeDescriptor, Vec<EnsureFn>), RegistrationError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok((
            TypeDescriptor {
                name: self.name,
                hash: self.hash,
                super_hash: self.super_hash,
                pure_hash: self.pure_hash,
                qualifiers: self.qualifiers,
                properties: self.properties,
                methods: self.methods,
            },
            self.deps,
        ))
    }
}
