//! Container-valued properties and type-erased iteration.
//!
//! Array, set, and map fields are traversed through one uniform cursor,
//! [`ErasedIter`]: a fixed-capacity opaque state buffer plus a table of
//! captured operations (advance, optional retreat, element access, clone,
//! drop, compare). The concrete cursor type — a raw slice range for
//! `Vec`, an adapted hash-table iterator for `HashSet`/`HashMap` — is
//! written into the buffer by captured begin/end thunks, so call sites
//! never know the concrete container type.
//!
//! A compile-time assertion in each op-table constructor guards against a
//! concrete cursor outgrowing the buffer.
//!
//! # Map elements
//!
//! Hash maps do not expose their key-value pairs as addressable records,
//! so the element a map cursor yields is a [`MapEntry`] record kept
//! inline in the cursor: a `#[repr(C)]` pair of key/value handles at
//! fixed byte offsets. [`ContainerShape::Map`] reports those offsets, and
//! the handles point into the underlying container.

use std::collections::{HashMap, HashSet, hash_map, hash_set};
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};
use std::ptr;

use crate::reflect::Reflect;
use crate::type_hash::TypeHash;

/// Capacity of the opaque cursor buffer.
///
/// Sized to fit the std hash-table iterators (whose control-group state is
/// 16-byte aligned on SSE2 targets) with headroom; anything larger is
/// rejected at compile time by the op-table constructors.
pub const ITER_STORAGE_BYTES: usize = 96;

const ITER_STORAGE_ALIGN: usize = 16;

#[repr(C, align(16))]
struct IterStorage([MaybeUninit<u8>; ITER_STORAGE_BYTES]);

impl IterStorage {
    fn uninit() -> Self {
        Self([MaybeUninit::uninit(); ITER_STORAGE_BYTES])
    }

    fn as_ptr(&self) -> *const u8 {
        self.0.as_ptr().cast()
    }

    fn as_mut_ptr(&mut self) -> *mut u8 {
        self.0.as_mut_ptr().cast()
    }
}

/// Captured cursor operations for one concrete container type.
#[derive(Clone, Copy)]
pub struct IterOps {
    advance: unsafe fn(*mut u8),
    retreat: Option<unsafe fn(*mut u8)>,
    element: unsafe fn(*const u8) -> *const (),
    clone: unsafe fn(*mut u8, *const u8),
    drop: unsafe fn(*mut u8),
    eq: unsafe fn(*const u8, *const u8) -> bool,
}

impl IterOps {
    /// Assemble a cursor op table for a custom container.
    ///
    /// Each hook receives the opaque state buffer; `retreat` is `None`
    /// for forward-only containers. The hooks must agree on one concrete
    /// cursor type that fits [`ITER_STORAGE_BYTES`].
    pub fn new(
        advance: unsafe fn(*mut u8),
        retreat: Option<unsafe fn(*mut u8)>,
        element: unsafe fn(*const u8) -> *const (),
        clone: unsafe fn(*mut u8, *const u8),
        drop: unsafe fn(*mut u8),
        eq: unsafe fn(*const u8, *const u8) -> bool,
    ) -> Self {
        Self {
            advance,
            retreat,
            element,
            clone,
            drop,
            eq,
        }
    }
}

/// Captured begin/end construction plus the cursor op table.
#[derive(Clone, Copy)]
pub struct ContainerOps {
    begin: unsafe fn(*const (), *mut u8),
    end: unsafe fn(*const (), *mut u8),
    iter: IterOps,
}

impl ContainerOps {
    /// Assemble container ops for a custom container: `begin`/`end`
    /// write a cursor for the container at the given address into the
    /// state buffer.
    pub fn new(
        begin: unsafe fn(*const (), *mut u8),
        end: unsafe fn(*const (), *mut u8),
        iter: IterOps,
    ) -> Self {
        Self { begin, end, iter }
    }
}

/// Shape metadata of a container-valued property.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerShape {
    /// Ordered sequence; elements are the values themselves.
    Array {
        /// Element type hash.
        element: TypeHash,
    },
    /// Unordered unique collection; the key is the element.
    Set {
        /// Element type hash.
        element: TypeHash,
        /// Key type hash.
        key: TypeHash,
    },
    /// Key-value collection; elements are [`MapEntry`] records.
    Map {
        /// Element ([`MapEntry`]) type hash.
        element: TypeHash,
        /// Key type hash.
        key: TypeHash,
        /// Value type hash.
        value: TypeHash,
        /// Byte offset of the key handle within the element record.
        key_offset: usize,
        /// Byte offset of the value handle within the element record.
        value_offset: usize,
    },
}

impl ContainerShape {
    /// Hash of the element type a cursor yields.
    pub fn element_type(&self) -> TypeHash {
        match *self {
            ContainerShape::Array { element }
            | ContainerShape::Set { element, .. }
            | ContainerShape::Map { element, .. } => element,
        }
    }

    /// Hash of the key type, for sets and maps.
    pub fn key_type(&self) -> Option<TypeHash> {
        match *self {
            ContainerShape::Array { .. } => None,
            ContainerShape::Set { key, .. } | ContainerShape::Map { key, .. } => Some(key),
        }
    }

    /// Hash of the mapped value type, for maps.
    pub fn value_type(&self) -> Option<TypeHash> {
        match *self {
            ContainerShape::Map { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Key/value byte offsets within the element record, for maps.
    pub fn entry_offsets(&self) -> Option<(usize, usize)> {
        match *self {
            ContainerShape::Map {
                key_offset,
                value_offset,
                ..
            } => Some((key_offset, value_offset)),
            _ => None,
        }
    }
}

/// Container metadata attached to a property descriptor.
pub struct ContainerInfo {
    shape: ContainerShape,
    ops: ContainerOps,
}

impl ContainerInfo {
    pub(crate) fn new(shape: ContainerShape, ops: ContainerOps) -> Self {
        Self { shape, ops }
    }

    /// Shape metadata (element/key/value types and entry offsets).
    pub fn shape(&self) -> ContainerShape {
        self.shape
    }

    /// Hash of the element type a cursor yields.
    pub fn element_type(&self) -> TypeHash {
        self.shape.element_type()
    }

    pub(crate) unsafe fn begin<'a>(&self, container: *const ()) -> ErasedIter<'a> {
        let mut iter = ErasedIter::raw(self.ops.iter, self.shape.element_type());
        unsafe { (self.ops.begin)(container, iter.storage.as_mut_ptr()) };
        iter
    }

    pub(crate) unsafe fn end<'a>(&self, container: *const ()) -> ErasedIter<'a> {
        let mut iter = ErasedIter::raw(self.ops.iter, self.shape.element_type());
        unsafe { (self.ops.end)(container, iter.storage.as_mut_ptr()) };
        iter
    }
}

/// Uniform cursor over a container-valued property.
///
/// The concrete cursor lives in an opaque fixed-capacity buffer; all
/// behavior goes through the captured op table. The lifetime parameter
/// ties the cursor to the borrow of the instance it iterates.
pub struct ErasedIter<'a> {
    storage: IterStorage,
    ops: IterOps,
    element_type: TypeHash,
    _borrow: PhantomData<&'a ()>,
}

impl ErasedIter<'_> {
    fn raw(ops: IterOps, element_type: TypeHash) -> Self {
        Self {
            storage: IterStorage::uninit(),
            ops,
            element_type,
            _borrow: PhantomData,
        }
    }

    /// Step to the next element; saturates at the end position.
    pub fn advance(&mut self) {
        unsafe { (self.ops.advance)(self.storage.as_mut_ptr()) };
    }

    /// Step back one element. Returns `false` when the underlying
    /// container only supports forward traversal.
    pub fn retreat(&mut self) -> bool {
        match self.ops.retreat {
            Some(retreat) => {
                unsafe { retreat(self.storage.as_mut_ptr()) };
                true
            }
            None => false,
        }
    }

    /// Raw pointer to the current element; null once exhausted.
    ///
    /// For map cursors the pointer targets the entry record held inside
    /// this cursor, so it is invalidated by advancing, cloning into a
    /// move, or dropping the cursor. Read the element before stepping.
    pub fn element(&self) -> *const () {
        unsafe { (self.ops.element)(self.storage.as_ptr()) }
    }

    /// Typed view of the current element; `None` if `T` is not exactly
    /// the element type or the cursor is exhausted.
    pub fn element_as<T: Reflect>(&self) -> Option<&T> {
        if T::type_hash() != self.element_type {
            return None;
        }
        unsafe { self.element().cast::<T>().as_ref() }
    }

    /// Hash of the element type this cursor yields.
    pub fn element_type(&self) -> TypeHash {
        self.element_type
    }
}

impl Clone for ErasedIter<'_> {
    fn clone(&self) -> Self {
        let mut cloned = Self::raw(self.ops, self.element_type);
        unsafe { (self.ops.clone)(cloned.storage.as_mut_ptr(), self.storage.as_ptr()) };
        cloned
    }
}

impl Drop for ErasedIter<'_> {
    fn drop(&mut self) {
        unsafe { (self.ops.drop)(self.storage.as_mut_ptr()) };
    }
}

impl PartialEq for ErasedIter<'_> {
    fn eq(&self, other: &Self) -> bool {
        unsafe { (self.ops.eq)(self.storage.as_ptr(), other.storage.as_ptr()) }
    }
}

/// `Iterator` adapter over a begin/end cursor pair.
pub struct ElementIter<'a> {
    cursor: ErasedIter<'a>,
    end: ErasedIter<'a>,
}

impl<'a> ElementIter<'a> {
    pub(crate) fn new(cursor: ErasedIter<'a>, end: ErasedIter<'a>) -> Self {
        Self { cursor, end }
    }

    /// Hash of the element type this iterator yields.
    pub fn element_type(&self) -> TypeHash {
        self.cursor.element_type()
    }
}

impl Iterator for ElementIter<'_> {
    type Item = *const ();

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == self.end {
            return None;
        }
        let element = self.cursor.element();
        self.cursor.advance();
        if element.is_null() { None } else { Some(element) }
    }
}

// ============================================================================
// Vec cursors
// ============================================================================

struct SliceCursor<T> {
    start: *const T,
    ptr: *const T,
    end: *const T,
}

impl<T> Clone for SliceCursor<T> {
    fn clone(&self) -> Self {
        Self {
            start: self.start,
            ptr: self.ptr,
            end: self.end,
        }
    }
}

unsafe fn slice_begin<T>(container: *const (), state: *mut u8) {
    let vec = unsafe { &*container.cast::<Vec<T>>() };
    let range = vec.as_ptr_range();
    unsafe {
        state.cast::<SliceCursor<T>>().write(SliceCursor {
            start: range.start,
            ptr: range.start,
            end: range.end,
        });
    }
}

unsafe fn slice_end<T>(container: *const (), state: *mut u8) {
    let vec = unsafe { &*container.cast::<Vec<T>>() };
    let range = vec.as_ptr_range();
    unsafe {
        state.cast::<SliceCursor<T>>().write(SliceCursor {
            start: range.start,
            ptr: range.end,
            end: range.end,
        });
    }
}

unsafe fn slice_advance<T>(state: *mut u8) {
    let cursor = unsafe { &mut *state.cast::<SliceCursor<T>>() };
    if cursor.ptr < cursor.end {
        cursor.ptr = unsafe { cursor.ptr.add(1) };
    }
}

unsafe fn slice_retreat<T>(state: *mut u8) {
    let cursor = unsafe { &mut *state.cast::<SliceCursor<T>>() };
    if cursor.ptr > cursor.start {
        cursor.ptr = unsafe { cursor.ptr.sub(1) };
    }
}

unsafe fn slice_element<T>(state: *const u8) -> *const () {
    let cursor = unsafe { &*state.cast::<SliceCursor<T>>() };
    if cursor.ptr < cursor.end {
        cursor.ptr.cast()
    } else {
        ptr::null()
    }
}

unsafe fn slice_eq<T>(lhs: *const u8, rhs: *const u8) -> bool {
    let lhs = unsafe { &*lhs.cast::<SliceCursor<T>>() };
    let rhs = unsafe { &*rhs.cast::<SliceCursor<T>>() };
    lhs.ptr == rhs.ptr
}

pub(crate) fn vec_ops<T: 'static>() -> ContainerOps {
    const {
        assert!(mem::size_of::<SliceCursor<T>>() <= ITER_STORAGE_BYTES);
        assert!(mem::align_of::<SliceCursor<T>>() <= ITER_STORAGE_ALIGN);
    }
    ContainerOps {
        begin: slice_begin::<T>,
        end: slice_end::<T>,
        iter: IterOps {
            advance: slice_advance::<T>,
            retreat: Some(slice_retreat::<T>),
            element: slice_element::<T>,
            clone: state_clone::<SliceCursor<T>>,
            drop: state_drop::<SliceCursor<T>>,
            eq: slice_eq::<T>,
        },
    }
}

// ============================================================================
// HashSet cursors
// ============================================================================

struct SetCursor<T: 'static> {
    inner: hash_set::Iter<'static, T>,
    current: *const T,
}

impl<T> Clone for SetCursor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            current: self.current,
        }
    }
}

unsafe fn set_begin<T, S: BuildHasher>(container: *const (), state: *mut u8) {
    let set = unsafe { &*container.cast::<HashSet<T, S>>() };
    // The cursor's borrow of the container is carried by ErasedIter's
    // lifetime parameter, not by the stored iterator.
    let mut inner: hash_set::Iter<'static, T> = unsafe { mem::transmute(set.iter()) };
    let current = inner.next().map_or(ptr::null(), |item| item as *const T);
    unsafe { state.cast::<SetCursor<T>>().write(SetCursor { inner, current }) };
}

unsafe fn set_end<T, S: BuildHasher>(container: *const (), state: *mut u8) {
    let set = unsafe { &*container.cast::<HashSet<T, S>>() };
    let inner: hash_set::Iter<'static, T> = unsafe { mem::transmute(set.iter()) };
    unsafe {
        state.cast::<SetCursor<T>>().write(SetCursor {
            inner,
            current: ptr::null(),
        });
    }
}

unsafe fn set_advance<T>(state: *mut u8) {
    let cursor = unsafe { &mut *state.cast::<SetCursor<T>>() };
    cursor.current = cursor
        .inner
        .next()
        .map_or(ptr::null(), |item| item as *const T);
}

unsafe fn set_element<T>(state: *const u8) -> *const () {
    let cursor = unsafe { &*state.cast::<SetCursor<T>>() };
    cursor.current.cast()
}

unsafe fn set_eq<T>(lhs: *const u8, rhs: *const u8) -> bool {
    let lhs = unsafe { &*lhs.cast::<SetCursor<T>>() };
    let rhs = unsafe { &*rhs.cast::<SetCursor<T>>() };
    lhs.current == rhs.current
}

pub(crate) fn hash_set_ops<T: 'static, S: BuildHasher + 'static>() -> ContainerOps {
    const {
        assert!(mem::size_of::<SetCursor<T>>() <= ITER_STORAGE_BYTES);
        assert!(mem::align_of::<SetCursor<T>>() <= ITER_STORAGE_ALIGN);
    }
    ContainerOps {
        begin: set_begin::<T, S>,
        end: set_end::<T, S>,
        iter: IterOps {
            advance: set_advance::<T>,
            retreat: None,
            element: set_element::<T>,
            clone: state_clone::<SetCursor<T>>,
            drop: state_drop::<SetCursor<T>>,
            eq: set_eq::<T>,
        },
    }
}

// ============================================================================
// HashMap cursors
// ============================================================================

/// Element record yielded by map cursors: key and value handles at fixed
/// byte offsets, pointing into the underlying container.
#[repr(C)]
pub struct MapEntry<K, V> {
    key: *const K,
    value: *const V,
}

impl<K, V> MapEntry<K, V> {
    pub(crate) const KEY_OFFSET: usize = mem::offset_of!(MapEntry<K, V>, key);
    pub(crate) const VALUE_OFFSET: usize = mem::offset_of!(MapEntry<K, V>, value);

    fn exhausted() -> Self {
        Self {
            key: ptr::null(),
            value: ptr::null(),
        }
    }

    /// Raw key handle.
    pub fn key_ptr(&self) -> *const K {
        self.key
    }

    /// Raw value handle.
    pub fn value_ptr(&self) -> *const V {
        self.value
    }

    /// Borrow the key.
    ///
    /// # Safety
    ///
    /// The entry must have been yielded by a live cursor whose container
    /// has not been mutated since.
    pub unsafe fn key(&self) -> &K {
        unsafe { &*self.key }
    }

    /// Borrow the value.
    ///
    /// # Safety
    ///
    /// Same contract as [`Self::key`].
    pub unsafe fn value(&self) -> &V {
        unsafe { &*self.value }
    }
}

impl<K, V> Clone for MapEntry<K, V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            value: self.value,
        }
    }
}

impl<K, V> Copy for MapEntry<K, V> {}

struct MapCursor<K: 'static, V: 'static> {
    inner: hash_map::Iter<'static, K, V>,
    current: MapEntry<K, V>,
}

impl<K, V> Clone for MapCursor<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            current: self.current,
        }
    }
}

fn next_entry<K, V>(inner: &mut hash_map::Iter<'static, K, V>) -> MapEntry<K, V> {
    match inner.next() {
        Some((key, value)) => MapEntry {
            key: key as *const K,
            value: value as *const V,
        },
        None => MapEntry::exhausted(),
    }
}

unsafe fn map_begin<K, V, S: BuildHasher>(container: *const (), state: *mut u8) {
    let map = unsafe { &*container.cast::<HashMap<K, V, S>>() };
    let mut inner: hash_map::Iter<'static, K, V> = unsafe { mem::transmute(map.iter()) };
    let current = next_entry(&mut inner);
    unsafe { state.cast::<MapCursor<K, V>>().write(MapCursor { inner, current }) };
}

unsafe fn map_end<K, V, S: BuildHasher>(container: *const (), state: *mut u8) {
    let map = unsafe { &*container.cast::<HashMap<K, V, S>>() };
    let inner: hash_map::Iter<'static, K, V> = unsafe { mem::transmute(map.iter()) };
    unsafe {
        state.cast::<MapCursor<K, V>>().write(MapCursor {
            inner,
            current: MapEntry::exhausted(),
        });
    }
}

unsafe fn map_advance<K, V>(state: *mut u8) {
    let cursor = unsafe { &mut *state.cast::<MapCursor<K, V>>() };
    cursor.current = next_entry(&mut cursor.inner);
}

unsafe fn map_element<K, V>(state: *const u8) -> *const () {
    let cursor = unsafe { &*state.cast::<MapCursor<K, V>>() };
    if cursor.current.key.is_null() {
        ptr::null()
    } else {
        (&cursor.current as *const MapEntry<K, V>).cast()
    }
}

unsafe fn map_eq<K, V>(lhs: *const u8, rhs: *const u8) -> bool {
    let lhs = unsafe { &*lhs.cast::<MapCursor<K, V>>() };
    let rhs = unsafe { &*rhs.cast::<MapCursor<K, V>>() };
    lhs.current.key == rhs.current.key
}

pub(crate) fn hash_map_ops<K: 'static, V: 'static, S: BuildHasher + 'static>() -> ContainerOps {
    const {
        assert!(mem::size_of::<MapCursor<K, V>>() <= ITER_STORAGE_BYTES);
        assert!(mem::align_of::<MapCursor<K, V>>() <= ITER_STORAGE_ALIGN);
    }
    ContainerOps {
        begin: map_begin::<K, V, S>,
        end: map_end::<K, V, S>,
        iter: IterOps {
            advance: map_advance::<K, V>,
            retreat: None,
            element: map_element::<K, V>,
            clone: state_clone::<MapCursor<K, V>>,
            drop: state_drop::<MapCursor<K, V>>,
            eq: map_eq::<K, V>,
        },
    }
}

// ============================================================================
// Shared state thunks
// ============================================================================

unsafe fn state_clone<State: Clone>(dst: *mut u8, src: *const u8) {
    let src = unsafe { &*src.cast::<State>() };
    unsafe { dst.cast::<State>().write(src.clone()) };
}

unsafe fn state_drop<State>(state: *mut u8) {
    unsafe { ptr::drop_in_place(state.cast::<State>()) };
}

// ============================================================================
// Container contracts
// ============================================================================

/// Contract for array-shaped reflectable containers.
///
/// # Safety
///
/// `container_ops` must operate on the implementing container type and
/// yield elements of exactly `Element`.
pub unsafe trait ReflectArray: Reflect {
    /// Element type.
    type Element: Reflect;

    /// Captured begin/end and cursor operations.
    fn container_ops() -> ContainerOps;
}

/// Contract for set-shaped reflectable containers.
///
/// # Safety
///
/// Same contract as [`ReflectArray`].
pub unsafe trait ReflectSet: Reflect {
    /// Element type.
    type Element: Reflect;
    /// Key type (the element itself for plain sets).
    type Key: Reflect;

    /// Captured begin/end and cursor operations.
    fn container_ops() -> ContainerOps;
}

/// Contract for map-shaped reflectable containers.
///
/// # Safety
///
/// `container_ops` must yield `MapEntry<Key, Value>` element records.
pub unsafe trait ReflectMap: Reflect {
    /// Key type.
    type Key: Reflect;
    /// Mapped value type.
    type Value: Reflect;

    /// Captured begin/end and cursor operations.
    fn container_ops() -> ContainerOps;

    /// Shape metadata: entry element type plus key/value offsets within
    /// the entry record.
    fn entry_shape() -> ContainerShape {
        ContainerShape::Map {
            element: TypeHash::of::<MapEntry<Self::Key, Self::Value>>(),
            key: Self::Key::type_hash(),
            value: Self::Value::type_hash(),
            key_offset: MapEntry::<Self::Key, Self::Value>::KEY_OFFSET,
            value_offset: MapEntry::<Self::Key, Self::Value>::VALUE_OFFSET,
        }
    }
}

unsafe impl<T: Reflect> Reflect for Vec<T> {}

unsafe impl<T: Reflect> ReflectArray for Vec<T> {
    type Element = T;

    fn container_ops() -> ContainerOps {
        vec_ops::<T>()
    }
}

unsafe impl<T: Reflect, S: 'static> Reflect for HashSet<T, S> {}

unsafe impl<T, S> ReflectSet for HashSet<T, S>
where
    T: Reflect + Eq + Hash,
    S: BuildHasher + 'static,
{
    type Element = T;
    type Key = T;

    fn container_ops() -> ContainerOps {
        hash_set_ops::<T, S>()
    }
}

unsafe impl<K: Reflect, V: Reflect, S: 'static> Reflect for HashMap<K, V, S> {}

unsafe impl<K, V, S> ReflectMap for HashMap<K, V, S>
where
    K: Reflect + Eq + Hash,
    V: Reflect,
    S: BuildHasher + 'static,
{
    type Key = K;
    type Value = V;

    fn container_ops() -> ContainerOps {
        hash_map_ops::<K, V, S>()
    }
}

unsafe impl<K: Reflect, V: Reflect> Reflect for MapEntry<K, V> {}
