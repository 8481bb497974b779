//! Deterministic hash-based type identity.
//!
//! This module provides [`TypeHash`], a 64-bit hash that uniquely identifies
//! every reflectable type in the process. Hashes are computed from the
//! fully-qualified type name rather than handed out sequentially, which
//! enables:
//!
//! - Forward references (a super link can be recorded before the super type
//!   is registered)
//! - No registration-order dependencies between independent init paths
//! - Single map lookups (no secondary name→id indirection)
//!
//! Pointer-qualified types hash differently from their pointees because
//! their names differ (`*mut Pawn` vs `Pawn`); the unqualified type is
//! reachable through the descriptor's pure link instead.

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-mixing constant for hash computation.
///
/// Folding a domain marker into every hash keeps type identities from
/// colliding with plain xxh64 digests of the same byte strings elsewhere.
pub mod hash_constants {
    /// Domain marker for type identity hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;
}

/// A deterministic 64-bit hash identifying a type.
///
/// Computed from the fully-qualified type name. The same name always
/// produces the same hash, in every run of every process.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a qualified type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Create the identity hash for a Rust type.
    ///
    /// Equivalent to `from_name(core::any::type_name::<T>())`, so the
    /// identity is stable across runs and computable before the type is
    /// registered anywhere.
    #[inline]
    pub fn of<T: 'static>() -> Self {
        Self::from_name(core::any::type_name::<T>())
    }

    /// Check if this is the empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_determinism() {
        assert_eq!(TypeHash::from_name("Pawn"), TypeHash::from_name("Pawn"));
        assert_eq!(TypeHash::of::<i32>(), TypeHash::of::<i32>());
    }

    #[test]
    fn hash_uniqueness() {
        let int = TypeHash::of::<i32>();
        let float = TypeHash::of::<f32>();
        let string = TypeHash::of::<String>();

        assert_ne!(int, float);
        assert_ne!(int, string);
        assert_ne!(float, string);
    }

    #[test]
    fn of_matches_from_name() {
        assert_eq!(
            TypeHash::of::<String>(),
            TypeHash::from_name(core::any::type_name::<String>())
        );
    }

    #[test]
    fn pointer_hashes_differ_from_pointee() {
        assert_ne!(TypeHash::of::<*mut i32>(), TypeHash::of::<i32>());
        assert_ne!(TypeHash::of::<*mut i32>(), TypeHash::of::<*const i32>());
    }

    #[test]
    fn empty_hash() {
        assert!(TypeHash::EMPTY.is_empty());
        assert!(!TypeHash::of::<u8>().is_empty());
    }

    #[test]
    fn hash_display() {
        let hash = TypeHash::from_name("Pawn");
        assert!(format!("{}", hash).starts_with("0x"));
        assert!(format!("{:?}", hash).starts_with("TypeHash(0x"));
    }

    #[test]
    fn hash_ordering() {
        assert!(TypeHash(100) < TypeHash(200));
    }
}
