//! Type qualifier flags.

use bitflags::bitflags;

bitflags! {
    /// Qualifiers distinguishing a type from its pure (unqualified) form.
    ///
    /// A descriptor whose qualifiers are empty is its own pure type; a
    /// pointer descriptor carries [`TypeQualifiers::POINTER`] plus the
    /// mutability of the pointee access, and links to the pure type it
    /// wraps.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeQualifiers: u8 {
        /// The type is a raw pointer to its pure type.
        const POINTER = 1 << 0;
        /// Shared access (`*const`).
        const CONST = 1 << 1;
        /// Exclusive access (`*mut`).
        const MUTABLE = 1 << 2;
    }
}

impl TypeQualifiers {
    /// Check whether the POINTER flag is set.
    #[inline]
    pub fn is_pointer(self) -> bool {
        self.contains(TypeQualifiers::POINTER)
    }
}
