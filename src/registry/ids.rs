//! Newtype handles for registry entries.
//!
//! Formats, object types and converters live in contiguous tables owned by
//! the [`FormatEnv`](crate::FormatEnv). A handle is the index into its table,
//! so lookups during path search never compare strings. Using distinct
//! newtypes keeps a format handle from being passed where a converter handle
//! is expected.

use serde::Serialize;
use std::fmt;

/// Handle of an object type (e.g. "contact").
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ObjTypeId(pub(crate) u32);

impl ObjTypeId {
    /// Returns the table index of this handle.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ObjTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjTypeId({})", self.0)
    }
}

/// Handle of an object format (e.g. "vcard21").
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FormatId(pub(crate) u32);

impl FormatId {
    /// Returns the table index of this handle.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FormatId({})", self.0)
    }
}

/// Handle of a registered converter edge.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ConverterId(pub(crate) u32);

impl ConverterId {
    /// Returns the table index of this handle.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ConverterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConverterId({})", self.0)
    }
}

/// Converts a table length into the next handle value.
pub(crate) fn next_index(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
