//! The unit of data flowing through conversions.

use crate::registry::{FormatId, ObjTypeId};

/// A change: an object's bytes tagged with their current format.
///
/// Deleted objects carry no data; converting them only retags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    uid: String,
    data: Option<Vec<u8>>,
    format: FormatId,
    objtype: ObjTypeId,
}

impl Change {
    /// Creates a change holding `data` in the given format.
    pub fn new(
        uid: impl Into<String>,
        data: Option<Vec<u8>>,
        format: FormatId,
        objtype: ObjTypeId,
    ) -> Self {
        Self {
            uid: uid.into(),
            data,
            format,
            objtype,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn set_uid(&mut self, uid: impl Into<String>) {
        self.uid = uid.into();
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Size of the data in bytes; zero when there is none.
    pub fn size(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn format(&self) -> FormatId {
        self.format
    }

    pub fn objtype(&self) -> ObjTypeId {
        self.objtype
    }

    /// Takes the data out, leaving the change data-less.
    pub fn take_data(&mut self) -> Option<Vec<u8>> {
        self.data.take()
    }

    pub fn into_data(self) -> Option<Vec<u8>> {
        self.data
    }

    pub(crate) fn set_data(&mut self, data: Vec<u8>) {
        self.data = Some(data);
    }

    pub(crate) fn retag(&mut self, format: FormatId, objtype: ObjTypeId) {
        self.format = format;
        self.objtype = objtype;
    }
}
