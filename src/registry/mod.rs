//! Format registry: object types and object formats.
//!
//! Object types and formats are stored in contiguous tables indexed by
//! [`ObjTypeId`] / [`FormatId`]. Name lookup is a separate map layered on
//! top, so the path finder works purely on handles.

mod format;
mod ids;

pub use format::{
    objtype_is_any, CompareFn, CompareResult, DuplicateFn, FormatExtension, FormatHooks,
    ObjFormat, ObjType, PrintFn, ReportAsFn, ANY_OBJTYPE,
};
pub use ids::{ConverterId, FormatId, ObjTypeId};

pub(crate) use ids::next_index;

use std::collections::HashMap;

use tracing::debug;

use crate::error::ConvGraphError;

/// Name-indexed storage of object types and formats.
#[derive(Debug, Default)]
pub struct FormatRegistry {
    objtypes: Vec<ObjType>,
    formats: Vec<ObjFormat>,
    objtype_names: HashMap<String, ObjTypeId>,
    format_names: HashMap<String, FormatId>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an object type, returning the existing one if the name is
    /// already known.
    pub fn register_objtype(&mut self, name: &str) -> ObjTypeId {
        if let Some(id) = self.objtype_names.get(name) {
            return *id;
        }

        let id = ObjTypeId(next_index(self.objtypes.len()));
        self.objtypes.push(ObjType {
            id,
            name: name.to_string(),
            formats: Vec::new(),
            common_format: None,
        });
        self.objtype_names.insert(name.to_string(), id);
        debug!(objtype = name, "registered object type");
        id
    }

    /// Registers a format under an object type.
    ///
    /// Returns the handle and whether the format was newly created. The
    /// object type is created on demand. Registering a known format name
    /// again under the same type is a no-op; under another type it is an
    /// error.
    pub fn register_objformat(
        &mut self,
        objtype_name: &str,
        format_name: &str,
    ) -> Result<(FormatId, bool), ConvGraphError> {
        let objtype = self.register_objtype(objtype_name);

        if let Some(&id) = self.format_names.get(format_name) {
            let registered = self.formats[id.index()].objtype;
            if registered != objtype {
                return Err(ConvGraphError::FormatObjTypeConflict {
                    format: format_name.to_string(),
                    registered: self.objtypes[registered.index()].name.clone(),
                    requested: objtype_name.to_string(),
                });
            }
            return Ok((id, false));
        }

        let id = FormatId(next_index(self.formats.len()));
        self.formats.push(ObjFormat {
            id,
            name: format_name.to_string(),
            objtype,
            hooks: FormatHooks::default(),
        });
        self.format_names.insert(format_name.to_string(), id);
        self.objtypes[objtype.index()].formats.push(id);
        debug!(
            objtype = objtype_name,
            format = format_name,
            "registered object format"
        );
        Ok((id, true))
    }

    pub fn find_objtype(&self, name: &str) -> Option<ObjTypeId> {
        self.objtype_names.get(name).copied()
    }

    pub fn find_objformat(&self, name: &str) -> Option<FormatId> {
        self.format_names.get(name).copied()
    }

    pub fn objtype(&self, id: ObjTypeId) -> &ObjType {
        &self.objtypes[id.index()]
    }

    pub fn format(&self, id: FormatId) -> &ObjFormat {
        &self.formats[id.index()]
    }

    pub(crate) fn format_mut(&mut self, id: FormatId) -> &mut ObjFormat {
        &mut self.formats[id.index()]
    }

    /// Name of a format, for messages.
    pub fn format_name(&self, id: FormatId) -> &str {
        &self.formats[id.index()].name
    }

    /// Object type of a format.
    pub fn objtype_of(&self, id: FormatId) -> ObjTypeId {
        self.formats[id.index()].objtype
    }

    pub fn objtypes(&self) -> &[ObjType] {
        &self.objtypes
    }

    pub fn formats(&self) -> &[ObjFormat] {
        &self.formats
    }

    /// Sets the common format of an object type.
    pub fn set_common_format(
        &mut self,
        objtype_name: &str,
        format_name: &str,
    ) -> Result<(), ConvGraphError> {
        let objtype = self
            .find_objtype(objtype_name)
            .ok_or_else(|| ConvGraphError::UnknownObjType(objtype_name.to_string()))?;
        let format = self
            .find_objformat(format_name)
            .ok_or_else(|| ConvGraphError::UnknownFormat(format_name.to_string()))?;
        let registered = self.formats[format.index()].objtype;
        if registered != objtype {
            return Err(ConvGraphError::FormatObjTypeConflict {
                format: format_name.to_string(),
                registered: self.objtypes[registered.index()].name.clone(),
                requested: objtype_name.to_string(),
            });
        }
        self.objtypes[objtype.index()].common_format = Some(format);
        Ok(())
    }
}
