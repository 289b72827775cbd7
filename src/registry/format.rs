//! Object type and object format records.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::ids::{FormatId, ObjTypeId};
use crate::change::Change;
use crate::converter::ConvertFn;

/// Name of the object type that stands for "any data".
///
/// Formats of this type (such as "plain") carry bytes whose real type is
/// not known yet. Full detection searches for the nearest format outside
/// this type.
pub const ANY_OBJTYPE: &str = "data";

/// Returns true if the object type name is the "any data" type.
pub fn objtype_is_any(name: &str) -> bool {
    name == ANY_OBJTYPE
}

/// Result of comparing the data of two changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareResult {
    /// The changes hold different objects.
    Mismatch,
    /// Same object, but the representations differ in details.
    Similar,
    /// Identical data.
    Same,
}

/// Compares two buffers of the same format.
pub type CompareFn = Arc<dyn Fn(&[u8], &[u8]) -> CompareResult + Send + Sync>;

/// Prepares a duplicated change (typically by giving it a fresh uid).
pub type DuplicateFn = Arc<dyn Fn(&mut Change) + Send + Sync>;

/// Renders a buffer for humans.
pub type PrintFn = Arc<dyn Fn(&[u8]) -> String + Send + Sync>;

/// Format-level detection: names the more specific format the data
/// actually is, if it can tell.
pub type ReportAsFn = Arc<dyn Fn(&[u8]) -> Option<String> + Send + Sync>;

/// Functions a plugin wraps around every conversion into and out of a
/// format, such as adding or stripping vendor fields.
#[derive(Clone)]
pub struct FormatExtension {
    /// Runs on data that a converter just produced in this format.
    pub to: ConvertFn,
    /// Runs on data in this format before a converter reads it.
    pub from: ConvertFn,
}

impl fmt::Debug for FormatExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FormatExtension")
    }
}

/// A semantic category of data, grouping several formats.
#[derive(Clone, Debug)]
pub struct ObjType {
    pub(crate) id: ObjTypeId,
    pub(crate) name: String,
    pub(crate) formats: Vec<FormatId>,
    pub(crate) common_format: Option<FormatId>,
}

impl ObjType {
    pub fn id(&self) -> ObjTypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Formats of this type, in registration order.
    pub fn formats(&self) -> &[FormatId] {
        &self.formats
    }

    /// The format every member of a group agrees to exchange this type in.
    pub fn common_format(&self) -> Option<FormatId> {
        self.common_format
    }

    pub fn is_any(&self) -> bool {
        objtype_is_any(&self.name)
    }
}

/// Optional behaviour attached to a format by the plugin that owns it.
#[derive(Clone, Default)]
pub struct FormatHooks {
    pub compare: Option<CompareFn>,
    pub duplicate: Option<DuplicateFn>,
    pub print: Option<PrintFn>,
    pub report_as: Option<ReportAsFn>,
    /// Applied in registration order.
    pub extensions: Vec<FormatExtension>,
}

impl fmt::Debug for FormatHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatHooks")
            .field("compare", &self.compare.is_some())
            .field("duplicate", &self.duplicate.is_some())
            .field("print", &self.print.is_some())
            .field("report_as", &self.report_as.is_some())
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

/// A concrete data representation of an object type.
#[derive(Clone, Debug)]
pub struct ObjFormat {
    pub(crate) id: FormatId,
    pub(crate) name: String,
    pub(crate) objtype: ObjTypeId,
    pub(crate) hooks: FormatHooks,
}

impl ObjFormat {
    pub fn id(&self) -> FormatId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn objtype(&self) -> ObjTypeId {
        self.objtype
    }

    pub fn hooks(&self) -> &FormatHooks {
        &self.hooks
    }

    pub fn extensions(&self) -> &[FormatExtension] {
        &self.hooks.extensions
    }

    /// Runs the `report_as` hook, if any.
    pub fn report_as(&self, data: &[u8]) -> Option<String> {
        self.hooks.report_as.as_ref().and_then(|hook| hook(data))
    }

    /// Renders the data with the `print` hook, falling back to lossy UTF-8.
    pub fn print(&self, data: &[u8]) -> String {
        match &self.hooks.print {
            Some(hook) => hook(data),
            None => String::from_utf8_lossy(data).into_owned(),
        }
    }
}
