//! The format environment: registries plus the operations over them.
//!
//! Registration needs `&mut FormatEnv`, conversion only `&FormatEnv`, so an
//! environment is populated first and then shared (it is `Send + Sync`).

use std::sync::Arc;

use tracing::debug;

use crate::change::Change;
use crate::conversion::{build_conversion_report, execute_path, invoke_edge, ConversionReport};
use crate::converter::{
    Conversion, ConvertError, Converted, Converter, ConverterFlags, ConverterKind,
    ConverterRegistry, Registration,
};
use crate::error::ConvGraphError;
use crate::path::{find_path, KnownObjType, Path, Target};
use crate::registry::{
    CompareFn, CompareResult, FormatExtension, FormatHooks, FormatId, FormatRegistry, ObjTypeId,
    ReportAsFn,
};

/// Object types, formats, converters and detectors of one sync setup.
#[derive(Debug, Default)]
pub struct FormatEnv {
    formats: FormatRegistry,
    converters: ConverterRegistry,
}

impl FormatEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    // Registration

    pub fn register_objtype(&mut self, name: &str) -> ObjTypeId {
        self.formats.register_objtype(name)
    }

    /// Registers a format and promotes every pending converter or detector
    /// that now has both of its formats.
    pub fn register_objformat(
        &mut self,
        objtype: &str,
        format: &str,
    ) -> Result<FormatId, ConvGraphError> {
        let (id, created) = self.formats.register_objformat(objtype, format)?;
        if created {
            self.converters.resolve_pending(&self.formats);
        }
        Ok(id)
    }

    /// Registers a converter edge. Edges naming unknown formats are kept
    /// pending until those formats are registered.
    pub fn register_converter(
        &mut self,
        source: &str,
        target: &str,
        conversion: Conversion,
        flags: ConverterFlags,
    ) -> Result<Registration, ConvGraphError> {
        self.converters
            .register_converter(&self.formats, source, target, conversion, flags)
    }

    /// Registers a data detector for a format pair. Returns true if both
    /// formats were already known.
    pub fn register_data_detector<F>(&mut self, source: &str, target: &str, predicate: F) -> bool
    where
        F: Fn(&[u8]) -> bool + Send + Sync + 'static,
    {
        self.converters
            .register_data_detector(&self.formats, source, target, Arc::new(predicate))
    }

    /// Declares `format` a plain alias of `base`: two conversion edges that
    /// hand the bytes over unchanged.
    pub fn set_like(
        &mut self,
        format: &str,
        base: &str,
        to_flags: ConverterFlags,
        from_flags: ConverterFlags,
    ) -> Result<(), ConvGraphError> {
        let same = || Conversion::convert(|_, _| Ok(Converted::Reused));
        self.register_converter(format, base, same(), to_flags)?;
        self.register_converter(base, format, same(), from_flags)?;
        Ok(())
    }

    pub fn set_common_format(&mut self, objtype: &str, format: &str) -> Result<(), ConvGraphError> {
        self.formats.set_common_format(objtype, format)
    }

    /// Mutable access to a format's hooks.
    pub fn hooks_mut(&mut self, format: &str) -> Result<&mut FormatHooks, ConvGraphError> {
        let id = self
            .formats
            .find_objformat(format)
            .ok_or_else(|| ConvGraphError::UnknownFormat(format.to_string()))?;
        Ok(&mut self.formats.format_mut(id).hooks)
    }

    pub fn set_report_as<F>(&mut self, format: &str, hook: F) -> Result<(), ConvGraphError>
    where
        F: Fn(&[u8]) -> Option<String> + Send + Sync + 'static,
    {
        let hook: ReportAsFn = Arc::new(hook);
        self.hooks_mut(format)?.report_as = Some(hook);
        Ok(())
    }

    pub fn set_compare<F>(&mut self, format: &str, hook: F) -> Result<(), ConvGraphError>
    where
        F: Fn(&[u8], &[u8]) -> CompareResult + Send + Sync + 'static,
    {
        let hook: CompareFn = Arc::new(hook);
        self.hooks_mut(format)?.compare = Some(hook);
        Ok(())
    }

    /// Wraps every conversion into and out of `format`.
    ///
    /// `to` runs after a converter produced data in the format, `from`
    /// before a converter reads it. Extensions of one format run in
    /// registration order.
    pub fn register_extension<T, F>(
        &mut self,
        format: &str,
        to: T,
        from: F,
    ) -> Result<(), ConvGraphError>
    where
        T: Fn(&[u8], Option<&str>) -> Result<Converted, ConvertError> + Send + Sync + 'static,
        F: Fn(&[u8], Option<&str>) -> Result<Converted, ConvertError> + Send + Sync + 'static,
    {
        let extension = FormatExtension {
            to: Arc::new(to),
            from: Arc::new(from),
        };
        self.hooks_mut(format)?.extensions.push(extension);
        debug!(format, "registered format extension");
        Ok(())
    }

    // Lookup

    pub fn find_objtype(&self, name: &str) -> Option<ObjTypeId> {
        self.formats.find_objtype(name)
    }

    pub fn find_objformat(&self, name: &str) -> Option<FormatId> {
        self.formats.find_objformat(name)
    }

    pub fn format_name(&self, id: FormatId) -> &str {
        self.formats.format_name(id)
    }

    /// Exact edge lookup by format names.
    pub fn find_converter(&self, source: &str, target: &str) -> Option<&Converter> {
        let source = self.formats.find_objformat(source)?;
        let target = self.formats.find_objformat(target)?;
        self.converters
            .find_converter(source, target)
            .map(|id| self.converters.converter(id))
    }

    /// Creates a change in a named format.
    pub fn new_change(
        &self,
        uid: impl Into<String>,
        format: &str,
        data: Option<Vec<u8>>,
    ) -> Result<Change, ConvGraphError> {
        let id = self
            .formats
            .find_objformat(format)
            .ok_or_else(|| ConvGraphError::UnknownFormat(format.to_string()))?;
        Ok(Change::new(uid, data, id, self.formats.objtype_of(id)))
    }

    // Paths

    /// Finds the cheapest path for a change, running detection on its data.
    pub fn find_path<T: Target + ?Sized>(&self, change: &Change, targets: &T) -> Option<Path> {
        find_path(
            &self.formats,
            &self.converters,
            change.format(),
            change.data(),
            targets,
        )
    }

    /// Finds the cheapest path from a format without any data. Detectors
    /// are not consulted.
    pub fn find_path_from_format<T: Target + ?Sized>(
        &self,
        source: FormatId,
        targets: &T,
    ) -> Option<Path> {
        find_path(&self.formats, &self.converters, source, None, targets)
    }

    /// Applies a previously found path to a change.
    pub fn execute_path(&self, change: &mut Change, path: &Path) -> Result<(), ConvGraphError> {
        execute_path(&self.formats, &self.converters, change, path)
    }

    /// Converts a change into any of the targets.
    ///
    /// Returns the path taken, or `None` if no path exists (the change is
    /// left untouched).
    pub fn convert<T: Target + ?Sized>(
        &self,
        change: &mut Change,
        targets: &T,
    ) -> Result<Option<Path>, ConvGraphError> {
        let Some(path) = self.find_path(change, targets) else {
            debug!(
                uid = change.uid(),
                from = self.format_name(change.format()),
                "no conversion path"
            );
            return Ok(None);
        };
        self.execute_path(change, &path)?;
        Ok(Some(path))
    }

    /// Like [`convert`](Self::convert), but a missing path is an error.
    pub fn convert_to<T: Target + ?Sized>(
        &self,
        change: &mut Change,
        targets: &T,
    ) -> Result<Path, ConvGraphError> {
        let from = self.format_name(change.format()).to_string();
        self.convert(change, targets)?
            .ok_or_else(|| ConvGraphError::NoPath {
                from,
                targets: self.describe_targets(targets),
            })
    }

    /// Converts a change into the named format.
    pub fn convert_to_name(&self, change: &mut Change, format: &str) -> Result<Path, ConvGraphError> {
        let target = self
            .find_objformat(format)
            .ok_or_else(|| ConvGraphError::UnknownFormat(format.to_string()))?;
        self.convert_to(change, &target)
    }

    /// Describes a path for humans and tools.
    pub fn conversion_report<T: Target + ?Sized>(&self, path: &Path, targets: &T) -> ConversionReport {
        let names = self.accepted_formats(targets);
        build_conversion_report(&self.formats, &self.converters, path, names)
    }

    fn accepted_formats<T: Target + ?Sized>(&self, targets: &T) -> Vec<String> {
        self.formats
            .formats()
            .iter()
            .filter(|format| targets.accepts(format.id(), &self.formats))
            .map(|format| format.name().to_string())
            .collect()
    }

    fn describe_targets<T: Target + ?Sized>(&self, targets: &T) -> String {
        self.accepted_formats(targets).join(", ")
    }

    // Detection

    /// Runs the data detectors of the change's format and returns the first
    /// format whose detector accepts the data.
    pub fn detect_objformat(&self, change: &Change) -> Option<FormatId> {
        let data = change.data()?;
        self.detect_in(change.format(), data)
    }

    fn detect_in(&self, format: FormatId, data: &[u8]) -> Option<FormatId> {
        if let Some(reported) = self
            .formats
            .format(format)
            .report_as(data)
            .and_then(|name| self.formats.find_objformat(&name))
        {
            return Some(reported);
        }
        self.converters
            .detectors_from(format)
            .find(|detector| detector.detect(data))
            .map(|detector| detector.target())
    }

    /// Finds the innermost format of a change's data.
    ///
    /// Works on a scratch copy: detects, unwraps through the first DECAP
    /// edge of the detected format, and repeats until nothing unwraps any
    /// further. The walk is bounded by the number of formats, so cyclic
    /// container edges end it as well. If the result is still of the "any data" object type, the
    /// nearest format of a real object type is searched instead. The
    /// change itself is not modified.
    pub fn detect_objformat_full(&self, change: &Change) -> Result<FormatId, ConvGraphError> {
        let Some(data) = change.data() else {
            return Ok(change.format());
        };

        let mut format = change.format();
        let mut scratch = data.to_vec();
        for _ in 0..=self.formats.formats().len() {
            if let Some(detected) = self.detect_in(format, &scratch) {
                format = detected;
            }

            let Some(decap) = self
                .converters
                .outgoing(format)
                .iter()
                .map(|id| self.converters.converter(*id))
                .find(|c| c.kind() == ConverterKind::Decap)
            else {
                break;
            };

            match invoke_edge(&self.formats, decap, &scratch) {
                Ok(Converted::Replaced(output)) => scratch = output,
                Ok(Converted::Reused) => {}
                Err(source) => {
                    return Err(ConvGraphError::ConversionFailed {
                        source_format: self.format_name(decap.source()).to_string(),
                        target_format: self.format_name(decap.target()).to_string(),
                        source,
                    });
                }
            }
            format = decap.target();
        }

        if self.formats.objtype(self.formats.objtype_of(format)).is_any() {
            if let Some(path) = find_path(
                &self.formats,
                &self.converters,
                format,
                Some(&scratch),
                &KnownObjType,
            ) {
                format = path.target();
            }
        }

        debug!(
            uid = change.uid(),
            from = self.format_name(change.format()),
            detected = self.format_name(format),
            "full detection finished"
        );
        Ok(format)
    }

    // Change helpers

    /// Compares two changes with the compare hook of their format, or byte
    /// equality when the format has none.
    pub fn compare_changes(&self, left: &Change, right: &Change) -> CompareResult {
        if left.objtype() != right.objtype() || left.format() != right.format() {
            return CompareResult::Mismatch;
        }
        match (left.data(), right.data()) {
            (None, None) => CompareResult::Same,
            (Some(a), Some(b)) => match &self.formats.format(left.format()).hooks().compare {
                Some(compare) => compare(a, b),
                None if a == b => CompareResult::Same,
                None => CompareResult::Mismatch,
            },
            _ => CompareResult::Mismatch,
        }
    }

    /// Clones a change and lets its format prepare the copy.
    pub fn duplicate_change(&self, change: &Change) -> Change {
        let mut copy = change.clone();
        if let Some(duplicate) = &self.formats.format(change.format()).hooks().duplicate {
            duplicate(&mut copy);
        }
        copy
    }

    /// Renders a change's data with its format's print hook.
    pub fn print_change(&self, change: &Change) -> String {
        match change.data() {
            Some(data) => self.formats.format(change.format()).print(data),
            None => String::new(),
        }
    }
}
