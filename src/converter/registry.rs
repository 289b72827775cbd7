use std::collections::HashMap;
use std::fmt;
use std::mem;

use tracing::debug;

use super::{Conversion, Converter, ConverterFlags, DetectFn};
use crate::error::ConvGraphError;
use crate::registry::{next_index, ConverterId, FormatId, FormatRegistry};

/// Outcome of a converter or detector registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    /// Both formats were known; the edge is live.
    Resolved(ConverterId),
    /// At least one format is unknown; the entry waits in the pending list.
    Pending,
}

/// A converter waiting for one of its formats to be registered.
#[derive(Clone, Debug)]
pub struct PendingConverter {
    pub source: String,
    pub target: String,
    pub(crate) conversion: Conversion,
    pub(crate) flags: ConverterFlags,
}

/// A data detector waiting for one of its formats to be registered.
#[derive(Clone)]
pub struct PendingDetector {
    pub source: String,
    pub target: String,
    pub(crate) predicate: DetectFn,
}

impl fmt::Debug for PendingDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingDetector")
            .field("source", &self.source)
            .field("target", &self.target)
            .finish()
    }
}

/// A predicate attached to a (source, target) pair.
#[derive(Clone)]
pub struct DataDetector {
    pub(crate) source: FormatId,
    pub(crate) target: FormatId,
    pub(crate) predicate: DetectFn,
}

impl DataDetector {
    pub fn source(&self) -> FormatId {
        self.source
    }

    pub fn target(&self) -> FormatId {
        self.target
    }

    pub fn detect(&self, data: &[u8]) -> bool {
        (self.predicate)(data)
    }
}

impl fmt::Debug for DataDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataDetector")
            .field("source", &self.source)
            .field("target", &self.target)
            .finish()
    }
}

/// Directed converter edges plus the pending (unresolved) registrations.
#[derive(Debug, Default)]
pub struct ConverterRegistry {
    converters: Vec<Converter>,
    /// Outgoing edges per format index, in registration order.
    outgoing: Vec<Vec<ConverterId>>,
    by_pair: HashMap<(FormatId, FormatId), ConverterId>,
    detectors: Vec<DataDetector>,
    pending_converters: Vec<PendingConverter>,
    pending_detectors: Vec<PendingDetector>,
}

impl ConverterRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a converter, deferring it if a format name is unknown.
    pub(crate) fn register_converter(
        &mut self,
        formats: &FormatRegistry,
        source: &str,
        target: &str,
        conversion: Conversion,
        flags: ConverterFlags,
    ) -> Result<Registration, ConvGraphError> {
        let duplicate = || ConvGraphError::DuplicateConverter {
            source_format: source.to_string(),
            target_format: target.to_string(),
        };

        if let (Some(src), Some(trg)) = (formats.find_objformat(source), formats.find_objformat(target)) {
            if self.by_pair.contains_key(&(src, trg)) {
                return Err(duplicate());
            }
            let id = self.insert(src, trg, conversion, flags);
            debug!(source, target, "registered converter");
            return Ok(Registration::Resolved(id));
        }

        if self
            .pending_converters
            .iter()
            .any(|p| p.source == source && p.target == target)
        {
            return Err(duplicate());
        }
        debug!(source, target, "deferred converter until both formats exist");
        self.pending_converters.push(PendingConverter {
            source: source.to_string(),
            target: target.to_string(),
            conversion,
            flags,
        });
        Ok(Registration::Pending)
    }

    /// Registers a data detector, deferring it if a format name is unknown.
    ///
    /// Returns true if the detector is live.
    pub(crate) fn register_data_detector(
        &mut self,
        formats: &FormatRegistry,
        source: &str,
        target: &str,
        predicate: DetectFn,
    ) -> bool {
        match (formats.find_objformat(source), formats.find_objformat(target)) {
            (Some(src), Some(trg)) => {
                self.detectors.push(DataDetector {
                    source: src,
                    target: trg,
                    predicate,
                });
                true
            }
            _ => {
                self.pending_detectors.push(PendingDetector {
                    source: source.to_string(),
                    target: target.to_string(),
                    predicate,
                });
                false
            }
        }
    }

    /// Promotes every pending entry whose formats are now both known.
    pub(crate) fn resolve_pending(&mut self, formats: &FormatRegistry) {
        for pending in mem::take(&mut self.pending_converters) {
            let src = formats.find_objformat(&pending.source);
            let trg = formats.find_objformat(&pending.target);
            match (src, trg) {
                // Pending pairs are unique and resolve as soon as their last
                // format appears, so no direct registration can hold the pair.
                (Some(src), Some(trg)) => {
                    self.insert(src, trg, pending.conversion, pending.flags);
                    debug!(
                        source = %pending.source,
                        target = %pending.target,
                        "resolved deferred converter"
                    );
                }
                _ => self.pending_converters.push(pending),
            }
        }

        for pending in mem::take(&mut self.pending_detectors) {
            let src = formats.find_objformat(&pending.source);
            let trg = formats.find_objformat(&pending.target);
            match (src, trg) {
                (Some(src), Some(trg)) => self.detectors.push(DataDetector {
                    source: src,
                    target: trg,
                    predicate: pending.predicate,
                }),
                _ => self.pending_detectors.push(pending),
            }
        }
    }

    fn insert(
        &mut self,
        source: FormatId,
        target: FormatId,
        conversion: Conversion,
        flags: ConverterFlags,
    ) -> ConverterId {
        let id = ConverterId(next_index(self.converters.len()));
        self.converters
            .push(Converter::new(id, source, target, conversion, flags));
        if self.outgoing.len() <= source.index() {
            self.outgoing.resize_with(source.index() + 1, Vec::new);
        }
        self.outgoing[source.index()].push(id);
        self.by_pair.insert((source, target), id);
        id
    }

    /// Exact edge lookup. Not transitive.
    pub fn find_converter(&self, source: FormatId, target: FormatId) -> Option<ConverterId> {
        self.by_pair.get(&(source, target)).copied()
    }

    pub fn converter(&self, id: ConverterId) -> &Converter {
        &self.converters[id.index()]
    }

    pub fn converters(&self) -> &[Converter] {
        &self.converters
    }

    /// Outgoing edges of a format, in registration order.
    pub fn outgoing(&self, format: FormatId) -> &[ConverterId] {
        self.outgoing
            .get(format.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First detector registered for an exact pair.
    pub fn detector_for(&self, source: FormatId, target: FormatId) -> Option<&DataDetector> {
        self.detectors
            .iter()
            .find(|d| d.source == source && d.target == target)
    }

    /// Detectors whose source is the given format, in registration order.
    pub fn detectors_from(&self, source: FormatId) -> impl Iterator<Item = &DataDetector> {
        self.detectors.iter().filter(move |d| d.source == source)
    }

    pub fn detectors(&self) -> &[DataDetector] {
        &self.detectors
    }

    pub fn pending_converters(&self) -> &[PendingConverter] {
        &self.pending_converters
    }

    pub fn pending_detectors(&self) -> &[PendingDetector] {
        &self.pending_detectors
    }
}
