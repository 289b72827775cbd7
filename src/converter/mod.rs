//! Converter edges and their registry.
//!
//! A converter is a directed edge between two formats. Its payload is a
//! [`Conversion`], whose variant is the converter kind: plain conversion,
//! encapsulation, de-encapsulation, or a detector that only re-labels data
//! already known to be of the target format.

mod registry;

pub use registry::{ConverterRegistry, DataDetector, PendingConverter, PendingDetector, Registration};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::{ConverterId, FormatId};

/// Error reported by a conversion function.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ConvertError {
    message: String,
}

impl ConvertError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Outcome of a successful conversion function call.
///
/// The variant decides what happens to the input buffer: a replaced input is
/// released, a reused input stays as the change's data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Converted {
    /// A new buffer was produced; the input is no longer needed.
    Replaced(Vec<u8>),
    /// The input bytes are already valid in the target format.
    Reused,
}

/// Conversion function: `(input, per-edge config) -> output`.
///
/// The input is borrowed immutably, so a failing function cannot leave the
/// change half-converted. Any partial output it built is simply dropped.
pub type ConvertFn =
    Arc<dyn Fn(&[u8], Option<&str>) -> Result<Converted, ConvertError> + Send + Sync>;

/// Predicate telling whether a buffer really is of some format.
pub type DetectFn = Arc<dyn Fn(&[u8]) -> bool + Send + Sync>;

/// The kind of a converter edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConverterKind {
    /// Plain conversion between two representations.
    Conv,
    /// Wrap data into a container format.
    Encap,
    /// Unwrap data from a container format.
    Decap,
    /// Re-label data as a more specific format without touching it.
    Detector,
}

impl ConverterKind {
    pub fn name(&self) -> &'static str {
        match self {
            ConverterKind::Conv => "conv",
            ConverterKind::Encap => "encap",
            ConverterKind::Decap => "decap",
            ConverterKind::Detector => "detector",
        }
    }

    /// Whether edges of this kind are lossy unless declared otherwise.
    pub fn lossy_by_default(&self) -> bool {
        matches!(self, ConverterKind::Decap)
    }
}

impl fmt::Display for ConverterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload of a converter edge. The variant is the converter kind.
#[derive(Clone)]
pub enum Conversion {
    Convert(ConvertFn),
    Encap(ConvertFn),
    Decap(ConvertFn),
    Detector(DetectFn),
}

impl Conversion {
    pub fn convert<F>(func: F) -> Self
    where
        F: Fn(&[u8], Option<&str>) -> Result<Converted, ConvertError> + Send + Sync + 'static,
    {
        Conversion::Convert(Arc::new(func))
    }

    pub fn encap<F>(func: F) -> Self
    where
        F: Fn(&[u8], Option<&str>) -> Result<Converted, ConvertError> + Send + Sync + 'static,
    {
        Conversion::Encap(Arc::new(func))
    }

    pub fn decap<F>(func: F) -> Self
    where
        F: Fn(&[u8], Option<&str>) -> Result<Converted, ConvertError> + Send + Sync + 'static,
    {
        Conversion::Decap(Arc::new(func))
    }

    pub fn detector<F>(predicate: F) -> Self
    where
        F: Fn(&[u8]) -> bool + Send + Sync + 'static,
    {
        Conversion::Detector(Arc::new(predicate))
    }

    /// Builds a conversion of the given kind around a convert function.
    ///
    /// Detector edges carry a predicate instead; asking for one here yields
    /// a detector that accepts nothing on its own and is only traversed
    /// when the source format reports the target.
    pub fn with_kind(kind: ConverterKind, func: ConvertFn) -> Self {
        match kind {
            ConverterKind::Conv => Conversion::Convert(func),
            ConverterKind::Encap => Conversion::Encap(func),
            ConverterKind::Decap => Conversion::Decap(func),
            ConverterKind::Detector => Conversion::Detector(Arc::new(|_: &[u8]| false)),
        }
    }

    pub fn kind(&self) -> ConverterKind {
        match self {
            Conversion::Convert(_) => ConverterKind::Conv,
            Conversion::Encap(_) => ConverterKind::Encap,
            Conversion::Decap(_) => ConverterKind::Decap,
            Conversion::Detector(_) => ConverterKind::Detector,
        }
    }
}

impl fmt::Debug for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Conversion::{}", self.kind())
    }
}

/// Registration options of a converter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConverterFlags {
    /// Only follow this edge once detection confirmed its target.
    pub detect_first: bool,
    /// Explicit lossiness; `None` uses the kind's default.
    pub lossy: Option<bool>,
    /// Free-form configuration handed to the conversion function.
    pub config: Option<String>,
}

impl ConverterFlags {
    pub fn detect_first(mut self) -> Self {
        self.detect_first = true;
        self
    }

    pub fn lossy(mut self) -> Self {
        self.lossy = Some(true);
        self
    }

    pub fn lossless(mut self) -> Self {
        self.lossy = Some(false);
        self
    }

    pub fn config(mut self, config: impl Into<String>) -> Self {
        self.config = Some(config.into());
        self
    }
}

/// A registered converter edge.
#[derive(Clone, Debug)]
pub struct Converter {
    pub(crate) id: ConverterId,
    pub(crate) source: FormatId,
    pub(crate) target: FormatId,
    pub(crate) conversion: Conversion,
    pub(crate) detect_first: bool,
    pub(crate) lossy: bool,
    pub(crate) config: Option<String>,
}

impl Converter {
    pub(crate) fn new(
        id: ConverterId,
        source: FormatId,
        target: FormatId,
        conversion: Conversion,
        flags: ConverterFlags,
    ) -> Self {
        let kind = conversion.kind();
        let lossy = match kind {
            ConverterKind::Detector => false,
            _ => flags.lossy.unwrap_or_else(|| kind.lossy_by_default()),
        };
        Self {
            id,
            source,
            target,
            conversion,
            detect_first: flags.detect_first,
            lossy,
            config: flags.config,
        }
    }

    pub fn id(&self) -> ConverterId {
        self.id
    }

    pub fn source(&self) -> FormatId {
        self.source
    }

    pub fn target(&self) -> FormatId {
        self.target
    }

    pub fn kind(&self) -> ConverterKind {
        self.conversion.kind()
    }

    pub fn conversion(&self) -> &Conversion {
        &self.conversion
    }

    pub fn is_detect_first(&self) -> bool {
        self.detect_first
    }

    /// Whether following this edge may discard information.
    pub fn is_lossy(&self) -> bool {
        self.lossy
    }

    pub fn config(&self) -> Option<&str> {
        self.config.as_deref()
    }

    /// Runs the conversion function on a buffer.
    ///
    /// Detector edges never change the data.
    pub fn invoke(&self, input: &[u8]) -> Result<Converted, ConvertError> {
        match &self.conversion {
            Conversion::Convert(func) | Conversion::Encap(func) | Conversion::Decap(func) => {
                func(input, self.config())
            }
            Conversion::Detector(_) => Ok(Converted::Reused),
        }
    }

    /// For detector edges, runs the predicate. Other kinds accept any data.
    pub fn accepts(&self, data: &[u8]) -> bool {
        match &self.conversion {
            Conversion::Detector(predicate) => predicate(data),
            _ => true,
        }
    }
}
