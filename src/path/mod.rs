//! Conversion paths and the search that finds them.
//!
//! A [`Path`] is a chain of converter edges leading from a change's current
//! format into a set of acceptable targets. Paths are ranked by their
//! [`PathCost`]; the search lives in [`search`].

mod search;

pub(crate) use search::find_path;

use serde::Serialize;

use crate::registry::{ConverterId, FormatId, FormatRegistry};

/// Cost of a path, compared lexicographically in field order.
///
/// Fewer lossy steps always wins, then fewer object type changes, then
/// fewer conversions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PathCost {
    /// Steps that may discard information.
    pub losses: u32,
    /// Steps whose target belongs to another object type.
    pub objtype_changes: u32,
    /// Steps that run a conversion function.
    pub conversions: u32,
}

impl PathCost {
    pub(crate) fn step(self, lossy: bool, objtype_change: bool, conversion: bool) -> Self {
        Self {
            losses: self.losses + u32::from(lossy),
            objtype_changes: self.objtype_changes + u32::from(objtype_change),
            conversions: self.conversions + u32::from(conversion),
        }
    }
}

/// One edge of a path, as the search evaluated it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathStep {
    pub converter: ConverterId,
    /// Whether the step was priced as lossy.
    pub lossy: bool,
    /// Whether detection confirmed the step's target format.
    pub confirmed: bool,
}

/// An ordered chain of converter edges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    source: FormatId,
    target: FormatId,
    steps: Vec<PathStep>,
    cost: PathCost,
}

impl Path {
    /// The path of a change already in its target set.
    pub fn empty(format: FormatId) -> Self {
        Self {
            source: format,
            target: format,
            steps: Vec::new(),
            cost: PathCost::default(),
        }
    }

    pub(crate) fn new(
        source: FormatId,
        target: FormatId,
        steps: Vec<PathStep>,
        cost: PathCost,
    ) -> Self {
        Self {
            source,
            target,
            steps,
            cost,
        }
    }

    pub fn source(&self) -> FormatId {
        self.source
    }

    /// The format a change ends up in after following the path.
    pub fn target(&self) -> FormatId {
        self.target
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Converter handles in path order.
    pub fn converters(&self) -> impl Iterator<Item = ConverterId> + '_ {
        self.steps.iter().map(|step| step.converter)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn cost(&self) -> PathCost {
        self.cost
    }

    /// Whether any step was priced as lossy.
    pub fn is_lossy(&self) -> bool {
        self.cost.losses > 0
    }
}

/// A set of acceptable target formats.
pub trait Target {
    fn accepts(&self, format: FormatId, formats: &FormatRegistry) -> bool;
}

impl Target for FormatId {
    fn accepts(&self, format: FormatId, _formats: &FormatRegistry) -> bool {
        *self == format
    }
}

impl Target for [FormatId] {
    fn accepts(&self, format: FormatId, _formats: &FormatRegistry) -> bool {
        self.contains(&format)
    }
}

impl<const N: usize> Target for [FormatId; N] {
    fn accepts(&self, format: FormatId, _formats: &FormatRegistry) -> bool {
        self.contains(&format)
    }
}

impl Target for Vec<FormatId> {
    fn accepts(&self, format: FormatId, _formats: &FormatRegistry) -> bool {
        self.contains(&format)
    }
}

impl<T: Target + ?Sized> Target for &T {
    fn accepts(&self, format: FormatId, formats: &FormatRegistry) -> bool {
        (**self).accepts(format, formats)
    }
}

/// A target set described by a predicate.
pub struct TargetFn<F>(pub F);

impl<F> Target for TargetFn<F>
where
    F: Fn(FormatId, &FormatRegistry) -> bool,
{
    fn accepts(&self, format: FormatId, formats: &FormatRegistry) -> bool {
        (self.0)(format, formats)
    }
}

/// Accepts every format whose object type is not the "any data" type.
#[derive(Clone, Copy, Debug, Default)]
pub struct KnownObjType;

impl Target for KnownObjType {
    fn accepts(&self, format: FormatId, formats: &FormatRegistry) -> bool {
        !formats.objtype(formats.objtype_of(format)).is_any()
    }
}
