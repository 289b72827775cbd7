//! Best-first search over the converter graph.
//!
//! Vertices live in an arena and point back to their parent, so a path is
//! rebuilt by walking parents from the target. The queue is ordered by
//! `(cost, discovery index)`, which makes equal-cost ties resolve in the
//! order vertices were found.
//!
//! Detection needs the bytes a change would hold at a vertex. They are
//! produced on demand by running the converters from the parent, and shared
//! with children reached through edges that reuse their input.
//!
//! An edge is expanded at most once per detection outcome: once priced as
//! confirmed and once as unconfirmed. A vertex whose data confirms an edge
//! can still take it after a cheaper vertex used it unconfirmed.

use std::cell::OnceCell;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::rc::Rc;

use tracing::debug;

use super::{Path, PathCost, PathStep, Target};
use crate::conversion::invoke_edge;
use crate::converter::{Converted, ConverterKind, ConverterRegistry};
use crate::registry::{ConverterId, FormatId, FormatRegistry};

#[derive(Clone)]
enum NodeData {
    /// The search runs without data.
    Absent,
    /// The change's own buffer.
    Root,
    Buffer(Rc<[u8]>),
    /// A converter on the way to this vertex failed.
    Failed,
}

struct Vertex {
    format: FormatId,
    parent: Option<usize>,
    step: Option<PathStep>,
    cost: PathCost,
    data: OnceCell<NodeData>,
}

struct Search<'a> {
    formats: &'a FormatRegistry,
    converters: &'a ConverterRegistry,
    root_data: Option<&'a [u8]>,
    vertices: Vec<Vertex>,
}

/// Finds the cheapest path from `start` into `targets`.
///
/// With `data`, detection runs against the bytes at each vertex; without
/// it, no detector is consulted. `None` means no path exists.
pub(crate) fn find_path<T: Target + ?Sized>(
    formats: &FormatRegistry,
    converters: &ConverterRegistry,
    start: FormatId,
    data: Option<&[u8]>,
    targets: &T,
) -> Option<Path> {
    if targets.accepts(start, formats) {
        return Some(Path::empty(start));
    }

    let mut search = Search {
        formats,
        converters,
        root_data: data,
        vertices: vec![Vertex {
            format: start,
            parent: None,
            step: None,
            cost: PathCost::default(),
            data: OnceCell::new(),
        }],
    };
    let mut queue = BinaryHeap::new();
    queue.push(Reverse((PathCost::default(), 0usize)));
    let mut expanded = HashSet::new();

    while let Some(Reverse((cost, idx))) = queue.pop() {
        let format = search.vertices[idx].format;
        if idx != 0 && targets.accepts(format, formats) {
            debug!(
                from = formats.format_name(start),
                to = formats.format_name(format),
                ?cost,
                "found conversion path"
            );
            return Some(search.path_to(idx));
        }

        for child in search.expand(idx, &mut expanded) {
            queue.push(Reverse((search.vertices[child].cost, child)));
        }
    }

    debug!(from = formats.format_name(start), "no conversion path");
    None
}

impl<'a> Search<'a> {
    /// Pushes the children of a vertex and returns their indices.
    fn expand(&mut self, idx: usize, expanded: &mut HashSet<(ConverterId, bool)>) -> Vec<usize> {
        let formats = self.formats;
        let converters = self.converters;
        let format = self.vertices[idx].format;
        let edges = converters.outgoing(format);
        if edges.is_empty() {
            return Vec::new();
        }

        let candidates: Vec<FormatId> = edges
            .iter()
            .map(|id| converters.converter(*id))
            .filter(|c| c.kind() != ConverterKind::Detector)
            .filter(|c| c.is_detect_first() || converters.detector_for(format, c.target()).is_some())
            .map(|c| c.target())
            .collect();
        let has_detector_edges = edges
            .iter()
            .any(|id| converters.converter(*id).kind() == ConverterKind::Detector);

        let data = if candidates.is_empty() && !has_detector_edges {
            NodeData::Absent
        } else {
            self.data(idx)
        };
        if matches!(data, NodeData::Failed) {
            debug!(
                format = formats.format_name(format),
                "abandoning vertex: data could not be produced"
            );
            return Vec::new();
        }

        let children = {
            let bytes = self.bytes(&data);
            let pinned = bytes.and_then(|bytes| self.detect(format, bytes, &candidates));
            if let Some(pinned) = pinned {
                debug!(
                    format = formats.format_name(format),
                    detected = formats.format_name(pinned),
                    "detection pinned vertex"
                );
            }

            let parent_cost = self.vertices[idx].cost;
            let source_objtype = formats.objtype_of(format);
            let mut children = Vec::new();
            for &id in edges {
                let converter = converters.converter(id);
                let target = converter.target();
                if self.on_path(idx, target) {
                    continue;
                }

                let (lossy, confirmed, conversion) = if converter.kind() == ConverterKind::Detector {
                    match bytes {
                        Some(bytes) if pinned == Some(target) || converter.accepts(bytes) => {
                            (false, true, false)
                        }
                        _ => continue,
                    }
                } else if candidates.contains(&target) {
                    match pinned {
                        Some(pinned) if pinned == target => (false, true, true),
                        Some(_) => continue,
                        None => (converter.is_lossy(), false, true),
                    }
                } else {
                    (converter.is_lossy(), false, true)
                };
                if expanded.contains(&(id, confirmed)) {
                    continue;
                }

                let objtype_change = formats.objtype_of(target) != source_objtype;
                let cost = parent_cost.step(lossy, objtype_change, conversion);
                children.push((
                    target,
                    PathStep {
                        converter: id,
                        lossy,
                        confirmed,
                    },
                    cost,
                ));
            }
            children
        };

        let mut pushed = Vec::with_capacity(children.len());
        for (target, step, cost) in children {
            expanded.insert((step.converter, step.confirmed));
            pushed.push(self.vertices.len());
            self.vertices.push(Vertex {
                format: target,
                parent: Some(idx),
                step: Some(step),
                cost,
                data: OnceCell::new(),
            });
        }
        pushed
    }

    /// Pins a vertex to the format its data really is, if that can be told.
    ///
    /// The format's `report_as` hook wins; otherwise the first detector
    /// (in registration order) aimed at a candidate and accepting the data.
    fn detect(&self, format: FormatId, bytes: &[u8], candidates: &[FormatId]) -> Option<FormatId> {
        if let Some(name) = self.formats.format(format).report_as(bytes) {
            if let Some(reported) = self.formats.find_objformat(&name) {
                return Some(reported);
            }
            debug!(
                format = self.formats.format_name(format),
                reported = %name,
                "report_as named an unknown format"
            );
        }

        self.converters
            .detectors_from(format)
            .filter(|detector| candidates.contains(&detector.target()))
            .find(|detector| detector.detect(bytes))
            .map(|detector| detector.target())
    }

    fn on_path(&self, mut idx: usize, format: FormatId) -> bool {
        loop {
            let vertex = &self.vertices[idx];
            if vertex.format == format {
                return true;
            }
            match vertex.parent {
                Some(parent) => idx = parent,
                None => return false,
            }
        }
    }

    fn data(&self, idx: usize) -> NodeData {
        let vertex = &self.vertices[idx];
        if let Some(data) = vertex.data.get() {
            return data.clone();
        }

        let data = match (vertex.parent, vertex.step) {
            (Some(parent), Some(step)) => self.materialize(self.data(parent), step.converter),
            _ if self.root_data.is_some() => NodeData::Root,
            _ => NodeData::Absent,
        };
        vertex.data.get_or_init(|| data).clone()
    }

    fn materialize(&self, parent: NodeData, via: ConverterId) -> NodeData {
        let converter = self.converters.converter(via);
        let result = match self.bytes(&parent) {
            Some(input) => invoke_edge(self.formats, converter, input),
            None => return parent,
        };
        match result {
            Ok(Converted::Reused) => parent,
            Ok(Converted::Replaced(output)) => NodeData::Buffer(Rc::from(output)),
            Err(err) => {
                debug!(
                    source = self.formats.format_name(converter.source()),
                    target = self.formats.format_name(converter.target()),
                    error = %err,
                    "converter failed while producing vertex data"
                );
                NodeData::Failed
            }
        }
    }

    fn bytes<'b>(&'b self, data: &'b NodeData) -> Option<&'b [u8]> {
        match data {
            NodeData::Root => self.root_data,
            NodeData::Buffer(buffer) => Some(&buffer[..]),
            NodeData::Absent | NodeData::Failed => None,
        }
    }

    fn path_to(&self, idx: usize) -> Path {
        let target = self.vertices[idx].format;
        let cost = self.vertices[idx].cost;
        let mut steps = Vec::new();
        let mut current = idx;
        while let (Some(parent), Some(step)) =
            (self.vertices[current].parent, self.vertices[current].step)
        {
            steps.push(step);
            current = parent;
        }
        steps.reverse();
        Path::new(self.vertices[current].format, target, steps, cost)
    }
}
