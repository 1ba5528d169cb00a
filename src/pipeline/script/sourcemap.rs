//! Source map composition.
//!
//! The minified bundle's map points into the assembled bundle text. Each
//! bundle line belongs to one module body, whose own map points into the
//! original file. Chaining the two yields the map shipped next to
//! `<name>.min.js`.

use std::path::Path;

use oxc_sourcemap::{SourceMap, SourceMapBuilder};

use super::bundle::Bundle;
use super::graph::ModuleGraph;
use crate::utils;

/// A mapping segment, flattened for lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    dst_line: u32,
    dst_col: u32,
    src_line: u32,
    src_col: u32,
    source: Option<u32>,
    name: Option<u32>,
}

fn segments(map: &SourceMap) -> Vec<Segment> {
    let mut segments: Vec<Segment> = map
        .get_tokens()
        .map(|t| Segment {
            dst_line: t.get_dst_line(),
            dst_col: t.get_dst_col(),
            src_line: t.get_src_line(),
            src_col: t.get_src_col(),
            source: t.get_source_id(),
            name: t.get_name_id(),
        })
        .collect();
    segments.sort_by_key(|s| (s.dst_line, s.dst_col));
    segments
}

/// Closest segment at or before (`line`, `col`) on the same line.
fn lookup(segments: &[Segment], line: u32, col: u32) -> Option<&Segment> {
    let idx = segments.partition_point(|s| (s.dst_line, s.dst_col) <= (line, col));
    let candidate = segments[..idx].last().filter(|s| s.dst_line == line);
    // a position before the line's first segment maps like that segment
    candidate.or_else(|| segments.get(idx).filter(|s| s.dst_line == line))
}

/// Compose `minified` (bundle output → bundle text) with each module's
/// map (module body → original file).
///
/// `file` is the bundle's file name; sources are written relative to
/// `map_dir`, with their original text embedded.
pub fn compose(
    minified: &SourceMap,
    bundle: &Bundle,
    graph: &ModuleGraph,
    file: &str,
    map_dir: &Path,
) -> String {
    let module_segments: Vec<Option<Vec<Segment>>> = graph
        .modules
        .iter()
        .map(|m| m.map.as_ref().map(segments))
        .collect();
    let mut source_ids: Vec<Option<u32>> = vec![None; graph.modules.len()];

    let mut builder = SourceMapBuilder::default();
    builder.set_file(file);

    for token in segments(minified) {
        if token.source.is_none() {
            continue;
        }
        let Some((index, local_line)) = bundle.locate(token.src_line) else {
            continue;
        };
        let module = &graph.modules[index];
        if module.embedded {
            continue;
        }

        let (src_line, src_col, name) = match &module_segments[index] {
            Some(segs) => match lookup(segs, local_line, token.src_col) {
                Some(seg) => (
                    seg.src_line,
                    seg.src_col,
                    seg.name.and_then(|id| module_name(module, id)),
                ),
                None => continue,
            },
            // JSON modules map onto themselves
            None => (local_line, token.src_col, None),
        };
        let name = name.or_else(|| token.name.and_then(|id| minified.get_name(id).map(|n| n.to_string())));

        let source_id = *source_ids[index].get_or_insert_with(|| {
            builder.add_source_and_content(
                &utils::path::relative_url(map_dir, &module.path),
                &module.source,
            )
        });
        let name_id = name.map(|n| builder.add_name(&n));

        builder.add_token(
            token.dst_line,
            token.dst_col,
            src_line,
            src_col,
            Some(source_id),
            name_id,
        );
    }

    builder.into_sourcemap().to_json_string()
}

fn module_name(module: &super::graph::Module, id: u32) -> Option<String> {
    module.map.as_ref()?.get_name(id).map(|n| n.to_string())
}
