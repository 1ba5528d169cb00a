//! Script pipeline: entry → module graph → bundle → `.min.js` + map.
//!
//! ```text
//! app.js ──resolve/transform──▶ ModuleGraph ──assemble──▶ Bundle
//!                                                          │
//!                  app.min.js + app.min.js.map ◀──minify───┘
//! ```
//!
//! Each module is lowered on its own (so injected runtime helpers resolve
//! like any other import), rewritten into a factory body, and the whole
//! bundle is compressed and mangled once at the end. Helpers come from
//! `node_modules` when installed and from the binary otherwise.
//!
//! The transformer's lowest target is ES2015, so that is the syntax floor
//! of every bundle regardless of the stylesheet browser range.

mod bundle;
mod graph;
mod resolve;
mod rewrite;
mod sourcemap;

use oxc::transformer::TransformOptions;

use graph::ModuleGraph;

use super::{BuildContext, PipelineError, Source, TaskReport, emit::emit, run_groups, sources};
use crate::core::AssetCategory;
use crate::remote::Artifact;
use crate::utils::path::normalize_path;

pub fn run(ctx: &BuildContext) -> Result<TaskReport, PipelineError> {
    let sources = sources(ctx, AssetCategory::Scripts)?;
    let options = ctx
        .config
        .scripts
        .transform_options()
        .map_err(|e| PipelineError::compile("scripts.target", e))?;

    run_groups(AssetCategory::Scripts, &sources, |source| {
        let artifacts = bundle_entry(ctx, source, &options)?;
        let written = emit(ctx, AssetCategory::Scripts, &artifacts)?;
        Ok(TaskReport {
            written,
            unchanged: 0,
        })
    })
}

/// Bundle one entry into its `.min.js` (and `.map`) artifacts.
fn bundle_entry(
    ctx: &BuildContext,
    source: &Source,
    options: &TransformOptions,
) -> Result<Vec<Artifact>, PipelineError> {
    let config = &ctx.config;
    let graph = ModuleGraph::build(&source.path, options)?;
    let assembled = bundle::assemble(&graph);

    let js_name = source.output_name("min.js");
    let map_name = format!("{js_name}.map");
    let file_name = js_name.rsplit('/').next().unwrap_or(&js_name).to_string();

    let with_map = config.scripts.source_map;
    let (mut code, map) = bundle::minify(
        &assembled,
        bundle::es_target(&config.scripts.target),
        with_map.then_some(source.path.as_path()),
    )
    .map_err(|e| PipelineError::compile(&source.path, e))?;

    let Some(map) = map.filter(|_| with_map) else {
        return Ok(vec![Artifact::new(js_name, code)]);
    };

    // module paths are canonical, so the map's directory must be too
    let dest_file = normalize_path(config.get_root())
        .join(&config.paths.get(AssetCategory::Scripts).dest)
        .join(&js_name);
    let map_dir = dest_file.parent().unwrap_or(&dest_file);
    let map = sourcemap::compose(&map, &assembled, &graph, &file_name, map_dir);

    code.push_str(&format!("\n//# sourceMappingURL={file_name}.map"));
    Ok(vec![Artifact::new(js_name, code), Artifact::new(map_name, map)])
}
