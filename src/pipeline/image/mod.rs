//! Image pipeline: per-format compression behind a content-hash cache.
//!
//! | Format | Treatment                                              |
//! |--------|--------------------------------------------------------|
//! | GIF    | lossless re-encode, interlaced                         |
//! | JPEG   | progressive, lowest quality meeting the SSIM target    |
//! | PNG    | palette quantization to an indexed PNG                 |
//! | SVG    | usvg normalize (files with `<text` copied unchanged)   |
//! | other  | copied                                                 |
//!
//! Raster outputs that are not smaller than their source are replaced by
//! the source bytes. Images are never mirrored to the remote host.

mod cache;
mod gif;
mod jpeg;
mod png;
mod svg;

use std::fs;
use std::path::Path;

use rustc_hash::FxHashSet;

use cache::{CacheEntry, ImageCache};

use super::{BuildContext, PipelineError, Source, TaskReport, emit::emit, run_groups, sources};
use crate::config::ImagesConfig;
use crate::core::AssetCategory;
use crate::debug;
use crate::freshness::ContentHash;
use crate::logger::ProgressLine;
use crate::remote::Artifact;
use crate::utils;

pub fn run(ctx: &BuildContext) -> Result<TaskReport, PipelineError> {
    let sources = sources(ctx, AssetCategory::Images)?;
    let cache = ImageCache::load(&ctx.config.image_cache_path());
    let live: FxHashSet<String> = sources.iter().map(|s| cache_key(ctx, s)).collect();
    cache.retain(|key| live.contains(key));
    let fingerprint = options_fingerprint(&ctx.config.images);

    let progress =
        (sources.len() > 1).then(|| ProgressLine::new("images", &[("images", sources.len())]));

    let result = run_groups(AssetCategory::Images, &sources, |source| {
        let outcome = process(ctx, &cache, fingerprint, source);
        if let Some(progress) = &progress {
            progress.inc("images");
        }
        outcome
    });

    if let Some(progress) = progress {
        progress.finish();
    }

    // successful files stay cached even when others failed
    let saved = cache.save();
    let report = result?;
    saved?;
    Ok(report)
}

/// Hash of everything that changes compressed output besides the source.
fn options_fingerprint(config: &ImagesConfig) -> ContentHash {
    let options = serde_json::to_vec(&(&config.jpeg, &config.png)).unwrap_or_default();
    let mut hasher = blake3::Hasher::new();
    hasher.update(env!("CARGO_PKG_VERSION").as_bytes());
    hasher.update(&options);
    ContentHash::new(*hasher.finalize().as_bytes())
}

/// Project-relative, forward-slash path of a source.
fn cache_key(ctx: &BuildContext, source: &Source) -> String {
    utils::path::to_slash(&ctx.config.root_relative(&source.path))
}

fn process(
    ctx: &BuildContext,
    cache: &ImageCache,
    fingerprint: ContentHash,
    source: &Source,
) -> Result<TaskReport, PipelineError> {
    let config = &ctx.config;
    let name = utils::path::to_slash(&source.relative());
    let output = config.dest_dir(AssetCategory::Images).join(&name);
    let key = cache_key(ctx, source);

    let bytes = fs::read(&source.path).map_err(|e| PipelineError::Io(source.path.clone(), e))?;
    let entry = CacheEntry {
        source: ContentHash::of(&bytes),
        options: fingerprint,
    };

    if output.is_file() && cache.is_fresh(&key, &entry) {
        debug!("images"; "cached {}", name);
        return Ok(TaskReport {
            written: Vec::new(),
            unchanged: 1,
        });
    }

    let compressed = compress(&source.path, &bytes, &config.images)
        .map_err(|e| PipelineError::compile(&source.path, e))?;
    debug!("images"; "{} {} → {} bytes", name, bytes.len(), compressed.len());

    let written = emit(ctx, AssetCategory::Images, &[Artifact::new(name, compressed)])?;
    cache.record(key, entry);

    Ok(TaskReport {
        written,
        unchanged: 0,
    })
}

/// Compress one file according to its extension.
pub fn compress(path: &Path, bytes: &[u8], config: &ImagesConfig) -> Result<Vec<u8>, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let candidate = match ext.as_str() {
        "gif" => gif::recompress(bytes)?,
        "jpg" | "jpeg" => jpeg::recompress(bytes, &config.jpeg)?,
        "png" => match png::quantize(bytes, &config.png)? {
            Some(quantized) => quantized,
            None => return Ok(bytes.to_vec()),
        },
        "svg" => return svg::optimize(bytes),
        _ => return Ok(bytes.to_vec()),
    };

    Ok(if candidate.len() < bytes.len() {
        candidate
    } else {
        bytes.to_vec()
    })
}
