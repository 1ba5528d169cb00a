//! Style pipeline: Sass → CSS → vendor prefixes → minify → `.min.css` + map.
//!
//! `grass` compiles Sass; `lightningcss` adds prefixes for the configured
//! browser range and minifies. z-index values pass through untouched
//! (lightningcss never rebases them).

use std::path::Path;

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::Targets;
use parcel_sourcemap::SourceMap;

use super::{BuildContext, PipelineError, Source, TaskReport, emit::emit, run_groups, sources};
use crate::core::AssetCategory;
use crate::remote::Artifact;
use crate::utils;

pub fn run(ctx: &BuildContext) -> Result<TaskReport, PipelineError> {
    let sources: Vec<Source> = sources(ctx, AssetCategory::Styles)?
        .into_iter()
        .filter(|s| !is_partial(&s.path))
        .collect();

    let targets = Targets {
        browsers: ctx
            .config
            .styles
            .targets()
            .map_err(|e| PipelineError::compile("styles.browsers", e))?,
        ..Targets::default()
    };

    run_groups(AssetCategory::Styles, &sources, |source| {
        let artifacts = compile(ctx, source, targets)?;
        let written = emit(ctx, AssetCategory::Styles, &artifacts)?;
        Ok(TaskReport {
            written,
            unchanged: 0,
        })
    })
}

/// Sass partials (`_name.scss`) are only compiled through `@use`/`@import`.
fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

/// Compile one stylesheet into its `.min.css` (and `.map`) artifacts.
fn compile(
    ctx: &BuildContext,
    source: &Source,
    targets: Targets,
) -> Result<Vec<Artifact>, PipelineError> {
    let config = &ctx.config;
    let css = compile_sass(&source.path, &config.styles.load_paths)?;

    let css_name = source.output_name("min.css");
    let map_name = format!("{css_name}.map");
    let file_name = css_name.rsplit('/').next().unwrap_or(&css_name).to_string();

    let dest_file = config.dest_dir(AssetCategory::Styles).join(&css_name);
    let dest_dir = dest_file.parent().unwrap_or(&dest_file);
    let source_url = utils::path::relative_url(dest_dir, &source.path);

    let (mut code, map) = minify(&css, &source_url, targets, config.styles.source_map)
        .map_err(|e| PipelineError::compile(&source.path, e))?;

    let mut artifacts = Vec::with_capacity(2);
    if let Some(map) = map {
        let map = finish_source_map(&map, &file_name, &source_url, &css)
            .map_err(|e| PipelineError::compile(&source.path, e))?;
        code.push_str(&format!("\n/*# sourceMappingURL={file_name}.map */"));
        artifacts.push(Artifact::new(css_name, code));
        artifacts.push(Artifact::new(map_name, map));
    } else {
        artifacts.push(Artifact::new(css_name, code));
    }

    Ok(artifacts)
}

/// Compile Sass (or read plain CSS) to expanded CSS.
///
/// The file's own directory is always a load path.
fn compile_sass(path: &Path, load_paths: &[std::path::PathBuf]) -> Result<String, PipelineError> {
    let is_css = path.extension().and_then(|e| e.to_str()) == Some("css");
    if is_css {
        return std::fs::read_to_string(path).map_err(|e| PipelineError::Io(path.to_path_buf(), e));
    }

    let mut options = grass::Options::default()
        .style(grass::OutputStyle::Expanded)
        .load_paths(load_paths);
    if let Some(dir) = path.parent() {
        options = options.load_path(dir);
    }

    grass::from_path(path, &options).map_err(|e| PipelineError::compile(path, e))
}

/// Prefix and minify. Returns the CSS and, when requested, the raw map JSON.
fn minify(
    css: &str,
    filename: &str,
    targets: Targets,
    with_map: bool,
) -> Result<(String, Option<String>), String> {
    let mut stylesheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: filename.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| e.to_string())?;

    stylesheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| e.to_string())?;

    let mut source_map = with_map.then(|| {
        let mut map = SourceMap::new("/");
        map.add_source(filename);
        map
    });

    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            targets,
            source_map: source_map.as_mut(),
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;

    let map = match source_map.as_mut() {
        Some(map) => Some(map.to_json(None).map_err(|e| format!("{e:?}"))?),
        None => None,
    };

    Ok((result.code, map))
}

/// Pin `file`, `sources` and `sourcesContent` of the printed map.
///
/// grass produces no source map of its own, so the mappings and the
/// embedded content are the compiled CSS, not the Sass text. The single
/// source is therefore the Sass entry's URL (relative to the map's
/// directory) labelled ` (compiled)`.
fn finish_source_map(
    raw: &str,
    file: &str,
    source_url: &str,
    css: &str,
) -> Result<String, String> {
    let mut map: serde_json::Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    map["version"] = serde_json::json!(3);
    map["file"] = serde_json::json!(file);
    map["sources"] = serde_json::json!([format!("{source_url} (compiled)")]);
    map["sourcesContent"] = serde_json::json!([css]);
    serde_json::to_string(&map).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Deployment;
    use crate::remote::testing::RecordingSink;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn project(files: &[(&str, &str)]) -> (TempDir, BuildContext) {
        let dir = TempDir::new().unwrap();
        for (path, content) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let config = crate::config::test_config_at(dir.path(), "");
        (dir, BuildContext::local(Arc::new(config)))
    }

    #[test]
    fn test_one_css_and_one_map() {
        let (dir, ctx) = project(&[
            ("src/scss/_vars.scss", "$accent: #ff0000;"),
            ("src/scss/app.scss", "@use 'vars';\n.btn { color: vars.$accent; }"),
        ]);

        let report = run(&ctx).unwrap();
        assert_eq!(report.written.len(), 2);

        let out = dir.path().join("build/css");
        let mut names: Vec<_> = fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["app.min.css", "app.min.css.map"]);

        let css = fs::read_to_string(out.join("app.min.css")).unwrap();
        assert!(css.starts_with(".btn{color:red}"));
        assert!(css.ends_with("/*# sourceMappingURL=app.min.css.map */"));

        let map: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("app.min.css.map")).unwrap())
                .unwrap();
        assert_eq!(map["file"], "app.min.css");
        assert_eq!(map["sources"][0], "../../src/scss/app.scss (compiled)");
        // content is what the mappings point into
        let content = map["sourcesContent"][0].as_str().unwrap();
        assert!(content.contains("color: #ff0000"));
        assert!(!content.contains("@use"));
    }

    #[test]
    fn test_vendor_prefixes_for_browser_range() {
        let (dir, ctx) = project(&[(
            "src/scss/app.scss",
            ".glass { backdrop-filter: blur(4px); user-select: none; }",
        )]);

        run(&ctx).unwrap();
        let css = fs::read_to_string(dir.path().join("build/css/app.min.css")).unwrap();
        assert!(css.contains("-webkit-backdrop-filter:blur(4px)"));
        assert!(css.contains("-webkit-user-select:none"));
    }

    #[test]
    fn test_z_index_preserved() {
        let (dir, ctx) = project(&[(
            "src/scss/app.scss",
            ".modal { z-index: 1000; } .toast { z-index: 9999; }",
        )]);

        run(&ctx).unwrap();
        let css = fs::read_to_string(dir.path().join("build/css/app.min.css")).unwrap();
        assert!(css.contains("z-index:1000"));
        assert!(css.contains("z-index:9999"));
    }

    #[test]
    fn test_compile_error_produces_no_output() {
        let (dir, ctx) = project(&[("src/scss/app.scss", ".a { color: $missing; }")]);

        let err = run(&ctx).unwrap_err();
        assert!(matches!(err, PipelineError::Failed { .. }));
        assert!(!dir.path().join("build/css/app.min.css").exists());
    }

    #[test]
    fn test_deploy_uploads_both_files() {
        let (_dir, ctx) = project(&[("src/scss/app.scss", "a { color: blue; }")]);
        let sink = Arc::new(RecordingSink::default());
        let ctx = ctx.with_deployment(Deployment {
            base: "/srv/site/".to_string(),
            sink: sink.clone(),
            ignore_errors: false,
        });

        run(&ctx).unwrap();

        let uploads = sink.uploads.lock();
        assert_eq!(uploads.len(), 1);
        let (dir, artifacts) = &uploads[0];
        assert_eq!(dir, "/srv/site/build/css");
        let names: Vec<_> = artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["app.min.css", "app.min.css.map"]);
    }

    #[test]
    fn test_partials_are_skipped() {
        assert!(is_partial(Path::new("src/scss/_mixins.scss")));
        assert!(!is_partial(Path::new("src/scss/app.scss")));
    }
}
