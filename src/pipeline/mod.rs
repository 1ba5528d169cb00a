//! Asset pipelines.
//!
//! | Module   | Category  | Output                                   |
//! |----------|-----------|------------------------------------------|
//! | `style`  | styles    | `<name>.min.css` + `.map`                |
//! | `script` | scripts   | `<name>.min.js` + `.map`                 |
//! | `image`  | images    | compressed copies, content-hash cache    |
//! | `fonts`  | fonts     | changed files copied                     |
//!
//! Every pipeline expands its source patterns, processes each source
//! group concurrently on rayon, joins, and fails iff any group failed.

mod context;
mod emit;
mod error;
mod fonts;
pub mod image;
pub mod script;
mod style;

pub use context::{BuildContext, Deployment};
pub use error::PipelineError;

use std::fmt;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::core::AssetCategory;
use crate::utils;

/// A source file and the directory its output path is relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub path: PathBuf,
    pub base: PathBuf,
}

impl Source {
    /// Output name relative to the destination directory, with the file
    /// extension replaced by `ext` (e.g. `admin/app.scss` → `admin/app.min.css`).
    pub fn output_name(&self, ext: &str) -> String {
        let rel = self.relative();
        let stem = rel
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = format!("{stem}.{ext}");
        match rel.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => format!("{}/{name}", utils::path::to_slash(parent)),
            None => name,
        }
    }

    /// Path relative to the pattern base, kept verbatim in the output tree.
    pub fn relative(&self) -> PathBuf {
        utils::path::relative_to(&self.path, &self.base)
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Expand the category's source patterns, keeping each pattern's base.
pub fn sources(ctx: &BuildContext, category: AssetCategory) -> Result<Vec<Source>, PipelineError> {
    let root = ctx.config.get_root();
    let mut out: Vec<Source> = Vec::new();

    for pattern in &ctx.config.paths.get(category).src {
        let base = utils::glob::base_dir(root, pattern);
        let files = utils::glob::expand(root, std::slice::from_ref(pattern))
            .map_err(PipelineError::Sources)?;
        for path in files {
            if !out.iter().any(|s| s.path == path) {
                out.push(Source {
                    path,
                    base: base.clone(),
                });
            }
        }
    }

    Ok(out)
}

/// Outcome of a successful pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReport {
    /// Files written to the destination directory.
    pub written: Vec<PathBuf>,
    /// Sources skipped because their output is current.
    pub unchanged: usize,
}

impl TaskReport {
    fn merge(mut self, other: Self) -> Self {
        self.written.extend(other.written);
        self.unchanged += other.unchanged;
        self
    }
}

impl fmt::Display for TaskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.written.len();
        write!(f, "{n} file{} written", if n == 1 { "" } else { "s" })?;
        if self.unchanged > 0 {
            write!(f, ", {} unchanged", self.unchanged)?;
        }
        Ok(())
    }
}

/// Run one group per source concurrently and join.
///
/// Fails iff any group failed; successful groups keep their output.
pub fn run_groups<F>(
    category: AssetCategory,
    sources: &[Source],
    build: F,
) -> Result<TaskReport, PipelineError>
where
    F: Fn(&Source) -> Result<TaskReport, PipelineError> + Sync,
{
    let results: Vec<_> = sources.par_iter().map(&build).collect();

    let mut report = TaskReport::default();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(r) => report = report.merge(r),
            Err(e) => failures.push(e),
        }
    }

    if failures.is_empty() {
        Ok(report)
    } else {
        Err(PipelineError::Failed {
            category,
            total: sources.len(),
            failures,
        })
    }
}

/// Run the pipeline for one category.
pub fn run(ctx: &BuildContext, category: AssetCategory) -> Result<TaskReport, PipelineError> {
    match category {
        AssetCategory::Styles => style::run(ctx),
        AssetCategory::Scripts => script::run(ctx),
        AssetCategory::Images => image::run(ctx),
        AssetCategory::Fonts => fonts::run(ctx),
    }
}

/// Something that can rerun a category's pipeline (the watch loop's view).
pub trait Rebuild: Send + Sync + 'static {
    fn rebuild(&self, category: AssetCategory) -> Result<TaskReport, PipelineError>;
}

impl Rebuild for BuildContext {
    fn rebuild(&self, category: AssetCategory) -> Result<TaskReport, PipelineError> {
        run(self, category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_output_name_keeps_subdirectories() {
        let source = Source {
            path: PathBuf::from("/p/src/scss/admin/app.scss"),
            base: PathBuf::from("/p/src/scss"),
        };
        assert_eq!(source.output_name("min.css"), "admin/app.min.css");

        let flat = Source {
            path: PathBuf::from("/p/src/js/app.js"),
            base: PathBuf::from("/p/src/js"),
        };
        assert_eq!(flat.output_name("min.js"), "app.min.js");
    }

    #[test]
    fn test_sources_use_pattern_base() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/img/icons")).unwrap();
        fs::write(dir.path().join("src/img/icons/a.svg"), "<svg/>").unwrap();

        let ctx = BuildContext::local(Arc::new(crate::config::test_config_at(dir.path(), "")));
        let sources = sources(&ctx, AssetCategory::Images).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].relative(), PathBuf::from("icons/a.svg"));
    }

    #[test]
    fn test_run_groups_fails_if_any_group_fails() {
        let sources: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|n| Source {
                path: PathBuf::from(n),
                base: PathBuf::new(),
            })
            .collect();

        let result = run_groups(AssetCategory::Styles, &sources, |s| {
            if s.path == Path::new("b") {
                Err(PipelineError::compile(&s.path, "boom"))
            } else {
                Ok(TaskReport {
                    written: vec![s.path.clone()],
                    unchanged: 0,
                })
            }
        });

        match result {
            Err(PipelineError::Failed { total, failures, .. }) => {
                assert_eq!(total, 3);
                assert_eq!(failures.len(), 1);
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_report_display() {
        let report = TaskReport {
            written: vec![PathBuf::from("a"), PathBuf::from("b")],
            unchanged: 3,
        };
        assert_eq!(report.to_string(), "2 files written, 3 unchanged");
    }
}
