//! Font pipeline: copy font files whose content changed.

use std::fs;

use super::{BuildContext, PipelineError, TaskReport, run_groups, sources};
use crate::core::AssetCategory;
use crate::freshness::compute_file_hash;

pub fn run(ctx: &BuildContext) -> Result<TaskReport, PipelineError> {
    let sources = sources(ctx, AssetCategory::Fonts)?;
    let dest_dir = ctx.config.dest_dir(AssetCategory::Fonts);

    run_groups(AssetCategory::Fonts, &sources, |source| {
        let target = dest_dir.join(source.relative());

        let source_hash = compute_file_hash(&source.path)
            .map_err(|e| PipelineError::Io(source.path.clone(), e))?;
        if compute_file_hash(&target).is_ok_and(|h| h == source_hash) {
            return Ok(TaskReport {
                written: Vec::new(),
                unchanged: 1,
            });
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::Io(parent.to_path_buf(), e))?;
        }
        fs::copy(&source.path, &target).map_err(|e| PipelineError::Io(target.clone(), e))?;

        Ok(TaskReport {
            written: vec![target],
            unchanged: 0,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_copies_then_skips_unchanged() {
        let dir = TempDir::new().unwrap();
        let fonts = dir.path().join("src/fonts/inter");
        fs::create_dir_all(&fonts).unwrap();
        fs::write(fonts.join("inter.woff2"), b"wOF2....").unwrap();

        let ctx = BuildContext::local(Arc::new(crate::config::test_config_at(dir.path(), "")));

        let first = run(&ctx).unwrap();
        assert_eq!(first.written.len(), 1);
        assert!(dir.path().join("build/fonts/inter/inter.woff2").exists());

        let second = run(&ctx).unwrap();
        assert!(second.written.is_empty());
        assert_eq!(second.unchanged, 1);

        fs::write(fonts.join("inter.woff2"), b"wOF2 v2").unwrap();
        let third = run(&ctx).unwrap();
        assert_eq!(third.written.len(), 1);
    }

    #[test]
    fn test_no_fonts_is_fine() {
        let dir = TempDir::new().unwrap();
        let ctx = BuildContext::local(Arc::new(crate::config::test_config_at(dir.path(), "")));
        assert_eq!(run(&ctx).unwrap(), TaskReport::default());
    }
}
