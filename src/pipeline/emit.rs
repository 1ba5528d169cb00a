//! Output stage shared by the pipelines: write locally, then mirror.

use std::fs;
use std::path::PathBuf;

use super::{BuildContext, PipelineError};
use crate::core::AssetCategory;
use crate::debug;
use crate::remote::{Artifact, remote_dir};

/// Write artifacts under the category's destination directory.
///
/// When the context carries a deployment and the category is mirrored,
/// the same bytes are then uploaded to `<remote base><dest>`. Upload
/// failures are swallowed (logged at debug level) when `ignore_errors`.
pub fn emit(
    ctx: &BuildContext,
    category: AssetCategory,
    artifacts: &[Artifact],
) -> Result<Vec<PathBuf>, PipelineError> {
    let written = write_local(ctx, category, artifacts)?;

    if category.mirrors_remote() {
        mirror(ctx, category, artifacts)?;
    }

    Ok(written)
}

fn write_local(
    ctx: &BuildContext,
    category: AssetCategory,
    artifacts: &[Artifact],
) -> Result<Vec<PathBuf>, PipelineError> {
    let dest = ctx.config.dest_dir(category);
    let mut written = Vec::with_capacity(artifacts.len());

    for artifact in artifacts {
        let path = dest.join(&artifact.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::Io(parent.to_path_buf(), e))?;
        }
        fs::write(&path, &artifact.bytes).map_err(|e| PipelineError::Io(path.clone(), e))?;
        debug!(category.log_module(); "wrote {}", ctx.config.root_relative(&path).display());
        written.push(path);
    }

    Ok(written)
}

fn mirror(
    ctx: &BuildContext,
    category: AssetCategory,
    artifacts: &[Artifact],
) -> Result<(), PipelineError> {
    let Some(deploy) = &ctx.deploy else {
        return Ok(());
    };
    if artifacts.is_empty() {
        return Ok(());
    }

    let dir = remote_dir(&deploy.base, &ctx.config.paths.get(category).dest);
    match deploy.sink.upload(&dir, artifacts) {
        Ok(()) => {
            debug!("remote"; "uploaded {} file(s) to {}", artifacts.len(), dir);
            Ok(())
        }
        Err(e) if deploy.ignore_errors => {
            debug!("remote"; "upload to {} failed (ignored): {}", dir, e);
            Ok(())
        }
        Err(source) => Err(PipelineError::Remote { dir, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Deployment;
    use crate::remote::testing::{RecordingSink, UnreachableSink};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> BuildContext {
        BuildContext::local(Arc::new(crate::config::test_config_at(dir.path(), "")))
    }

    fn artifacts() -> Vec<Artifact> {
        vec![
            Artifact::new("app.min.css", "a{color:red}"),
            Artifact::new("app.min.css.map", "{}"),
        ]
    }

    #[test]
    fn test_local_only_without_deployment() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);

        let written = emit(&ctx, AssetCategory::Styles, &artifacts()).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("build/css/app.min.css")).unwrap(),
            "a{color:red}"
        );
    }

    #[test]
    fn test_deploy_mirrors_identical_bytes() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let ctx = context(&dir).with_deployment(Deployment {
            base: "/var/www/".to_string(),
            sink: sink.clone(),
            ignore_errors: false,
        });

        emit(&ctx, AssetCategory::Styles, &artifacts()).unwrap();

        let uploads = sink.uploads.lock();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, "/var/www/build/css");
        assert_eq!(uploads[0].1, artifacts());
    }

    #[test]
    fn test_images_are_never_mirrored() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let ctx = context(&dir).with_deployment(Deployment {
            base: "/var/www/".to_string(),
            sink: sink.clone(),
            ignore_errors: false,
        });

        emit(&ctx, AssetCategory::Images, &[Artifact::new("a.png", "x")]).unwrap();
        assert!(sink.uploads.lock().is_empty());
    }

    #[test]
    fn test_unreachable_host_ignored() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir).with_deployment(Deployment {
            base: "/var/www/".to_string(),
            sink: Arc::new(UnreachableSink),
            ignore_errors: true,
        });

        emit(&ctx, AssetCategory::Scripts, &[Artifact::new("app.min.js", "1")]).unwrap();
        assert!(dir.path().join("build/js/app.min.js").exists());
    }

    #[test]
    fn test_unreachable_host_strict() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir).with_deployment(Deployment {
            base: "/var/www/".to_string(),
            sink: Arc::new(UnreachableSink),
            ignore_errors: false,
        });

        let err = emit(&ctx, AssetCategory::Scripts, &[Artifact::new("app.min.js", "1")])
            .unwrap_err();
        assert!(matches!(err, PipelineError::Remote { .. }));
        // Local output is still written first
        assert!(dir.path().join("build/js/app.min.js").exists());
    }
}
