//! `[paths]` section: the path table.
//!
//! Maps each asset category to its source patterns, watch patterns and
//! destination directory. Patterns are relative to the project root.
//!
//! # Example
//!
//! ```toml
//! [paths.styles]
//! src = ["src/scss/app.scss", "src/scss/admin.scss"]
//! watch = "src/scss/**/*.scss"
//! dest = "build/css/"
//! ```

use serde::{Deserialize, Deserializer, Serialize};

use super::{ConfigDiagnostics, FieldPath};
use crate::core::AssetCategory;

/// Source patterns, destination and watch patterns for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPaths {
    /// Files fed to the pipeline (literal paths or globs).
    #[serde(deserialize_with = "one_or_many")]
    pub src: Vec<String>,

    /// Patterns whose changes rerun the pipeline in watch mode.
    #[serde(deserialize_with = "one_or_many")]
    pub watch: Vec<String>,

    /// Output directory, relative to the project root.
    pub dest: String,
}

impl CategoryPaths {
    fn new(src: &str, watch: &str, dest: &str) -> Self {
        Self {
            src: vec![src.to_string()],
            watch: vec![watch.to_string()],
            dest: dest.to_string(),
        }
    }
}

/// Category → paths. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathTable {
    pub scripts: CategoryPaths,
    pub styles: CategoryPaths,
    pub images: CategoryPaths,
    pub fonts: CategoryPaths,
}

impl Default for PathTable {
    fn default() -> Self {
        Self {
            scripts: CategoryPaths::new("src/js/app.js", "src/js/**/*.js", "build/js/"),
            styles: CategoryPaths::new("src/scss/app.scss", "src/scss/**/*.scss", "build/css/"),
            images: CategoryPaths::new("src/img/**/*.*", "src/img/**/*.*", "build/img/"),
            fonts: CategoryPaths::new("src/fonts/**/*.*", "src/fonts/**/*.*", "build/fonts/"),
        }
    }
}

impl PathTable {
    pub fn get(&self, category: AssetCategory) -> &CategoryPaths {
        match category {
            AssetCategory::Scripts => &self.scripts,
            AssetCategory::Styles => &self.styles,
            AssetCategory::Images => &self.images,
            AssetCategory::Fonts => &self.fonts,
        }
    }

    /// Check that patterns are relative and destinations don't overlap.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        for category in AssetCategory::ALL {
            let paths = self.get(category);
            let field = FieldPath::new(field_name(category));

            if paths.src.is_empty() {
                diag.error(field, "at least one `src` pattern is required");
            }
            let absolute = paths
                .src
                .iter()
                .chain(&paths.watch)
                .chain(std::iter::once(&paths.dest))
                .find(|p| p.starts_with('/'));
            if let Some(path) = absolute {
                diag.error_with_hint(
                    field,
                    format!("path must be relative to the project root: {path}"),
                    "remove the leading `/`",
                );
            }
        }

        let mut dests: Vec<_> = AssetCategory::ALL
            .iter()
            .map(|&c| (c, normalize_dest(&self.get(c).dest)))
            .collect();
        dests.sort_by(|a, b| a.1.cmp(&b.1));
        for pair in dests.windows(2) {
            if pair[0].1 == pair[1].1 {
                diag.error(
                    FieldPath::new(field_name(pair[1].0)),
                    format!(
                        "`dest` is shared with [paths.{}]; each category needs its own directory",
                        pair[0].0
                    ),
                );
            }
        }
    }
}

fn field_name(category: AssetCategory) -> &'static str {
    match category {
        AssetCategory::Scripts => "paths.scripts",
        AssetCategory::Styles => "paths.styles",
        AssetCategory::Images => "paths.images",
        AssetCategory::Fonts => "paths.fonts",
    }
}

fn normalize_dest(dest: &str) -> &str {
    dest.trim_start_matches("./").trim_end_matches('/')
}

/// Accept either `"pattern"` or `["a", "b"]`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}
