//! One-shot pipeline runs (`styles`, `js`, `images`, `fonts`, `build`).

use std::time::Instant;

use anyhow::{Result, bail};

use crate::core::AssetCategory;
use crate::log;
use crate::pipeline::{self, BuildContext};

/// Run the given pipelines in order, logging each outcome.
///
/// Every pipeline runs even if an earlier one failed; the command fails if
/// any of them did.
pub fn run_tasks(ctx: &BuildContext, categories: &[AssetCategory]) -> Result<()> {
    let mut failed = Vec::new();

    for &category in categories {
        let module = category.log_module();
        let start = Instant::now();

        match pipeline::run(ctx, category) {
            Ok(report) => {
                log!(module; "{} in {:.2?}", report, start.elapsed());
            }
            Err(e) => {
                for failure in e.failures() {
                    log!(module; "{}", failure.detail());
                }
                log!(module; "{}", e);
                failed.push(category);
            }
        }
    }

    match failed.as_slice() {
        [] => Ok(()),
        [one] => bail!("{one} failed"),
        many => bail!(
            "{} failed",
            many.iter()
                .map(|c| c.name())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}
