//! Command: replace an executable that may still be running.
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::DeployOpts;
use crate::exec::SystemExecutor;
use crate::logging::Logger;
use crate::operations::{RetryPolicy, SystemFileSystemOps, SystemProcessTerminator, replace_file};

/// Copy the running binary over `opts.to`.
///
/// A locked destination is retried on the default policy, terminating other
/// running instances of the same image once.
///
/// # Errors
///
/// Returns an error if the current executable cannot be located or the
/// destination cannot be replaced.
pub fn run(opts: &DeployOpts, log: &Arc<Logger>) -> Result<()> {
    let source = std::env::current_exe().context("locating the running executable")?;
    log.stage(&format!("Deploying to {}", opts.to.display()));
    if source == opts.to {
        log.info("already running from the destination; nothing to do");
        return Ok(());
    }

    let terminator = SystemProcessTerminator::new(Arc::new(SystemExecutor));
    replace_file(
        &source,
        &opts.to,
        &SystemFileSystemOps,
        &terminator,
        RetryPolicy::default(),
        log.as_ref(),
    )?;
    log.info(&format!("copied {} to {}", source.display(), opts.to.display()));
    Ok(())
}
