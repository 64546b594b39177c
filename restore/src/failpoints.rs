//! Failpoints for injecting failures into replication sessions from tests.
//!
//! Failpoints are configured through the `fail` crate, for example with
//! `fail::cfg(REPLICATOR__BEFORE_APPEND, "return")`.

use fail::fail_point;

use crate::bail;
use crate::error::{ErrorKind, RestoreResult};

pub const REPLICATOR__BEFORE_APPEND: &str = "replicator.before_append";

/// Evaluates the failpoint `name`.
///
/// When the failpoint is configured to return, an [`ErrorKind::FailpointTriggered`] error
/// is returned, carrying the failpoint parameter as detail if one was given. Returns
/// `Ok(())` when the failpoint is inactive.
pub fn restore_fail_point(name: &str) -> RestoreResult<()> {
    fail_point!(name, |parameter| {
        match parameter {
            Some(parameter) => bail!(
                ErrorKind::FailpointTriggered,
                "An error occurred in a fail point",
                format!("The failpoint '{name}' returned an error: {parameter}")
            ),
            None => bail!(
                ErrorKind::FailpointTriggered,
                "An error occurred in a fail point",
                format!("The failpoint '{name}' returned an error")
            ),
        }
    });

    Ok(())
}
