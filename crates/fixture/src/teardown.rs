//! Fixture teardown.

use crate::provision::FixtureState;
use docfix_core::{BucketHandle, Error, Result, Session, WriteOptions};
use tracing::{debug, info, warn};

/// What a teardown pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// The seed document was removed
    pub document_removed: bool,
    /// The fixture bucket was removed
    pub bucket_removed: bool,
    /// A session was disconnected
    pub disconnected: bool,
    /// Errors that were tolerated
    pub absorbed: Vec<Error>,
}

impl TeardownReport {
    /// Whether the pass had nothing to do.
    pub fn is_noop(&self) -> bool {
        !self.document_removed && !self.bucket_removed && !self.disconnected
    }
}

/// Removes whatever provisioning created.
///
/// Each handle is taken out of the [`FixtureState`] before it is used, so a
/// second pass over the same state does nothing.
#[derive(Debug, Clone)]
pub struct TeardownCoordinator {
    document_id: String,
}

impl TeardownCoordinator {
    /// Coordinator removing `document_id` from the fixture bucket.
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
        }
    }

    /// Tear down `state`.
    ///
    /// Every step runs even if an earlier one failed. Not-found errors are
    /// absorbed, as is `SessionClosed` from the final disconnect; the first
    /// other error is returned once all steps have run. Removing the document
    /// or bucket through a closed session fails with `SessionClosed`.
    pub fn tear_down<S: Session>(&self, state: &mut FixtureState<S>) -> Result<TeardownReport> {
        let mut report = TeardownReport::default();
        let mut first_error = None;

        if let Some(bucket) = state.bucket.take() {
            let removed = bucket.remove(&self.document_id, WriteOptions::default());
            match absorb(removed, &mut report, false) {
                Ok(Some(_)) => {
                    debug!(id = %self.document_id, "seed document removed");
                    report.document_removed = true;
                }
                Ok(None) => {}
                Err(e) => first_error = first_error.or(Some(e)),
            }
        }
        state.document = None;

        let owned = state.owned_bucket.take();
        match state.session.take() {
            Some(session) => {
                if let Some(name) = owned {
                    match absorb(session.remove_bucket(&name), &mut report, false) {
                        Ok(Some(())) => {
                            info!(bucket = %name, "bucket removed");
                            report.bucket_removed = true;
                        }
                        Ok(None) => {}
                        Err(e) => first_error = first_error.or(Some(e)),
                    }
                }
                match absorb(session.disconnect(), &mut report, true) {
                    Ok(_) => report.disconnected = true,
                    Err(e) => first_error = first_error.or(Some(e)),
                }
            }
            None => {
                if let Some(name) = owned {
                    warn!(bucket = %name, "no session left to remove bucket");
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

fn absorb<T>(
    result: Result<T>,
    report: &mut TeardownReport,
    closed_ok: bool,
) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() || (closed_ok && e == Error::SessionClosed) => {
            debug!(error = %e, "teardown error absorbed");
            report.absorbed.push(e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
