//! Fixture provisioning.
//!
//! Provisioning runs in two halves so a caller can swap the session between
//! them:
//!
//! 1. [`Provisioner::create_bucket`] creates the ephemeral bucket.
//! 2. [`Provisioner::seed`] settles the session, opens the bucket, upserts the
//!    seed document, builds the primary index and runs the verification query
//!    with `RequestPlus` consistency.
//!
//! Everything created along the way is recorded in a [`FixtureState`] as soon
//! as it exists, so a failure part-way through still leaves teardown with
//! the handles it needs.

use crate::canonical;
use crate::config::{BackoffPolicy, FixtureConfig};
use crate::connection::wait_until_ready;
use docfix_core::{
    BucketHandle, BucketSettings, Document, DocumentSnapshot, Error, JsonObject, QueryOptions,
    Result, Session, WriteOptions,
};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Set-up step, used to report where provisioning stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Opening the session
    Connect,
    /// Waiting for the session to become ready
    Settle,
    /// Reading the server version
    Probe,
    /// Creating the bucket
    CreateBucket,
    /// Replacing the session after bucket creation
    Reconnect,
    /// Opening the bucket
    OpenBucket,
    /// Writing the seed document
    Upsert,
    /// Creating the primary index
    Index,
    /// Running the verification query
    Query,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Connect => "connect",
            Stage::Settle => "settle",
            Stage::Probe => "probe",
            Stage::CreateBucket => "create bucket",
            Stage::Reconnect => "reconnect",
            Stage::OpenBucket => "open bucket",
            Stage::Upsert => "upsert",
            Stage::Index => "index",
            Stage::Query => "query",
        };
        f.write_str(name)
    }
}

/// A store error tagged with the step that produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{stage} failed: {error}")]
pub struct StepFailure {
    /// Step that failed
    pub stage: Stage,
    /// Underlying error
    #[source]
    pub error: Error,
}

/// Result of one provisioning step.
pub type StepResult<T> = std::result::Result<T, StepFailure>;

/// Attach a [`Stage`] to a store result.
pub trait AtStage<T> {
    /// Tag the error, if any, with `stage`.
    fn at(self, stage: Stage) -> StepResult<T>;
}

impl<T> AtStage<T> for Result<T> {
    fn at(self, stage: Stage) -> StepResult<T> {
        self.map_err(|error| StepFailure { stage, error })
    }
}

/// Whether the fixture can be used by tests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Readiness {
    /// Bucket, document and index are in place
    Ready,
    /// Set-up did not complete; tests depending on the store should skip
    Unavailable {
        /// Step that stopped set-up
        stage: Stage,
        /// Human readable cause
        reason: String,
    },
    /// Set-up has not run
    #[default]
    Pending,
}

impl Readiness {
    /// Whether the fixture is ready.
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }

    /// Unavailable because `failure` was absorbed.
    pub fn absorbed(failure: &StepFailure) -> Self {
        Readiness::Unavailable {
            stage: failure.stage,
            reason: failure.error.to_string(),
        }
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readiness::Ready => f.write_str("ready"),
            Readiness::Unavailable { stage, reason } => {
                write!(f, "unavailable at {}: {}", stage, reason)
            }
            Readiness::Pending => f.write_str("pending"),
        }
    }
}

/// Handles created by provisioning. Consumed by teardown.
pub struct FixtureState<S: Session> {
    /// Current session
    pub session: Option<S>,
    /// Open handle on the fixture bucket
    pub bucket: Option<S::Bucket>,
    /// Name of the bucket if this fixture created it
    pub owned_bucket: Option<String>,
    /// Seed document as written
    pub document: Option<Document>,
}

impl<S: Session> FixtureState<S> {
    /// State holding only a session.
    pub fn with_session(session: S) -> Self {
        Self {
            session: Some(session),
            ..Self::default()
        }
    }

    /// Metadata of the seed document, if it was written.
    pub fn snapshot(&self) -> Option<DocumentSnapshot> {
        self.document.as_ref().map(Document::snapshot)
    }

    /// Whether nothing is left to tear down.
    pub fn is_empty(&self) -> bool {
        self.session.is_none() && self.bucket.is_none() && self.owned_bucket.is_none()
    }

    fn session(&self, stage: Stage) -> StepResult<&S> {
        self.session.as_ref().ok_or(Error::SessionClosed).at(stage)
    }
}

impl<S: Session> Default for FixtureState<S> {
    fn default() -> Self {
        Self {
            session: None,
            bucket: None,
            owned_bucket: None,
            document: None,
        }
    }
}

impl<S: Session> fmt::Debug for FixtureState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixtureState")
            .field("session", &self.session.is_some())
            .field("bucket", &self.bucket.as_ref().map(|b| b.name()))
            .field("owned_bucket", &self.owned_bucket)
            .field("document", &self.document.as_ref().map(|d| &d.id))
            .finish()
    }
}

/// Provisioning behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionOptions {
    /// Use a pre-existing bucket instead of failing with `BucketExists`
    pub reuse_existing: bool,
}

/// Creates the fixture bucket and seeds it.
#[derive(Debug, Clone)]
pub struct Provisioner {
    settings: BucketSettings,
    document_id: String,
    body: JsonObject,
    verification: String,
    options: ProvisionOptions,
    settle_timeout: Duration,
    backoff: BackoffPolicy,
}

impl Provisioner {
    /// Provision `body` under `document_id` in a bucket with `settings`.
    ///
    /// The verification query defaults to the canonical one; see
    /// [`Provisioner::verification`].
    pub fn new(settings: BucketSettings, document_id: impl Into<String>, body: JsonObject) -> Self {
        let verification = canonical::verification_statement(&settings.name);
        Self {
            settings,
            document_id: document_id.into(),
            body,
            verification,
            options: ProvisionOptions::default(),
            settle_timeout: Duration::from_secs(2),
            backoff: BackoffPolicy::default(),
        }
    }

    /// Provisioner for the canonical document as configured.
    pub fn from_config(config: &FixtureConfig) -> Self {
        Self::new(
            config.bucket.clone(),
            config.document_id.clone(),
            canonical::canonical_document(),
        )
        .options(ProvisionOptions {
            reuse_existing: config.reuse_existing_bucket,
        })
        .settle(config.settle_timeout(), config.backoff.clone())
    }

    /// Set provisioning options.
    pub fn options(mut self, options: ProvisionOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the settle timeout and poll backoff.
    pub fn settle(mut self, timeout: Duration, backoff: BackoffPolicy) -> Self {
        self.settle_timeout = timeout;
        self.backoff = backoff;
        self
    }

    /// Replace the verification query. It must return exactly one row.
    pub fn verification(mut self, statement: impl Into<String>) -> Self {
        self.verification = statement.into();
        self
    }

    /// Bucket settings used by [`Provisioner::create_bucket`].
    pub fn settings(&self) -> &BucketSettings {
        &self.settings
    }

    /// Key of the seed document.
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Create the bucket.
    ///
    /// Records the bucket as owned when this call created it. An existing
    /// bucket fails with `BucketExists` unless reuse is enabled.
    pub fn create_bucket<S: Session>(&self, state: &mut FixtureState<S>) -> StepResult<()> {
        let session = state.session(Stage::CreateBucket)?;
        match session.insert_bucket(&self.settings) {
            Ok(()) => {
                info!(bucket = %self.settings.name, "bucket created");
                state.owned_bucket = Some(self.settings.name.clone());
                Ok(())
            }
            Err(Error::BucketExists { name }) if self.options.reuse_existing => {
                warn!(bucket = %name, "reusing existing bucket");
                Ok(())
            }
            Err(e) => Err(e).at(Stage::CreateBucket),
        }
    }

    /// Settle, open, upsert, index and verify.
    pub fn seed<S: Session>(&self, state: &mut FixtureState<S>) -> StepResult<Readiness> {
        let session = state.session(Stage::Settle)?;
        wait_until_ready(session, self.settle_timeout, &self.backoff).at(Stage::Settle)?;

        let bucket = session.open_bucket(&self.settings.name).at(Stage::OpenBucket)?;
        let bucket = state.bucket.insert(bucket);

        let document = bucket
            .upsert(&self.document_id, self.body.clone(), WriteOptions::default())
            .at(Stage::Upsert)?;
        debug!(id = %document.id, cas = document.cas, "seed document written");
        state.document = Some(document);

        bucket.create_primary_index(true, false).at(Stage::Index)?;

        let result = bucket
            .query(&self.verification, &QueryOptions::request_plus())
            .at(Stage::Query)?;
        let rows = result.result_count();
        if rows == 1 {
            info!(bucket = %self.settings.name, "fixture ready");
            Ok(Readiness::Ready)
        } else {
            warn!(rows, statement = %self.verification, "verification query returned unexpected row count");
            Ok(Readiness::Unavailable {
                stage: Stage::Query,
                reason: format!("verification query returned {} rows, expected 1", rows),
            })
        }
    }

    /// Create the bucket and seed it on one session.
    pub fn provision<S: Session>(&self, state: &mut FixtureState<S>) -> StepResult<Readiness> {
        self.create_bucket(state)?;
        self.seed(state)
    }
}
