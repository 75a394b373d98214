//! Suite-level fixture context.
//!
//! A [`FixtureContext`] owns everything a test suite shares: the connection
//! manager, the current session, the fixture bucket and the seed document.
//! Set-up runs:
//!
//! ```text
//! connect -> settle -> probe -> create bucket -> [reconnect] -> seed
//! ```
//!
//! `Timeout` and `Protocol` errors anywhere in that sequence leave the context
//! [`Readiness::Unavailable`]; other errors fail [`FixtureContext::set_up`].
//! In both cases whatever was created is torn down, either explicitly via
//! [`FixtureContext::tear_down`] or when the context is dropped.

use crate::config::FixtureConfig;
use crate::connection::ConnectionManager;
use crate::probe::{CapabilityProbe, ProbeOutcome};
use crate::provision::{AtStage, FixtureState, Provisioner, Readiness, Stage, StepResult};
use crate::teardown::{TeardownCoordinator, TeardownReport};
use docfix_core::{BucketHandle, Connector, DocumentSnapshot, Result, Session};
use tracing::{error, info, warn};

type SessionOf<C> = <C as Connector>::Session;
type BucketOf<C> = <SessionOf<C> as Session>::Bucket;

/// Shared state of a fixture-backed test suite.
pub struct FixtureContext<C: Connector> {
    config: FixtureConfig,
    manager: ConnectionManager<C>,
    state: FixtureState<SessionOf<C>>,
    probe: Option<ProbeOutcome>,
    readiness: Readiness,
}

impl<C: Connector> FixtureContext<C> {
    /// Connect through `connector` and provision the fixture.
    pub fn set_up(connector: C, config: FixtureConfig) -> Result<Self> {
        config.validate()?;
        let manager = ConnectionManager::new(connector, &config)?;
        let mut context = Self {
            config,
            manager,
            state: FixtureState::default(),
            probe: None,
            readiness: Readiness::Pending,
        };

        match context.run() {
            Ok(readiness) => context.readiness = readiness,
            Err(failure) if failure.error.is_store_unavailable() => {
                warn!(stage = %failure.stage, error = %failure.error, "store unavailable, fixture disabled");
                context.readiness = Readiness::absorbed(&failure);
            }
            Err(failure) => {
                error!(stage = %failure.stage, error = %failure.error, "fixture set-up failed");
                return Err(failure.error);
            }
        }
        Ok(context)
    }

    fn run(&mut self) -> StepResult<Readiness> {
        let session = self.manager.connect().at(Stage::Connect)?;
        let session = self.state.session.insert(session);
        self.manager.wait_until_ready(session).at(Stage::Settle)?;

        let probe = CapabilityProbe::new(self.config.probe_timeout())
            .detect(session)
            .at(Stage::Probe)?;
        self.probe = Some(probe);

        let provisioner = Provisioner::from_config(&self.config);
        provisioner.create_bucket(&mut self.state)?;

        if probe.reconnect_required {
            info!(version = %probe.version, "server requires a fresh session after bucket creation");
            if let Some(old) = self.state.session.take() {
                let fresh = self.manager.reconnect(old).at(Stage::Reconnect)?;
                self.state.session = Some(fresh);
            }
        }

        provisioner.seed(&mut self.state)
    }

    /// Readiness decided by set-up.
    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    /// Whether tests depending on the store can run.
    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    /// Borrow the ready fixture, or `None` if set-up did not complete.
    pub fn ready(&self) -> Option<ReadyFixture<'_, C>> {
        if !self.is_ready() {
            return None;
        }
        Some(ReadyFixture {
            session: self.state.session.as_ref()?,
            bucket: self.state.bucket.as_ref()?,
            snapshot: self.state.snapshot()?,
        })
    }

    /// Configuration used for set-up.
    pub fn config(&self) -> &FixtureConfig {
        &self.config
    }

    /// What the capability probe found, if it ran.
    pub fn probe(&self) -> Option<&ProbeOutcome> {
        self.probe.as_ref()
    }

    /// Current session.
    pub fn session(&self) -> Option<&SessionOf<C>> {
        self.state.session.as_ref()
    }

    /// Fixture bucket.
    pub fn bucket(&self) -> Option<&BucketOf<C>> {
        self.state.bucket.as_ref()
    }

    /// Metadata of the seed document.
    pub fn snapshot(&self) -> Option<DocumentSnapshot> {
        self.state.snapshot()
    }

    /// Connector the context was built with.
    pub fn connector(&self) -> &C {
        self.manager.connector()
    }

    /// Remove the fixture and disconnect. Safe to call more than once.
    ///
    /// If the session is gone or disconnected while a bucket or document is
    /// still in place, a cleanup session is opened to remove them.
    pub fn tear_down(&mut self) -> Result<TeardownReport> {
        let connected = self
            .state
            .session
            .as_ref()
            .is_some_and(|s| s.is_connected());
        if !connected && (self.state.bucket.is_some() || self.state.owned_bucket.is_some()) {
            self.open_cleanup_session();
        }
        let report = TeardownCoordinator::new(&self.config.document_id).tear_down(&mut self.state)?;
        if !report.is_noop() {
            info!(
                document_removed = report.document_removed,
                bucket_removed = report.bucket_removed,
                "fixture torn down"
            );
        }
        Ok(report)
    }

    fn open_cleanup_session(&mut self) {
        let session = match self.manager.connect() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "cannot open cleanup session");
                return;
            }
        };
        if let Some(stale) = self.state.bucket.take() {
            match session.open_bucket(stale.name()) {
                Ok(bucket) => self.state.bucket = Some(bucket),
                Err(e) if e.is_not_found() => {}
                Err(e) => warn!(bucket = stale.name(), error = %e, "cannot reopen bucket for cleanup"),
            }
        }
        info!("cleanup session opened");
        self.state.session = Some(session);
    }
}

impl<C: Connector> Drop for FixtureContext<C> {
    fn drop(&mut self) {
        if self.state.is_empty() {
            return;
        }
        if let Err(e) = self.tear_down() {
            error!(error = %e, "fixture teardown failed");
        }
    }
}

impl<C: Connector> std::fmt::Debug for FixtureContext<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixtureContext")
            .field("manager", &self.manager)
            .field("state", &self.state)
            .field("probe", &self.probe)
            .field("readiness", &self.readiness)
            .finish()
    }
}

/// Borrowed view of a ready fixture.
pub struct ReadyFixture<'a, C: Connector> {
    /// Current session
    pub session: &'a SessionOf<C>,
    /// Fixture bucket
    pub bucket: &'a BucketOf<C>,
    /// Metadata of the seed document
    pub snapshot: DocumentSnapshot,
}

/// Return early from a test when the fixture is not ready.
///
/// ```ignore
/// let fixture = require_ready!(ctx);
/// fixture.bucket.get("artist:vincent_van_gogh")?;
/// ```
#[macro_export]
macro_rules! require_ready {
    ($ctx:expr) => {
        match $ctx.ready() {
            Some(fixture) => fixture,
            None => {
                $crate::__tracing::warn!(readiness = %$ctx.readiness(), "skipping: fixture not ready");
                return Default::default();
            }
        }
    };
}
