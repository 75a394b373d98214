//! Connection management.
//!
//! [`ConnectionManager`] wraps a [`Connector`] with the retry and settle
//! behaviour the fixture needs. Refused connections are retried with backoff
//! until the connect timeout; every other connect error fails immediately.

use crate::config::{BackoffPolicy, FixtureConfig};
use crate::retry::poll_with_backoff;
use docfix_core::{Connector, Endpoint, Error, Result, Session};
use std::time::Duration;
use tracing::{debug, info};

/// Wait until `session` reports ready, polling with backoff.
///
/// Fails with `Timeout { operation: "settle" }` on deadline and with
/// `SessionClosed` if the session is disconnected while waiting.
pub fn wait_until_ready<S: Session>(
    session: &S,
    timeout: Duration,
    policy: &BackoffPolicy,
) -> Result<()> {
    poll_with_backoff("settle", timeout, policy, || {
        if !session.is_connected() {
            return Err(Error::SessionClosed);
        }
        Ok(session.is_ready().then_some(()))
    })
}

/// Opens, settles, replaces and closes sessions for one endpoint.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    endpoint: Endpoint,
    connect_timeout: Duration,
    settle_timeout: Duration,
    backoff: BackoffPolicy,
}

impl<C: Connector> ConnectionManager<C> {
    /// Build a manager from the endpoint and timeouts in `config`.
    pub fn new(connector: C, config: &FixtureConfig) -> Result<Self> {
        Ok(Self {
            connector,
            endpoint: config.endpoint()?,
            connect_timeout: config.connect_timeout(),
            settle_timeout: config.settle_timeout(),
            backoff: config.backoff.clone(),
        })
    }

    /// Target endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Underlying connector.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Open a session, retrying refused connections until the connect timeout.
    pub fn connect(&self) -> Result<C::Session> {
        let mut attempt = 0u32;
        let session = poll_with_backoff("connect", self.connect_timeout, &self.backoff, || {
            attempt += 1;
            match self.connector.connect(&self.endpoint) {
                Ok(session) => Ok(Some(session)),
                Err(e) if e.is_retryable() => {
                    debug!(attempt, error = %e, "connect attempt failed, retrying");
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })?;
        info!(endpoint = %self.endpoint, attempts = attempt, "connected");
        Ok(session)
    }

    /// Wait for `session` to settle using the configured timeout.
    pub fn wait_until_ready(&self, session: &C::Session) -> Result<()> {
        wait_until_ready(session, self.settle_timeout, &self.backoff)
    }

    /// Close `session` and open a new one.
    ///
    /// The old session is consumed so it cannot be used afterwards. The new
    /// session is not waited on; callers settle it before use.
    pub fn reconnect(&self, session: C::Session) -> Result<C::Session> {
        self.disconnect(&session)?;
        drop(session);
        info!(endpoint = %self.endpoint, "reconnecting");
        self.connect()
    }

    /// Disconnect `session`. Closing an already closed session is not an error.
    pub fn disconnect(&self, session: &C::Session) -> Result<()> {
        match session.disconnect() {
            Ok(()) | Err(Error::SessionClosed) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl<C: Connector> std::fmt::Debug for ConnectionManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("endpoint", &self.endpoint.to_string())
            .field("connect_timeout", &self.connect_timeout)
            .field("settle_timeout", &self.settle_timeout)
            .finish()
    }
}
