//! Fault injection for the simulated cluster.
//!
//! Tests arm faults against a named [`Operation`]; the next matching call
//! fails with the armed error instead of executing.

use docfix_core::Error;
use parking_lot::Mutex;
use std::fmt;

/// Operations the simulated cluster can be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Session establishment
    Connect,
    /// Cluster info / version lookup
    ClusterInfo,
    /// Bucket creation
    InsertBucket,
    /// Bucket existence check
    BucketExists,
    /// Bucket removal
    RemoveBucket,
    /// Bucket flush
    FlushBucket,
    /// Bucket open
    OpenBucket,
    /// Document read
    Get,
    /// Document insert
    Insert,
    /// Document upsert
    Upsert,
    /// Document replace
    Replace,
    /// Document remove
    Remove,
    /// Primary index creation
    CreateIndex,
    /// Deferred index build
    BuildIndex,
    /// Query execution
    Query,
    /// Session disconnect
    Disconnect,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug)]
struct ArmedFault {
    op: Operation,
    error: Error,
    /// Matching calls to let through before firing
    skip: u32,
    /// `None` = fire forever
    remaining: Option<u32>,
}

/// Set of armed faults.
#[derive(Debug, Default)]
pub struct FaultPlan {
    faults: Mutex<Vec<ArmedFault>>,
}

impl FaultPlan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next call of `op` with `error`.
    pub fn fail_once(&self, op: Operation, error: Error) {
        self.fail_times(op, error, 1);
    }

    /// Fail the next `times` calls of `op` with `error`.
    pub fn fail_times(&self, op: Operation, error: Error, times: u32) {
        self.fail_after(op, error, 0, times);
    }

    /// Let `skip` calls of `op` through, then fail the following `times`.
    pub fn fail_after(&self, op: Operation, error: Error, skip: u32, times: u32) {
        self.faults.lock().push(ArmedFault {
            op,
            error,
            skip,
            remaining: Some(times),
        });
    }

    /// Fail every call of `op` with `error` until cleared.
    pub fn fail_always(&self, op: Operation, error: Error) {
        self.faults.lock().push(ArmedFault {
            op,
            error,
            skip: 0,
            remaining: None,
        });
    }

    /// Disarm every fault.
    pub fn clear(&self) {
        self.faults.lock().clear();
    }

    /// Consume the first armed fault for `op`, if any.
    pub fn take(&self, op: Operation) -> Option<Error> {
        let mut faults = self.faults.lock();
        let pos = faults.iter().position(|f| f.op == op)?;
        if faults[pos].skip > 0 {
            faults[pos].skip -= 1;
            return None;
        }
        let error = faults[pos].error.clone();
        match faults[pos].remaining.as_mut() {
            Some(n) if *n <= 1 => {
                faults.remove(pos);
            }
            Some(n) => *n -= 1,
            None => {}
        }
        Some(error)
    }

    /// Return `Err` if a fault is armed for `op`.
    pub fn check(&self, op: Operation) -> docfix_core::Result<()> {
        match self.take(op) {
            Some(error) => {
                tracing::debug!(%op, kind = error.kind(), "injecting fault");
                Err(error)
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_fault_fires_once() {
        let plan = FaultPlan::new();
        plan.fail_once(Operation::Query, Error::protocol("index offline"));

        assert!(plan.check(Operation::Get).is_ok());
        assert_eq!(
            plan.check(Operation::Query),
            Err(Error::protocol("index offline"))
        );
        assert!(plan.check(Operation::Query).is_ok());
    }

    #[test]
    fn counted_fault_fires_n_times() {
        let plan = FaultPlan::new();
        plan.fail_times(Operation::Upsert, Error::protocol("tmpfail"), 2);
        assert!(plan.check(Operation::Upsert).is_err());
        assert!(plan.check(Operation::Upsert).is_err());
        assert!(plan.check(Operation::Upsert).is_ok());
    }

    #[test]
    fn permanent_fault_until_cleared() {
        let plan = FaultPlan::new();
        plan.fail_always(Operation::Connect, Error::protocol("down"));
        for _ in 0..5 {
            assert!(plan.check(Operation::Connect).is_err());
        }
        plan.clear();
        assert!(plan.check(Operation::Connect).is_ok());
    }

    #[test]
    fn delayed_fault_skips_first_calls() {
        let plan = FaultPlan::new();
        plan.fail_after(Operation::Connect, Error::protocol("rebalance"), 1, 1);
        assert!(plan.check(Operation::Connect).is_ok());
        assert!(plan.check(Operation::Connect).is_err());
        assert!(plan.check(Operation::Connect).is_ok());
    }
}
