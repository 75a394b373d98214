//! Version 4.x clusters need a fresh session after bucket creation.

use crate::common::*;

fn version_four() -> NodeConfig {
    NodeConfig::default().version(ServerVersion::new(4, 6, 5))
}

#[test]
fn version_four_reconnects_before_opening_the_bucket() {
    let cluster = TestCluster::new(version_four());
    assert!(cluster.ctx.is_ready(), "{}", cluster.ctx.readiness());
    assert!(cluster.ctx.probe().unwrap().reconnect_required);

    let ids = cluster.session_ids();
    assert_eq!(ids.len(), 2);
    let (old, new) = (ids[0], ids[1]);

    assert_eq!(
        cluster.node.operations_for(old),
        vec![
            Operation::Connect,
            Operation::ClusterInfo,
            Operation::InsertBucket,
            Operation::Disconnect,
        ]
    );
    assert_eq!(
        cluster.node.operations_for(new),
        vec![
            Operation::Connect,
            Operation::OpenBucket,
            Operation::Upsert,
            Operation::CreateIndex,
            Operation::Query,
        ]
    );
}

#[test]
fn nothing_runs_on_the_old_session_after_reconnect() {
    let cluster = TestCluster::new(version_four());
    let log = cluster.node.operations();
    let old = log[0].session;
    let disconnect_at = log
        .iter()
        .position(|r| r.session == old && r.op == Operation::Disconnect)
        .unwrap();
    assert!(log[disconnect_at + 1..].iter().all(|r| r.session != old));
}

#[test]
fn later_versions_keep_one_session() {
    for version in [ServerVersion::new(5, 0, 1), ServerVersion::new(6, 6, 0)] {
        let cluster = TestCluster::new(NodeConfig::default().version(version));
        assert!(cluster.ctx.is_ready());
        assert!(!cluster.ctx.probe().unwrap().reconnect_required);
        assert_eq!(cluster.session_ids().len(), 1);
    }
}

#[test]
fn teardown_uses_the_new_session() {
    let mut cluster = TestCluster::new(version_four());
    let new = cluster.session_ids()[1];
    cluster.ctx.tear_down().unwrap();

    let ops = cluster.node.operations_for(new);
    assert_eq!(
        &ops[ops.len() - 3..],
        &[Operation::Remove, Operation::RemoveBucket, Operation::Disconnect]
    );
    assert!(cluster.node.bucket_names().is_empty());
}

#[test]
fn transient_reconnect_failure_is_retried() {
    let node = MemoryNode::new(version_four());
    node.faults()
        .fail_after(Operation::Connect, Error::timeout("connect", Duration::from_millis(5)), 1, 1);
    let mut ctx = FixtureContext::set_up(MemoryNetwork::localhost(node.clone()), quick_config())
        .unwrap();

    // Timeouts are retryable, so the second reconnect attempt succeeds.
    assert!(ctx.is_ready(), "{}", ctx.readiness());
    ctx.tear_down().unwrap();
    assert!(node.bucket_names().is_empty());
}

#[test]
fn reconnect_protocol_error_leaves_fixture_unavailable() {
    let node = MemoryNode::new(version_four());
    node.faults()
        .fail_after(Operation::Connect, Error::protocol("cluster map changed"), 1, 1);
    let mut ctx = FixtureContext::set_up(MemoryNetwork::localhost(node.clone()), quick_config())
        .unwrap();

    assert!(matches!(
        ctx.readiness(),
        Readiness::Unavailable {
            stage: Stage::Reconnect,
            ..
        }
    ));
    assert!(ctx.session().is_none());

    // Teardown opens a cleanup session to drop the bucket it created.
    let report = ctx.tear_down().unwrap();
    assert!(report.bucket_removed);
    assert!(node.bucket_names().is_empty());
}
