//! Provision, verify and tear down the canonical fixture.

use crate::common::*;

// ============================================================================
// Set-up
// ============================================================================

#[test]
fn mybucket_end_to_end() {
    let mut cluster = TestCluster::new(NodeConfig::default());
    assert!(cluster.ctx.is_ready(), "{}", cluster.ctx.readiness());
    assert_eq!(cluster.node.bucket_names(), vec!["mybucket".to_string()]);

    let fixture = cluster.ctx.ready().unwrap();
    let result = fixture
        .bucket
        .query(
            "select * from mybucket where lastName = 'Van Gogh'",
            &QueryOptions::request_plus(),
        )
        .unwrap();
    assert_eq!(result.result_count(), 1);
    assert_record_content(&result.rows[0], "mybucket");

    let doc = fixture.bucket.get("artist:vincent_van_gogh").unwrap().unwrap();
    assert_document_metadata(
        &fixture.snapshot,
        &doc.id,
        doc.expiry,
        doc.cas,
        &doc.mutation_token.map(|t| t.to_map()).unwrap_or_default(),
    );

    let report = cluster.ctx.tear_down().unwrap();
    assert!(report.document_removed);
    assert!(report.bucket_removed);
    assert!(report.disconnected);
    assert!(cluster.node.bucket_names().is_empty());
}

#[test]
fn set_up_issues_operations_in_order() {
    let cluster = TestCluster::new(NodeConfig::default());
    let ids = cluster.session_ids();
    assert_eq!(ids.len(), 1);
    assert_eq!(
        cluster.node.operations_for(ids[0]),
        vec![
            Operation::Connect,
            Operation::ClusterInfo,
            Operation::InsertBucket,
            Operation::OpenBucket,
            Operation::Upsert,
            Operation::CreateIndex,
            Operation::Query,
        ]
    );
}

#[test]
fn waits_for_slow_boot_and_settle() {
    let cluster = TestCluster::with_fixture_config(
        NodeConfig::default()
            .boot_delay(Duration::from_millis(40))
            .settle_delay(Duration::from_millis(40)),
        FixtureConfig {
            connect_timeout_ms: 2_000,
            ..quick_config()
        },
    );
    assert!(cluster.ctx.is_ready(), "{}", cluster.ctx.readiness());
}

#[test]
fn immediate_indexer_also_ready() {
    let cluster = TestCluster::new(NodeConfig::default().indexer(docfix_memstore::IndexerMode::Immediate));
    assert!(cluster.ctx.is_ready());
}

#[test]
fn existing_bucket_can_be_reused() {
    let node = MemoryNode::new(NodeConfig::default());
    let first = FixtureContext::set_up(MemoryNetwork::localhost(node.clone()), quick_config()).unwrap();

    let mut config = quick_config();
    config.reuse_existing_bucket = true;
    let mut second = FixtureContext::set_up(MemoryNetwork::localhost(node.clone()), config).unwrap();
    assert!(second.is_ready());

    // The reused bucket belongs to the first fixture.
    let report = second.tear_down().unwrap();
    assert!(!report.bucket_removed);
    assert_eq!(node.bucket_names(), vec!["mybucket".to_string()]);

    drop(first);
    assert!(node.bucket_names().is_empty());
}

#[test]
fn custom_bucket_name_from_overrides() {
    let config = quick_config().with_overrides(|key| {
        (key == docfix_fixture::config::ENV_BUCKET).then(|| "artists-2024".to_string())
    });
    let cluster = TestCluster::with_fixture_config(NodeConfig::default(), config);
    assert!(cluster.ctx.is_ready(), "{}", cluster.ctx.readiness());
    assert_eq!(cluster.node.bucket_names(), vec!["artists-2024".to_string()]);
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn teardown_is_idempotent() {
    let mut cluster = TestCluster::new(NodeConfig::default());
    let first = cluster.ctx.tear_down().unwrap();
    assert!(!first.is_noop());

    let second = cluster.ctx.tear_down().unwrap();
    assert!(second.is_noop());
    assert!(cluster.ctx.session().is_none());
    assert!(cluster.ctx.bucket().is_none());
}

#[test]
fn teardown_after_external_bucket_removal() {
    let mut cluster = TestCluster::new(NodeConfig::default());
    cluster
        .ctx
        .session()
        .unwrap()
        .remove_bucket("mybucket")
        .unwrap();

    let report = cluster.ctx.tear_down().unwrap();
    assert!(!report.document_removed);
    assert!(!report.bucket_removed);
    assert!(report.disconnected);
    assert_eq!(report.absorbed.len(), 2);
    assert!(report.absorbed.iter().all(Error::is_not_found));
}

#[test]
fn dropping_the_context_cleans_up() {
    let cluster = TestCluster::new(NodeConfig::default());
    let node = cluster.node.clone();
    let session = cluster.ctx.session().unwrap().clone();
    drop(cluster);

    assert!(node.bucket_names().is_empty());
    assert!(!session.is_connected());
}

#[test]
fn teardown_after_session_disconnected_by_test() {
    let mut cluster = TestCluster::new(NodeConfig::default());
    cluster.ctx.ready().unwrap().session.disconnect().unwrap();

    let report = cluster.ctx.tear_down().unwrap();
    assert!(report.document_removed);
    assert!(report.bucket_removed);
    assert!(cluster.node.bucket_names().is_empty());

    // The bucket name is free for the next suite.
    let ctx = FixtureContext::set_up(
        MemoryNetwork::localhost(cluster.node.clone()),
        quick_config(),
    )
    .unwrap();
    assert!(ctx.is_ready());
}
