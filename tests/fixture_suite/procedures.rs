//! Procedure surface over the provisioned bucket.

use crate::common::*;

fn with_fixture(body: impl FnOnce(&DocumentProcedures<'_, docfix_memstore::MemoryBucket>)) {
    let cluster = TestCluster::new(NodeConfig::default());
    let fixture = cluster.ctx.ready().expect("fixture ready");
    let procs = DocumentProcedures::new(fixture.bucket).with_consistency(ScanConsistency::RequestPlus);
    body(&procs);
}

#[test]
fn crud_round_trip() {
    with_fixture(|procs| {
        let inserted = procs
            .insert("artist:claude_monet", r#"{"firstName":"Claude","lastName":"Monet"}"#)
            .unwrap();
        assert_eq!(inserted.content["firstName"], "Claude");
        assert!(procs.exists("artist:claude_monet").unwrap());

        let replaced = procs
            .replace("artist:claude_monet", r#"{"firstName":"Oscar-Claude","lastName":"Monet"}"#)
            .unwrap();
        assert!(replaced.cas > inserted.cas);
        assert_eq!(
            procs.get("artist:claude_monet").unwrap().unwrap().content["firstName"],
            "Oscar-Claude"
        );

        let removed = procs.remove("artist:claude_monet").unwrap();
        assert!(removed.cas > replaced.cas);
        assert!(!procs.exists("artist:claude_monet").unwrap());
    });
}

#[test]
fn replace_missing_document_fails() {
    with_fixture(|procs| {
        let err = procs.replace("artist:nobody", "{}").unwrap_err();
        assert!(err.is_not_found());
    });
}

#[test]
fn positional_and_named_queries() {
    with_fixture(|procs| {
        let stream = procs
            .query_with_positional_params(
                "SELECT * FROM mybucket WHERE firstName = $1 AND lastName = $2",
                vec![json!("Vincent"), json!("Van Gogh")],
            )
            .unwrap();
        assert_single_stream_result(stream, "mybucket");

        let mut params = JsonObject::new();
        params.insert("last".into(), json!("Van Gogh"));
        let stream = procs
            .query_with_named_params("select * from `mybucket` where lastName = $last", params)
            .unwrap();
        assert_single_stream_result(stream, "mybucket");
    });
}

#[test]
fn missing_parameter_is_a_query_error() {
    with_fixture(|procs| {
        let err = procs
            .query_with_positional_params("select * from mybucket where lastName = $2", vec![json!("x")])
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidQuery");
    });
}

#[test]
fn stream_is_single_pass() {
    with_fixture(|procs| {
        let mut stream = procs
            .query("select * from mybucket where lastName = 'Van Gogh'")
            .unwrap();
        assert!(stream.next().is_some());
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    });
}

#[test]
fn require_ready_skips_when_unavailable() {
    fn body(ctx: &FixtureContext<MemoryNetwork>) -> Option<usize> {
        let fixture = require_ready!(ctx);
        let procs = DocumentProcedures::new(fixture.bucket);
        Some(procs.query("select * from mybucket").ok()?.count())
    }

    let node = MemoryNode::new(NodeConfig::default());
    node.stop();
    let ctx = FixtureContext::set_up(MemoryNetwork::localhost(node), quick_config()).unwrap();
    assert_eq!(body(&ctx), None);

    let cluster = TestCluster::new(NodeConfig::default());
    assert!(body(&cluster.ctx).is_some());
}
