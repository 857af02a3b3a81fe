//! Routing and direct-dispatch behaviour of the shard cluster

use serde_json::{json, Value};
use shard_cluster::testing::{CallJournal, RecordingShard};
use shard_cluster::{
    broadcast_mapper, mapper_fn, ClusterError, MapResult, Method, Reply, Request, ShardCluster, ShardError,
    ShardHandle, TargetKind,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_test::{assert_err, assert_ok};

fn cluster_of(shards: Vec<RecordingShard>) -> (ShardCluster, Vec<Arc<RecordingShard>>) {
    let shards: Vec<Arc<RecordingShard>> = shards.into_iter().map(Arc::new).collect();
    let handles: Vec<Arc<dyn ShardHandle>> = shards
        .iter()
        .map(|s| Arc::clone(s) as Arc<dyn ShardHandle>)
        .collect();
    let cluster = ShardCluster::with_defaults(handles).unwrap();
    (cluster, shards)
}

fn three_shards() -> Vec<RecordingShard> {
    vec![
        RecordingShard::new("s0"),
        RecordingShard::new("s1"),
        RecordingShard::new("s2"),
    ]
}

fn shard_label(value: &Value) -> &str {
    value["shard"].as_str().unwrap()
}

#[tokio::test]
async fn default_mapper_broadcasts_in_ascending_order() {
    let (cluster, _) = cluster_of(three_shards());

    for method in [Method::Get, Method::Publish, Method::End] {
        let route = cluster.resolve(&json!("any-key"), method);
        assert_eq!(route.kind, TargetKind::Multi);
        assert_eq!(route.targets, vec![0, 1, 2]);
    }
    assert_eq!(cluster.map(&json!("any-key"), Method::Get).len(), 3);
}

#[tokio::test]
async fn integer_route_wraps_to_single_shard() {
    let (cluster, _) = cluster_of(three_shards());
    cluster.set_mapper(mapper_fn(|_, _, _| MapResult::Single(7)));

    let route = cluster.resolve(&json!("k"), Method::Get);
    assert_eq!(route.kind, TargetKind::Single);
    assert_eq!(route.targets, vec![1]);
}

#[tokio::test]
async fn duplicate_targets_invoke_the_same_shard_twice() {
    let (cluster, shards) = cluster_of(three_shards());
    cluster.set_mapper(mapper_fn(|_, _, _| MapResult::Multi(vec![4, 1])));

    let route = cluster.resolve(&json!("k"), Method::Get);
    assert_eq!(route.targets, vec![1, 1]);

    let results = assert_ok!(cluster.get(json!("k")));
    assert_eq!(results.len(), 2);
    assert_eq!(shards[1].call_count(), 2);
    assert_eq!(shards[0].call_count(), 0);
}

#[tokio::test]
async fn sync_fan_out_calls_each_shard_once_in_order() {
    let journal = CallJournal::new();
    let (cluster, shards) = cluster_of(
        three_shards()
            .into_iter()
            .map(|s| s.with_journal(journal.clone()))
            .collect(),
    );

    let results = assert_ok!(cluster.set(json!(["users", "1"]), json!({"n": 1}), false));

    let labels: Vec<&str> = results.iter().map(shard_label).collect();
    assert_eq!(labels, vec!["s0", "s1", "s2"]);
    assert_eq!(
        journal.entries(),
        vec![
            ("s0".to_string(), Method::Set),
            ("s1".to_string(), Method::Set),
            ("s2".to_string(), Method::Set),
        ]
    );
    for shard in &shards {
        assert_eq!(
            shard.calls(),
            vec![Request::Set {
                key: json!(["users", "1"]),
                value: json!({"n": 1}),
                get_value: false,
            }]
        );
    }
}

#[tokio::test]
async fn sync_error_stops_before_later_shards() {
    let (cluster, shards) = cluster_of(vec![
        RecordingShard::new("s0"),
        RecordingShard::new("s1").fail(Method::Remove, ShardError::new("BrokerError", "locked")),
        RecordingShard::new("s2"),
    ]);

    let err = assert_err!(cluster.remove(json!("k"), true));
    assert_eq!(err, ShardError::new("BrokerError", "locked"));
    assert_eq!(shards[0].call_count(), 1);
    assert_eq!(shards[2].call_count(), 0);
    assert_eq!(cluster.stats().failed(1), Some(1));
}

#[tokio::test]
async fn async_fan_out_reports_first_error_exactly_once() {
    let (cluster, shards) = cluster_of(vec![
        RecordingShard::new("s0"),
        RecordingShard::new("s1").fail(Method::Query, ShardError::new("QueryError", "bad query")),
        RecordingShard::new("s2").delay(Method::Query, Duration::from_millis(50)),
    ]);

    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);
    let (tx, rx) = oneshot::channel();

    let placeholder = cluster.query_with("count()".to_string(), json!({}), move |outcome| {
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(outcome);
    });
    assert!(placeholder.is_empty());

    let outcome = rx.await.unwrap();
    assert_eq!(outcome, Err(ShardError::new("QueryError", "bad query")));

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert_eq!(shards[2].call_count(), 1, "in-flight shard call still runs to completion");
}

#[tokio::test]
async fn async_fan_out_results_follow_issuance_order() {
    let journal = CallJournal::new();
    let (cluster, _) = cluster_of(vec![
        RecordingShard::new("s0")
            .with_journal(journal.clone())
            .delay(Method::Count, Duration::from_millis(30)),
        RecordingShard::new("s1").with_journal(journal.clone()),
        RecordingShard::new("s2")
            .with_journal(journal.clone())
            .delay(Method::Count, Duration::from_millis(10)),
    ]);

    let reply = assert_ok!(cluster.count_async(json!("list")).await);
    let results = match reply {
        Reply::Multi(results) => results,
        other => panic!("expected fan-out reply, got {other:?}"),
    };

    let labels: Vec<&str> = results.iter().map(shard_label).collect();
    assert_eq!(labels, vec!["s0", "s1", "s2"]);
    let issued: Vec<String> = journal.entries().into_iter().map(|(label, _)| label).collect();
    assert_eq!(issued, vec!["s0", "s1", "s2"]);
}

#[tokio::test]
async fn single_target_is_forwarded_unwrapped() {
    let (cluster, shards) = cluster_of(vec![
        RecordingShard::new("s0"),
        RecordingShard::new("s1"),
        RecordingShard::new("s2").reply(Method::Get, json!("value-from-s2")),
    ]);
    cluster.set_mapper(mapper_fn(|_, _, _| MapResult::Single(2)));

    let reply = assert_ok!(cluster.get_async(json!("k")).await);
    assert_eq!(reply, Reply::Single(json!("value-from-s2")));
    assert_eq!(shards[0].call_count() + shards[1].call_count(), 0);

    let (tx, rx) = oneshot::channel();
    let placeholder = cluster.get_with(json!("k"), move |outcome| {
        let _ = tx.send(outcome);
    });
    assert!(placeholder.is_empty());
    assert_eq!(rx.await.unwrap(), Ok(Reply::Single(json!("value-from-s2"))));
}

#[tokio::test]
async fn handler_call_reaches_shard_before_returning() {
    let (cluster, shards) = cluster_of(three_shards());
    cluster.set_mapper(mapper_fn(|_, _, _| MapResult::Single(0)));

    cluster.get_with(json!("k"), |_| {});
    assert_eq!(shards[0].calls(), vec![Request::Get { key: json!("k") }]);

    cluster.set_mapper(broadcast_mapper());
    cluster.has_key_with(json!("k"), |_| {});
    assert!(shards.iter().all(|s| s.calls().last() == Some(&Request::HasKey { key: json!("k") })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn back_to_back_handler_calls_keep_call_order() {
    let journal = CallJournal::new();
    let (cluster, _) = cluster_of(vec![
        RecordingShard::new("s0").with_journal(journal.clone()),
        RecordingShard::new("s1"),
    ]);
    cluster.set_mapper(mapper_fn(|_, _, _| MapResult::Single(0)));

    let rounds = 500;
    for i in 0..rounds {
        cluster.set_with(json!(i), json!(i), false, |_| {});
        cluster.get_with(json!(i), |_| {});
    }

    let methods: Vec<Method> = journal.entries().into_iter().map(|(_, method)| method).collect();
    let expected: Vec<Method> = (0..rounds).flat_map(|_| [Method::Set, Method::Get]).collect();
    assert_eq!(methods, expected);
}

#[tokio::test]
async fn unpolled_future_reaches_no_shard() {
    let (cluster, shards) = cluster_of(three_shards());

    let pending = cluster.remove_async(json!("k"), false);
    drop(pending);

    assert!(shards.iter().all(|s| s.call_count() == 0));
    assert_eq!(cluster.stats().total_dispatched(), 0);

    assert_ok!(cluster.remove_async(json!("k"), false).await);
    assert_eq!(cluster.stats().total_dispatched(), 3);
}

#[tokio::test]
async fn unrouted_call_is_a_no_op() {
    let (cluster, shards) = cluster_of(three_shards());
    cluster.set_mapper(mapper_fn(|_, _, _| MapResult::Unrouted));

    assert_eq!(assert_ok!(cluster.publish("news".to_string(), json!("hi"))), Vec::<Value>::new());

    let reply = assert_ok!(cluster.publish_async("news".to_string(), json!("hi")).await);
    assert_eq!(reply, Reply::Multi(Vec::new()));
    assert!(shards.iter().all(|s| s.call_count() == 0));
}

#[tokio::test]
async fn routing_key_and_method_reach_the_mapper() {
    let (cluster, shards) = cluster_of(three_shards());
    cluster.set_mapper(mapper_fn(|key, method, ids| {
        assert_eq!(ids, &[0, 1, 2]);
        match (method, key.as_str()) {
            (Method::Subscribe, Some("alerts")) => MapResult::Single(0),
            (Method::GetAll, None) => MapResult::Single(2),
            _ => MapResult::Unrouted,
        }
    }));

    assert_ok!(cluster.subscribe("alerts".to_string()));
    assert_ok!(cluster.get_all());

    assert_eq!(
        shards[0].calls(),
        vec![Request::Subscribe { channel: "alerts".to_string() }]
    );
    assert_eq!(shards[2].calls(), vec![Request::GetAll]);
    assert_eq!(shards[1].call_count(), 0);
}

#[tokio::test]
async fn replacing_mapper_leaves_resolved_calls_untouched() {
    let (cluster, shards) = cluster_of(
        three_shards()
            .into_iter()
            .map(|s| s.delay(Method::HasKey, Duration::from_millis(20)))
            .collect(),
    );

    let in_flight = cluster.has_key_async(json!("k"));
    cluster.set_mapper(mapper_fn(|_, _, _| MapResult::Single(0)));

    let reply = assert_ok!(in_flight.await);
    assert_eq!(reply.into_values().len(), 3);

    let reply = assert_ok!(cluster.has_key_async(json!("k")).await);
    assert!(matches!(reply, Reply::Single(_)));
    assert_eq!(shards[0].call_count(), 2);
    assert_eq!(shards[1].call_count(), 1);
}

#[tokio::test]
async fn mapper_accessor_returns_active_mapper() {
    let (cluster, _) = cluster_of(three_shards());
    let mapper = mapper_fn(|_, _, _| MapResult::Single(1));

    cluster.set_mapper(Arc::clone(&mapper));
    assert!(Arc::ptr_eq(&cluster.mapper(), &mapper));
}

#[tokio::test]
async fn utilities_delegate_to_first_shard() {
    let (cluster, shards) = cluster_of(three_shards());
    let value = json!({"a": 1, "b": [2, 3]});

    let mut keys = cluster.extract_keys(&value);
    keys.sort();
    assert_eq!(keys, vec!["a", "b"]);
    assert_eq!(cluster.extract_values(&json!([1, 2])), vec![json!(1), json!(2)]);
    assert!(shards.iter().all(|s| s.call_count() == 0));
}

#[tokio::test]
async fn stats_count_dispatches_per_shard() {
    let (cluster, _) = cluster_of(three_shards());
    cluster.set_mapper(mapper_fn(|_, _, _| MapResult::Multi(vec![0, 2])));

    assert_ok!(cluster.pop(json!("q"), false));
    assert_ok!(cluster.pop_async(json!("q"), false).await);

    let stats = cluster.stats();
    assert_eq!(stats.dispatched(0), Some(2));
    assert_eq!(stats.dispatched(1), Some(0));
    assert_eq!(stats.dispatched(2), Some(2));
    assert_eq!(stats.total_dispatched(), 4);
}

#[tokio::test]
async fn empty_pool_is_rejected() {
    let err = ShardCluster::with_defaults(Vec::new()).err().unwrap();
    assert!(matches!(err, ClusterError::EmptyPool));
}

#[test]
fn construction_outside_runtime_is_rejected() {
    let shard: Arc<dyn ShardHandle> = Arc::new(RecordingShard::new("s0"));
    let err = ShardCluster::with_defaults(vec![shard]).err().unwrap();
    assert_eq!(err.error_type_label(), "no_runtime");
}
