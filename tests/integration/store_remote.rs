//! TreeStore against an in-memory remote collaborator.

use crate::integration::support::{catalog, ids, row, schema, FakeServer};
use grove::query::{FilterCondition, FilterOperator, SortDirection};
use grove::config::StoreConfig;
use grove::tooling::format::format_store_text;
use grove::{ExpandDepth, StoreEvent, StoreOptions, TreeStore};
use parking_lot::Mutex;
use std::sync::Arc;

const URL: &str = "http://fake.test/catalog";

fn store(server: &Arc<FakeServer>, options: StoreOptions) -> TreeStore {
    TreeStore::remote(schema(), server.clone(), URL, options)
}

#[tokio::test]
async fn pages_through_remote_rows() {
    let server = FakeServer::new(catalog());
    let mut store = store(
        &server,
        StoreOptions {
            limit: Some(2),
            ..StoreOptions::default()
        },
    );

    assert!(store.load().await);
    assert_eq!(ids(store.records()), vec![1, 2]);
    assert_eq!(store.total(), 5);
    assert_eq!(store.page_count(), 3);
    let first = server.last_request();
    assert_eq!(first["start"], "0");
    assert_eq!(first["limit"], "2");
    assert_eq!(first["page"], "1");
    assert_eq!(first["fields"], "id,name,size,children");

    assert!(store.next_page().await);
    assert_eq!(ids(store.records()), vec![3, 4]);
    assert_eq!(server.last_request()["start"], "2");

    assert!(store.next_page().await);
    assert_eq!(ids(store.records()), vec![5]);
    assert!(!store.next_page().await);
    assert_eq!(server.request_count(), 3);

    assert!(store.previous_page().await);
    assert_eq!(store.page(), 2);
    assert_eq!(ids(store.records()), vec![3, 4]);
}

#[tokio::test]
async fn remote_sort_reloads_and_keeps_server_order() {
    let server = FakeServer::new(catalog());
    let mut store = store(
        &server,
        StoreOptions {
            remote_sort: true,
            ..StoreOptions::default()
        },
    );
    assert!(store.load().await);
    assert!(!server.last_request().contains_key("sorters"));

    store.sort("size", SortDirection::Desc).await;
    assert_eq!(server.request_count(), 2);
    assert_eq!(server.last_request()["sorters"], r#"{"size":"DESC"}"#);
    assert_eq!(ids(store.records()), vec![5, 4, 3, 1, 2]);
}

#[tokio::test]
async fn remote_filter_resets_to_first_page() {
    let server = FakeServer::new(catalog());
    let mut store = store(
        &server,
        StoreOptions {
            remote_filter: true,
            limit: Some(2),
            ..StoreOptions::default()
        },
    );
    assert!(store.load_page(2).await);
    assert_eq!(ids(store.records()), vec![3, 4]);

    store
        .set_filter("size", FilterCondition::new(3, FilterOperator::Ge))
        .await;
    assert_eq!(store.page(), 1);
    assert_eq!(store.total(), 2);
    assert_eq!(ids(store.records()), vec![4, 5]);
    let request = server.last_request();
    assert_eq!(request["filterMode"], "AND");
    assert_eq!(request["start"], "0");
    assert!(request["filters"].contains("\"size\""));

    store.reset_filter().await;
    assert_eq!(store.total(), 5);
    assert!(!server.last_request().contains_key("filters"));
}

#[tokio::test]
async fn local_sort_applies_to_lazily_loaded_children() {
    let server = FakeServer::new(catalog());
    let mut store = store(&server, StoreOptions::default());
    assert!(store.load().await);

    store.sort("size", SortDirection::Desc).await;
    assert_eq!(server.request_count(), 1);
    assert_eq!(ids(store.records()), vec![5, 4, 3, 1, 2]);

    store.sort("size", SortDirection::Asc).await;
    assert_eq!(ids(store.records()), vec![1, 2, 3, 4, 5]);
    assert!(store.expand(vec![0]).await);
    // Served as [11, 12]; sizes 4.5 and 0.
    assert_eq!(ids(store.records()[0].children().as_slice()), vec![12, 11]);
}

#[tokio::test]
async fn local_filter_keeps_ancestors_of_expanded_matches() {
    let server = FakeServer::new(catalog());
    let mut store = store(&server, StoreOptions::default());
    assert!(store.load().await);
    assert_eq!(store.expand_all(ExpandDepth::Unbounded).await, 3);

    store
        .set_filter("name", FilterCondition::new(".rs", FilterOperator::Like))
        .await;
    assert_eq!(ids(store.records()), vec![1]);
    assert_eq!(store.find_index("id", 122), Some(vec![0, 1, 1]));

    store.reset_filter().await;
    assert_eq!(store.count(), 5);
    assert_eq!(server.request_count(), 4);
}

#[tokio::test]
async fn expand_fetches_once_per_node() {
    let server = FakeServer::new(catalog());
    let mut store = store(&server, StoreOptions::default());
    assert!(store.load().await);

    assert!(store.get(&[0]).unwrap().is_expandable());
    assert!(store.expand(vec![0]).await);
    assert_eq!(server.last_request()["parent"], r#"{"id":1}"#);
    assert_eq!(store.get(&[0, 1]).unwrap().get("name"), "store");

    assert!(store.expand(vec![0]).await);
    assert!(!store.expand(vec![0, 0]).await);
    assert!(!store.expand(vec![9]).await);
    assert_eq!(server.request_count(), 2);

    let nested = store.get(&[0, 1]).unwrap();
    assert!(store.expand(&nested).await);
    assert_eq!(nested.children().len(), 2);
    assert_eq!(nested.child(1).unwrap().parents().len(), 2);
}

#[tokio::test]
async fn expand_all_respects_depth() {
    let server = FakeServer::new(catalog());
    let mut store = store(&server, StoreOptions::default());
    assert!(store.load().await);

    assert_eq!(store.expand_all(ExpandDepth::Levels(1)).await, 2);
    assert!(store.get(&[0, 1]).unwrap().is_expandable());
    assert_eq!(store.expand_all(ExpandDepth::Unbounded).await, 1);
    assert_eq!(store.find("name", "http.rs").unwrap().depth(), 2);
    assert_eq!(store.expand_all(ExpandDepth::Unbounded).await, 0);
}

#[tokio::test]
async fn get_parents_fetches_missing_ancestors() {
    let server = FakeServer::new(catalog());
    let mut store = store(
        &server,
        StoreOptions {
            remote_expand: true,
            ..StoreOptions::default()
        },
    );
    assert!(store.load().await);

    let parents = store.get_parents(&row(serde_json::json!({"id": 122}))).await.unwrap();
    assert_eq!(ids(&parents), vec![1, 12]);
    assert_eq!(store.match_index(&row(serde_json::json!({"id": 122}))), Some(vec![0, 1, 1]));
    // chain lookup plus two expansions
    assert_eq!(server.request_count(), 4);

    let parents = store.get_parents(&row(serde_json::json!({"id": 11}))).await.unwrap();
    assert_eq!(ids(&parents), vec![1]);
    assert_eq!(server.request_count(), 4);

    assert!(store.get_parents(&row(serde_json::json!({"id": 999}))).await.is_none());
}

#[tokio::test]
async fn get_parents_without_remote_expand_searches_loaded_data_only() {
    let server = FakeServer::new(catalog());
    let mut store = store(&server, StoreOptions::default());
    assert!(store.load().await);

    assert!(store.get_parents(&row(serde_json::json!({"id": 122}))).await.is_none());
    assert_eq!(server.request_count(), 1);
    let top = store.get_parents(&row(serde_json::json!({"id": 3}))).await.unwrap();
    assert!(top.is_empty());
}

#[tokio::test]
async fn failed_reload_keeps_previous_data() {
    let server = FakeServer::new(catalog());
    let mut store = store(&server, StoreOptions::default());
    assert!(store.load().await);
    assert!(store.is_loaded());

    *server.fail.lock() = true;
    assert!(!store.reload().await);
    assert!(!store.is_loaded());
    assert_eq!(store.count(), 5);

    *server.fail.lock() = false;
    assert!(store.reload().await);
    assert!(store.is_loaded());
}

#[tokio::test]
async fn subscribers_see_the_load_lifecycle() {
    let server = FakeServer::new(catalog());
    let mut store = store(&server, StoreOptions::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let id = store.subscribe(move |event| {
        let label = match event {
            StoreEvent::BeforeLoad(_) => "before".to_string(),
            StoreEvent::Load { count, total } => format!("load {}/{}", count, total),
            StoreEvent::Update => "update".to_string(),
            StoreEvent::UpdateChildren(record) => format!("children {}", record.get("id")),
        };
        sink.lock().push(label);
    });

    assert!(store.load().await);
    assert!(store.expand(vec![1]).await);
    assert_eq!(
        *seen.lock(),
        vec!["before", "load 5/5", "update", "children 2"]
    );

    assert!(store.unsubscribe(id));
    assert!(store.reload().await);
    assert_eq!(seen.lock().len(), 4);
}

#[tokio::test]
async fn staleness_tracks_request_changes() {
    let server = FakeServer::new(catalog());
    let mut store = store(&server, StoreOptions::default());
    assert!(store.is_stale());
    assert!(store.load().await);
    assert!(!store.is_stale());

    store.set_limit(Some(2));
    assert!(store.is_stale());
    assert!(store.load().await);
    assert_eq!(store.current_params().unwrap().limit, Some(2));
    assert!(!store.is_stale());
}

#[tokio::test]
async fn expanded_children_follow_remote_sort() {
    let server = FakeServer::new(catalog());
    let mut store = store(
        &server,
        StoreOptions {
            remote_sort: true,
            ..StoreOptions::default()
        },
    );
    assert!(store.load().await);
    store.sort("name", SortDirection::Desc).await;
    assert_eq!(ids(store.records()), vec![1, 2, 4, 5, 3]);

    assert!(store.expand(vec![0]).await);
    let request = server.last_request();
    assert_eq!(request["parent"], r#"{"id":1}"#);
    assert_eq!(request["sorters"], r#"{"name":"DESC"}"#);
    // Stored as [main.rs, store].
    assert_eq!(ids(store.records()[0].children().as_slice()), vec![12, 11]);
}

#[tokio::test]
async fn expanded_children_follow_remote_filter() {
    let server = FakeServer::new(catalog());
    let mut store = store(
        &server,
        StoreOptions {
            remote_filter: true,
            limit: Some(10),
            ..StoreOptions::default()
        },
    );
    assert!(store.load().await);
    store
        .set_filter("size", FilterCondition::new(4.5, FilterOperator::Ne))
        .await;
    assert_eq!(store.count(), 5);

    assert!(store.expand(vec![0]).await);
    let request = server.last_request();
    assert!(request.contains_key("filters"));
    assert!(!request.contains_key("start"));
    assert_eq!(ids(store.records()[0].children().as_slice()), vec![12]);
}

#[tokio::test]
async fn zero_limit_from_config_disables_paging() {
    let server = FakeServer::new(catalog());
    let config = StoreConfig {
        limit: Some(0),
        ..StoreConfig::default()
    };
    let mut store = store(&server, StoreOptions::from(&config));
    assert!(store.load().await);
    assert_eq!(store.count(), 5);
    assert_eq!(store.page_count(), 1);
    assert!(!server.last_request().contains_key("limit"));
    assert!(format_store_text(&store).contains("page 1/1"));

    let mut direct = store_with_limit(&server, Some(0));
    assert!(direct.load().await);
    assert_eq!(direct.limit(), None);
}

#[tokio::test]
async fn huge_page_number_does_not_overflow() {
    let server = FakeServer::new(catalog());
    let mut store = store_with_limit(&server, Some(2));
    assert!(store.load_page(usize::MAX).await);
    assert_eq!(server.last_request()["start"], usize::MAX.to_string());
    assert_eq!(store.count(), 0);
    assert_eq!(store.total(), 5);
}

fn store_with_limit(server: &Arc<FakeServer>, limit: Option<usize>) -> TreeStore {
    store(
        server,
        StoreOptions {
            limit,
            ..StoreOptions::default()
        },
    )
}
