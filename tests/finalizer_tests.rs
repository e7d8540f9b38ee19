//! Finalizer processing of deleted repositories

mod common;

use std::sync::atomic::Ordering;

use common::{item, repository, FakeHooks, FakeResourceClient, Harness};
use repository_controller::controller::reconciler::{
    FinalizeSummary, CLEAN_FINALIZER, RELEASE_ORPHAN_RESOURCES_FINALIZER,
    REMOVE_ORPHAN_RESOURCES_FINALIZER,
};
use repository_controller::repository::RepoGetter;
use serde_json::json;

fn finalizers(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| (*id).to_string()).collect()
}

fn seed(harness: &Harness) {
    harness.lister.items.lock().unwrap().extend([
        item("folders", "team", "team"),
        item("folders", "team-ops", "team/ops"),
        item("dashboards", "overview", "team/overview.json"),
        item("folders", "team-ops-alerts", "team/ops/alerts"),
        item("dashboards", "latency", "team/ops/latency.json"),
    ]);
}

#[tokio::test]
async fn remove_deletes_leaves_before_folders_deepest_first() {
    let harness = Harness::new();
    seed(&harness);
    let repo = harness
        .getter
        .as_repository(&repository("dashboards", 1, json!({})))
        .await
        .unwrap();

    let summary = harness
        .finalizer()
        .process(repo.as_ref(), &finalizers(&[REMOVE_ORPHAN_RESOURCES_FINALIZER]))
        .await
        .unwrap();

    assert_eq!(
        summary,
        FinalizeSummary {
            processed: 5,
            failed: 0
        }
    );
    let names: Vec<String> = harness
        .resources
        .operations()
        .into_iter()
        .map(|(op, name)| {
            assert_eq!(op, "delete");
            name
        })
        .collect();
    assert_eq!(
        names,
        vec!["overview", "latency", "team-ops-alerts", "team-ops", "team"]
    );
}

#[tokio::test]
async fn release_strips_annotations_instead_of_deleting() {
    let harness = Harness::new();
    seed(&harness);
    let repo = harness
        .getter
        .as_repository(&repository("dashboards", 1, json!({})))
        .await
        .unwrap();

    harness
        .finalizer()
        .process(repo.as_ref(), &finalizers(&[RELEASE_ORPHAN_RESOURCES_FINALIZER]))
        .await
        .unwrap();

    let operations = harness.resources.operations();
    assert_eq!(operations.len(), 5);
    assert!(operations.iter().all(|(op, _)| *op == "release"));
}

#[tokio::test]
async fn item_failures_are_counted_not_fatal() {
    let harness = Harness::with_resource_client(FakeResourceClient {
        failing: ["team-ops".to_string()].into_iter().collect(),
        ..FakeResourceClient::default()
    });
    seed(&harness);
    let repo = harness
        .getter
        .as_repository(&repository("dashboards", 1, json!({})))
        .await
        .unwrap();

    let summary = harness
        .finalizer()
        .process(repo.as_ref(), &finalizers(&[REMOVE_ORPHAN_RESOURCES_FINALIZER]))
        .await
        .unwrap();

    assert_eq!(
        summary,
        FinalizeSummary {
            processed: 4,
            failed: 1
        }
    );
    // Processing continued past the failure
    assert_eq!(harness.resources.operations().len(), 5);
}

#[tokio::test]
async fn listing_failure_aborts_the_pass() {
    let harness = Harness::new();
    harness.lister.fail.store(true, Ordering::SeqCst);
    let repo = harness
        .getter
        .as_repository(&repository("dashboards", 1, json!({})))
        .await
        .unwrap();

    let err = harness
        .finalizer()
        .process(
            repo.as_ref(),
            &finalizers(&[
                REMOVE_ORPHAN_RESOURCES_FINALIZER,
                RELEASE_ORPHAN_RESOURCES_FINALIZER,
            ]),
        )
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("listing is down"));
    assert!(harness.resources.operations().is_empty());
}

#[tokio::test]
async fn finalizers_run_in_list_order_and_unknown_ones_are_skipped() {
    let harness = Harness::with_hooks(FakeHooks {
        fail_delete: true,
        ..FakeHooks::default()
    });
    harness
        .lister
        .items
        .lock()
        .unwrap()
        .push(item("dashboards", "overview", "overview.json"));
    let repo = harness
        .getter
        .as_repository(&repository("dashboards", 1, json!({})))
        .await
        .unwrap();

    let summary = harness
        .finalizer()
        .process(
            repo.as_ref(),
            &finalizers(&[
                "kubernetes.io/legacy",
                RELEASE_ORPHAN_RESOURCES_FINALIZER,
                CLEAN_FINALIZER,
                REMOVE_ORPHAN_RESOURCES_FINALIZER,
            ]),
        )
        .await
        .unwrap();

    // A failing deletion hook is logged and the remaining finalizers still run
    assert_eq!(harness.hooks.calls(), vec!["on_delete"]);
    assert_eq!(
        harness.resources.operations(),
        vec![
            ("release", "overview".to_string()),
            ("delete", "overview".to_string())
        ]
    );
    assert_eq!(summary.processed, 2);
}

#[tokio::test]
async fn cluster_scoped_repository_lists_without_a_namespace() {
    let harness = Harness::new();
    seed(&harness);
    let repo = harness
        .getter
        .as_repository(&repository(
            "dashboards",
            1,
            json!({ "metadata": { "namespace": null } }),
        ))
        .await
        .unwrap();

    harness
        .finalizer()
        .process(repo.as_ref(), &finalizers(&[REMOVE_ORPHAN_RESOURCES_FINALIZER]))
        .await
        .unwrap();

    assert_eq!(
        *harness.lister.listed.lock().unwrap(),
        vec![(String::new(), "dashboards".to_string())]
    );
}
