//! In-memory collaborators for integration tests
//!
//! The store applies status merge patches back into the cache, so consecutive
//! passes observe what the previous pass wrote, the way they would against a
//! real API server once the watch delivered the update.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use repository_controller::client::{
    JobDispatcher, RepositoryCache, RepositoryStore, ResourceClient, ResourceListItem,
    ResourceLister,
};
use repository_controller::controller::reconciler::{FinalizerProcessor, Reconciler};
use repository_controller::crd::{JobSpec, Repository, WebhookStatus};
use repository_controller::error::ServiceUnavailable;
use repository_controller::repository::{
    FieldError, RepoGetter, RepositoryAdapter, RepositoryHooks, RepositoryTester, TestResults,
};

pub const NAMESPACE: &str = "default";

/// Repository built from JSON, so tests read like manifests
pub fn repository(name: &str, generation: i64, extra: Value) -> Repository {
    let mut manifest = json!({
        "apiVersion": "provisioning.repoctl.dev/v0alpha1",
        "kind": "Repository",
        "metadata": { "name": name, "namespace": NAMESPACE, "generation": generation },
        "spec": {
            "title": "Team dashboards",
            "type": "local",
            "local": { "path": "/srv/dashboards" },
            "sync": { "enabled": true, "target": "folder", "intervalSeconds": 60 }
        }
    });
    merge_patch(&mut manifest, &extra);
    serde_json::from_value(manifest).expect("valid repository manifest")
}

pub fn key(name: &str) -> String {
    format!("{NAMESPACE}/{name}")
}

/// RFC 7386 JSON merge patch
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = json!({});
    }
    let Value::Object(target) = target else {
        return;
    };
    for (k, v) in patch {
        if v.is_null() {
            target.remove(k);
        } else {
            merge_patch(target.entry(k.clone()).or_insert(Value::Null), v);
        }
    }
}

fn unavailable(what: &str) -> anyhow::Error {
    anyhow::Error::new(ServiceUnavailable::new(what.to_string()))
}

#[derive(Default)]
pub struct FakeCache {
    objects: Mutex<HashMap<(String, String), Repository>>,
    pub reads: AtomicUsize,
}

impl FakeCache {
    pub fn insert(&self, obj: Repository) {
        let id = (
            obj.metadata.namespace.clone().unwrap_or_default(),
            obj.metadata.name.clone().unwrap_or_default(),
        );
        self.objects.lock().unwrap().insert(id, obj);
    }

    pub fn remove(&self, namespace: &str, name: &str) {
        self.objects
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
    }

    pub fn object(&self, name: &str) -> Repository {
        self.objects
            .lock()
            .unwrap()
            .get(&(NAMESPACE.to_string(), name.to_string()))
            .cloned()
            .expect("object in cache")
    }

    /// Bump the generation the way a spec edit would
    pub fn edit_spec(&self, name: &str) {
        let mut obj = self.object(name);
        obj.metadata.generation = Some(obj.metadata.generation.unwrap_or(0) + 1);
        self.insert(obj);
    }
}

#[async_trait]
impl RepositoryCache for FakeCache {
    fn get(&self, namespace: &str, name: &str) -> Option<Repository> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.objects
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    async fn wait_for_sync(&self) -> bool {
        true
    }
}

pub struct FakeStore {
    cache: Arc<FakeCache>,
    pub patches: Mutex<Vec<(String, Value)>>,
    pub finalizers_removed: Mutex<Vec<String>>,
    pub unavailable: AtomicBool,
}

impl FakeStore {
    pub fn new(cache: Arc<FakeCache>) -> Self {
        Self {
            cache,
            patches: Mutex::default(),
            finalizers_removed: Mutex::default(),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn patch_count(&self) -> usize {
        self.patches.lock().unwrap().len()
    }

    pub fn last_patch(&self) -> Value {
        self.patches
            .lock()
            .unwrap()
            .last()
            .map(|(_, patch)| patch.clone())
            .expect("a status patch")
    }
}

#[async_trait]
impl RepositoryStore for FakeStore {
    async fn patch_status(&self, namespace: &str, name: &str, patch: &Value) -> anyhow::Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable("storage is restarting"));
        }
        let obj = self
            .cache
            .get(namespace, name)
            .ok_or_else(|| anyhow::anyhow!("{namespace}/{name} not found"))?;
        let mut value = serde_json::to_value(&obj)?;
        merge_patch(&mut value, patch);
        self.cache.insert(serde_json::from_value(value)?);
        self.patches
            .lock()
            .unwrap()
            .push((format!("{namespace}/{name}"), patch.clone()));
        Ok(())
    }

    async fn remove_finalizers(&self, namespace: &str, name: &str) -> anyhow::Result<()> {
        if let Some(mut obj) = self.cache.get(namespace, name) {
            obj.metadata.finalizers = None;
            self.cache.insert(obj);
        }
        self.finalizers_removed
            .lock()
            .unwrap()
            .push(format!("{namespace}/{name}"));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeJobs {
    pub submitted: Mutex<Vec<(String, JobSpec)>>,
}

impl FakeJobs {
    pub fn count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn last(&self) -> JobSpec {
        self.submitted
            .lock()
            .unwrap()
            .last()
            .map(|(_, job)| job.clone())
            .expect("a submitted job")
    }
}

#[async_trait]
impl JobDispatcher for FakeJobs {
    async fn submit(&self, namespace: &str, job: JobSpec) -> anyhow::Result<String> {
        let mut submitted = self.submitted.lock().unwrap();
        let id = format!("{}-sync-{}", job.repository, submitted.len() + 1);
        submitted.push((namespace.to_string(), job));
        Ok(id)
    }
}

/// What the fake tester answers
#[derive(Debug, Clone)]
pub enum Health {
    Healthy,
    Unhealthy(Vec<String>),
    Broken(String),
    /// Never answers, like a remote that stopped responding
    Hang,
}

pub struct FakeTester {
    pub health: Mutex<Health>,
    pub calls: AtomicUsize,
}

impl Default for FakeTester {
    fn default() -> Self {
        Self {
            health: Mutex::new(Health::Healthy),
            calls: AtomicUsize::new(0),
        }
    }
}

impl FakeTester {
    pub fn set(&self, health: Health) {
        *self.health.lock().unwrap() = health;
    }
}

#[async_trait]
impl RepositoryTester for FakeTester {
    async fn test(&self, _repo: &dyn RepositoryAdapter) -> anyhow::Result<TestResults> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let health = self.health.lock().unwrap().clone();
        match health {
            Health::Healthy => Ok(TestResults::success()),
            Health::Unhealthy(errors) => Ok(TestResults::failure(400, errors)),
            Health::Broken(message) => Err(anyhow::anyhow!(message)),
            Health::Hang => std::future::pending().await,
        }
    }
}

/// Records hook invocations in order
#[derive(Default)]
pub struct FakeHooks {
    pub calls: Mutex<Vec<&'static str>>,
    pub webhook: Option<WebhookStatus>,
    pub fail_delete: bool,
}

impl FakeHooks {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RepositoryHooks for FakeHooks {
    async fn on_create(&self) -> anyhow::Result<Option<WebhookStatus>> {
        self.calls.lock().unwrap().push("on_create");
        Ok(self.webhook.clone())
    }

    async fn on_update(&self) -> anyhow::Result<Option<WebhookStatus>> {
        self.calls.lock().unwrap().push("on_update");
        Ok(self.webhook.clone())
    }

    async fn on_delete(&self) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push("on_delete");
        if self.fail_delete {
            anyhow::bail!("webhook already removed");
        }
        Ok(())
    }
}

pub struct FakeAdapter {
    config: Repository,
    hooks: Option<Arc<FakeHooks>>,
}

#[async_trait]
impl RepositoryAdapter for FakeAdapter {
    fn config(&self) -> &Repository {
        &self.config
    }

    fn validate(&self) -> Vec<FieldError> {
        Vec::new()
    }

    async fn test(&self) -> anyhow::Result<TestResults> {
        Ok(TestResults::success())
    }

    fn hooks(&self) -> Option<&dyn RepositoryHooks> {
        self.hooks.as_deref().map(|hooks| hooks as &dyn RepositoryHooks)
    }
}

/// Builds [`FakeAdapter`]s; can be told to panic to exercise the worker boundary
#[derive(Default)]
pub struct FakeRepoGetter {
    pub hooks: Option<Arc<FakeHooks>>,
    pub panic_on: Mutex<HashSet<String>>,
}

impl FakeRepoGetter {
    pub fn with_hooks(hooks: Arc<FakeHooks>) -> Self {
        Self {
            hooks: Some(hooks),
            ..Self::default()
        }
    }
}

#[async_trait]
impl RepoGetter for FakeRepoGetter {
    async fn as_repository(&self, config: &Repository) -> anyhow::Result<Arc<dyn RepositoryAdapter>> {
        let name = config.metadata.name.clone().unwrap_or_default();
        if self.panic_on.lock().unwrap().contains(&name) {
            panic!("adapter for {name} exploded");
        }
        Ok(Arc::new(FakeAdapter {
            config: config.clone(),
            hooks: self.hooks.clone(),
        }))
    }
}

pub fn item(resource: &str, name: &str, path: &str) -> ResourceListItem {
    ResourceListItem {
        group: format!("{}.repoctl.dev", resource.trim_end_matches('s')),
        resource: resource.to_string(),
        name: name.to_string(),
        path: path.to_string(),
        hash: String::new(),
    }
}

#[derive(Default)]
pub struct FakeLister {
    pub items: Mutex<Vec<ResourceListItem>>,
    pub fail: AtomicBool,
    /// `(namespace, repository)` of every listing
    pub listed: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ResourceLister for FakeLister {
    async fn list(&self, namespace: &str, repository: &str) -> anyhow::Result<Vec<ResourceListItem>> {
        self.listed
            .lock()
            .unwrap()
            .push((namespace.to_string(), repository.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("listing is down");
        }
        Ok(self.items.lock().unwrap().clone())
    }
}

/// Records `(operation, name)` pairs; names in `failing` error out
#[derive(Default)]
pub struct FakeResourceClient {
    pub operations: Mutex<Vec<(&'static str, String)>>,
    pub failing: HashSet<String>,
}

impl FakeResourceClient {
    pub fn operations(&self) -> Vec<(&'static str, String)> {
        self.operations.lock().unwrap().clone()
    }

    fn record(&self, op: &'static str, item: &ResourceListItem) -> anyhow::Result<()> {
        self.operations.lock().unwrap().push((op, item.name.clone()));
        if self.failing.contains(&item.name) {
            anyhow::bail!("{op} {} rejected", item.name);
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceClient for FakeResourceClient {
    async fn remove_repository_annotations(
        &self,
        _namespace: &str,
        item: &ResourceListItem,
    ) -> anyhow::Result<()> {
        self.record("release", item)
    }

    async fn delete(&self, _namespace: &str, item: &ResourceListItem) -> anyhow::Result<()> {
        self.record("delete", item)
    }
}

/// Every fake wired into one reconciler
pub struct Harness {
    pub cache: Arc<FakeCache>,
    pub store: Arc<FakeStore>,
    pub jobs: Arc<FakeJobs>,
    pub tester: Arc<FakeTester>,
    pub hooks: Arc<FakeHooks>,
    pub getter: Arc<FakeRepoGetter>,
    pub lister: Arc<FakeLister>,
    pub resources: Arc<FakeResourceClient>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_hooks(FakeHooks::default())
    }

    pub fn with_hooks(hooks: FakeHooks) -> Self {
        Self::build(hooks, FakeResourceClient::default())
    }

    pub fn with_resource_client(resources: FakeResourceClient) -> Self {
        Self::build(FakeHooks::default(), resources)
    }

    fn build(hooks: FakeHooks, resources: FakeResourceClient) -> Self {
        let cache = Arc::new(FakeCache::default());
        let hooks = Arc::new(hooks);
        Self {
            store: Arc::new(FakeStore::new(cache.clone())),
            cache,
            jobs: Arc::new(FakeJobs::default()),
            tester: Arc::new(FakeTester::default()),
            getter: Arc::new(FakeRepoGetter::with_hooks(hooks.clone())),
            hooks,
            lister: Arc::new(FakeLister::default()),
            resources: Arc::new(resources),
        }
    }

    pub fn finalizer(&self) -> FinalizerProcessor {
        FinalizerProcessor::new(self.lister.clone(), self.resources.clone())
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            self.cache.clone(),
            self.store.clone(),
            self.getter.clone(),
            self.tester.clone(),
            self.jobs.clone(),
            self.finalizer(),
        )
    }
}
