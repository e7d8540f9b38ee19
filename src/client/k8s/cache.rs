//! # Watch Cache
//!
//! Reflector-backed repository cache that forwards watch events to a
//! [`RepositoryEventHandler`].
//!
//! The reflector store is updated before the handler hears about an event, so a
//! worker that reads the cache after being notified sees at least that version.
//! After every (re)list the handler receives an add or update for each listed
//! object and a delete for each object that disappeared while the watch was down.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use kube::api::Api;
use kube::ResourceExt;
use kube_runtime::reflector::{self, ObjectRef, Store};
use kube_runtime::{watcher, WatchStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{RepositoryCache, RepositoryEventHandler};
use crate::controller::reconciler::object_key;
use crate::crd::Repository;

/// Read side of the cache
#[derive(Clone)]
pub struct KubeRepositoryCache {
    store: Store<Repository>,
}

impl std::fmt::Debug for KubeRepositoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeRepositoryCache")
            .field("objects", &self.store.state().len())
            .finish()
    }
}

#[async_trait]
impl RepositoryCache for KubeRepositoryCache {
    fn get(&self, namespace: &str, name: &str) -> Option<Repository> {
        let mut obj_ref = ObjectRef::<Repository>::new(name);
        if !namespace.is_empty() {
            obj_ref = obj_ref.within(namespace);
        }
        self.store.get(&obj_ref).map(|obj| obj.as_ref().clone())
    }

    async fn wait_for_sync(&self) -> bool {
        self.store.wait_until_ready().await.is_ok()
    }
}

/// Watch driver that feeds the store and the handler
pub struct RepositoryInformer {
    api: Api<Repository>,
    writer: reflector::store::Writer<Repository>,
    store: Store<Repository>,
    handler: Arc<dyn RepositoryEventHandler>,
}

impl std::fmt::Debug for RepositoryInformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryInformer").finish_non_exhaustive()
    }
}

/// Create the cache and the informer that keeps it current
pub fn repository_cache(
    api: Api<Repository>,
    handler: Arc<dyn RepositoryEventHandler>,
) -> (KubeRepositoryCache, RepositoryInformer) {
    let (store, writer) = reflector::store();
    let cache = KubeRepositoryCache {
        store: store.clone(),
    };
    let informer = RepositoryInformer {
        api,
        writer,
        store,
        handler,
    };
    (cache, informer)
}

impl RepositoryInformer {
    /// Watch until `cancel` fires; watch errors are retried with backoff
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Starting repository watch");
        let stream = watcher(self.api.clone(), watcher::Config::default()).default_backoff();
        let mut stream = std::pin::pin!(stream);
        let mut relist: Vec<Repository> = Vec::new();

        loop {
            let next = tokio::select! {
                next = stream.next() => next,
                () = cancel.cancelled() => break,
            };
            match next {
                Some(Ok(event)) => self.handle_event(event, &mut relist),
                Some(Err(e)) => warn!(error = %e, "repository watch error"),
                None => break,
            }
        }
        info!("Repository watch stopped");
    }

    fn handle_event(&mut self, event: watcher::Event<Repository>, relist: &mut Vec<Repository>) {
        match &event {
            watcher::Event::Apply(obj) => {
                let old = self.store.get(&ObjectRef::from_obj(obj));
                self.writer.apply_watcher_event(&event);
                match old {
                    Some(old) => self.handler.on_update(&old, obj),
                    None => self.handler.on_add(obj),
                }
            }
            watcher::Event::Delete(obj) => {
                self.writer.apply_watcher_event(&event);
                self.handler.on_delete(obj);
            }
            watcher::Event::Init => {
                debug!("repository relist started");
                relist.clear();
                self.writer.apply_watcher_event(&event);
            }
            watcher::Event::InitApply(obj) => {
                relist.push(obj.clone());
                self.writer.apply_watcher_event(&event);
            }
            watcher::Event::InitDone => {
                let previous: HashMap<String, Arc<Repository>> = self
                    .store
                    .state()
                    .into_iter()
                    .map(|obj| (object_key(&obj), obj))
                    .collect();
                self.writer.apply_watcher_event(&event);

                let listed = std::mem::take(relist);
                info!(count = listed.len(), "repository relist complete");
                let mut seen = std::collections::HashSet::with_capacity(listed.len());
                for obj in &listed {
                    let key = object_key(obj);
                    match previous.get(&key) {
                        Some(old) => self.handler.on_update(old, obj),
                        None => self.handler.on_add(obj),
                    }
                    seen.insert(key);
                }
                for (key, old) in &previous {
                    if !seen.contains(key) {
                        debug!(work_key = %key, resource.name = %old.name_any(), "object vanished during relist");
                        self.handler.on_delete(old);
                    }
                }
            }
        }
    }
}
