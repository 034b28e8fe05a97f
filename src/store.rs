use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::Url;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use crate::domain::{TVConfig, TVError};
use crate::record::RecordCollection;

/// Where records come from. Implementations must not touch store state.
pub trait RecordSource: Send + Sync + 'static {
    fn fetch(&self, resource: &str) -> BoxFuture<'static, Result<RecordCollection, TVError>>;
}

/// Fetches `GET {base-url}/api/{resource}` and expects a json array of objects.
pub struct HttpSource {
    client: reqwest::Client,
    base: Url,
}

impl HttpSource {
    pub fn new(config: &TVConfig) -> Result<Self, TVError> {
        let base = Url::parse(&config.base_url)
            .map_err(|_| TVError::InvalidBaseUrl(config.base_url.clone()))?;
        if base.cannot_be_a_base() {
            return Err(TVError::InvalidBaseUrl(config.base_url.clone()));
        }

        let mut builder =
            reqwest::Client::builder().user_agent(concat!("rtv/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base,
        })
    }

    pub fn resource_url(&self, resource: &str) -> Result<Url, TVError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| TVError::InvalidBaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .push("api")
            .push(resource);
        Ok(url)
    }
}

impl RecordSource for HttpSource {
    fn fetch(&self, resource: &str) -> BoxFuture<'static, Result<RecordCollection, TVError>> {
        let client = self.client.clone();
        let url = self.resource_url(resource);
        let resource = resource.to_string();
        async move {
            let url = url?;
            debug!("GET {url}");
            let response = client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(TVError::Status {
                    resource,
                    status: status.as_u16(),
                });
            }
            let body = response.text().await?;
            let payload: serde_json::Value = serde_json::from_str(&body)?;
            RecordCollection::from_json(payload)
        }
        .boxed()
    }
}

#[derive(Debug)]
pub enum StoreEvent {
    Loaded { resource: String, records: usize },
    Failed { resource: String, error: TVError },
    /// A response arrived for a resource that is no longer selected.
    Discarded { resource: String },
}

struct FetchOutcome {
    resource: String,
    generation: u64,
    result: Result<RecordCollection, TVError>,
}

/// Holds the collection of the selected resource and keeps it in sync.
pub struct RecordStore {
    source: Arc<dyn RecordSource>,
    runtime: Handle,
    resource: Option<String>,
    generation: u64,
    collection: Option<Arc<RecordCollection>>,
    in_flight: Option<JoinHandle<()>>,
    tx: UnboundedSender<FetchOutcome>,
    rx: UnboundedReceiver<FetchOutcome>,
}

impl RecordStore {
    pub fn new(source: Arc<dyn RecordSource>, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            runtime,
            resource: None,
            generation: 0,
            collection: None,
            in_flight: None,
            tx,
            rx,
        }
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    pub fn collection(&self) -> Option<Arc<RecordCollection>> {
        self.collection.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Select a resource. Returns false if it already was the selected one.
    pub fn select(&mut self, resource: impl Into<String>) -> bool {
        let resource = resource.into();
        if self.resource.as_deref() == Some(resource.as_str()) {
            trace!("Resource {resource} already selected");
            return false;
        }
        info!("Selecting resource {resource}");
        self.resource = Some(resource);
        self.spawn_fetch();
        true
    }

    /// Fetch the selected resource again.
    pub fn reload(&mut self) -> bool {
        if self.resource.is_none() {
            return false;
        }
        self.spawn_fetch();
        true
    }

    /// Apply every fetch that resolved since the last call, without blocking.
    pub fn poll(&mut self) -> Vec<StoreEvent> {
        let mut events = Vec::new();
        while let Ok(outcome) = self.rx.try_recv() {
            events.push(self.apply(outcome));
        }
        events
    }

    /// Wait for the next fetch to resolve. Only returns once a fetch was started.
    pub async fn wait(&mut self) -> Option<StoreEvent> {
        let outcome = self.rx.recv().await?;
        Some(self.apply(outcome))
    }

    fn spawn_fetch(&mut self) {
        let Some(resource) = self.resource.clone() else {
            return;
        };
        if let Some(previous) = self.in_flight.take() {
            previous.abort();
        }
        self.generation += 1;
        let generation = self.generation;
        let fetch = self.source.fetch(&resource);
        let tx = self.tx.clone();

        debug!("Fetching {resource} (request {generation})");
        self.in_flight = Some(self.runtime.spawn(async move {
            let result = fetch.await;
            let outcome = FetchOutcome {
                resource,
                generation,
                result,
            };
            if tx.send(outcome).is_err() {
                trace!("Store dropped before request {generation} resolved");
            }
        }));
    }

    fn apply(&mut self, outcome: FetchOutcome) -> StoreEvent {
        let FetchOutcome {
            resource,
            generation,
            result,
        } = outcome;

        if self.resource.as_deref() != Some(resource.as_str()) || generation != self.generation {
            debug!("Discarding stale response for {resource} (request {generation})");
            return StoreEvent::Discarded { resource };
        }
        self.in_flight = None;

        match result {
            Ok(collection) => {
                let records = collection.len();
                info!(
                    "Loaded {records} records with {} fields from {resource}",
                    collection.schema().len()
                );
                self.collection = Some(Arc::new(collection));
                StoreEvent::Loaded { resource, records }
            }
            Err(error) => {
                error!("Fetching {resource} failed: {error}");
                StoreEvent::Failed { resource, error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[derive(Default)]
    struct FakeSource {
        calls: AtomicUsize,
        payloads: HashMap<String, Value>,
        gates: Mutex<HashMap<String, oneshot::Receiver<Value>>>,
    }

    impl FakeSource {
        fn with(payloads: &[(&str, Value)]) -> Self {
            Self {
                payloads: payloads
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                ..Default::default()
            }
        }

        fn gate(&self, resource: &str) -> oneshot::Sender<Value> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(resource.to_string(), rx);
            tx
        }
    }

    impl RecordSource for FakeSource {
        fn fetch(&self, resource: &str) -> BoxFuture<'static, Result<RecordCollection, TVError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.gates.lock().unwrap().remove(resource);
            let payload = self.payloads.get(resource).cloned();
            let resource = resource.to_string();
            async move {
                if let Some(gate) = gate {
                    let payload = gate.await.map_err(|_| {
                        TVError::UnexpectedPayload("gate dropped".to_string())
                    })?;
                    return RecordCollection::from_json(payload);
                }
                match payload {
                    Some(payload) => RecordCollection::from_json(payload),
                    None => Err(TVError::Status {
                        resource,
                        status: 404,
                    }),
                }
            }
            .boxed()
        }
    }

    async fn wait_until_resolved(store: &RecordStore) {
        for _ in 0..200 {
            if store.in_flight.as_ref().is_none_or(|h| h.is_finished()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("fetch never resolved");
    }

    #[tokio::test]
    async fn loads_selected_resource() {
        let source = Arc::new(FakeSource::with(&[("users", json!([{"id": 1}]))]));
        let mut store = RecordStore::new(source, Handle::current());
        assert!(store.select("users"));
        assert!(store.is_loading());

        let event = store.wait().await.unwrap();
        assert!(matches!(event, StoreEvent::Loaded { records: 1, .. }));
        assert!(!store.is_loading());
        assert_eq!(store.collection().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn same_resource_is_fetched_once() {
        let source = Arc::new(FakeSource::with(&[("users", json!([]))]));
        let mut store = RecordStore::new(source.clone(), Handle::current());
        assert!(store.select("users"));
        assert!(!store.select("users"));
        store.wait().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        assert!(store.reload());
        store.wait().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_keeps_previous_collection() {
        let source = Arc::new(FakeSource::with(&[("users", json!([{"id": 1}, {"id": 2}]))]));
        let mut store = RecordStore::new(source, Handle::current());
        store.select("users");
        store.wait().await.unwrap();

        store.select("missing");
        let event = store.wait().await.unwrap();
        assert!(matches!(
            event,
            StoreEvent::Failed {
                error: TVError::Status { status: 404, .. },
                ..
            }
        ));
        assert_eq!(store.resource(), Some("missing"));
        assert_eq!(store.collection().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn late_response_for_previous_resource_is_discarded() {
        let source = Arc::new(FakeSource::with(&[("old", json!([{"id": "old"}]))]));
        let release_new = source.gate("new");
        let mut store = RecordStore::new(source, Handle::current());

        store.select("old");
        wait_until_resolved(&store).await;
        // The old response is resolved but not applied yet when the user moves on.
        store.select("new");

        let events = store.poll();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], StoreEvent::Discarded { resource } if resource == "old"));
        assert!(store.collection().is_none());
        assert!(store.is_loading());

        release_new.send(json!([{"id": "n1"}, {"id": "n2"}])).unwrap();
        let event = store.wait().await.unwrap();
        assert!(matches!(event, StoreEvent::Loaded { records: 2, .. }));
        assert_eq!(store.resource(), Some("new"));
    }

    #[tokio::test]
    async fn superseded_reload_is_discarded() {
        let source = Arc::new(FakeSource::with(&[("users", json!([{"id": 1}]))]));
        let mut store = RecordStore::new(source, Handle::current());
        store.select("users");
        wait_until_resolved(&store).await;
        store.reload();

        let first = store.wait().await.unwrap();
        assert!(matches!(first, StoreEvent::Discarded { .. }));
        let second = store.wait().await.unwrap();
        assert!(matches!(second, StoreEvent::Loaded { .. }));
    }

    #[test]
    fn resource_url_appends_api_segment() {
        let source = HttpSource::new(&TVConfig::default()).unwrap();
        assert_eq!(
            source.resource_url("users").unwrap().as_str(),
            "http://localhost:3300/api/users"
        );

        let nested = HttpSource::new(&TVConfig::default().base_url("http://h/base/".to_string()))
            .unwrap();
        assert_eq!(
            nested.resource_url("a b").unwrap().as_str(),
            "http://h/base/api/a%20b"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        for base in ["not a url", "mailto:someone@example.com"] {
            let config = TVConfig::default().base_url(base.to_string());
            assert!(matches!(
                HttpSource::new(&config),
                Err(TVError::InvalidBaseUrl(_))
            ));
        }
    }
}
