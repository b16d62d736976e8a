//! Long-poll config resolution against the live registry.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::catalog::{ConfigDefinitionCatalog, ConfigDefinitionKey, ConfigSchema};
use crate::config::ServerConfig;
use crate::encoder::{PayloadHasher, ResponseEncoder};
use crate::error::ResolveError;
use crate::lbservices::{LbServicesBuilder, LbServicesSchema};
use crate::registry::{RegistrySnapshot, SuperModel};

use super::request::{RequestContext, Trace};
use super::response::{Resolution, ResolvedPayload};

/// A payload in canonical form together with its checksum.
struct Canonical {
    bytes: Vec<u8>,
    checksum: String,
}

/// Answers config requests from the current registry snapshot, holding them
/// open until the payload changes or the timeout elapses.
#[derive(Debug)]
pub struct ConfigResolver {
    catalog: Arc<ConfigDefinitionCatalog>,
    super_model: Arc<SuperModel>,
    encoder: ResponseEncoder,
    lb_services: LbServicesBuilder,
    aggregate_key: ConfigDefinitionKey,
    max_timeout: Duration,
}

impl ConfigResolver {
    /// Creates a resolver over `catalog` and `super_model`.
    #[must_use]
    pub fn new(
        catalog: Arc<ConfigDefinitionCatalog>,
        super_model: Arc<SuperModel>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            catalog,
            super_model,
            encoder: ResponseEncoder::new(&config.encoder),
            lb_services: LbServicesBuilder::new(config.zone.clone()),
            aggregate_key: LbServicesSchema::definition_key(),
            max_timeout: config.long_poll.max_timeout(),
        }
    }

    /// Returns the registry this resolver reads from.
    #[must_use]
    pub const fn super_model(&self) -> &Arc<SuperModel> {
        &self.super_model
    }

    /// Returns the schema catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Arc<ConfigDefinitionCatalog> {
        &self.catalog
    }

    /// Resolves one request.
    ///
    /// If the caller already holds the current payload and asked for a
    /// long poll, waits for a registry change that alters this payload,
    /// for the timeout, or for `cancel`, whichever comes first.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownSchema`] or
    /// [`ResolveError::SchemaMismatch`] before any waiting,
    /// [`ResolveError::NoSuchConfigId`] if no application answers for the
    /// config id (also when its owner is removed mid-wait),
    /// [`ResolveError::Encoding`] if the payload does not fit its schema, and
    /// [`ResolveError::Cancelled`] if `cancel` fires while waiting.
    #[instrument(skip_all, fields(key = %request.key))]
    pub async fn resolve(
        &self,
        request: &RequestContext,
        cancel: &CancellationToken,
    ) -> Result<Resolution, ResolveError> {
        let mut trace = Trace::new(request.trace_level);
        let schema = self
            .catalog
            .lookup_checked(request.key.definition(), &request.definition_checksum)?;
        trace.trace(1, || format!("Found schema {}", schema.key()));

        let timeout = request.timeout.min(self.max_timeout);
        let deadline = Instant::now() + timeout;
        // Subscribe before the first snapshot so no publish can slip between them.
        let mut generations = self.super_model.subscribe();

        loop {
            let snapshot = self.super_model.snapshot();
            let current = self.canonical(schema.as_ref(), request, &snapshot, &mut trace)?;

            if !PayloadHasher::hashes_match(&current.checksum, &request.last_checksum) {
                let payload = self
                    .encoder
                    .encode(&current.checksum, &current.bytes, &request.compression)?;
                trace.trace(1, || {
                    format!(
                        "Returning {} payload {} at generation {}",
                        payload.compression.as_str(),
                        PayloadHasher::short_hash(&current.checksum),
                        snapshot.generation()
                    )
                });
                debug!(
                    checksum = %PayloadHasher::short_hash(&current.checksum),
                    generation = snapshot.generation(),
                    "Resolved fresh payload"
                );
                return Ok(Resolution::Fresh(ResolvedPayload {
                    checksum: current.checksum,
                    generation: snapshot.generation(),
                    payload,
                    trace,
                }));
            }

            let seen = snapshot.generation();
            trace.trace(2, || {
                format!(
                    "Payload unchanged at generation {seen} (caller saw {})",
                    request.last_generation
                )
            });

            if timeout.is_zero() {
                return Ok(unchanged(current.checksum, seen, trace));
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Long poll cancelled");
                    return Err(ResolveError::Cancelled);
                }
                changed = tokio::time::timeout_at(deadline, wait_past(&mut generations, seen)) => {
                    // Elapsed, or the registry is gone and nothing can change.
                    if !matches!(changed, Ok(true)) {
                        trace.trace(1, || format!("No change within {}ms", timeout.as_millis()));
                        debug!(generation = seen, "Long poll timed out unchanged");
                        return Ok(unchanged(current.checksum, seen, trace));
                    }
                    trace.trace(2, || String::from("Registry changed, re-resolving"));
                }
            }
        }
    }

    /// Produces the canonical payload for `request` from `snapshot`.
    fn canonical(
        &self,
        schema: &dyn ConfigSchema,
        request: &RequestContext,
        snapshot: &RegistrySnapshot,
        trace: &mut Trace,
    ) -> Result<Canonical, ResolveError> {
        let payload = if schema.key() == &self.aggregate_key {
            let view = self.lb_services.build(snapshot);
            trace.trace(2, || {
                format!(
                    "Aggregated {} applications across {} tenants",
                    view.application_count(),
                    view.tenants.len()
                )
            });
            serde_json::to_value(view)
                .map_err(|e| ResolveError::encoding(format!("{}: {e}", schema.key())))?
        } else {
            let config_id = request.key.config_id();
            let owner = snapshot.owner_of(config_id, request.client_hostname.as_deref())?;
            trace.trace(2, || format!("Config id '{config_id}' owned by {}", owner.id()));

            match owner.model().resolve(&request.key) {
                Some(payload) => payload,
                None => schema.defaults().ok_or_else(|| {
                    ResolveError::no_such_config_id(
                        config_id,
                        format!("{} has no {} config for it", owner.id(), schema.key()),
                    )
                })?,
            }
        };

        let bytes = schema.encode(&payload)?;
        let checksum = schema.checksum(&bytes);
        Ok(Canonical { bytes, checksum })
    }
}

/// Waits until the published generation exceeds `seen`.
///
/// Returns false if the registry was dropped.
async fn wait_past(generations: &mut watch::Receiver<u64>, seen: u64) -> bool {
    generations.wait_for(|g| *g > seen).await.is_ok()
}

fn unchanged(checksum: String, generation: u64, trace: Trace) -> Resolution {
    Resolution::Unchanged {
        checksum,
        generation,
        trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::CompressionType;
    use crate::error::ErrorKind;
    use crate::lbservices::LbServicesConfig;
    use crate::model::{
        ApplicationId, ApplicationInfo, ApplicationName, HostInfo, InstanceName, PortInfo,
        ServiceInfo, StaticApplicationModel, TenantName,
    };
    use crate::resolver::ConfigKey;
    use serde_json::{Value, json};

    const LONG: Duration = Duration::from_secs(10);

    fn sentinel_key() -> ConfigDefinitionKey {
        ConfigDefinitionKey::new("sentinel", "cloud.config")
    }

    fn app_id(tenant: &str, application: &str) -> ApplicationId {
        ApplicationId::new(
            TenantName::new(tenant).unwrap(),
            ApplicationName::new(application).unwrap(),
            InstanceName::default_name(),
        )
    }

    fn hosts(hostname: &str, config_id: &str) -> Vec<HostInfo> {
        vec![HostInfo {
            hostname: hostname.to_string(),
            services: vec![ServiceInfo {
                name: String::from("qrserver"),
                service_type: String::from("qrserver"),
                config_id: config_id.to_string(),
                ports: vec![PortInfo {
                    number: 4080,
                    tags: vec![String::from("http")],
                }],
            }],
        }]
    }

    fn deploy(
        registry: &SuperModel,
        tenant: &str,
        application: &str,
        generation: u64,
        sentinel: Option<Value>,
    ) {
        let id = app_id(tenant, application);
        let tenant = id.tenant().clone();
        let hostname = format!("{application}.example.com");
        let config_id = format!("{application}/container.0");
        let mut model = StaticApplicationModel::new(hosts(&hostname, &config_id)).unwrap();
        if let Some(payload) = sentinel {
            model = model.with_config(config_id, sentinel_key(), payload);
        }
        registry
            .put(&tenant, ApplicationInfo::new(id, generation, Arc::new(model)))
            .unwrap();
    }

    fn sentinel(name: &str) -> Value {
        json!({ "service": [{ "name": name, "command": name }] })
    }

    fn setup() -> (Arc<SuperModel>, ConfigResolver) {
        let registry = Arc::new(SuperModel::new());
        let resolver = ConfigResolver::new(
            Arc::new(ConfigDefinitionCatalog::builtin()),
            Arc::clone(&registry),
            &ServerConfig::default(),
        );
        (registry, resolver)
    }

    fn lb_request() -> RequestContext {
        RequestContext::new(ConfigKey::new("*", LbServicesSchema::definition_key()))
    }

    fn sentinel_request(application: &str) -> RequestContext {
        RequestContext::new(ConfigKey::new(format!("{application}/container.0"), sentinel_key()))
    }

    #[tokio::test]
    async fn test_unknown_schema() {
        let (registry, resolver) = setup();
        deploy(&registry, "a", "foo", 1, None);

        let key = ConfigKey::new("foo/container.0", ConfigDefinitionKey::new("bar", "foo"));
        let request = RequestContext::new(key);
        let err = resolver.resolve(&request, &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownSchema);
    }

    #[tokio::test]
    async fn test_schema_mismatch() {
        let (_registry, resolver) = setup();
        let request = lb_request().with_definition_checksum("0000");
        let err = resolver.resolve(&request, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ResolveError::SchemaMismatch { .. }));
    }

    #[tokio::test]
    async fn test_lb_services_on_empty_registry() {
        let (_registry, resolver) = setup();
        let cancel = CancellationToken::new();
        let resolution = tokio_test::assert_ok!(resolver.resolve(&lb_request(), &cancel).await);

        let fresh = resolution.fresh().unwrap();
        assert_eq!(fresh.generation, 0);
        let config: LbServicesConfig =
            serde_json::from_slice(&fresh.payload.decode().unwrap()).unwrap();
        assert!(config.tenants.is_empty());
    }

    #[tokio::test]
    async fn test_checksum_is_deterministic() {
        let (registry, resolver) = setup();
        deploy(&registry, "t1", "mysimpleapp", 1, None);
        deploy(&registry, "t2", "myadvancedapp", 1, None);

        let cancel = CancellationToken::new();
        let first = resolver.resolve(&lb_request(), &cancel).await.unwrap();
        let second = resolver.resolve(&lb_request(), &cancel).await.unwrap();
        assert_eq!(first.checksum(), second.checksum());
        assert_eq!(
            first.fresh().unwrap().payload.bytes,
            second.fresh().unwrap().payload.bytes
        );
    }

    #[tokio::test]
    async fn test_stale_checksum_returns_immediately() {
        let (registry, resolver) = setup();
        deploy(&registry, "a", "foo", 1, None);

        let request = lb_request().with_last_seen("stale", 0).with_timeout(LONG);
        let resolution = tokio::time::timeout(
            Duration::from_secs(2),
            resolver.resolve(&request, &CancellationToken::new()),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(!resolution.is_unchanged());
    }

    #[tokio::test]
    async fn test_current_checksum_waits_for_timeout() {
        let (registry, resolver) = setup();
        deploy(&registry, "a", "foo", 1, None);
        let cancel = CancellationToken::new();
        let current = resolver.resolve(&lb_request(), &cancel).await.unwrap();

        let timeout = Duration::from_millis(150);
        let request = lb_request()
            .with_last_seen(current.checksum(), current.generation())
            .with_timeout(timeout);
        let started = std::time::Instant::now();
        let resolution = resolver.resolve(&request, &cancel).await.unwrap();

        assert!(started.elapsed() >= timeout);
        assert!(resolution.is_unchanged());
        assert_eq!(resolution.checksum(), current.checksum());
    }

    #[tokio::test]
    async fn test_zero_timeout_answers_unchanged_at_once() {
        let (_registry, resolver) = setup();
        let cancel = CancellationToken::new();
        let current = resolver.resolve(&lb_request(), &cancel).await.unwrap();

        let request = lb_request().with_last_seen(current.checksum(), 0);
        let resolution = resolver.resolve(&request, &cancel).await.unwrap();
        assert!(resolution.is_unchanged());
    }

    #[tokio::test]
    async fn test_redeploy_wakes_waiter() {
        let (registry, resolver) = setup();
        deploy(&registry, "a", "foo", 1, None);
        let cancel = CancellationToken::new();
        let current = resolver.resolve(&lb_request(), &cancel).await.unwrap();

        let writer = Arc::clone(&registry);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            deploy(&writer, "b", "bar", 1, None);
        });

        let request = lb_request()
            .with_last_seen(current.checksum(), current.generation())
            .with_timeout(LONG);
        let resolution = tokio::time::timeout(
            Duration::from_secs(5),
            resolver.resolve(&request, &cancel),
        )
        .await
        .unwrap()
        .unwrap();
        handle.await.unwrap();

        let fresh = resolution.fresh().unwrap();
        assert_ne!(fresh.checksum, current.checksum());
        assert_eq!(fresh.generation, 2);
    }

    #[tokio::test]
    async fn test_unrelated_change_does_not_wake_waiter() {
        let (registry, resolver) = setup();
        deploy(&registry, "a", "foo", 1, Some(sentinel("logd")));
        let cancel = CancellationToken::new();
        let current = resolver.resolve(&sentinel_request("foo"), &cancel).await.unwrap();

        let writer = Arc::clone(&registry);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            deploy(&writer, "b", "bar", 1, Some(sentinel("slobrok")));
        });

        let timeout = Duration::from_millis(250);
        let request = sentinel_request("foo")
            .with_last_seen(current.checksum(), current.generation())
            .with_timeout(timeout);
        let started = std::time::Instant::now();
        let resolution = resolver.resolve(&request, &cancel).await.unwrap();
        handle.await.unwrap();

        assert!(started.elapsed() >= timeout);
        assert!(resolution.is_unchanged());
        assert_eq!(resolution.generation(), 2);
    }

    #[tokio::test]
    async fn test_owner_removed_while_waiting() {
        let (registry, resolver) = setup();
        deploy(&registry, "a", "foo", 1, Some(sentinel("logd")));
        let cancel = CancellationToken::new();
        let current = resolver.resolve(&sentinel_request("foo"), &cancel).await.unwrap();

        let writer = Arc::clone(&registry);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let id = app_id("a", "foo");
            assert!(writer.remove(id.tenant(), &id).unwrap());
        });

        let request = sentinel_request("foo")
            .with_last_seen(current.checksum(), current.generation())
            .with_timeout(LONG);
        let err = tokio::time::timeout(
            Duration::from_secs(5),
            resolver.resolve(&request, &cancel),
        )
        .await
        .unwrap()
        .unwrap_err();
        handle.await.unwrap();
        assert_eq!(err.kind(), ErrorKind::NoSuchConfigId);
    }

    #[tokio::test]
    async fn test_cancelled_while_waiting() {
        let (_registry, resolver) = setup();
        let cancel = CancellationToken::new();
        let current = resolver.resolve(&lb_request(), &cancel).await.unwrap();

        let trigger = cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let request = lb_request()
            .with_last_seen(current.checksum(), current.generation())
            .with_timeout(LONG);
        let err = tokio::time::timeout(
            Duration::from_secs(5),
            resolver.resolve(&request, &cancel),
        )
        .await
        .unwrap()
        .unwrap_err();
        handle.await.unwrap();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_compression_does_not_change_checksum() {
        let (registry, resolver) = setup();
        deploy(&registry, "t1", "mysimpleapp", 1, None);
        let cancel = CancellationToken::new();

        let plain = resolver.resolve(&lb_request(), &cancel).await.unwrap();
        let brotli = resolver
            .resolve(&lb_request().with_compression("brotli"), &cancel)
            .await
            .unwrap();

        let plain = plain.fresh().unwrap();
        let brotli = brotli.fresh().unwrap();
        assert_eq!(plain.compression(), CompressionType::Uncompressed);
        assert_eq!(brotli.compression(), CompressionType::Brotli);
        assert_eq!(plain.checksum, brotli.checksum);
        assert_eq!(plain.payload.decode().unwrap(), brotli.payload.decode().unwrap());
    }

    #[tokio::test]
    async fn test_explicit_payload_and_schema_defaults() {
        let (registry, resolver) = setup();
        deploy(&registry, "a", "foo", 1, Some(sentinel("logd")));
        deploy(&registry, "a", "bar", 1, None);
        let cancel = CancellationToken::new();

        let explicit = resolver.resolve(&sentinel_request("foo"), &cancel).await.unwrap();
        let bytes = explicit.fresh().unwrap().payload.decode().unwrap();
        let payload: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(payload["service"][0]["name"], "logd");

        let defaulted = resolver.resolve(&sentinel_request("bar"), &cancel).await.unwrap();
        let bytes = defaulted.fresh().unwrap().payload.decode().unwrap();
        let payload: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(payload, json!({ "service": [] }));
    }

    #[tokio::test]
    async fn test_unknown_config_id() {
        let (registry, resolver) = setup();
        deploy(&registry, "a", "foo", 1, None);

        let request = RequestContext::new(ConfigKey::new("nobody/container.0", sentinel_key()));
        let cancel = CancellationToken::new();
        let err = tokio_test::assert_err!(resolver.resolve(&request, &cancel).await);
        assert_eq!(err.kind(), ErrorKind::NoSuchConfigId);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unclaimed_config_id_from_known_host() {
        let (registry, resolver) = setup();
        deploy(&registry, "a", "foo", 1, None);

        let request = RequestContext::new(ConfigKey::new("nobody/claims.this", sentinel_key()))
            .with_client_hostname("foo.example.com");
        let cancel = CancellationToken::new();
        let err = tokio_test::assert_err!(resolver.resolve(&request, &cancel).await);
        assert_eq!(err.kind(), ErrorKind::NoSuchConfigId);

        let claimed = sentinel_request("foo").with_client_hostname("foo.example.com");
        tokio_test::assert_ok!(resolver.resolve(&claimed, &cancel).await);
    }

    #[tokio::test]
    async fn test_trace_collected_when_requested() {
        let (_registry, resolver) = setup();
        let cancel = CancellationToken::new();

        let silent = resolver.resolve(&lb_request(), &cancel).await.unwrap();
        assert!(silent.trace().entries().is_empty());

        let traced = resolver
            .resolve(&lb_request().with_trace_level(2), &cancel)
            .await
            .unwrap();
        assert!(traced.trace().entries().len() >= 2);
    }

    #[tokio::test]
    async fn test_timeout_clamped_to_maximum() {
        let registry = Arc::new(SuperModel::new());
        let mut config = ServerConfig::default();
        config.long_poll.max_timeout_ms = 50;
        let resolver = ConfigResolver::new(
            Arc::new(ConfigDefinitionCatalog::builtin()),
            Arc::clone(&registry),
            &config,
        );
        let cancel = CancellationToken::new();
        let current = resolver.resolve(&lb_request(), &cancel).await.unwrap();

        let request = lb_request().with_last_seen(current.checksum(), 0).with_timeout(LONG);
        let resolution = tokio::time::timeout(
            Duration::from_secs(2),
            resolver.resolve(&request, &cancel),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(resolution.is_unchanged());
    }
}
