use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;


// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the process-wide `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Dispatcher metrics
    pub upstream_requests: IntCounterVec,
    pub upstream_retries: IntCounterVec,
    pub upstream_duration: HistogramVec,

    // Token metrics
    pub token_exchanges: IntCounterVec,
    pub token_invalidations: IntCounter,

    // Cache metrics
    pub cache_lookups: IntCounterVec,
    pub cache_population_failures: IntCounterVec,

    // Config/runtime
    pub parse_failures: IntCounter,
    pub config_validation_errors: IntCounter,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("upstream_facade".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Dispatcher
            upstream_requests: IntCounterVec::new(Opts::new("upstream_requests_total", "Upstream requests by outcome"),&["method", "outcome"],).unwrap(),
            upstream_retries: IntCounterVec::new(Opts::new("upstream_retries_total", "Upstream retries by reason"),&["reason"],).unwrap(),
            upstream_duration: HistogramVec::new(HistogramOpts::new("upstream_request_duration_seconds", "Dispatch duration seconds, retries included").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),&["method"],).unwrap(),

            // Token
            token_exchanges: IntCounterVec::new(Opts::new("token_exchanges_total", "Client-credentials exchanges by outcome"),&["outcome"],).unwrap(),
            token_invalidations: IntCounter::new("token_invalidations_total", "Cached credential invalidations").unwrap(),

            // Cache
            cache_lookups: IntCounterVec::new(Opts::new("cache_lookups_total", "Metadata cache lookups"),&["key", "result"],).unwrap(),
            cache_population_failures: IntCounterVec::new(Opts::new("cache_population_failures_total", "Failed metadata cache populations"),&["key"],).unwrap(),

            // Config/runtime
            parse_failures: IntCounter::new("config_parse_failures_total","Config parse failures",).unwrap(),
            config_validation_errors: IntCounter::new("config_validation_errors_total","Validation errors during startup",).unwrap(),
            up: IntGauge::new("up", "1 if service is healthy").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.upstream_requests.clone())).unwrap();
        reg.register(Box::new(metrics.upstream_retries.clone())).unwrap();
        reg.register(Box::new(metrics.upstream_duration.clone())).unwrap();
        reg.register(Box::new(metrics.token_exchanges.clone())).unwrap();
        reg.register(Box::new(metrics.token_invalidations.clone())).unwrap();
        reg.register(Box::new(metrics.cache_lookups.clone())).unwrap();
        reg.register(Box::new(metrics.cache_population_failures.clone())).unwrap();
        reg.register(Box::new(metrics.parse_failures.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
