//! Shared application state

use crate::config::ServerConfig;
use crate::monitoring::{HealthEvaluator, HealthMonitor, ResourceSampler};
use crate::store::AdminStore;
use ridehub_observability::{ApiMetricsCounter, Clock, SystemLogger};
use std::sync::Arc;

/// Handles shared by every request
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AdminStore>,
    pub api_metrics: Arc<ApiMetricsCounter>,
    pub logger: SystemLogger,
    pub evaluator: Arc<HealthEvaluator>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn AdminStore>,
        sampler: Arc<dyn ResourceSampler>,
        logger: SystemLogger,
        clock: Arc<dyn Clock>,
        config: ServerConfig,
    ) -> Self {
        let api_metrics = Arc::new(ApiMetricsCounter::new(clock.clone()));
        let evaluator = Arc::new(HealthEvaluator::new(
            store.clone(),
            api_metrics.clone(),
            sampler,
            config.health.thresholds.clone(),
            clock.clone(),
        ));

        Self {
            store,
            api_metrics,
            logger,
            evaluator,
            clock,
            config: Arc::new(config),
        }
    }

    pub fn health_monitor(&self) -> HealthMonitor {
        HealthMonitor::new(
            self.evaluator.clone(),
            self.logger.clone(),
            self.config.health.check_interval(),
        )
    }
}
