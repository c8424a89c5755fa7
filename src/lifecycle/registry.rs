//! Feature and slice registration.

use tracing::debug;

use crate::manifest::SliceManifest;
use crate::slice::{ConfigError, FeatureRouteConfig, SliceConfig};

use super::{SliceLifecycleManager, SliceRuntimeState};

impl SliceLifecycleManager {
    /// Register (or replace) a feature. Last write wins.
    pub fn register_feature(&self, config: FeatureRouteConfig) {
        debug!(feature = %config.name, slices = config.slices.len(), "Feature registered");
        self.shared.tables.lock().features.insert(config.name.clone(), config);
    }

    /// Register (or replace) a slice config.
    ///
    /// Runtime state is created only if absent, so re-registration never
    /// resets access time, pin, components or a pending timer.
    pub fn register_slice(&self, config: SliceConfig) {
        let now = self.now_millis();
        let mut tables = self.shared.tables.lock();
        debug!(
            slice = %config.name,
            feature = %config.feature,
            strategy = %config.cleanup_strategy,
            "Slice registered"
        );
        tables
            .states
            .entry(config.name.clone())
            .or_insert_with(|| SliceRuntimeState::new(now));
        tables.slices.insert(config.name.clone(), config);
        crate::metrics::set_tracked_slices(tables.states.len());
    }

    /// Compile and register every feature and slice in a manifest.
    ///
    /// Nothing is registered if any route pattern fails to compile.
    pub fn apply_manifest(&self, manifest: &SliceManifest) -> Result<(), ConfigError> {
        let (features, slices) = manifest.compile()?;
        for feature in features {
            self.register_feature(feature);
        }
        for slice in slices {
            self.register_slice(slice);
        }
        Ok(())
    }

    #[must_use]
    pub fn get_slice_config(&self, slice_name: &str) -> Option<SliceConfig> {
        self.shared.tables.lock().slices.get(slice_name).cloned()
    }

    #[must_use]
    pub fn get_feature_config(&self, feature_name: &str) -> Option<FeatureRouteConfig> {
        self.shared.tables.lock().features.get(feature_name).cloned()
    }
}
