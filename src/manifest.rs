// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Declarative bootstrap manifest.
//!
//! Lets an application describe all of its features and slices in one JSON
//! document and register them in a single call at startup.
//!
//! ```
//! use slice_lifecycle::SliceManifest;
//!
//! let manifest = SliceManifest::from_json_str(r#"{
//!     "features": [
//!         { "name": "blogDemo", "routes": ["^/blog($|/)"], "slices": ["posts"] }
//!     ],
//!     "slices": [
//!         { "name": "posts", "feature": "blogDemo", "cleanup_strategy": "cached",
//!           "cache_timeout": 600000, "cleanup_reducer_name": "cleanup" }
//!     ]
//! }"#).unwrap();
//!
//! let (features, slices) = manifest.compile().unwrap();
//! assert_eq!(features.len(), 1);
//! assert_eq!(slices[0].name, "posts");
//! ```

use serde::Deserialize;

use crate::slice::{compile_route, ConfigError, FeatureRouteConfig, SliceConfig};

/// A feature as written in a manifest (patterns not yet compiled).
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureManifest {
    pub name: String,
    #[serde(default)]
    pub routes: Vec<String>,
    #[serde(default)]
    pub slices: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SliceManifest {
    #[serde(default)]
    pub features: Vec<FeatureManifest>,
    #[serde(default)]
    pub slices: Vec<SliceConfig>,
}

impl SliceManifest {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Compile route patterns. Fails on the first invalid pattern.
    pub fn compile(&self) -> Result<(Vec<FeatureRouteConfig>, Vec<SliceConfig>), ConfigError> {
        let mut features = Vec::with_capacity(self.features.len());
        for feature in &self.features {
            let routes = feature
                .routes
                .iter()
                .map(|p| compile_route(&feature.name, p))
                .collect::<Result<Vec<_>, _>>()?;
            features.push(FeatureRouteConfig::from_regexes(
                feature.name.clone(),
                routes,
                feature.slices.clone(),
            ));
        }
        Ok((features, self.slices.clone()))
    }
}
