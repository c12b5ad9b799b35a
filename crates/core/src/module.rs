//! Module startup: resolve compatibility, load configuration, build the
//! tag vocabulary. A failure here is fatal; nothing can render without it.

use crate::extensions::{ModuleExtensions, SubmissionActionExtender, TemplateVariableProvider};
use crate::regimen::{load_standard_regimens, StandardRegimen};
use crate::registry::TagRegistry;
use formentry_compat::{Capabilities, CompatError};
use formentry_types::PlatformVersion;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Compat(#[from] CompatError),
    #[error("invalid standard regimen configuration: {0}")]
    RegimenConfig(#[from] serde_yaml::Error),
}

/// What the module runs against for its whole lifetime.
pub struct ModuleConfig {
    pub platform_version: PlatformVersion,
    /// YAML standard regimen definitions, when the deployment has any.
    pub standard_regimens_yaml: Option<String>,
    pub extensions: ModuleExtensions,
}

impl ModuleConfig {
    pub fn new(platform_version: PlatformVersion) -> Self {
        Self {
            platform_version,
            standard_regimens_yaml: None,
            extensions: ModuleExtensions::default(),
        }
    }
}

/// The resolved, immutable per-process state sessions are built from.
pub struct ModuleRuntime {
    pub capabilities: Arc<Capabilities>,
    pub registry: Arc<TagRegistry>,
    pub standard_regimens: Arc<Vec<StandardRegimen>>,
    pub submission_extenders: Vec<Arc<dyn SubmissionActionExtender>>,
    pub variable_providers: Vec<Arc<dyn TemplateVariableProvider>>,
}

impl ModuleRuntime {
    pub fn initialise(config: ModuleConfig) -> Result<Self, StartupError> {
        let capabilities = Arc::new(Capabilities::resolve(config.platform_version)?);
        let standard_regimens = Arc::new(match &config.standard_regimens_yaml {
            Some(yaml) => load_standard_regimens(yaml)?,
            None => Vec::new(),
        });
        let mut registry = TagRegistry::standard(standard_regimens.clone());
        for provider in &config.extensions.tag_handlers {
            provider.register(&mut registry);
        }
        tracing::info!(
            version = %config.platform_version,
            tags = registry.tag_names().len(),
            regimens = standard_regimens.len(),
            "form entry module initialised"
        );
        Ok(Self {
            capabilities,
            registry: registry.freeze(),
            standard_regimens,
            submission_extenders: config.extensions.submission_extenders,
            variable_providers: config.extensions.variable_providers,
        })
    }
}
