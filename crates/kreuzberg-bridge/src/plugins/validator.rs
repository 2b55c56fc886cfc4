//! Validator plugin trait.
//!
//! Validators check a fully post-processed result. The first failure aborts the
//! extraction and becomes its error.

use crate::Result;
use crate::core::config::ExtractionConfig;
use crate::plugins::Plugin;
use crate::plugins::registry::global_registry;
use crate::types::ExtractionResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Default validator priority.
pub const DEFAULT_PRIORITY: i32 = 50;

/// Trait for validator plugins.
///
/// Higher `priority` runs first; equal priorities run in registration order.
#[async_trait]
pub trait Validator: Plugin {
    async fn validate(&self, result: &ExtractionResult, config: &ExtractionConfig) -> Result<()>;

    fn should_validate(&self, _result: &ExtractionResult, _config: &ExtractionConfig) -> bool {
        true
    }

    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }
}

pub fn register_validator(validator: Arc<dyn Validator>) -> Result<()> {
    global_registry().register_validator(validator)
}

pub fn unregister_validator(name: &str) {
    global_registry().unregister_validator(name)
}

pub fn list_validators() -> Vec<String> {
    global_registry().list_validators()
}

pub fn clear_validators() {
    global_registry().clear_validators()
}
