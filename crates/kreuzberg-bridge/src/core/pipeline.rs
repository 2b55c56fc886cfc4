//! Post-processing pipeline orchestration.
//!
//! Post-processors run first, stage by stage, and are error tolerant. Validators
//! run last over the finished result and are fail-fast.

use crate::Result;
use crate::core::config::ExtractionConfig;
use crate::plugins::PluginRegistry;
use crate::types::ExtractionResult;

/// Run post-processors and then validators against `result`.
///
/// # Errors
///
/// Returns the first validator error. Post-processor errors never surface here;
/// they are recorded under `metadata["<name>_error"]`.
#[tracing::instrument(skip_all, fields(mime_type = %result.mime_type))]
pub async fn run_pipeline(
    mut result: ExtractionResult,
    config: &ExtractionConfig,
    registry: &PluginRegistry,
) -> Result<ExtractionResult> {
    run_post_processors(&mut result, config, registry).await;
    run_validators(&result, config, registry).await?;
    Ok(result)
}

/// Run every enabled post-processor in stage order.
///
/// A failing processor leaves the result exactly as it was before it ran, plus
/// an error entry in metadata.
pub async fn run_post_processors(result: &mut ExtractionResult, config: &ExtractionConfig, registry: &PluginRegistry) {
    let pp_config = config.postprocessor.as_ref();
    if !pp_config.is_none_or(|c| c.enabled) {
        tracing::debug!("Post-processing disabled by configuration");
        return;
    }

    let entries: Vec<_> = registry
        .post_processors_in_order()
        .into_iter()
        .filter(|entry| pp_config.is_none_or(|c| c.is_processor_enabled(&entry.name)))
        .collect();

    tracing::debug!(
        order = ?entries.iter().map(|e| format!("{}:{}", e.stage, e.name)).collect::<Vec<_>>(),
        "Running post-processors"
    );

    for entry in entries {
        if !entry.processor.should_process(result, config) {
            continue;
        }

        let before = result.clone();
        if let Err(e) = entry.processor.process(result, config).await {
            tracing::warn!(processor = %entry.name, stage = %entry.stage, error = %e, "Post-processor failed");
            *result = before;
            result
                .metadata
                .insert(format!("{}_error", entry.name), serde_json::Value::String(e.to_string()));
        }
    }
}

/// Run validators by descending priority; the first failure is returned.
pub async fn run_validators(result: &ExtractionResult, config: &ExtractionConfig, registry: &PluginRegistry) -> Result<()> {
    for entry in registry.validators_in_order() {
        if !entry.validator.should_validate(result, config) {
            continue;
        }

        if let Err(e) = entry.validator.validate(result, config).await {
            tracing::debug!(validator = %entry.name, priority = entry.priority, error = %e, "Validation failed");
            return Err(e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PostProcessorConfig;
    use crate::plugins::{Plugin, PostProcessor, ProcessingStage, Validator};
    use crate::{KreuzbergError, Result};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct Recorder {
        name: String,
        stage: ProcessingStage,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl Plugin for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn version(&self) -> String {
            "1.0.0".to_string()
        }
    }

    #[async_trait]
    impl PostProcessor for Recorder {
        async fn process(&self, result: &mut ExtractionResult, _config: &ExtractionConfig) -> Result<()> {
            self.log.lock().push(self.name.clone());
            result.content.push_str(&format!("[{}]", self.name));
            if self.fail {
                result.metadata.insert("partial_write", true);
                return Err(KreuzbergError::processor(&self.name, "intentional failure"));
            }
            result.metadata.insert(format!("{}_ran", self.name), true);
            Ok(())
        }

        fn processing_stage(&self) -> ProcessingStage {
            self.stage
        }
    }

    fn recorder(name: &str, stage: ProcessingStage, log: &Arc<Mutex<Vec<String>>>) -> Recorder {
        Recorder {
            name: name.to_string(),
            stage,
            log: Arc::clone(log),
            fail: false,
        }
    }

    struct Check {
        name: &'static str,
        priority: i32,
        fail: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Plugin for Check {
        fn name(&self) -> &str {
            self.name
        }

        fn version(&self) -> String {
            "1.0.0".to_string()
        }
    }

    #[async_trait]
    impl Validator for Check {
        async fn validate(&self, _result: &ExtractionResult, _config: &ExtractionConfig) -> Result<()> {
            self.log.lock().push(self.name.to_string());
            if self.fail {
                return Err(KreuzbergError::validation(format!("{} rejected", self.name)));
            }
            Ok(())
        }

        fn priority(&self) -> i32 {
            self.priority
        }
    }

    #[tokio::test]
    async fn test_stage_ordering() {
        let registry = PluginRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry
            .register_post_processor(Arc::new(recorder("late", ProcessingStage::Late, &log)))
            .unwrap();
        registry
            .register_post_processor(Arc::new(recorder("middle", ProcessingStage::Middle, &log)))
            .unwrap();
        registry
            .register_post_processor(Arc::new(recorder("early", ProcessingStage::Early, &log)))
            .unwrap();

        let result = run_pipeline(
            ExtractionResult::new("doc", "text/plain"),
            &ExtractionConfig::default(),
            &registry,
        )
        .await
        .unwrap();

        assert_eq!(*log.lock(), vec!["early", "middle", "late"]);
        assert_eq!(result.content, "doc[early][middle][late]");
    }

    #[tokio::test]
    async fn test_failed_processor_is_rolled_back_and_recorded() {
        let registry = PluginRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut failing = recorder("failing", ProcessingStage::Early, &log);
        failing.fail = true;
        registry.register_post_processor(Arc::new(failing)).unwrap();
        registry
            .register_post_processor(Arc::new(recorder("after", ProcessingStage::Late, &log)))
            .unwrap();

        let result = run_pipeline(
            ExtractionResult::new("doc", "text/plain"),
            &ExtractionConfig::default(),
            &registry,
        )
        .await
        .unwrap();

        assert_eq!(result.content, "doc[after]");
        assert!(!result.metadata.contains_key("partial_write"));
        assert_eq!(
            result.metadata.get("failing_error"),
            Some(&serde_json::json!(
                "Post-processor error in 'failing': intentional failure"
            ))
        );
        assert_eq!(result.metadata.get("after_ran"), Some(&serde_json::json!(true)));
    }

    #[tokio::test]
    async fn test_disabled_pipeline_skips_processors() {
        let registry = PluginRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry
            .register_post_processor(Arc::new(recorder("p", ProcessingStage::Middle, &log)))
            .unwrap();

        let config = ExtractionConfig {
            postprocessor: Some(PostProcessorConfig {
                enabled: false,
                ..Default::default()
            }),
            ..Default::default()
        };
        let result = run_pipeline(ExtractionResult::new("doc", "text/plain"), &config, &registry)
            .await
            .unwrap();

        assert!(log.lock().is_empty());
        assert_eq!(result.content, "doc");
    }

    #[tokio::test]
    async fn test_filters_applied_before_ordering() {
        let registry = PluginRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for (name, stage) in [
            ("a", ProcessingStage::Late),
            ("b", ProcessingStage::Early),
            ("c", ProcessingStage::Middle),
        ] {
            registry
                .register_post_processor(Arc::new(recorder(name, stage, &log)))
                .unwrap();
        }

        let config = ExtractionConfig {
            postprocessor: Some(PostProcessorConfig {
                enabled: true,
                enabled_processors: Some(vec!["a".to_string(), "b".to_string()]),
                disabled_processors: Some(vec!["a".to_string()]),
            }),
            ..Default::default()
        };
        run_pipeline(ExtractionResult::new("doc", "text/plain"), &config, &registry)
            .await
            .unwrap();

        assert_eq!(*log.lock(), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_validators_fail_fast_in_priority_order() {
        let registry = PluginRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry
            .register_validator(Arc::new(Check {
                name: "low",
                priority: 50,
                fail: false,
                log: Arc::clone(&log),
            }))
            .unwrap();
        registry
            .register_validator(Arc::new(Check {
                name: "high",
                priority: 100,
                fail: true,
                log: Arc::clone(&log),
            }))
            .unwrap();

        let err = run_pipeline(
            ExtractionResult::new("doc", "text/plain"),
            &ExtractionConfig::default(),
            &registry,
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "Validation error: high rejected");
        assert_eq!(*log.lock(), vec!["high"]);
    }

    #[tokio::test]
    async fn test_validators_see_processed_result() {
        struct NeedsWordCount;

        impl Plugin for NeedsWordCount {
            fn name(&self) -> &str {
                "needs-word-count"
            }

            fn version(&self) -> String {
                "1.0.0".to_string()
            }
        }

        #[async_trait]
        impl Validator for NeedsWordCount {
            async fn validate(&self, result: &ExtractionResult, _config: &ExtractionConfig) -> Result<()> {
                if result.metadata.contains_key("p_ran") {
                    Ok(())
                } else {
                    Err(KreuzbergError::validation("post-processing did not run"))
                }
            }
        }

        let registry = PluginRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry
            .register_post_processor(Arc::new(recorder("p", ProcessingStage::Middle, &log)))
            .unwrap();
        registry.register_validator(Arc::new(NeedsWordCount)).unwrap();

        assert!(
            run_pipeline(
                ExtractionResult::new("doc", "text/plain"),
                &ExtractionConfig::default(),
                &registry
            )
            .await
            .is_ok()
        );
    }
}
