//! Plugin registration and discovery.
//!
//! [`PluginRegistry`] owns every registered post-processor, validator and OCR
//! backend, keyed by name within each kind. Each kind sits behind its own lock.
//! Pipelines never execute plugins while holding a lock: they take a snapshot of
//! `Arc` handles and release the lock first.
//!
//! Hosts that cannot carry a registry handle across the FFI boundary use the
//! lazily-initialized [`global_registry`].

use crate::plugins::{OcrBackend, Plugin, PostProcessor, ProcessingStage, Validator};
use crate::{KreuzbergError, Result};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// The three plugin kinds the bridge knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginKind {
    PostProcessor,
    Validator,
    OcrBackend,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PluginKind::PostProcessor => "post-processor",
            PluginKind::Validator => "validator",
            PluginKind::OcrBackend => "OCR backend",
        })
    }
}

fn validate_plugin_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(KreuzbergError::InvalidName {
            name: name.to_string(),
            reason: "name cannot be empty or whitespace".to_string(),
        });
    }
    Ok(())
}

/// A registered post-processor with its stage read once at registration.
#[derive(Clone)]
pub struct PostProcessorEntry {
    pub name: String,
    pub stage: ProcessingStage,
    pub processor: Arc<dyn PostProcessor>,
}

/// A registered validator with its priority read once at registration.
#[derive(Clone)]
pub struct ValidatorEntry {
    pub name: String,
    pub priority: i32,
    pub validator: Arc<dyn Validator>,
}

#[derive(Clone)]
struct OcrBackendEntry {
    backend: Arc<dyn OcrBackend>,
    languages: Vec<String>,
}

trait Entry: Clone {
    fn plugin(&self) -> &dyn Plugin;
}

impl Entry for PostProcessorEntry {
    fn plugin(&self) -> &dyn Plugin {
        self.processor.as_ref()
    }
}

impl Entry for ValidatorEntry {
    fn plugin(&self) -> &dyn Plugin {
        self.validator.as_ref()
    }
}

impl Entry for OcrBackendEntry {
    fn plugin(&self) -> &dyn Plugin {
        self.backend.as_ref()
    }
}

/// Name-keyed entries of one plugin kind, in registration order.
struct Slot<E: Entry> {
    kind: PluginKind,
    entries: RwLock<IndexMap<String, E>>,
}

impl<E: Entry> Slot<E> {
    fn new(kind: PluginKind) -> Self {
        Self {
            kind,
            entries: RwLock::new(IndexMap::new()),
        }
    }

    fn duplicate(&self, name: &str) -> KreuzbergError {
        KreuzbergError::DuplicateName {
            kind: self.kind,
            name: name.to_string(),
        }
    }

    /// `initialize` runs without any lock held, so a plugin may call back into
    /// the registry from it. A concurrent registration of the same name that
    /// wins the race leaves this entry shut down and rejected.
    fn register(&self, name: &str, entry: E) -> Result<()> {
        validate_plugin_name(name)?;

        if self.entries.read().contains_key(name) {
            return Err(self.duplicate(name));
        }

        entry.plugin().initialize()?;

        let mut entries = self.entries.write();
        if entries.contains_key(name) {
            drop(entries);
            self.shutdown(name, &entry);
            return Err(self.duplicate(name));
        }
        entries.insert(name.to_string(), entry);
        tracing::debug!(kind = %self.kind, name, "Registered plugin");
        Ok(())
    }

    fn unregister(&self, name: &str) {
        let removed = self.entries.write().shift_remove(name);
        if let Some(entry) = removed {
            self.shutdown(name, &entry);
        }
    }

    fn clear(&self) {
        let drained: Vec<(String, E)> = self.entries.write().drain(..).collect();
        for (name, entry) in &drained {
            self.shutdown(name, entry);
        }
    }

    fn shutdown(&self, name: &str, entry: &E) {
        match entry.plugin().shutdown() {
            Ok(()) => tracing::debug!(kind = %self.kind, name, "Unregistered plugin"),
            Err(e) => tracing::warn!(kind = %self.kind, name, error = %e, "Plugin shutdown failed"),
        }
    }

    fn list(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    fn snapshot(&self) -> Vec<E> {
        self.entries.read().values().cloned().collect()
    }

    fn get(&self, name: &str) -> Option<E> {
        self.entries.read().get(name).cloned()
    }
}

/// Process-wide store of host plugins.
pub struct PluginRegistry {
    post_processors: Slot<PostProcessorEntry>,
    validators: Slot<ValidatorEntry>,
    ocr_backends: Slot<OcrBackendEntry>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            post_processors: Slot::new(PluginKind::PostProcessor),
            validators: Slot::new(PluginKind::Validator),
            ocr_backends: Slot::new(PluginKind::OcrBackend),
        }
    }

    pub fn register_post_processor(&self, processor: Arc<dyn PostProcessor>) -> Result<()> {
        let name = processor.name().to_string();
        let entry = PostProcessorEntry {
            name: name.clone(),
            stage: processor.processing_stage(),
            processor,
        };
        self.post_processors.register(&name, entry)
    }

    pub fn unregister_post_processor(&self, name: &str) {
        self.post_processors.unregister(name)
    }

    pub fn clear_post_processors(&self) {
        self.post_processors.clear()
    }

    pub fn list_post_processors(&self) -> Vec<String> {
        self.post_processors.list()
    }

    /// Post-processors in execution order: Early, Middle, Late, then
    /// registration order within a stage.
    pub fn post_processors_in_order(&self) -> Vec<PostProcessorEntry> {
        let mut entries = self.post_processors.snapshot();
        entries.sort_by_key(|entry| entry.stage);
        entries
    }

    pub fn register_validator(&self, validator: Arc<dyn Validator>) -> Result<()> {
        let name = validator.name().to_string();
        let entry = ValidatorEntry {
            name: name.clone(),
            priority: validator.priority(),
            validator,
        };
        self.validators.register(&name, entry)
    }

    pub fn unregister_validator(&self, name: &str) {
        self.validators.unregister(name)
    }

    pub fn clear_validators(&self) {
        self.validators.clear()
    }

    pub fn list_validators(&self) -> Vec<String> {
        self.validators.list()
    }

    /// Validators in execution order: highest priority first, registration
    /// order among equal priorities.
    pub fn validators_in_order(&self) -> Vec<ValidatorEntry> {
        let mut entries = self.validators.snapshot();
        entries.sort_by_key(|entry| std::cmp::Reverse(entry.priority));
        entries
    }

    /// Register an OCR backend. It must declare at least one supported language.
    pub fn register_ocr_backend(&self, backend: Arc<dyn OcrBackend>) -> Result<()> {
        let name = backend.name().to_string();
        validate_plugin_name(&name)?;

        let languages = backend.supported_languages();
        if languages.is_empty() {
            return Err(KreuzbergError::validation(format!(
                "OCR backend '{}' must declare at least one supported language",
                name
            )));
        }

        self.ocr_backends.register(&name, OcrBackendEntry { backend, languages })
    }

    pub fn unregister_ocr_backend(&self, name: &str) {
        self.ocr_backends.unregister(name)
    }

    pub fn clear_ocr_backends(&self) {
        self.ocr_backends.clear()
    }

    pub fn list_ocr_backends(&self) -> Vec<String> {
        self.ocr_backends.list()
    }

    pub fn get_ocr_backend(&self, name: &str) -> Result<Arc<dyn OcrBackend>> {
        self.ocr_backends
            .get(name)
            .map(|entry| entry.backend)
            .ok_or_else(|| KreuzbergError::NotRegistered {
                plugin_name: name.to_string(),
            })
    }

    /// First registered backend that declared `language`.
    pub fn get_ocr_backend_for_language(&self, language: &str) -> Result<Arc<dyn OcrBackend>> {
        self.ocr_backends
            .snapshot()
            .into_iter()
            .find(|entry| entry.languages.iter().any(|l| l.eq_ignore_ascii_case(language)))
            .map(|entry| entry.backend)
            .ok_or_else(|| KreuzbergError::ocr(format!("No OCR backend supports language '{}'", language)))
    }

    /// Remove every plugin of every kind, shutting each one down.
    pub fn reset(&self) {
        self.clear_post_processors();
        self.clear_validators();
        self.clear_ocr_backends();
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_REGISTRY: Lazy<Arc<PluginRegistry>> = Lazy::new(|| Arc::new(PluginRegistry::new()));

/// The process-wide registry used by FFI hosts and the free registration functions.
pub fn global_registry() -> Arc<PluginRegistry> {
    Arc::clone(&GLOBAL_REGISTRY)
}
