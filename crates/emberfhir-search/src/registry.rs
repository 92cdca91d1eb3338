//! Search parameter registry for indexing and lookup.
//!
//! This module provides a registry that stores search parameter definitions
//! indexed by:
//! - Resource type and code (for efficient lookup)
//! - Canonical URL (for resolving composite components)
//! - Common parameters (applicable to all resources)
//!
//! Uses DashMap for lock-free concurrent access, allowing incremental updates
//! without blocking readers.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::parameters::{SearchParameterDefinition, SearchParameterType};

/// Read access to the search parameter catalogue, as consumed by the
/// indexer. Backends that populate lazily suspend here; the in-process
/// registry answers from its maps.
#[async_trait]
pub trait SearchParameterCatalogue: Send + Sync {
    /// All definitions applicable to a resource type: the common
    /// (Resource-based) set merged with the concrete type's set, concrete
    /// codes shadowing common ones.
    async fn by_resource_type(&self, resource_type: &str)
    -> Vec<Arc<SearchParameterDefinition>>;

    /// Resolve a definition by its canonical URL.
    async fn by_url(&self, url: &str) -> Option<Arc<SearchParameterDefinition>>;
}

/// Registry for search parameter definitions loaded from FHIR packages.
///
/// Provides efficient lookup by resource type, code, and canonical URL.
/// Also tracks common parameters that apply to all resources.
///
/// Thread-safe with lock-free reads using DashMap.
#[derive(Debug, Default)]
pub struct SearchParameterRegistry {
    /// Definitions indexed by (resource_type, code) as composite key
    by_resource: DashMap<(String, String), Arc<SearchParameterDefinition>>,
    /// All definitions by canonical URL
    by_url: DashMap<String, Arc<SearchParameterDefinition>>,
    /// Common definitions (base includes "Resource" or "DomainResource")
    common: DashMap<String, Arc<SearchParameterDefinition>>,
}

impl SearchParameterRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            by_resource: DashMap::new(),
            by_url: DashMap::new(),
            common: DashMap::new(),
        }
    }

    /// Register a search parameter definition in the registry.
    ///
    /// The definition will be indexed by:
    /// - Canonical URL
    /// - Each base resource type + code
    /// - Common parameters if base includes "Resource" or "DomainResource"
    ///
    /// Thread-safe - can be called concurrently from multiple threads.
    pub fn register(&self, definition: SearchParameterDefinition) {
        let definition = definition.into_arc();

        // Store by URL
        self.by_url
            .insert(definition.url.clone(), definition.clone());

        // Check if common parameter (base includes "Resource" or "DomainResource")
        if definition.is_common() {
            self.common
                .insert(definition.code.clone(), definition.clone());
        }

        // Store by resource type with composite key (resource_type, code)
        for base in &definition.base {
            self.by_resource
                .insert((base.clone(), definition.code.clone()), definition.clone());
        }
    }

    /// Remove a definition by its canonical URL (thread-safe).
    ///
    /// Returns true if the definition was found and removed.
    pub fn remove_by_url(&self, url: &str) -> bool {
        if let Some((_, definition)) = self.by_url.remove(url) {
            for base in &definition.base {
                if base == "Resource" || base == "DomainResource" {
                    self.common.remove(&definition.code);
                } else {
                    self.by_resource
                        .remove(&(base.clone(), definition.code.clone()));
                }
            }
            true
        } else {
            false
        }
    }

    /// Get a definition for a specific resource type and code.
    ///
    /// First checks resource-specific definitions, then falls back to common
    /// definitions.
    pub fn get(&self, resource_type: &str, code: &str) -> Option<Arc<SearchParameterDefinition>> {
        // Check resource-specific first with composite key
        let key = (resource_type.to_string(), code.to_string());
        if let Some(definition) = self.by_resource.get(&key) {
            return Some(definition.clone());
        }

        // Check common parameters
        self.common.get(code).map(|d| d.clone())
    }

    /// All definitions applicable to a resource type, merged.
    ///
    /// Starts from the common set and overlays the concrete type's set, so
    /// a concrete definition shadows a common one with the same code. The
    /// result is sorted by code for deterministic iteration.
    pub fn definitions_for_type(&self, resource_type: &str) -> Vec<Arc<SearchParameterDefinition>> {
        let mut merged: BTreeMap<String, Arc<SearchParameterDefinition>> = self
            .common
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        for entry in self.by_resource.iter() {
            if entry.key().0 == resource_type {
                merged.insert(entry.key().1.clone(), entry.value().clone());
            }
        }

        merged.into_values().collect()
    }

    /// Every Reference-typed definition on a resource type, used for
    /// wildcard `_include` expansion.
    pub fn reference_definitions_for_type(
        &self,
        resource_type: &str,
    ) -> Vec<Arc<SearchParameterDefinition>> {
        self.definitions_for_type(resource_type)
            .into_iter()
            .filter(|d| d.param_type == SearchParameterType::Reference)
            .collect()
    }

    /// Get a definition by its canonical URL.
    pub fn get_by_url(&self, url: &str) -> Option<Arc<SearchParameterDefinition>> {
        self.by_url.get(url).map(|entry| entry.value().clone())
    }

    /// Get all common definitions (applicable to all resources).
    pub fn common_definitions(&self) -> Vec<Arc<SearchParameterDefinition>> {
        self.common
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Get the total number of registered definitions.
    pub fn len(&self) -> usize {
        self.by_url.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty()
    }
}

#[async_trait]
impl SearchParameterCatalogue for SearchParameterRegistry {
    async fn by_resource_type(
        &self,
        resource_type: &str,
    ) -> Vec<Arc<SearchParameterDefinition>> {
        self.definitions_for_type(resource_type)
    }

    async fn by_url(&self, url: &str) -> Option<Arc<SearchParameterDefinition>> {
        self.get_by_url(url)
    }
}
