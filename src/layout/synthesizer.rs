//! The layout synthesizer and its process-wide cache.
//!
//! [`LayoutSynthesizer`] turns `(descriptor, mode)` requests into shared [`GeneratedLayout`]s.
//! Each distinct canonical name is generated at most once and then served from the cache for
//! the rest of the process.
//!
//! # Thread Safety
//!
//! - Published layouts live in a lock-free `SkipMap`; cache hits take no lock at all
//! - Concurrent first requests for the same name serialize on a per-name mutex held in a
//!   `DashMap`; requests for different names never wait on each other
//! - Publication uses an atomic insert-if-absent, so even a duplicate generation could only
//!   ever adopt the first published layout
//! - Failed generations publish nothing; the per-name mutex is released either way
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use strata::layout::{FieldMode, LayoutSynthesizer, ModuleRegistry};
//!
//! let modules = ModuleRegistry::new();
//! let synthesizer = LayoutSynthesizer::new(&modules)?;
//!
//! let a = synthesizer.get_layout("OOI", FieldMode::DualField)?;
//! let b = synthesizer.find_layout("strata.structures.Dual$OOI")?;
//! assert!(Arc::ptr_eq(&a, &b));
//!
//! let c = synthesizer.get_layout("OOI", FieldMode::SingleField)?;
//! assert!(!Arc::ptr_eq(&a, &c));
//! # Ok::<(), strata::Error>(())
//! ```

use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use rayon::prelude::*;

use crate::{
    config::LayoutConfig,
    layout::{
        generator::LayoutGenerator,
        mode::FieldMode,
        namespace::{ModuleSystem, TrustBoundary},
        structure::GeneratedLayout,
    },
    Error, Result,
};

/// A fallback source consulted for names that are not structure layouts.
pub trait LayoutSource: Send + Sync {
    /// Resolves `name`, or returns `None` if this source does not know it.
    fn find(&self, name: &str) -> Option<Arc<GeneratedLayout>>;
}

impl<F> LayoutSource for F
where
    F: Fn(&str) -> Option<Arc<GeneratedLayout>> + Send + Sync,
{
    fn find(&self, name: &str) -> Option<Arc<GeneratedLayout>> {
        self(name)
    }
}

/// Generates, deduplicates and serves structure layouts.
pub struct LayoutSynthesizer {
    boundary: TrustBoundary,
    dual: LayoutGenerator,
    single: LayoutGenerator,
    default_mode: FieldMode,
    /// Published layouts by canonical name; append-only
    layouts: SkipMap<String, Arc<GeneratedLayout>>,
    /// Per-name generation locks for names not yet published
    in_flight: DashMap<String, Arc<Mutex<()>>>,
    fallbacks: Vec<Box<dyn LayoutSource>>,
    generated: AtomicUsize,
}

impl LayoutSynthesizer {
    /// Creates a synthesizer with the default [`LayoutConfig`].
    ///
    /// Establishes the [`TrustBoundary`] through `modules`; this is the only time the module
    /// system is touched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NamespaceError`] if the structures namespace cannot be declared or
    /// bridged to the runtime.
    pub fn new(modules: &dyn ModuleSystem) -> Result<Self> {
        Self::with_config(modules, &LayoutConfig::default())
    }

    /// Creates a synthesizer with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NamespaceError`] if the trust boundary cannot be established.
    pub fn with_config(modules: &dyn ModuleSystem, config: &LayoutConfig) -> Result<Self> {
        let boundary = TrustBoundary::establish(modules)?;
        log::debug!(
            "layout synthesizer ready in {} (default mode {}, max {} fields)",
            boundary.namespace(),
            config.default_mode,
            config.max_fields
        );

        Ok(LayoutSynthesizer {
            boundary,
            dual: LayoutGenerator::new(FieldMode::DualField).with_max_fields(config.max_fields),
            single: LayoutGenerator::new(FieldMode::SingleField)
                .with_max_fields(config.max_fields),
            default_mode: config.default_mode,
            layouts: SkipMap::new(),
            in_flight: DashMap::new(),
            fallbacks: Vec::new(),
            generated: AtomicUsize::new(0),
        })
    }

    /// Adds a fallback source for names that are not structure layouts.
    ///
    /// Sources are consulted in the order they were added.
    #[must_use]
    pub fn with_fallback(mut self, source: impl LayoutSource + 'static) -> Self {
        self.fallbacks.push(Box::new(source));
        self
    }

    /// Returns the layout for `descriptor` in `mode`, generating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LayoutGeneration`] if the descriptor is malformed, or
    /// [`Error::LockError`] if the per-name lock was poisoned.
    pub fn get_layout(&self, descriptor: &str, mode: FieldMode) -> Result<Arc<GeneratedLayout>> {
        let name = mode.canonical_name(descriptor);
        self.resolve(mode, &name, descriptor).map(|(layout, _)| layout)
    }

    /// Returns the layout for `descriptor` in the configured default mode.
    ///
    /// # Errors
    ///
    /// Same as [`LayoutSynthesizer::get_layout`].
    pub fn get_default_layout(&self, descriptor: &str) -> Result<Arc<GeneratedLayout>> {
        self.get_layout(descriptor, self.default_mode)
    }

    /// Resolves a layout by canonical name.
    ///
    /// Names carrying the dual- or single-field prefix are routed to generation. Any other
    /// name falls through to the fallback sources.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LayoutGeneration`] for a structure name with a malformed descriptor and
    /// [`Error::LayoutNotFound`] for a name no source resolves.
    pub fn find_layout(&self, name: &str) -> Result<Arc<GeneratedLayout>> {
        if let Some((mode, descriptor)) = FieldMode::route(name) {
            return self.resolve(mode, name, descriptor).map(|(layout, _)| layout);
        }

        self.fallbacks
            .iter()
            .find_map(|source| source.find(name))
            .ok_or_else(|| Error::LayoutNotFound(name.to_string()))
    }

    /// Generates a batch of layouts in parallel.
    ///
    /// Returns how many of the requested layouts were generated by this call (as opposed to
    /// already being cached or generated by a concurrent caller).
    ///
    /// # Errors
    ///
    /// Returns the first generation error encountered. Layouts generated before the error
    /// stay published.
    pub fn prewarm(&self, requests: &[(&str, FieldMode)]) -> Result<usize> {
        let fresh = requests
            .par_iter()
            .map(|(descriptor, mode)| {
                let name = mode.canonical_name(descriptor);
                self.resolve(*mode, &name, descriptor)
                    .map(|(_, fresh)| fresh)
            })
            .collect::<Result<Vec<bool>>>()?;

        Ok(fresh.into_iter().filter(|fresh| *fresh).count())
    }

    fn resolve(
        &self,
        mode: FieldMode,
        name: &str,
        descriptor: &str,
    ) -> Result<(Arc<GeneratedLayout>, bool)> {
        if let Some(entry) = self.layouts.get(name) {
            log::trace!("layout cache hit for {name}");
            return Ok((entry.value().clone(), false));
        }

        let lock = Arc::clone(self.in_flight.entry(name.to_string()).or_default().value());
        let result = self.generate_locked(&lock, mode, name, descriptor);
        self.in_flight
            .remove_if(name, |_, held| Arc::ptr_eq(held, &lock));
        result
    }

    fn generate_locked(
        &self,
        lock: &Mutex<()>,
        mode: FieldMode,
        name: &str,
        descriptor: &str,
    ) -> Result<(Arc<GeneratedLayout>, bool)> {
        let _guard = lock.lock().map_err(|_| Error::LockError)?;

        // Another caller may have published while we waited
        if let Some(entry) = self.layouts.get(name) {
            return Ok((entry.value().clone(), false));
        }

        let generator = match mode {
            FieldMode::DualField => &self.dual,
            FieldMode::SingleField => &self.single,
        };
        let candidate = Arc::new(generator.generate(name, descriptor, &self.boundary)?);

        let entry = self
            .layouts
            .get_or_insert(name.to_string(), Arc::clone(&candidate));
        let published = entry.value().clone();
        let fresh = Arc::ptr_eq(&published, &candidate);
        if fresh {
            self.generated.fetch_add(1, Ordering::AcqRel);
            self.boundary.record_definition(name);
            log::debug!(
                "generated layout {name} ({} fields, {} unboxed)",
                published.field_count(),
                published.primitive_slots()
            );
        }

        Ok((published, fresh))
    }

    /// Returns `true` if a layout with canonical `name` has been published.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.layouts.contains_key(name)
    }

    /// Number of published layouts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    /// Returns `true` if nothing has been published yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Number of layouts this synthesizer generated.
    #[must_use]
    pub fn generated_count(&self) -> usize {
        self.generated.load(Ordering::Acquire)
    }

    /// All published layouts ordered by canonical name.
    #[must_use]
    pub fn layouts(&self) -> Vec<Arc<GeneratedLayout>> {
        self.layouts
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// The trust boundary generated layouts are defined in.
    #[must_use]
    pub fn boundary(&self) -> &TrustBoundary {
        &self.boundary
    }

    /// Mode used by [`LayoutSynthesizer::get_default_layout`].
    #[must_use]
    pub fn default_mode(&self) -> FieldMode {
        self.default_mode
    }
}

impl fmt::Debug for LayoutSynthesizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutSynthesizer")
            .field("namespace", self.boundary.namespace())
            .field("layouts", &self.layouts.len())
            .field("fallbacks", &self.fallbacks.len())
            .finish()
    }
}
