//! Layout factories.

use std::sync::Arc;

use crate::layout::{FieldMode, GeneratedLayout, LayoutGenerator, ModuleRegistry, TrustBoundary};

/// A trust boundary over a fresh in-process module registry.
pub fn test_boundary() -> TrustBoundary {
    TrustBoundary::establish(&ModuleRegistry::new()).unwrap()
}

/// Generates the canonically named layout for `descriptor` without going through a cache.
pub fn layout_for(descriptor: &str, mode: FieldMode) -> Arc<GeneratedLayout> {
    let name = mode.canonical_name(descriptor);
    Arc::new(
        LayoutGenerator::new(mode)
            .generate(&name, descriptor, &test_boundary())
            .unwrap(),
    )
}
