//! On-demand structure layouts for script objects.
//!
//! Script objects that share a shape share one storage layout. A layout is requested with a
//! compact shape descriptor (one token per field) and a [`FieldMode`]; the
//! [`LayoutSynthesizer`] generates it on first use and serves the same [`GeneratedLayout`]
//! to every later caller, from any thread.
//!
//! # Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | `descriptor` | Shape descriptor grammar: [`ShapeDescriptor`], [`FieldKind`] |
//! | `mode` | [`FieldMode`], canonical name prefixes and routing |
//! | `namespace` | [`ModuleSystem`] capability, [`ModuleRegistry`], [`TrustBoundary`] |
//! | `generator` | [`LayoutGenerator`], slot planning |
//! | `structure` | [`GeneratedLayout`], [`LayoutInstance`] and the generic accessors |
//! | `synthesizer` | [`LayoutSynthesizer`], the deduplicating cache |
//! | `value` | [`Value`], storage-level field values |
//!
//! # Request Flow
//!
//! ```text
//! get_layout("OOI", DualField)
//!         │
//!         ▼
//! canonical name "strata.structures.Dual$OOI"
//!         │
//!         ▼
//! ┌───────────────────┐
//! │  published cache  │───► hit ───► shared layout
//! └───────────────────┘
//!         │ miss
//!         ▼
//! ┌───────────────────┐
//! │  per-name lock    │───► published meanwhile ───► shared layout
//! └───────────────────┘
//!         │
//!         ▼
//! ┌───────────────────┐
//! │  generate + publish│───► error ───► nothing published
//! └───────────────────┘
//! ```

mod descriptor;
mod generator;
mod mode;
mod namespace;
mod structure;
mod synthesizer;
mod value;

pub use descriptor::{FieldKind, ShapeDescriptor, DEFAULT_MAX_FIELDS};
pub use generator::LayoutGenerator;
pub use mode::{
    is_dual_field_name, is_single_field_name, is_structure_name, FieldMode, DUAL_FIELD_PREFIX,
    SINGLE_FIELD_PREFIX, STRUCTURES_PACKAGE,
};
pub use namespace::{
    ModuleRegistry, ModuleSystem, NamespaceHandle, ReadGrant, TrustBoundary, RUNTIME_NAMESPACE,
    RUNTIME_PACKAGE, SCRIPTS_PACKAGE, STRUCTURES_NAMESPACE,
};
pub use structure::{FieldSlot, GeneratedLayout, LayoutInstance};
pub use synthesizer::{LayoutSource, LayoutSynthesizer};
pub use value::Value;
