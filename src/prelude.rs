//! # strata Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the strata library.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all strata operations
pub use crate::Error;

/// The result type used throughout strata
pub use crate::Result;

/// Library configuration
pub use crate::config::{DispatchConfig, LayoutConfig, StrataConfig};

/// Comma-separated option values
pub use crate::options::ValueOption;

// ================================================================================================
// Layouts
// ================================================================================================

/// Layout synthesis and the shared cache
pub use crate::layout::{GeneratedLayout, LayoutInstance, LayoutSource, LayoutSynthesizer};

/// Shape descriptors and storage values
pub use crate::layout::{FieldKind, FieldMode, ShapeDescriptor, Value};

/// Namespaces and the trust boundary
pub use crate::layout::{ModuleRegistry, ModuleSystem, TrustBoundary};

// ================================================================================================
// Dispatch
// ================================================================================================

/// Host types
pub use crate::dispatch::{HostEnvironment, HostType, HostTypeRc, HostTypeRegistry};

/// Policies and execution contexts
pub use crate::dispatch::{ExecutionContext, PolicyQuery, SecurityPolicy};

/// The guard, classification and the linker pipeline
pub use crate::dispatch::{
    DispatchGuard, GuardedInvocation, GuardingLinker, LinkRequest, LinkerPipeline,
    LinkerPriority, Operation, SensitiveTypeClassifier, TargetCategory,
};
