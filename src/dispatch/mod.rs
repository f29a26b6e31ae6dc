//! Guarded dynamic dispatch.
//!
//! Scripts reach host objects through dynamically linked call sites. This module decides
//! whether such a call site may be linked at all, and whether a reflective access to a host
//! type is allowed, given the [`SecurityPolicy`] installed on the calling
//! [`ExecutionContext`].
//!
//! # Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | `types` | [`HostType`], [`HostTypeId`], [`HostTypeFlags`] |
//! | `registry` | [`HostTypeRegistry`], well-known type names, the proxy factory |
//! | `classify` | [`SensitiveTypeClassifier`], [`TargetCategory`] |
//! | `policy` | [`SecurityPolicy`], [`PolicyQuery`], [`ExecutionContext`] |
//! | `guard` | [`DispatchGuard`], [`LinkRequest`], [`DenialReason`] |
//! | `linker` | [`LinkerPipeline`], [`GuardingLinker`], [`GuardedInvocation`] |
//!
//! # Decision Rules
//!
//! | Policy | Link request | Reflective access |
//! |--------|--------------|-------------------|
//! | none | deferred to the linkers | allowed |
//! | any | denied, whatever the target | denied if [`TargetCategory::requires_check`] |
//!
//! Generated proxies are only checked for static access; types that merely derive from the
//! proxy base are always checked.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use strata::dispatch::{
//!     DispatchGuard, ExecutionContext, HostEnvironment, HostTypeRegistry, LinkRequest,
//!     Operation, SecurityPolicy, SensitiveTypeClassifier, CLASS_TYPE,
//! };
//!
//! let registry = Arc::new(HostTypeRegistry::new(HostEnvironment::default())?);
//! let guard = DispatchGuard::new(Arc::new(SensitiveTypeClassifier::new(registry.clone())?));
//!
//! let class = registry.get_by_name(CLASS_TYPE).unwrap();
//! let context = ExecutionContext::new("realm");
//! let request = LinkRequest::new(class.clone(), Operation::Call).named("forName");
//! assert!(guard.try_link(&context, &request).is_ok());
//!
//! context.set_policy(Arc::new(SecurityPolicy::deny_all()));
//! assert!(guard.try_link(&context, &request).is_err());
//! assert!(guard.check_access(&context, &class, false).is_err());
//! # Ok::<(), strata::Error>(())
//! ```

mod classify;
mod guard;
mod linker;
mod policy;
mod registry;
mod types;

pub use classify::{SensitiveTypeClass, SensitiveTypeClassifier, TargetCategory};
pub use guard::{DenialReason, DispatchGuard, LinkDecision, LinkRequest, Operation};
pub use linker::{GuardedInvocation, GuardingLinker, LinkerPipeline, LinkerPriority};
pub use policy::{ClassFilter, ExecutionContext, PolicyQuery, SecurityPolicy};
pub use registry::{
    HostEnvironment, HostTypeRegistry, BEAN_HELPER_TYPES, BEAN_STATEMENT_TYPE,
    BEAN_XML_DECODER_TYPE, BEAN_XML_ENCODER_TYPE, CLASS_LOADER_TYPE, CLASS_TYPE,
    INVOKE_NAMESPACE, OBJECT_TYPE, PROXY_NAMESPACE, PROXY_TYPE, REFLECT_NAMESPACE,
};
pub use types::{HostType, HostTypeFlags, HostTypeId, HostTypeRc};
