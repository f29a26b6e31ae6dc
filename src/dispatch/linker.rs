//! Prioritized chain of linkers behind the dispatch guard.
//!
//! [`LinkerPipeline`] resolves a [`LinkRequest`] into a [`GuardedInvocation`]. The
//! [`DispatchGuard`] always runs first and is not part of the priority ordering; if it
//! vetoes, no linker is consulted. The remaining linkers are tried highest priority first
//! and the first one that produces an invocation wins.

use std::{cmp::Reverse, fmt};

use crate::{
    dispatch::{
        guard::{DispatchGuard, LinkRequest, Operation},
        policy::PolicyQuery,
        types::{HostType, HostTypeId},
    },
    Error, Result,
};

/// Ordering of linkers in a [`LinkerPipeline`].
///
/// ```rust
/// use strata::dispatch::LinkerPriority;
///
/// assert!(LinkerPriority::HIGH > LinkerPriority::NORMAL);
/// assert_eq!(LinkerPriority::default(), LinkerPriority::NORMAL);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkerPriority(pub i32);

impl LinkerPriority {
    /// Tried first (value: 1000).
    pub const HIGHEST: Self = Self(1000);
    /// High priority (value: 500).
    pub const HIGH: Self = Self(500);
    /// Default (value: 0).
    pub const NORMAL: Self = Self(0);
    /// Low priority (value: -500).
    pub const LOW: Self = Self(-500);
    /// Tried last (value: -1000).
    pub const LOWEST: Self = Self(-1000);
}

impl Default for LinkerPriority {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// A resolved dynamic operation, valid while the receiver has the linked type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedInvocation {
    linker: String,
    target: HostTypeId,
    operation: Operation,
    name: Option<String>,
    is_static: bool,
}

impl GuardedInvocation {
    /// Creates an invocation for `request`, produced by `linker`.
    #[must_use]
    pub fn new(linker: impl Into<String>, request: &LinkRequest) -> Self {
        GuardedInvocation {
            linker: linker.into(),
            target: request.target().id(),
            operation: request.operation(),
            name: request.name().map(str::to_string),
            is_static: request.is_static(),
        }
    }

    /// Name of the linker that produced this invocation.
    #[must_use]
    pub fn linker(&self) -> &str {
        &self.linker
    }

    /// Identity of the type this invocation was linked against.
    #[must_use]
    pub fn target(&self) -> HostTypeId {
        self.target
    }

    /// The linked operation.
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The linked member name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns `true` for static invocations.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// The invocation guard: `true` if a receiver of type `receiver` may reuse this link.
    #[must_use]
    pub fn is_valid_for(&self, receiver: &HostType) -> bool {
        receiver.id() == self.target
    }
}

/// A linker that can resolve some link requests.
pub trait GuardingLinker: Send + Sync {
    /// Linker name, recorded in the invocations it produces.
    fn name(&self) -> &str;

    /// Position in the pipeline.
    fn priority(&self) -> LinkerPriority {
        LinkerPriority::NORMAL
    }

    /// Type-based pre-filter; linkers returning `false` are skipped for that target.
    fn can_link_type(&self, _target: &HostType) -> bool {
        true
    }

    /// Attempts to resolve `request`.
    ///
    /// Returns `Ok(None)` to let the next linker try.
    ///
    /// # Errors
    ///
    /// Any error aborts the pipeline and is returned to the caller.
    fn link(
        &self,
        request: &LinkRequest,
        context: &dyn PolicyQuery,
    ) -> Result<Option<GuardedInvocation>>;
}

/// The guard followed by prioritized linkers.
pub struct LinkerPipeline {
    guard: DispatchGuard,
    linkers: Vec<Box<dyn GuardingLinker>>,
}

impl LinkerPipeline {
    /// Creates a pipeline with only the guard.
    #[must_use]
    pub fn new(guard: DispatchGuard) -> Self {
        LinkerPipeline {
            guard,
            linkers: Vec::new(),
        }
    }

    /// Registers a linker; the pipeline stays sorted by priority, highest first.
    pub fn register(&mut self, linker: impl GuardingLinker + 'static) {
        self.linkers.push(Box::new(linker));
        self.linkers.sort_by_key(|l| Reverse(l.priority()));
    }

    /// The guard in front of the pipeline.
    #[must_use]
    pub fn guard(&self) -> &DispatchGuard {
        &self.guard
    }

    /// Names of the registered linkers in the order they are tried.
    #[must_use]
    pub fn linker_names(&self) -> Vec<&str> {
        self.linkers.iter().map(|l| l.name()).collect()
    }

    /// Number of registered linkers, not counting the guard.
    #[must_use]
    pub fn len(&self) -> usize {
        self.linkers.len()
    }

    /// Returns `true` if only the guard is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.linkers.is_empty()
    }

    /// Resolves `request` under the policy current on `context`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DispatchDenied`] if the guard vetoes, [`Error::Unlinkable`] if no
    /// linker resolves the request, or the first error a linker reports.
    pub fn link(
        &self,
        context: &dyn PolicyQuery,
        request: &LinkRequest,
    ) -> Result<GuardedInvocation> {
        self.guard.try_link(context, request)?;

        for linker in &self.linkers {
            if !linker.can_link_type(request.target()) {
                continue;
            }
            if let Some(invocation) = linker.link(request, context)? {
                log::trace!("{} linked {}", linker.name(), request);
                return Ok(invocation);
            }
        }

        Err(Error::Unlinkable(request.to_string()))
    }
}

impl fmt::Debug for LinkerPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkerPipeline")
            .field("guard", &self.guard)
            .field("linkers", &self.linker_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dispatch::{
            policy::{ExecutionContext, SecurityPolicy},
            types::HostTypeFlags,
        },
        test::{guard_with_registry, restricted_context, MemberLinker},
    };
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    struct CountingLinker {
        calls: Arc<AtomicUsize>,
    }

    impl GuardingLinker for CountingLinker {
        fn name(&self) -> &str {
            "counting"
        }

        fn priority(&self) -> LinkerPriority {
            LinkerPriority::HIGHEST
        }

        fn link(
            &self,
            _request: &LinkRequest,
            _context: &dyn PolicyQuery,
        ) -> Result<Option<GuardedInvocation>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    #[test]
    fn test_priority_order() {
        let (guard, registry) = guard_with_registry();
        let point = registry
            .define("app.Point", None, &[], HostTypeFlags::empty())
            .unwrap();

        let mut pipeline = LinkerPipeline::new(guard);
        pipeline.register(MemberLinker::new("fallback", LinkerPriority::LOW, &["x", "y"]));
        pipeline.register(MemberLinker::new("beans", LinkerPriority::HIGH, &["x"]));
        assert_eq!(pipeline.linker_names(), vec!["beans", "fallback"]);

        let context = ExecutionContext::new("open");
        let x = pipeline
            .link(&context, &LinkRequest::new(point.clone(), Operation::GetProperty).named("x"))
            .unwrap();
        assert_eq!(x.linker(), "beans");
        assert!(x.is_valid_for(&point));

        let y = pipeline
            .link(&context, &LinkRequest::new(point.clone(), Operation::GetProperty).named("y"))
            .unwrap();
        assert_eq!(y.linker(), "fallback");
        assert_eq!(y.name(), Some("y"));

        let other = registry.object_type().unwrap();
        assert!(!y.is_valid_for(&other));
    }

    #[test]
    fn test_unlinkable() {
        let (guard, registry) = guard_with_registry();
        let mut pipeline = LinkerPipeline::new(guard);
        pipeline.register(MemberLinker::new("beans", LinkerPriority::NORMAL, &["x"]));

        let request = LinkRequest::new(registry.object_type().unwrap(), Operation::Call).named("z");
        assert!(matches!(
            pipeline.link(&ExecutionContext::new("open"), &request),
            Err(Error::Unlinkable(_))
        ));
    }

    #[test]
    fn test_guard_veto_skips_linkers() {
        let (guard, registry) = guard_with_registry();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut pipeline = LinkerPipeline::new(guard);
        pipeline.register(CountingLinker {
            calls: calls.clone(),
        });
        pipeline.register(MemberLinker::new("beans", LinkerPriority::NORMAL, &["x"]));

        let request = LinkRequest::new(registry.object_type().unwrap(), Operation::GetProperty)
            .named("x");

        let err = pipeline.link(&restricted_context(), &request).unwrap_err();
        assert!(err.is_security_error());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let open: Option<Arc<SecurityPolicy>> = None;
        let invocation = pipeline.link(&open, &request).unwrap();
        assert_eq!(invocation.linker(), "beans");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_type_prefilter() {
        let (guard, registry) = guard_with_registry();
        let mut pipeline = LinkerPipeline::new(guard);
        pipeline.register(
            MemberLinker::new("interfaces", LinkerPriority::HIGH, &["run"]).only_interfaces(),
        );
        pipeline.register(MemberLinker::new("any", LinkerPriority::LOW, &["run"]));

        let runnable = registry
            .define("app.Runnable", None, &[], HostTypeFlags::INTERFACE)
            .unwrap();
        let task = registry
            .define("app.Task", None, &[runnable.clone()], HostTypeFlags::empty())
            .unwrap();
        let context = ExecutionContext::new("open");

        let on_interface = pipeline
            .link(&context, &LinkRequest::new(runnable, Operation::Call).named("run"))
            .unwrap();
        assert_eq!(on_interface.linker(), "interfaces");

        let on_class = pipeline
            .link(&context, &LinkRequest::new(task, Operation::Call).named("run"))
            .unwrap();
        assert_eq!(on_class.linker(), "any");
    }
}
