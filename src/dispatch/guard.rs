//! The dispatch guard.
//!
//! [`DispatchGuard`] sits in front of every dynamically linked operation. It never resolves
//! anything itself: it either defers to the linkers behind it or vetoes the request with
//! [`Error::DispatchDenied`]. The link gate is coarse: any installed policy vetoes every
//! link request, whatever the target. The finer reflective access check only covers the
//! targets [`SensitiveTypeClassifier::requires_check`] selects.

use std::{fmt, sync::Arc};

use strum::{Display, EnumIter};

use crate::{
    dispatch::{
        classify::SensitiveTypeClassifier,
        policy::{PolicyQuery, SecurityPolicy},
        types::HostTypeRc,
    },
    Error, Result,
};

/// Why the guard refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum DenialReason {
    /// Dynamic linking was attempted while a policy is installed
    #[strum(serialize = "dynamic linking is disabled while a security policy is installed")]
    LinkWithPolicy,
    /// A sensitive target was accessed while a policy is installed
    #[strum(serialize = "reflective access is not permitted while a security policy is installed")]
    ReflectiveAccess,
}

/// The kind of dynamic operation a call site performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Operation {
    /// Property read
    #[strum(serialize = "getProp")]
    GetProperty,
    /// Property write
    #[strum(serialize = "setProp")]
    SetProperty,
    /// Method lookup without invocation
    #[strum(serialize = "getMethod")]
    GetMethod,
    /// Method invocation
    #[strum(serialize = "call")]
    Call,
    /// Construction
    #[strum(serialize = "new")]
    New,
}

/// A request to link one dynamic operation against a host type.
#[derive(Clone)]
pub struct LinkRequest {
    target: HostTypeRc,
    operation: Operation,
    name: Option<String>,
    is_static: bool,
}

impl LinkRequest {
    /// Creates an instance-side request for `operation` on `target`.
    #[must_use]
    pub fn new(target: HostTypeRc, operation: Operation) -> Self {
        LinkRequest {
            target,
            operation,
            name: None,
            is_static: false,
        }
    }

    /// Sets the member name the operation refers to.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Marks the request as static (type-side) access.
    #[must_use]
    pub fn static_access(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// The receiver type.
    #[must_use]
    pub fn target(&self) -> &HostTypeRc {
        &self.target
    }

    /// The operation kind.
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The member name, if the operation has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns `true` for static access.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }
}

impl fmt::Display for LinkRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation)?;
        if let Some(name) = &self.name {
            write!(f, ":{name}")?;
        }
        write!(
            f,
            " on {}{}",
            if self.is_static { "static " } else { "" },
            self.target.name()
        )
    }
}

impl fmt::Debug for LinkRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinkRequest({self})")
    }
}

/// The outcome of the link gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDecision {
    /// Let the next linker resolve the request
    Defer,
    /// Veto the request
    Deny(DenialReason),
}

/// Vetoes dynamic linking and reflective access under an installed policy.
pub struct DispatchGuard {
    classifier: Arc<SensitiveTypeClassifier>,
}

impl DispatchGuard {
    /// Creates a guard using `classifier` for the reflective access check.
    #[must_use]
    pub fn new(classifier: Arc<SensitiveTypeClassifier>) -> Self {
        DispatchGuard { classifier }
    }

    /// The classifier backing this guard.
    #[must_use]
    pub fn classifier(&self) -> &Arc<SensitiveTypeClassifier> {
        &self.classifier
    }

    /// The type-based pre-filter: `true` for sensitive types.
    #[must_use]
    pub fn can_link_type(&self, target: &HostTypeRc) -> bool {
        self.classifier.classify(target)
    }

    /// Whether `target` needs the reflective check for access of the given staticness.
    #[must_use]
    pub fn requires_check(&self, target: &HostTypeRc, is_static: bool) -> bool {
        self.classifier.requires_check(target, is_static)
    }

    /// The link gate as a pure function of the installed policy.
    #[must_use]
    pub fn decide(&self, policy: Option<&SecurityPolicy>, _request: &LinkRequest) -> LinkDecision {
        match policy {
            Some(_) => LinkDecision::Deny(DenialReason::LinkWithPolicy),
            None => LinkDecision::Defer,
        }
    }

    /// Applies the link gate to `request` under the policy current on `context`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DispatchDenied`] if any policy is installed.
    pub fn try_link(&self, context: &dyn PolicyQuery, request: &LinkRequest) -> Result<LinkDecision> {
        let policy = context.current_policy();
        match self.decide(policy.as_deref(), request) {
            LinkDecision::Deny(reason) => {
                log::warn!(
                    "denied {} under policy {}",
                    request,
                    policy.as_ref().map_or("<none>", |p| p.name())
                );
                Err(Error::DispatchDenied {
                    target: request.target().name().to_string(),
                    reason,
                })
            }
            LinkDecision::Defer => Ok(LinkDecision::Defer),
        }
    }

    /// The reflective access check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DispatchDenied`] if a policy is installed and `target` requires the
    /// check for access of the given staticness.
    pub fn check_access(
        &self,
        context: &dyn PolicyQuery,
        target: &HostTypeRc,
        is_static: bool,
    ) -> Result<()> {
        let Some(policy) = context.current_policy() else {
            return Ok(());
        };
        if !self.requires_check(target, is_static) {
            return Ok(());
        }

        log::warn!(
            "denied {}access to {} under policy {}",
            if is_static { "static " } else { "" },
            target.name(),
            policy.name()
        );
        Err(Error::DispatchDenied {
            target: target.name().to_string(),
            reason: DenialReason::ReflectiveAccess,
        })
    }
}

impl fmt::Debug for DispatchGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchGuard")
            .field("cached", &self.classifier.cached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dispatch::{
            policy::ExecutionContext,
            registry::{CLASS_TYPE, PROXY_TYPE},
            types::HostTypeFlags,
        },
        test::{guard_with_registry, restricted_context},
    };
    use strum::IntoEnumIterator;

    #[test]
    fn test_any_policy_denies_every_link() {
        let (guard, registry) = guard_with_registry();
        let context = restricted_context();

        let point = registry
            .define("app.Point", None, &[], HostTypeFlags::empty())
            .unwrap();
        let targets = [
            point,
            registry.object_type().unwrap(),
            registry.get_by_name(CLASS_TYPE).unwrap(),
            registry.define_proxy_class(&[]).unwrap(),
        ];

        for target in &targets {
            for operation in Operation::iter() {
                let request = LinkRequest::new(target.clone(), operation).named("x");
                match guard.try_link(&context, &request) {
                    Err(Error::DispatchDenied { target: name, reason }) => {
                        assert_eq!(name, target.name());
                        assert_eq!(reason, DenialReason::LinkWithPolicy);
                    }
                    other => panic!("{request} was not denied: {other:?}"),
                }
            }
        }
    }

    #[test]
    fn test_no_policy_never_denies() {
        let (guard, registry) = guard_with_registry();
        let context = ExecutionContext::new("open");

        for target in registry.all_types() {
            let request = LinkRequest::new(target.clone(), Operation::Call);
            assert_eq!(guard.try_link(&context, &request).unwrap(), LinkDecision::Defer);
            assert!(guard.check_access(&context, &target, true).is_ok());
            assert!(guard.check_access(&context, &target, false).is_ok());
        }
    }

    #[test]
    fn test_check_access_under_policy() {
        let (guard, registry) = guard_with_registry();
        let context = restricted_context();

        let class = registry.get_by_name(CLASS_TYPE).unwrap();
        assert!(matches!(
            guard.check_access(&context, &class, false),
            Err(Error::DispatchDenied {
                reason: DenialReason::ReflectiveAccess,
                ..
            })
        ));

        let point = registry
            .define("app.Point", None, &[], HostTypeFlags::empty())
            .unwrap();
        assert!(guard.check_access(&context, &point, true).is_ok());

        let genuine = registry.define_proxy_class(&[]).unwrap();
        assert!(guard.check_access(&context, &genuine, false).is_ok());
        assert!(guard.check_access(&context, &genuine, true).is_err());

        let proxy_base = registry.get_by_name(PROXY_TYPE).unwrap();
        let forged = registry
            .define("app.FakeProxy", Some(&proxy_base), &[], HostTypeFlags::empty())
            .unwrap();
        assert!(guard.check_access(&context, &forged, false).is_err());
        assert!(guard.check_access(&context, &forged, true).is_err());
    }

    #[test]
    fn test_policy_swap_is_observed() {
        let (guard, registry) = guard_with_registry();
        let context = ExecutionContext::new("realm");
        let request = LinkRequest::new(registry.object_type().unwrap(), Operation::GetProperty);

        assert!(guard.try_link(&context, &request).is_ok());
        context.set_policy(Arc::new(SecurityPolicy::deny_all()));
        assert!(guard.try_link(&context, &request).is_err());
        context.clear_policy();
        assert!(guard.try_link(&context, &request).is_ok());
    }

    #[test]
    fn test_decide_ignores_filter() {
        let (guard, registry) = guard_with_registry();
        let permissive = SecurityPolicy::new("everything", |_: &str| true);
        let request = LinkRequest::new(registry.object_type().unwrap(), Operation::New);

        assert_eq!(
            guard.decide(Some(&permissive), &request),
            LinkDecision::Deny(DenialReason::LinkWithPolicy)
        );
        assert_eq!(guard.decide(None, &request), LinkDecision::Defer);
    }

    #[test]
    fn test_request_display() {
        let (_, registry) = guard_with_registry();
        let request = LinkRequest::new(registry.get_by_name(CLASS_TYPE).unwrap(), Operation::Call)
            .named("forName")
            .static_access();
        assert_eq!(request.to_string(), "call:forName on static host.lang.Class");
        assert!(request.is_static());
    }

    #[test]
    fn test_can_link_type_matches_classify() {
        let (guard, registry) = guard_with_registry();
        for target in registry.all_types() {
            assert_eq!(guard.can_link_type(&target), guard.classifier().classify(&target));
        }
    }
}
