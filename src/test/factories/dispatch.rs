//! Dispatch factories.

use std::sync::Arc;

use crate::{
    dispatch::{
        DispatchGuard, ExecutionContext, GuardedInvocation, GuardingLinker, HostEnvironment,
        HostType, HostTypeRegistry, LinkRequest, LinkerPriority, PolicyQuery, SecurityPolicy,
        SensitiveTypeClassifier,
    },
    Result,
};

/// A guard over a fresh registry with the full host profile.
pub fn guard_with_registry() -> (DispatchGuard, Arc<HostTypeRegistry>) {
    let registry = Arc::new(HostTypeRegistry::new(HostEnvironment::default()).unwrap());
    let classifier = SensitiveTypeClassifier::new(registry.clone()).unwrap();
    (DispatchGuard::new(Arc::new(classifier)), registry)
}

/// A context with a deny-all policy installed.
pub fn restricted_context() -> ExecutionContext {
    ExecutionContext::with_policy("restricted", Arc::new(SecurityPolicy::deny_all()))
}

/// Links requests whose member name is in a fixed list.
pub struct MemberLinker {
    name: String,
    priority: LinkerPriority,
    members: Vec<String>,
    only_interfaces: bool,
}

impl MemberLinker {
    pub fn new(name: &str, priority: LinkerPriority, members: &[&str]) -> Self {
        MemberLinker {
            name: name.to_string(),
            priority,
            members: members.iter().map(|m| m.to_string()).collect(),
            only_interfaces: false,
        }
    }

    pub fn only_interfaces(mut self) -> Self {
        self.only_interfaces = true;
        self
    }
}

impl GuardingLinker for MemberLinker {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> LinkerPriority {
        self.priority
    }

    fn can_link_type(&self, target: &HostType) -> bool {
        !self.only_interfaces || target.is_interface()
    }

    fn link(
        &self,
        request: &LinkRequest,
        _context: &dyn PolicyQuery,
    ) -> Result<Option<GuardedInvocation>> {
        Ok(request
            .name()
            .filter(|name| self.members.iter().any(|m| m == name))
            .map(|_| GuardedInvocation::new(self.name.clone(), request)))
    }
}
