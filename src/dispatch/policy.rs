//! Security policies and the execution contexts that carry them.
//!
//! A [`SecurityPolicy`] is installed per [`ExecutionContext`] (one script realm) and swapped
//! atomically by the host between evaluations. The dispatch guard only ever asks one
//! question, "is any policy installed right now", through the [`PolicyQuery`] trait, so a
//! policy can also be passed explicitly as `Option<Arc<SecurityPolicy>>`.

use std::{collections::HashSet, fmt, sync::Arc};

use arc_swap::ArcSwapOption;

/// Decides which host types scripts may see by name.
pub trait ClassFilter: Send + Sync {
    /// Returns `true` if `type_name` may be exposed to scripts.
    fn expose_to_scripts(&self, type_name: &str) -> bool;
}

impl<F> ClassFilter for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn expose_to_scripts(&self, type_name: &str) -> bool {
        self(type_name)
    }
}

/// A named security policy.
///
/// The presence of a policy on a context is what disables dynamic linking. The filter is
/// consulted by hosts that expose individual types; the guard itself never looks at it.
pub struct SecurityPolicy {
    name: String,
    filter: Box<dyn ClassFilter>,
}

impl SecurityPolicy {
    /// Creates a policy backed by `filter`.
    pub fn new(name: impl Into<String>, filter: impl ClassFilter + 'static) -> Self {
        SecurityPolicy {
            name: name.into(),
            filter: Box::new(filter),
        }
    }

    /// A policy that exposes no host types at all.
    #[must_use]
    pub fn deny_all() -> Self {
        Self::new("deny-all", |_: &str| false)
    }

    /// A policy that exposes exactly the listed type names.
    pub fn allow_list<I, S>(name: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed: HashSet<String> = types.into_iter().map(Into::into).collect();
        Self::new(name, move |type_name: &str| allowed.contains(type_name))
    }

    /// Policy name, for diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the filter exposes `type_name`.
    #[must_use]
    pub fn allows(&self, type_name: &str) -> bool {
        self.filter.expose_to_scripts(type_name)
    }
}

impl fmt::Debug for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityPolicy")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Access to the policy active for the current evaluation.
pub trait PolicyQuery {
    /// The installed policy, or `None` if unrestricted.
    fn current_policy(&self) -> Option<Arc<SecurityPolicy>>;
}

impl PolicyQuery for Option<Arc<SecurityPolicy>> {
    fn current_policy(&self) -> Option<Arc<SecurityPolicy>> {
        self.clone()
    }
}

/// One script realm with its own policy slot.
///
/// Reads are lock-free; installing or clearing a policy is a single atomic swap and is
/// observed by every guard query that starts afterwards.
pub struct ExecutionContext {
    name: String,
    policy: ArcSwapOption<SecurityPolicy>,
}

impl ExecutionContext {
    /// Creates an unrestricted context.
    pub fn new(name: impl Into<String>) -> Self {
        ExecutionContext {
            name: name.into(),
            policy: ArcSwapOption::empty(),
        }
    }

    /// Creates a context with `policy` already installed.
    pub fn with_policy(name: impl Into<String>, policy: Arc<SecurityPolicy>) -> Self {
        let context = Self::new(name);
        context.policy.store(Some(policy));
        context
    }

    /// Context name, for diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Installs `policy`, returning the one it replaces.
    pub fn set_policy(&self, policy: Arc<SecurityPolicy>) -> Option<Arc<SecurityPolicy>> {
        log::debug!("context {}: installing policy {}", self.name, policy.name());
        self.policy.swap(Some(policy))
    }

    /// Removes the installed policy, returning it.
    pub fn clear_policy(&self) -> Option<Arc<SecurityPolicy>> {
        let previous = self.policy.swap(None);
        if let Some(previous) = &previous {
            log::debug!("context {}: cleared policy {}", self.name, previous.name());
        }
        previous
    }

    /// Returns `true` if a policy is installed.
    #[must_use]
    pub fn is_restricted(&self) -> bool {
        self.policy.load().is_some()
    }
}

impl PolicyQuery for ExecutionContext {
    fn current_policy(&self) -> Option<Arc<SecurityPolicy>> {
        self.policy.load_full()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("name", &self.name)
            .field("policy", &self.current_policy().map(|p| p.name().to_string()))
            .finish()
    }
}
