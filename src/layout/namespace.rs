//! Namespaces and the trust boundary generated layouts live behind.
//!
//! Generated layouts are defined in their own namespace, isolated from the runtime's internal
//! namespaces so generated code can neither shadow nor be shadowed by runtime internals. The
//! isolation is bridged by an explicit, minimal set of read grants that are made exactly once
//! when the [`TrustBoundary`] is established:
//!
//! ```text
//!   structures ──reads──► runtime: strata.scripts
//!   structures ──reads──► runtime: strata.runtime
//!   runtime    ──reads──► structures: strata.structures
//! ```
//!
//! The namespace system itself is an external collaborator, consumed through the
//! [`ModuleSystem`] capability trait. [`ModuleRegistry`] is an in-process implementation.

use std::{
    collections::HashSet,
    fmt,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use dashmap::{DashMap, DashSet};

use crate::{layout::mode::STRUCTURES_PACKAGE, Error, Result};

/// Name of the namespace hosting generated layouts.
pub const STRUCTURES_NAMESPACE: &str = "strata.structures";

/// Name of the core runtime namespace.
pub const RUNTIME_NAMESPACE: &str = "strata.runtime";

/// Runtime package holding the script object base types.
pub const SCRIPTS_PACKAGE: &str = "strata.scripts";

/// Runtime package holding the field-storage primitives.
pub const RUNTIME_PACKAGE: &str = "strata.runtime";

/// Opaque handle to a declared namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceHandle {
    id: u32,
    name: Arc<str>,
}

impl NamespaceHandle {
    /// Creates a handle. Only namespace systems should mint handles.
    #[must_use]
    pub fn new(id: u32, name: &str) -> Self {
        NamespaceHandle {
            id,
            name: Arc::from(name),
        }
    }

    /// Numeric identity of the namespace.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Declared name of the namespace.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for NamespaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// A single read edge: `reader` may access `package` owned by `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReadGrant {
    /// Namespace receiving access
    pub reader: u32,
    /// Namespace owning the package
    pub owner: u32,
    /// Package made readable
    pub package: String,
}

/// Capability interface to the host's namespace system.
///
/// Only the operations the layout synthesizer actually needs are exposed. Implementations must
/// be safe to share between threads.
pub trait ModuleSystem: Send + Sync {
    /// The namespace the core runtime lives in.
    fn runtime_namespace(&self) -> NamespaceHandle;

    /// Declares a new namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NamespaceError`] if the name is already taken or the system refuses.
    fn declare_namespace(&self, name: &str) -> Result<NamespaceHandle>;

    /// Grants `reader` access to `package` owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NamespaceError`] if either namespace is unknown.
    fn grant_read(
        &self,
        reader: &NamespaceHandle,
        owner: &NamespaceHandle,
        package: &str,
    ) -> Result<()>;

    /// Returns `true` if `reader` may access `package` owned by `owner`.
    fn can_read(&self, reader: &NamespaceHandle, owner: &NamespaceHandle, package: &str) -> bool;
}

/// In-process [`ModuleSystem`] implementation.
///
/// Declarations and grants are append-only. A namespace can always read its own packages.
///
/// # Examples
///
/// ```rust
/// use strata::layout::{ModuleRegistry, ModuleSystem};
///
/// let modules = ModuleRegistry::new();
/// let runtime = modules.runtime_namespace();
/// let plugin = modules.declare_namespace("app.plugin")?;
///
/// assert!(!modules.can_read(&plugin, &runtime, "strata.scripts"));
/// modules.grant_read(&plugin, &runtime, "strata.scripts")?;
/// assert!(modules.can_read(&plugin, &runtime, "strata.scripts"));
/// # Ok::<(), strata::Error>(())
/// ```
pub struct ModuleRegistry {
    next_id: AtomicU32,
    runtime: NamespaceHandle,
    namespaces: DashMap<String, NamespaceHandle>,
    grants: DashSet<ReadGrant>,
    grant_log: boxcar::Vec<ReadGrant>,
}

impl ModuleRegistry {
    /// Creates a registry with the runtime namespace pre-declared.
    #[must_use]
    pub fn new() -> Self {
        let runtime = NamespaceHandle::new(1, RUNTIME_NAMESPACE);
        let namespaces = DashMap::new();
        namespaces.insert(RUNTIME_NAMESPACE.to_string(), runtime.clone());

        ModuleRegistry {
            next_id: AtomicU32::new(2),
            runtime,
            namespaces,
            grants: DashSet::new(),
            grant_log: boxcar::Vec::new(),
        }
    }

    /// Looks up a declared namespace by name.
    #[must_use]
    pub fn namespace(&self, name: &str) -> Option<NamespaceHandle> {
        self.namespaces.get(name).map(|entry| entry.value().clone())
    }

    /// Number of declared namespaces, the runtime namespace included.
    #[must_use]
    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }

    /// All grants in the order they were made.
    #[must_use]
    pub fn grants(&self) -> Vec<ReadGrant> {
        self.grant_log
            .iter()
            .map(|(_, grant)| grant.clone())
            .collect()
    }

    fn is_declared(&self, handle: &NamespaceHandle) -> bool {
        self.namespaces
            .get(handle.name())
            .is_some_and(|entry| entry.id() == handle.id())
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleSystem for ModuleRegistry {
    fn runtime_namespace(&self) -> NamespaceHandle {
        self.runtime.clone()
    }

    fn declare_namespace(&self, name: &str) -> Result<NamespaceHandle> {
        match self.namespaces.entry(name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(Error::NamespaceError(format!(
                "namespace {name} is already declared"
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let handle =
                    NamespaceHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed), name);
                slot.insert(handle.clone());
                log::debug!("declared namespace {handle}");
                Ok(handle)
            }
        }
    }

    fn grant_read(
        &self,
        reader: &NamespaceHandle,
        owner: &NamespaceHandle,
        package: &str,
    ) -> Result<()> {
        for handle in [reader, owner] {
            if !self.is_declared(handle) {
                return Err(Error::NamespaceError(format!(
                    "namespace {handle} is not declared"
                )));
            }
        }

        let grant = ReadGrant {
            reader: reader.id(),
            owner: owner.id(),
            package: package.to_string(),
        };
        if self.grants.insert(grant.clone()) {
            log::debug!("granted {reader} read access to {owner}:{package}");
            self.grant_log.push(grant);
        }
        Ok(())
    }

    fn can_read(&self, reader: &NamespaceHandle, owner: &NamespaceHandle, package: &str) -> bool {
        if reader.id() == owner.id() {
            return true;
        }

        self.grants.contains(&ReadGrant {
            reader: reader.id(),
            owner: owner.id(),
            package: package.to_string(),
        })
    }
}

/// The isolated namespace all generated layouts are defined in.
///
/// Established once per synthesizer. The set of packages the boundary may address is captured
/// at establishment and never widened afterwards.
pub struct TrustBoundary {
    namespace: NamespaceHandle,
    runtime: NamespaceHandle,
    readable: HashSet<&'static str>,
    runtime_reads_structures: bool,
    defined: boxcar::Vec<Arc<str>>,
}

impl TrustBoundary {
    /// Declares the structures namespace and performs the bidirectional grants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NamespaceError`] if the declaration or any grant fails, or if the
    /// module system does not report the grants as effective afterwards.
    pub fn establish(modules: &dyn ModuleSystem) -> Result<Self> {
        let runtime = modules.runtime_namespace();
        let namespace = modules.declare_namespace(STRUCTURES_NAMESPACE)?;

        let mut readable = HashSet::new();
        for package in [SCRIPTS_PACKAGE, RUNTIME_PACKAGE] {
            modules.grant_read(&namespace, &runtime, package)?;
            if !modules.can_read(&namespace, &runtime, package) {
                return Err(Error::NamespaceError(format!(
                    "grant of {package} to {namespace} did not take effect"
                )));
            }
            readable.insert(package);
        }

        modules.grant_read(&runtime, &namespace, STRUCTURES_PACKAGE)?;
        let runtime_reads_structures = modules.can_read(&runtime, &namespace, STRUCTURES_PACKAGE);
        if !runtime_reads_structures {
            return Err(Error::NamespaceError(format!(
                "runtime cannot read {STRUCTURES_PACKAGE} in {namespace}"
            )));
        }

        Ok(TrustBoundary {
            namespace,
            runtime,
            readable,
            runtime_reads_structures,
            defined: boxcar::Vec::new(),
        })
    }

    /// Handle of the structures namespace.
    #[must_use]
    pub fn namespace(&self) -> &NamespaceHandle {
        &self.namespace
    }

    /// Handle of the runtime namespace the boundary was bridged to.
    #[must_use]
    pub fn runtime(&self) -> &NamespaceHandle {
        &self.runtime
    }

    /// Returns `true` if generated code may address `package` of the runtime.
    #[must_use]
    pub fn can_address(&self, package: &str) -> bool {
        self.readable.contains(package)
    }

    /// Returns `true` if the runtime may read fields of generated layouts.
    #[must_use]
    pub fn runtime_can_read_layouts(&self) -> bool {
        self.runtime_reads_structures
    }

    /// Records a layout defined inside the boundary.
    pub(crate) fn record_definition(&self, name: &str) {
        self.defined.push(Arc::from(name));
    }

    /// Number of layouts defined inside the boundary.
    #[must_use]
    pub fn definition_count(&self) -> usize {
        self.defined.count()
    }
}

impl fmt::Debug for TrustBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustBoundary")
            .field("namespace", &self.namespace)
            .field("runtime", &self.runtime)
            .field("definitions", &self.defined.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_namespace_predeclared() {
        let modules = ModuleRegistry::new();
        let runtime = modules.runtime_namespace();
        assert_eq!(runtime.name(), RUNTIME_NAMESPACE);
        assert_eq!(modules.namespace(RUNTIME_NAMESPACE), Some(runtime));
        assert_eq!(modules.namespace_count(), 1);
    }

    #[test]
    fn test_declare_twice_fails() {
        let modules = ModuleRegistry::new();
        let first = modules.declare_namespace("app.one").unwrap();
        assert_ne!(first.id(), modules.runtime_namespace().id());
        assert!(matches!(
            modules.declare_namespace("app.one"),
            Err(Error::NamespaceError(_))
        ));
    }

    #[test]
    fn test_grant_requires_declared_namespaces() {
        let modules = ModuleRegistry::new();
        let stranger = NamespaceHandle::new(99, "app.stranger");
        let runtime = modules.runtime_namespace();
        assert!(modules
            .grant_read(&stranger, &runtime, SCRIPTS_PACKAGE)
            .is_err());
        assert!(modules.grants().is_empty());
    }

    #[test]
    fn test_grants_are_directional() {
        let modules = ModuleRegistry::new();
        let runtime = modules.runtime_namespace();
        let plugin = modules.declare_namespace("app.plugin").unwrap();

        modules.grant_read(&plugin, &runtime, SCRIPTS_PACKAGE).unwrap();
        modules.grant_read(&plugin, &runtime, SCRIPTS_PACKAGE).unwrap();

        assert!(modules.can_read(&plugin, &runtime, SCRIPTS_PACKAGE));
        assert!(!modules.can_read(&plugin, &runtime, RUNTIME_PACKAGE));
        assert!(!modules.can_read(&runtime, &plugin, SCRIPTS_PACKAGE));
        assert!(modules.can_read(&plugin, &plugin, "anything"));
        assert_eq!(modules.grants().len(), 1);
    }

    #[test]
    fn test_trust_boundary_grants() {
        let modules = ModuleRegistry::new();
        let boundary = TrustBoundary::establish(&modules).unwrap();

        let runtime = modules.runtime_namespace();
        let structures = boundary.namespace().clone();
        assert_eq!(structures.name(), STRUCTURES_NAMESPACE);

        assert!(boundary.can_address(SCRIPTS_PACKAGE));
        assert!(boundary.can_address(RUNTIME_PACKAGE));
        assert!(!boundary.can_address("strata.internal"));
        assert!(boundary.runtime_can_read_layouts());

        assert!(modules.can_read(&structures, &runtime, SCRIPTS_PACKAGE));
        assert!(modules.can_read(&runtime, &structures, STRUCTURES_PACKAGE));
        assert_eq!(modules.grants().len(), 3);
    }

    #[test]
    fn test_trust_boundary_established_once() {
        let modules = ModuleRegistry::new();
        TrustBoundary::establish(&modules).unwrap();
        assert!(TrustBoundary::establish(&modules).is_err());
    }

    #[test]
    fn test_definitions_recorded() {
        let modules = ModuleRegistry::new();
        let boundary = TrustBoundary::establish(&modules).unwrap();
        boundary.record_definition("strata.structures.Dual$O");
        boundary.record_definition("strata.structures.Single$O");
        assert_eq!(boundary.definition_count(), 2);
    }
}
