//! Host-side type descriptions.
//!
//! A [`HostType`] is what a dynamically linked call site is dispatched against: the receiver
//! type of a property access or method call. Only the information the dispatch guard needs is
//! modelled: identity, fully-qualified name, base type, implemented interfaces and a few flags.

use std::{fmt, sync::Arc};

use bitflags::bitflags;

bitflags! {
    /// Attributes of a host type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HostTypeFlags: u32 {
        /// The type is an interface
        const INTERFACE = 0x0001;
        /// The type cannot be derived from
        const FINAL = 0x0002;
        /// The type was produced by the registry's proxy factory
        const GENERATED_PROXY = 0x0100;
    }
}

/// Stable numeric identity of a host type within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostTypeId(u32);

impl HostTypeId {
    /// Wraps a raw identity value.
    #[must_use]
    pub fn new(value: u32) -> Self {
        HostTypeId(value)
    }

    /// The raw identity value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for HostTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// A reference-counted pointer to a [`HostType`]
pub type HostTypeRc = Arc<HostType>;

/// A host type as seen by the dispatch guard.
///
/// Host types are created through a [`HostTypeRegistry`](crate::dispatch::HostTypeRegistry),
/// which is also the only way to obtain the [`HostTypeFlags::GENERATED_PROXY`] flag.
pub struct HostType {
    id: HostTypeId,
    name: String,
    base: Option<HostTypeRc>,
    interfaces: Vec<HostTypeRc>,
    flags: HostTypeFlags,
}

impl HostType {
    pub(crate) fn new(
        id: HostTypeId,
        name: String,
        base: Option<HostTypeRc>,
        interfaces: Vec<HostTypeRc>,
        flags: HostTypeFlags,
    ) -> Self {
        HostType {
            id,
            name,
            base,
            interfaces,
            flags,
        }
    }

    /// Identity within the owning registry.
    #[must_use]
    pub fn id(&self) -> HostTypeId {
        self.id
    }

    /// Fully-qualified name, e.g. `host.lang.reflect.Method`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The namespace part of the name, empty for unqualified names.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.name
            .rfind('.')
            .map_or("", |split| &self.name[..split])
    }

    /// Direct base type.
    #[must_use]
    pub fn base(&self) -> Option<&HostTypeRc> {
        self.base.as_ref()
    }

    /// Directly implemented interfaces.
    #[must_use]
    pub fn interfaces(&self) -> &[HostTypeRc] {
        &self.interfaces
    }

    /// Type attributes.
    #[must_use]
    pub fn flags(&self) -> HostTypeFlags {
        self.flags
    }

    /// Returns `true` for interfaces.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(HostTypeFlags::INTERFACE)
    }

    /// Returns `true` if `self` is `other` or derives from it through base types or
    /// interfaces.
    #[must_use]
    pub fn is_assignable_to(&self, other: &HostType) -> bool {
        let mut pending: Vec<&HostType> = vec![self];
        while let Some(current) = pending.pop() {
            if current.id == other.id && current.name == other.name {
                return true;
            }
            if let Some(base) = &current.base {
                pending.push(base);
            }
            pending.extend(current.interfaces.iter().map(AsRef::as_ref));
        }
        false
    }
}

impl fmt::Debug for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostType")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("base", &self.base.as_ref().map(|b| b.name()))
            .field("flags", &self.flags)
            .finish()
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
