//! Registry of host types visible to dispatched call sites.
//!
//! The registry owns every [`HostType`] the guard classifies. It is created with the
//! well-known introspection types already registered, in the same way the runtime's own meta
//! types always exist. The bean-style reflective helpers are only registered if the
//! [`HostEnvironment`] offers them.
//!
//! # Thread Safety
//!
//! - Primary storage in a `SkipMap` keyed by [`HostTypeId`]
//! - Name index in a `DashMap`
//! - Identities handed out by an atomic counter
//!
//! # Examples
//!
//! ```rust
//! use strata::dispatch::{HostEnvironment, HostTypeFlags, HostTypeRegistry, CLASS_LOADER_TYPE};
//!
//! let registry = HostTypeRegistry::new(HostEnvironment::default())?;
//! let loader = registry.get_by_name(CLASS_LOADER_TYPE).unwrap();
//!
//! let custom = registry.define("app.PluginLoader", Some(&loader), &[], HostTypeFlags::empty())?;
//! assert!(custom.is_assignable_to(&loader));
//! # Ok::<(), strata::Error>(())
//! ```

use std::{
    fmt,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;

use crate::{
    dispatch::types::{HostType, HostTypeFlags, HostTypeId, HostTypeRc},
    Error, Result,
};

/// Root of the host type hierarchy.
pub const OBJECT_TYPE: &str = "host.lang.Object";
/// The runtime's class meta-object.
pub const CLASS_TYPE: &str = "host.lang.Class";
/// Base of all class loaders.
pub const CLASS_LOADER_TYPE: &str = "host.lang.ClassLoader";
/// Base of all generated proxies.
pub const PROXY_TYPE: &str = "host.lang.reflect.Proxy";
/// Reserved namespace of the general reflection facility.
pub const REFLECT_NAMESPACE: &str = "host.lang.reflect.";
/// Reserved namespace of the method-handle invocation facility.
pub const INVOKE_NAMESPACE: &str = "host.lang.invoke.";
/// Namespace generated proxy types are named in.
pub const PROXY_NAMESPACE: &str = "host.proxy.";
/// Bean-style reflective statement helper.
pub const BEAN_STATEMENT_TYPE: &str = "host.beans.Statement";
/// Bean-style reflective XML encoder.
pub const BEAN_XML_ENCODER_TYPE: &str = "host.beans.XMLEncoder";
/// Bean-style reflective XML decoder.
pub const BEAN_XML_DECODER_TYPE: &str = "host.beans.XMLDecoder";

/// The bean helper types, in registration order.
pub const BEAN_HELPER_TYPES: [&str; 3] = [
    BEAN_STATEMENT_TYPE,
    BEAN_XML_ENCODER_TYPE,
    BEAN_XML_DECODER_TYPE,
];

/// Description of what the host environment provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostEnvironment {
    /// Whether the bean-style reflective helper types exist in this host
    pub bean_helpers: bool,
}

impl Default for HostEnvironment {
    fn default() -> Self {
        HostEnvironment { bean_helpers: true }
    }
}

impl HostEnvironment {
    /// A reduced host profile without the bean helper types.
    #[must_use]
    pub fn compact() -> Self {
        HostEnvironment {
            bean_helpers: false,
        }
    }
}

/// Central registry of host types.
pub struct HostTypeRegistry {
    types: SkipMap<HostTypeId, HostTypeRc>,
    by_name: DashMap<String, HostTypeId>,
    next_id: AtomicU32,
    next_proxy: AtomicU32,
    environment: HostEnvironment,
}

impl HostTypeRegistry {
    /// Creates a registry with the well-known host types registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the well-known types cannot be registered, which indicates an
    /// internal inconsistency.
    pub fn new(environment: HostEnvironment) -> Result<Self> {
        let registry = HostTypeRegistry {
            types: SkipMap::new(),
            by_name: DashMap::new(),
            next_id: AtomicU32::new(1),
            next_proxy: AtomicU32::new(0),
            environment,
        };

        registry.initialize_well_known()?;
        Ok(registry)
    }

    fn initialize_well_known(&self) -> Result<()> {
        let object = self.insert(OBJECT_TYPE, None, Vec::new(), HostTypeFlags::empty())?;
        self.insert(CLASS_TYPE, Some(object.clone()), Vec::new(), HostTypeFlags::FINAL)?;
        self.insert(
            CLASS_LOADER_TYPE,
            Some(object.clone()),
            Vec::new(),
            HostTypeFlags::empty(),
        )?;
        self.insert(PROXY_TYPE, Some(object.clone()), Vec::new(), HostTypeFlags::empty())?;

        let member = self.insert(
            "host.lang.reflect.Member",
            None,
            Vec::new(),
            HostTypeFlags::INTERFACE,
        )?;
        for name in [
            "host.lang.reflect.Method",
            "host.lang.reflect.Field",
            "host.lang.reflect.Constructor",
        ] {
            self.insert(
                name,
                Some(object.clone()),
                vec![member.clone()],
                HostTypeFlags::FINAL,
            )?;
        }
        self.insert(
            "host.lang.invoke.MethodHandle",
            Some(object.clone()),
            Vec::new(),
            HostTypeFlags::empty(),
        )?;
        self.insert(
            "host.lang.invoke.MethodHandles$Lookup",
            Some(object.clone()),
            Vec::new(),
            HostTypeFlags::FINAL,
        )?;

        if self.environment.bean_helpers {
            for name in BEAN_HELPER_TYPES {
                self.insert(name, Some(object.clone()), Vec::new(), HostTypeFlags::empty())?;
            }
        }

        Ok(())
    }

    fn insert(
        &self,
        name: &str,
        base: Option<HostTypeRc>,
        interfaces: Vec<HostTypeRc>,
        flags: HostTypeFlags,
    ) -> Result<HostTypeRc> {
        match self.by_name.entry(name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(Error::TypeInsert(name.to_string())),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let id = HostTypeId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
                let host_type = Arc::new(HostType::new(
                    id,
                    name.to_string(),
                    base,
                    interfaces,
                    flags,
                ));
                self.types.insert(id, host_type.clone());
                slot.insert(id);
                Ok(host_type)
            }
        }
    }

    fn check_owned(&self, host_type: &HostTypeRc) -> Result<()> {
        if self.owns(host_type) {
            Ok(())
        } else {
            Err(Error::TypeNotFound(host_type.name().to_string()))
        }
    }

    /// Defines a new host type.
    ///
    /// [`HostTypeFlags::GENERATED_PROXY`] is stripped from `flags`; only
    /// [`HostTypeRegistry::define_proxy_class`] produces generated proxies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeInsert`] if the name is taken or the base type is final, and
    /// [`Error::TypeNotFound`] if the base type or an interface belongs to another registry.
    pub fn define(
        &self,
        name: &str,
        base: Option<&HostTypeRc>,
        interfaces: &[HostTypeRc],
        flags: HostTypeFlags,
    ) -> Result<HostTypeRc> {
        let base = match base {
            Some(base) => {
                self.check_owned(base)?;
                if base.flags().contains(HostTypeFlags::FINAL) {
                    return Err(Error::TypeInsert(format!(
                        "{name} cannot derive from final type {base}"
                    )));
                }
                base.clone()
            }
            None => self.object_type()?,
        };
        for interface in interfaces {
            self.check_owned(interface)?;
        }

        self.insert(
            name,
            Some(base),
            interfaces.to_vec(),
            flags - HostTypeFlags::GENERATED_PROXY,
        )
    }

    /// Generates a proxy type implementing `interfaces`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeInsert`] if any of `interfaces` is not an interface.
    pub fn define_proxy_class(&self, interfaces: &[HostTypeRc]) -> Result<HostTypeRc> {
        for interface in interfaces {
            self.check_owned(interface)?;
            if !interface.is_interface() {
                return Err(Error::TypeInsert(format!(
                    "{interface} is not an interface"
                )));
            }
        }

        let proxy_base = self
            .get_by_name(PROXY_TYPE)
            .ok_or_else(|| malformed_error!("Proxy base type is missing"))?;
        let name = format!(
            "{PROXY_NAMESPACE}$Proxy{}",
            self.next_proxy.fetch_add(1, Ordering::Relaxed)
        );

        let proxy = self.insert(
            &name,
            Some(proxy_base),
            interfaces.to_vec(),
            HostTypeFlags::GENERATED_PROXY | HostTypeFlags::FINAL,
        )?;
        log::debug!("generated proxy type {} ({})", proxy.name(), proxy.id());
        Ok(proxy)
    }

    /// Returns `true` if `host_type` is a proxy produced by this registry's proxy factory.
    #[must_use]
    pub fn is_proxy_class(&self, host_type: &HostTypeRc) -> bool {
        host_type.flags().contains(HostTypeFlags::GENERATED_PROXY) && self.owns(host_type)
    }

    /// Returns `true` if `host_type` is the instance registered in this registry.
    #[must_use]
    pub fn owns(&self, host_type: &HostTypeRc) -> bool {
        self.types
            .get(&host_type.id())
            .is_some_and(|entry| Arc::ptr_eq(entry.value(), host_type))
    }

    /// Looks up a type by identity.
    #[must_use]
    pub fn get(&self, id: HostTypeId) -> Option<HostTypeRc> {
        self.types.get(&id).map(|entry| entry.value().clone())
    }

    /// Looks up a type by fully-qualified name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<HostTypeRc> {
        let id = *self.by_name.get(name)?.value();
        self.get(id)
    }

    /// The root object type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the registry was not initialized.
    pub fn object_type(&self) -> Result<HostTypeRc> {
        self.get_by_name(OBJECT_TYPE)
            .ok_or_else(|| malformed_error!("Object type is missing"))
    }

    /// The environment this registry was created for.
    #[must_use]
    pub fn environment(&self) -> HostEnvironment {
        self.environment
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All registered types in identity order.
    #[must_use]
    pub fn all_types(&self) -> Vec<HostTypeRc> {
        self.types
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl fmt::Debug for HostTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostTypeRegistry")
            .field("types", &self.types.len())
            .field("environment", &self.environment)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_types() {
        let registry = HostTypeRegistry::new(HostEnvironment::default()).unwrap();
        let object = registry.object_type().unwrap();

        for name in [CLASS_TYPE, CLASS_LOADER_TYPE, PROXY_TYPE] {
            let host_type = registry.get_by_name(name).unwrap();
            assert!(host_type.is_assignable_to(&object), "{name}");
        }
        for name in BEAN_HELPER_TYPES {
            assert!(registry.get_by_name(name).is_some(), "{name}");
        }

        let method = registry.get_by_name("host.lang.reflect.Method").unwrap();
        let member = registry.get_by_name("host.lang.reflect.Member").unwrap();
        assert!(method.is_assignable_to(&member));
    }

    #[test]
    fn test_compact_environment_has_no_beans() {
        let registry = HostTypeRegistry::new(HostEnvironment::compact()).unwrap();
        for name in BEAN_HELPER_TYPES {
            assert!(registry.get_by_name(name).is_none());
        }
        assert!(registry.get_by_name(CLASS_TYPE).is_some());
    }

    #[test]
    fn test_define_and_lookup() {
        let registry = HostTypeRegistry::new(HostEnvironment::default()).unwrap();
        let before = registry.len();

        let point = registry
            .define("app.Point", None, &[], HostTypeFlags::empty())
            .unwrap();
        assert_eq!(registry.len(), before + 1);
        assert_eq!(point.base().unwrap().name(), OBJECT_TYPE);
        assert!(Arc::ptr_eq(&registry.get(point.id()).unwrap(), &point));
        assert!(Arc::ptr_eq(&registry.get_by_name("app.Point").unwrap(), &point));

        assert!(matches!(
            registry.define("app.Point", None, &[], HostTypeFlags::empty()),
            Err(Error::TypeInsert(_))
        ));
    }

    #[test]
    fn test_cannot_derive_from_final() {
        let registry = HostTypeRegistry::new(HostEnvironment::default()).unwrap();
        let class = registry.get_by_name(CLASS_TYPE).unwrap();
        assert!(registry
            .define("app.FakeClass", Some(&class), &[], HostTypeFlags::empty())
            .is_err());
    }

    #[test]
    fn test_generated_proxy_flag_cannot_be_forged() {
        let registry = HostTypeRegistry::new(HostEnvironment::default()).unwrap();
        let proxy_base = registry.get_by_name(PROXY_TYPE).unwrap();

        let forged = registry
            .define(
                "app.FakeProxy",
                Some(&proxy_base),
                &[],
                HostTypeFlags::GENERATED_PROXY,
            )
            .unwrap();
        assert!(!forged.flags().contains(HostTypeFlags::GENERATED_PROXY));
        assert!(!registry.is_proxy_class(&forged));
        assert!(!registry.is_proxy_class(&proxy_base));
    }

    #[test]
    fn test_proxy_factory() {
        let registry = HostTypeRegistry::new(HostEnvironment::default()).unwrap();
        let runnable = registry
            .define("app.Runnable", None, &[], HostTypeFlags::INTERFACE)
            .unwrap();

        let first = registry.define_proxy_class(&[runnable.clone()]).unwrap();
        let second = registry.define_proxy_class(&[runnable.clone()]).unwrap();

        assert!(registry.is_proxy_class(&first));
        assert!(first.name().starts_with(PROXY_NAMESPACE));
        assert_ne!(first.name(), second.name());
        assert!(first.is_assignable_to(&runnable));
        assert!(first.is_assignable_to(&registry.get_by_name(PROXY_TYPE).unwrap()));

        let point = registry
            .define("app.Point", None, &[], HostTypeFlags::empty())
            .unwrap();
        assert!(registry.define_proxy_class(&[point]).is_err());
    }

    #[test]
    fn test_foreign_types_are_rejected() {
        let ours = HostTypeRegistry::new(HostEnvironment::default()).unwrap();
        let theirs = HostTypeRegistry::new(HostEnvironment::default()).unwrap();

        let foreign_proxy = theirs.define_proxy_class(&[]).unwrap();
        assert!(theirs.is_proxy_class(&foreign_proxy));
        assert!(!ours.is_proxy_class(&foreign_proxy));
        assert!(!ours.owns(&foreign_proxy));

        let foreign_object = theirs.object_type().unwrap();
        assert!(matches!(
            ours.define("app.X", Some(&foreign_object), &[], HostTypeFlags::empty()),
            Err(Error::TypeNotFound(_))
        ));
    }
}
