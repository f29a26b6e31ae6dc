//! Sensitive type classification.
//!
//! Decides whether a host type belongs to the closed set of introspection facilities scripts
//! must not reach while a security policy is active, and which [`TargetCategory`] a link
//! target falls into. Results are cached per [`HostTypeId`].

use std::sync::Arc;

use dashmap::DashMap;
use strum::{Display, EnumIter};

use crate::{
    dispatch::{
        registry::{
            HostTypeRegistry, BEAN_HELPER_TYPES, CLASS_LOADER_TYPE, CLASS_TYPE,
            INVOKE_NAMESPACE, PROXY_TYPE, REFLECT_NAMESPACE,
        },
        types::{HostTypeId, HostTypeRc},
    },
    Result,
};

/// The families of sensitive introspection types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum SensitiveTypeClass {
    /// The class meta-object or a class loader
    #[strum(serialize = "meta-object")]
    MetaObject,
    /// Bean-style reflective statement and XML codec helpers
    #[strum(serialize = "bean-reflection")]
    BeanReflection,
    /// Anything in the reserved reflection or invocation namespaces
    #[strum(serialize = "reflective-namespace")]
    ReflectiveNamespace,
}

/// How a link target is treated by the reflective access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetCategory {
    /// Not sensitive, never checked
    Ordinary,
    /// A proxy produced by the registry's factory; only static access is checked
    GenuineProxy,
    /// Derives from the proxy base without being a generated proxy; always checked
    ForgedProxy,
    /// A sensitive introspection type; always checked
    Sensitive(SensitiveTypeClass),
}

impl TargetCategory {
    /// Returns `true` if access with the given staticness needs the reflective check.
    #[must_use]
    pub fn requires_check(self, is_static: bool) -> bool {
        match self {
            TargetCategory::Ordinary => false,
            TargetCategory::GenuineProxy => is_static,
            TargetCategory::ForgedProxy | TargetCategory::Sensitive(_) => true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Classification {
    sensitive: Option<SensitiveTypeClass>,
    category: TargetCategory,
}

/// Classifies host types of one [`HostTypeRegistry`].
///
/// Types that belong to a different registry are classified by walking their hierarchy
/// against this registry's anchors but are never cached, because their identities may
/// collide with ours.
pub struct SensitiveTypeClassifier {
    registry: Arc<HostTypeRegistry>,
    class_type: HostTypeRc,
    class_loader_type: HostTypeRc,
    proxy_type: HostTypeRc,
    bean_types: Vec<HostTypeRc>,
    cache: Option<DashMap<HostTypeId, Classification>>,
}

impl SensitiveTypeClassifier {
    /// Creates a caching classifier for `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the registry lacks its well-known types.
    pub fn new(registry: Arc<HostTypeRegistry>) -> Result<Self> {
        Self::with_cache(registry, true)
    }

    /// Creates a classifier, optionally without the per-type cache.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the registry lacks its well-known types.
    pub fn with_cache(registry: Arc<HostTypeRegistry>, cache: bool) -> Result<Self> {
        let anchor = |name: &str| {
            registry
                .get_by_name(name)
                .ok_or_else(|| malformed_error!("Well-known type {} is missing", name))
        };

        let class_type = anchor(CLASS_TYPE)?;
        let class_loader_type = anchor(CLASS_LOADER_TYPE)?;
        let proxy_type = anchor(PROXY_TYPE)?;
        let bean_types = BEAN_HELPER_TYPES
            .iter()
            .filter_map(|name| registry.get_by_name(name))
            .collect();

        Ok(SensitiveTypeClassifier {
            registry,
            class_type,
            class_loader_type,
            proxy_type,
            bean_types,
            cache: cache.then(DashMap::new),
        })
    }

    /// The registry whose types this classifier caches.
    #[must_use]
    pub fn registry(&self) -> &Arc<HostTypeRegistry> {
        &self.registry
    }

    /// Returns `true` if `target` is a sensitive introspection type.
    #[must_use]
    pub fn classify(&self, target: &HostTypeRc) -> bool {
        self.sensitive_class(target).is_some()
    }

    /// The sensitive family `target` belongs to, if any.
    #[must_use]
    pub fn sensitive_class(&self, target: &HostTypeRc) -> Option<SensitiveTypeClass> {
        self.lookup(target).sensitive
    }

    /// The [`TargetCategory`] of `target`.
    #[must_use]
    pub fn category(&self, target: &HostTypeRc) -> TargetCategory {
        self.lookup(target).category
    }

    /// Returns `true` if accessing `target` needs the reflective check.
    #[must_use]
    pub fn requires_check(&self, target: &HostTypeRc, is_static: bool) -> bool {
        self.category(target).requires_check(is_static)
    }

    /// Number of cached classifications.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.as_ref().map_or(0, DashMap::len)
    }

    fn lookup(&self, target: &HostTypeRc) -> Classification {
        let Some(cache) = &self.cache else {
            return self.compute(target);
        };
        if !self.registry.owns(target) {
            return self.compute(target);
        }

        if let Some(hit) = cache.get(&target.id()) {
            return *hit.value();
        }
        let computed = self.compute(target);
        *cache.entry(target.id()).or_insert(computed).value()
    }

    fn compute(&self, target: &HostTypeRc) -> Classification {
        let sensitive = self.compute_sensitive(target);

        let category = if target.is_assignable_to(&self.proxy_type) {
            if self.registry.is_proxy_class(target) {
                TargetCategory::GenuineProxy
            } else {
                TargetCategory::ForgedProxy
            }
        } else if let Some(class) = sensitive {
            TargetCategory::Sensitive(class)
        } else {
            TargetCategory::Ordinary
        };

        Classification {
            sensitive,
            category,
        }
    }

    fn compute_sensitive(&self, target: &HostTypeRc) -> Option<SensitiveTypeClass> {
        if target.is_assignable_to(&self.class_type)
            || target.is_assignable_to(&self.class_loader_type)
        {
            return Some(SensitiveTypeClass::MetaObject);
        }

        if self
            .bean_types
            .iter()
            .any(|bean| target.is_assignable_to(bean))
        {
            return Some(SensitiveTypeClass::BeanReflection);
        }

        let name = target.name();
        if name.starts_with(REFLECT_NAMESPACE) || name.starts_with(INVOKE_NAMESPACE) {
            return Some(SensitiveTypeClass::ReflectiveNamespace);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{
        registry::{HostEnvironment, BEAN_STATEMENT_TYPE, BEAN_XML_DECODER_TYPE},
        types::HostTypeFlags,
    };

    fn classifier(environment: HostEnvironment) -> SensitiveTypeClassifier {
        let registry = Arc::new(HostTypeRegistry::new(environment).unwrap());
        SensitiveTypeClassifier::new(registry).unwrap()
    }

    fn named(classifier: &SensitiveTypeClassifier, name: &str) -> HostTypeRc {
        classifier.registry().get_by_name(name).unwrap()
    }

    #[test]
    fn test_meta_objects() {
        let classifier = classifier(HostEnvironment::default());
        let registry = classifier.registry().clone();

        assert_eq!(
            classifier.sensitive_class(&named(&classifier, CLASS_TYPE)),
            Some(SensitiveTypeClass::MetaObject)
        );

        let loader = named(&classifier, CLASS_LOADER_TYPE);
        let custom = registry
            .define("app.PluginLoader", Some(&loader), &[], HostTypeFlags::empty())
            .unwrap();
        assert!(classifier.classify(&loader));
        assert!(classifier.classify(&custom));
        assert_eq!(
            classifier.category(&custom),
            TargetCategory::Sensitive(SensitiveTypeClass::MetaObject)
        );
    }

    #[test]
    fn test_reflective_namespaces() {
        let classifier = classifier(HostEnvironment::default());
        let registry = classifier.registry().clone();

        for name in ["host.lang.reflect.Method", "host.lang.invoke.MethodHandle"] {
            assert_eq!(
                classifier.sensitive_class(&named(&classifier, name)),
                Some(SensitiveTypeClass::ReflectiveNamespace),
                "{name}"
            );
        }

        let extra = registry
            .define("host.lang.invoke.CallSite", None, &[], HostTypeFlags::empty())
            .unwrap();
        assert!(classifier.classify(&extra));

        // Similar prefix without the namespace separator
        let lookalike = registry
            .define("host.lang.reflection.Helper", None, &[], HostTypeFlags::empty())
            .unwrap();
        assert!(!classifier.classify(&lookalike));
    }

    #[test]
    fn test_bean_helpers_depend_on_environment() {
        let full = classifier(HostEnvironment::default());
        let statement = named(&full, BEAN_STATEMENT_TYPE);
        assert_eq!(
            full.sensitive_class(&statement),
            Some(SensitiveTypeClass::BeanReflection)
        );
        let decoder = named(&full, BEAN_XML_DECODER_TYPE);
        let derived = full
            .registry()
            .define("app.Decoder", Some(&decoder), &[], HostTypeFlags::empty())
            .unwrap();
        assert!(full.classify(&derived));

        let compact = classifier(HostEnvironment::compact());
        let look_alike = compact
            .registry()
            .define(BEAN_STATEMENT_TYPE, None, &[], HostTypeFlags::empty())
            .unwrap();
        assert!(!compact.classify(&look_alike));
    }

    #[test]
    fn test_ordinary_types() {
        let classifier = classifier(HostEnvironment::default());
        let point = classifier
            .registry()
            .define("app.Point", None, &[], HostTypeFlags::empty())
            .unwrap();
        assert!(!classifier.classify(&point));
        assert_eq!(classifier.category(&point), TargetCategory::Ordinary);
        assert!(!classifier.requires_check(&point, true));
        assert!(!classifier.requires_check(&point, false));

        let object = classifier.registry().object_type().unwrap();
        assert!(!classifier.classify(&object));
    }

    #[test]
    fn test_proxy_asymmetry() {
        let classifier = classifier(HostEnvironment::default());
        let registry = classifier.registry().clone();
        let proxy_base = named(&classifier, PROXY_TYPE);

        let genuine = registry.define_proxy_class(&[]).unwrap();
        assert_eq!(classifier.category(&genuine), TargetCategory::GenuineProxy);
        assert!(classifier.requires_check(&genuine, true));
        assert!(!classifier.requires_check(&genuine, false));

        let forged = registry
            .define("app.FakeProxy", Some(&proxy_base), &[], HostTypeFlags::empty())
            .unwrap();
        assert_eq!(classifier.category(&forged), TargetCategory::ForgedProxy);
        assert!(classifier.requires_check(&forged, true));
        assert!(classifier.requires_check(&forged, false));

        // The base itself lives in the reflection namespace and is not generated
        assert_eq!(classifier.category(&proxy_base), TargetCategory::ForgedProxy);
        assert!(classifier.classify(&proxy_base));
        assert!(!classifier.classify(&genuine));
    }

    #[test]
    fn test_foreign_proxy_is_forged() {
        let classifier = classifier(HostEnvironment::default());
        let other = HostTypeRegistry::new(HostEnvironment::default()).unwrap();
        let foreign = other.define_proxy_class(&[]).unwrap();

        // Derives from an identical proxy base but was not generated here
        assert_eq!(classifier.category(&foreign), TargetCategory::ForgedProxy);
        assert!(classifier.requires_check(&foreign, false));
        assert_eq!(classifier.cached(), 0);
    }

    #[test]
    fn test_cache() {
        let classifier = classifier(HostEnvironment::default());
        let class = named(&classifier, CLASS_TYPE);

        assert_eq!(classifier.cached(), 0);
        assert!(classifier.classify(&class));
        assert!(classifier.classify(&class));
        assert_eq!(classifier.cached(), 1);

        let registry = classifier.registry().clone();
        let uncached = SensitiveTypeClassifier::with_cache(registry, false).unwrap();
        assert!(uncached.classify(&class));
        assert_eq!(uncached.cached(), 0);
    }
}
