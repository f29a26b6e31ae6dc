//! Field storage modes and canonical layout names.
//!
//! Every generated layout lives under the [`STRUCTURES_PACKAGE`] namespace and is named
//! `prefix + descriptor`, where the prefix encodes the [`FieldMode`]. The two prefixes are
//! chosen so that neither is a prefix of the other; a name can therefore be routed to exactly
//! one mode, or to none.
//!
//! | Mode | Prefix | Example |
//! |------|--------|---------|
//! | [`FieldMode::DualField`] | [`DUAL_FIELD_PREFIX`] | `strata.structures.Dual$OOI` |
//! | [`FieldMode::SingleField`] | [`SINGLE_FIELD_PREFIX`] | `strata.structures.Single$OOI` |

use strum::{Display, EnumIter};

/// Package that hosts all generated layouts.
pub const STRUCTURES_PACKAGE: &str = "strata.structures";

/// Canonical name prefix of dual-field layouts.
pub const DUAL_FIELD_PREFIX: &str = "strata.structures.Dual$";

/// Canonical name prefix of single-field layouts.
pub const SINGLE_FIELD_PREFIX: &str = "strata.structures.Single$";

/// Storage strategy of a generated layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter)]
pub enum FieldMode {
    /// Primitive fields are stored unboxed, with an object overflow slot per primitive field.
    #[default]
    #[strum(serialize = "dual")]
    DualField,
    /// Every field is stored as an object reference.
    #[strum(serialize = "single")]
    SingleField,
}

impl FieldMode {
    /// Canonical name prefix for this mode.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            FieldMode::DualField => DUAL_FIELD_PREFIX,
            FieldMode::SingleField => SINGLE_FIELD_PREFIX,
        }
    }

    /// Builds the canonical layout name for `descriptor` in this mode.
    #[must_use]
    pub fn canonical_name(self, descriptor: &str) -> String {
        let prefix = self.prefix();
        let mut name = String::with_capacity(prefix.len() + descriptor.len());
        name.push_str(prefix);
        name.push_str(descriptor);
        name
    }

    /// Routes a canonical name to its mode and descriptor part.
    ///
    /// Returns `None` when `name` carries neither prefix.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use strata::layout::FieldMode;
    ///
    /// let (mode, descriptor) = FieldMode::route("strata.structures.Dual$OOI").unwrap();
    /// assert_eq!(mode, FieldMode::DualField);
    /// assert_eq!(descriptor, "OOI");
    ///
    /// assert!(FieldMode::route("app.Point").is_none());
    /// ```
    #[must_use]
    pub fn route(name: &str) -> Option<(FieldMode, &str)> {
        if let Some(descriptor) = name.strip_prefix(DUAL_FIELD_PREFIX) {
            Some((FieldMode::DualField, descriptor))
        } else {
            name.strip_prefix(SINGLE_FIELD_PREFIX)
                .map(|descriptor| (FieldMode::SingleField, descriptor))
        }
    }
}

/// Returns `true` if `name` denotes a dual-field structure layout.
#[must_use]
pub fn is_dual_field_name(name: &str) -> bool {
    name.starts_with(DUAL_FIELD_PREFIX)
}

/// Returns `true` if `name` denotes a single-field structure layout.
#[must_use]
pub fn is_single_field_name(name: &str) -> bool {
    name.starts_with(SINGLE_FIELD_PREFIX)
}

/// Returns `true` if `name` denotes any structure layout.
#[must_use]
pub fn is_structure_name(name: &str) -> bool {
    is_dual_field_name(name) || is_single_field_name(name)
}
