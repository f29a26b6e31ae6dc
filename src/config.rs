//! Library configuration.
//!
//! [`StrataConfig`] groups the settings of the two halves of the library:
//!
//! - [`LayoutConfig`] - default field mode and descriptor length limit
//! - [`DispatchConfig`] - host environment profile and classification caching
//!
//! # Presets
//!
//! - [`StrataConfig::strict()`] - dual-field layouts, bean helpers present, cached classification
//! - [`StrataConfig::permissive()`] - single-field layouts, compact host profile
//!
//! # Example
//!
//! ```rust
//! use strata::{config::StrataConfig, layout::FieldMode, options::ValueOption};
//!
//! let config = StrataConfig::from_options(&ValueOption::new(Some("single-fields,max-fields=64")))?;
//! assert_eq!(config.layouts.default_mode, FieldMode::SingleField);
//! assert_eq!(config.layouts.max_fields, 64);
//! # Ok::<(), strata::Error>(())
//! ```

use crate::{
    dispatch::HostEnvironment,
    layout::{FieldMode, DEFAULT_MAX_FIELDS},
    options::ValueOption,
    Error, Result,
};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrataConfig {
    /// Layout synthesis settings
    pub layouts: LayoutConfig,
    /// Dispatch guard settings
    pub dispatch: DispatchConfig,
}

/// Layout synthesis settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Mode used by `get_default_layout`
    pub default_mode: FieldMode,
    /// Maximum number of fields a descriptor may declare
    pub max_fields: usize,
}

/// Dispatch guard settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Whether the host offers the bean-style reflective helpers
    pub bean_helpers: bool,
    /// Whether classification results are cached per host type
    pub classification_cache: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            default_mode: FieldMode::default(),
            max_fields: DEFAULT_MAX_FIELDS,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            bean_helpers: true,
            classification_cache: true,
        }
    }
}

impl StrataConfig {
    /// Dual-field layouts and the full host profile.
    #[must_use]
    pub fn strict() -> Self {
        StrataConfig {
            layouts: LayoutConfig::default().with_default_mode(FieldMode::DualField),
            dispatch: DispatchConfig::default().with_bean_helpers(true),
        }
    }

    /// Single-field layouts and the compact host profile.
    #[must_use]
    pub fn permissive() -> Self {
        StrataConfig {
            layouts: LayoutConfig::default().with_default_mode(FieldMode::SingleField),
            dispatch: DispatchConfig::default().with_bean_helpers(false),
        }
    }

    /// Applies comma-separated flags on top of the default configuration.
    ///
    /// Recognized flags: `dual-fields`, `single-fields`, `no-bean-helpers`,
    /// `no-classification-cache` and `max-fields=<n>`. Later flags override earlier ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOption`] for unknown flags or a bad `max-fields` value.
    pub fn from_options(options: &ValueOption) -> Result<Self> {
        let mut config = StrataConfig::default();
        for token in options.values() {
            config.apply(token.trim())?;
        }
        Ok(config)
    }

    fn apply(&mut self, flag: &str) -> Result<()> {
        match flag {
            "" => {}
            "dual-fields" => self.layouts.default_mode = FieldMode::DualField,
            "single-fields" => self.layouts.default_mode = FieldMode::SingleField,
            "no-bean-helpers" => self.dispatch.bean_helpers = false,
            "no-classification-cache" => self.dispatch.classification_cache = false,
            _ => {
                let Some(value) = flag.strip_prefix("max-fields=") else {
                    return Err(Error::InvalidOption(flag.to_string()));
                };
                self.layouts.max_fields = value
                    .parse()
                    .map_err(|_| Error::InvalidOption(flag.to_string()))?;
            }
        }
        Ok(())
    }
}

impl LayoutConfig {
    /// Sets the default field mode.
    #[must_use]
    pub fn with_default_mode(mut self, mode: FieldMode) -> Self {
        self.default_mode = mode;
        self
    }

    /// Sets the maximum descriptor length.
    #[must_use]
    pub fn with_max_fields(mut self, max_fields: usize) -> Self {
        self.max_fields = max_fields;
        self
    }
}

impl DispatchConfig {
    /// Sets whether the host offers the bean helper types.
    #[must_use]
    pub fn with_bean_helpers(mut self, enabled: bool) -> Self {
        self.bean_helpers = enabled;
        self
    }

    /// Sets whether classification results are cached.
    #[must_use]
    pub fn with_classification_cache(mut self, enabled: bool) -> Self {
        self.classification_cache = enabled;
        self
    }

    /// The host profile described by this configuration.
    #[must_use]
    pub fn environment(&self) -> HostEnvironment {
        HostEnvironment {
            bean_helpers: self.bean_helpers,
        }
    }
}
