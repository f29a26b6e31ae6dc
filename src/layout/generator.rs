//! Builds [`GeneratedLayout`]s from descriptors.
//!
//! The generator plans the slot table of a layout. It performs no caching; deduplication is
//! the synthesizer's responsibility.

use crate::{
    layout::{
        descriptor::{ShapeDescriptor, DEFAULT_MAX_FIELDS},
        mode::FieldMode,
        namespace::{TrustBoundary, RUNTIME_PACKAGE, SCRIPTS_PACKAGE},
        structure::{FieldSlot, GeneratedLayout},
    },
    Result,
};

/// Plans slot tables for one [`FieldMode`].
#[derive(Debug, Clone, Copy)]
pub struct LayoutGenerator {
    mode: FieldMode,
    max_fields: usize,
}

impl LayoutGenerator {
    /// Creates a generator for `mode` with the default field limit.
    #[must_use]
    pub fn new(mode: FieldMode) -> Self {
        LayoutGenerator {
            mode,
            max_fields: DEFAULT_MAX_FIELDS,
        }
    }

    /// Sets the maximum number of fields a descriptor may declare.
    #[must_use]
    pub fn with_max_fields(mut self, max_fields: usize) -> Self {
        self.max_fields = max_fields;
        self
    }

    /// Generates the layout named `name` for `descriptor` inside `boundary`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LayoutGeneration`] if the descriptor is malformed or too long,
    /// or if the boundary cannot address the runtime packages the layout depends on.
    pub fn generate(
        &self,
        name: &str,
        descriptor: &str,
        boundary: &TrustBoundary,
    ) -> Result<GeneratedLayout> {
        self.check_boundary(name, boundary)?;

        let shape = ShapeDescriptor::parse_bounded(descriptor, self.max_fields).map_err(|e| {
            match e {
                crate::Error::LayoutGeneration { message, .. } => layout_error!(name, message),
                other => other,
            }
        })?;

        let slots = self.plan(&shape);
        Ok(GeneratedLayout::new(
            name.to_string(),
            shape,
            self.mode,
            slots,
            boundary.namespace().clone(),
        ))
    }

    fn check_boundary(&self, name: &str, boundary: &TrustBoundary) -> Result<()> {
        if !boundary.runtime_can_read_layouts() {
            return Err(layout_error!(name, "runtime cannot read generated layouts"));
        }

        // Unboxed storage lives in runtime-owned primitives
        let required: &[&str] = match self.mode {
            FieldMode::DualField => &[SCRIPTS_PACKAGE, RUNTIME_PACKAGE],
            FieldMode::SingleField => &[SCRIPTS_PACKAGE],
        };
        for package in required {
            if !boundary.can_address(package) {
                return Err(layout_error!(
                    name,
                    "{} is not readable from {}",
                    package,
                    boundary.namespace()
                ));
            }
        }

        Ok(())
    }

    fn plan(&self, shape: &ShapeDescriptor) -> Vec<FieldSlot> {
        let mut next_primitive = 0;
        shape
            .kinds()
            .iter()
            .enumerate()
            .map(|(object, &kind)| {
                let primitive = if self.mode == FieldMode::DualField && kind.is_primitive() {
                    next_primitive += 1;
                    Some(next_primitive - 1)
                } else {
                    None
                };
                FieldSlot {
                    kind,
                    primitive,
                    object,
                }
            })
            .collect()
    }
}
