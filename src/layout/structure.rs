//! Generated structure layouts and the objects allocated against them.
//!
//! A [`GeneratedLayout`] is the runtime-constructed replacement for a generated class: it
//! records the field kinds, the mode, and where each field lives inside an instance. Field
//! access goes through the generic accessors on [`LayoutInstance`], parameterized by the
//! layout's slot table.
//!
//! # Instance Storage
//!
//! ```text
//! dual-field "OIJ"                      single-field "OIJ"
//!   primitives: [ I bits | J bits ]       primitives: []
//!   boxed:      [ bool   | bool   ]       boxed:      []
//!   objects:    [ O | I ovf | J ovf ]     objects:    [ O | I | J ]
//! ```
//!
//! In dual-field mode a primitive field holds its value unboxed while the stored value matches
//! the field kind. Any other value goes to the field's object overflow slot and the field is
//! marked boxed until a matching primitive is written again.

use std::{fmt, sync::Arc};

use crate::{
    layout::{
        descriptor::{FieldKind, ShapeDescriptor},
        mode::FieldMode,
        namespace::NamespaceHandle,
        value::Value,
    },
    Error, Result,
};

/// Location of a single field inside a [`LayoutInstance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSlot {
    /// Declared kind of the field
    pub kind: FieldKind,
    /// Index into the unboxed primitive storage, dual-field primitives only
    pub primitive: Option<usize>,
    /// Index into the object storage (the overflow slot for dual-field primitives)
    pub object: usize,
}

/// An immutable storage layout shared by every object of the same shape.
///
/// Layouts are created by the [`LayoutSynthesizer`](crate::layout::LayoutSynthesizer) and live
/// for the rest of the process. They are safe to instantiate from any number of threads.
pub struct GeneratedLayout {
    name: String,
    descriptor: ShapeDescriptor,
    mode: FieldMode,
    slots: Vec<FieldSlot>,
    primitive_slots: usize,
    object_slots: usize,
    namespace: NamespaceHandle,
}

impl GeneratedLayout {
    pub(crate) fn new(
        name: String,
        descriptor: ShapeDescriptor,
        mode: FieldMode,
        slots: Vec<FieldSlot>,
        namespace: NamespaceHandle,
    ) -> Self {
        let primitive_slots = slots.iter().filter(|s| s.primitive.is_some()).count();
        let object_slots = slots.len();

        GeneratedLayout {
            name,
            descriptor,
            mode,
            slots,
            primitive_slots,
            object_slots,
            namespace,
        }
    }

    /// Canonical name, `prefix(mode) + descriptor`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The descriptor this layout was generated from.
    #[must_use]
    pub fn descriptor(&self) -> &ShapeDescriptor {
        &self.descriptor
    }

    /// Storage mode of this layout.
    #[must_use]
    pub fn mode(&self) -> FieldMode {
        self.mode
    }

    /// Number of fields.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.slots.len()
    }

    /// Slot table entry for field `index`.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&FieldSlot> {
        self.slots.get(index)
    }

    /// All slots in field order.
    #[must_use]
    pub fn slots(&self) -> &[FieldSlot] {
        &self.slots
    }

    /// Number of unboxed primitive slots per instance.
    #[must_use]
    pub fn primitive_slots(&self) -> usize {
        self.primitive_slots
    }

    /// Number of object slots per instance.
    #[must_use]
    pub fn object_slots(&self) -> usize {
        self.object_slots
    }

    /// Namespace the layout was defined in.
    #[must_use]
    pub fn namespace(&self) -> &NamespaceHandle {
        &self.namespace
    }

    /// Allocates storage for one object with every field `undefined`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use strata::layout::{FieldMode, LayoutSynthesizer, ModuleRegistry, Value};
    ///
    /// let modules = ModuleRegistry::new();
    /// let synthesizer = LayoutSynthesizer::new(&modules)?;
    /// let layout = synthesizer.get_layout("OI", FieldMode::DualField)?;
    ///
    /// let mut point = layout.instantiate();
    /// point.set(1, Value::Int(42))?;
    /// assert_eq!(point.get(1)?, Value::Int(42));
    /// assert_eq!(point.get(0)?, Value::Undefined);
    /// # Ok::<(), strata::Error>(())
    /// ```
    #[must_use]
    pub fn instantiate(self: &Arc<Self>) -> LayoutInstance {
        LayoutInstance {
            layout: Arc::clone(self),
            primitives: vec![0; self.primitive_slots].into_boxed_slice(),
            boxed: vec![true; self.primitive_slots].into_boxed_slice(),
            objects: vec![Value::Undefined; self.object_slots].into_boxed_slice(),
        }
    }
}

impl fmt::Debug for GeneratedLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedLayout")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("fields", &self.slots.len())
            .field("primitive_slots", &self.primitive_slots)
            .finish()
    }
}

/// Field storage of one object allocated against a [`GeneratedLayout`].
#[derive(Debug, Clone)]
pub struct LayoutInstance {
    layout: Arc<GeneratedLayout>,
    primitives: Box<[u64]>,
    boxed: Box<[bool]>,
    objects: Box<[Value]>,
}

impl LayoutInstance {
    /// The layout this instance was allocated against.
    #[must_use]
    pub fn layout(&self) -> &Arc<GeneratedLayout> {
        &self.layout
    }

    fn slot(&self, index: usize) -> Result<FieldSlot> {
        self.layout
            .slot(index)
            .copied()
            .ok_or(Error::FieldOutOfRange {
                index,
                count: self.layout.field_count(),
            })
    }

    /// Reads field `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldOutOfRange`] if the layout has no such field.
    pub fn get(&self, index: usize) -> Result<Value> {
        let slot = self.slot(index)?;
        match slot.primitive {
            Some(p) if !self.boxed[p] => Ok(Value::from_bits(slot.kind, self.primitives[p])),
            _ => Ok(self.objects[slot.object].clone()),
        }
    }

    /// Writes field `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldOutOfRange`] if the layout has no such field.
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        let slot = self.slot(index)?;
        if let Some(p) = slot.primitive {
            if let Some(bits) = value.to_bits(slot.kind) {
                self.primitives[p] = bits;
                self.boxed[p] = false;
                self.objects[slot.object] = Value::Undefined;
                return Ok(());
            }
            self.boxed[p] = true;
        }

        self.objects[slot.object] = value;
        Ok(())
    }

    /// Returns `true` if field `index` currently holds an unboxed primitive.
    #[must_use]
    pub fn is_unboxed(&self, index: usize) -> bool {
        self.layout
            .slot(index)
            .and_then(|slot| slot.primitive)
            .is_some_and(|p| !self.boxed[p])
    }
}
