//! Shape descriptor grammar.
//!
//! A shape descriptor is a compact string in which every character names the storage kind of
//! one field, in positional order. `"OOI"` describes an object with two object slots followed
//! by a 32-bit integer slot; the empty string describes an object without any fields.
//!
//! # Alphabet
//!
//! | Token | Kind | Unboxed storage in dual-field mode |
//! |-------|------|------------------------------------|
//! | `O` | [`FieldKind::Object`] | never |
//! | `I` | [`FieldKind::Int`] | 32-bit integer |
//! | `J` | [`FieldKind::Long`] | 64-bit integer |
//! | `D` | [`FieldKind::Double`] | 64-bit float |
//!
//! Any other character makes the descriptor malformed.

use std::fmt;

use strum::{EnumCount, EnumIter};

use crate::{Error, Result};

/// Default upper bound on the number of fields a single descriptor may declare.
pub const DEFAULT_MAX_FIELDS: usize = 256;

/// Storage kind of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum FieldKind {
    /// Object reference slot
    Object,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 64-bit IEEE-754 float
    Double,
}

impl FieldKind {
    /// Parses a single descriptor token.
    #[must_use]
    pub fn from_token(token: char) -> Option<Self> {
        match token {
            'O' => Some(FieldKind::Object),
            'I' => Some(FieldKind::Int),
            'J' => Some(FieldKind::Long),
            'D' => Some(FieldKind::Double),
            _ => None,
        }
    }

    /// The descriptor token for this kind.
    #[must_use]
    pub fn token(self) -> char {
        match self {
            FieldKind::Object => 'O',
            FieldKind::Int => 'I',
            FieldKind::Long => 'J',
            FieldKind::Double => 'D',
        }
    }

    /// Returns `true` for kinds that can be stored unboxed.
    #[must_use]
    pub fn is_primitive(self) -> bool {
        !matches!(self, FieldKind::Object)
    }
}

/// A parsed, immutable shape descriptor.
///
/// Two descriptors are equal iff their token sequences are equal.
///
/// # Examples
///
/// ```rust
/// use strata::layout::{FieldKind, ShapeDescriptor};
///
/// let shape = ShapeDescriptor::parse("OOI")?;
/// assert_eq!(shape.len(), 3);
/// assert_eq!(shape.kinds()[2], FieldKind::Int);
/// assert_eq!(shape.to_string(), "OOI");
/// # Ok::<(), strata::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeDescriptor {
    kinds: Vec<FieldKind>,
}

impl ShapeDescriptor {
    /// Parses `text` with the default field limit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LayoutGeneration`] if `text` contains a token outside the alphabet or
    /// declares more than [`DEFAULT_MAX_FIELDS`] fields.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_bounded(text, DEFAULT_MAX_FIELDS)
    }

    /// Parses `text`, rejecting descriptors with more than `max_fields` fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LayoutGeneration`] for an invalid token or an oversized descriptor.
    pub fn parse_bounded(text: &str, max_fields: usize) -> Result<Self> {
        let mut kinds = Vec::with_capacity(text.len());
        for (position, token) in text.chars().enumerate() {
            if position >= max_fields {
                return Err(layout_error!(
                    text,
                    "descriptor declares more than {} fields",
                    max_fields
                ));
            }

            let kind = FieldKind::from_token(token).ok_or_else(|| -> Error {
                layout_error!(
                    text,
                    "invalid field token {:?} at position {}",
                    token,
                    position
                )
            })?;
            kinds.push(kind);
        }

        Ok(ShapeDescriptor { kinds })
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Returns `true` for the zero-field descriptor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// The field kinds in positional order.
    #[must_use]
    pub fn kinds(&self) -> &[FieldKind] {
        &self.kinds
    }

    /// Number of fields with a primitive kind.
    #[must_use]
    pub fn primitive_count(&self) -> usize {
        self.kinds.iter().filter(|k| k.is_primitive()).count()
    }
}

impl fmt::Display for ShapeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for kind in &self.kinds {
            write!(f, "{}", kind.token())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_parse_valid() {
        let shape = ShapeDescriptor::parse("OOIJD").unwrap();
        assert_eq!(
            shape.kinds(),
            &[
                FieldKind::Object,
                FieldKind::Object,
                FieldKind::Int,
                FieldKind::Long,
                FieldKind::Double
            ]
        );
        assert_eq!(shape.primitive_count(), 3);
        assert_eq!(shape.to_string(), "OOIJD");
    }

    #[test]
    fn test_parse_empty() {
        let shape = ShapeDescriptor::parse("").unwrap();
        assert!(shape.is_empty());
        assert_eq!(shape.to_string(), "");
    }

    #[test]
    fn test_parse_invalid_token() {
        let err = ShapeDescriptor::parse("X?").unwrap_err();
        match err {
            Error::LayoutGeneration { name, message } => {
                assert_eq!(name, "X?");
                assert!(message.contains("position 0"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(ShapeDescriptor::parse("OOo").is_err());
        assert!(ShapeDescriptor::parse("O O").is_err());
    }

    #[test]
    fn test_parse_bounded() {
        assert!(ShapeDescriptor::parse_bounded("OOOO", 4).is_ok());
        assert!(ShapeDescriptor::parse_bounded("OOOOO", 4).is_err());
        assert!(ShapeDescriptor::parse_bounded("", 0).is_ok());
    }

    #[test]
    fn test_token_round_trip() {
        for kind in FieldKind::iter() {
            assert_eq!(FieldKind::from_token(kind.token()), Some(kind));
        }
        assert_eq!(FieldKind::COUNT, 4);
    }

    #[test]
    fn test_equality() {
        assert_eq!(
            ShapeDescriptor::parse("OI").unwrap(),
            ShapeDescriptor::parse("OI").unwrap()
        );
        assert_ne!(
            ShapeDescriptor::parse("OI").unwrap(),
            ShapeDescriptor::parse("IO").unwrap()
        );
    }
}
