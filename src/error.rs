use thiserror::Error;

use crate::dispatch::DenialReason;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! layout_error {
    ($name:expr, $fmt:expr) => {
        crate::Error::LayoutGeneration {
            name: $name.to_string(),
            message: $fmt.to_string(),
        }
    };

    ($name:expr, $fmt:expr, $($arg:tt)*) => {
        crate::Error::LayoutGeneration {
            name: $name.to_string(),
            message: format!($fmt, $($arg)*),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Errors are local to the single request that produced them. A failed layout generation never
/// publishes anything into the shared cache, and a denied dispatch never mutates policy or
/// classification state.
///
/// # Error Categories
///
/// ## Layout Errors
/// - [`Error::LayoutGeneration`] - Descriptor malformed or the layout could not be built
/// - [`Error::LayoutNotFound`] - Name is not a structure name and no fallback source knows it
/// - [`Error::FieldOutOfRange`] - Accessor index outside of the layout's field list
///
/// ## Dispatch Errors
/// - [`Error::DispatchDenied`] - The dispatch guard vetoed linking or reflective access
/// - [`Error::Unlinkable`] - No linker in the pipeline could resolve the request
/// - [`Error::TypeInsert`] - A host type could not be defined
/// - [`Error::TypeNotFound`] - A host type belongs to a different registry
///
/// ## Infrastructure Errors
/// - [`Error::InvalidOption`] - Unrecognized configuration flag
/// - [`Error::NamespaceError`] - The module system refused a declaration or grant
/// - [`Error::LockError`] - Thread synchronization failure
/// - [`Error::Malformed`] - Internal inconsistency with source location
///
/// # Examples
///
/// ```rust
/// use strata::{Error, layout::{FieldMode, LayoutSynthesizer, ModuleRegistry}};
///
/// let modules = ModuleRegistry::new();
/// let synthesizer = LayoutSynthesizer::new(&modules)?;
///
/// match synthesizer.get_layout("X?", FieldMode::DualField) {
///     Ok(layout) => println!("layout {}", layout.name()),
///     Err(Error::LayoutGeneration { name, message }) => {
///         eprintln!("cannot build {}: {}", name, message);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok::<(), strata::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A structure layout could not be generated.
    ///
    /// Raised when the descriptor contains a token outside the field-kind alphabet, exceeds
    /// the configured field limit, or the trust boundary lacks the grants generated layouts
    /// depend on. Fatal to that one request only; the cache is left untouched.
    ///
    /// # Fields
    ///
    /// * `name` - Canonical name of the requested layout
    /// * `message` - What went wrong
    #[error("Failed to generate layout {name} - {message}")]
    LayoutGeneration {
        /// Canonical name of the layout that was requested
        name: String,
        /// Description of the failure
        message: String,
    },

    /// The requested name is not a structure layout and no fallback source resolved it.
    ///
    /// Recoverable: callers usually fall back to generic property storage.
    #[error("Layout not found - {0}")]
    LayoutNotFound(String),

    /// A field accessor was called with an index outside the layout.
    #[error("Field index {index} out of range for layout with {count} fields")]
    FieldOutOfRange {
        /// The requested field index
        index: usize,
        /// Number of fields the layout holds
        count: usize,
    },

    /// The dispatch guard refused a link request or reflective access.
    ///
    /// This is a security-origin error; see [`Error::is_security_error`]. Retrying cannot
    /// succeed while the same policy remains installed.
    #[error("Dispatch denied for {target} - {reason}")]
    DispatchDenied {
        /// Fully-qualified name of the target type
        target: String,
        /// Which gate refused the request
        reason: DenialReason,
    },

    /// None of the registered linkers produced an invocation for the request.
    #[error("No linker could resolve {0}")]
    Unlinkable(String),

    /// Failed to insert a new host type into the registry.
    #[error("Failed to insert new host type - {0}")]
    TypeInsert(String),

    /// A host type was not registered in the registry it was used with.
    #[error("Host type not found - {0}")]
    TypeNotFound(String),

    /// A configuration option token was not recognized or had an invalid argument.
    #[error("Invalid option - {0}")]
    InvalidOption(String),

    /// The module system refused a namespace declaration or read grant.
    #[error("{0}")]
    NamespaceError(String),

    /// Failed to lock target.
    ///
    /// This error occurs when thread synchronization fails, typically
    /// when a per-key generation lock was poisoned by a panicking thread.
    #[error("Failed to lock target")]
    LockError,

    /// Internal state is inconsistent.
    ///
    /// Includes the source location where the inconsistency was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },
}

impl Error {
    /// Returns `true` for errors that must surface to scripts as security errors.
    #[must_use]
    pub fn is_security_error(&self) -> bool {
        matches!(self, Error::DispatchDenied { .. })
    }
}
