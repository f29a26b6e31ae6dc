// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # strata
//!
//! Runtime support for a dynamic scripting engine hosted on a statically typed runtime:
//! shape-specialized storage layouts for script objects, and a guard that keeps scripts away
//! from the host's introspection facilities while a security policy is installed.
//!
//! ## Features
//!
//! - **Layouts on demand** - A layout per shape descriptor and field mode, generated once and
//!   shared by every thread
//! - **Unboxed primitives** - Dual-field layouts keep `int`, `long` and `double` values out of
//!   the object heap
//! - **Trust boundary** - Generated layouts live in their own namespace with exactly the read
//!   grants they need
//! - **Guarded dispatch** - Any installed policy vetoes dynamic linking; reflective access is
//!   checked against a closed set of sensitive host types
//!
//! ## Quick Start
//!
//! ```rust
//! use strata::prelude::*;
//!
//! let modules = ModuleRegistry::new();
//! let synthesizer = LayoutSynthesizer::new(&modules)?;
//!
//! let layout = synthesizer.get_layout("OOI", FieldMode::DualField)?;
//! assert_eq!(layout.field_count(), 3);
//!
//! let mut point = layout.instantiate();
//! point.set(2, Value::Int(7))?;
//! assert_eq!(point.get(2)?, Value::Int(7));
//! # Ok::<(), strata::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`layout`] - Shape descriptors, the layout synthesizer and its cache
//! - [`dispatch`] - Host types, sensitive type classification, the dispatch guard and the
//!   linker pipeline
//! - [`config`] - [`config::StrataConfig`] and its presets
//! - [`options`] - Comma-separated option values
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Logging
//!
//! The library logs through the [`log`](https://docs.rs/log) facade and never installs a
//! logger. Denied dispatches are reported at `warn`, generation and grants at `debug`, cache
//! hits at `trace`.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use strata::prelude::*;
///
/// let synthesizer = LayoutSynthesizer::new(&ModuleRegistry::new())?;
/// assert!(synthesizer.is_empty());
/// # Ok::<(), strata::Error>(())
/// ```
pub mod prelude;

pub mod config;
pub mod dispatch;
pub mod layout;
pub mod options;

/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
///
/// # Examples
///
/// ```rust
/// use strata::{layout::{FieldMode, GeneratedLayout, LayoutSynthesizer}, Result};
/// use std::sync::Arc;
///
/// fn empty_layout(synthesizer: &LayoutSynthesizer) -> Result<Arc<GeneratedLayout>> {
///     synthesizer.get_layout("", FieldMode::DualField)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `strata` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust
/// use strata::{Error, layout::{FieldMode, LayoutSynthesizer, ModuleRegistry}};
///
/// let synthesizer = LayoutSynthesizer::new(&ModuleRegistry::new())?;
/// match synthesizer.find_layout("app.Point") {
///     Ok(layout) => println!("Found {}", layout.name()),
///     Err(Error::LayoutNotFound(name)) => println!("No layout for {}", name),
///     Err(e) => println!("Error: {}", e),
/// }
/// # Ok::<(), strata::Error>(())
/// ```
pub use error::Error;
