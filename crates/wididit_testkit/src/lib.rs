//! # Wididit Testkit
//!
//! Test utilities for the Wididit client.
//!
//! This crate provides:
//! - An in-memory federation of Wididit hosts implementing `HttpClient`
//! - Seeded sessions and scenarios
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wididit_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_federation() {
//!     let test = TestFederation::new();
//!     let tester = test.connect("tester");
//!     tester.set_biography("hello").unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod federation;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::federation::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use federation::*;
pub use fixtures::*;
pub use generators::*;
