//! # slacktap Testkit
//!
//! Test utilities for the Slack tap.
//!
//! This crate provides:
//! - Slack response fixtures and a harness running the tap offline
//! - Captured sync output with the built-in tap checks
//! - Property-based generators for paginated responses
//!
//! ## Usage
//!
//! ```rust,ignore
//! use slacktap_testkit::prelude::*;
//!
//! #[test]
//! fn users_are_well_formed() {
//!     let harness = TapHarness::new(day(2024, 1, 2));
//!     harness
//!         .client
//!         .respond_json("/users.list", slack_page("members", vec![user("U1", "ana")], None));
//!     let (_, capture) = harness.run(test_config(), &["users"]);
//!     assert!(capture.standard_checks().is_empty());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod capture;
pub mod fixtures;
pub mod generators;

pub use slacktap_engine::{ManualClock, MockHttpClient};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::capture::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use slacktap_engine::{ManualClock, MockHttpClient};
}

pub use capture::*;
pub use fixtures::*;
pub use generators::*;
