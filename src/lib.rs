// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # hcloud-image
//!
//! Declarative, idempotent lifecycle management for custom Hetzner Cloud
//! disk images.
//!
//! ## Overview
//!
//! An image resource is described by a source URL plus upload settings. The
//! crate uploads it through an external upload program, tracks the resulting
//! image and keeps it converged:
//!
//! - Changes to the source or architecture replace the image
//! - Description and label changes are applied in place
//! - Images deleted out of band are detected on refresh
//! - Leftovers of interrupted uploads can be cleaned up
//!
//! ## Architecture
//!
//! 1. **Desired Spec**: Defined in `hcloud-image.yaml`
//! 2. **Observed State**: The recorded image, refreshed from the API
//! 3. **Planner**: Diffs both and plans create, update or replace calls
//! 4. **Provider**: Executes the lifecycle calls against Hetzner Cloud
//!
//! ## Modules
//!
//! - [`config`]: Resource file parsing and validation
//! - [`hcloud`]: Hetzner Cloud API client and upload collaborator
//! - [`provider`]: Create, read, update, delete and cleanup
//! - [`planner`]: Field comparison, diffing and plan execution
//! - [`state`]: Observed state mapping and local storage
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! resource:
//!   name: talos
//!
//! image:
//!   image_url: https://example.com/talos-amd64.raw.xz
//!   compression: xz
//!   architecture: x86
//!   description: Talos Linux
//!   labels:
//!     os: talos
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod hcloud;
pub mod planner;
pub mod provider;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, ImageSpec, ResourceConfig, SpecHasher};
pub use error::{ProviderError, Result};
pub use hcloud::{Connector, HcloudClient, HcloudConnector};
pub use planner::{DiffEngine, DiffResult, PlanExecutor, ResourcePlan};
pub use provider::ImageProvider;
pub use state::{LocalStateStore, ObservedState, ResourceRecord, StateStore};
