// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![warn(dead_code)]                   // Unused code is reported
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![warn(unused_imports)]              // Unused imports are reported
#![warn(unused_variables)]            // Unused variables are reported
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

//! # Supermodel
//!
//! The configuration-resolution core of a multi-tenant distributed config
//! server.
//!
//! ## Overview
//!
//! Nodes of many deployed applications ask the server for typed configs.
//! This crate keeps an in-memory registry of every deployment and answers
//! those requests against it:
//!
//! - Resolve any named config schema for any config id
//! - Hold unchanged requests open (long poll) until the payload changes
//! - Reject schemas the server does not know
//! - Synthesize the cross-application `lb-services` routing table
//!
//! ## Architecture
//!
//! The registry publishes immutable snapshots:
//!
//! 1. **Writers**: `put`/`remove` build a new snapshot and bump the generation
//! 2. **Readers**: take the current snapshot without blocking
//! 3. **Waiters**: wake on a generation bump and re-resolve their payload
//!
//! ## Modules
//!
//! - [`model`]: Identifiers, application models and deployment manifests
//! - [`catalog`]: Config definitions the server understands
//! - [`registry`]: The super model and its snapshots
//! - [`lbservices`]: The aggregated load-balancer view
//! - [`encoder`]: Checksums, compression and the payload cache
//! - [`resolver`]: Request resolution and long polling
//! - [`config`]: Server configuration parsing and validation
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! zone:
//!   environment: prod
//!   region: default
//! long_poll:
//!   default_timeout_ms: 25000
//!   max_timeout_ms: 60000
//! encoder:
//!   compression: [uncompressed, brotli]
//! deployments: deployments.yaml
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod catalog;
pub mod cli;
pub mod config;
pub mod encoder;
pub mod error;
pub mod lbservices;
pub mod model;
pub mod registry;
pub mod resolver;

// ============================================================================
// Re-exports
// ============================================================================

pub use catalog::{ConfigDefinitionCatalog, ConfigDefinitionKey, ConfigSchema};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, ServerConfig};
pub use error::{ErrorKind, ResolveError, Result, SuperModelError};
pub use lbservices::{LbServicesBuilder, LbServicesConfig};
pub use model::{ApplicationId, ApplicationInfo, ApplicationModel, DeploymentManifest, TenantName};
pub use registry::{RegistrySnapshot, StatusReport, SuperModel};
pub use resolver::{ConfigKey, ConfigResolver, RequestContext, Resolution, ResolvedPayload};
