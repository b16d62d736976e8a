//! Config resolution module.
//!
//! This module answers "give me config X for config id Y" against the live
//! registry:
//! - Request and outcome types, including trace collection
//! - The long-poll loop that holds unchanged requests until the payload
//!   changes, the timeout elapses or the caller goes away

mod long_poll;
mod request;
mod response;

pub use long_poll::ConfigResolver;
pub use request::{ConfigKey, RequestContext, Trace};
pub use response::{Resolution, ResolvedPayload};
