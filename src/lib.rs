//! buildpack-notify - tell Cloud Foundry space owners when their apps need a restage
//!
//! Operators update system buildpacks to ship security fixes, but running apps
//! keep the droplet they were staged with until someone restages them. This
//! crate finds started apps whose current droplet was built before one of its
//! buildpacks was updated and emails the developers and managers of the
//! owning spaces, one message per person listing all of their affected apps.
//!
//! # Run flow
//!
//! 1. Load buildpack freshness records ([`freshness`])
//! 2. List installed buildpacks and keep those new or updated since the last
//!    run
//! 3. List apps and flag outdated ones by comparing each current droplet's
//!    creation time with the buildpack update time ([`detector`])
//! 4. Resolve space developers and managers into a per-user app list
//!    ([`owners`])
//! 5. Render and send one email per user ([`templating`], [`notify`],
//!    [`mailer`])
//! 6. Record the processed buildpacks so the next run skips them
//!
//! [`pipeline`] ties these together; [`platform`] is the narrow API the core
//! logic talks to.
//!
//! # Modules
//!
//! - [`cli`] - flags and mode dispatch
//! - [`config`] - environment and `VCAP_SERVICES` configuration
//! - [`core`] - error types and timestamp parsing
//! - [`models`] - platform resources and notification data
//! - [`platform`] - platform API trait, HTTP client and pagination
//! - [`release`] - release links for system buildpacks
//! - [`server`] - health-check listener

// Core functionality modules
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod models;

// Platform access
pub mod platform;

// Detection and notification
pub mod detector;
pub mod freshness;
pub mod mailer;
pub mod notify;
pub mod owners;
pub mod pipeline;
pub mod release;
pub mod templating;

// Supporting modules
pub mod server;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
