//! samples-flow - step navigation and shared-draft engine for the
//! application samples wizard
//!
//! The [`wizard`] module is the engine; [`samples`] declares the concrete
//! flow and [`submission`] turns a finished draft into backend resources
//! through an [`api::ResourceClient`].

pub mod api;
pub mod config;
pub mod env_vars;
pub mod logging;
pub mod samples;
pub mod submission;
pub mod wizard;
