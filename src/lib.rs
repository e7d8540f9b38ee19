//! Repository Controller Library
//!
//! Core functionality of the repository controller: the work queue, the
//! reconciler, the finalizer processor and the worker runtime, plus the
//! collaborator traits they are written against.
//!
//! ## Quick Start
//!
//! ```rust
//! use repository_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod client;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod error;
pub mod observability;
pub mod prelude;
pub mod repository;
pub mod runtime;
pub mod server;
