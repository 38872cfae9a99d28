//! A runc wrapper that exposes Intel SGX to containers.
//!
//! Registered as a docker runtime, it intercepts `create` calls, adds the SGX
//! device nodes and the AESM socket directory found on the host to the
//! bundle's `config.json`, and then execs the real runtime with the unchanged
//! command line.

pub mod augment;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod hook;
pub mod launcher;
pub mod logger;
pub mod oci;
pub mod path;

pub use error::{Error, Result};
