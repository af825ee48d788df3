//! stackwright-lib: deployment orchestration for multi-component stacks.
//!
//! This crate provides:
//! - `Stack`: the validated description of a deployable application
//! - `ScopeResolver` and `expr`: topology variables and env interpolation
//! - `StackEngine`: build, publish, verify, deploy and tear down stacks
//! - `backend`: pluggable container runtime, registry, orchestrator, VCS and
//!   store providers

pub mod action;
pub mod artifacts;
pub mod backend;
pub mod build;
pub mod config;
pub mod consts;
pub mod deploy;
pub mod engine;
pub mod error;
pub mod expr;
pub mod platform;
pub mod publish;
pub mod report;
pub mod scope;
pub mod stack;
pub mod util;

pub use engine::{BuildOptions, BuildOutcome, StackEngine};
pub use error::EngineError;
