//! Engine integration tests against in-process fake backends.

mod common;

mod build_tests;
mod deploy_tests;
mod store_tests;
