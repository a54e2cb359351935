//! HTTP host for the module runtime: lists module types, runs a module for a tenant,
//! and reads back what the run produced.

pub mod app;
pub mod context;
pub mod middleware;
