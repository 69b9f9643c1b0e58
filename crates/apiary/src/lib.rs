//! Apiary - batch hive inspections from the command line or over HTTP.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod context;
pub mod output;
pub mod server;
