#![cfg_attr(not(test), forbid(unsafe_code))]

//! Wire models and configuration shared by the Jobboard client crates.

pub mod config;
pub mod models;
