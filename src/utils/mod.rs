// src/utils/mod.rs
//! Helper functions shared by the models and services.

pub mod crypto;
pub mod serialization;
