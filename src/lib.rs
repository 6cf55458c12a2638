// src/lib.rs

//! Campus crawler library.
//!
//! Explores a hashbang-routed institutional website, classifies page text and
//! writes section and faculty directories as plain-text files for a retrieval
//! index to ingest.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
