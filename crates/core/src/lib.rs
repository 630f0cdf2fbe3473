//! Stockroom Core -- configuration, data models, and the persistence layer for
//! directory group compare & sync.

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod models;
