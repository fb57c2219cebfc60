//! Account domain: model, stores, credential hashing, notifications, and the
//! orchestration service the API layer calls into.

pub mod error;
pub mod memory;
pub mod model;
pub mod notify;
pub mod password;
pub mod postgres;
pub mod service;
pub mod store;
