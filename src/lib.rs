//! Client for Alibaba DashScope image and video generation
//!
//! Shapes per-model requests, submits them with server-held credentials,
//! polls asynchronous tasks to completion, and maps the heterogeneous
//! upstream responses onto a uniform list of generated artifact URLs.

pub mod builders;
pub mod download;
pub mod error;
pub mod extractors;
pub mod gateway;
pub mod models;
pub mod poller;
pub mod studio;

pub use error::{Error, Result};
