//! Bitbucket Server REST client: typed inputs, the [`BitbucketApi`] trait and a
//! `reqwest` implementation.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use api::BitbucketApi;
pub use client::BitbucketClient;
pub use config::{BitbucketConfig, Credentials};
pub use error::{BitbucketError, Result};
pub use types::*;
