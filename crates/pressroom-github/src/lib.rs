//! GitHub backend for the pressroom publishing engine.

pub mod github;

pub use github::{GitHubClient, DEFAULT_API_URL, DEFAULT_TREE_LIMIT};
