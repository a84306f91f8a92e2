//! Local filesystem working store.
//!
//! Each key is one pretty-printed JSON file in the store directory:
//! ```text
//! {root}/articles.json
//! {root}/authors.json
//! {root}/settings.json
//! ```

mod file_store;

pub use file_store::{default_store_dir, JsonFileStore};
