#![warn(missing_docs)]
//! `artifact-core-store` - Store backends for `artifact-core`.
//!
//! - [`JsonFileStore`]: a [`artifact_core::Gateway`] persisting artifacts and history to a single
//!   JSON document, replaced atomically on every mutation
//! - [`ReferenceSource`]: where remote reference copies come from
//!   - [`HttpReferenceSource`]: `GET <base_url>/<path>`
//!   - [`DirectoryReferenceSource`]: `<root>/<path>` from a local checkout
//!   - [`NoReferenceSource`]: pulls are unsupported
//!
//! ```rust,no_run
//! use artifact_core_store::{HttpReferenceSource, JsonFileStore};
//!
//! let store = JsonFileStore::open("artifacts.json")
//!     .unwrap()
//!     .with_references(HttpReferenceSource::new("https://cdn.example.com/site"));
//! # let _ = store;
//! ```

mod error;
mod file;
mod reference;

pub use error::StoreError;
pub use file::JsonFileStore;
pub use reference::{
    DirectoryReferenceSource, HttpReferenceSource, NoReferenceSource, ReferenceSource,
};
