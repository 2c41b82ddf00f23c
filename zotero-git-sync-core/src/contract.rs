//! # contract: the seam between the sync pipeline and the reference manager
//!
//! The pipeline only needs two things from Zotero: the items of a
//! collection and the bytes of an attachment. [`ItemSource`] captures
//! exactly that, so the real HTTP client ([`crate::zotero::ZoteroClient`])
//! and test doubles are interchangeable.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`; with the default
//!   `test-export-mocks` feature `MockItemSource` is exported for
//!   integration tests in dependent crates.

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::ApiError;
use crate::item::BibliographicItem;

/// Read access to a reference-manager library.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// All top-level items of the collection, in the order the service
    /// returns them. Pagination is the implementor's business.
    async fn collection_items(&self, collection_id: &str)
        -> Result<Vec<BibliographicItem>, ApiError>;

    /// Raw bytes of an attachment file.
    async fn attachment_file(&self, attachment_key: &str) -> Result<Vec<u8>, ApiError>;
}
