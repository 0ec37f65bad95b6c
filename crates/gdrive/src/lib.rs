//! # gdrive
//!
//! Blocking Google Drive v3 client, scoped to what a housekeeping job needs:
//! - Service-account authentication (JWT bearer grant)
//! - Listing files by parent folder or ownership, across all pages
//! - Storage quota queries
//! - Copy, move (reparent) and delete
//!
//! ## Example
//!
//! ```no_run
//! use gdrive::{Client, ListQuery, ServiceAccountKey};
//!
//! let json = std::fs::read_to_string("service-account.json").unwrap();
//! let key = ServiceAccountKey::from_json(&json).expect("invalid key");
//! let client = Client::authorize(key).expect("unusable key");
//!
//! let quota = client.quota().unwrap();
//! println!("{} of {} bytes used", quota.used(), quota.total());
//!
//! for file in client.list_all(&ListQuery::OwnedByMe).unwrap() {
//!     println!("{} ({})", file.name, file.id());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod backend;
pub mod error;
pub mod types;

pub use auth::{Authenticator, ServiceAccountKey};
pub use backend::MockBackend;
pub use error::{Error, ErrorCategory, Result};
pub use types::{DRIVE_SCOPE, DriveFile, FileList, ListQuery, Quota};

use backend::Backend;
use backend::google::GoogleBackend;

/// High-level Drive client.
///
/// Wraps a [`Backend`]; construct it once and pass it by reference.
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a client for a service account with full Drive access.
    ///
    /// Parses the private key up front. The token exchange happens on the
    /// first request.
    pub fn authorize(key: ServiceAccountKey) -> Result<Self> {
        let auth = Authenticator::new(key, DRIVE_SCOPE)?;
        Ok(Self::with_backend(Box::new(GoogleBackend::new(auth))))
    }

    /// Like [`Client::authorize`], against a custom API root.
    pub fn authorize_with_api_base(key: ServiceAccountKey, api_base: &str) -> Result<Self> {
        let auth = Authenticator::new(key, DRIVE_SCOPE)?;
        Ok(Self::with_backend(Box::new(GoogleBackend::with_api_base(
            auth, api_base,
        ))))
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Fetch the storage quota.
    pub fn quota(&self) -> Result<Quota> {
        self.backend.quota()
    }

    /// List every file matching `query`, following page tokens.
    ///
    /// All pages are fetched before returning, so callers may modify the
    /// listed files without disturbing pagination.
    pub fn list_all(&self, query: &ListQuery) -> Result<Vec<DriveFile>> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.backend.list_files(query, page_token.as_deref())?;
            files.extend(page.files);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        log::debug!("{} matched {} files", query.to_q(), files.len());
        Ok(files)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Copy a file into `parent`.
    ///
    /// Fetches the file's metadata, points it at `parent`, clears its id so
    /// the API allocates a new one, and issues the copy.
    pub fn copy_into(&self, id: &str, parent: &str) -> Result<DriveFile> {
        let mut body = self.backend.get_file(id)?;
        body.parents = vec![parent.to_string()];
        body.id = None;
        self.backend.copy_file(id, &body)
    }

    /// Move a file from one folder to another.
    pub fn reparent(&self, id: &str, add_parent: &str, remove_parent: &str) -> Result<DriveFile> {
        self.backend.reparent(id, add_parent, remove_parent)
    }

    /// Permanently delete a file.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.backend.delete_file(id)
    }
}
