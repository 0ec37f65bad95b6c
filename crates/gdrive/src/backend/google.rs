//! Drive v3 REST backend.
//!
//! Every request carries a bearer token from the [`Authenticator`] and sets
//! `supportsAllDrives=true`, so shared-drive items behave like My Drive ones.

use crate::auth::Authenticator;
use crate::backend::Backend;
use crate::error::Result;
use crate::types::{DriveFile, FileList, LIST_FIELDS, ListQuery, MAX_PAGE_SIZE, Quota};
use serde::Deserialize;

/// Default API root.
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com";

/// Google Drive v3 backend.
pub struct GoogleBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// Source of bearer tokens.
    auth: Authenticator,
    /// API root, without the `/drive/v3` suffix.
    api_base: String,
}

impl GoogleBackend {
    /// Create a backend against the public Drive API.
    #[must_use]
    pub fn new(auth: Authenticator) -> Self {
        Self::with_api_base(auth, DEFAULT_API_BASE)
    }

    /// Create a backend with a custom API root (for proxies and testing).
    #[must_use]
    pub fn with_api_base(auth: Authenticator, api_base: impl Into<String>) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            auth,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Get the current API root.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.api_base)
    }

    fn file_url(&self, id: &str) -> String {
        format!("{}/drive/v3/files/{}", self.api_base, id)
    }

    fn copy_url(&self, id: &str) -> String {
        format!("{}/drive/v3/files/{}/copy", self.api_base, id)
    }

    fn about_url(&self) -> String {
        format!("{}/drive/v3/about", self.api_base)
    }

    fn bearer(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.auth.token()?))
    }
}

impl Backend for GoogleBackend {
    fn list_files(&self, query: &ListQuery, page_token: Option<&str>) -> Result<FileList> {
        let q = query.to_q();
        log::debug!("files.list q={q} page_token={page_token:?}");

        let mut request = self
            .agent
            .get(&self.files_url())
            .header("Authorization", &self.bearer()?)
            .query("q", &q)
            .query("fields", LIST_FIELDS)
            .query("orderBy", "name")
            .query("pageSize", &MAX_PAGE_SIZE.to_string())
            .query("includeItemsFromAllDrives", "true")
            .query("supportsAllDrives", "true");
        if let Some(token) = page_token {
            request = request.query("pageToken", token);
        }

        let list: FileList = request.call()?.body_mut().read_json()?;
        Ok(list)
    }

    fn quota(&self) -> Result<Quota> {
        log::debug!("about.get storageQuota");

        let about: About = self
            .agent
            .get(&self.about_url())
            .header("Authorization", &self.bearer()?)
            .query("fields", "storageQuota")
            .call()?
            .body_mut()
            .read_json()?;

        Ok(about.storage_quota)
    }

    fn get_file(&self, id: &str) -> Result<DriveFile> {
        log::debug!("files.get {id}");

        let file: DriveFile = self
            .agent
            .get(&self.file_url(id))
            .header("Authorization", &self.bearer()?)
            .query("supportsAllDrives", "true")
            .call()?
            .body_mut()
            .read_json()?;

        Ok(file)
    }

    fn copy_file(&self, id: &str, file: &DriveFile) -> Result<DriveFile> {
        log::debug!("files.copy {id} -> {:?}", file.parents);

        let copy: DriveFile = self
            .agent
            .post(&self.copy_url(id))
            .header("Authorization", &self.bearer()?)
            .query("supportsAllDrives", "true")
            .send_json(file)?
            .body_mut()
            .read_json()?;

        Ok(copy)
    }

    fn reparent(&self, id: &str, add_parent: &str, remove_parent: &str) -> Result<DriveFile> {
        log::debug!("files.update {id} +{add_parent} -{remove_parent}");

        let updated: DriveFile = self
            .agent
            .patch(&self.file_url(id))
            .header("Authorization", &self.bearer()?)
            .query("addParents", add_parent)
            .query("removeParents", remove_parent)
            .query("supportsAllDrives", "true")
            .send_json(serde_json::json!({}))?
            .body_mut()
            .read_json()?;

        Ok(updated)
    }

    fn delete_file(&self, id: &str) -> Result<()> {
        log::debug!("files.delete {id}");

        self.agent
            .delete(&self.file_url(id))
            .header("Authorization", &self.bearer()?)
            .query("supportsAllDrives", "true")
            .call()?;

        Ok(())
    }
}

// =============================================================================
// Drive API response types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct About {
    #[serde(default)]
    storage_quota: Quota,
}
