//! Backend trait and implementations for talking to Drive.
//!
//! [`google::GoogleBackend`] issues real HTTP calls. [`MockBackend`] keeps an
//! in-memory drive for tests:
//!
//! ```
//! use gdrive::backend::{Backend, MockBackend};
//! use gdrive::{DriveFile, ListQuery, Quota};
//!
//! let mock = MockBackend::new().with_quota(Quota::new(0, 1000));
//! mock.add_file(DriveFile::new("f1", "a.txt", 10).with_parents(["src"]), true);
//!
//! let page = mock.list_files(&ListQuery::InParents("src".into()), None).unwrap();
//! assert_eq!(page.files.len(), 1);
//! ```

pub mod google;

use crate::error::{Error, Result};
use crate::types::{DriveFile, FileList, ListQuery, MAX_PAGE_SIZE, Quota};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Operations the sweep needs from Drive.
pub trait Backend: Send + Sync {
    /// Fetch one page of files matching `query`, ordered by name.
    fn list_files(&self, query: &ListQuery, page_token: Option<&str>) -> Result<FileList>;

    /// Fetch the storage quota.
    fn quota(&self) -> Result<Quota>;

    /// Fetch full metadata for a file.
    fn get_file(&self, id: &str) -> Result<DriveFile>;

    /// Copy a file. `file` supplies the new copy's metadata.
    fn copy_file(&self, id: &str, file: &DriveFile) -> Result<DriveFile>;

    /// Move a file by adding one parent and removing another.
    fn reparent(&self, id: &str, add_parent: &str, remove_parent: &str) -> Result<DriveFile>;

    /// Permanently delete a file.
    fn delete_file(&self, id: &str) -> Result<()>;
}

/// A call recorded by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// files.list
    List(ListQuery),
    /// about.get
    Quota,
    /// files.get
    Get(String),
    /// files.copy
    Copy {
        /// Source file id.
        id: String,
        /// Parents requested for the copy.
        parents: Vec<String>,
    },
    /// files.update with addParents/removeParents
    Reparent {
        /// File id.
        id: String,
        /// Parent added.
        add: String,
        /// Parent removed.
        remove: String,
    },
    /// files.delete
    Delete(String),
}

#[derive(Debug, Clone)]
struct MockFile {
    file: DriveFile,
    owned_by_me: bool,
}

#[derive(Debug, Default)]
struct MockState {
    files: Vec<MockFile>,
    quota: Quota,
    calls: Vec<Call>,
    page_size: Option<usize>,
    next_copy: u64,
    quota_budget: Option<usize>,
    fail_listing: bool,
    fail_get: HashSet<String>,
    fail_copy: HashSet<String>,
    fail_reparent: HashSet<String>,
    fail_delete: HashSet<String>,
    lenient_reparent: bool,
}

/// In-memory drive for testing without network access.
///
/// Clones share state, so a test can hand one clone to a
/// [`Client`](crate::Client) and inspect the other afterwards.
///
/// Copies consume quota, deletions release it. A reparent whose removed
/// parent is not currently a parent fails, the way a repeated move does
/// once the file has left the source folder.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create an empty mock with zero quota.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the quota snapshot.
    #[must_use]
    pub fn with_quota(self, quota: Quota) -> Self {
        self.state().quota = quota;
        self
    }

    /// Serve listings in pages of `size` files.
    #[must_use]
    pub fn with_page_size(self, size: usize) -> Self {
        self.state().page_size = Some(size.max(1));
        self
    }

    /// Add a file. `owned_by_me` controls whether `'me' in owners` matches it.
    pub fn add_file(&self, file: DriveFile, owned_by_me: bool) {
        self.state().files.push(MockFile { file, owned_by_me });
    }

    /// Let quota calls succeed `n` more times, then fail.
    pub fn fail_quota_after(&self, n: usize) {
        self.state().quota_budget = Some(n);
    }

    /// Make every listing fail.
    pub fn fail_listing(&self) {
        self.state().fail_listing = true;
    }

    /// Make metadata fetches for `id` fail.
    pub fn fail_get(&self, id: impl Into<String>) {
        self.state().fail_get.insert(id.into());
    }

    /// Make copies of `id` fail.
    pub fn fail_copy(&self, id: impl Into<String>) {
        self.state().fail_copy.insert(id.into());
    }

    /// Make reparenting `id` fail.
    pub fn fail_reparent(&self, id: impl Into<String>) {
        self.state().fail_reparent.insert(id.into());
    }

    /// Make deleting `id` fail.
    pub fn fail_delete(&self, id: impl Into<String>) {
        self.state().fail_delete.insert(id.into());
    }

    /// Accept reparent calls even when the removed parent is already gone.
    pub fn allow_repeated_reparent(&self) {
        self.state().lenient_reparent = true;
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Current quota.
    pub fn current_quota(&self) -> Quota {
        self.state().quota
    }

    /// Look up a file by id.
    pub fn file(&self, id: &str) -> Option<DriveFile> {
        self.state()
            .files
            .iter()
            .find(|f| f.file.id() == id)
            .map(|f| f.file.clone())
    }

    /// Names of the files directly inside `folder`, sorted.
    pub fn names_in(&self, folder: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .state()
            .files
            .iter()
            .filter(|f| f.file.parents.iter().any(|p| p == folder))
            .map(|f| f.file.name.clone())
            .collect();
        names.sort();
        names
    }
}

fn injected(op: &str, id: &str) -> Error {
    Error::http(format!("HTTP 500: injected {} failure for {}", op, id), Some(500))
}

impl Backend for MockBackend {
    fn list_files(&self, query: &ListQuery, page_token: Option<&str>) -> Result<FileList> {
        let mut state = self.state();
        state.calls.push(Call::List(query.clone()));

        if state.fail_listing {
            return Err(Error::http("HTTP 403: listing denied", Some(403)));
        }

        let mut matching: Vec<DriveFile> = state
            .files
            .iter()
            .filter(|f| match query {
                ListQuery::InParents(id) => f.file.parents.iter().any(|p| p == id),
                ListQuery::OwnedByMe => f.owned_by_me,
            })
            .map(|f| f.file.clone())
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));

        let start = match page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| Error::http("HTTP 400: invalid page token", Some(400)))?,
            None => 0,
        };
        let size = state.page_size.unwrap_or(MAX_PAGE_SIZE as usize);
        let end = (start + size).min(matching.len());
        let files = matching.get(start..end).map(<[_]>::to_vec).unwrap_or_default();
        let next_page_token = (end < matching.len()).then(|| end.to_string());

        Ok(FileList {
            files,
            next_page_token,
        })
    }

    fn quota(&self) -> Result<Quota> {
        let mut state = self.state();
        state.calls.push(Call::Quota);

        let budget = state.quota_budget;
        match budget {
            Some(0) => Err(Error::http("HTTP 503: quota unavailable", Some(503))),
            Some(n) => {
                state.quota_budget = Some(n - 1);
                Ok(state.quota)
            }
            None => Ok(state.quota),
        }
    }

    fn get_file(&self, id: &str) -> Result<DriveFile> {
        let mut state = self.state();
        state.calls.push(Call::Get(id.to_string()));

        if state.fail_get.contains(id) {
            return Err(injected("get", id));
        }

        state
            .files
            .iter()
            .find(|f| f.file.id() == id)
            .map(|f| DriveFile {
                mime_type: Some("application/octet-stream".to_string()),
                ..f.file.clone()
            })
            .ok_or_else(|| Error::FileNotFound(id.to_string()))
    }

    fn copy_file(&self, id: &str, file: &DriveFile) -> Result<DriveFile> {
        let mut state = self.state();
        state.calls.push(Call::Copy {
            id: id.to_string(),
            parents: file.parents.clone(),
        });

        if state.fail_copy.contains(id) {
            return Err(injected("copy", id));
        }

        let source = state
            .files
            .iter()
            .find(|f| f.file.id() == id)
            .map(|f| f.file.clone())
            .ok_or_else(|| Error::FileNotFound(id.to_string()))?;

        state.next_copy += 1;
        let copy = DriveFile {
            id: Some(format!("copy-{}", state.next_copy)),
            name: if file.name.is_empty() {
                source.name.clone()
            } else {
                file.name.clone()
            },
            mime_type: file.mime_type.clone().or(source.mime_type),
            size: source.size,
            parents: file.parents.clone(),
        };

        let usage = state.quota.used().saturating_add(copy.size_bytes());
        state.quota.usage = Some(usage);
        state.files.push(MockFile {
            file: copy.clone(),
            owned_by_me: true,
        });

        Ok(copy)
    }

    fn reparent(&self, id: &str, add_parent: &str, remove_parent: &str) -> Result<DriveFile> {
        let mut state = self.state();
        state.calls.push(Call::Reparent {
            id: id.to_string(),
            add: add_parent.to_string(),
            remove: remove_parent.to_string(),
        });

        if state.fail_reparent.contains(id) {
            return Err(injected("reparent", id));
        }

        let lenient = state.lenient_reparent;
        let entry = state
            .files
            .iter_mut()
            .find(|f| f.file.id() == id)
            .ok_or_else(|| Error::FileNotFound(id.to_string()))?;

        let parents = &mut entry.file.parents;
        if !parents.iter().any(|p| p == remove_parent) && !lenient {
            return Err(Error::http(
                format!("HTTP 400: {} is not a parent of {}", remove_parent, id),
                Some(400),
            ));
        }

        parents.retain(|p| p != remove_parent);
        if !parents.iter().any(|p| p == add_parent) {
            parents.push(add_parent.to_string());
        }

        Ok(entry.file.clone())
    }

    fn delete_file(&self, id: &str) -> Result<()> {
        let mut state = self.state();
        state.calls.push(Call::Delete(id.to_string()));

        if state.fail_delete.contains(id) {
            return Err(injected("delete", id));
        }

        let index = state
            .files
            .iter()
            .position(|f| f.file.id() == id)
            .ok_or_else(|| Error::FileNotFound(id.to_string()))?;
        let removed = state.files.remove(index);

        let usage = (state.quota.used() - removed.file.size_bytes()).max(0);
        state.quota.usage = Some(usage);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_with_folder() -> MockBackend {
        let mock = MockBackend::new().with_quota(Quota::new(100, 1000));
        mock.add_file(DriveFile::new("b", "beta.bin", 20).with_parents(["src"]), true);
        mock.add_file(DriveFile::new("a", "alpha.bin", 10).with_parents(["src"]), true);
        mock.add_file(DriveFile::new("x", "shared.bin", 5).with_parents(["other"]), false);
        mock
    }

    #[test]
    fn test_list_in_parents_sorted_by_name() {
        let mock = mock_with_folder();
        let page = mock
            .list_files(&ListQuery::InParents("src".into()), None)
            .unwrap();
        let names: Vec<_> = page.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["alpha.bin", "beta.bin"]);
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_list_owned_by_me() {
        let mock = mock_with_folder();
        let page = mock.list_files(&ListQuery::OwnedByMe, None).unwrap();
        assert_eq!(page.files.len(), 2);
        assert!(page.files.iter().all(|f| f.id() != "x"));
    }

    #[test]
    fn test_list_pagination() {
        let mock = mock_with_folder().with_page_size(1);
        let query = ListQuery::InParents("src".into());

        let first = mock.list_files(&query, None).unwrap();
        assert_eq!(first.files[0].name, "alpha.bin");
        let token = first.next_page_token.unwrap();

        let second = mock.list_files(&query, Some(&token)).unwrap();
        assert_eq!(second.files[0].name, "beta.bin");
        assert!(second.next_page_token.is_none());
    }

    #[test]
    fn test_copy_consumes_quota() {
        let mock = mock_with_folder();
        let body = DriveFile {
            name: "alpha.bin".to_string(),
            parents: vec!["dst".to_string()],
            ..DriveFile::default()
        };

        let copy = mock.copy_file("a", &body).unwrap();
        assert_eq!(copy.parents, vec!["dst"]);
        assert_ne!(copy.id(), "a");
        assert_eq!(mock.current_quota().used(), 110);
        assert_eq!(mock.names_in("dst"), vec!["alpha.bin"]);
    }

    #[test]
    fn test_reparent_then_repeat_fails() {
        let mock = mock_with_folder();
        let moved = mock.reparent("a", "trash", "src").unwrap();
        assert_eq!(moved.parents, vec!["trash"]);

        assert!(mock.reparent("a", "trash", "src").is_err());
    }

    #[test]
    fn test_lenient_reparent_repeats() {
        let mock = mock_with_folder();
        mock.allow_repeated_reparent();
        mock.reparent("a", "trash", "src").unwrap();
        let again = mock.reparent("a", "trash", "src").unwrap();
        assert_eq!(again.parents, vec!["trash"]);
    }

    #[test]
    fn test_delete_releases_quota() {
        let mock = mock_with_folder();
        mock.delete_file("b").unwrap();
        assert!(mock.file("b").is_none());
        assert_eq!(mock.current_quota().used(), 80);
        assert!(mock.delete_file("b").is_err());
    }

    #[test]
    fn test_quota_budget() {
        let mock = mock_with_folder();
        mock.fail_quota_after(1);
        assert!(mock.quota().is_ok());
        assert!(mock.quota().is_err());
    }

    #[test]
    fn test_injected_failures() {
        let mock = mock_with_folder();
        mock.fail_get("a");
        mock.fail_copy("b");
        mock.fail_delete("a");
        assert!(mock.get_file("a").is_err());
        assert!(mock.copy_file("b", &DriveFile::default()).is_err());
        assert!(mock.delete_file("a").is_err());
        assert!(mock.get_file("b").is_ok());
    }

    #[test]
    fn test_calls_are_recorded() {
        let mock = mock_with_folder();
        let _ = mock.quota();
        let _ = mock.delete_file("a");
        assert_eq!(mock.calls(), vec![Call::Quota, Call::Delete("a".to_string())]);
    }
}
