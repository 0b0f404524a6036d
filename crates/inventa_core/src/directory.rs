//! Directory registry: the named set of location/company tags.
//!
//! # Responsibility
//! - Provide add/delete/list over the uniqueness-constrained name set.
//!
//! # Invariants
//! - "Already exists" is a normal negative outcome, not an error.
//! - Independent of inventory items: names are referenced by items as
//!   free text only, so deletes never cascade.

use crate::repo::directory_repo::DirectoryRepository;
use crate::repo::RepoResult;
use log::info;

/// Registry facade over the directory repository.
pub struct DirectoryRegistry<R: DirectoryRepository> {
    repo: R,
}

impl<R: DirectoryRepository> DirectoryRegistry<R> {
    /// Creates a registry using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Adds a name. Returns `false` when the exact name already exists;
    /// the registry is unchanged in that case.
    pub fn add(&mut self, name: &str) -> RepoResult<bool> {
        let added = self.repo.add(name)?;
        info!("event=directory_add module=directory status=ok added={added}");
        Ok(added)
    }

    /// Deletes a name. Returns `false` when the name was not present.
    pub fn delete(&mut self, name: &str) -> RepoResult<bool> {
        let deleted = self.repo.delete(name)?;
        info!("event=directory_delete module=directory status=ok deleted={deleted}");
        Ok(deleted)
    }

    /// All names sorted alphabetically.
    pub fn list(&self) -> RepoResult<Vec<String>> {
        self.repo.list()
    }
}
