//! File-level diff of two trees that may live in different repositories.
//!
//! The target snapshot is usually a fresh clone, so its objects are not in
//! the local object database and a single-repository tree diff cannot see
//! both sides. Instead both trees are walked in lockstep, each read from its
//! own repository. Because OIDs are content hashes, a subtree with the same
//! OID on both sides is identical and is skipped without being read.

use std::collections::BTreeMap;

use crate::error::GitError;
use crate::repo::GitRepo;
use crate::types::{ChangeType, DiffEntry, GitOid, TreeEntry};

/// Compute the changed files between `old_tree` (read from `old_repo`) and
/// `new_tree` (read from `new_repo`).
///
/// Only leaves (blobs, symlinks, submodule commits) are reported; directories
/// are descended into. Entries come out in path order. Renames are reported
/// as a deletion plus an addition.
///
/// # Errors
/// Propagates tree read failures (missing or corrupt objects).
pub fn diff_trees_across(
    old_repo: &dyn GitRepo,
    old_tree: GitOid,
    new_repo: &dyn GitRepo,
    new_tree: GitOid,
) -> Result<Vec<DiffEntry>, GitError> {
    let mut walker = Walker {
        old_repo,
        new_repo,
        out: Vec::new(),
    };
    walker.walk(Some(old_tree), Some(new_tree), "")?;
    Ok(walker.out)
}

struct Walker<'a> {
    old_repo: &'a dyn GitRepo,
    new_repo: &'a dyn GitRepo,
    out: Vec<DiffEntry>,
}

impl Walker<'_> {
    fn walk(
        &mut self,
        old: Option<GitOid>,
        new: Option<GitOid>,
        prefix: &str,
    ) -> Result<(), GitError> {
        if old == new {
            return Ok(());
        }

        let mut old_entries = read_entries(self.old_repo, old)?;
        let mut new_entries = read_entries(self.new_repo, new)?;

        let mut names: Vec<String> = old_entries.keys().chain(new_entries.keys()).cloned().collect();
        names.sort();
        names.dedup();

        for name in names {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };
            match (old_entries.remove(&name), new_entries.remove(&name)) {
                (Some(o), Some(n)) => self.compare(o, n, &path)?,
                (Some(o), None) => self.removed(o, &path)?,
                (None, Some(n)) => self.added(n, &path)?,
                (None, None) => {}
            }
        }
        Ok(())
    }

    fn compare(&mut self, old: TreeEntry, new: TreeEntry, path: &str) -> Result<(), GitError> {
        if old.oid == new.oid && old.mode == new.mode {
            return Ok(());
        }
        match (old.mode.is_tree(), new.mode.is_tree()) {
            (true, true) => self.walk(Some(old.oid), Some(new.oid), path),
            (false, false) => {
                self.out.push(DiffEntry {
                    path: path.to_owned(),
                    change_type: ChangeType::Modified,
                    old_oid: Some(old.oid),
                    new_oid: Some(new.oid),
                    old_mode: Some(old.mode),
                    new_mode: Some(new.mode),
                });
                Ok(())
            }
            // A directory replaced by a file, or the other way round.
            (true, false) => {
                self.walk(Some(old.oid), None, path)?;
                self.added(new, path)
            }
            (false, true) => {
                self.removed(old, path)?;
                self.walk(None, Some(new.oid), path)
            }
        }
    }

    fn added(&mut self, entry: TreeEntry, path: &str) -> Result<(), GitError> {
        if entry.mode.is_tree() {
            return self.walk(None, Some(entry.oid), path);
        }
        self.out.push(DiffEntry {
            path: path.to_owned(),
            change_type: ChangeType::Added,
            old_oid: None,
            new_oid: Some(entry.oid),
            old_mode: None,
            new_mode: Some(entry.mode),
        });
        Ok(())
    }

    fn removed(&mut self, entry: TreeEntry, path: &str) -> Result<(), GitError> {
        if entry.mode.is_tree() {
            return self.walk(Some(entry.oid), None, path);
        }
        self.out.push(DiffEntry {
            path: path.to_owned(),
            change_type: ChangeType::Deleted,
            old_oid: Some(entry.oid),
            new_oid: None,
            old_mode: Some(entry.mode),
            new_mode: None,
        });
        Ok(())
    }
}

fn read_entries(
    repo: &dyn GitRepo,
    tree: Option<GitOid>,
) -> Result<BTreeMap<String, TreeEntry>, GitError> {
    let Some(oid) = tree else {
        return Ok(BTreeMap::new());
    };
    Ok(repo
        .read_tree(oid)?
        .into_iter()
        .map(|e| (e.name.clone(), e))
        .collect())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::Path;

    use super::*;
    use crate::types::{EntryMode, RemoteInfo};

    /// In-memory object store: tree OID → entries. Records which trees were read.
    #[derive(Default)]
    struct FakeRepo {
        trees: HashMap<GitOid, Vec<TreeEntry>>,
        reads: RefCell<Vec<GitOid>>,
    }

    impl FakeRepo {
        fn tree(&mut self, seed: u8, entries: Vec<TreeEntry>) -> GitOid {
            let oid = GitOid::from_bytes([seed; 20]);
            self.trees.insert(oid, entries);
            oid
        }
    }

    impl GitRepo for FakeRepo {
        fn workdir(&self) -> Option<&Path> {
            None
        }
        fn rev_parse(&self, spec: &str) -> Result<GitOid, GitError> {
            Err(GitError::NotFound {
                message: spec.to_owned(),
            })
        }
        fn commit_tree(&self, oid: GitOid) -> Result<GitOid, GitError> {
            Err(GitError::NotFound {
                message: oid.to_string(),
            })
        }
        fn read_tree(&self, oid: GitOid) -> Result<Vec<TreeEntry>, GitError> {
            self.reads.borrow_mut().push(oid);
            self.trees.get(&oid).cloned().ok_or_else(|| GitError::NotFound {
                message: format!("tree {oid}"),
            })
        }
        fn remotes(&self) -> Result<Vec<RemoteInfo>, GitError> {
            Ok(Vec::new())
        }
        fn checkout_detached(&self, _oid: GitOid) -> Result<(), GitError> {
            Ok(())
        }
    }

    fn blob(name: &str, seed: u8) -> TreeEntry {
        TreeEntry {
            name: name.to_owned(),
            mode: EntryMode::Blob,
            oid: GitOid::from_bytes([seed; 20]),
        }
    }

    fn dir(name: &str, oid: GitOid) -> TreeEntry {
        TreeEntry {
            name: name.to_owned(),
            mode: EntryMode::Tree,
            oid,
        }
    }

    fn paths(entries: &[DiffEntry]) -> Vec<(&str, ChangeType)> {
        entries
            .iter()
            .map(|e| (e.path.as_str(), e.change_type))
            .collect()
    }

    #[test]
    fn identical_roots_produce_no_reads() {
        let mut repo = FakeRepo::default();
        let root = repo.tree(1, vec![blob("a.txt", 10)]);
        let diff = diff_trees_across(&repo, root, &repo, root).unwrap();
        assert!(diff.is_empty());
        assert!(repo.reads.borrow().is_empty());
    }

    #[test]
    fn nested_changes_across_two_repos() {
        let mut old = FakeRepo::default();
        let shared = old.tree(2, vec![blob("main.tf", 20)]);
        let old_vpc = old.tree(3, vec![blob("main.tf", 30), blob("gone.tf", 31)]);
        let old_tf = old.tree(4, vec![dir("rds", shared), dir("vpc", old_vpc)]);
        let old_root = old.tree(5, vec![dir("terraform", old_tf), blob("README.md", 50)]);

        let mut new = FakeRepo::default();
        let new_vpc = new.tree(6, vec![blob("main.tf", 60), blob("new.tf", 61)]);
        let new_tf = new.tree(7, vec![dir("rds", shared), dir("vpc", new_vpc)]);
        let new_root = new.tree(8, vec![dir("terraform", new_tf), blob("README.md", 50)]);

        let diff = diff_trees_across(&old, old_root, &new, new_root).unwrap();
        assert_eq!(
            paths(&diff),
            vec![
                ("terraform/vpc/gone.tf", ChangeType::Deleted),
                ("terraform/vpc/main.tf", ChangeType::Modified),
                ("terraform/vpc/new.tf", ChangeType::Added),
            ]
        );
        // The unchanged `rds` subtree is never opened on either side.
        assert!(!old.reads.borrow().contains(&shared));
        assert!(!new.reads.borrow().contains(&shared));
    }

    #[test]
    fn mode_change_is_a_modification() {
        let mut repo = FakeRepo::default();
        let old_root = repo.tree(1, vec![blob("run.sh", 9)]);
        let mut exec = blob("run.sh", 9);
        exec.mode = EntryMode::BlobExecutable;
        let new_root = repo.tree(2, vec![exec]);

        let diff = diff_trees_across(&repo, old_root, &repo, new_root).unwrap();
        assert_eq!(paths(&diff), vec![("run.sh", ChangeType::Modified)]);
    }

    #[test]
    fn directory_replaced_by_file() {
        let mut repo = FakeRepo::default();
        let inner = repo.tree(1, vec![blob("x.tf", 11)]);
        let old_root = repo.tree(2, vec![dir("vpc", inner)]);
        let new_root = repo.tree(3, vec![blob("vpc", 12)]);

        let diff = diff_trees_across(&repo, old_root, &repo, new_root).unwrap();
        assert_eq!(
            paths(&diff),
            vec![("vpc/x.tf", ChangeType::Deleted), ("vpc", ChangeType::Added)]
        );
    }

    #[test]
    fn missing_tree_is_an_error() {
        let mut repo = FakeRepo::default();
        let root = repo.tree(1, vec![]);
        let bogus = GitOid::from_bytes([0xee; 20]);
        assert!(diff_trees_across(&repo, root, &repo, bogus).is_err());
    }
}
