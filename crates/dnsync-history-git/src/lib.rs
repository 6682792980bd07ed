// # Git History Source
//
// This crate reads DNS record declarations out of a git repository.
//
// ## Purpose
//
// A sync reconciles the commits between a base and a head ref. This source
// resolves both refs, lists the declaration files that changed between
// them, and reads the complete declaration set at each end with
// `git ls-tree` and `git show`. The working tree is never read, so
// uncommitted edits do not leak into a sync.
//
// ## First Run
//
// When the base ref cannot be resolved (for example `HEAD~1` on a
// repository with a single commit), the range starts at
// `Revision::NoHistory` and changes are computed against git's empty tree.
//
// ## Requirements
//
// The `git` executable must be on `PATH`. The repository may be shallow as
// long as the base commit is present.

use async_trait::async_trait;
use dnsync_core::config::HistoryConfig;
use dnsync_core::declaration::is_declaration_path;
use dnsync_core::traits::{
    FileChange, FileChangeKind, HistorySource, HistorySourceFactory, Revision, RevisionRange,
};
use dnsync_core::{DeclarationFile, Error, Registry, Result};
use std::path::PathBuf;
use tokio::process::Command;

/// Object id of git's empty tree, the base for a first run
pub const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Declaration history backed by the `git` CLI
#[derive(Debug, Clone)]
pub struct GitHistory {
    /// Repository root
    repo_dir: PathBuf,

    /// Directory holding declaration files, relative to `repo_dir`
    records_dir: String,

    /// Start of the range
    base_ref: String,

    /// End of the range
    head_ref: String,
}

impl GitHistory {
    /// Create a history source
    ///
    /// # Parameters
    ///
    /// - `repo_dir`: any directory inside the work tree
    /// - `records_dir`: declaration directory relative to `repo_dir`, e.g. `records`
    /// - `base_ref`: start of the range, e.g. `HEAD~1`
    /// - `head_ref`: end of the range, e.g. `HEAD`
    pub fn new(
        repo_dir: impl Into<PathBuf>,
        records_dir: impl Into<String>,
        base_ref: impl Into<String>,
        head_ref: impl Into<String>,
    ) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            records_dir: records_dir.into().trim_matches('/').to_string(),
            base_ref: base_ref.into(),
            head_ref: head_ref.into(),
        }
    }

    /// Run git and return stdout; a non-zero exit is `Ok(None)`
    async fn try_git(&self, args: &[&str]) -> Result<Option<String>> {
        tracing::debug!("git {}", args.join(" "));

        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_dir)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::history(format!("Failed to run git: {}", e)))?;

        if !output.status.success() {
            tracing::debug!(
                "git {} exited with {}: {}",
                args.first().copied().unwrap_or_default(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }

        String::from_utf8(output.stdout)
            .map(Some)
            .map_err(|e| Error::history(format!("git produced non UTF-8 output: {}", e)))
    }

    /// Run git and return stdout; a non-zero exit is an error
    async fn git(&self, args: &[&str]) -> Result<String> {
        self.try_git(args)
            .await?
            .ok_or_else(|| Error::history(format!("git {} failed", args.join(" "))))
    }

    /// Resolve a ref to a commit id, `None` if it does not exist
    async fn resolve(&self, reference: &str) -> Result<Option<String>> {
        let spec = format!("{}^{{commit}}", reference);
        Ok(self
            .try_git(&["rev-parse", "--verify", "--quiet", spec.as_str()])
            .await?
            .map(|out| out.trim().to_string())
            .filter(|id| !id.is_empty()))
    }

    fn records_pathspec(&self) -> String {
        format!("{}/", self.records_dir)
    }

    /// Declaration directory relative to the repository root
    ///
    /// `diff` and `ls-tree --full-name` report root-relative paths and
    /// `rev:path` objects are root-relative, so filtering uses this form.
    async fn records_root(&self) -> Result<String> {
        let prefix = self.git(&["rev-parse", "--show-prefix"]).await?;
        Ok(format!("{}{}", prefix.trim(), self.records_dir))
    }
}

#[async_trait]
impl HistorySource for GitHistory {
    async fn resolve_range(&self) -> Result<RevisionRange> {
        let end = self.resolve(&self.head_ref).await?.ok_or_else(|| {
            Error::history(format!("Cannot resolve head ref `{}`", self.head_ref))
        })?;

        let start = match self.resolve(&self.base_ref).await? {
            Some(id) => Revision::Commit(id),
            None => {
                tracing::info!(
                    "Base ref `{}` does not resolve, treating this as the first sync",
                    self.base_ref
                );
                Revision::NoHistory
            }
        };

        Ok(RevisionRange {
            start,
            end: Revision::Commit(end),
        })
    }

    async fn changed_files(&self, range: &RevisionRange) -> Result<Vec<FileChange>> {
        let start = match &range.start {
            Revision::NoHistory => EMPTY_TREE,
            Revision::Commit(id) => id.as_str(),
        };
        let end = match &range.end {
            Revision::NoHistory => EMPTY_TREE,
            Revision::Commit(id) => id.as_str(),
        };

        let pathspec = self.records_pathspec();
        let output = self
            .git(&["diff", "--name-status", "--no-renames", "-z", start, end, "--", pathspec.as_str()])
            .await?;

        let changes = parse_name_status(&output, &self.records_root().await?);
        tracing::debug!("{} declaration file(s) changed in {}", changes.len(), range);
        Ok(changes)
    }

    async fn declarations_at(&self, revision: &Revision) -> Result<Option<Vec<DeclarationFile>>> {
        let Revision::Commit(id) = revision else {
            return Ok(None);
        };

        let pathspec = self.records_pathspec();
        let listing = self
            .git(&[
                "ls-tree",
                "-r",
                "-z",
                "--name-only",
                "--full-name",
                id.as_str(),
                "--",
                pathspec.as_str(),
            ])
            .await?;

        let mut files = Vec::new();
        for path in parse_ls_tree(&listing, &self.records_root().await?) {
            let object = format!("{}:{}", id, path);
            let content = self.git(&["show", object.as_str()]).await?;
            files.push(DeclarationFile::new(path, content));
        }

        tracing::debug!("Read {} declaration file(s) at {}", files.len(), revision);
        Ok(Some(files))
    }

    fn source_name(&self) -> &'static str {
        "git"
    }
}

/// Parse `git diff --name-status -z` output
///
/// Renames and copies become a delete of the old path (renames only) and
/// an add of the new one. Paths outside `records_dir` or without a YAML
/// extension are dropped.
pub fn parse_name_status(output: &str, records_dir: &str) -> Vec<FileChange> {
    let mut fields = output.split('\0').filter(|f| !f.is_empty());
    let mut changes = Vec::new();

    while let Some(status) = fields.next() {
        match status.chars().next() {
            Some('A') => changes.extend(fields.next().map(|p| FileChange::new(p, FileChangeKind::Added))),
            Some('M') | Some('T') => {
                changes.extend(fields.next().map(|p| FileChange::new(p, FileChangeKind::Modified)))
            }
            Some('D') => changes.extend(fields.next().map(|p| FileChange::new(p, FileChangeKind::Deleted))),
            Some(kind @ ('R' | 'C')) => {
                let old = fields.next();
                let new = fields.next();
                if kind == 'R' {
                    changes.extend(old.map(|p| FileChange::new(p, FileChangeKind::Deleted)));
                }
                changes.extend(new.map(|p| FileChange::new(p, FileChangeKind::Added)));
            }
            _ => {
                tracing::warn!("Ignoring unexpected git status `{}`", status);
                fields.next();
            }
        }
    }

    changes.retain(|c| is_declaration_path(&c.path, records_dir));
    changes
}

/// Parse `git ls-tree -r -z --name-only` output into declaration paths
pub fn parse_ls_tree(output: &str, records_dir: &str) -> Vec<String> {
    output
        .split('\0')
        .map(|line| line.trim_end_matches('\n'))
        .filter(|path| is_declaration_path(path, records_dir))
        .map(str::to_string)
        .collect()
}

/// Factory for creating git history sources
pub struct GitHistoryFactory;

impl HistorySourceFactory for GitHistoryFactory {
    fn create(&self, config: &HistoryConfig) -> Result<Box<dyn HistorySource>> {
        match config {
            HistoryConfig::Git {
                repo_dir,
                records_dir,
                base_ref,
                head_ref,
            } => Ok(Box::new(GitHistory::new(
                repo_dir.as_str(),
                records_dir.as_str(),
                base_ref.as_str(),
                head_ref.as_str(),
            ))),
            _ => Err(Error::config("Invalid config for git history source")),
        }
    }
}

/// Register the git history source with a registry
pub fn register(registry: &Registry) {
    registry.register_history("git", Box::new(GitHistoryFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_creation() {
        let history = GitHistoryFactory.create(&HistoryConfig::default()).unwrap();
        assert_eq!(history.source_name(), "git");
    }

    #[test]
    fn test_factory_rejects_other_config() {
        let config = HistoryConfig::Custom {
            factory: "git".to_string(),
            config: serde_json::json!({}),
        };
        assert!(GitHistoryFactory.create(&config).is_err());
    }

    #[test]
    fn test_register() {
        let registry = Registry::new();
        register(&registry);
        assert!(registry.has_history("git"));
    }

    #[test]
    fn test_name_status_basic() {
        let output = "A\0records/api.yaml\0M\0records/www.yml\0D\0records/old.yaml\0";
        assert_eq!(
            parse_name_status(output, "records"),
            vec![
                FileChange::new("records/api.yaml", FileChangeKind::Added),
                FileChange::new("records/www.yml", FileChangeKind::Modified),
                FileChange::new("records/old.yaml", FileChangeKind::Deleted),
            ]
        );
    }

    #[test]
    fn test_name_status_filters_non_declarations() {
        let output = "A\0README.md\0M\0records/notes.txt\0A\0other/api.yaml\0A\0records/sub/api.yaml\0";
        assert_eq!(
            parse_name_status(output, "records"),
            vec![FileChange::new("records/sub/api.yaml", FileChangeKind::Added)]
        );
    }

    #[test]
    fn test_name_status_rename_is_delete_and_add() {
        let output = "R087\0records/old.yaml\0records/new.yaml\0C100\0records/a.yaml\0records/b.yaml\0";
        assert_eq!(
            parse_name_status(output, "records"),
            vec![
                FileChange::new("records/old.yaml", FileChangeKind::Deleted),
                FileChange::new("records/new.yaml", FileChangeKind::Added),
                FileChange::new("records/b.yaml", FileChangeKind::Added),
            ]
        );
    }

    #[test]
    fn test_name_status_rename_out_of_records() {
        let output = "R100\0records/api.yaml\0archive/api.yaml\0";
        assert_eq!(
            parse_name_status(output, "records"),
            vec![FileChange::new("records/api.yaml", FileChangeKind::Deleted)]
        );
    }

    #[test]
    fn test_ls_tree() {
        let output = "records/a.yaml\0records/b.json\0records/nested/c.yml\0";
        assert_eq!(
            parse_ls_tree(output, "records"),
            vec!["records/a.yaml".to_string(), "records/nested/c.yml".to_string()]
        );
        assert!(parse_ls_tree("", "records").is_empty());
    }
}
