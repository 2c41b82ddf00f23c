//! Thin wrapper around the `git` executable.
//!
//! Every call runs `git -C <checkout> ...` synchronously and turns a
//! non-zero exit into [`GitError::CommandFailed`] carrying git's output.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, error, info};

use crate::error::GitError;

/// A local checkout we are allowed to modify.
#[derive(Debug)]
pub struct GitRepository {
    path: PathBuf,
}

fn describe<S: AsRef<OsStr>>(args: &[S]) -> String {
    args.iter()
        .map(|a| a.as_ref().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn command_output(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr
    }
}

fn run_git<S: AsRef<OsStr>>(cwd: Option<&Path>, args: &[S]) -> Result<String, GitError> {
    let command = describe(args);
    let mut cmd = Command::new("git");
    if let Some(cwd) = cwd {
        cmd.arg("-C").arg(cwd);
    }
    // Never block on an interactive credential prompt.
    cmd.args(args).env("GIT_TERMINAL_PROMPT", "0");

    debug!(command = %command, "Running git");
    let output = cmd.output().map_err(|e| {
        error!(error = ?e, command = %command, "Failed to launch git process");
        GitError::Spawn {
            command: command.clone(),
            source: e,
        }
    })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        let details = command_output(&output);
        error!(
            command = %command,
            status = %output.status,
            output = %details,
            "Git exited with non-zero code"
        );
        Err(GitError::CommandFailed {
            command,
            status: output.status.to_string(),
            output: details,
        })
    }
}

impl GitRepository {
    /// Wraps an existing checkout.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `git clone --depth 1 <url> <destination>`.
    pub fn clone_shallow(url: &str, destination: &Path) -> Result<Self, GitError> {
        let args: [&OsStr; 5] = [
            OsStr::new("clone"),
            OsStr::new("--depth"),
            OsStr::new("1"),
            OsStr::new(url),
            destination.as_os_str(),
        ];
        run_git(None, &args)?;
        info!(repo_url = url, path = %destination.display(), "Cloned git repository");
        Ok(Self::open(destination))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn run<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<String, GitError> {
        run_git(Some(&self.path), args)
    }

    /// Sets `user.name` and `user.email` for this checkout only.
    pub fn set_identity(&self, name: &str, email: &str) -> Result<(), GitError> {
        self.run(&["config", "user.name", name])?;
        self.run(&["config", "user.email", email])?;
        debug!(name, email, "Configured committer identity");
        Ok(())
    }

    /// Stages paths relative to the checkout root.
    pub fn add(&self, path: &Path) -> Result<(), GitError> {
        self.run(&[OsStr::new("add"), OsStr::new("--"), path.as_os_str()])?;
        Ok(())
    }

    pub fn mv(&self, from: &Path, to: &Path) -> Result<(), GitError> {
        self.run(&[
            OsStr::new("mv"),
            OsStr::new("--"),
            from.as_os_str(),
            to.as_os_str(),
        ])?;
        Ok(())
    }

    /// Removes a file from the index and the working tree. Untracked
    /// paths are left alone.
    pub fn rm(&self, path: &Path) -> Result<(), GitError> {
        self.run(&[
            OsStr::new("rm"),
            OsStr::new("-f"),
            OsStr::new("--ignore-unmatch"),
            OsStr::new("--"),
            path.as_os_str(),
        ])?;
        Ok(())
    }

    pub fn is_dirty(&self) -> Result<bool, GitError> {
        let status = self.run(&["status", "--porcelain"])?;
        Ok(!status.trim().is_empty())
    }

    pub fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run(&["commit", "-m", message])?;
        info!(message, "Committed changes");
        Ok(())
    }

    /// Pushes the current branch to `origin` under the same name.
    pub fn push(&self) -> Result<(), GitError> {
        self.run(&["push", "--porcelain", "origin", "HEAD"])?;
        info!(path = %self.path.display(), "Pushed to origin");
        Ok(())
    }

    pub fn head_commit(&self) -> Result<String, GitError> {
        Ok(self.run(&["rev-parse", "HEAD"])?.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn init_repo(path: &Path) -> GitRepository {
        run_git(None, &[OsStr::new("init"), path.as_os_str()]).expect("git init");
        let repo = GitRepository::open(path);
        repo.set_identity("Test", "test@example.com").unwrap();
        repo
    }

    #[test]
    fn stage_commit_and_inspect() {
        let dir = tempdir().unwrap();
        let repo = init_repo(dir.path());
        assert!(!repo.is_dirty().unwrap());

        fs::write(dir.path().join("a.txt"), "hello").unwrap();
        assert!(repo.is_dirty().unwrap());
        repo.add(Path::new("a.txt")).unwrap();
        repo.commit("first").unwrap();
        assert!(!repo.is_dirty().unwrap());
        assert_eq!(repo.head_commit().unwrap().len(), 40);

        repo.mv(Path::new("a.txt"), Path::new("b.txt")).unwrap();
        assert!(dir.path().join("b.txt").exists());
        assert!(!dir.path().join("a.txt").exists());

        repo.rm(Path::new("b.txt")).unwrap();
        assert!(!dir.path().join("b.txt").exists());
        assert!(repo.is_dirty().unwrap());
    }

    #[test]
    fn failing_command_reports_output() {
        let dir = tempdir().unwrap();
        let repo = init_repo(dir.path());
        let err = repo.mv(Path::new("missing.txt"), Path::new("x.txt")).unwrap_err();
        match err {
            GitError::CommandFailed { command, output, .. } => {
                assert!(command.starts_with("mv"), "command was {command}");
                assert!(!output.is_empty());
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[test]
    fn clone_of_missing_remote_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does-not-exist.git");
        let dest = dir.path().join("checkout");
        let err = GitRepository::clone_shallow(&missing.to_string_lossy(), &dest).unwrap_err();
        assert!(matches!(err, GitError::CommandFailed { .. }), "got {err:?}");
    }
}
