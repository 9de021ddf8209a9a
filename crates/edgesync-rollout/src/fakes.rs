//! Recording in-memory collaborators.
//!
//! Each fake records every call it receives so tests can assert on the
//! exact sequence of side effects a cycle performed.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use edgesync_core::VersionTag;

use crate::contracts::{
    ArtifactStore, CommandError, CommandRunner, LinkError, LinkManager, StoreError,
};

/// Store that reports a settable version and records fetch destinations.
#[derive(Debug, Default)]
pub struct FakeStore {
    version: Mutex<Option<VersionTag>>,
    fail_fetch: AtomicBool,
    head_calls: AtomicUsize,
    fetches: Mutex<Vec<PathBuf>>,
}

impl FakeStore {
    pub fn serving(tag: &str) -> Self {
        let store = Self::default();
        store.set_version(tag);
        store
    }

    /// A store whose version lookups always fail.
    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn set_version(&self, tag: &str) {
        *self.version.lock().unwrap() = Some(VersionTag::from(tag));
    }

    pub fn fail_fetches(&self) {
        self.fail_fetch.store(true, Ordering::SeqCst);
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> Vec<PathBuf> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactStore for FakeStore {
    async fn head_version(&self, _bucket: &str, _key: &str) -> Result<VersionTag, StoreError> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        self.version
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| StoreError::Transport("fake store unreachable".into()))
    }

    async fn fetch(&self, _bucket: &str, _key: &str, dest: &Path) -> Result<(), StoreError> {
        self.fetches.lock().unwrap().push(dest.to_path_buf());
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("fake fetch interrupted".into()));
        }
        Ok(())
    }
}

/// One recorded script invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCall {
    pub script: PathBuf,
    pub args: Vec<String>,
}

impl RunCall {
    /// `script arg1 arg2`, for compact assertions.
    pub fn command_line(&self) -> String {
        let mut line = self.script.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Runner that succeeds unless told to fail on a given argument.
///
/// Each queued failure fires once, on the first call whose arguments
/// contain it, so `fail_on("--reload")` twice fails both the reload and
/// the rollback reload.
#[derive(Debug, Default)]
pub struct FakeRunner {
    failures: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<RunCall>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, arg: &str) {
        self.failures.lock().unwrap().push_back(arg.to_string());
    }

    pub fn calls(&self) -> Vec<RunCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(RunCall::command_line).collect()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, script: &Path, args: &[String]) -> Result<(), CommandError> {
        let call = RunCall {
            script: script.to_path_buf(),
            args: args.to_vec(),
        };
        let command = call.command_line();
        self.calls.lock().unwrap().push(call);

        let mut failures = self.failures.lock().unwrap();
        if let Some(pos) = failures.iter().position(|f| args.contains(f)) {
            let arg = failures.remove(pos).unwrap_or_default();
            return Err(CommandError::Exit {
                command,
                code: Some(1),
                output: format!("fake runner set to fail on {arg}"),
            });
        }
        Ok(())
    }
}

/// In-memory link. Records every `set_target` call.
#[derive(Debug, Default)]
pub struct FakeLinks {
    target: Mutex<Option<PathBuf>>,
    unreadable: AtomicBool,
    refused: Mutex<Vec<PathBuf>>,
    sets: Mutex<Vec<PathBuf>>,
}

impl FakeLinks {
    pub fn pointing_at(target: impl Into<PathBuf>) -> Self {
        let links = Self::default();
        *links.target.lock().unwrap() = Some(target.into());
        links
    }

    /// A link whose target cannot be read. Writes still succeed.
    pub fn unreadable() -> Self {
        let links = Self::default();
        links.unreadable.store(true, Ordering::SeqCst);
        links
    }

    /// Make `set_target` fail whenever it is asked to point at `target`.
    pub fn refuse(&self, target: impl Into<PathBuf>) {
        self.refused.lock().unwrap().push(target.into());
    }

    pub fn current(&self) -> Option<PathBuf> {
        self.target.lock().unwrap().clone()
    }

    pub fn sets(&self) -> Vec<PathBuf> {
        self.sets.lock().unwrap().clone()
    }
}

#[async_trait]
impl LinkManager for FakeLinks {
    async fn set_target(&self, target: &Path, link: &Path) -> Result<(), LinkError> {
        self.sets.lock().unwrap().push(target.to_path_buf());
        if self.refused.lock().unwrap().iter().any(|r| r == target) {
            return Err(LinkError::Write {
                link: link.to_path_buf(),
                target: target.to_path_buf(),
                source: std::io::Error::other("fake link refused"),
            });
        }
        *self.target.lock().unwrap() = Some(target.to_path_buf());
        Ok(())
    }

    async fn get_target(&self, link: &Path) -> Result<PathBuf, LinkError> {
        let target = self.target.lock().unwrap().clone();
        match target {
            Some(target) if !self.unreadable.load(Ordering::SeqCst) => Ok(target),
            _ => Err(LinkError::Read {
                link: link.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }
}
