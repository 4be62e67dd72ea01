//! Path classification and per-process working-directory tracking
//!
//! Consumes typed trace events in log order and sorts every touched
//! filesystem path into two sets: inputs (files the traced step read) and
//! outputs (files it created, wrote, or renamed into existence). Relative
//! paths are resolved against the *traced* process's current directory,
//! tracked per pid from observed chdir events.

use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};

use crate::parser::TraceEvent;
use crate::sink::DepSink;

/// Filesystem regions excluded from dependency tracking entirely: device
/// nodes, system configuration, the proc pseudo-filesystem, temporary files,
/// and installed-package trees.
pub const DEFAULT_IGNORED_PREFIXES: &[&str] = &["/dev/", "/etc/", "/proc/", "/tmp/", "/usr/"];

/// Order-sensitive classifier of touched paths.
///
/// State lives for exactly one traced session: created fresh, fed events in
/// log order, then drained once via [`Classifier::report_to`].
#[derive(Debug)]
pub struct Classifier {
    ignored: &'static [&'static str],
    /// Current working directory per observed pid. Absence means "resolve
    /// relative to our own working directory", i.e. use the path as given.
    cwd: HashMap<u32, PathBuf>,
    inputs: BTreeSet<PathBuf>,
    outputs: BTreeSet<PathBuf>,
}

impl Classifier {
    /// Create an empty classifier with the given ignore-prefix list.
    pub fn new(ignored: &'static [&'static str]) -> Self {
        Self {
            ignored,
            cwd: HashMap::new(),
            inputs: BTreeSet::new(),
            outputs: BTreeSet::new(),
        }
    }

    /// Dispatch one decoded trace event to the matching operation.
    pub fn apply(&mut self, event: TraceEvent) {
        match event {
            TraceEvent::Open { pid, path, flags } => self.open(pid, &path, &flags),
            TraceEvent::Create { pid, path } => self.create(pid, &path),
            TraceEvent::Rename { pid, from, to } => self.rename(pid, &from, &to),
            TraceEvent::Mkdir { pid, path } => self.mkdir(pid, &path),
            TraceEvent::Chdir { pid, path } => self.chdir(pid, &path),
        }
    }

    /// Classify an open by its symbolic mode flags.
    ///
    /// Flags are evaluated token by token in the order strace printed them;
    /// the first recognized access mode wins. A write-capable open makes the
    /// path an output even if it was read earlier; a read-only open records
    /// an input only if the step did not already produce that path itself.
    pub fn open(&mut self, pid: u32, path: &str, flags: &str) {
        if self.is_ignored(path) {
            return;
        }
        for token in flags.split('|') {
            match token.trim() {
                "O_WRONLY" | "O_RDWR" => {
                    let resolved = self.resolve(pid, path);
                    self.add_output(resolved);
                    return;
                }
                "O_RDONLY" => {
                    let resolved = self.resolve(pid, path);
                    if !self.outputs.contains(&resolved) {
                        self.inputs.insert(resolved);
                    }
                    return;
                }
                _ => {}
            }
        }
    }

    /// Record a creat: unconditionally an output.
    pub fn create(&mut self, pid: u32, path: &str) {
        if self.is_ignored(path) {
            return;
        }
        let resolved = self.resolve(pid, path);
        self.add_output(resolved);
    }

    /// Record a rename. The target inherits output status; the source's
    /// output entry (under its old name) is dropped; any prior read of the
    /// target is voided. A rename into an ignored location is a complete
    /// no-op, source included.
    pub fn rename(&mut self, pid: u32, from: &str, to: &str) {
        if self.is_ignored(to) {
            return;
        }
        let from = self.resolve(pid, from);
        let to = self.resolve(pid, to);
        self.inputs.remove(&to);
        self.outputs.remove(&from);
        self.add_output(to);
    }

    /// Record a mkdir: always an output. Directories bypass the
    /// ignore-prefix filter.
    pub fn mkdir(&mut self, pid: u32, path: &str) {
        let resolved = self.resolve(pid, path);
        self.add_output(resolved);
    }

    /// Track a directory change for pid. A relative path is resolved against
    /// the previously tracked directory; with no prior entry the path is
    /// taken as absolute.
    pub fn chdir(&mut self, pid: u32, path: &str) {
        let resolved = self.resolve(pid, path);
        self.cwd.insert(pid, resolved);
    }

    /// Paths the step read without also producing them.
    pub fn inputs(&self) -> &BTreeSet<PathBuf> {
        &self.inputs
    }

    /// Paths the step created, wrote, or renamed into existence.
    pub fn outputs(&self) -> &BTreeSet<PathBuf> {
        &self.outputs
    }

    /// Flush both sets to the sink, consuming the classifier. Reporting
    /// happens exactly once, at end of session.
    pub fn report_to(self, sink: &mut dyn DepSink) {
        for path in &self.inputs {
            sink.record_input(path);
        }
        for path in &self.outputs {
            sink.record_output(path);
        }
    }

    fn is_ignored(&self, path: &str) -> bool {
        self.ignored.iter().any(|prefix| path.starts_with(prefix))
    }

    /// Resolve against pid's tracked directory, if any, then normalize.
    fn resolve(&self, pid: u32, path: &str) -> PathBuf {
        match self.cwd.get(&pid) {
            Some(cwd) => normalize(&cwd.join(path)),
            None => normalize(Path::new(path)),
        }
    }

    /// An output insertion always evicts the same path from inputs: once
    /// written, a path is solely an output for the rest of the session.
    fn add_output(&mut self, path: PathBuf) {
        self.inputs.remove(&path);
        self.outputs.insert(path);
    }
}

/// Lexical path normalization: collapse `.`, `..`, and redundant separators
/// without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::RootDir | Component::Prefix(_) => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `..` at the root stays at the root.
                Some(Component::RootDir) => {}
                // Relative prefix of `..` components must be kept.
                _ => out.push(".."),
            },
            Component::Normal(name) => out.push(name),
        }
    }
    out
}
