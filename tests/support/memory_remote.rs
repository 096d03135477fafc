// ABOUTME: In-memory remote host implementing both channel traits.
// ABOUTME: Models directories, files, and symlinks, and records every mutation in order.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tether::error::{Error, Result};
use tether::ssh::{CommandChannel, CommandOutput, FileTransferChannel, RemoteReader, RemoteWriter};
use tether::types::{EntryKind, RemoteEntry};
use tokio::io::AsyncWrite;

const MAX_LINK_DEPTH: usize = 40;

/// Observable side effects, in the order the remote saw them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Exec(String),
    Mkdir(String),
    OpenWrite(String),
    Commit(String),
    Remove(String),
    Rmdir(String),
    Chmod(String, u32),
    Close(&'static str),
}

#[derive(Debug, Clone)]
enum NodeKind {
    Dir,
    File(Vec<u8>),
    Symlink(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    mode: u32,
    uid: u32,
    gid: u32,
}

impl Node {
    fn dir(mode: u32) -> Self {
        Self {
            kind: NodeKind::Dir,
            mode,
            uid: 1000,
            gid: 1000,
        }
    }

    fn file(data: Vec<u8>, mode: u32) -> Self {
        Self {
            kind: NodeKind::File(data),
            mode,
            uid: 1000,
            gid: 1000,
        }
    }

    fn entry_kind(&self) -> EntryKind {
        match self.kind {
            NodeKind::Dir => EntryKind::Directory,
            NodeKind::File(_) => EntryKind::File,
            NodeKind::Symlink(_) => EntryKind::Symlink,
        }
    }
}

#[derive(Default)]
struct State {
    nodes: BTreeMap<String, Node>,
    ops: Vec<Op>,
    responses: HashMap<String, CommandOutput>,
    delays: HashMap<String, Duration>,
    deny_writes: HashSet<String>,
    vanish_on_remove: HashSet<String>,
}

/// Shared handle to one fake remote filesystem. Clones see the same state.
#[derive(Clone)]
pub struct MemoryRemote {
    state: Arc<Mutex<State>>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        let mut state = State::default();
        state.nodes.insert("/".to_string(), Node::dir(0o755));
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Add a directory and its missing ancestors.
    pub fn with_dir(self, path: &str) -> Self {
        {
            let mut state = self.state.lock();
            create_all(&mut state.nodes, path, 0o755).expect("ancestor is not a directory");
        }
        self
    }

    /// Add a file, creating missing ancestors.
    pub fn with_file(self, path: &str, contents: &[u8]) -> Self {
        {
            let mut state = self.state.lock();
            if let Some(parent) = parent_of(path) {
                create_all(&mut state.nodes, &parent, 0o755).expect("ancestor is not a directory");
            }
            state
                .nodes
                .insert(path.to_string(), Node::file(contents.to_vec(), 0o644));
        }
        self
    }

    pub fn with_symlink(self, link: &str, target: &str) -> Self {
        self.insert_symlink(link, target);
        self
    }

    fn insert_symlink(&self, link: &str, target: &str) {
        self.state.lock().nodes.insert(
            link.to_string(),
            Node {
                kind: NodeKind::Symlink(target.to_string()),
                mode: 0o777,
                uid: 1000,
                gid: 1000,
            },
        );
    }

    /// Answer `command` with `output` instead of "command not found".
    pub fn respond(&self, command: &str, output: CommandOutput) {
        self.state
            .lock()
            .responses
            .insert(command.to_string(), output);
    }

    /// Make `command` take `delay` before answering.
    pub fn delay(&self, command: &str, delay: Duration) {
        self.state.lock().delays.insert(command.to_string(), delay);
    }

    /// Fail every attempt to open `path` for writing.
    pub fn deny_write(&self, path: &str) {
        self.state.lock().deny_writes.insert(path.to_string());
    }

    /// Report "not found" when `path` is removed, as if someone else removed it first.
    pub fn vanish_on_remove(&self, path: &str) {
        self.state.lock().vanish_on_remove.insert(path.to_string());
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.lock().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.lock().ops.clear();
    }

    /// Whether anything, including a dangling link, is stored at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.state.lock().nodes.contains_key(path)
    }

    pub fn is_dir(&self, path: &str) -> bool {
        matches!(
            self.state.lock().nodes.get(path).map(|n| &n.kind),
            Some(NodeKind::Dir)
        )
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        match &self.state.lock().nodes.get(path)?.kind {
            NodeKind::File(data) => Some(data.clone()),
            _ => None,
        }
    }

    /// Permission bits of the node stored at `path`.
    pub fn mode(&self, path: &str) -> Option<u32> {
        self.state.lock().nodes.get(path).map(|n| n.mode)
    }

    /// Every file path stored below `root`.
    pub fn files_under(&self, root: &str) -> Vec<String> {
        let prefix = format!("{}/", root.trim_end_matches('/'));
        self.state
            .lock()
            .nodes
            .iter()
            .filter(|(path, node)| {
                path.starts_with(&prefix) && matches!(node.kind, NodeKind::File(_))
            })
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn record(&self, op: Op) {
        self.state.lock().ops.push(op);
    }

    fn lookup(&self, path: &str, follow: bool) -> Result<(String, Node)> {
        let state = self.state.lock();
        let key = resolve(&state.nodes, path, follow, 0).ok_or_else(|| not_found(path))?;
        let node = state
            .nodes
            .get(&key)
            .cloned()
            .ok_or_else(|| not_found(path))?;
        Ok((key, node))
    }

    fn entry(&self, path: &str, follow: bool) -> Result<RemoteEntry> {
        let (_, node) = self.lookup(path, follow)?;
        let size = match &node.kind {
            NodeKind::File(data) => data.len() as u64,
            NodeKind::Symlink(target) => target.len() as u64,
            NodeKind::Dir => 4096,
        };
        Ok(RemoteEntry {
            path: path.to_string(),
            kind: node.entry_kind(),
            size,
            mode: node.entry_kind().mode_bits() | node.mode,
            uid: node.uid,
            gid: node.gid,
            accessed: None,
            modified: None,
        })
    }

    /// Fail unless the parent of `path` is an existing directory.
    fn require_parent(&self, path: &str) -> Result<()> {
        let parent = parent_of(path).ok_or_else(|| failure("create", path, "no parent"))?;
        let (_, node) = self.lookup(&parent, true)?;
        match node.kind {
            NodeKind::Dir => Ok(()),
            _ => Err(failure("create", path, "parent is not a directory")),
        }
    }

    fn run_mkdir_p(&self, raw: &str) -> CommandOutput {
        let path = unquote(raw);
        let mut state = self.state.lock();
        match create_all(&mut state.nodes, &path, 0o755) {
            Ok(()) => CommandOutput::default(),
            Err(blocker) => CommandOutput {
                exit_code: 1,
                stdout: String::new(),
                stderr: format!("mkdir: cannot create directory '{blocker}': File exists\n"),
            },
        }
    }
}

#[async_trait]
impl CommandChannel for MemoryRemote {
    async fn run(&self, command: &str, timeout: Duration) -> Result<CommandOutput> {
        self.record(Op::Exec(command.to_string()));

        let delay = self.state.lock().delays.get(command).copied();
        if let Some(delay) = delay
            && tokio::time::timeout(timeout, tokio::time::sleep(delay))
                .await
                .is_err()
        {
            return Err(Error::CommandTimeout(timeout));
        }

        if let Some(raw) = command.strip_prefix("mkdir -p ") {
            return Ok(self.run_mkdir_p(raw));
        }

        let scripted = self.state.lock().responses.get(command).cloned();
        Ok(scripted.unwrap_or_else(|| CommandOutput {
            exit_code: 127,
            stdout: String::new(),
            stderr: format!("sh: {command}: not found\n"),
        }))
    }

    async fn close(&mut self) -> Result<()> {
        self.record(Op::Close("commands"));
        Ok(())
    }
}

#[async_trait]
impl FileTransferChannel for MemoryRemote {
    async fn stat(&self, path: &str) -> Result<RemoteEntry> {
        self.entry(path, true)
    }

    async fn lstat(&self, path: &str) -> Result<RemoteEntry> {
        self.entry(path, false)
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        let (key, node) = self.lookup(path, true)?;
        if !matches!(node.kind, NodeKind::Dir) {
            return Err(failure("readdir", path, "not a directory"));
        }
        let prefix = if key == "/" {
            "/".to_string()
        } else {
            format!("{key}/")
        };
        let state = self.state.lock();
        Ok(state
            .nodes
            .keys()
            .filter_map(|p| p.strip_prefix(&prefix))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(str::to_string)
            .collect())
    }

    async fn open_read(&self, path: &str) -> Result<RemoteReader> {
        let (_, node) = self.lookup(path, true)?;
        match node.kind {
            NodeKind::File(data) => Ok(Box::new(std::io::Cursor::new(data))),
            _ => Err(failure("open", path, "not a regular file")),
        }
    }

    async fn open_write(&self, path: &str) -> Result<RemoteWriter> {
        self.record(Op::OpenWrite(path.to_string()));
        if self.state.lock().deny_writes.contains(path) {
            return Err(failure("create", path, "permission denied"));
        }
        self.require_parent(path)?;

        let mut state = self.state.lock();
        let mode = state.nodes.get(path).map_or(0o644, |n| n.mode);
        state
            .nodes
            .insert(path.to_string(), Node::file(Vec::new(), mode));
        Ok(Box::new(MemoryWriter {
            remote: self.clone(),
            path: path.to_string(),
            buf: Vec::new(),
        }))
    }

    async fn mkdir(&self, path: &str, mode: u32) -> Result<()> {
        self.record(Op::Mkdir(path.to_string()));
        self.require_parent(path)?;
        let mut state = self.state.lock();
        if state.nodes.contains_key(path) {
            return Err(failure("mkdir", path, "file exists"));
        }
        state.nodes.insert(path.to_string(), Node::dir(mode));
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.record(Op::Remove(path.to_string()));
        let mut state = self.state.lock();
        if state.vanish_on_remove.remove(path) {
            state.nodes.remove(path);
            return Err(not_found(path));
        }
        match state.nodes.get(path).map(|n| &n.kind) {
            None => Err(not_found(path)),
            Some(NodeKind::Dir) => Err(failure("remove", path, "is a directory")),
            Some(_) => {
                state.nodes.remove(path);
                Ok(())
            }
        }
    }

    async fn rmdir(&self, path: &str) -> Result<()> {
        self.record(Op::Rmdir(path.to_string()));
        let mut state = self.state.lock();
        match state.nodes.get(path).map(|n| &n.kind) {
            None => Err(not_found(path)),
            Some(NodeKind::Dir) => {
                let prefix = format!("{path}/");
                if state.nodes.keys().any(|p| p.starts_with(&prefix)) {
                    return Err(failure("rmdir", path, "directory not empty"));
                }
                state.nodes.remove(path);
                Ok(())
            }
            Some(_) => Err(failure("rmdir", path, "not a directory")),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut state = self.state.lock();
        if !state.nodes.contains_key(from) {
            return Err(not_found(from));
        }
        let prefix = format!("{from}/");
        let moved: Vec<String> = state
            .nodes
            .keys()
            .filter(|p| p.as_str() == from || p.starts_with(&prefix))
            .cloned()
            .collect();
        for old in moved {
            if let Some(node) = state.nodes.remove(&old) {
                let new = format!("{to}{}", &old[from.len()..]);
                state.nodes.insert(new, node);
            }
        }
        Ok(())
    }

    async fn chmod(&self, path: &str, mode: u32) -> Result<()> {
        self.record(Op::Chmod(path.to_string(), mode));
        let (key, _) = self.lookup(path, true)?;
        if let Some(node) = self.state.lock().nodes.get_mut(&key) {
            node.mode = mode & 0o7777;
        }
        Ok(())
    }

    async fn chown(&self, path: &str, uid: u32, gid: u32) -> Result<()> {
        let (key, _) = self.lookup(path, true)?;
        if let Some(node) = self.state.lock().nodes.get_mut(&key) {
            node.uid = uid;
            node.gid = gid;
        }
        Ok(())
    }

    async fn symlink(&self, target: &str, link: &str) -> Result<()> {
        self.require_parent(link)?;
        if self.state.lock().nodes.contains_key(link) {
            return Err(failure("symlink", link, "file exists"));
        }
        self.insert_symlink(link, target);
        Ok(())
    }

    async fn read_link(&self, path: &str) -> Result<String> {
        let (_, node) = self.lookup(path, false)?;
        match node.kind {
            NodeKind::Symlink(target) => Ok(target),
            _ => Err(failure("readlink", path, "not a symlink")),
        }
    }

    async fn canonicalize(&self, path: &str) -> Result<String> {
        Ok(self.lookup(path, true)?.0)
    }

    async fn close(&mut self) -> Result<()> {
        self.record(Op::Close("files"));
        Ok(())
    }
}

/// Buffers writes and stores the file when shut down.
struct MemoryWriter {
    remote: MemoryRemote,
    path: String,
    buf: Vec<u8>,
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.buf.extend_from_slice(data);
        Poll::Ready(Ok(data.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        let mut state = self.remote.state.lock();
        let mode = state.nodes.get(&self.path).map_or(0o644, |n| n.mode);
        state
            .nodes
            .insert(self.path.clone(), Node::file(self.buf.clone(), mode));
        state.ops.push(Op::Commit(self.path.clone()));
        Poll::Ready(Ok(()))
    }
}

fn not_found(path: &str) -> Error {
    Error::NotFound(path.to_string())
}

fn failure(operation: &'static str, path: &str, message: &str) -> Error {
    Error::Remote {
        operation,
        path: path.to_string(),
        message: message.to_string(),
    }
}

fn parent_of(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches('/');
    let idx = trimmed.rfind('/')?;
    Some(if idx == 0 {
        "/".to_string()
    } else {
        trimmed[..idx].to_string()
    })
}

/// Follow symlinks in every component, and in the last one if `follow_last`.
fn resolve(
    nodes: &BTreeMap<String, Node>,
    path: &str,
    follow_last: bool,
    depth: usize,
) -> Option<String> {
    if depth > MAX_LINK_DEPTH || !path.starts_with('/') {
        return None;
    }
    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    let mut current = String::new();
    for (i, component) in components.iter().enumerate() {
        match *component {
            "." => continue,
            ".." => {
                if let Some(idx) = current.rfind('/') {
                    current.truncate(idx);
                }
                continue;
            }
            _ => {}
        }
        let candidate = format!("{current}/{component}");
        let is_last = i + 1 == components.len();
        match nodes.get(&candidate).map(|n| &n.kind) {
            Some(NodeKind::Symlink(target)) if !is_last || follow_last => {
                let absolute = if target.starts_with('/') {
                    target.clone()
                } else {
                    format!("{current}/{target}")
                };
                current = resolve(nodes, &absolute, true, depth + 1)?;
                if current == "/" {
                    current.clear();
                }
            }
            _ => current = candidate,
        }
    }
    Some(if current.is_empty() {
        "/".to_string()
    } else {
        current
    })
}

/// `mkdir -p` semantics. On failure returns the component that blocked creation.
fn create_all(
    nodes: &mut BTreeMap<String, Node>,
    path: &str,
    mode: u32,
) -> std::result::Result<(), String> {
    let mut current = String::new();
    for component in path.split('/').filter(|c| !c.is_empty()) {
        current = format!("{current}/{component}");
        match nodes.get(&current).map(|n| &n.kind) {
            Some(NodeKind::Dir) => {}
            Some(NodeKind::Symlink(_)) => {
                let target = resolve(nodes, &current, true, 0)
                    .filter(|key| matches!(nodes.get(key).map(|n| &n.kind), Some(NodeKind::Dir)));
                match target {
                    Some(key) if key == "/" => current.clear(),
                    Some(key) => current = key,
                    None => return Err(current),
                }
            }
            Some(NodeKind::File(_)) => return Err(current),
            None => {
                nodes.insert(current.clone(), Node::dir(mode));
            }
        }
    }
    Ok(())
}

/// Undo the single-quoting applied by the shell command builder.
fn unquote(raw: &str) -> String {
    match raw
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        Some(inner) => inner.replace(r"'\''", "'"),
        None => raw.to_string(),
    }
}
