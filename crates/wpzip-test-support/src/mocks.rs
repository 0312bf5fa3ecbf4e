//! In-memory stand-ins for the remote host, web server, and operator.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::io::{self, Cursor, Read};
use std::sync::{Mutex, MutexGuard, PoisonError};

use wpzip_core::{
    FileUploadDeleter, HttpGetter, NameGenerator, Prompter, RemoteCommandRunner, RemoteDirEntry,
    RemoteError, RemoteFileReader, RemoteResult, RemoteStream,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// A call observed by [`FakeRemoteHost`], in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    /// `can_run` probe.
    Probe(String),
    /// `run` invocation.
    Run(String),
    /// Directory listing.
    ReadDir(String),
    /// File open.
    Open(String),
    /// Upload with the bytes that were sent.
    Upload {
        /// Destination path.
        path: String,
        /// Uploaded contents.
        contents: Vec<u8>,
    },
    /// Deletion attempt.
    Delete(String),
    /// Directory creation.
    Mkdir(String),
}

#[derive(Debug, Clone)]
enum CommandReply {
    Output(Vec<u8>),
    Broken(Vec<u8>),
    Fail,
}

#[derive(Debug, Default)]
struct HostState {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    commands: HashMap<String, CommandReply>,
    failing_deletes: HashSet<String>,
    failing_uploads: HashSet<String>,
    calls: Vec<RemoteCall>,
}

/// Fake remote session backed by an in-memory filesystem and a command table.
///
/// Commands not registered through [`FakeRemoteHost::with_command`] are
/// treated as missing: probes return `false` and runs fail.
#[derive(Debug, Default)]
pub struct FakeRemoteHost {
    state: Mutex<HostState>,
}

impl FakeRemoteHost {
    /// Empty host with no files and no runnable commands.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file at an exact remote path.
    #[must_use]
    pub fn with_file(self, path: &str, contents: impl AsRef<[u8]>) -> Self {
        lock(&self.state)
            .files
            .insert(normalize(path), contents.as_ref().to_vec());
        self
    }

    /// Add an empty directory.
    #[must_use]
    pub fn with_dir(self, path: &str) -> Self {
        lock(&self.state).dirs.insert(normalize(path));
        self
    }

    /// Register a command that succeeds with the given standard output.
    #[must_use]
    pub fn with_command(self, command: &str, output: impl AsRef<[u8]>) -> Self {
        lock(&self.state).commands.insert(
            command.to_string(),
            CommandReply::Output(output.as_ref().to_vec()),
        );
        self
    }

    /// Register a command whose output stream fails after `partial` bytes.
    #[must_use]
    pub fn with_broken_command(self, command: &str, partial: impl AsRef<[u8]>) -> Self {
        lock(&self.state).commands.insert(
            command.to_string(),
            CommandReply::Broken(partial.as_ref().to_vec()),
        );
        self
    }

    /// Register a command that exists but exits non-zero.
    #[must_use]
    pub fn with_failing_command(self, command: &str) -> Self {
        lock(&self.state)
            .commands
            .insert(command.to_string(), CommandReply::Fail);
        self
    }

    /// Make deletion of `path` fail.
    #[must_use]
    pub fn failing_delete(self, path: &str) -> Self {
        lock(&self.state).failing_deletes.insert(normalize(path));
        self
    }

    /// Make uploads to `path` fail.
    #[must_use]
    pub fn failing_upload(self, path: &str) -> Self {
        lock(&self.state).failing_uploads.insert(normalize(path));
        self
    }

    /// Every call made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RemoteCall> {
        lock(&self.state).calls.clone()
    }

    /// Commands passed to `run`, in order.
    #[must_use]
    pub fn commands_run(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::Run(command) => Some(command),
                _ => None,
            })
            .collect()
    }

    /// Commands passed to `can_run`, in order.
    #[must_use]
    pub fn probes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::Probe(command) => Some(command),
                _ => None,
            })
            .collect()
    }

    /// Paths passed to `delete`, in order.
    #[must_use]
    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::Delete(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    /// Uploads as `(path, contents)` pairs, in order.
    #[must_use]
    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::Upload { path, contents } => Some((path, contents)),
                _ => None,
            })
            .collect()
    }

    /// Returns `true` when a file or directory currently exists at `path`.
    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        let state = lock(&self.state);
        let path = normalize(path);
        state.files.contains_key(&path) || state.dirs.contains(&path)
    }

    fn record(&self, call: RemoteCall) {
        lock(&self.state).calls.push(call);
    }
}

impl RemoteCommandRunner for FakeRemoteHost {
    fn can_run(&self, command: &str) -> bool {
        self.record(RemoteCall::Probe(command.to_string()));
        matches!(
            lock(&self.state).commands.get(command),
            Some(CommandReply::Output(_) | CommandReply::Broken(_))
        )
    }

    fn run(&self, command: &str) -> RemoteResult<RemoteStream> {
        self.record(RemoteCall::Run(command.to_string()));
        let reply = lock(&self.state).commands.get(command).cloned();
        match reply {
            Some(CommandReply::Output(bytes)) => Ok(Box::new(Cursor::new(bytes))),
            Some(CommandReply::Broken(bytes)) => Ok(Box::new(BrokenReader::new(bytes))),
            Some(CommandReply::Fail) => Err(RemoteError::CommandFailed {
                command: command.to_string(),
                status: Some(1),
                stderr: String::new(),
            }),
            None => Err(RemoteError::CommandFailed {
                command: command.to_string(),
                status: Some(127),
                stderr: "command not found".to_string(),
            }),
        }
    }
}

impl RemoteFileReader for FakeRemoteHost {
    fn read_dir(&self, path: &str) -> RemoteResult<Vec<RemoteDirEntry>> {
        self.record(RemoteCall::ReadDir(path.to_string()));
        let state = lock(&self.state);
        let dir = normalize(path);
        let prefix = if dir == "/" {
            dir.clone()
        } else {
            format!("{dir}/")
        };

        let mut children: BTreeMap<String, bool> = BTreeMap::new();
        for file in state.files.keys() {
            if let Some(rest) = file.strip_prefix(&prefix) {
                match rest.split_once('/') {
                    Some((child, _)) => children.insert(child.to_string(), true),
                    None => children.insert(rest.to_string(), false),
                };
            }
        }
        for known in &state.dirs {
            if let Some(rest) = known.strip_prefix(&prefix) {
                let child = rest.split('/').next().unwrap_or(rest);
                if !child.is_empty() {
                    children.insert(child.to_string(), true);
                }
            }
        }

        if children.is_empty() && !state.dirs.contains(&dir) {
            return Err(RemoteError::NotFound { path: dir });
        }

        Ok(children
            .into_iter()
            .map(|(name, is_dir)| {
                if is_dir {
                    RemoteDirEntry::directory(name)
                } else {
                    RemoteDirEntry::file(name)
                }
            })
            .collect())
    }

    fn open(&self, path: &str) -> RemoteResult<RemoteStream> {
        self.record(RemoteCall::Open(path.to_string()));
        lock(&self.state)
            .files
            .get(&normalize(path))
            .cloned()
            .map(|bytes| Box::new(Cursor::new(bytes)) as RemoteStream)
            .ok_or_else(|| RemoteError::NotFound {
                path: path.to_string(),
            })
    }
}

impl FileUploadDeleter for FakeRemoteHost {
    fn upload(&self, contents: &mut dyn Read, destination: &str) -> RemoteResult<()> {
        let mut bytes = Vec::new();
        contents
            .read_to_end(&mut bytes)
            .map_err(|source| RemoteError::io("upload.read", destination, source))?;
        self.record(RemoteCall::Upload {
            path: destination.to_string(),
            contents: bytes.clone(),
        });

        let mut state = lock(&self.state);
        let path = normalize(destination);
        if state.failing_uploads.contains(&path) {
            return Err(RemoteError::transport(
                "upload",
                io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
            ));
        }
        state.files.insert(path, bytes);
        Ok(())
    }

    fn delete(&self, path: &str) -> RemoteResult<()> {
        self.record(RemoteCall::Delete(path.to_string()));
        let mut state = lock(&self.state);
        let path = normalize(path);
        if state.failing_deletes.contains(&path) {
            return Err(RemoteError::transport(
                "delete",
                io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
            ));
        }
        if state.files.remove(&path).is_some() || state.dirs.remove(&path) {
            Ok(())
        } else {
            Err(RemoteError::NotFound { path })
        }
    }

    fn mkdir(&self, path: &str) -> RemoteResult<()> {
        self.record(RemoteCall::Mkdir(path.to_string()));
        lock(&self.state).dirs.insert(normalize(path));
        Ok(())
    }
}

struct BrokenReader {
    inner: Cursor<Vec<u8>>,
}

impl BrokenReader {
    const fn new(bytes: Vec<u8>) -> Self {
        Self {
            inner: Cursor::new(bytes),
        }
    }
}

impl Read for BrokenReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf)? {
            0 => Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "remote stream reset",
            )),
            read => Ok(read),
        }
    }
}

#[derive(Debug, Clone)]
enum HttpReply {
    Body(Vec<u8>),
    Status(u16),
}

/// Fake web server keyed by exact URL. Unknown URLs fail as unreachable.
#[derive(Debug, Default)]
pub struct FakeHttpGetter {
    replies: Mutex<HashMap<String, HttpReply>>,
    requests: Mutex<Vec<String>>,
}

impl FakeHttpGetter {
    /// Getter that fails every request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    #[must_use]
    pub fn with_body(self, url: &str, body: impl AsRef<[u8]>) -> Self {
        lock(&self.replies).insert(url.to_string(), HttpReply::Body(body.as_ref().to_vec()));
        self
    }

    /// Answer `url` with an error status.
    #[must_use]
    pub fn with_status(self, url: &str, status: u16) -> Self {
        lock(&self.replies).insert(url.to_string(), HttpReply::Status(status));
        self
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }
}

impl HttpGetter for FakeHttpGetter {
    fn get(&self, url: &str) -> RemoteResult<RemoteStream> {
        lock(&self.requests).push(url.to_string());
        match lock(&self.replies).get(url).cloned() {
            Some(HttpReply::Body(body)) => Ok(Box::new(Cursor::new(body))),
            Some(HttpReply::Status(status)) => Err(RemoteError::Http {
                url: url.to_string(),
                status: Some(status),
                source: None,
            }),
            None => Err(RemoteError::Http {
                url: url.to_string(),
                status: None,
                source: Some(Box::new(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ))),
            }),
        }
    }
}

/// Prompter that replays canned answers and records the questions asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    questions: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    /// Prompter answering with `answers` in order, then failing with EOF.
    #[must_use]
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            questions: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far.
    #[must_use]
    pub fn questions(&self) -> Vec<String> {
        lock(&self.questions).clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt(&self, question: &str) -> io::Result<String> {
        lock(&self.questions).push(question.to_string());
        lock(&self.answers)
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer"))
    }
}

/// Name generator that always returns the same token.
#[derive(Debug, Clone)]
pub struct FixedNames(pub String);

impl FixedNames {
    /// Generator returning `token` on every call.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl NameGenerator for FixedNames {
    fn token(&self) -> String {
        self.0.clone()
    }
}
