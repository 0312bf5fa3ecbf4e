//! SSH connection, password authentication, and command execution.
//!
//! # Design
//! - One TCP connection carries every channel: each command gets its own
//!   session channel and the file-transfer subsystem keeps a long-lived one.
//! - Host keys are compared by `SHA256:` fingerprint. Without a pinned
//!   fingerprint the presented key is accepted and logged.
//! - Blocking trait methods enter the runtime captured at connect time.

use std::io;
use std::sync::{Arc, Mutex};

use russh::Disconnect;
use russh::client::{self, Handle, Msg};
use russh::keys::ssh_key::{HashAlg, PublicKey};
use russh_sftp::client::SftpSession;
use tokio::runtime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wpzip_config::{ConnectionSettings, Secret, TimeoutSettings};
use wpzip_core::{RemoteCommandRunner, RemoteError, RemoteResult, RemoteStream};

use crate::error::{self, redact_command};
use crate::exec;

const KEEPALIVE_MAX: usize = 3;

/// Host key verifier handed to the SSH client.
pub(crate) struct HostKeyCheck {
    expected: Option<String>,
    presented: Arc<Mutex<Option<String>>>,
}

impl HostKeyCheck {
    fn new(expected: Option<String>) -> (Self, Arc<Mutex<Option<String>>>) {
        let presented = Arc::new(Mutex::new(None));
        (
            Self {
                expected,
                presented: Arc::clone(&presented),
            },
            presented,
        )
    }

    fn accepts(&self, fingerprint: &str) -> bool {
        self.expected
            .as_deref()
            .is_none_or(|expected| expected == fingerprint)
    }
}

impl client::Handler for HostKeyCheck {
    type Error = russh::Error;

    async fn check_server_key(&mut self, key: &PublicKey) -> Result<bool, Self::Error> {
        let fingerprint = key.fingerprint(HashAlg::Sha256).to_string();
        if let Ok(mut slot) = self.presented.lock() {
            *slot = Some(fingerprint.clone());
        }
        if self.expected.is_none() {
            warn!(%fingerprint, "host key not pinned; accepting presented key");
        }
        Ok(self.accepts(&fingerprint))
    }
}

/// An authenticated SSH session with an open file-transfer subsystem.
pub struct SshSession {
    pub(crate) runtime: runtime::Handle,
    handle: Handle<HostKeyCheck>,
    pub(crate) sftp: SftpSession,
    cancel: CancellationToken,
    channel_depth: usize,
}

impl SshSession {
    /// Connect, authenticate with the configured password, and start SFTP.
    ///
    /// Must be awaited on the runtime that will later service the blocking
    /// trait methods.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Timeout`] when `timeouts.connect` elapses,
    /// [`RemoteError::HostKeyRejected`] on a fingerprint mismatch,
    /// [`RemoteError::AuthenticationRejected`] when the password is refused,
    /// and [`RemoteError::Transport`] for any other failure.
    pub async fn connect(
        settings: &ConnectionSettings,
        timeouts: &TimeoutSettings,
        cancel: CancellationToken,
    ) -> RemoteResult<Self> {
        let attempt = Self::establish(settings, timeouts, cancel.clone());
        let session = tokio::select! {
            () = cancel.cancelled() => {
                return Err(RemoteError::Cancelled { operation: "ssh.connect" });
            }
            result = tokio::time::timeout(timeouts.connect, attempt) => result
                .map_err(|_| RemoteError::Timeout { operation: "ssh.connect" })??,
        };
        info!(host = %settings.host, port = settings.port, "ssh session established");
        Ok(session)
    }

    async fn establish(
        settings: &ConnectionSettings,
        timeouts: &TimeoutSettings,
        cancel: CancellationToken,
    ) -> RemoteResult<Self> {
        let config = Arc::new(client::Config {
            keepalive_interval: Some(timeouts.keepalive),
            keepalive_max: KEEPALIVE_MAX,
            ..Default::default()
        });
        let (check, presented) = HostKeyCheck::new(settings.host_key.clone());

        let mut handle =
            match client::connect(config, (settings.host.as_str(), settings.port), check).await {
                Ok(handle) => handle,
                Err(russh::Error::UnknownKey) => {
                    let fingerprint = presented
                        .lock()
                        .ok()
                        .and_then(|slot| slot.clone())
                        .unwrap_or_default();
                    return Err(RemoteError::HostKeyRejected { fingerprint });
                }
                Err(err) => return Err(error::ssh("ssh.connect", err)),
            };

        let password = settings
            .password
            .as_ref()
            .map_or("", Secret::expose);
        let auth = handle
            .authenticate_password(settings.username.as_str(), password)
            .await
            .map_err(|err| error::ssh("ssh.authenticate", err))?;
        if !auth.success() {
            return Err(RemoteError::AuthenticationRejected {
                user: settings.username.clone(),
            });
        }
        debug!(user = %settings.username, "password accepted");

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|err| error::ssh("sftp.open_channel", err))?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|err| error::ssh("sftp.subsystem", err))?;
        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|err| error::sftp("sftp.init", "", err))?;

        Ok(Self {
            runtime: runtime::Handle::current(),
            handle,
            sftp,
            cancel,
            channel_depth: settings.channel_depth,
        })
    }

    /// Close the file-transfer subsystem and disconnect.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Transport`] when the disconnect cannot be sent.
    pub async fn close(self) -> RemoteResult<()> {
        if let Err(err) = self.sftp.close().await {
            debug!(error = %err, "sftp close failed");
        }
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|err| error::ssh("ssh.disconnect", err))
    }

    async fn exec(&self, command: &str) -> RemoteResult<russh::Channel<Msg>> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|err| error::ssh("exec.open_channel", err))?;
        channel
            .exec(true, command)
            .await
            .map_err(|err| error::ssh("exec.start", err))?;
        Ok(channel)
    }
}

impl RemoteCommandRunner for SshSession {
    fn can_run(&self, command: &str) -> bool {
        match self.run(command) {
            Ok(mut output) => match io::copy(&mut output, &mut io::sink()) {
                Ok(_) => true,
                Err(err) => {
                    debug!(command = %redact_command(command), error = %err, "probe failed");
                    false
                }
            },
            Err(err) => {
                debug!(command = %redact_command(command), error = %err, "probe not started");
                false
            }
        }
    }

    fn run(&self, command: &str) -> RemoteResult<RemoteStream> {
        if self.cancel.is_cancelled() {
            return Err(RemoteError::Cancelled { operation: "exec" });
        }
        debug!(command = %redact_command(command), "running remote command");
        let channel = self.runtime.block_on(self.exec(command))?;
        let (tx, reader) = exec::queue(self.channel_depth);
        self.runtime.spawn(exec::pump(
            channel,
            command.to_string(),
            tx,
            self.cancel.clone(),
        ));
        Ok(Box::new(reader))
    }
}
