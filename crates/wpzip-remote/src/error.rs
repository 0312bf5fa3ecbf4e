//! Mapping from transport errors to [`RemoteError`], and command redaction.

use russh_sftp::client::error::Error as SftpError;
use russh_sftp::protocol::StatusCode;
use wpzip_core::RemoteError;

const PASSWORD_FLAG: &str = "--password=";
const REDACTED: &str = "'***'";

pub(crate) fn sftp(operation: &'static str, path: &str, err: SftpError) -> RemoteError {
    match &err {
        SftpError::Status(status) if matches!(status.status_code, StatusCode::NoSuchFile) => {
            RemoteError::NotFound {
                path: path.to_string(),
            }
        }
        _ => RemoteError::transport(operation, err),
    }
}

pub(crate) fn ssh(operation: &'static str, err: russh::Error) -> RemoteError {
    RemoteError::transport(operation, err)
}

/// `command` with the value of every `--password=` argument replaced.
///
/// Understands POSIX single quoting, including the `'\''` escape.
#[must_use]
pub fn redact_command(command: &str) -> String {
    let mut redacted = String::with_capacity(command.len());
    let mut rest = command;
    while let Some(start) = rest.find(PASSWORD_FLAG) {
        let value_start = start + PASSWORD_FLAG.len();
        redacted.push_str(&rest[..value_start]);
        redacted.push_str(REDACTED);
        rest = &rest[value_start + shell_word_len(&rest[value_start..])..];
    }
    redacted.push_str(rest);
    redacted
}

/// Byte length of the shell word at the start of `text`.
fn shell_word_len(text: &str) -> usize {
    let mut quoted = false;
    let mut escaped = false;
    for (index, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\'' => quoted = !quoted,
            '\\' if !quoted => escaped = true,
            ch if ch.is_whitespace() && !quoted => return index,
            _ => {}
        }
    }
    text.len()
}
