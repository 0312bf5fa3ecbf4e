//! Terminal prompts.

use std::io::{self, BufRead, Write};

use wpzip_core::Prompter;

const PASSWORD_PROMPT: &str = "Enter sftp password: ";

/// Asks questions on stdout and reads answers from stdin.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn prompt(&self, question: &str) -> io::Result<String> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{question}")?;
        stdout.flush()?;
        read_answer(&mut io::stdin().lock())
    }
}

fn read_answer(input: &mut dyn BufRead) -> io::Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "input closed before an answer was given",
        ));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Ask for the SSH password without echo until a non-empty one is entered.
pub(crate) fn read_password() -> io::Result<String> {
    loop {
        let password = rpassword::prompt_password(PASSWORD_PROMPT)?;
        if !password.is_empty() {
            return Ok(password);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn answers_lose_only_their_line_ending() -> anyhow::Result<()> {
        let mut input = Cursor::new("  /var/www/html \r\nnext\n");
        assert_eq!(read_answer(&mut input)?, "  /var/www/html ");
        assert_eq!(read_answer(&mut input)?, "next");
        Ok(())
    }

    #[test]
    fn closed_input_is_an_error() {
        let mut input = Cursor::new("");
        let err = read_answer(&mut input).err();
        assert_eq!(
            err.map(|err| err.kind()),
            Some(io::ErrorKind::UnexpectedEof)
        );
    }
}
