use std::fs::OpenOptions;
use std::io::{self, Write};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use ei_core::services::prompt::Prompter;
use ei_core::{InstallerError, Result};

#[cfg(windows)]
const TTY_IN: &str = "CONIN$";
#[cfg(windows)]
const TTY_OUT: &str = "CONOUT$";
#[cfg(not(windows))]
const TTY_IN: &str = "/dev/tty";
#[cfg(not(windows))]
const TTY_OUT: &str = "/dev/tty";

/// Restores cooked mode when dropped, including on early return.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Prompts on the controlling terminal rather than stdin, so answers can be
/// typed even when the installer itself arrives through a pipe.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
    raw_secrets: bool,
}

impl TerminalPrompter<BufReader<File>, std::fs::File> {
    pub fn open() -> Result<Self> {
        let no_terminal = |e: io::Error| {
            InstallerError::Input(format!(
                "no controlling terminal ({e}); run the installer from an interactive shell"
            ))
        };
        let input = std::fs::File::open(TTY_IN).map_err(no_terminal)?;
        let output = OpenOptions::new()
            .write(true)
            .open(TTY_OUT)
            .map_err(no_terminal)?;
        Ok(Self {
            input: BufReader::new(File::from_std(input)),
            output,
            raw_secrets: true,
        })
    }
}

impl<R: AsyncBufRead + Unpin, W: Write> TerminalPrompter<R, W> {
    /// Prompt over arbitrary streams. Secrets are read as plain lines.
    pub fn from_streams(input: R, output: W) -> Self {
        Self {
            input,
            output,
            raw_secrets: false,
        }
    }

    fn write_label(&mut self, label: &str) -> Result<()> {
        write!(self.output, "{label}").map_err(input_error)?;
        self.output.flush().map_err(input_error)
    }
}

/// Collect keystrokes in raw mode until Enter. Nothing is echoed.
fn read_secret_keys() -> Result<String> {
    let _guard = RawModeGuard::enable().map_err(input_error)?;
    let mut secret = String::new();
    loop {
        let Event::Key(key) = event::read().map_err(input_error)? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(secret),
            KeyCode::Char('c') | KeyCode::Char('d')
                if key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                return Err(InstallerError::Input("interrupted".into()));
            }
            KeyCode::Char(c) => secret.push(c),
            KeyCode::Backspace => {
                secret.pop();
            }
            _ => {}
        }
    }
}

impl<R: AsyncBufRead + Unpin, W: Write> Prompter for TerminalPrompter<R, W> {
    async fn read_line(&mut self, label: &str) -> Result<String> {
        self.write_label(label)?;
        let mut line = String::new();
        let read = self.input.read_line(&mut line).await.map_err(input_error)?;
        if read == 0 {
            return Err(InstallerError::Input("input closed".into()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    async fn read_secret(&mut self, label: &str) -> Result<String> {
        if !self.raw_secrets {
            return self.read_line(label).await;
        }
        self.write_label(label)?;
        // crossterm's event read blocks, so it runs off the async workers.
        let secret = tokio::task::spawn_blocking(read_secret_keys)
            .await
            .map_err(|e| InstallerError::Input(format!("secret input task failed: {e}")))?;
        let _ = writeln!(self.output);
        secret
    }

    fn notice(&mut self, message: &str) {
        let _ = writeln!(self.output, "  {message}");
    }
}

fn input_error(e: io::Error) -> InstallerError {
    InstallerError::Input(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn read_line_writes_label_and_strips_newline() {
        let mut output = Vec::new();
        let mut prompter =
            TerminalPrompter::from_streams(Cursor::new("db.internal\r\n"), &mut output);
        let value = prompter.read_line("Database host: ").await.unwrap();
        assert_eq!(value, "db.internal");
        drop(prompter);
        assert_eq!(String::from_utf8(output).unwrap(), "Database host: ");
    }

    #[tokio::test]
    async fn closed_input_is_an_error() {
        let mut prompter = TerminalPrompter::from_streams(Cursor::new(""), Vec::new());
        assert!(matches!(
            prompter.read_line("Database host: ").await,
            Err(InstallerError::Input(_))
        ));
    }

    #[tokio::test]
    async fn lines_are_read_in_order() {
        let mut prompter =
            TerminalPrompter::from_streams(Cursor::new("first\nsecond\n"), Vec::new());
        assert_eq!(prompter.read_line("a: ").await.unwrap(), "first");
        assert_eq!(prompter.read_line("b: ").await.unwrap(), "second");
    }

    #[tokio::test]
    async fn secrets_are_never_written_back() {
        let mut output = Vec::new();
        let mut prompter =
            TerminalPrompter::from_streams(Cursor::new("hunter2\n"), &mut output);
        assert_eq!(
            prompter.read_secret("Database password: ").await.unwrap(),
            "hunter2"
        );
        drop(prompter);
        let written = String::from_utf8(output).unwrap();
        assert!(!written.contains("hunter2"));
    }

    #[test]
    fn notices_are_indented() {
        let mut output = Vec::new();
        let mut prompter = TerminalPrompter::from_streams(Cursor::new(""), &mut output);
        prompter.notice("Database host is required.");
        drop(prompter);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "  Database host is required.\n"
        );
    }
}
