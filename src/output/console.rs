/// Script-facing console: quiet handling, error routing, prompts, countdowns.
use std::cell::RefCell;
use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::rc::Rc;
use std::time::Duration;

use super::channel::ChannelWriter;

/// Terminal size used when the environment does not report one.
pub const DEFAULT_TERM_SIZE: (usize, usize) = (80, 50);

/// Output and error streams for one script invocation.
///
/// Dropping the console closes any pending channeled line.
pub struct Console {
    writer: ChannelWriter<Box<dyn Write>>,
    /// `None` routes errors through the output stream.
    errors: Option<Box<dyn Write>>,
    quiet: bool,
}

impl Console {
    /// A console over explicit sinks.
    #[must_use]
    pub fn new(out: Box<dyn Write>, errors: Option<Box<dyn Write>>) -> Self {
        Self {
            writer: ChannelWriter::new(out),
            errors,
            quiet: false,
        }
    }

    /// Stdout for output; stderr for errors only when `interactive`.
    #[must_use]
    pub fn stdio(interactive: bool) -> Self {
        let errors: Option<Box<dyn Write>> = if interactive {
            Some(Box::new(io::stderr()))
        } else {
            None
        };
        Self::new(Box::new(io::stdout()), errors)
    }

    pub fn set_quiet(&mut self, quiet: bool) {
        self.quiet = quiet;
    }

    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Regular output, suppressed in quiet mode.
    ///
    /// Unchanneled text is written verbatim after closing any open channel.
    /// Channeled text loses one trailing newline; the channel decides where
    /// lines break.
    pub fn output(&mut self, text: &str, channel: Option<&str>) {
        if self.quiet {
            return;
        }
        let _ = match channel {
            None => self.writer.print(text),
            Some(channel) => {
                let text = text.strip_suffix('\n').unwrap_or(text);
                self.writer.write(text, Some(channel))
            }
        };
    }

    /// Error output. Never suppressed.
    pub fn error(&mut self, text: &str) {
        let _ = self.writer.close();
        match self.errors.as_mut() {
            Some(errors) => {
                let _ = writeln!(errors, "{text}");
                let _ = errors.flush();
            }
            None => {
                let _ = self.writer.print(&format!("{text}\n"));
            }
        }
    }

    /// Unchanneled text that ignores quiet mode, such as help.
    pub fn emit(&mut self, text: &str) {
        let _ = self.writer.print(text);
        let _ = self.writer.close();
    }

    /// Close any pending channeled line.
    pub fn close(&mut self) {
        let _ = self.writer.close();
    }

    /// Count down from `seconds` to zero, redrawing in place, one `tick` apart.
    /// Does nothing in quiet mode.
    pub fn count_down(&mut self, seconds: u64, tick: Duration) {
        if self.quiet {
            return;
        }
        for i in (0..=seconds).rev() {
            if i != seconds {
                let width = (i + 1).to_string().len();
                self.output(&"\x08".repeat(width), None);
            }
            self.output(&i.to_string(), None);
            if i > 0 && !tick.is_zero() {
                std::thread::sleep(tick);
            }
        }
        self.output("\n", None);
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        let _ = self.writer.close();
    }
}

/// Prompt on the terminal and read one trimmed line from stdin.
///
/// The prompt is only shown when stdin is a terminal. Returns `None` at EOF.
///
/// # Errors
///
/// Propagates I/O errors from stdin or stdout.
pub fn read_console(prompt: &str) -> io::Result<Option<String>> {
    let stdin = io::stdin();
    let show_prompt = stdin.is_terminal();
    let mut stdout = io::stdout();
    read_prompted(&mut stdin.lock(), &mut stdout, prompt, show_prompt)
}

/// [`read_console`] over arbitrary streams.
///
/// # Errors
///
/// Propagates I/O errors from `input` or `prompt_out`.
pub fn read_prompted<R: BufRead, W: Write>(
    input: &mut R,
    prompt_out: &mut W,
    prompt: &str,
    show_prompt: bool,
) -> io::Result<Option<String>> {
    if show_prompt {
        prompt_out.write_all(prompt.as_bytes())?;
        prompt_out.flush()?;
    }
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_owned()))
}

/// Read all of stdin.
///
/// # Errors
///
/// Propagates I/O errors from stdin.
pub fn read_stdin_all() -> io::Result<String> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

/// Terminal `(columns, rows)` from `COLUMNS`/`LINES`, falling back to
/// [`DEFAULT_TERM_SIZE`].
#[must_use]
pub fn term_size() -> (usize, usize) {
    let read = |var: &str, default: usize| {
        std::env::var(var)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(default)
    };
    (
        read("COLUMNS", DEFAULT_TERM_SIZE.0),
        read("LINES", DEFAULT_TERM_SIZE.1),
    )
}

/// An in-memory sink that can be cloned and inspected while a console owns it.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
