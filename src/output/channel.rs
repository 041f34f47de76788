/// Channeled output: several logical streams multiplexed onto one sink
/// without breaking line boundaries.
///
/// At most one incomplete line is pending at any time. Writing to a channel
/// other than the one that left the line open starts a fresh line first;
/// repeated writes to the same channel continue the line.
use std::io::{self, Write};

#[derive(Debug)]
pub struct ChannelWriter<W: Write> {
    sink: W,
    at_line_start: bool,
    last_channel: Option<String>,
}

impl<W: Write> ChannelWriter<W> {
    #[must_use]
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            at_line_start: true,
            last_channel: None,
        }
    }

    /// Write `text` on `channel`.
    ///
    /// Unchanneled writes (`None`) are always complete lines: a newline is
    /// appended immediately. The sink is flushed so an open line is visible.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the sink.
    pub fn write(&mut self, text: &str, channel: Option<&str>) -> io::Result<()> {
        if !self.at_line_start && channel != self.last_channel.as_deref() {
            self.sink.write_all(b"\n")?;
        }

        self.sink.write_all(text.as_bytes())?;
        self.at_line_start = false;

        if channel.is_none() {
            self.sink.write_all(b"\n")?;
            self.at_line_start = true;
        }
        self.last_channel = channel.map(str::to_owned);
        self.sink.flush()
    }

    /// Terminate the pending line, if any.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the sink.
    pub fn close(&mut self) -> io::Result<()> {
        if !self.at_line_start {
            self.sink.write_all(b"\n")?;
            self.at_line_start = true;
        }
        self.sink.flush()
    }

    /// Close any pending line, then write `text` verbatim.
    ///
    /// Raw text is outside channel tracking: a missing trailing newline here
    /// does not mark the line as open.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the sink.
    pub fn print(&mut self, text: &str) -> io::Result<()> {
        self.close()?;
        self.sink.write_all(text.as_bytes())?;
        if text.ends_with('\n') {
            Ok(())
        } else {
            self.sink.flush()
        }
    }

    #[must_use]
    pub fn at_line_start(&self) -> bool {
        self.at_line_start
    }

    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Unwrap the sink. Pending lines are not closed.
    pub fn into_inner(self) -> W {
        self.sink
    }
}
