/// Output layer: channeled writer, console, help rendering.
pub mod channel;
pub mod console;
pub mod help;

pub use channel::ChannelWriter;
pub use console::{Console, SharedBuffer, read_console, read_stdin_all, term_size};
pub use help::{render_help, wordwrap};
