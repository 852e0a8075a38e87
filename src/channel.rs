use std::time::Duration;

use crate::error::ChannelError;

/// Line-oriented connection to a server under test.
///
/// The runner only ever talks to the server through this capability, so it
/// can be driven by a real child process or by an in-memory fake.
#[allow(async_fn_in_trait)]
pub trait LineChannel {
    /// Write one message followed by `\n` and flush it.
    async fn write_line(&mut self, line: &str) -> Result<(), ChannelError>;

    /// Wait up to `timeout` for the next non-empty line.
    ///
    /// Returns `Ok(None)` once the server's output stream has reached EOF.
    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, ChannelError>;

    /// Tear the connection down. Consumes the channel, so it runs at most once.
    async fn terminate(self);
}
