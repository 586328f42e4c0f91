//! Display sink abstraction.

use talkroom_core::DisplayCommand;

/// Renders display commands.
///
/// Commands must be rendered in the order given. A failing sink stops the
/// runtime.
pub trait DisplaySink: Send {
    /// Sink-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Render one command.
    ///
    /// # Errors
    ///
    /// Returns an error if the output could not be written.
    fn render(&mut self, command: DisplayCommand) -> Result<(), Self::Error>;
}
