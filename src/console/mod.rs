// ABOUTME: Console boundary: prompts, selections, confirmations and progress.
// ABOUTME: Synchronous trait so engines stay independent of the terminal library.

mod terminal;

pub use terminal::TerminalConsole;

/// Errors from interactive console operations.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// The user aborted the prompt.
    #[error("prompt cancelled by user")]
    Cancelled,

    /// No answer can be obtained (e.g. non-interactive session).
    #[error("cannot prompt: {0}")]
    Unavailable(String),

    #[error("console I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options for a free-text prompt.
#[derive(Debug, Clone, Default)]
pub struct PromptOptions {
    pub message: String,
    pub help: Option<String>,
    pub default: Option<String>,
    /// Mask the input.
    pub secure: bool,
}

impl PromptOptions {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_help(mut self, help: Option<String>) -> Self {
        self.help = help;
        self
    }

    pub fn with_default(mut self, default: Option<String>) -> Self {
        self.default = default;
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }
}

/// Interactive console used by the orchestration engines.
pub trait Console: Send + Sync {
    /// Ask for free text.
    fn prompt(&self, options: &PromptOptions) -> Result<String, ConsoleError>;

    /// Pick one of `options`; returns its index.
    fn select(&self, message: &str, options: &[String], default: usize)
    -> Result<usize, ConsoleError>;

    /// Ask a yes/no question.
    fn confirm(&self, message: &str, default: bool) -> Result<bool, ConsoleError>;

    /// Print an informational line.
    fn message(&self, text: &str);

    /// Show a spinner with the given text; replaces any current spinner.
    fn show_progress(&self, text: &str);

    /// Remove the spinner, if any.
    fn stop_progress(&self);
}
