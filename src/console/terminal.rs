// ABOUTME: Terminal console backed by dialoguer prompts and an indicatif spinner.
// ABOUTME: Maps prompt interruptions to ConsoleError::Cancelled.

use dialoguer::{Confirm, Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::time::Duration;

use super::{Console, ConsoleError, PromptOptions};

/// Console that talks to the user's terminal.
#[derive(Default)]
pub struct TerminalConsole {
    spinner: Mutex<Option<ProgressBar>>,
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a prompt with the spinner suspended so they do not overlap.
    fn suspended<T>(&self, f: impl FnOnce() -> Result<T, dialoguer::Error>) -> Result<T, ConsoleError> {
        let guard = self.spinner.lock();
        let result = match guard.as_ref() {
            Some(bar) => bar.suspend(f),
            None => f(),
        };
        drop(guard);
        result.map_err(map_error)
    }
}

impl Console for TerminalConsole {
    fn prompt(&self, options: &PromptOptions) -> Result<String, ConsoleError> {
        if let Some(help) = &options.help {
            self.message(help);
        }

        if options.secure {
            return self.suspended(|| {
                Password::new()
                    .with_prompt(&options.message)
                    .allow_empty_password(true)
                    .interact()
            });
        }

        self.suspended(|| {
            let mut input = Input::<String>::new()
                .with_prompt(&options.message)
                .allow_empty(true);
            if let Some(default) = &options.default {
                input = input.default(default.clone());
            }
            input.interact_text()
        })
    }

    fn select(
        &self,
        message: &str,
        options: &[String],
        default: usize,
    ) -> Result<usize, ConsoleError> {
        self.suspended(|| {
            Select::new()
                .with_prompt(message)
                .items(options)
                .default(default)
                .interact()
        })
    }

    fn confirm(&self, message: &str, default: bool) -> Result<bool, ConsoleError> {
        self.suspended(|| {
            Confirm::new()
                .with_prompt(message)
                .default(default)
                .interact()
        })
    }

    fn message(&self, text: &str) {
        match self.spinner.lock().as_ref() {
            Some(bar) => bar.println(text),
            None => println!("{text}"),
        }
    }

    fn show_progress(&self, text: &str) {
        let mut guard = self.spinner.lock();
        if let Some(bar) = guard.as_ref() {
            bar.set_message(text.to_string());
            return;
        }

        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            bar.set_style(style);
        }
        bar.set_message(text.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        *guard = Some(bar);
    }

    fn stop_progress(&self) {
        if let Some(bar) = self.spinner.lock().take() {
            bar.finish_and_clear();
        }
    }
}

fn map_error(err: dialoguer::Error) -> ConsoleError {
    match err {
        dialoguer::Error::IO(io) if io.kind() == ErrorKind::Interrupted => ConsoleError::Cancelled,
        dialoguer::Error::IO(io) => ConsoleError::Io(io),
    }
}
