use thiserror::Error;

/// Failure talking to the provider CLI
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider executable could not be started.
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        /// Program that was invoked
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The provider ran but exited unsuccessfully.
    #[error("`{program}` exited with {}: {stderr}", exit_label(.code))]
    Exit {
        /// Program that was invoked
        program: String,
        /// Exit code, `None` if killed by a signal
        code: Option<i32>,
        /// Captured standard error, trimmed
        stderr: String,
    },

    /// The provider's output was not the JSON we asked for.
    #[error("malformed JSON response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ProviderError {
    /// True for malformed-output errors, false for invocation errors.
    #[must_use]
    pub const fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    /// Console message for this error, carrying the `Ошибка` marker.
    #[must_use]
    pub fn console_message(&self) -> String {
        if self.is_parse() {
            format!("Ошибка парсинга JSON: {self}")
        } else {
            format!("Ошибка выполнения команды: {self}")
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| format!("code {c}"))
}
