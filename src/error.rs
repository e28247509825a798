/// What the backend meant, recovered once from its free-text error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    InsufficientBalance,
    FinishedGame,
    NoTable,
    Other,
}

impl ErrorCode {
    pub fn classify(message: &str) -> Self {
        let lowered = message.to_ascii_lowercase();
        if lowered.contains("insufficient balance") {
            ErrorCode::InsufficientBalance
        } else if lowered.contains("finished game") {
            ErrorCode::FinishedGame
        } else if lowered.contains("table not setup") {
            ErrorCode::NoTable
        } else {
            ErrorCode::Other
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ApiErrorKind {
    /// Non-2xx answer from the service.
    Backend { status: u16, code: ErrorCode },
    /// The request never produced a response.
    Network,
    /// A response arrived but could not be understood.
    Decode,
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        let code = ErrorCode::classify(&message);
        Self {
            kind: ApiErrorKind::Backend { status, code },
            message,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Decode,
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self.kind {
            ApiErrorKind::Backend { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ApiErrorKind::Backend { status: 404, .. })
    }
}

const HEX_RUN_THRESHOLD: usize = 40;

/// Shortens long keys for display: `0123456789[...]abcdef0123`.
pub fn truncate_key(key: &str) -> String {
    if key.chars().count() <= 20 {
        return key.to_string();
    }
    let head: String = key.chars().take(10).collect();
    let tail: String = key
        .chars()
        .rev()
        .take(10)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{head}[...]{tail}")
}

/// Replaces every run of 40+ hex digits (session keys, hashes) with its
/// truncated form so backend messages stay readable.
pub fn format_error_message(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut run = String::new();
    let flush = |run: &mut String, out: &mut String| {
        if run.len() >= HEX_RUN_THRESHOLD {
            out.push_str(&truncate_key(run));
        } else {
            out.push_str(run);
        }
        run.clear();
    };
    for ch in message.chars() {
        if ch.is_ascii_hexdigit() {
            run.push(ch);
        } else {
            flush(&mut run, &mut out);
            out.push(ch);
        }
    }
    flush(&mut run, &mut out);
    out
}
