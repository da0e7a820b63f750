use std::fmt;

/// Canonical upper-case status label for a run.
///
/// The backend owns the status vocabulary and may grow it at any time, so
/// this is a newtype over the raw label rather than a closed enum. Labels we
/// do not recognize are carried through verbatim (upper-cased) and render
/// as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunStatus(String);

impl RunStatus {
    pub const UNKNOWN: &'static str = "UNKNOWN";

    /// Canonicalize a raw status value. Missing, null or blank input maps to
    /// `UNKNOWN`.
    pub fn from_raw(raw: Option<&str>) -> Self {
        let label = raw
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_ascii_uppercase())
            .unwrap_or_else(|| Self::UNKNOWN.to_string());
        Self(label)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Terminal states: the run is done or dead and no further ticks will
    /// change it.
    pub fn is_terminal(&self) -> bool {
        matches!(self.0.as_str(), "HALT" | "FAILED" | "ERROR" | "SUCCESS")
    }

    pub fn is_blocked(&self) -> bool {
        self.0 == "BLOCKED"
    }

    pub fn is_halted(&self) -> bool {
        self.0 == "HALT"
    }

    pub fn is_success(&self) -> bool {
        self.0 == "SUCCESS"
    }

    /// FAILED/ERROR runs can be retried.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.0.as_str(), "FAILED" | "ERROR")
    }
}

impl Default for RunStatus {
    fn default() -> Self {
        Self(Self::UNKNOWN.to_string())
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RunStatus {
    fn from(raw: &str) -> Self {
        Self::from_raw(Some(raw))
    }
}
