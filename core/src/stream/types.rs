use serde::{Deserialize, Serialize};

/// OS-level output stream owned by a redirector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamId {
    Stdout,
    Stderr,
}

impl StreamId {
    pub fn label(self) -> &'static str {
        match self {
            StreamId::Stdout => "stdout",
            StreamId::Stderr => "stderr",
        }
    }

    /// File descriptor number of the stream in the current process.
    pub fn raw_fd(self) -> i32 {
        match self {
            StreamId::Stdout => 1,
            StreamId::Stderr => 2,
        }
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// What happens to captured bytes besides being broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Passthrough {
    /// Captured bytes never reach the original destination.
    #[default]
    Swallow,
    /// Captured bytes are also written to the original destination.
    Tee,
}

/// Mechanism used to install the capture function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    /// In-process `StreamPort` swap; only writes made through the port are seen.
    #[default]
    Writer,
    /// Descriptor-level interception (unix only); sees every write to fd 1/2,
    /// including those of inherited child processes.
    Fd,
}

impl std::str::FromStr for HookKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "writer" => Ok(HookKind::Writer),
            "fd" => Ok(HookKind::Fd),
            other => Err(format!("unknown hook kind '{other}' (expected writer|fd)")),
        }
    }
}

impl std::str::FromStr for Passthrough {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "swallow" => Ok(Passthrough::Swallow),
            "tee" => Ok(Passthrough::Tee),
            other => Err(format!(
                "unknown passthrough mode '{other}' (expected swallow|tee)"
            )),
        }
    }
}
