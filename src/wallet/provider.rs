use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wallets a user can ask to connect with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    Petra,
    Martian,
    Pontem,
    Rise,
    Other,
}

impl WalletKind {
    pub const ALL: [WalletKind; 5] = [
        WalletKind::Petra,
        WalletKind::Martian,
        WalletKind::Pontem,
        WalletKind::Rise,
        WalletKind::Other,
    ];

    /// Name the wallet's extension registers with the adapter.
    pub fn adapter_name(&self) -> &'static str {
        match self {
            WalletKind::Petra => "Petra",
            WalletKind::Martian => "Martian",
            WalletKind::Pontem => "Pontem",
            WalletKind::Rise => "Rise",
            WalletKind::Other => "Other",
        }
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            WalletKind::Petra => "petra",
            WalletKind::Martian => "martian",
            WalletKind::Pontem => "pontem",
            WalletKind::Rise => "rise",
            WalletKind::Other => "other",
        };
        f.write_str(tag)
    }
}

impl FromStr for WalletKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WalletKind::ALL
            .into_iter()
            .find(|kind| kind.adapter_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown wallet kind: {}", s))
    }
}

/// Provider-reported availability of a wallet extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadyState {
    Installed,
    Loadable,
    NotDetected,
    Unsupported,
}

impl ReadyState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ReadyState::Installed)
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub ready_state: ReadyState,
}

impl ProviderInfo {
    pub fn new(name: impl Into<String>, ready_state: ReadyState) -> Self {
        Self {
            name: name.into(),
            ready_state,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready_state.is_ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("PETRA".parse::<WalletKind>().unwrap(), WalletKind::Petra);
        assert_eq!(" rise ".parse::<WalletKind>().unwrap(), WalletKind::Rise);
        assert!("phantom".parse::<WalletKind>().is_err());
    }

    #[test]
    fn only_installed_is_ready() {
        assert!(ReadyState::Installed.is_ready());
        assert!(!ReadyState::Loadable.is_ready());
        assert!(!ReadyState::NotDetected.is_ready());
        assert!(!ReadyState::Unsupported.is_ready());
    }
}
