//! Network connectivity state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether the device currently has network connectivity.
///
/// There is deliberately no intermediate state: a flaky network shows up as
/// a sequence of transitions, and a dropped connection mid-drain surfaces as
/// a remote submission failure instead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// The network is reachable. This is the optimistic default.
    #[default]
    Online,
    /// The network is unreachable.
    Offline,
}

impl Connectivity {
    /// Returns true if online.
    pub fn is_online(self) -> bool {
        self == Connectivity::Online
    }

    /// Parse a status word as written by platform helpers and status files.
    ///
    /// Accepts `online`/`offline`, `up`/`down` and `1`/`0`, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" | "up" | "1" => Some(Connectivity::Online),
            "offline" | "down" | "0" => Some(Connectivity::Offline),
            _ => None,
        }
    }
}

impl From<bool> for Connectivity {
    fn from(online: bool) -> Self {
        if online {
            Connectivity::Online
        } else {
            Connectivity::Offline
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Online => f.write_str("online"),
            Connectivity::Offline => f.write_str("offline"),
        }
    }
}
