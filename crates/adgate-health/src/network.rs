//! Ad network identities, probe targets, and verdicts.

use serde::{Deserialize, Serialize};
use url::Url;

/// Per-network probe resources (the small loader script each network serves).
/// Embedded at compile time; individual targets can override the URL.
const PROBE_RESOURCES: &[(NetworkId, &str)] = &[
    (
        NetworkId::AdSense,
        "https://pagead2.googlesyndication.com/pagead/js/adsbygoogle.js",
    ),
    (
        NetworkId::Adsterra,
        "https://www.highperformanceformat.com/js/invoke.js",
    ),
];

/// Identifier of a supported ad network.
///
/// Two fixed providers in the current deployment; adding a network means
/// adding a variant here and a row in the probe resource table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    AdSense,
    Adsterra,
}

impl NetworkId {
    /// All supported networks, in default priority order.
    pub fn all() -> &'static [NetworkId] {
        &[NetworkId::AdSense, NetworkId::Adsterra]
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            NetworkId::AdSense => "Google AdSense",
            NetworkId::Adsterra => "Adsterra",
        }
    }

    /// Stable wire code, used as the JSON key in the persisted status record.
    pub fn code(&self) -> &'static str {
        match self {
            NetworkId::AdSense => "adsense",
            NetworkId::Adsterra => "adsterra",
        }
    }
}

impl std::fmt::Display for NetworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for NetworkId {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "adsense" => Ok(NetworkId::AdSense),
            "adsterra" => Ok(NetworkId::Adsterra),
            _ => Err(UnknownNetwork(s.to_string())),
        }
    }
}

/// Unknown network code.
#[derive(Debug, thiserror::Error)]
#[error("unknown ad network: {0}")]
pub struct UnknownNetwork(pub String);

/// Tri-state reachability outcome for one ad network.
///
/// Represented as an explicit enum, never a nullable boolean. `Untested`
/// is the only legal initial state and is never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Untested,
    Available,
    Blocked,
}

impl Verdict {
    pub fn is_available(&self) -> bool {
        matches!(self, Verdict::Available)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Blocked)
    }
}

/// One network's probe resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub network: NetworkId,
    /// The script resource whose load outcome decides the verdict.
    pub resource_url: Url,
}

impl ProbeTarget {
    pub fn new(network: NetworkId, resource_url: Url) -> Self {
        Self {
            network,
            resource_url,
        }
    }

    /// Default target for a network, from the compile-time resource table.
    pub fn default_for(network: NetworkId) -> Self {
        let raw = PROBE_RESOURCES
            .iter()
            .find(|(n, _)| *n == network)
            .map(|(_, url)| *url)
            .expect("every NetworkId has a probe resource");
        Self {
            network,
            resource_url: Url::parse(raw).expect("probe resource table holds valid URLs"),
        }
    }

    /// Default targets for all supported networks.
    pub fn defaults() -> Vec<ProbeTarget> {
        NetworkId::all()
            .iter()
            .map(|n| ProbeTarget::default_for(*n))
            .collect()
    }
}
