// ── MAC address ──

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// MAC address, normalized to uppercase colon-separated format
/// (`00:0D:3A:12:34:56`), the form NetBox echoes back.
///
/// Cloud APIs report NIC addresses dash-separated (`00-0D-3A-12-34-56`)
/// or as bare hex; both normalize to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MacAddress(String);

impl MacAddress {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let upper = raw.as_ref().trim().to_uppercase().replace('-', ":");
        if upper.len() == 12 && upper.chars().all(|c| c.is_ascii_hexdigit()) {
            let pairs: Vec<String> = upper
                .as_bytes()
                .chunks(2)
                .map(|pair| String::from_utf8_lossy(pair).into_owned())
                .collect();
            return Self(pairs.join(":"));
        }
        Self(upper)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<String> for MacAddress {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.0
    }
}
