// ── Environment classifier ──

use serde::Serialize;
use strum::{Display, EnumIter, IntoEnumIterator};

/// Coarse environment label derived from a subscription display name.
///
/// Variants are declared in priority order; `classify` returns the first
/// whose token appears, so "dev-prd-shared" is `Dev`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter)]
#[strum(serialize_all = "UPPERCASE")]
pub enum EnvironmentLabel {
    Dev,
    Hml,
    Uat,
    Prd,
}

impl EnvironmentLabel {
    fn tokens(self) -> &'static [&'static str] {
        match self {
            Self::Dev => &["dev"],
            Self::Hml => &["hml", "staging"],
            Self::Uat => &["uat"],
            Self::Prd => &["prd", "prod"],
        }
    }

    /// Tag slug for this environment.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Hml => "hml",
            Self::Uat => "uat",
            Self::Prd => "prd",
        }
    }
}

/// Scan the lower-cased display name for a known environment token.
pub fn classify(display_name: &str) -> Option<EnvironmentLabel> {
    let lower = display_name.to_lowercase();
    EnvironmentLabel::iter().find(|label| label.tokens().iter().any(|t| lower.contains(t)))
}
