use serde::{Deserialize, Serialize};

/// Coarse device class shown in the raw visit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
    Mobile,
    Desktop,
}

impl Device {
    /// `Mobile` when the user agent contains "Mobile", otherwise `Desktop`.
    pub fn classify(user_agent: Option<&str>) -> Self {
        if user_agent.is_some_and(|ua| ua.contains("Mobile")) {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "Mobile",
            Self::Desktop => "Desktop",
        }
    }
}
