use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded page view.
///
/// `date` is the calendar day as seen by the recorder at write time, in the
/// recorder's timezone. It is stored alongside `timestamp` and never
/// re-derived from it, so the two may disagree for events written around
/// midnight or from another timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitEvent {
    pub visit_id: String,
    pub date: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub page: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl VisitEvent {
    /// Create an event with only the required fields set.
    pub fn new(visit_id: impl Into<String>, date: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            visit_id: visit_id.into(),
            date: date.into(),
            timestamp: None,
            page: page.into(),
            page_name: None,
            destination: None,
            destination_type: None,
            user_agent: None,
            language: None,
            screen_resolution: None,
            country: None,
            country_code: None,
            city: None,
            region: None,
        }
    }

    /// Human label for the page, falling back to the path.
    pub fn display_name(&self) -> &str {
        self.page_name.as_deref().unwrap_or(&self.page)
    }
}
