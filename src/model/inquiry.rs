use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which public form produced the inquiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InquiryKind {
    Booking,
    Contact,
}

impl InquiryKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Booking => "booking",
            Self::Contact => "contact",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "booking" => Some(Self::Booking),
            "contact" => Some(Self::Contact),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InquiryStatus {
    Pending,
    Answered,
    Closed,
}

impl InquiryStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Answered => "answered",
            Self::Closed => "closed",
        }
    }

    /// Unknown stored values read back as `Pending`.
    pub fn parse(value: &str) -> Self {
        match value {
            "answered" => Self::Answered,
            "closed" => Self::Closed,
            _ => Self::Pending,
        }
    }
}

/// A booking or contact request submitted from the public site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub id: String,
    pub name: String,
    pub email: String,
    pub country: String,
    pub message: String,
    pub package_interest: Option<String>,
    pub status: InquiryStatus,
    pub read: bool,
    pub email_sent: bool,
    pub timestamp: DateTime<Utc>,
    pub kind: InquiryKind,
}

/// Form payload for `POST /api/inquiries`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInquiry {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub country: String,
    pub message: String,
    #[serde(default)]
    pub package_interest: Option<String>,
    pub kind: InquiryKind,
}

impl NewInquiry {
    /// Check the submitted fields, returning a message for the first problem.
    pub fn validate(&self) -> Result<(), String> {
        let name = self.name.trim();
        if name.is_empty() || name.len() > 200 {
            return Err("name must be between 1 and 200 characters".to_string());
        }
        let email = self.email.trim();
        if email.len() > 254 || !is_plausible_email(email) {
            return Err("email address is not valid".to_string());
        }
        if self.country.len() > 100 {
            return Err("country must be at most 100 characters".to_string());
        }
        let message = self.message.trim();
        if message.is_empty() || message.len() > 5000 {
            return Err("message must be between 1 and 5000 characters".to_string());
        }
        if self.package_interest.as_ref().is_some_and(|p| p.len() > 200) {
            return Err("packageInterest must be at most 200 characters".to_string());
        }
        if self.kind == InquiryKind::Booking
            && self
                .package_interest
                .as_deref()
                .is_none_or(|p| p.trim().is_empty())
        {
            return Err("booking inquiries must name a package".to_string());
        }
        Ok(())
    }

    /// Build the stored record with a fresh id and the initial triage state.
    pub fn into_inquiry(self, id: String, timestamp: DateTime<Utc>) -> Inquiry {
        Inquiry {
            id,
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            country: self.country.trim().to_string(),
            message: self.message.trim().to_string(),
            package_interest: self
                .package_interest
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            status: InquiryStatus::Pending,
            read: false,
            email_sent: false,
            timestamp,
            kind: self.kind,
        }
    }
}

/// One `@`, a non-empty local part, and a dotted domain.
fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact() -> NewInquiry {
        NewInquiry {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            country: "Portugal".to_string(),
            message: "Do you run tours in the rainy season?".to_string(),
            package_interest: None,
            kind: InquiryKind::Contact,
        }
    }

    #[test]
    fn test_valid_contact() {
        assert!(contact().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_email() {
        for email in ["", "ana", "ana@", "@example.com", "ana@example", "a b@example.com"] {
            let mut inquiry = contact();
            inquiry.email = email.to_string();
            assert!(inquiry.validate().is_err(), "{email} should be rejected");
        }
    }

    #[test]
    fn test_rejects_empty_message() {
        let mut inquiry = contact();
        inquiry.message = "  ".to_string();
        assert!(inquiry.validate().is_err());
    }

    #[test]
    fn test_booking_requires_package() {
        let mut inquiry = contact();
        inquiry.kind = InquiryKind::Booking;
        assert!(inquiry.validate().is_err());
        inquiry.package_interest = Some("northern-loop".to_string());
        assert!(inquiry.validate().is_ok());
    }

    #[test]
    fn test_into_inquiry_initial_state() {
        let inquiry = contact().into_inquiry("id-1".to_string(), Utc::now());
        assert_eq!(inquiry.status, InquiryStatus::Pending);
        assert!(!inquiry.read);
        assert!(!inquiry.email_sent);
        assert!(inquiry.package_interest.is_none());
    }

    #[test]
    fn test_status_parse_unknown_is_pending() {
        assert_eq!(InquiryStatus::parse("closed"), InquiryStatus::Closed);
        assert_eq!(InquiryStatus::parse("weird"), InquiryStatus::Pending);
    }
}
