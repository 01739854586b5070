use serde::{Deserialize, Serialize};

/// Whether a package is a multi-day tour or a single-day excursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    Main,
    Day,
}

impl PackageType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Day => "day",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "main" => Some(Self::Main),
            "day" => Some(Self::Day),
            _ => None,
        }
    }
}

/// A tour package shown on the public site and editable from the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourPackage {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub features: Vec<String>,
    pub price: f64,
    pub package_type: PackageType,
    pub display_order: i32,
}

/// Full-document update sent by the package editor.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageUpdate {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub features: Vec<String>,
    pub price: f64,
    pub package_type: PackageType,
    pub display_order: i32,
}

impl PackageUpdate {
    /// Check the editable fields, returning a message for the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if self.title.len() > 200 || self.subtitle.len() > 200 {
            return Err("title and subtitle must be at most 200 characters".to_string());
        }
        if self.description.len() > 10_000 {
            return Err("description must be at most 10000 characters".to_string());
        }
        if self.features.len() > 50 || self.features.iter().any(|f| f.len() > 500) {
            return Err("at most 50 features of up to 500 characters each".to_string());
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err("price must be a non-negative number".to_string());
        }
        Ok(())
    }

    pub fn into_package(self, id: String) -> TourPackage {
        TourPackage {
            id,
            title: self.title,
            subtitle: self.subtitle,
            description: self.description,
            features: self.features,
            price: self.price,
            package_type: self.package_type,
            display_order: self.display_order,
        }
    }
}

/// Catalogue written on first read of an empty package collection.
pub fn default_packages() -> Vec<TourPackage> {
    let package = |id: &str,
                   title: &str,
                   subtitle: &str,
                   description: &str,
                   features: &[&str],
                   price: f64,
                   package_type: PackageType,
                   display_order: i32| TourPackage {
        id: id.to_string(),
        title: title.to_string(),
        subtitle: subtitle.to_string(),
        description: description.to_string(),
        features: features.iter().map(|f| (*f).to_string()).collect(),
        price,
        package_type,
        display_order,
    };

    vec![
        package(
            "northern-loop",
            "Northern Loop",
            "7 days through Luang Prabang and Vang Vieng",
            "Temples, river caves and karst valleys with a private guide and driver.",
            &[
                "Private guide and driver",
                "6 nights accommodation",
                "Daily breakfast",
                "Mekong river cruise",
            ],
            890.0,
            PackageType::Main,
            1,
        ),
        package(
            "southern-islands",
            "Southern Islands",
            "5 days in Champasak and the 4000 Islands",
            "Wat Phou, the Khone Phapheng falls and slow days on Don Det.",
            &[
                "Private guide",
                "4 nights accommodation",
                "Boat transfers",
                "Khone Phapheng entrance",
            ],
            640.0,
            PackageType::Main,
            2,
        ),
        package(
            "vang-vieng-day",
            "Vang Vieng Adventure",
            "Full-day kayaking and caves",
            "Kayak the Nam Song, tube into the water cave and swim at the Blue Lagoon.",
            &["Lunch included", "Kayak and safety gear", "Hotel pickup"],
            55.0,
            PackageType::Day,
            3,
        ),
        package(
            "kuang-si-day",
            "Kuang Si Falls",
            "Half-day trip from Luang Prabang",
            "Turquoise pools, the bear rescue centre and a picnic lunch.",
            &["Return transport", "Entrance fees", "Picnic lunch"],
            35.0,
            PackageType::Day,
            4,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update() -> PackageUpdate {
        PackageUpdate {
            title: "Northern Loop".to_string(),
            subtitle: "7 days".to_string(),
            description: "Temples and caves".to_string(),
            features: vec!["Guide".to_string()],
            price: 900.0,
            package_type: PackageType::Main,
            display_order: 1,
        }
    }

    #[test]
    fn test_validate_accepts_valid_update() {
        assert!(update().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        let mut u = update();
        u.title = "   ".to_string();
        assert!(u.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_or_nan_price() {
        let mut u = update();
        u.price = -1.0;
        assert!(u.validate().is_err());
        u.price = f64::NAN;
        assert!(u.validate().is_err());
    }

    #[test]
    fn test_package_type_round_trip_names() {
        for t in [PackageType::Main, PackageType::Day] {
            assert_eq!(PackageType::parse(t.as_str()), Some(t));
        }
        assert_eq!(PackageType::parse("week"), None);
    }

    #[test]
    fn test_default_packages_have_unique_ids_and_orders() {
        let packages = default_packages();
        let mut ids: Vec<_> = packages.iter().map(|p| p.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), packages.len());
        assert!(packages.iter().any(|p| p.package_type == PackageType::Day));
        assert!(packages.iter().any(|p| p.package_type == PackageType::Main));
    }
}
