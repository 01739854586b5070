use crate::model::VisitEvent;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

/// Location resolved for a visitor. The IP itself is never kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoInfo {
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

impl GeoInfo {
    /// Copy the resolved fields onto a visit.
    pub fn apply_to(self, visit: &mut VisitEvent) {
        visit.country = self.country;
        visit.country_code = self.country_code;
        visit.region = self.region;
        visit.city = self.city;
    }

    pub const fn is_empty(&self) -> bool {
        self.country.is_none()
            && self.country_code.is_none()
            && self.region.is_none()
            && self.city.is_none()
    }
}

/// Visitor geolocation backed by an optional MaxMind City database.
/// Without a database every lookup is empty. Such visits are left out of the
/// country ranking and show a blank country in the visit table.
pub struct GeoIpReader {
    reader: Option<Arc<maxminddb::Reader<Vec<u8>>>>,
}

impl GeoIpReader {
    pub fn open(path: Option<&Path>) -> Self {
        let reader = path.and_then(|p| {
            if !p.exists() {
                tracing::warn!(path = %p.display(), "GeoIP database not found, visits will have no location");
                return None;
            }
            match maxminddb::Reader::open_readfile(p) {
                Ok(r) => {
                    tracing::info!(path = %p.display(), "GeoIP database loaded");
                    Some(Arc::new(r))
                }
                Err(e) => {
                    tracing::warn!(path = %p.display(), error = %e, "Failed to open GeoIP database");
                    None
                }
            }
        });
        Self { reader }
    }

    pub const fn is_loaded(&self) -> bool {
        self.reader.is_some()
    }

    /// Resolve country, region and city for a client address. Unparseable
    /// or unknown addresses yield an empty `GeoInfo`.
    pub fn lookup(&self, ip: &str) -> GeoInfo {
        let Some(reader) = &self.reader else {
            return GeoInfo::default();
        };
        let Ok(addr) = ip.parse::<IpAddr>() else {
            return GeoInfo::default();
        };
        let Ok(found) = reader.lookup(addr) else {
            return GeoInfo::default();
        };
        let Ok(Some(city)) = found.decode::<maxminddb::geoip2::City>() else {
            return GeoInfo::default();
        };

        GeoInfo {
            country: city.country.names.english.map(String::from),
            country_code: city.country.iso_code.map(String::from),
            region: city
                .subdivisions
                .first()
                .and_then(|s| s.names.english)
                .map(String::from),
            city: city.city.names.english.map(String::from),
        }
    }
}
