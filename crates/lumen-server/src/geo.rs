use std::net::IpAddr;
use std::str::FromStr;

use lumen_core::normalize::GeoFields;

/// GeoIP collaborator: city-level lookup against a MaxMind database.
///
/// The reader is opened once at startup. An absent database file is
/// non-fatal — rows are stored with empty geo fields and a warning is
/// logged at boot so operators know why countries are missing.
pub struct GeoResolver {
    reader: Option<maxminddb::Reader<Vec<u8>>>,
}

impl GeoResolver {
    pub fn open(path: &str) -> Self {
        if !std::path::Path::new(path).exists() {
            tracing::warn!(
                geoip_path = %path,
                "GeoIP database not found; events will be stored with empty geo fields. \
                 Set LUMEN_GEOIP_PATH to a MaxMind City database to enable country breakdowns."
            );
            return Self { reader: None };
        }

        match maxminddb::Reader::open_readfile(path) {
            Ok(reader) => Self {
                reader: Some(reader),
            },
            Err(e) => {
                tracing::warn!(geoip_path = %path, error = %e, "failed to open GeoIP database");
                Self { reader: None }
            }
        }
    }

    /// Resolve an IP to country/region/city. Unparseable IPs and lookup
    /// misses yield empty fields — geo data is best-effort everywhere.
    pub fn lookup(&self, ip: &str) -> GeoFields {
        self.try_lookup(ip).unwrap_or_default()
    }

    fn try_lookup(&self, ip: &str) -> Option<GeoFields> {
        let reader = self.reader.as_ref()?;
        let ip_addr = IpAddr::from_str(ip).ok()?;
        let record: maxminddb::geoip2::City = reader.lookup(ip_addr).ok().flatten()?;

        let country = record
            .country
            .as_ref()
            .and_then(|c| c.iso_code)
            .unwrap_or_default()
            .to_string();

        let region = record
            .subdivisions
            .as_ref()
            .and_then(|subs| subs.first())
            .and_then(|sub| sub.names.as_ref())
            .and_then(|names| names.get("en"))
            .unwrap_or(&"")
            .to_string();

        let city = record
            .city
            .as_ref()
            .and_then(|c| c.names.as_ref())
            .and_then(|names| names.get("en"))
            .unwrap_or(&"")
            .to_string();

        Some(GeoFields {
            country,
            region,
            city,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_database_yields_empty_fields() {
        let resolver = GeoResolver::open("/nonexistent/GeoLite2-City.mmdb");
        let geo = resolver.lookup("203.0.113.7");
        assert_eq!(geo.country, "");
        assert_eq!(geo.region, "");
        assert_eq!(geo.city, "");
    }

    #[test]
    fn garbage_ip_yields_empty_fields() {
        let resolver = GeoResolver::open("/nonexistent/GeoLite2-City.mmdb");
        let geo = resolver.lookup("unknown");
        assert_eq!(geo.country, "");
    }
}
