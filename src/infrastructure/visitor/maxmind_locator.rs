//! IP geolocation with a local MaxMind GeoLite2/GeoIP2 City database.

use std::net::IpAddr;

use maxminddb::Reader;
use tracing::trace;

use crate::domain::visitor::{GeoInfo, GeoLocator};

/// [`GeoLocator`] reading a `.mmdb` file loaded into memory at startup.
pub struct MaxMindLocator {
    reader: Reader<Vec<u8>>,
}

impl MaxMindLocator {
    /// Loads the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns the reader error if the file is missing or not a MaxMind database.
    pub fn open(path: &str) -> Result<Self, maxminddb::MaxMindDbError> {
        let reader = Reader::open_readfile(path)?;
        Ok(Self { reader })
    }

    fn lookup(&self, ip: &str) -> Option<GeoInfo> {
        let ip_addr: IpAddr = ip.trim().parse().ok()?;

        let result = self.reader.lookup(ip_addr).ok()?;
        let city: maxminddb::geoip2::City = result.decode().ok()??;

        let country_code = city.country.iso_code.map(|c| c.to_ascii_uppercase());
        let country = city.country.names.english.map(String::from);
        let city_name = city.city.names.english.map(String::from);

        trace!(ip, ?country_code, ?city_name, "MaxMind lookup");

        Some(GeoInfo {
            country,
            country_code,
            city: city_name,
        })
    }
}

impl GeoLocator for MaxMindLocator {
    fn locate(&self, ip: &str) -> GeoInfo {
        self.lookup(ip).unwrap_or_else(GeoInfo::unknown)
    }

    fn name(&self) -> &'static str {
        "MaxMind"
    }
}
