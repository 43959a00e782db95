//! Visitor classification backends.
//!
//! - [`WootheeParser`] - User agent parsing
//! - [`MaxMindLocator`] - IP geolocation from a local database
//! - [`NullGeoLocator`] - Used when no database is configured

mod maxmind_locator;
mod woothee_parser;

pub use maxmind_locator::MaxMindLocator;
pub use woothee_parser::WootheeParser;

use crate::domain::visitor::{GeoInfo, GeoLocator};

/// Locator that knows nothing; every visitor has an unknown country.
///
/// Geo redirects never match while it is in use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullGeoLocator;

impl GeoLocator for NullGeoLocator {
    fn locate(&self, _ip: &str) -> GeoInfo {
        GeoInfo::unknown()
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_locator_knows_nothing() {
        assert_eq!(NullGeoLocator.locate("81.2.69.142"), GeoInfo::unknown());
        assert_eq!(NullGeoLocator.locate("not-an-ip"), GeoInfo::unknown());
    }
}
