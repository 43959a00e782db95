//! Visitor classification used by smart and geo redirects.
//!
//! Both collaborators are pure and infallible: input that cannot be parsed
//! produces an "unknown" value, which never matches a redirect rule.

use crate::domain::entities::Platform;

/// Parsed user agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Woothee category: `pc`, `smartphone`, `mobilephone`, `appliance`,
    /// `crawler`, `misc`, or `unknown` when the agent is not recognised.
    pub device: String,
    pub os: Option<String>,
    pub browser: Option<String>,
    pub platform: Platform,
}

impl DeviceInfo {
    pub fn unknown() -> Self {
        Self {
            device: "unknown".to_string(),
            os: None,
            browser: None,
            platform: Platform::Unknown,
        }
    }
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Geolocation of an IP address. All fields are `None` when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoInfo {
    pub country: Option<String>,
    /// ISO 3166-1 alpha-2, upper case.
    pub country_code: Option<String>,
    pub city: Option<String>,
}

impl GeoInfo {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_known(&self) -> bool {
        self.country_code.is_some()
    }
}

/// Maps a raw `User-Agent` header to a [`DeviceInfo`].
#[cfg_attr(test, mockall::automock)]
pub trait UserAgentParser: Send + Sync {
    fn parse(&self, user_agent: &str) -> DeviceInfo;
}

/// Maps a client IP address to a [`GeoInfo`].
#[cfg_attr(test, mockall::automock)]
pub trait GeoLocator: Send + Sync {
    fn locate(&self, ip: &str) -> GeoInfo;

    /// Provider name for logs.
    fn name(&self) -> &'static str;
}

/// Everything the destination selection needs to know about the visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitorProfile {
    pub device: DeviceInfo,
    pub geo: GeoInfo,
}

impl VisitorProfile {
    /// Classifies a visitor with the given collaborators.
    pub fn classify(
        user_agent: &str,
        ip: &str,
        parser: &dyn UserAgentParser,
        locator: &dyn GeoLocator,
    ) -> Self {
        let device = if user_agent.trim().is_empty() {
            DeviceInfo::unknown()
        } else {
            parser.parse(user_agent)
        };

        let geo = if ip.trim().is_empty() {
            GeoInfo::unknown()
        } else {
            locator.locate(ip)
        };

        Self { device, geo }
    }
}
