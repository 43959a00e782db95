//! User agent classification with woothee.

use woothee::parser::Parser;

use crate::domain::entities::Platform;
use crate::domain::visitor::{DeviceInfo, UserAgentParser};

const UNKNOWN: &str = "UNKNOWN";

/// [`UserAgentParser`] backed by the woothee rule set.
///
/// Device is woothee's category (`pc`, `smartphone`, `mobilephone`,
/// `crawler`, ...). The platform is derived from the OS name, with every
/// other `pc` counted as desktop.
pub struct WootheeParser {
    parser: Parser,
}

impl WootheeParser {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }
}

impl Default for WootheeParser {
    fn default() -> Self {
        Self::new()
    }
}

fn known(value: &str) -> Option<String> {
    (!value.is_empty() && value != UNKNOWN).then(|| value.to_string())
}

fn platform_of(os: &str, category: &str) -> Platform {
    match os {
        "iPhone" | "iPad" | "iPod" => Platform::Ios,
        "Android" => Platform::Android,
        _ if category == "pc" => Platform::Desktop,
        _ => Platform::Unknown,
    }
}

impl UserAgentParser for WootheeParser {
    fn parse(&self, user_agent: &str) -> DeviceInfo {
        let Some(result) = self.parser.parse(user_agent) else {
            return DeviceInfo::unknown();
        };

        DeviceInfo {
            device: known(result.category).unwrap_or_else(|| "unknown".to_string()),
            os: known(result.os),
            browser: known(result.name),
            platform: platform_of(result.os, result.category),
        }
    }
}
