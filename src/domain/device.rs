//! Device classification from the `User-Agent` header.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse device family used for smart-link routing and click analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Ios,
    Android,
    Other,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Ios => "ios",
            DeviceType::Android => "android",
            DeviceType::Other => "other",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ios" => Ok(DeviceType::Ios),
            "android" => Ok(DeviceType::Android),
            "other" => Ok(DeviceType::Other),
            other => Err(format!("unknown device type '{}'", other)),
        }
    }
}

const IOS_TOKENS: &[&str] = &["iphone", "ipad", "ipod"];
const ANDROID_TOKENS: &[&str] = &["android"];

/// Classifies a raw user-agent string.
///
/// Matching is a case-insensitive substring test; iOS tokens win over
/// Android ones. Empty or unrecognised input yields [`DeviceType::Other`].
///
/// # Examples
///
/// ```
/// use link_tracker::domain::device::{DeviceType, classify_device};
///
/// assert_eq!(
///     classify_device("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)"),
///     DeviceType::Ios
/// );
/// assert_eq!(classify_device(""), DeviceType::Other);
/// ```
pub fn classify_device(user_agent: &str) -> DeviceType {
    let ua = user_agent.to_ascii_lowercase();

    if IOS_TOKENS.iter().any(|t| ua.contains(t)) {
        DeviceType::Ios
    } else if ANDROID_TOKENS.iter().any(|t| ua.contains(t)) {
        DeviceType::Android
    } else {
        DeviceType::Other
    }
}
