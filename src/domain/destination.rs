//! Destination resolution for tracked links.

use crate::domain::device::DeviceType;
use crate::domain::entities::{DestinationStrategy, TrackedLink};

/// Where a resolved URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationSource {
    /// Picked by the link's own strategy.
    Strategy,
    /// The strategy had no usable URL; another field on the link was used.
    LinkFallback,
    /// Nothing on the link was usable; the service-wide default was used.
    GlobalDefault,
}

/// A resolved redirect target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub url: String,
    pub source: DestinationSource,
}

impl Destination {
    /// `true` when the link itself is misconfigured.
    pub fn is_degraded(&self) -> bool {
        self.source != DestinationSource::Strategy
    }
}

/// Picks the redirect URL for `link` as seen from `device`.
///
/// `single` links go to `single_url`. `smart` links go to the device URL when
/// one is set, else to `fallback_url`. When the strategy yields nothing the
/// chain continues with `fallback_url`, `single_url` and finally
/// `default_url`. Blank fields count as unset. Never fails.
pub fn resolve_destination(
    link: &TrackedLink,
    device: DeviceType,
    default_url: &str,
) -> Destination {
    let by_strategy = match link.destination_strategy {
        DestinationStrategy::Single => usable(&link.single_url),
        DestinationStrategy::Smart => {
            let device_url = match device {
                DeviceType::Ios => usable(&link.ios_url),
                DeviceType::Android => usable(&link.android_url),
                DeviceType::Other => None,
            };
            device_url.or_else(|| usable(&link.fallback_url))
        }
    };

    if let Some(url) = by_strategy {
        return Destination {
            url: url.to_string(),
            source: DestinationSource::Strategy,
        };
    }

    if let Some(url) = usable(&link.fallback_url).or_else(|| usable(&link.single_url)) {
        return Destination {
            url: url.to_string(),
            source: DestinationSource::LinkFallback,
        };
    }

    Destination {
        url: default_url.to_string(),
        source: DestinationSource::GlobalDefault,
    }
}

fn usable(url: &Option<String>) -> Option<&str> {
    url.as_deref().map(str::trim).filter(|u| !u.is_empty())
}
