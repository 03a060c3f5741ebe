//! Target playback devices and their capability limits.
//!
//! Profiles are defined once in a static catalog and looked up by
//! enumerated identity or by exact display name. They are never mutated
//! after process start.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Enumerated device identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    #[serde(rename = "ps3")]
    Ps3,
    #[serde(rename = "iphone3gs")]
    IPhone3gs,
    #[serde(rename = "xbox360")]
    Xbox360,
    #[serde(rename = "ipad")]
    IPad,
    #[serde(rename = "generic")]
    Generic,
    #[serde(rename = "avchd")]
    Avchd,
    #[serde(rename = "bluray")]
    BluRay,
    #[serde(rename = "html5")]
    Html5,
    #[serde(rename = "wdlivetv")]
    WdLiveTv,
    #[serde(rename = "samsung_s3")]
    SamsungS3,
    #[serde(rename = "samsung_s4")]
    SamsungS4,
    #[serde(rename = "sonos")]
    Sonos,
    #[serde(rename = "samsung_s5")]
    SamsungS5,
    #[serde(rename = "samsung_uhdtv")]
    SamsungUhdTv,
    #[serde(rename = "rawfiles")]
    RawFiles,
}

impl DeviceKind {
    fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Ps3 => "ps3",
            DeviceKind::IPhone3gs => "iphone3gs",
            DeviceKind::Xbox360 => "xbox360",
            DeviceKind::IPad => "ipad",
            DeviceKind::Generic => "generic",
            DeviceKind::Avchd => "avchd",
            DeviceKind::BluRay => "bluray",
            DeviceKind::Html5 => "html5",
            DeviceKind::WdLiveTv => "wdlivetv",
            DeviceKind::SamsungS3 => "samsung_s3",
            DeviceKind::SamsungS4 => "samsung_s4",
            DeviceKind::Sonos => "sonos",
            DeviceKind::SamsungS5 => "samsung_s5",
            DeviceKind::SamsungUhdTv => "samsung_uhdtv",
            DeviceKind::RawFiles => "rawfiles",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = tx_core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceCatalog::all()
            .iter()
            .map(|p| p.kind)
            .find(|k| k.as_str() == s)
            .ok_or_else(|| tx_core::Error::not_found("device", s))
    }
}

/// Capability profile for one target device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceProfile {
    pub kind: DeviceKind,
    /// Display name, matched exactly by [`DeviceCatalog::by_name`].
    pub name: &'static str,
    pub max_width: i32,
    pub max_height: i32,
    /// Maximum video bitrate in kbps; -1 means unbounded.
    pub max_bitrate_kbps: i32,
    pub max_channels: u32,
    pub ringtone: bool,
    pub audio_only: bool,
    pub hevc: bool,
    pub tv_3d: bool,
    pub mkv: bool,
}

impl DeviceProfile {
    /// Bitrate cap in kbps, or `None` when unbounded.
    pub fn bitrate_cap(&self) -> Option<u32> {
        (self.max_bitrate_kbps > 0).then_some(self.max_bitrate_kbps as u32)
    }
}

const fn profile(
    kind: DeviceKind,
    name: &'static str,
    max_width: i32,
    max_height: i32,
    max_bitrate_kbps: i32,
    max_channels: u32,
) -> DeviceProfile {
    DeviceProfile {
        kind,
        name,
        max_width,
        max_height,
        max_bitrate_kbps,
        max_channels,
        ringtone: false,
        audio_only: false,
        hevc: false,
        tv_3d: false,
        mkv: false,
    }
}

static CATALOG: &[DeviceProfile] = &[
    profile(DeviceKind::Ps3, "PS3", 1920, 1080, -1, 8),
    DeviceProfile {
        ringtone: true,
        ..profile(DeviceKind::IPhone3gs, "iPhone 3GS", 640, 480, -1, 2)
    },
    profile(DeviceKind::Xbox360, "XBox 360", 1920, 1080, -1, 2),
    profile(DeviceKind::IPad, "iPad", 1280, 720, -1, 2),
    profile(DeviceKind::Generic, "Generic Media Player", 1920, 1080, -1, 8),
    profile(DeviceKind::Avchd, "AVCHD Disk Image", 1920, 1080, -1, 8),
    profile(DeviceKind::BluRay, "Blu-ray Disk Image", 1920, 1080, -1, 8),
    profile(DeviceKind::Html5, "HTML 5", 1920, 1200, -1, 2),
    profile(DeviceKind::WdLiveTv, "WD Live TV Media Player", 1920, 1080, -1, 8),
    DeviceProfile {
        ringtone: true,
        ..profile(DeviceKind::SamsungS3, "Samsung S3", 1280, 720, 2500, 2)
    },
    DeviceProfile {
        ringtone: true,
        ..profile(DeviceKind::SamsungS4, "Samsung S4", 1920, 1080, 2500, 2)
    },
    DeviceProfile {
        audio_only: true,
        ..profile(DeviceKind::Sonos, "Sonos", -1, -1, -1, 2)
    },
    DeviceProfile {
        ringtone: true,
        hevc: true,
        ..profile(DeviceKind::SamsungS5, "Samsung S5", 1920, 1080, -1, 2)
    },
    DeviceProfile {
        hevc: true,
        tv_3d: true,
        mkv: true,
        ..profile(DeviceKind::SamsungUhdTv, "Samsung UHD TV", 4096, 2160, 50000, 6)
    },
    profile(DeviceKind::RawFiles, "Raw Files", 1920, 1080, -1, 8),
];

/// Static, read-only registry of the supported devices.
pub struct DeviceCatalog;

impl DeviceCatalog {
    /// All known device profiles, in catalog order.
    pub fn all() -> &'static [DeviceProfile] {
        CATALOG
    }

    /// Look up a profile by enumerated identity.
    pub fn by_kind(kind: DeviceKind) -> &'static DeviceProfile {
        CATALOG
            .iter()
            .find(|p| p.kind == kind)
            .unwrap_or(&CATALOG[0])
    }

    /// Look up a profile by exact (case-sensitive) display name.
    pub fn by_name(name: &str) -> Option<&'static DeviceProfile> {
        CATALOG.iter().find(|p| p.name == name)
    }
}
