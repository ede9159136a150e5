use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The four short-video feeds the engine knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Platform {
    Instagram,
    YouTube,
    LinkedIn,
    Snapchat,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Instagram,
        Platform::YouTube,
        Platform::LinkedIn,
        Platform::Snapchat,
    ];

    /// Android package name of the target app.
    pub fn package_name(&self) -> &'static str {
        match self {
            Platform::Instagram => "com.instagram.android",
            Platform::YouTube => "com.google.android.youtube",
            Platform::LinkedIn => "com.linkedin.android",
            Platform::Snapchat => "com.snapchat.android",
        }
    }

    pub fn from_package(package: &str) -> Option<Platform> {
        Platform::ALL
            .into_iter()
            .find(|platform| platform.package_name() == package)
    }

    /// Key persisted in settings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::YouTube => "youtube",
            Platform::LinkedIn => "linkedin",
            Platform::Snapchat => "snapchat",
        }
    }

    /// Name of the short-video surface as shown to the user.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Instagram => "Instagram Reels",
            Platform::YouTube => "YouTube Shorts",
            Platform::LinkedIn => "LinkedIn Videos",
            Platform::Snapchat => "Snapchat Stories",
        }
    }

    /// Fully qualified view id inside this platform's package.
    pub fn view_id(&self, local: &str) -> String {
        format!("{}:id/{}", self.package_name(), local)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown platform '{0}'")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    /// Accepts both the settings key and the display label.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Platform::ALL
            .into_iter()
            .find(|platform| {
                platform.as_str().eq_ignore_ascii_case(trimmed)
                    || platform.display_name().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| UnknownPlatform(value.to_string()))
    }
}
