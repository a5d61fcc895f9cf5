use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Installer platform a download is recorded against.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum Platform {
    #[serde(rename = "windows-x64")]
    WindowsX64,
    #[serde(rename = "windows-x86")]
    WindowsX86,
    #[serde(rename = "macos")]
    MacOs,
    #[serde(rename = "linux")]
    Linux,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::WindowsX64,
        Platform::WindowsX86,
        Platform::MacOs,
        Platform::Linux,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::WindowsX64 => "windows-x64",
            Platform::WindowsX86 => "windows-x86",
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }

    /// Asset name on the release page.
    pub fn installer_file(&self) -> &'static str {
        match self {
            Platform::WindowsX64 => "MuLa_Setup_x64.exe",
            Platform::WindowsX86 => "MuLa_Setup_x86.exe",
            Platform::MacOs => "MuLa_Installer.dmg",
            Platform::Linux => "mula_install.sh",
        }
    }

    /// Grouping used by the stats breakdown; both Windows builds count as one.
    pub fn family(&self) -> &'static str {
        match self {
            Platform::WindowsX64 | Platform::WindowsX86 => "windows",
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
        }
    }

    pub fn valid_ids() -> Vec<&'static str> {
        Self::ALL.iter().map(Platform::as_str).collect()
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of client-side analytics events.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PageView,
    DownloadClick,
    DownloadComplete,
    GalleryView,
    GalleryPlay,
    TutorialView,
    FaqView,
    ExternalLink,
    Share,
    Error,
}

impl EventType {
    pub const ALL: [EventType; 10] = [
        EventType::PageView,
        EventType::DownloadClick,
        EventType::DownloadComplete,
        EventType::GalleryView,
        EventType::GalleryPlay,
        EventType::TutorialView,
        EventType::FaqView,
        EventType::ExternalLink,
        EventType::Share,
        EventType::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PageView => "page_view",
            EventType::DownloadClick => "download_click",
            EventType::DownloadComplete => "download_complete",
            EventType::GalleryView => "gallery_view",
            EventType::GalleryPlay => "gallery_play",
            EventType::TutorialView => "tutorial_view",
            EventType::FaqView => "faq_view",
            EventType::ExternalLink => "external_link",
            EventType::Share => "share",
            EventType::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == s)
    }

    pub fn valid_names() -> Vec<&'static str> {
        Self::ALL.iter().map(EventType::as_str).collect()
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reporting window for the query endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Today,
    Week,
    Month,
    /// Lifetime totals; only meaningful for download stats.
    All,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Today => "today",
            Period::Week => "week",
            Period::Month => "month",
            Period::All => "all",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "today" => Some(Period::Today),
            "week" => Some(Period::Week),
            "month" => Some(Period::Month),
            "all" => Some(Period::All),
            _ => None,
        }
    }

    /// Number of calendar days covered, `None` for lifetime.
    pub fn days(&self) -> Option<i64> {
        match self {
            Period::Today => Some(1),
            Period::Week => Some(7),
            Period::Month => Some(30),
            Period::All => None,
        }
    }

    /// UTC dates covered by the period, newest first, ending at `today`.
    /// `All` yields just `today`.
    pub fn dates_ending(&self, today: NaiveDate) -> Vec<NaiveDate> {
        let days = self.days().unwrap_or(1);
        (0..days).map(|i| today - Duration::days(i)).collect()
    }
}

/// Wire format of a counter date segment (`YYYY-MM-DD`).
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
