//! First stage of the pipeline: map a raw URL string onto a platform and a
//! content category. Classification never fails, it only declines.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::record::ContentKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Bilibili,
    Douyin,
    Tencent,
    Xigua,
    Kuaishou,
    Youtube,
    Vimeo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    Chinese,
    International,
}

impl Platform {
    pub const ALL: [Platform; 7] = [
        Platform::Bilibili,
        Platform::Douyin,
        Platform::Tencent,
        Platform::Xigua,
        Platform::Kuaishou,
        Platform::Youtube,
        Platform::Vimeo,
    ];

    /// Stable machine key used in records and logs.
    pub fn key(&self) -> &'static str {
        match self {
            Platform::Bilibili => "bilibili",
            Platform::Douyin => "douyin",
            Platform::Tencent => "tencent",
            Platform::Xigua => "xigua",
            Platform::Kuaishou => "kuaishou",
            Platform::Youtube => "youtube",
            Platform::Vimeo => "vimeo",
        }
    }

    pub fn from_key(key: &str) -> Option<Platform> {
        Platform::ALL.iter().copied().find(|p| p.key() == key)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Bilibili => "B站",
            Platform::Douyin => "抖音",
            Platform::Tencent => "腾讯视频",
            Platform::Xigua => "西瓜视频",
            Platform::Kuaishou => "快手",
            Platform::Youtube => "YouTube",
            Platform::Vimeo => "Vimeo",
        }
    }

    pub fn family(&self) -> PlatformFamily {
        match self {
            Platform::Youtube | Platform::Vimeo => PlatformFamily::International,
            _ => PlatformFamily::Chinese,
        }
    }

    /// Whether an iframe embed can be synthesized from the bare identifier.
    /// Tencent serves an iframe too, but only through its own resolver.
    pub fn supports_embed(&self) -> bool {
        matches!(
            self,
            Platform::Bilibili | Platform::Youtube | Platform::Vimeo
        )
    }

    /// Canonical iframe URL for platforms with a public embed player.
    pub fn embed_template(&self, id: &str) -> Option<String> {
        match self {
            Platform::Bilibili => Some(format!(
                "https://player.bilibili.com/player.html?bvid={id}&autoplay=0"
            )),
            Platform::Youtube => Some(format!(
                "https://www.youtube.com/embed/{id}?autoplay=0&controls=1"
            )),
            Platform::Vimeo => Some(format!(
                "https://player.vimeo.com/video/{id}?autoplay=0&controls=1"
            )),
            _ => None,
        }
    }

    /// Brand color used for placeholder thumbnails, without the leading `#`.
    pub fn brand_color(&self) -> &'static str {
        match self {
            Platform::Bilibili => "FB7299",
            Platform::Douyin => "000000",
            Platform::Tencent => "FF6600",
            Platform::Xigua => "FF6B35",
            Platform::Kuaishou => "FFE066",
            Platform::Youtube => "FF0000",
            Platform::Vimeo => "1AB7EA",
        }
    }

    /// Placeholder image for records where the platform exposes no artwork.
    /// Douyin and Kuaishou are portrait-first, everything else is 16:9.
    pub fn placeholder_thumbnail(&self) -> String {
        let (width, height) = match self {
            Platform::Douyin | Platform::Kuaishou => (720, 1280),
            _ => (1280, 720),
        };
        let text_color = match self {
            Platform::Kuaishou => "000000",
            _ => "FFFFFF",
        };
        let label = match self {
            Platform::Bilibili => "Bilibili",
            Platform::Douyin => "Douyin",
            Platform::Tencent => "Tencent",
            Platform::Xigua => "Xigua",
            Platform::Kuaishou => "Kuaishou",
            Platform::Youtube => "YouTube",
            Platform::Vimeo => "Vimeo",
        };
        format!(
            "https://via.placeholder.com/{width}x{height}/{}/{text_color}?text={label}+Video",
            self.brand_color()
        )
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// What the classifier decided for a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub platform: Platform,
    pub kind: ContentKind,
}

struct ClassifierRule {
    platform: Platform,
    kind: ContentKind,
    pattern: Regex,
}

/// Ordered rule table. Path-specific Bilibili rows must stay above the bare
/// Bilibili domain row, which would otherwise swallow them as plain videos.
static CLASSIFIER_TABLE: LazyLock<Vec<ClassifierRule>> = LazyLock::new(|| {
    let rule = |platform, kind, pattern: &str| ClassifierRule {
        platform,
        kind,
        pattern: Regex::new(pattern).expect("invalid classifier pattern"),
    };
    vec![
        rule(
            Platform::Bilibili,
            ContentKind::Bangumi,
            r"bilibili\.com/bangumi/play/",
        ),
        rule(Platform::Bilibili, ContentKind::Live, r"live\.bilibili\.com/"),
        rule(
            Platform::Bilibili,
            ContentKind::Medialist,
            r"bilibili\.com/medialist/",
        ),
        rule(Platform::Bilibili, ContentKind::Video, r"bilibili\.com|b23\.tv"),
        rule(
            Platform::Douyin,
            ContentKind::Video,
            r"douyin\.com|iesdouyin\.com|dy\.com",
        ),
        rule(Platform::Tencent, ContentKind::Video, r"v\.qq\.com|qq\.com/x/"),
        rule(Platform::Xigua, ContentKind::Video, r"ixigua\.com|xigua\.com"),
        rule(
            Platform::Kuaishou,
            ContentKind::Video,
            r"kuaishou\.com|ks\.com",
        ),
        rule(
            Platform::Youtube,
            ContentKind::Video,
            r"youtube\.com|youtu\.be",
        ),
        rule(Platform::Vimeo, ContentKind::Video, r"vimeo\.com"),
    ]
});

/// Scans the rule table in declaration order and returns the first hit.
/// `None` means the URL belongs to no supported platform.
pub fn classify(url: &str) -> Option<Classification> {
    CLASSIFIER_TABLE
        .iter()
        .find(|rule| rule.pattern.is_match(url))
        .map(|rule| Classification {
            platform: rule.platform,
            kind: rule.kind,
        })
}
