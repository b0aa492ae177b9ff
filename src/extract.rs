//! Second stage of the pipeline: pull the platform-native identifier out of a
//! classified URL. Runs after [`crate::classify::classify`] and before any
//! network work.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::classify::Platform;
use crate::error::ResolveError;
use crate::is_short_link;
use crate::record::ContentKind;

/// Identifier pulled out of a share URL, plus the context the resolvers need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedId {
    pub platform: Platform,
    pub kind: ContentKind,
    /// Platform-native id: `BV…`/`av…`/`ep…`/`ss…`/`ml…`, a numeric room or
    /// item id, an 11-char YouTube id, or a short-link code.
    pub id: String,
    /// Multi-part page selector (`?p=N`), Bilibili only.
    pub page: Option<u32>,
    /// The id is a short-link code and must be resolved through a redirect
    /// before it can be fed to a platform API.
    pub needs_redirect: bool,
}

impl ExtractedId {
    fn new(platform: Platform, kind: ContentKind, id: impl Into<String>) -> Self {
        Self {
            platform,
            kind,
            id: id.into(),
            page: None,
            needs_redirect: false,
        }
    }
}

static RE_BILI_VIDEO_BV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/video/(BV[a-zA-Z0-9]+)").expect("invalid bilibili pattern"));
static RE_BILI_VIDEO_AV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/video/(av\d+)").expect("invalid bilibili pattern"));
static RE_BILI_BANGUMI_EP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"bangumi/play/(ep\d+)").expect("invalid bilibili pattern"));
static RE_BILI_BANGUMI_SS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"bangumi/play/(ss\d+)").expect("invalid bilibili pattern"));
static RE_BILI_MEDIALIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"medialist/play/(ml\d+)").expect("invalid bilibili pattern"));
static RE_BILI_LIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"live\.bilibili\.com/(\d+)").expect("invalid bilibili pattern"));
static RE_BILI_SHORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"b23\.tv/([a-zA-Z0-9]+)").expect("invalid bilibili pattern"));
static RE_BILI_BVID_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[?&]bvid=((?:BV|bv)[a-zA-Z0-9]+)").expect("invalid bilibili pattern")
});
static RE_BILI_BV_ANYWHERE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[/?](?:BV|bv)([A-Za-z0-9]+)").expect("invalid bilibili pattern")
});
static RE_BILI_NUMERIC_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"bilibili\.com/(\d+)(?:[/?#]|$)").expect("invalid bilibili pattern")
});
static RE_BILI_PAGE_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]p=(\d+)").expect("invalid bilibili pattern"));

static RE_DOUYIN_VIDEO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/video/(\d+)").expect("invalid douyin pattern"));
static RE_DOUYIN_SHORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v\.douyin\.com/([a-zA-Z0-9]+)").expect("invalid douyin pattern"));
static RE_DOUYIN_AWEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"aweme_id=(\d+)").expect("invalid douyin pattern"));

static RE_TENCENT_HTML: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([a-zA-Z0-9_]+)\.html").expect("invalid tencent pattern"));
static RE_TENCENT_VID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"vid=([a-zA-Z0-9_]+)").expect("invalid tencent pattern"));
static RE_TENCENT_PAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"v\.qq\.com/x/page/([a-zA-Z0-9_]+)").expect("invalid tencent pattern")
});
static RE_TENCENT_COVER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"x/cover/[^/]+/([a-zA-Z0-9_]+)").expect("invalid tencent pattern")
});

static RE_XIGUA_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)/").expect("invalid xigua pattern"));
static RE_XIGUA_IXIGUA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ixigua\.com/(\d+)").expect("invalid xigua pattern"));
static RE_XIGUA_XIGUA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"xigua\.com/(\d+)").expect("invalid xigua pattern"));

static RE_KUAISHOU_PHOTO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"photo/(\d+)").expect("invalid kuaishou pattern"));
static RE_KUAISHOU_SHORT_VIDEO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"short-video/([a-zA-Z0-9_-]+)").expect("invalid kuaishou pattern")
});
static RE_KUAISHOU_PROFILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"kuaishou\.com/u/[^/]+/([a-zA-Z0-9_-]+)").expect("invalid kuaishou pattern")
});

static RE_YOUTUBE_WATCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"youtube\.com/watch\?v=([a-zA-Z0-9_-]{11})").expect("invalid youtube pattern")
});
static RE_YOUTUBE_SHORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"youtu\.be/([a-zA-Z0-9_-]{11})").expect("invalid youtube pattern")
});
static RE_YOUTUBE_EMBED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"youtube\.com/embed/([a-zA-Z0-9_-]{11})").expect("invalid youtube pattern")
});
static RE_YOUTUBE_V: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"youtube\.com/v/([a-zA-Z0-9_-]{11})").expect("invalid youtube pattern")
});

static RE_VIMEO_PLAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"vimeo\.com/(\d+)").expect("invalid vimeo pattern"));
static RE_VIMEO_CHANNEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"vimeo\.com/channels/[\w-]+/(\d+)").expect("invalid vimeo pattern")
});
static RE_VIMEO_GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"vimeo\.com/groups/[\w-]+/videos/(\d+)").expect("invalid vimeo pattern")
});

fn first_capture<'a>(re: &Regex, url: &'a str) -> Option<&'a str> {
    re.captures(url).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Extracts the identifier for an already-classified URL.
///
/// Returns [`ResolveError::InvalidLinkFormat`] when the platform is known but
/// none of its link shapes match.
pub fn extract(url: &str, platform: Platform) -> Result<ExtractedId, ResolveError> {
    let extracted = match platform {
        Platform::Bilibili => extract_bilibili(url),
        Platform::Douyin => extract_douyin(url),
        Platform::Tencent => extract_tencent(url),
        Platform::Xigua => extract_xigua(url),
        Platform::Kuaishou => extract_kuaishou(url),
        Platform::Youtube => extract_youtube(url),
        Platform::Vimeo => extract_vimeo(url),
    };
    extracted.ok_or_else(|| {
        ResolveError::InvalidLinkFormat(format!(
            "recognized a {} link but no identifier pattern matched: {url}",
            platform.key()
        ))
    })
}

fn extract_bilibili(url: &str) -> Option<ExtractedId> {
    let page = first_capture(&RE_BILI_PAGE_PARAM, url).and_then(|p| p.parse().ok());
    let with_page = |id: &str| {
        let mut extracted = ExtractedId::new(Platform::Bilibili, ContentKind::Video, id);
        extracted.page = page;
        extracted
    };

    if let Some(id) = first_capture(&RE_BILI_VIDEO_BV, url) {
        return Some(with_page(id));
    }
    if let Some(id) = first_capture(&RE_BILI_VIDEO_AV, url) {
        return Some(with_page(id));
    }
    if let Some(id) = first_capture(&RE_BILI_BANGUMI_EP, url) {
        return Some(ExtractedId::new(Platform::Bilibili, ContentKind::Bangumi, id));
    }
    if let Some(id) = first_capture(&RE_BILI_BANGUMI_SS, url) {
        return Some(ExtractedId::new(Platform::Bilibili, ContentKind::Bangumi, id));
    }
    if let Some(id) = first_capture(&RE_BILI_MEDIALIST, url) {
        return Some(ExtractedId::new(
            Platform::Bilibili,
            ContentKind::Medialist,
            id,
        ));
    }
    if let Some(id) = first_capture(&RE_BILI_LIVE, url) {
        return Some(ExtractedId::new(Platform::Bilibili, ContentKind::Live, id));
    }
    if is_short_link(url) {
        if let Some(code) = first_capture(&RE_BILI_SHORT, url) {
            let mut extracted = ExtractedId::new(Platform::Bilibili, ContentKind::Video, code);
            extracted.needs_redirect = true;
            return Some(extracted);
        }
    }
    // Player embeds and mobile share links carry the id in a query parameter
    // or in an unusual path position.
    if let Some(id) = first_capture(&RE_BILI_BVID_PARAM, url) {
        let mut normalized = id.to_string();
        normalized.replace_range(0..2, "BV");
        return Some(with_page(&normalized));
    }
    if let Some(tail) = first_capture(&RE_BILI_BV_ANYWHERE, url) {
        return Some(with_page(&format!("BV{tail}")));
    }
    // A bare numeric path carries no marker at all. Treating it as a live
    // room matches the most common share shape, but mis-handles numeric
    // vanity video links.
    if let Some(room) = first_capture(&RE_BILI_NUMERIC_PATH, url) {
        return Some(ExtractedId::new(Platform::Bilibili, ContentKind::Live, room));
    }
    None
}

fn extract_douyin(url: &str) -> Option<ExtractedId> {
    if let Some(id) = first_capture(&RE_DOUYIN_VIDEO, url) {
        return Some(ExtractedId::new(Platform::Douyin, ContentKind::Video, id));
    }
    if let Some(code) = first_capture(&RE_DOUYIN_SHORT, url) {
        let mut extracted = ExtractedId::new(Platform::Douyin, ContentKind::Video, code);
        extracted.needs_redirect = true;
        return Some(extracted);
    }
    first_capture(&RE_DOUYIN_AWEME, url)
        .map(|id| ExtractedId::new(Platform::Douyin, ContentKind::Video, id))
}

fn extract_tencent(url: &str) -> Option<ExtractedId> {
    first_capture(&RE_TENCENT_HTML, url)
        .or_else(|| first_capture(&RE_TENCENT_VID, url))
        .or_else(|| first_capture(&RE_TENCENT_PAGE, url))
        .or_else(|| first_capture(&RE_TENCENT_COVER, url))
        .map(|id| ExtractedId::new(Platform::Tencent, ContentKind::Video, id))
}

fn extract_xigua(url: &str) -> Option<ExtractedId> {
    first_capture(&RE_XIGUA_PATH, url)
        .or_else(|| first_capture(&RE_XIGUA_IXIGUA, url))
        .or_else(|| first_capture(&RE_XIGUA_XIGUA, url))
        .map(|id| ExtractedId::new(Platform::Xigua, ContentKind::Video, id))
}

fn extract_kuaishou(url: &str) -> Option<ExtractedId> {
    first_capture(&RE_KUAISHOU_PHOTO, url)
        .or_else(|| first_capture(&RE_KUAISHOU_SHORT_VIDEO, url))
        .or_else(|| first_capture(&RE_KUAISHOU_PROFILE, url))
        .map(|id| ExtractedId::new(Platform::Kuaishou, ContentKind::Video, id))
}

fn extract_youtube(url: &str) -> Option<ExtractedId> {
    first_capture(&RE_YOUTUBE_WATCH, url)
        .or_else(|| first_capture(&RE_YOUTUBE_SHORT, url))
        .or_else(|| first_capture(&RE_YOUTUBE_EMBED, url))
        .or_else(|| first_capture(&RE_YOUTUBE_V, url))
        .map(|id| ExtractedId::new(Platform::Youtube, ContentKind::Video, id))
}

fn extract_vimeo(url: &str) -> Option<ExtractedId> {
    first_capture(&RE_VIMEO_PLAIN, url)
        .or_else(|| first_capture(&RE_VIMEO_CHANNEL, url))
        .or_else(|| first_capture(&RE_VIMEO_GROUP, url))
        .map(|id| ExtractedId::new(Platform::Vimeo, ContentKind::Video, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bili(url: &str) -> ExtractedId {
        extract(url, Platform::Bilibili).unwrap()
    }

    #[test]
    fn bilibili_canonical_video_link() {
        let extracted = bili("https://www.bilibili.com/video/BV1xx411c7mD");
        assert_eq!(extracted.id, "BV1xx411c7mD");
        assert_eq!(extracted.kind, ContentKind::Video);
        assert_eq!(extracted.page, None);
        assert!(!extracted.needs_redirect);
    }

    #[test]
    fn bilibili_video_with_page_selector() {
        let extracted = bili("https://www.bilibili.com/video/BV1xx411c7mD?p=2");
        assert_eq!(extracted.id, "BV1xx411c7mD");
        assert_eq!(extracted.page, Some(2));
    }

    #[test]
    fn bilibili_timestamp_param_is_not_a_page() {
        let extracted = bili("https://www.bilibili.com/video/BV1xx411c7mD?t=120");
        assert_eq!(extracted.page, None);
    }

    #[test]
    fn bilibili_av_number_link() {
        let extracted = bili("https://www.bilibili.com/video/av170001");
        assert_eq!(extracted.id, "av170001");
        assert_eq!(extracted.kind, ContentKind::Video);
    }

    #[test]
    fn bilibili_bangumi_links() {
        let ep = bili("https://www.bilibili.com/bangumi/play/ep123456");
        assert_eq!(ep.id, "ep123456");
        assert_eq!(ep.kind, ContentKind::Bangumi);

        let ss = bili("https://www.bilibili.com/bangumi/play/ss12345");
        assert_eq!(ss.id, "ss12345");
        assert_eq!(ss.kind, ContentKind::Bangumi);
    }

    #[test]
    fn bilibili_live_and_medialist_links() {
        let live = bili("https://live.bilibili.com/12345");
        assert_eq!(live.id, "12345");
        assert_eq!(live.kind, ContentKind::Live);

        let list = bili("https://www.bilibili.com/medialist/play/ml123456");
        assert_eq!(list.id, "ml123456");
        assert_eq!(list.kind, ContentKind::Medialist);
    }

    #[test]
    fn bilibili_short_link_marks_redirect() {
        let extracted = bili("https://b23.tv/abcdefg");
        assert_eq!(extracted.id, "abcdefg");
        assert!(extracted.needs_redirect);
    }

    #[test]
    fn bilibili_mobile_and_player_links() {
        let mobile = bili("https://m.bilibili.com/video/BV1xx411c7mD");
        assert_eq!(mobile.id, "BV1xx411c7mD");

        let player = bili("https://player.bilibili.com/player.html?bvid=BV1xx411c7mD&page=1");
        assert_eq!(player.id, "BV1xx411c7mD");

        let lowercase = bili("https://player.bilibili.com/player.html?bvid=bv1xx411c7mD");
        assert_eq!(lowercase.id, "BV1xx411c7mD");
    }

    #[test]
    fn bilibili_bare_numeric_path_reads_as_live_room() {
        let extracted = bili("https://www.bilibili.com/230476");
        assert_eq!(extracted.id, "230476");
        assert_eq!(extracted.kind, ContentKind::Live);
    }

    #[test]
    fn bilibili_garbage_path_is_invalid() {
        let err = extract("https://www.bilibili.com/read/cv12345", Platform::Bilibili).unwrap_err();
        match err {
            ResolveError::InvalidLinkFormat(msg) => assert!(msg.contains("bilibili")),
            other => panic!("Expected InvalidLinkFormat, got {other:?}"),
        }
    }

    #[test]
    fn douyin_links() {
        let direct = extract(
            "https://www.douyin.com/video/7254810521205452343",
            Platform::Douyin,
        )
        .unwrap();
        assert_eq!(direct.id, "7254810521205452343");
        assert!(!direct.needs_redirect);

        let short = extract("https://v.douyin.com/iRNBho6u/", Platform::Douyin).unwrap();
        assert_eq!(short.id, "iRNBho6u");
        assert!(short.needs_redirect);

        let api = extract(
            "https://www.iesdouyin.com/aweme/v1/aweme/detail/?aweme_id=7254810521205452343",
            Platform::Douyin,
        )
        .unwrap();
        assert_eq!(api.id, "7254810521205452343");
    }

    #[test]
    fn tencent_links() {
        let cover = extract(
            "https://v.qq.com/x/cover/mzc00200vkqr54v/n4100a3yqog.html",
            Platform::Tencent,
        )
        .unwrap();
        assert_eq!(cover.id, "n4100a3yqog");

        let page = extract("https://v.qq.com/x/page/a1234bcd567.html", Platform::Tencent).unwrap();
        assert_eq!(page.id, "a1234bcd567");

        let vid = extract("https://v.qq.com/play?vid=n4100a3yqog", Platform::Tencent).unwrap();
        assert_eq!(vid.id, "n4100a3yqog");
    }

    #[test]
    fn xigua_and_kuaishou_links() {
        let xigua = extract(
            "https://www.ixigua.com/7290123456789012345/",
            Platform::Xigua,
        )
        .unwrap();
        assert_eq!(xigua.id, "7290123456789012345");

        let photo = extract(
            "https://www.kuaishou.com/photo/51234567890",
            Platform::Kuaishou,
        )
        .unwrap();
        assert_eq!(photo.id, "51234567890");

        let short = extract(
            "https://www.kuaishou.com/short-video/3xf8vnm2k7gq9ce",
            Platform::Kuaishou,
        )
        .unwrap();
        assert_eq!(short.id, "3xf8vnm2k7gq9ce");

        let profile = extract(
            "https://www.kuaishou.com/u/someone/3xf8vnm2k7gq9ce",
            Platform::Kuaishou,
        )
        .unwrap();
        assert_eq!(profile.id, "3xf8vnm2k7gq9ce");
    }

    #[test]
    fn youtube_link_shapes() {
        let cases = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
        ];
        for url in cases {
            let extracted = extract(url, Platform::Youtube).unwrap();
            assert_eq!(extracted.id, "dQw4w9WgXcQ", "url: {url}");
        }
    }

    #[test]
    fn vimeo_link_shapes() {
        let plain = extract("https://vimeo.com/148751763", Platform::Vimeo).unwrap();
        assert_eq!(plain.id, "148751763");

        let channel = extract(
            "https://vimeo.com/channels/staffpicks/148751763",
            Platform::Vimeo,
        )
        .unwrap();
        assert_eq!(channel.id, "148751763");

        let group = extract(
            "https://vimeo.com/groups/shortfilms/videos/148751763",
            Platform::Vimeo,
        )
        .unwrap();
        assert_eq!(group.id, "148751763");
    }
}
