//! Bilibili resolver. Covers normal videos (BV and av ids), bangumi
//! episodes and seasons, live rooms, media collections, and b23.tv short
//! links.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::classify::Platform;
use crate::error::ResolveError;
use crate::extract::{extract, ExtractedId};
use crate::fetcher::Fetcher;
use crate::orchestrator::ResolveOptions;
use crate::record::{
    BilibiliExtra, ContentKind, EmbedInfo, PageDimension, VideoFormat, VideoPage, VideoRecord,
};
use crate::PlatformResolver;

const VIEW_API: &str = "https://api.bilibili.com/x/web-interface/view";
const SEASON_API: &str = "https://api.bilibili.com/pgc/view/web/season";
const LIVE_ROOM_API: &str = "https://api.live.bilibili.com/room/v1/Room/get_info";
const FAVLIST_API: &str = "https://api.bilibili.com/x/v3/fav/resource/list";

pub struct BilibiliResolver {
    fetcher: Fetcher,
}

#[derive(Debug, Deserialize)]
struct ViewResponse {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<ViewData>,
}

#[derive(Debug, Deserialize)]
struct ViewData {
    bvid: String,
    #[serde(default)]
    aid: u64,
    #[serde(default)]
    tid: u32,
    #[serde(default)]
    tname: String,
    #[serde(default)]
    copyright: i64,
    #[serde(default)]
    pic: String,
    title: String,
    #[serde(default)]
    pubdate: i64,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    duration: u64,
    #[serde(default)]
    owner: Owner,
    #[serde(default)]
    stat: ViewStat,
    #[serde(default)]
    pages: Vec<PageInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct Owner {
    #[serde(default)]
    mid: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    face: String,
}

#[derive(Debug, Default, Deserialize)]
struct ViewStat {
    #[serde(default)]
    view: u64,
    #[serde(default)]
    danmaku: u64,
    #[serde(default)]
    reply: u64,
    #[serde(default)]
    favorite: u64,
    #[serde(default)]
    coin: u64,
    #[serde(default)]
    share: u64,
    #[serde(default)]
    like: u64,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    cid: u64,
    page: u32,
    #[serde(default)]
    part: String,
    #[serde(default)]
    duration: u64,
    dimension: Option<DimensionInfo>,
}

#[derive(Debug, Deserialize)]
struct DimensionInfo {
    width: u32,
    height: u32,
    rotate: u8,
}

#[derive(Debug, Deserialize)]
struct SeasonResponse {
    code: i64,
    #[serde(default)]
    message: String,
    result: Option<SeasonData>,
}

#[derive(Debug, Deserialize)]
struct SeasonData {
    title: String,
    #[serde(default)]
    evaluate: String,
    #[serde(default)]
    cover: String,
    #[serde(default)]
    episodes: Vec<EpisodeData>,
    up_info: Option<UpInfo>,
    stat: Option<SeasonStat>,
}

#[derive(Debug, Clone, Deserialize)]
struct EpisodeData {
    id: u64,
    #[serde(default)]
    aid: u64,
    #[serde(default)]
    bvid: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    long_title: String,
    #[serde(default)]
    cover: String,
    /// Milliseconds in the season payload.
    #[serde(default)]
    duration: u64,
    #[serde(default)]
    pub_time: i64,
}

#[derive(Debug, Deserialize)]
struct UpInfo {
    #[serde(default)]
    mid: u64,
    #[serde(default)]
    uname: String,
    #[serde(default)]
    avatar: String,
}

#[derive(Debug, Default, Deserialize)]
struct SeasonStat {
    #[serde(default)]
    views: u64,
    #[serde(default)]
    danmakus: u64,
    #[serde(default)]
    reply: u64,
    #[serde(default)]
    favorites: u64,
    #[serde(default)]
    coins: u64,
    #[serde(default)]
    share: u64,
    #[serde(default)]
    likes: u64,
}

#[derive(Debug, Deserialize)]
struct LiveRoomResponse {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<LiveRoomData>,
}

#[derive(Debug, Deserialize)]
struct LiveRoomData {
    #[serde(default)]
    uid: u64,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    user_cover: String,
    #[serde(default)]
    keyframe: String,
    #[serde(default)]
    online: u64,
    #[serde(default)]
    live_time: String,
}

impl Default for BilibiliResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl BilibiliResolver {
    pub fn new() -> Self {
        Self {
            fetcher: Fetcher::new_bilibili_client(),
        }
    }

    pub fn with_fetcher(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    async fn expand_short_link(&self, url: &str) -> Result<(String, ExtractedId), ResolveError> {
        let target = self.fetcher.resolve_redirect(url).await?.ok_or_else(|| {
            ResolveError::RemoteApiError {
                platform: "bilibili".to_string(),
                message: format!("short link did not redirect: {url}"),
            }
        })?;
        debug!(target = %target, "Expanded b23.tv short link");

        let ident = extract(&target, Platform::Bilibili)?;
        if ident.needs_redirect {
            return Err(ResolveError::RemoteApiError {
                platform: "bilibili".to_string(),
                message: format!("short link redirected to another short link: {target}"),
            });
        }
        Ok((target, ident))
    }

    #[instrument(level = "debug", skip(self, ident), err)]
    async fn resolve_video(
        &self,
        url: &str,
        ident: &ExtractedId,
    ) -> Result<VideoRecord, ResolveError> {
        // The view API accepts either id form and always reports the BV id
        // back, which normalizes av links in one round trip.
        let query = match ident.id.strip_prefix("av") {
            Some(aid) => format!("{VIEW_API}?aid={aid}"),
            None => format!("{VIEW_API}?bvid={}", ident.id),
        };
        let response: ViewResponse = self.fetcher.fetch_json(&query, "bilibili").await?;
        let data = check_api_code(response.code, response.message, response.data)?;

        let mut record = VideoRecord::for_platform(Platform::Bilibili, url);
        record.id = data.bvid.clone();
        record.content_type = ContentKind::Video;
        record.title = data.title;
        record.description = data.desc;
        record.thumbnail = data.pic;
        record.duration = data.duration;
        record.uploader = if data.owner.name.is_empty() {
            "未知用户".to_string()
        } else {
            data.owner.name
        };
        record.uploader_id = data.owner.mid.to_string();
        record.uploader_avatar = data.owner.face;
        record.upload_date = compact_date(data.pubdate);
        record.view_count = data.stat.view;
        record.like_count = data.stat.like;
        record.comment_count = data.stat.reply;
        record.share_count = data.stat.share;
        record.embed = Some(EmbedInfo::iframe(
            embed_url(&data.bvid, ident.page),
            1280,
            720,
        ));
        record.formats = vec![web_player_format(url)];
        record.extractor = "bilibili_api".to_string();
        record.bilibili = Some(BilibiliExtra {
            aid: data.aid,
            coin_count: data.stat.coin,
            favorite_count: data.stat.favorite,
            danmaku_count: data.stat.danmaku,
            pages: data
                .pages
                .into_iter()
                .map(|p| VideoPage {
                    cid: p.cid,
                    page: p.page,
                    part: p.part,
                    duration: p.duration,
                    dimension: p.dimension.map(|d| PageDimension {
                        width: d.width,
                        height: d.height,
                        rotate: d.rotate,
                    }),
                })
                .collect(),
            tid: Some(data.tid),
            tname: (!data.tname.is_empty()).then_some(data.tname),
            copyright: if data.copyright == 1 { "原创" } else { "转载" }.to_string(),
            media_count: None,
        });
        Ok(record)
    }

    #[instrument(level = "debug", skip(self, ident), err)]
    async fn resolve_bangumi(
        &self,
        url: &str,
        ident: &ExtractedId,
    ) -> Result<VideoRecord, ResolveError> {
        let query = if let Some(ep) = ident.id.strip_prefix("ep") {
            format!("{SEASON_API}?ep_id={ep}")
        } else if let Some(ss) = ident.id.strip_prefix("ss") {
            format!("{SEASON_API}?season_id={ss}")
        } else {
            return Err(ResolveError::InvalidLinkFormat(format!(
                "bangumi id is neither ep nor ss: {}",
                ident.id
            )));
        };
        let response: SeasonResponse = self.fetcher.fetch_json(&query, "bilibili").await?;
        let season = check_api_code(response.code, response.message, response.result)?;
        if season.episodes.is_empty() {
            return Err(ResolveError::NotFoundError(
                "剧集不包含任何可播放的集数".to_string(),
            ));
        }

        let requested: Option<u64> = ident.id.strip_prefix("ep").and_then(|n| n.parse().ok());
        let (episode, substituted) = match requested {
            Some(ep_id) => match season.episodes.iter().find(|e| e.id == ep_id) {
                Some(found) => (found.clone(), false),
                None => {
                    warn!(ep_id, "Requested episode not in season, using the first one");
                    (season.episodes[0].clone(), true)
                }
            },
            // An ss link addresses the whole season; the first episode
            // stands in for it without being a degraded answer.
            None => (season.episodes[0].clone(), false),
        };

        let stat = season.stat.unwrap_or_default();
        let mut record = VideoRecord::for_platform(Platform::Bilibili, url);
        record.id = ident.id.clone();
        record.content_type = ContentKind::Bangumi;
        let episode_title = if episode.long_title.is_empty() {
            episode.title
        } else {
            episode.long_title
        };
        record.title = if episode_title.is_empty() {
            season.title
        } else {
            format!("{} {}", season.title, episode_title)
        };
        record.description = season.evaluate;
        record.thumbnail = if episode.cover.is_empty() {
            season.cover
        } else {
            episode.cover
        };
        record.duration = episode.duration / 1000;
        if let Some(up) = season.up_info {
            record.uploader = up.uname;
            record.uploader_id = up.mid.to_string();
            record.uploader_avatar = up.avatar;
        }
        record.upload_date = compact_date(episode.pub_time);
        record.view_count = stat.views;
        record.like_count = stat.likes;
        record.comment_count = stat.reply;
        record.share_count = stat.share;
        if !episode.bvid.is_empty() {
            record.embed = Some(EmbedInfo::iframe(embed_url(&episode.bvid, None), 1280, 720));
        }
        record.formats = vec![web_player_format(url)];
        record.extractor = "bilibili_bangumi_api".to_string();
        record.bilibili = Some(BilibiliExtra {
            aid: episode.aid,
            coin_count: stat.coins,
            favorite_count: stat.favorites,
            danmaku_count: stat.danmakus,
            ..BilibiliExtra::default()
        });
        if substituted {
            record.mark_fallback("未找到指定剧集，已返回第一集");
        }
        Ok(record)
    }

    #[instrument(level = "debug", skip(self, ident), err)]
    async fn resolve_live(
        &self,
        url: &str,
        ident: &ExtractedId,
    ) -> Result<VideoRecord, ResolveError> {
        let query = format!("{LIVE_ROOM_API}?room_id={}", ident.id);
        let response: LiveRoomResponse = self.fetcher.fetch_json(&query, "bilibili").await?;
        let data = check_api_code(response.code, response.message, response.data)?;

        let mut record = VideoRecord::for_platform(Platform::Bilibili, url);
        record.id = ident.id.clone();
        record.content_type = ContentKind::Live;
        record.title = data.title;
        record.description = data.description;
        record.thumbnail = if data.user_cover.is_empty() {
            data.keyframe
        } else {
            data.user_cover
        };
        record.view_count = data.online;
        // The room info API reports the streamer uid but not the display
        // name.
        record.uploader_id = data.uid.to_string();
        if let Ok(start) =
            chrono::NaiveDateTime::parse_from_str(&data.live_time, "%Y-%m-%d %H:%M:%S")
        {
            record.upload_date = start.format("%Y%m%d").to_string();
        }
        record.extractor = "bilibili_live_api".to_string();
        Ok(record)
    }

    #[instrument(level = "debug", skip(self, ident), err)]
    async fn resolve_medialist(
        &self,
        url: &str,
        ident: &ExtractedId,
    ) -> Result<VideoRecord, ResolveError> {
        let media_id = ident.id.strip_prefix("ml").unwrap_or(&ident.id);
        let query = format!("{FAVLIST_API}?media_id={media_id}&ps=20&pn=1&platform=web");
        let v: serde_json::Value = self.fetcher.fetch_json(&query, "bilibili").await?;

        let code = v["code"].as_i64().unwrap_or(-1);
        if code != 0 {
            let message = v["message"].as_str().unwrap_or("unknown error").to_string();
            return Err(match code {
                -404 => ResolveError::NotFoundError(message),
                _ => ResolveError::RemoteApiError {
                    platform: "bilibili".to_string(),
                    message: format!("code {code}: {message}"),
                },
            });
        }

        let info = &v["data"]["info"];
        let mut record = VideoRecord::for_platform(Platform::Bilibili, url);
        record.id = ident.id.clone();
        record.content_type = ContentKind::Medialist;
        record.title = info["title"].as_str().unwrap_or("B站合集").to_string();
        record.description = info["intro"].as_str().unwrap_or("").to_string();
        record.thumbnail = info["cover"].as_str().unwrap_or("").to_string();
        record.view_count = info["cnt_info"]["play"].as_u64().unwrap_or(0);
        record.like_count = info["cnt_info"]["thumb_up"].as_u64().unwrap_or(0);
        record.share_count = info["cnt_info"]["share"].as_u64().unwrap_or(0);
        record.uploader = info["upper"]["name"].as_str().unwrap_or("").to_string();
        record.uploader_id = info["upper"]["mid"]
            .as_u64()
            .map(|mid| mid.to_string())
            .unwrap_or_default();
        record.uploader_avatar = info["upper"]["face"].as_str().unwrap_or("").to_string();
        record.extractor = "bilibili_favlist_api".to_string();
        record.bilibili = Some(BilibiliExtra {
            media_count: info["media_count"].as_u64(),
            ..BilibiliExtra::default()
        });
        Ok(record)
    }
}

#[async_trait]
impl PlatformResolver for BilibiliResolver {
    fn platform(&self) -> Platform {
        Platform::Bilibili
    }

    async fn resolve(
        &self,
        url: &str,
        ident: &ExtractedId,
        _opts: &ResolveOptions,
    ) -> Result<VideoRecord, ResolveError> {
        let expanded;
        let (url, ident) = if ident.needs_redirect {
            expanded = self.expand_short_link(url).await?;
            (expanded.0.as_str(), &expanded.1)
        } else {
            (url, ident)
        };

        match ident.kind {
            ContentKind::Video => self.resolve_video(url, ident).await,
            ContentKind::Bangumi => self.resolve_bangumi(url, ident).await,
            ContentKind::Live => self.resolve_live(url, ident).await,
            ContentKind::Medialist => self.resolve_medialist(url, ident).await,
        }
    }
}

fn check_api_code<T>(code: i64, message: String, data: Option<T>) -> Result<T, ResolveError> {
    if code != 0 {
        return Err(match code {
            -404 => ResolveError::NotFoundError(message),
            _ => ResolveError::RemoteApiError {
                platform: "bilibili".to_string(),
                message: format!("code {code}: {message}"),
            },
        });
    }
    data.ok_or_else(|| ResolveError::RemoteApiError {
        platform: "bilibili".to_string(),
        message: "API reported success without a payload".to_string(),
    })
}

fn embed_url(bvid: &str, page: Option<u32>) -> String {
    let mut url = format!("https://player.bilibili.com/player.html?bvid={bvid}&autoplay=0");
    if let Some(page) = page {
        url.push_str(&format!("&page={page}"));
    }
    url
}

/// Stand-in format pointing at the web player; direct stream URLs need
/// signed playurl requests that a plain API key cannot make.
fn web_player_format(url: &str) -> VideoFormat {
    VideoFormat {
        format_id: "bilibili_web".to_string(),
        url: url.to_string(),
        ext: "mp4".to_string(),
        quality: 720,
        width: Some(1280),
        height: Some(720),
        fps: Some(30.0),
        vcodec: Some("h264".to_string()),
        acodec: Some("aac".to_string()),
        note: "需要B站播放器".to_string(),
        ..VideoFormat::default()
    }
}

fn compact_date(epoch: i64) -> String {
    if epoch <= 0 {
        return String::new();
    }
    chrono::DateTime::from_timestamp(epoch, 0)
        .map(|date| date.format("%Y%m%d").to_string())
        .unwrap_or_default()
}
