//! YouTube Live chat transport.
//!
//! Reads chat pages via `liveChatMessages.list` and posts replies via
//! `liveChatMessages.insert`. Reads authenticate with an API key;
//! posting needs an OAuth access token.
//! Docs: <https://developers.google.com/youtube/v3/live/docs/liveChatMessages>

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hibiki_core::{
    config::YouTubeConfig,
    error::HibikiError,
    message::{ChatItem, ChatPage},
    traits::ChatTransport,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// YouTube Live chat transport over the Data API v3.
pub struct YouTubeLiveChat {
    config: YouTubeConfig,
    client: reqwest::Client,
    base_url: String,
}

// --- YouTube API types ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveStreamingDetails {
    active_live_chat_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatListResponse {
    #[serde(default)]
    items: Vec<ChatMessageResource>,
    next_page_token: Option<String>,
    polling_interval_millis: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatMessageResource {
    id: String,
    snippet: ChatSnippet,
    author_details: Option<AuthorDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatSnippet {
    published_at: DateTime<Utc>,
    text_message_details: Option<TextMessageDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextMessageDetails {
    message_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorDetails {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    channel_id: String,
    #[serde(default)]
    is_chat_owner: bool,
    #[serde(default)]
    is_chat_moderator: bool,
}

impl ChatMessageResource {
    fn into_item(self) -> ChatItem {
        let author = self.author_details.unwrap_or_else(|| AuthorDetails {
            display_name: "?".to_string(),
            channel_id: String::new(),
            is_chat_owner: false,
            is_chat_moderator: false,
        });
        ChatItem {
            external_id: self.id,
            author_name: author.display_name,
            author_id: author.channel_id,
            is_owner: author.is_chat_owner,
            is_moderator: author.is_chat_moderator,
            text: self.snippet.text_message_details.and_then(|t| t.message_text),
            published_at: self.snippet.published_at,
        }
    }
}

impl YouTubeLiveChat {
    /// Create a new YouTube transport from config.
    pub fn new(config: YouTubeConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            config,
            client,
            base_url: API_BASE_URL.to_string(),
        }
    }

    /// GET a JSON endpoint, retrying once on a connection-level
    /// failure. Read-only calls are safe to repeat; the insert never
    /// goes through here.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        what: &str,
    ) -> Result<T, HibikiError> {
        let resp = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) if e.is_connect() || e.is_timeout() => {
                warn!("youtube {what} failed ({e}), retrying once");
                self.client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| HibikiError::Transport(format!("youtube {what} failed: {e}")))?
            }
            Err(e) => {
                return Err(HibikiError::Transport(format!(
                    "youtube {what} failed: {e}"
                )));
            }
        };

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(HibikiError::Transport(format!(
                "youtube {what} returned {status}: {body}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| HibikiError::Transport(format!("youtube {what} parse failed: {e}")))
    }

    /// Find the currently live video on the configured channel.
    async fn search_live_video_id(&self) -> Result<Option<String>, HibikiError> {
        let url = format!(
            "{}/search?part=id&channelId={}&eventType=live&type=video&maxResults=1&key={}",
            self.base_url, self.config.channel_id, self.config.api_key
        );
        let resp: SearchResponse = self.get_json(&url, "search.list").await?;
        Ok(resp.items.into_iter().next().and_then(|i| i.id.video_id))
    }

    /// Look up the active live chat id of a video, if it is live.
    async fn live_chat_id_for_video(&self, video_id: &str) -> Result<Option<String>, HibikiError> {
        let url = format!(
            "{}/videos?part=liveStreamingDetails&id={video_id}&key={}",
            self.base_url, self.config.api_key
        );
        let resp: VideosResponse = self.get_json(&url, "videos.list").await?;
        Ok(resp
            .items
            .into_iter()
            .next()
            .and_then(|v| v.live_streaming_details)
            .and_then(|d| d.active_live_chat_id))
    }
}

#[async_trait]
impl ChatTransport for YouTubeLiveChat {
    fn name(&self) -> &str {
        "youtube"
    }

    async fn resolve_chat_id(&self) -> Result<Option<String>, HibikiError> {
        let video_id = if !self.config.video_id.is_empty() {
            match extract_video_id(&self.config.video_id) {
                Some(id) => Some(id),
                None => {
                    return Err(HibikiError::Config(format!(
                        "cannot extract a video id from '{}'",
                        self.config.video_id
                    )));
                }
            }
        } else if !self.config.channel_id.is_empty() {
            self.search_live_video_id().await?
        } else {
            return Err(HibikiError::Config(
                "youtube: neither video_id nor channel_id configured".into(),
            ));
        };

        let Some(video_id) = video_id else {
            debug!("youtube: no live video on channel right now");
            return Ok(None);
        };

        self.live_chat_id_for_video(&video_id).await
    }

    async fn fetch_page(
        &self,
        chat_id: &str,
        cursor: Option<&str>,
    ) -> Result<ChatPage, HibikiError> {
        let mut url = format!(
            "{}/liveChat/messages?liveChatId={chat_id}&part=snippet,authorDetails&key={}",
            self.base_url, self.config.api_key
        );
        if let Some(token) = cursor {
            url.push_str(&format!("&pageToken={token}"));
        }

        let resp: ChatListResponse = self.get_json(&url, "liveChatMessages.list").await?;

        Ok(ChatPage {
            items: resp.items.into_iter().map(|i| i.into_item()).collect(),
            next_cursor: resp.next_page_token,
            polling_interval_ms: resp.polling_interval_millis,
        })
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), HibikiError> {
        if self.config.access_token.is_empty() {
            return Err(HibikiError::Transport(
                "youtube: no access_token configured, cannot post to chat".into(),
            ));
        }

        let url = format!("{}/liveChat/messages?part=snippet", self.base_url);
        let body = serde_json::json!({
            "snippet": {
                "type": "textMessageEvent",
                "liveChatId": chat_id,
                "textMessageDetails": { "messageText": text },
            }
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| HibikiError::Transport(format!("youtube insert failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(HibikiError::Transport(format!(
                "youtube insert returned {status}: {body}"
            )));
        }

        Ok(())
    }
}

/// Extract an 11-character video id from a raw id or a YouTube URL
/// (`watch?v=`, `youtu.be/`, `/live/`, `/shorts/`).
pub fn extract_video_id(url_or_id: &str) -> Option<String> {
    let s = url_or_id.trim();
    if s.is_empty() {
        return None;
    }
    if is_video_id(s) {
        return Some(s.to_string());
    }

    // watch?v=ID, possibly followed by more query parameters.
    if let Some(pos) = s.find("v=") {
        let candidate: String = s[pos + 2..]
            .chars()
            .take_while(|c| *c != '&' && *c != '#')
            .collect();
        if is_video_id(&candidate) {
            return Some(candidate);
        }
    }

    // youtu.be/ID, /live/ID, /shorts/ID.
    for marker in ["youtu.be/", "/live/", "/shorts/"] {
        if let Some(pos) = s.find(marker) {
            let candidate: String = s[pos + marker.len()..]
                .chars()
                .take_while(|c| *c != '?' && *c != '&' && *c != '#' && *c != '/')
                .collect();
            if is_video_id(&candidate) {
                return Some(candidate);
            }
        }
    }

    None
}

fn is_video_id(s: &str) -> bool {
    s.len() == 11
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_raw_video_id() {
        assert_eq!(
            extract_video_id("dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(extract_video_id("  dQw4w9WgXcQ  "), Some("dQw4w9WgXcQ".to_string()));
    }

    #[test]
    fn test_extract_from_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_from_short_and_live_urls() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=abc"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/live/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_rejects_garbage() {
        assert_eq!(extract_video_id(""), None);
        assert_eq!(extract_video_id("not a video"), None);
        assert_eq!(extract_video_id("https://example.com/watch?v=short"), None);
        assert_eq!(extract_video_id("tooshort"), None);
    }

    #[test]
    fn test_chat_list_response_parsing() {
        let json = r#"{
            "nextPageToken": "TOKEN123",
            "pollingIntervalMillis": 2000,
            "items": [{
                "id": "msg-1",
                "snippet": {
                    "publishedAt": "2024-05-01T12:00:00Z",
                    "textMessageDetails": { "messageText": "hello!" }
                },
                "authorDetails": {
                    "displayName": "Viewer",
                    "channelId": "UCviewer",
                    "isChatOwner": false,
                    "isChatModerator": true
                }
            }]
        }"#;
        let resp: ChatListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.next_page_token.as_deref(), Some("TOKEN123"));
        assert_eq!(resp.polling_interval_millis, Some(2000));

        let item = resp.items.into_iter().next().unwrap().into_item();
        assert_eq!(item.external_id, "msg-1");
        assert_eq!(item.author_name, "Viewer");
        assert_eq!(item.author_id, "UCviewer");
        assert!(!item.is_owner);
        assert!(item.is_moderator);
        assert_eq!(item.text.as_deref(), Some("hello!"));
    }

    #[test]
    fn test_non_text_event_maps_to_none() {
        // Membership events and the like have no textMessageDetails.
        let json = r#"{
            "items": [{
                "id": "msg-2",
                "snippet": { "publishedAt": "2024-05-01T12:00:01Z" },
                "authorDetails": { "displayName": "Member", "channelId": "UCx" }
            }]
        }"#;
        let resp: ChatListResponse = serde_json::from_str(json).unwrap();
        let item = resp.items.into_iter().next().unwrap().into_item();
        assert!(item.text.is_none());
        assert!(resp.next_page_token.is_none());
        assert!(resp.polling_interval_millis.is_none());
    }

    #[test]
    fn test_missing_author_details_tolerated() {
        let json = r#"{
            "items": [{
                "id": "msg-3",
                "snippet": {
                    "publishedAt": "2024-05-01T12:00:02Z",
                    "textMessageDetails": { "messageText": "hi" }
                }
            }]
        }"#;
        let resp: ChatListResponse = serde_json::from_str(json).unwrap();
        let item = resp.items.into_iter().next().unwrap().into_item();
        assert_eq!(item.author_name, "?");
        assert!(item.author_id.is_empty());
    }

    #[test]
    fn test_videos_response_parsing() {
        let json = r#"{
            "items": [{
                "liveStreamingDetails": { "activeLiveChatId": "CHAT_X" }
            }]
        }"#;
        let resp: VideosResponse = serde_json::from_str(json).unwrap();
        let chat_id = resp
            .items
            .into_iter()
            .next()
            .and_then(|v| v.live_streaming_details)
            .and_then(|d| d.active_live_chat_id);
        assert_eq!(chat_id.as_deref(), Some("CHAT_X"));

        // Video exists but is not live: details present, no chat id.
        let json = r#"{"items": [{"liveStreamingDetails": {}}]}"#;
        let resp: VideosResponse = serde_json::from_str(json).unwrap();
        let chat_id = resp
            .items
            .into_iter()
            .next()
            .and_then(|v| v.live_streaming_details)
            .and_then(|d| d.active_live_chat_id);
        assert!(chat_id.is_none());
    }

    #[test]
    fn test_search_response_parsing() {
        let json = r#"{"items": [{"id": {"videoId": "dQw4w9WgXcQ"}}]}"#;
        let resp: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            resp.items.into_iter().next().and_then(|i| i.id.video_id),
            Some("dQw4w9WgXcQ".to_string())
        );

        let empty: SearchResponse = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert!(empty.items.is_empty());
    }
}
