// YouTube URL grammar

use regex::Regex;

use super::errors::ParseError;
use super::models::VideoReference;

lazy_static::lazy_static! {
    static ref BARE_ID_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap();
    static ref WATCH_RE: Regex = Regex::new(
        r"^(?:https?://)?(?:www\.|m\.|music\.)?youtube\.com/watch/?\?(?:[^#]*&)?v=([A-Za-z0-9_-]{11})(?:[&#].*)?$"
    ).unwrap();
    static ref SHORT_RE: Regex = Regex::new(
        r"^(?:https?://)?(?:www\.)?youtu\.be/([A-Za-z0-9_-]{11})(?:[/?#].*)?$"
    ).unwrap();
    static ref PATH_RE: Regex = Regex::new(
        r"^(?:https?://)?(?:www\.|m\.|music\.)?youtube(?:-nocookie)?\.com/(?:embed|shorts|live|v)/([A-Za-z0-9_-]{11})(?:[/?#].*)?$"
    ).unwrap();
}

/// Parse a user-supplied URL (or bare id) into a `VideoReference`
pub fn parse_video_reference(input: &str) -> Result<VideoReference, ParseError> {
    let trimmed = input.trim();

    if BARE_ID_RE.is_match(trimmed) {
        return Ok(VideoReference {
            id: trimmed.to_string(),
        });
    }

    [&*WATCH_RE, &*SHORT_RE, &*PATH_RE]
        .iter()
        .find_map(|re| re.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|m| VideoReference {
            id: m.as_str().to_string(),
        })
        .ok_or_else(|| ParseError {
            input: trimmed.to_string(),
        })
}
