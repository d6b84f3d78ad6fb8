//! Topic string helpers.
//!
//! Topics are `/`-separated. The first segment is the device class, the
//! optional second segment addresses one device within it. A device class
//! ending in `ask` marks the request variant of a broadcast channel; a
//! responder derives its reply channel by stripping the suffix.

use crate::error::DecodeError;

/// Topic segment separator.
pub const SEPARATOR: char = '/';

/// Marker suffix on the request variant of a broadcast channel.
pub const ASK_SUFFIX: &str = "ask";

/// Join topic segments with `/`, skipping empty or whitespace-only ones.
pub fn join_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Split a topic into device class and optional device id.
///
/// The `ask` suffix is stripped from the class before it is returned.
/// Segments past the device id are ignored.
pub fn split_topic(topic: &str) -> Result<(String, Option<String>), DecodeError> {
    let mut segments = topic.split(SEPARATOR);
    let class = strip_ask_suffix(segments.next().unwrap_or("").trim());
    if class.is_empty() {
        return Err(DecodeError::EmptyDeviceClass);
    }
    let device_id = segments
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);
    Ok((class.to_string(), device_id))
}

/// Strip the request-channel marker, if present.
pub fn strip_ask_suffix(class: &str) -> &str {
    class.strip_suffix(ASK_SUFFIX).unwrap_or(class)
}
