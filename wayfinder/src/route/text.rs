//! Instruction text cleanup and spoken formatting of distances and times.

use std::sync::OnceLock;

use regex::Regex;

/// Matches any markup tag, e.g. `<b>`, `</div>`, `<div style="...">`.
fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

/// Matches runs of whitespace.
fn whitespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Matches whitespace left in front of punctuation after tag removal.
fn space_before_punctuation() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+([,.;:!?])").unwrap())
}

/// Convert provider HTML instruction markup into speakable plain text.
///
/// Tags become word breaks so that block elements such as
/// `<div>Destination will be on the right</div>` do not run into the
/// preceding sentence. Common entities are decoded and whitespace collapsed.
///
/// # Example
///
/// ```
/// use wayfinder::route::clean_instruction;
///
/// let text = clean_instruction("Turn <b>left</b> onto <b>Main&nbsp;St</b>");
/// assert_eq!(text, "Turn left onto Main St");
/// ```
pub fn clean_instruction(html: &str) -> String {
    let without_tags = tag_pattern().replace_all(html, " ");
    let decoded = decode_entities(&without_tags);
    let collapsed = whitespace_pattern().replace_all(&decoded, " ");
    space_before_punctuation()
        .replace_all(collapsed.trim(), "$1")
        .into_owned()
}

/// Decode the handful of entities directions providers actually emit.
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Format a distance for speech: "850 m" below a kilometer, "1.2 km" above.
///
/// Short distances are rounded to the nearest 10 meters.
pub fn format_distance(meters: f64) -> String {
    let meters = meters.max(0.0);
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{} m", ((meters / 10.0).round() as i64) * 10)
    }
}

/// Format a travel time for speech: "1 min", "14 mins", "1 hour 5 mins".
///
/// Durations are rounded up to whole minutes, with a minimum of one minute.
pub fn format_duration(seconds: f64) -> String {
    let total_minutes = ((seconds.max(0.0) / 60.0).ceil() as u64).max(1);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    let minutes_text = match minutes {
        1 => "1 min".to_string(),
        n => format!("{} mins", n),
    };

    match (hours, minutes) {
        (0, _) => minutes_text,
        (1, 0) => "1 hour".to_string(),
        (h, 0) => format!("{} hours", h),
        (1, _) => format!("1 hour {}", minutes_text),
        (h, _) => format!("{} hours {}", h, minutes_text),
    }
}
