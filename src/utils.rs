

use serde_json::Value;

const SIZE_UNITS: [&str; 5] = ["bytes", "KB", "MB", "GB", "TB"];


/// Appends a `_=<millis>` cache-busting parameter to a thumbnail URL.
#[inline]
pub fn cache_busted_url(url: &str, timestamp_millis: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}_={timestamp_millis}")
}


#[inline]
pub fn generate_thumbnail_url(url: &str) -> String {
    cache_busted_url(url, chrono::Utc::now().timestamp_millis())
}


/// Renders a byte count for display, e.g. `1536` becomes `2 KB`.
///
/// Strings are humanized only when they are plain digits once commas are removed;
/// anything else, such as an already formatted `12 MB`, is returned unchanged.
pub fn humanize_file_size(value: &Value) -> Value {
    let bytes = match value {
        Value::Number(n) => n.as_f64().map(|f| f.trunc()),
        Value::String(s) => digit_count(s),
        _ => None,
    };

    match bytes {
        Some(bytes) if bytes >= 0.0 => Value::String(format_bytes(bytes)),
        _ => value.clone(),
    }
}

fn format_bytes(bytes: f64) -> String {
    if bytes == 0.0 {
        return "0 bytes".to_string();
    }

    let mut index = 0;
    while index < SIZE_UNITS.len() - 1 && bytes >= 1024f64.powi(index as i32 + 1) {
        index += 1;
    }

    let scaled = bytes / 1024f64.powi(index as i32);
    if index < 2 {
        format!("{} {}", scaled.round(), SIZE_UNITS[index])
    } else {
        format!("{:.1} {}", (scaled * 10.0).round() / 10.0, SIZE_UNITS[index])
    }
}

fn digit_count(s: &str) -> Option<f64> {
    let digits = s.replace(',', "");
    let digits = digits.trim();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<f64>().ok()
}
