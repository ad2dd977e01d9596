use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::backend::User;
use crate::model::PLACEHOLDER;

/// `"light rain"` becomes `"Light Rain"`.
pub fn capitalize_words(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn greeting(hour: u32) -> &'static str {
    if hour < 12 {
        "Good morning"
    } else if hour < 17 {
        "Good afternoon"
    } else {
        "Good evening"
    }
}

/// Name to greet a signed-in user with.
pub fn display_name(user: &User) -> String {
    if let Some(name) = user.name().filter(|n| !n.trim().is_empty()) {
        return name.to_string();
    }

    user.email
        .as_deref()
        .and_then(|email| email.split('@').next())
        .filter(|local| !local.is_empty())
        .unwrap_or("User")
        .to_string()
}

/// Local wall-clock `HH:MM` at the reported place.
pub fn clock_time(ts: Option<DateTime<Utc>>, tz_offset_secs: Option<i32>) -> String {
    let Some(ts) = ts else {
        return PLACEHOLDER.to_string();
    };

    let offset = tz_offset_secs
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix());

    ts.with_timezone(&offset).format("%H:%M").to_string()
}
