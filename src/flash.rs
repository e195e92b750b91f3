//! One-shot notices carried across a redirect in a cookie.
//!
//! Handlers `push` messages before redirecting; the next page render
//! `take`s them, which also clears the cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE_NAME: &str = "society_flash";

/// Cap on queued messages so the cookie stays small
const MAX_MESSAGES: usize = 8;

/// Budget for the encoded cookie value; name and attributes must still fit in 4096 bytes
const MAX_VALUE_BYTES: usize = 3584;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl FlashLevel {
    /// CSS class suffix used by the templates
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Info => "info",
            FlashLevel::Warning => "warning",
            FlashLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub text: String,
}

impl FlashMessage {
    pub fn new(level: FlashLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(FlashLevel::Success, text)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(FlashLevel::Info, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(FlashLevel::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(FlashLevel::Error, text)
    }

    pub fn css_class(&self) -> &'static str {
        self.level.as_str()
    }
}

fn decode(value: &str) -> Vec<FlashMessage> {
    urlencoding::decode(value)
        .ok()
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default()
}

fn encode(messages: &[FlashMessage]) -> String {
    let json = serde_json::to_string(messages).unwrap_or_else(|_| "[]".to_string());
    urlencoding::encode(&json).into_owned()
}

/// Encode, dropping the oldest messages until the value fits; a lone
/// oversized message is shortened instead
fn encode_within_budget(mut messages: Vec<FlashMessage>) -> String {
    loop {
        let encoded = encode(&messages);
        if encoded.len() <= MAX_VALUE_BYTES || messages.is_empty() {
            return encoded;
        }
        if messages.len() > 1 {
            messages.remove(0);
            continue;
        }
        let text = &mut messages[0].text;
        let keep = text.chars().count() / 2;
        *text = text.chars().take(keep).collect();
    }
}

/// Messages currently queued in the jar (including ones added this request)
pub fn peek(jar: &CookieJar) -> Vec<FlashMessage> {
    jar.get(FLASH_COOKIE_NAME)
        .map(|c| decode(c.value()))
        .unwrap_or_default()
}

/// Queue a message for the next rendered page
pub fn push(jar: CookieJar, message: FlashMessage) -> CookieJar {
    let mut messages = peek(&jar);
    messages.push(message);
    if messages.len() > MAX_MESSAGES {
        messages.drain(..messages.len() - MAX_MESSAGES);
    }

    let cookie = Cookie::build((FLASH_COOKIE_NAME, encode_within_budget(messages)))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

/// Take all queued messages, clearing the cookie
pub fn take(jar: CookieJar) -> (CookieJar, Vec<FlashMessage>) {
    let messages = peek(&jar);
    if messages.is_empty() && jar.get(FLASH_COOKIE_NAME).is_none() {
        return (jar, messages);
    }
    let jar = jar.remove(Cookie::build(FLASH_COOKIE_NAME).path("/"));
    (jar, messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_then_take() {
        let jar = push(CookieJar::new(), FlashMessage::success("Login successful."));
        let jar = push(jar, FlashMessage::warning("Multiple accounts; using the most recent."));

        let (jar, messages) = take(jar);
        assert_eq!(
            messages,
            vec![
                FlashMessage::success("Login successful."),
                FlashMessage::warning("Multiple accounts; using the most recent."),
            ]
        );
        assert!(peek(&jar).is_empty());
    }

    #[test]
    fn test_cookie_value_is_cookie_safe() {
        let jar = push(CookieJar::new(), FlashMessage::info("Values: filter=70; hot=N/A, \"ok\""));
        let value = jar.get(FLASH_COOKIE_NAME).unwrap().value().to_string();
        assert!(!value.contains(';'));
        assert!(!value.contains(' '));
        assert!(!value.contains('"'));
        assert_eq!(decode(&value)[0].text, "Values: filter=70; hot=N/A, \"ok\"");
    }

    #[test]
    fn test_garbage_cookie_ignored() {
        let jar = CookieJar::new().add(Cookie::new(FLASH_COOKIE_NAME, "%%%not-json"));
        let (_, messages) = take(jar);
        assert!(messages.is_empty());
    }

    #[test]
    fn test_queue_is_capped() {
        let mut jar = CookieJar::new();
        for i in 0..(MAX_MESSAGES + 3) {
            jar = push(jar, FlashMessage::info(format!("note {}", i)));
        }
        let messages = peek(&jar);
        assert_eq!(messages.len(), MAX_MESSAGES);
        assert_eq!(messages[0].text, "note 3");
    }

    #[test]
    fn test_value_stays_within_budget() {
        let jar = push(CookieJar::new(), FlashMessage::success("Report submitted for Water tank capacity."));
        let jar = push(jar, FlashMessage::info("é".repeat(1200)));
        let value = jar.get(FLASH_COOKIE_NAME).unwrap().value().to_string();
        assert!(value.len() <= MAX_VALUE_BYTES);
        assert_eq!(decode(&value).len(), 1);

        let jar = push(CookieJar::new(), FlashMessage::info("x".repeat(10_000)));
        let value = jar.get(FLASH_COOKIE_NAME).unwrap().value().to_string();
        assert!(value.len() <= MAX_VALUE_BYTES);
        assert!(decode(&value)[0].text.starts_with("xxxx"));
    }

    #[test]
    fn test_small_messages_are_kept_together() {
        let jar = push(CookieJar::new(), FlashMessage::success("Report submitted for Water tank capacity."));
        let jar = push(jar, FlashMessage::info(format!("Values: filter={}", "x".repeat(64))));
        assert_eq!(peek(&jar).len(), 2);
    }

    #[test]
    fn test_take_without_cookie() {
        let (_, messages) = take(CookieJar::new());
        assert!(messages.is_empty());
    }
}
