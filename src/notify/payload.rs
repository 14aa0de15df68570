//! Notification payload assembly.

use serde::Serialize;

use crate::content::{Category, Frontmatter};

use super::SkipReason;

/// JSON body sent to the Webpushr send endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationPayload {
    pub title: String,
    pub message: String,
    pub target_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
}

impl NotificationPayload {
    /// Assemble the audience-independent part of a payload.
    ///
    /// The message falls back to the title, the title to `default_title`.
    pub fn assemble(
        frontmatter: &Frontmatter,
        default_title: &str,
        target_url: String,
        icon: Option<String>,
    ) -> Self {
        let title = frontmatter
            .title
            .clone()
            .unwrap_or_else(|| default_title.to_string());
        let message = frontmatter
            .message_text()
            .map(str::to_string)
            .unwrap_or_else(|| title.clone());

        Self {
            title,
            message,
            target_url,
            icon: None,
            image: None,
            thumbnail: None,
            segment: None,
            sid: None,
        }
        .with_icon(icon)
    }

    /// Attach an icon under every image field the API accepts.
    pub fn with_icon(mut self, icon: Option<String>) -> Self {
        self.image = icon.clone();
        self.thumbnail = icon.clone();
        self.icon = icon;
        self
    }

    /// Copy addressed to a segment.
    pub fn for_segment(&self, tag: &str) -> Self {
        Self {
            segment: Some(tag.to_string()),
            sid: None,
            ..self.clone()
        }
    }

    /// Copy addressed to a single subscriber.
    pub fn for_subscriber(&self, sid: &str) -> Self {
        Self {
            segment: None,
            sid: Some(sid.to_string()),
            ..self.clone()
        }
    }
}

/// Decide whether a file may send at all.
///
/// Notifications are opt-out: they send unless `send_now` is false.
/// News and places are opt-in: `send_notification` (or `send_now` when
/// that is absent) must be true.
pub fn send_gate(category: Category, frontmatter: &Frontmatter) -> Result<(), SkipReason> {
    match category {
        Category::Notification => match frontmatter.send_now {
            Some(false) => Err(SkipReason::OptedOut),
            _ => Ok(()),
        },
        Category::News | Category::Places => {
            match frontmatter.send_notification.or(frontmatter.send_now) {
                Some(true) => Ok(()),
                Some(false) => Err(SkipReason::OptedOut),
                None => Err(SkipReason::NotOptedIn),
            }
        }
        Category::Other => Err(SkipReason::UnwatchedCategory),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frontmatter(yaml: &str) -> Frontmatter {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_assemble_defaults() {
        let payload = NotificationPayload::assemble(
            &Frontmatter::default(),
            "New update",
            "https://example.org/".to_string(),
            None,
        );
        assert_eq!(payload.title, "New update");
        assert_eq!(payload.message, "New update");
        assert_eq!(payload.icon, None);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "title": "New update",
                "message": "New update",
                "target_url": "https://example.org/"
            })
        );
    }

    #[test]
    fn test_assemble_message_falls_back_to_title() {
        let fm = frontmatter("title: Spring Fest\n");
        let payload =
            NotificationPayload::assemble(&fm, "x", "https://example.org/".to_string(), None);
        assert_eq!(payload.message, "Spring Fest");
    }

    #[test]
    fn test_icon_aliases() {
        let payload = NotificationPayload::assemble(
            &frontmatter("title: T\npush_message: M\n"),
            "x",
            "https://example.org/".to_string(),
            Some("https://example.org/i.png".to_string()),
        );
        assert_eq!(payload.message, "M");
        assert_eq!(payload.icon.as_deref(), Some("https://example.org/i.png"));
        assert_eq!(payload.image, payload.icon);
        assert_eq!(payload.thumbnail, payload.icon);
    }

    #[test]
    fn test_segment_and_sid_exclusive() {
        let base = NotificationPayload::assemble(
            &Frontmatter::default(),
            "T",
            "https://example.org/".to_string(),
            None,
        );
        let seg = base.for_segment("vip");
        assert_eq!(seg.segment.as_deref(), Some("vip"));
        assert_eq!(seg.sid, None);

        let sub = seg.for_subscriber("42");
        assert_eq!(sub.sid.as_deref(), Some("42"));
        assert_eq!(sub.segment, None);
    }

    #[test]
    fn test_notification_gate_is_opt_out() {
        assert!(send_gate(Category::Notification, &Frontmatter::default()).is_ok());
        assert!(send_gate(Category::Notification, &frontmatter("send_now: true\n")).is_ok());
        assert_eq!(
            send_gate(Category::Notification, &frontmatter("send_now: false\n")),
            Err(SkipReason::OptedOut)
        );
    }

    #[test]
    fn test_content_gate_is_opt_in() {
        for category in [Category::News, Category::Places] {
            assert_eq!(
                send_gate(category, &Frontmatter::default()),
                Err(SkipReason::NotOptedIn)
            );
            assert!(send_gate(category, &frontmatter("send_notification: true\n")).is_ok());
            assert!(send_gate(category, &frontmatter("send_now: yes\n")).is_ok());
            assert_eq!(
                send_gate(
                    category,
                    &frontmatter("send_notification: false\nsend_now: true\n")
                ),
                Err(SkipReason::OptedOut)
            );
        }
    }

    #[test]
    fn test_other_never_sends() {
        assert_eq!(
            send_gate(Category::Other, &frontmatter("send_now: true\n")),
            Err(SkipReason::UnwatchedCategory)
        );
    }
}
