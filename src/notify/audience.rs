//! Audience targeting.

use serde::Serialize;

use crate::content::Frontmatter;

use super::client::Endpoint;
use super::payload::NotificationPayload;
use super::SkipReason;

/// Who receives a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "target", rename_all = "lowercase")]
pub enum Audience {
    All,
    Segment(String),
    Specific(Vec<String>),
}

impl Audience {
    /// Read `audience` (default `all`) and its companion fields.
    ///
    /// A segment without a tag is skipped rather than widened to a
    /// broadcast.
    pub fn from_frontmatter(frontmatter: &Frontmatter) -> Result<Self, SkipReason> {
        let mode = frontmatter
            .audience
            .as_deref()
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "all".to_string());

        match mode.as_str() {
            "all" => Ok(Audience::All),
            "segment" => frontmatter
                .segment_name()
                .map(|tag| Audience::Segment(tag.to_string()))
                .ok_or(SkipReason::MissingSegmentTag),
            "specific" => {
                if frontmatter.specific_subscribers.is_empty() {
                    Err(SkipReason::NoSubscribers)
                } else {
                    Ok(Audience::Specific(frontmatter.specific_subscribers.clone()))
                }
            }
            _ => Err(SkipReason::UnknownAudience(mode)),
        }
    }

    /// One request per call the audience needs, in send order.
    pub fn fan_out(&self, payload: &NotificationPayload) -> Vec<(Endpoint, NotificationPayload)> {
        match self {
            Audience::All => vec![(Endpoint::All, payload.clone())],
            Audience::Segment(tag) => vec![(Endpoint::Segment, payload.for_segment(tag))],
            Audience::Specific(ids) => ids
                .iter()
                .map(|sid| (Endpoint::Subscriber, payload.for_subscriber(sid)))
                .collect(),
        }
    }
}
