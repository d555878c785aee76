//! Mirrored session data: users, sessions, ideas and their ratings.
//!
//! Field names follow the server's camelCase JSON. Collections the server may
//! encode as `null` (empty Go slices and maps) deserialize as empty.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};

/// Lowest score on each rating axis.
pub const MIN_SCORE: u8 = 1;
/// Highest score on each rating axis.
pub const MAX_SCORE: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
}

/// The three scores (and optional comment) a participant gives an idea.
///
/// This is the outbound shape; the server echoes it back inside an
/// [`IdeaRating`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingScores {
    pub novelty: u8,
    pub feasibility: u8,
    pub usefulness: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl RatingScores {
    pub fn new(novelty: u8, feasibility: u8, usefulness: u8) -> Self {
        Self {
            novelty,
            feasibility,
            usefulness,
            comment: None,
        }
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// True when every axis is within `MIN_SCORE..=MAX_SCORE`.
    pub fn in_range(&self) -> bool {
        [self.novelty, self.feasibility, self.usefulness]
            .iter()
            .all(|s| (MIN_SCORE..=MAX_SCORE).contains(s))
    }
}

/// One rating attached to an idea. Several per user are possible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaRating {
    #[serde(rename = "userId", default)]
    pub user_id: String,
    pub novelty: u8,
    pub feasibility: u8,
    pub usefulness: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl IdeaRating {
    pub fn from_scores(user_id: impl Into<String>, scores: RatingScores) -> Self {
        Self {
            user_id: user_id.into(),
            novelty: scores.novelty,
            feasibility: scores.feasibility,
            usefulness: scores.usefulness,
            comment: scores.comment,
        }
    }
}

/// Mean score per axis over an idea's ratings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingAverages {
    pub novelty: f64,
    pub feasibility: f64,
    pub usefulness: f64,
    pub count: usize,
}

/// Rendering category of an idea, derived from its `mediaType` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Text,
    Image,
    Video,
    Audio,
    Other,
}

impl MediaKind {
    pub fn from_media_type(media_type: &str) -> Self {
        let major = media_type.split('/').next().unwrap_or("");
        match major {
            "" | "text" => MediaKind::Text,
            "image" => MediaKind::Image,
            "video" => MediaKind::Video,
            "audio" => MediaKind::Audio,
            _ => MediaKind::Other,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MediaKind::Text => "text",
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Other => "other",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idea {
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "mediaType", default = "default_media_type")]
    pub media_type: String,
    #[serde(rename = "mediaURL", default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(rename = "submittedBy", default)]
    pub submitted_by: User,
    /// Append-only for the lifetime of the session.
    #[serde(default, deserialize_with = "null_as_default")]
    pub ratings: Vec<IdeaRating>,
}

impl Idea {
    pub fn media_kind(&self) -> MediaKind {
        MediaKind::from_media_type(&self.media_type)
    }

    /// Arithmetic mean of each axis, or `None` before the first rating.
    pub fn rating_averages(&self) -> Option<RatingAverages> {
        if self.ratings.is_empty() {
            return None;
        }
        let n = self.ratings.len() as f64;
        let sum = |f: fn(&IdeaRating) -> u8| {
            self.ratings.iter().map(|r| f64::from(f(r))).sum::<f64>() / n
        };
        Some(RatingAverages {
            novelty: sum(|r| r.novelty),
            feasibility: sum(|r| r.feasibility),
            usefulness: sum(|r| r.usefulness),
            count: self.ratings.len(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "guidingQuestions", default, deserialize_with = "null_as_default")]
    pub guiding_questions: Vec<String>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub creator: User,
    #[serde(default, deserialize_with = "null_as_default")]
    pub users: HashMap<String, User>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ideas: Vec<Idea>,
}

impl Session {
    pub fn idea(&self, idea_id: &str) -> Option<&Idea> {
        self.ideas.iter().find(|i| i.id == idea_id)
    }

    pub fn idea_mut(&mut self, idea_id: &str) -> Option<&mut Idea> {
        self.ideas.iter_mut().find(|i| i.id == idea_id)
    }

    /// Member usernames sorted for stable display.
    pub fn member_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.users.values().map(|u| u.username.as_str()).collect();
        names.sort_unstable();
        names
    }
}

fn default_media_type() -> String {
    "text".to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
