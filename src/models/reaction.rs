// src/models/reaction.rs

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Like or dislike. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Dislike => "dislike",
        }
    }
}

impl FromStr for ReactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(ReactionKind::Like),
            "dislike" => Ok(ReactionKind::Dislike),
            other => Err(format!("Invalid reaction type: {}", other)),
        }
    }
}

/// Which table a reaction lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Post,
    Comment,
}

/// A concrete reaction target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionTarget {
    Post(Uuid),
    Comment(Uuid),
}

impl ReactionTarget {
    pub fn kind(&self) -> TargetKind {
        match self {
            ReactionTarget::Post(_) => TargetKind::Post,
            ReactionTarget::Comment(_) => TargetKind::Comment,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ReactionTarget::Post(id) | ReactionTarget::Comment(id) => *id,
        }
    }
}

/// One row of `post_reactions` or `comment_reactions`.
/// At most one row exists per (target, user).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: Uuid,
    pub target_id: Uuid,
    pub user_id: Uuid,
    pub kind: ReactionKind,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// What a reaction request did to the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    Added,
    Updated,
    Removed,
}

impl ReactionAction {
    /// Clicking the same reaction again removes it; clicking the other one
    /// switches the existing row over.
    pub fn decide(existing: Option<ReactionKind>, requested: ReactionKind) -> Self {
        match existing {
            None => ReactionAction::Added,
            Some(kind) if kind == requested => ReactionAction::Removed,
            Some(_) => ReactionAction::Updated,
        }
    }
}

/// Aggregate counts plus the viewer's own state for one target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionSummary {
    pub like_count: i64,
    pub dislike_count: i64,
    pub liked_by_me: bool,
    pub disliked_by_me: bool,
}

/// Reactions grouped by target id and kind, with the viewer's liked and
/// disliked sets.
#[derive(Debug, Default)]
pub struct ReactionTally {
    likes: HashMap<Uuid, i64>,
    dislikes: HashMap<Uuid, i64>,
    liked_by_viewer: HashSet<Uuid>,
    disliked_by_viewer: HashSet<Uuid>,
}

impl ReactionTally {
    pub fn new(reactions: &[Reaction], viewer: Option<Uuid>) -> Self {
        let mut tally = Self::default();

        for reaction in reactions {
            let (counts, mine) = match reaction.kind {
                ReactionKind::Like => (&mut tally.likes, &mut tally.liked_by_viewer),
                ReactionKind::Dislike => (&mut tally.dislikes, &mut tally.disliked_by_viewer),
            };
            *counts.entry(reaction.target_id).or_insert(0) += 1;

            if viewer == Some(reaction.user_id) {
                mine.insert(reaction.target_id);
            }
        }

        tally
    }

    pub fn summary(&self, target_id: &Uuid) -> ReactionSummary {
        ReactionSummary {
            like_count: self.likes.get(target_id).copied().unwrap_or(0),
            dislike_count: self.dislikes.get(target_id).copied().unwrap_or(0),
            liked_by_me: self.liked_by_viewer.contains(target_id),
            disliked_by_me: self.disliked_by_viewer.contains(target_id),
        }
    }
}

/// Body of `POST .../reaction`.
#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Response body of `POST .../reaction` on a post or comment.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReactionResponse {
    pub action: ReactionAction,
    #[serde(rename = "type")]
    pub kind: ReactionKind,
    #[serde(flatten)]
    pub summary: ReactionSummary,
}
