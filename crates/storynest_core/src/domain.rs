//! crates/storynest_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Represents a registered user.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_picture_url: Option<String>,
    pub profile_picture_asset_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Only used internally for login/registration - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
}

/// The fixed set of genres a story can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Genre {
    Fantasy,
    ScienceFiction,
    Mystery,
    Thriller,
    Romance,
    Horror,
    Adventure,
    HistoricalFiction,
    Drama,
    Comedy,
    Action,
    Crime,
    Poetry,
    Western,
    Dystopian,
    Memoir,
    Biography,
    YoungAdult,
    Children,
    Other,
}

impl Genre {
    pub const ALL: [Genre; 20] = [
        Genre::Fantasy,
        Genre::ScienceFiction,
        Genre::Mystery,
        Genre::Thriller,
        Genre::Romance,
        Genre::Horror,
        Genre::Adventure,
        Genre::HistoricalFiction,
        Genre::Drama,
        Genre::Comedy,
        Genre::Action,
        Genre::Crime,
        Genre::Poetry,
        Genre::Western,
        Genre::Dystopian,
        Genre::Memoir,
        Genre::Biography,
        Genre::YoungAdult,
        Genre::Children,
        Genre::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fantasy => "Fantasy",
            Genre::ScienceFiction => "Science Fiction",
            Genre::Mystery => "Mystery",
            Genre::Thriller => "Thriller",
            Genre::Romance => "Romance",
            Genre::Horror => "Horror",
            Genre::Adventure => "Adventure",
            Genre::HistoricalFiction => "Historical Fiction",
            Genre::Drama => "Drama",
            Genre::Comedy => "Comedy",
            Genre::Action => "Action",
            Genre::Crime => "Crime",
            Genre::Poetry => "Poetry",
            Genre::Western => "Western",
            Genre::Dystopian => "Dystopian",
            Genre::Memoir => "Memoir",
            Genre::Biography => "Biography",
            Genre::YoungAdult => "Young Adult",
            Genre::Children => "Children",
            Genre::Other => "Other",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = ();

    /// Case-insensitive lookup against the fixed genre set.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Genre::ALL
            .iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or(())
    }
}

/// Publication state of a story. New stories default to `Published`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoryStatus {
    Draft,
    #[default]
    Published,
}

impl StoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryStatus::Draft => "draft",
            StoryStatus::Published => "published",
        }
    }
}

impl FromStr for StoryStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(StoryStatus::Draft),
            "published" => Ok(StoryStatus::Published),
            _ => Err(()),
        }
    }
}

/// Represents a published (or drafted) story.
///
/// The author reference is immutable after creation and `word_count` always
/// reflects the content at last save.
#[derive(Debug, Clone)]
pub struct Story {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub genre: Genre,
    pub author_id: Uuid,
    pub is_ai_generated: bool,
    pub status: StoryStatus,
    pub word_count: u64,
    pub image_url: Option<String>,
    pub image_asset_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A story joined with its author's username and like count, as returned
/// by list queries.
#[derive(Debug, Clone)]
pub struct StoryWithAuthor {
    pub story: Story,
    pub author_username: String,
    pub like_count: u64,
}

/// A single comment, with its author's username resolved.
#[derive(Debug, Clone)]
pub struct CommentWithAuthor {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// The fully-resolved view of one story: author username, like membership,
/// and the ordered comment list.
#[derive(Debug, Clone)]
pub struct StoryDetail {
    pub story: Story,
    pub author_username: String,
    pub like_user_ids: Vec<Uuid>,
    pub comments: Vec<CommentWithAuthor>,
}

/// Result of flipping a user's like on a story.
#[derive(Debug, Clone, Copy)]
pub struct LikeState {
    pub liked: bool,
    pub like_count: u64,
}

/// One page of results plus the totals the listing endpoints report.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub pages: u32,
}

/// The output of the generation pipeline. Never persisted directly; the
/// caller issues a separate create-story request.
#[derive(Debug, Clone)]
pub struct GeneratedStory {
    pub title: String,
    pub content: String,
    pub genre: Genre,
    pub is_ai_generated: bool,
}

/// Number of whitespace-delimited tokens in `content`.
///
/// This is the single definition of "word count" used everywhere a story is
/// created or its content updated.
pub fn word_count(content: &str) -> u64 {
    content.split_whitespace().count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_count_ignores_surrounding_and_repeated_whitespace() {
        assert_eq!(word_count("one two three"), 3);
        assert_eq!(word_count("  one\t two \n three  "), 3);
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("   "), 0);
    }

    #[test]
    fn genre_round_trips_through_display() {
        for genre in Genre::ALL {
            assert_eq!(genre.as_str().parse::<Genre>(), Ok(genre));
        }
    }

    #[test]
    fn genre_parse_is_case_insensitive() {
        assert_eq!("science fiction".parse::<Genre>(), Ok(Genre::ScienceFiction));
        assert_eq!("HORROR".parse::<Genre>(), Ok(Genre::Horror));
        assert!("Telenovela".parse::<Genre>().is_err());
    }

    #[test]
    fn story_status_defaults_to_published() {
        assert_eq!(StoryStatus::default(), StoryStatus::Published);
        assert_eq!("draft".parse::<StoryStatus>(), Ok(StoryStatus::Draft));
        assert!("archived".parse::<StoryStatus>().is_err());
    }
}
