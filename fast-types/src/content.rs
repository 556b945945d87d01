//! Static fasting content served by the store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scripture passage reference, e.g. Isaiah 58:6-9.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerseReference {
    /// Book name.
    pub book: String,
    /// Chapter number.
    pub chapter: u32,
    /// First verse of the passage.
    pub verse_start: u32,
    /// Last verse of the passage (equal to `verse_start` for a single verse).
    pub verse_end: u32,
}

impl VerseReference {
    /// Create a reference spanning `verse_start..=verse_end`.
    pub fn new(book: &str, chapter: u32, verse_start: u32, verse_end: u32) -> Self {
        Self {
            book: book.to_string(),
            chapter,
            verse_start,
            verse_end: verse_end.max(verse_start),
        }
    }
}

impl fmt::Display for VerseReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.verse_end > self.verse_start {
            write!(
                f,
                "{} {}:{}-{}",
                self.book, self.chapter, self.verse_start, self.verse_end
            )
        } else {
            write!(f, "{} {}:{}", self.book, self.chapter, self.verse_start)
        }
    }
}

/// Descriptive and encouragement text for the fasting page.
///
/// Read-only; clients may cache it for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FastingContent {
    /// Teaching text on biblical fasting.
    pub description: String,
    /// Prompt shown above the reflection journal.
    pub reflection_prompt: String,
    /// Message shown once a fast is completed.
    pub completion_encouragement: String,
    /// One message per elapsed hour; the last one repeats past the end.
    pub hourly_encouragement: Vec<String>,
    /// Passages referenced by the description.
    pub scripture_references: Vec<VerseReference>,
}

impl FastingContent {
    /// The encouragement for `index`, if the list is non-empty and in range.
    pub fn encouragement(&self, index: usize) -> Option<&str> {
        self.hourly_encouragement.get(index).map(String::as_str)
    }

    /// Content shipped with the app, used when no override is configured.
    pub fn builtin() -> Self {
        Self {
            description: "Biblical fasting is setting aside food for a season to seek God with \
                an undivided heart. Jesus assumed his followers would fast and taught them to do \
                it quietly, before the Father who sees in secret (Matthew 6:16-18). The fast God \
                chooses loosens the chains of injustice and shares bread with the hungry \
                (Isaiah 58:6-9). Return to the Lord with all your heart, with fasting and \
                weeping and mourning (Joel 2:12)."
                .to_string(),
            reflection_prompt: "What did the Lord show you during this fast? Write down what \
                you heard, what you surrendered and what you are carrying forward."
                .to_string(),
            completion_encouragement: "Well done. You have finished your fast. Break it gently, \
                give thanks, and keep listening for what God spoke in the quiet."
                .to_string(),
            hourly_encouragement: vec![
                "You have begun. Offer this time to God and ask Him to meet you here.".to_string(),
                "Hunger is a reminder to pray. Turn each pang into a short prayer.".to_string(),
                "Man shall not live by bread alone. Open the Word and feed on it.".to_string(),
                "You are not striving for favor. You are making room for His presence."
                    .to_string(),
                "Stay hydrated and stay honest. Bring Him what is really on your heart."
                    .to_string(),
                "Keep going. The Father who sees in secret is with you in every hour."
                    .to_string(),
            ],
            scripture_references: vec![
                VerseReference::new("Matthew", 6, 16, 18),
                VerseReference::new("Isaiah", 58, 6, 9),
                VerseReference::new("Joel", 2, 12, 12),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verse_range_display() {
        let verse = VerseReference::new("Matthew", 6, 16, 18);
        assert_eq!(verse.to_string(), "Matthew 6:16-18");
    }

    #[test]
    fn single_verse_display() {
        let verse = VerseReference::new("Joel", 2, 12, 12);
        assert_eq!(verse.to_string(), "Joel 2:12");
    }

    #[test]
    fn builtin_content_has_six_hourly_messages() {
        let content = FastingContent::builtin();
        assert_eq!(content.hourly_encouragement.len(), 6);
        assert_eq!(content.scripture_references.len(), 3);
        assert!(content.encouragement(5).is_some());
        assert!(content.encouragement(6).is_none());
    }

    #[test]
    fn verse_end_never_before_start() {
        let verse = VerseReference::new("Isaiah", 58, 9, 6);
        assert_eq!(verse.verse_end, 9);
    }
}
