//! crates/storynest_core/src/generation.rs
//!
//! The AI story-generation pipeline: three sequential completion calls
//! (narrative, title, genre classification) against a `TextCompletionService`.
//! Any step failing aborts the whole operation; no partial result is ever
//! returned. Persistence is the caller's separate, subsequent step.

use crate::domain::{GeneratedStory, Genre};
use crate::ports::{PortError, TextCompletionService};

const NARRATIVE_SYSTEM_INSTRUCTIONS: &str = "You are a creative fiction writer for a story-sharing community. \
Write an engaging, self-contained short story of 500 to 1000 words based on the user's prompt. \
Use vivid language, a clear arc, and a satisfying ending. \
Respond with ONLY the story text, no title, no preamble, no commentary.";

const TITLE_SYSTEM_INSTRUCTIONS: &str = "You are a title generation assistant. \
Generate a short, evocative title of at most 5 words for the given story. \
Respond with ONLY the title, no quotes, no explanation.";

const GENRE_SYSTEM_INSTRUCTIONS: &str = "You are a genre classification assistant. \
Classify the given story into exactly one of these genres: \
Fantasy, Science Fiction, Mystery, Thriller, Romance, Horror, Adventure, Historical Fiction, \
Drama, Comedy, Action, Crime, Poetry, Western, Dystopian, Memoir, Biography, Young Adult, \
Children, Other. Respond with ONLY the genre name.";

/// Why a generation request failed.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Prompt must not be empty")]
    EmptyPrompt,
    #[error(transparent)]
    Upstream(#[from] PortError),
}

/// Runs the three-step pipeline and assembles the result.
///
/// The calls are sequential: the title and classification steps both consume
/// the narrative produced by the first step.
pub async fn generate_story(
    completions: &dyn TextCompletionService,
    prompt: &str,
) -> Result<GeneratedStory, GenerationError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(GenerationError::EmptyPrompt);
    }

    let content = completions
        .complete(
            NARRATIVE_SYSTEM_INSTRUCTIONS,
            &format!("Write a story based on this prompt:\n\n{prompt}"),
            1500,
        )
        .await?
        .trim()
        .to_string();

    let title = completions
        .complete(
            TITLE_SYSTEM_INSTRUCTIONS,
            &format!("Generate a title for this story:\n\n{content}"),
            20,
        )
        .await?
        .trim()
        .trim_matches('"')
        .to_string();

    let genre_label = completions
        .complete(
            GENRE_SYSTEM_INSTRUCTIONS,
            &format!("Classify this story:\n\n{content}"),
            10,
        )
        .await?;

    // An off-list classifier answer falls back to Other rather than failing
    // the whole pipeline.
    let genre = genre_label.parse::<Genre>().unwrap_or(Genre::Other);

    Ok(GeneratedStory {
        title,
        content,
        genre,
        is_ai_generated: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PortResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted stub: returns canned responses in order, `Err` entries fail
    /// the corresponding call.
    struct ScriptedCompletions {
        responses: Mutex<Vec<PortResult<String>>>,
    }

    impl ScriptedCompletions {
        fn new(responses: Vec<PortResult<String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl TextCompletionService for ScriptedCompletions {
        async fn complete(&self, _system: &str, _user: &str, _max_tokens: u32) -> PortResult<String> {
            self.responses.lock().unwrap().remove(0)
        }
    }

    #[tokio::test]
    async fn three_well_formed_completions_produce_a_full_story() {
        let stub = ScriptedCompletions::new(vec![
            Ok("Once upon a midnight dreary, a lighthouse keeper found a door.".to_string()),
            Ok("\"The Keeper's Door\"".to_string()),
            Ok("Fantasy".to_string()),
        ]);

        let story = generate_story(&stub, "a lighthouse with a secret").await.unwrap();
        assert_eq!(story.title, "The Keeper's Door");
        assert!(!story.content.is_empty());
        assert_eq!(story.genre, Genre::Fantasy);
        assert!(story.is_ai_generated);
    }

    #[tokio::test]
    async fn title_step_failure_aborts_with_no_partial_result() {
        let stub = ScriptedCompletions::new(vec![
            Ok("A perfectly fine narrative.".to_string()),
            Err(PortError::Unexpected("no completion in response".to_string())),
            Ok("Drama".to_string()),
        ]);

        let err = generate_story(&stub, "anything").await.unwrap_err();
        assert!(matches!(err, GenerationError::Upstream(_)));
        // The third call never happened: the scripted genre answer is still queued.
        assert_eq!(stub.responses.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_before_any_call() {
        let stub = ScriptedCompletions::new(vec![]);
        let err = generate_story(&stub, "   ").await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyPrompt));
    }

    #[tokio::test]
    async fn unknown_genre_label_falls_back_to_other() {
        let stub = ScriptedCompletions::new(vec![
            Ok("Narrative.".to_string()),
            Ok("Title".to_string()),
            Ok("Cyber-Noir Fusion".to_string()),
        ]);

        let story = generate_story(&stub, "neon rain").await.unwrap();
        assert_eq!(story.genre, Genre::Other);
    }
}
