//! Prompt rendering and structured-reply parsing for model-assisted stages.

use crate::config::LlmSettings;
use crate::llm_client::{Generation, GenerationRequest, LanguageModel, LlmError, LlmErrorKind};
use crate::retry::RetryPolicy;
use serde::de::DeserializeOwned;
use std::time::Duration;
use strictly_tictactoe::GameState;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Stand-in deadline for budgets too large to represent, about 30 years out.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `start + budget`, clamped to a far-future instant instead of overflowing.
pub(crate) fn deadline_after(start: Instant, budget: Duration) -> Instant {
    start
        .checked_add(budget)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

/// Board, turn and move count, as shown to the model.
pub(crate) fn describe_state(state: &GameState) -> String {
    format!(
        "Board (empty cells show their row,col):\n{}\nYou play {}. Moves so far: {}.",
        state.board().display(),
        state.current_turn(),
        state.move_count()
    )
}

/// Extracts the first `{ ... }` object from model text and parses it.
///
/// Code fences and surrounding prose are ignored. Braces inside JSON strings
/// are respected.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let object = first_object(text).ok_or_else(|| {
        LlmError::new(
            LlmErrorKind::InvalidOutput,
            "No JSON object in model reply".to_string(),
        )
    })?;
    serde_json::from_str(object).map_err(|e| {
        LlmError::new(
            LlmErrorKind::InvalidOutput,
            format!("Model reply did not match the expected shape: {}", e),
        )
    })
}

fn first_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Sends one prompt with retries and parses the structured reply.
///
/// Unparseable replies count as retryable failures.
#[instrument(skip_all, fields(model = %settings.model()))]
pub(crate) async fn ask<T: DeserializeOwned>(
    model: &dyn LanguageModel,
    settings: &LlmSettings,
    retry: RetryPolicy,
    deadline: Instant,
    system_prompt: &str,
    prompt: String,
) -> Result<(T, Generation), LlmError> {
    let request = GenerationRequest::new(
        system_prompt,
        prompt,
        settings.model().as_str(),
        *settings.max_tokens(),
        *settings.temperature(),
    );
    let request = &request;
    retry
        .run(deadline, move |attempt| async move {
            debug!(attempt, "Asking model");
            let generation = model.generate(request).await?;
            let parsed = extract_json(generation.text())?;
            Ok((parsed, generation))
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pick {
        row: u8,
        col: u8,
    }

    #[test]
    fn test_extracts_from_code_fence() {
        let text = "Sure!\n```json\n{\"row\": 1, \"col\": 2}\n```\nGood luck.";
        let pick: Pick = extract_json(text).unwrap();
        assert_eq!(pick, Pick { row: 1, col: 2 });
    }

    #[test]
    fn test_braces_inside_strings() {
        let text = r#"{"row": 0, "col": 0, "note": "a } brace"} trailing {"row": 9}"#;
        let pick: Pick = extract_json(text).unwrap();
        assert_eq!(pick, Pick { row: 0, col: 0 });
    }

    #[test]
    fn test_huge_budget_clamps_deadline() {
        let start = Instant::now();
        assert_eq!(deadline_after(start, Duration::from_millis(5)), start + Duration::from_millis(5));
        assert_eq!(deadline_after(start, Duration::MAX), start + FAR_FUTURE);
    }

    #[test]
    fn test_missing_object_is_invalid_output() {
        let err = extract_json::<Pick>("I would play the center.").unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::InvalidOutput);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_wrong_shape_is_invalid_output() {
        let err = extract_json::<Pick>(r#"{"position": "center"}"#).unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::InvalidOutput);
    }
}
