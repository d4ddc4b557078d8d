use crate::error::Result;
use crate::models::{AnalysisResult, Slide, SlideDeck};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Best-effort JSON decoding of model output. A surrounding Markdown code
/// fence is tolerated; anything else that is not valid JSON is an error.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    Ok(serde_json::from_str(strip_code_fence(text))?)
}

/// Decodes an analysis and gives every question a fresh unique id.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult> {
    let mut analysis: AnalysisResult = parse_json(text)?;
    for question in analysis.questions.iter_mut() {
        question.id = format!("q-{}", Uuid::new_v4());
    }
    log::info!("Parsed analysis with {} questions", analysis.questions.len());
    Ok(analysis)
}

pub fn parse_slides(text: &str) -> Result<Vec<Slide>> {
    let deck: SlideDeck = parse_json(text)?;
    Ok(deck.slides)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => {
            let body = body.trim();
            let unlabeled = body.trim_start_matches(|c: char| c.is_ascii_alphabetic());
            if unlabeled.starts_with('{') || unlabeled.starts_with('[') {
                unlabeled
            } else {
                body
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TutorError;
    use crate::models::Difficulty;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn analysis_json(question_count: usize) -> String {
        let localized = serde_json::json!({
            "questionSummary": "s",
            "keyIndicator": "k",
            "solutionSteps": ["one", "two"],
            "tips": "t",
            "practiceQuestion": {"question": "q", "answer": "a", "explanation": "e"}
        });
        let questions: Vec<_> = (0..question_count)
            .map(|i| {
                serde_json::json!({
                    "questionText": format!("Question {i}"),
                    "category": "Algebra",
                    "difficulty": "Medium",
                    "ar": localized,
                    "en": localized
                })
            })
            .collect();
        serde_json::json!({
            "overallSummaryAr": "ملخص",
            "overallSummaryEn": "Summary",
            "questions": questions
        })
        .to_string()
    }

    #[test]
    fn every_question_gets_a_unique_id() {
        let analysis = parse_analysis(&analysis_json(5)).unwrap();
        let ids: HashSet<_> = analysis.questions.iter().map(|q| q.id.clone()).collect();

        assert_eq!(analysis.questions.len(), 5);
        assert_eq!(ids.len(), 5);
        assert!(analysis.questions.iter().all(|q| q.id.starts_with("q-")));
        assert_eq!(analysis.questions[0].difficulty, Difficulty::Medium);
    }

    #[test]
    fn ids_differ_between_parses() {
        let first = parse_analysis(&analysis_json(1)).unwrap();
        let second = parse_analysis(&analysis_json(1)).unwrap();
        assert_ne!(first.questions[0].id, second.questions[0].id);
    }

    #[test]
    fn fenced_json_is_accepted() {
        let fenced = format!("```json\n{}\n```", analysis_json(2));
        assert_eq!(parse_analysis(&fenced).unwrap().questions.len(), 2);
    }

    #[test]
    fn single_line_fence_with_info_string_is_accepted() {
        let slides = parse_slides(r#"```json{"slides":[]}```"#).unwrap();
        assert!(slides.is_empty());

        let slides = parse_slides(r#"```{"slides":[{"title":"X","bulletPoints":[],"speakerNotes":""}]}```"#)
            .unwrap();
        assert_eq!(slides.len(), 1);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            parse_analysis("{\"questions\": ["),
            Err(TutorError::Parse(_))
        ));
        assert!(matches!(
            parse_slides("Here are your slides!"),
            Err(TutorError::Parse(_))
        ));
    }

    #[test]
    fn slide_deck_example_decodes() {
        let slides =
            parse_slides(r#"{"slides":[{"title":"X","bulletPoints":["a","b"],"speakerNotes":"n"}]}"#)
                .unwrap();
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].title, "X");
        assert_eq!(slides[0].bullet_points, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(slides[0].speaker_notes, "n");
    }
}
