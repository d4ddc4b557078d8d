//! Structured-output contracts handed to the model as `responseSchema`.

use serde_json::{json, Value};

pub fn localized_content_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "questionSummary": { "type": "STRING", "description": "A professional, bold title for the question." },
            "keyIndicator": { "type": "STRING", "description": "The mathematical or logical key to the solution." },
            "solutionSteps": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Detailed solution steps using Unicode math symbols."
            },
            "tips": { "type": "STRING", "description": "A tutor's tip for the student." },
            "practiceQuestion": {
                "type": "OBJECT",
                "properties": {
                    "question": { "type": "STRING" },
                    "answer": { "type": "STRING" },
                    "explanation": { "type": "STRING" }
                },
                "required": ["question", "answer", "explanation"]
            }
        },
        "required": ["questionSummary", "keyIndicator", "solutionSteps", "tips", "practiceQuestion"]
    })
}

pub fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "overallSummaryAr": { "type": "STRING" },
            "overallSummaryEn": { "type": "STRING" },
            "questions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "questionText": { "type": "STRING" },
                        "category": { "type": "STRING" },
                        "difficulty": { "type": "STRING", "enum": ["Easy", "Medium", "Hard", "Expert"] },
                        "ar": localized_content_schema(),
                        "en": localized_content_schema()
                    },
                    "required": ["questionText", "category", "difficulty", "ar", "en"]
                }
            }
        },
        "required": ["questions", "overallSummaryAr", "overallSummaryEn"]
    })
}

pub fn slide_deck_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "slides": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "bulletPoints": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "speakerNotes": { "type": "STRING" }
                    },
                    "required": ["title", "bulletPoints", "speakerNotes"]
                }
            }
        },
        "required": ["slides"]
    })
}
