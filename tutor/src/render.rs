use crate::models::*;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    Rtl,
    Ltr,
}

impl From<Language> for TextDirection {
    fn from(language: Language) -> Self {
        match language {
            Language::Ar => TextDirection::Rtl,
            Language::En => TextDirection::Ltr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedQuestion {
    pub id: String,
    pub number: usize,
    pub question_text: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub content: LocalizedContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedAnalysis {
    pub language: Language,
    pub direction: TextDirection,
    pub summary: String,
    pub questions: Vec<RenderedQuestion>,
    pub categories: Vec<CategoryCount>,
}

/// One entry per question, in model order, with the content for `language`.
pub fn render_analysis(analysis: &AnalysisResult, language: Language) -> RenderedAnalysis {
    let questions = analysis
        .questions
        .iter()
        .enumerate()
        .map(|(idx, q)| RenderedQuestion {
            id: q.id.clone(),
            number: idx + 1,
            question_text: q.question_text.clone(),
            category: q.category.clone(),
            difficulty: q.difficulty,
            content: q.localized(language).clone(),
        })
        .collect();

    RenderedAnalysis {
        language,
        direction: language.into(),
        summary: analysis.summary(language).to_string(),
        questions,
        categories: category_breakdown(&analysis.questions),
    }
}

/// Question count per category, in the order categories first appear.
pub fn category_breakdown(questions: &[QuestionAnalysis]) -> Vec<CategoryCount> {
    let mut counts: Vec<CategoryCount> = Vec::new();
    for question in questions {
        match counts.iter_mut().find(|c| c.category == question.category) {
            Some(entry) => entry.count += 1,
            None => counts.push(CategoryCount {
                category: question.category.clone(),
                count: 1,
            }),
        }
    }
    counts
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum MathSegment {
    Text(String),
    Inline(String),
    Display(String),
}

fn display_math() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\$\$(.*?)\$\$").expect("display math pattern"))
}

fn inline_math() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$([^$]+?)\$").expect("inline math pattern"))
}

/// Splits text on `$$…$$` and then `$…$`. Unpaired delimiters stay in the
/// surrounding text; this never fails.
pub fn segment_math(text: &str) -> Vec<MathSegment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in display_math().captures_iter(text) {
        let (Some(whole), Some(formula)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push_inline_segments(&text[last..whole.start()], &mut segments);
        segments.push(MathSegment::Display(formula.as_str().trim().to_string()));
        last = whole.end();
    }
    push_inline_segments(&text[last..], &mut segments);

    segments
}

fn push_inline_segments(text: &str, segments: &mut Vec<MathSegment>) {
    let mut last = 0;

    for caps in inline_math().captures_iter(text) {
        let (Some(whole), Some(formula)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            segments.push(MathSegment::Text(text[last..whole.start()].to_string()));
        }
        segments.push(MathSegment::Inline(formula.as_str().trim().to_string()));
        last = whole.end();
    }

    if last < text.len() {
        segments.push(MathSegment::Text(text[last..].to_string()));
    }
}
