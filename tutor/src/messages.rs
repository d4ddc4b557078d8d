//! User-facing session messages in both languages.

use crate::models::Language;

pub fn empty_submission(language: Language) -> String {
    match language {
        Language::Ar => "ارفع حاجة طيب يا حبيب الحاج!".to_string(),
        Language::En => "Please upload something first!".to_string(),
    }
}

pub fn analysis_failed(language: Language) -> String {
    match language {
        Language::Ar => "حصلت مشكلة في التحليل، جرب تاني يا حاج.".to_string(),
        Language::En => "Analysis failed, try again.".to_string(),
    }
}

pub fn analysis_greeting(language: Language, question_count: usize) -> String {
    match language {
        Language::Ar => format!(
            "خلصت يا حاج! حللتلك {} أسئلة بأسلوب الكتاب الجامعي. أي خدمة تانية؟",
            question_count
        ),
        Language::En => format!(
            "Done! I analyzed {} items. Ready for questions.",
            question_count
        ),
    }
}

/// What the transcript shows for an expand request (1-based number).
pub fn explain_request(language: Language, number: usize) -> String {
    match language {
        Language::Ar => format!("ممكن تشرح لي السؤال رقم {} بتفصيل أكتر؟", number),
        Language::En => format!("Can you explain Question {} in more detail?", number),
    }
}

pub fn chat_apology(language: Language) -> String {
    match language {
        Language::Ar => "معلش حصل مشكلة، جرب تاني.".to_string(),
        Language::En => "Sorry, an error occurred.".to_string(),
    }
}
