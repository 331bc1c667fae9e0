use platelens_core::AnalysisMode;
use tracing::debug;

use crate::prompts::{
    CHAIN_OF_THOUGHT_PROMPT, DIETARY_KEYWORDS, KNOWN_RESTAURANTS, MEAL_TYPE_KEYWORDS,
    QUICK_STRICT_PROMPT, SINGLE_SHOT_PROMPT,
};

/// Produce the exact instruction text for one analysis. A non-blank hint is
/// scanned against the keyword tables; every rule that fires prepends one
/// derived guidance sentence, and the base template follows unchanged. A hint
/// matching no rule passes through verbatim as a labeled note.
pub fn build_prompt(mode: AnalysisMode, user_hint: Option<&str>) -> String {
    let template = match mode {
        AnalysisMode::QuickStrict => QUICK_STRICT_PROMPT,
        AnalysisMode::SingleShotReasoned => SINGLE_SHOT_PROMPT,
        AnalysisMode::ChainOfThought => CHAIN_OF_THOUGHT_PROMPT,
    };

    let hint = user_hint.map(str::trim).filter(|h| !h.is_empty());
    let Some(hint) = hint else {
        return template.to_string();
    };

    let lowered = hint.to_lowercase();
    let mut guidance: Vec<String> = Vec::new();

    for name in KNOWN_RESTAURANTS {
        if lowered.contains(name) {
            guidance.push(format!(
                "This meal is from {name}; prefer item names from that restaurant's menu."
            ));
        }
    }

    for keyword in MEAL_TYPE_KEYWORDS {
        if lowered.contains(keyword) {
            guidance.push(format!(
                "The user describes this as a {keyword} meal; weight typical {keyword} foods accordingly."
            ));
        }
    }

    for keyword in DIETARY_KEYWORDS {
        if lowered.contains(keyword) {
            guidance.push(format!(
                "The user follows a {keyword} diet; do not identify foods that conflict with it."
            ));
        }
    }

    if guidance.is_empty() {
        guidance.push(format!("User note about this meal: {hint}"));
    } else {
        debug!("PROMPT: {} hint rule(s) fired", guidance.len());
    }

    let mut prompt = guidance.join(" ");
    prompt.push_str("\n\n");
    prompt.push_str(template);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_hint_returns_bare_template() {
        assert_eq!(
            build_prompt(AnalysisMode::QuickStrict, None),
            QUICK_STRICT_PROMPT
        );
        assert_eq!(
            build_prompt(AnalysisMode::SingleShotReasoned, Some("   ")),
            SINGLE_SHOT_PROMPT
        );
    }

    #[test]
    fn each_mode_selects_its_own_template() {
        assert!(build_prompt(AnalysisMode::QuickStrict, None).contains("empty array"));
        assert!(build_prompt(AnalysisMode::ChainOfThought, None).contains("visual evidence"));
        assert_ne!(
            build_prompt(AnalysisMode::SingleShotReasoned, None),
            build_prompt(AnalysisMode::ChainOfThought, None)
        );
    }

    #[test]
    fn restaurant_hint_prepends_menu_guidance() {
        let prompt = build_prompt(AnalysisMode::QuickStrict, Some("lunch at Chipotle"));
        assert!(prompt.starts_with("This meal is from chipotle"));
        assert!(prompt.ends_with(QUICK_STRICT_PROMPT));
    }

    #[test]
    fn multiple_rules_concatenate_in_table_order() {
        let prompt = build_prompt(
            AnalysisMode::SingleShotReasoned,
            Some("vegan dinner from Subway"),
        );

        let subway = prompt.find("This meal is from subway").unwrap();
        let dinner = prompt.find("dinner meal").unwrap();
        let vegan = prompt.find("vegan diet").unwrap();
        assert!(subway < dinner && dinner < vegan);
        assert!(prompt.ends_with(SINGLE_SHOT_PROMPT));
    }

    #[test]
    fn unrecognized_hint_passes_through_verbatim() {
        let prompt = build_prompt(
            AnalysisMode::SingleShotReasoned,
            Some("homemade grandma recipe"),
        );
        assert!(prompt.starts_with("User note about this meal: homemade grandma recipe"));
        assert!(prompt.ends_with(SINGLE_SHOT_PROMPT));
    }

    #[test]
    fn template_text_is_never_modified_by_hints() {
        let prompt = build_prompt(AnalysisMode::ChainOfThought, Some("keto breakfast"));
        let tail = &prompt[prompt.len() - CHAIN_OF_THOUGHT_PROMPT.len()..];
        assert_eq!(tail, CHAIN_OF_THOUGHT_PROMPT);
    }
}
