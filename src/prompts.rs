//! Prompts for page translation and screenshot OCR.
//!
//! Centralising every prompt here keeps the wording in one place and lets
//! unit tests inspect the composed text without calling a model.
//!
//! Callers override the defaults via
//! [`crate::config::TranslationConfig::prompt_template`] and
//! [`crate::config::TranslationConfig::ocr_prompt`].

/// Default translation instruction, used when no template file is supplied.
pub const DEFAULT_TRANSLATION_PROMPT: &str = r#"You are a professional literary translator. Translate the book page below into English.

Follow these rules precisely:

1. FIDELITY
   - Translate ALL of the text; do not summarise or omit passages
   - Preserve paragraph breaks, dialogue and list structure

2. CONTINUITY
   - If an example of the previous translation is given, keep names,
     terminology, tone and register consistent with it
   - A sentence may start on the previous page; continue it naturally

3. OUTPUT FORMAT
   - Output ONLY the translated text
   - Do NOT add commentary, notes or explanations
   - Do NOT wrap the output in code fences"#;

/// Default OCR instruction sent with each captured page image.
pub const DEFAULT_OCR_PROMPT: &str = "Extract all text from this book page image. \
Preserve the original formatting and structure. Output only the text that appears on the page; \
if the page contains no readable text, output nothing.";

const HISTORY_HEADING: &str = "### EXAMPLE OF PREVIOUS TRANSLATION";
const TEXT_HEADING: &str = "### TEXT TO BE TRANSLATED";

/// Build the full prompt for one page.
///
/// Layout, in order:
/// 1. the template, verbatim
/// 2. *(only when both priors are non-blank)* the previous page as a worked
///    example: original text, then its reference translation
/// 3. the page text under a delimited heading, verbatim and untruncated
///
/// The function is pure: identical inputs give byte-identical output.
pub fn compose_prompt(
    template: &str,
    page_text: &str,
    prior_source: &str,
    prior_translation: &str,
) -> String {
    let mut prompt = String::with_capacity(
        template.len() + page_text.len() + prior_source.len() + prior_translation.len() + 160,
    );

    prompt.push_str(template.trim_end());
    prompt.push_str("\n\n");

    if !prior_source.trim().is_empty() && !prior_translation.trim().is_empty() {
        prompt.push_str(HISTORY_HEADING);
        prompt.push_str("\n\n#### Original Text:\n");
        prompt.push_str(prior_source);
        prompt.push_str("\n\n#### Reference Translation:\n");
        prompt.push_str(prior_translation);
        prompt.push_str("\n---\n\n");
    }

    prompt.push_str(TEXT_HEADING);
    prompt.push('\n');
    prompt.push_str(page_text);
    prompt
}

/// Whether a composed prompt carries a previous-translation example.
pub fn has_history_block(prompt: &str) -> bool {
    prompt.contains(HISTORY_HEADING)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_is_deterministic() {
        let a = compose_prompt("Translate.", "pagina due", "pagina uno", "page one");
        let b = compose_prompt("Translate.", "pagina due", "pagina uno", "page one");
        assert_eq!(a, b);
    }

    #[test]
    fn history_block_precedes_text() {
        let p = compose_prompt("Translate.", "pagina due", "pagina uno", "page one");
        let hist = p.find(HISTORY_HEADING).expect("history block present");
        let text = p.find(TEXT_HEADING).expect("text block present");
        assert!(p.starts_with("Translate."));
        assert!(hist < text);
        assert!(p.contains("#### Original Text:\npagina uno"));
        assert!(p.contains("#### Reference Translation:\npage one"));
        assert!(p.ends_with("### TEXT TO BE TRANSLATED\npagina due"));
    }

    #[test]
    fn no_history_block_when_either_prior_is_empty() {
        for (src, tr) in [("", ""), ("pagina uno", ""), ("", "page one"), ("  ", "page one")] {
            let p = compose_prompt("Translate.", "testo", src, tr);
            assert!(!has_history_block(&p), "unexpected history for ({src:?}, {tr:?})");
            assert!(!p.contains("Reference Translation"));
        }
    }

    #[test]
    fn page_text_is_not_truncated() {
        let long = "parola ".repeat(20_000);
        let p = compose_prompt(DEFAULT_TRANSLATION_PROMPT, &long, "", "");
        assert!(p.ends_with(&long));
    }
}
