use unicode_normalization::UnicodeNormalization;

use crate::error::{CoreResult, GenStreamError};
use crate::model::{ChatbotRequest, PromptRequest};

const MAX_TOKENS_CAP: u32 = 100_000;

fn clean_text(s: &str) -> String {
    // Unicode NFC normalization + BOM strip + CRLF -> LF + trim
    let mut t = s.nfc().collect::<String>();
    if t.starts_with('\u{FEFF}') {
        t.remove(0);
    }
    if t.contains("\r\n") {
        t = t.replace("\r\n", "\n");
    }
    t.trim().to_string()
}

/// Clean a prompt request before it goes on the wire. The backend rejects
/// empty prompts with a 400; catching it here saves the round trip.
pub fn normalize_prompt(mut req: PromptRequest) -> CoreResult<PromptRequest> {
    req.model = clean_text(&req.model);
    req.prompt = clean_text(&req.prompt);
    if req.model.is_empty() {
        return Err(GenStreamError::Validation(
            "model name must not be empty".into(),
        ));
    }
    if req.prompt.is_empty() {
        return Err(GenStreamError::Validation("prompt must not be empty".into()));
    }
    if let Some(max) = req.max_tokens
        && max > MAX_TOKENS_CAP
    {
        req.max_tokens = Some(MAX_TOKENS_CAP);
    }
    Ok(req)
}

pub fn normalize_question(mut req: ChatbotRequest) -> CoreResult<ChatbotRequest> {
    req.question = clean_text(&req.question);
    if req.question.is_empty() {
        return Err(GenStreamError::Validation(
            "question must not be empty".into(),
        ));
    }
    Ok(req)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_prompt(model: &str, prompt: &str) -> PromptRequest {
        PromptRequest {
            model: model.into(),
            prompt: prompt.into(),
            max_tokens: None,
        }
    }

    #[test]
    fn trims_prompt_and_model() {
        let out = normalize_prompt(mk_prompt("  granite4:tiny-h ", "  Hello world   ")).unwrap();
        assert_eq!(out.model, "granite4:tiny-h");
        assert_eq!(out.prompt, "Hello world");
    }

    #[test]
    fn empty_prompt_is_rejected() {
        let err = normalize_prompt(mk_prompt("m", "   ")).unwrap_err();
        match err {
            GenStreamError::Validation(msg) => assert!(msg.contains("prompt")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn empty_model_is_rejected() {
        let err = normalize_prompt(mk_prompt("", "hi")).unwrap_err();
        assert!(matches!(err, GenStreamError::Validation(_)));
    }

    #[test]
    fn caps_max_tokens() {
        let mut req = mk_prompt("m", "go");
        req.max_tokens = Some(200_000);
        let out = normalize_prompt(req).unwrap();
        assert_eq!(out.max_tokens, Some(MAX_TOKENS_CAP));
    }

    #[test]
    fn unicode_nfc_and_crlf_normalization() {
        // "e" + combining acute accent should normalize to "é"
        let out = normalize_prompt(mk_prompt("m", "e\u{301}")).unwrap();
        assert_eq!(out.prompt, "é");

        let out2 = normalize_prompt(mk_prompt("m", "line1\r\nline2")).unwrap();
        assert_eq!(out2.prompt, "line1\nline2");
    }

    #[test]
    fn bom_is_stripped() {
        let out = normalize_question(ChatbotRequest {
            question: "\u{FEFF}what is this app?".into(),
        })
        .unwrap();
        assert_eq!(out.question, "what is this app?");
    }

    #[test]
    fn empty_question_is_rejected() {
        let err = normalize_question(ChatbotRequest {
            question: " \n ".into(),
        })
        .unwrap_err();
        assert!(matches!(err, GenStreamError::Validation(_)));
    }
}
