use serde::{Deserialize, Serialize};

/// Body of `POST {base}/models/prompt/`. Wire field names follow the
/// backend's schema (`model_name`, `prompt_text`), not the client-side ones.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    #[serde(rename = "model_name")]
    pub model: String,
    #[serde(rename = "prompt_text")]
    pub prompt: String,
    /// Backend defaults to 512 when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Body of `POST {base}/chatbot/ask`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatbotRequest {
    pub question: String,
}

/// One entry of `GET {base}/models/`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
}

/// Body of `POST {base}/models/load`. The backend takes `model_name` and
/// `adapter_name`; note the original web client sent `model`/`lora` here and
/// was silently ignored, so we follow the backend.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    #[serde(rename = "model_name")]
    pub model: String,
    #[serde(rename = "adapter_name", default, skip_serializing_if = "Option::is_none")]
    pub adapter: Option<String>,
}
