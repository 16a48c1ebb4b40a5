use serde::{Deserialize, Serialize};

// =============================================================================
// Chat Completion
// =============================================================================

/// Every request is a single user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    User,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl WireMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

// =============================================================================
// Chat Request
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            max_tokens: None,
            max_completion_tokens: None,
        }
    }

    pub fn message(mut self, message: WireMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Reasoning models reject `max_tokens`; route the limit to the field they accept.
    pub fn token_limit(mut self, limit: u32) -> Self {
        if uses_max_completion_tokens(&self.model) {
            self.max_completion_tokens = Some(limit);
        } else {
            self.max_tokens = Some(limit);
        }
        self
    }
}

// =============================================================================
// Chat Response
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChoiceMessage {
    pub content: Option<String>,
}

impl ChatResponse {
    pub fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
    }
}

pub(crate) fn uses_max_completion_tokens(model: &str) -> bool {
    model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("gpt-5")
        || model.contains("-o1")
        || model.contains("-o3")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasoning_models_use_max_completion_tokens() {
        let request = ChatRequest::new("o3-mini").token_limit(2000);
        assert_eq!(request.max_completion_tokens, Some(2000));
        assert_eq!(request.max_tokens, None);

        let request = ChatRequest::new("llama-3.3-70b-versatile").token_limit(2000);
        assert_eq!(request.max_tokens, Some(2000));
        assert_eq!(request.max_completion_tokens, None);
    }

    #[test]
    fn request_is_one_user_turn() {
        let request = ChatRequest::new("gpt-4o-mini")
            .message(WireMessage::user("hi"))
            .token_limit(500);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "hi");
        assert_eq!(value["max_tokens"], 500);
        assert!(value.get("max_completion_tokens").is_none());
    }

    #[test]
    fn blank_content_is_not_text() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"   "}}]}"#).unwrap();
        assert!(response.into_text().is_none());
    }

    #[test]
    fn missing_choices_is_not_text() {
        let response: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(response.into_text().is_none());
    }
}
