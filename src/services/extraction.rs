//! Information extraction backed by an OpenAI-compatible chat-completions API.

use crate::domain::ports::FieldExtractor;
use crate::utils::error::{LoanError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

const RESPONSE_SCHEMA: &str = r#"{"name": "John Doe",
    "customerId": "client-00X",
    "description": {
        "accommodationType": "apartment",
        "surfaceArea": "300m2",
        "address": {
            "town": "Paris",
            "postalCode": "75015",
            "completeAddress": "6e arrondissement de Paris"
        }
    },
    "contact": {
        "phone": "+33 5 67784890",
        "email": "johndoe@gmail.com"
    },
    "loanAmount": 12000,
    "monthlyIncome": 3700,
    "monthlyExpenses": 2400,
    "propertyPrice": 20000
}"#;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    finish_reason: Option<String>,
    message: ChatMessage,
}

/// Instruction sent to the model for one application letter.
pub fn extraction_prompt(letter: &str) -> String {
    format!(
        "I need to extract details regarding the tenant from this letter, \
including their name, customer ID, the description of the property they intend to purchase, \
address, monthly income and expenses, property price, etc. \
Here's the text: {letter}. The extracted result should be formatted as JSON. For the keys, \
please apply camelCase formatting. In the description, for instance, format as JSON with the accommodation type \
(e.g., home or apartment), the area size (e.g., 300m2), and address information such as town, postal code, \
and any additional relevant property details.\n\
Do not return any text with the result.\n\
Only return JSON containing these elements.\n\
Here's the schema you should follow for the response:\n{RESPONSE_SCHEMA}"
    )
}

/// Removes a surrounding markdown code fence (```json ... ```) if the model added one.
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening line.
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}

#[derive(Debug, Clone)]
pub struct ChatCompletionExtractor {
    client: Client,
    api_base: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl ChatCompletionExtractor {
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            model: model.into(),
            api_key: api_key.into(),
            timeout,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl FieldExtractor for ChatCompletionExtractor {
    async fn extract_fields(&self, letter: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: extraction_prompt(letter),
                },
            ],
        };

        let url = self.completions_url();
        tracing::debug!("🤖 Requesting extraction from {} ({})", url, self.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| LoanError::ExtractorError {
                message: format!("request to {} failed: {}", url, e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoanError::ExtractorError {
                message: format!("{} responded with HTTP {}", url, status),
            });
        }

        let body: ChatResponse = response.json().await.map_err(|e| LoanError::ExtractorError {
            message: format!("unreadable completion response: {}", e),
        })?;

        let choice = body.choices.into_iter().next().ok_or_else(|| LoanError::ExtractorError {
            message: "completion response has no choices".to_string(),
        })?;

        match choice.finish_reason.as_deref() {
            Some("stop") => Ok(strip_code_fence(&choice.message.content).to_string()),
            other => Err(LoanError::ExtractorError {
                message: format!("the completion finished with {:?}", other.unwrap_or("no reason")),
            }),
        }
    }
}

/// `extraire_information(demande)`: returns the extracted JSON text.
pub async fn extract_information(extractor: &dyn FieldExtractor, letter: &str) -> Result<String> {
    tracing::info!("🤖 Extracting information from a {} byte letter", letter.len());
    let fields = extractor.extract_fields(letter).await?;
    tracing::debug!("🤖 Extracted: {}", fields);
    Ok(fields)
}
