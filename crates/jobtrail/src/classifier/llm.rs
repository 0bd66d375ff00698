//! Classifier backed by an OpenAI-compatible chat completions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::heuristic::notes_seed;
use super::response::{into_result, parse_reply};
use super::{ClassificationError, ClassificationResult, Classifier};
use crate::config::LlmSettings;
use crate::email::RawMessage;
use crate::secrets::resolve_secret_optional;

const SYSTEM_PROMPT: &str = "You analyze emails and extract information about the reader's own \
job applications. You always and only respond with one valid JSON object.";

const EXTRACTION_PROMPT: &str = r#"Decide whether the email below is about one of the reader's own job applications.

It counts only if it is a confirmation, rejection, interview invitation or offer from a company about an application the reader made.
Job board mail (Handshake, LinkedIn and similar), job alerts, newsletters, career fair invitations, lists of postings and invitations to apply do NOT count, even when they mention jobs.

If it does not count, respond with exactly:
{"company_name": null, "job_position": null, "application_status": null, "email_content": null}

If it counts, respond with:
{"company_name": string, "job_position": string, "application_status": string, "email_content": string}

Rules:
- job_position is the job title only, without department, location or level.
- application_status is exactly one of "Applied", "Interview", "Offered", "Rejected".
- If the email is about completing an assessment, exam or coding test, application_status is "Applied".
- email_content is the body as plain text with one sentence per line, no indentation, no HTML and no emojis.
- Use "Unknown" for a company or position you cannot determine.
- Respond with the JSON object only, no Markdown and no explanation.

Subject: {subject}

Body:
{body}"#;

/// Escapes chat-template control sequences so message text cannot pose as
/// a role marker.
fn sanitize_for_prompt(text: &str) -> String {
    text.replace("<|", "< |")
        .replace("|>", "| >")
        .replace("[INST]", "[ INST ]")
        .replace("[/INST]", "[ / INST ]")
        .replace("<<SYS>>", "< < SYS > >")
        .replace("<</SYS>>", "< < / SYS > >")
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub struct LlmClassifier {
    client: Client,
    url: String,
    model: String,
    api_key: Option<SecretString>,
    max_body_chars: usize,
}

impl LlmClassifier {
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, ClassificationError> {
        let api_key = resolve_secret_optional(
            settings.api_key.as_deref(),
            settings.api_key_file.as_deref(),
            settings.api_key_env_var.as_deref(),
        )
        .map_err(|e| ClassificationError::Config(e.to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ClassificationError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: format!(
                "{}/v1/chat/completions",
                settings.endpoint.trim_end_matches('/')
            ),
            model: settings.model.clone(),
            api_key,
            max_body_chars: settings.max_body_chars,
        })
    }

    fn build_prompt(&self, message: &RawMessage) -> String {
        let body: String = message.body.chars().take(self.max_body_chars).collect();
        EXTRACTION_PROMPT
            .replace("{subject}", &sanitize_for_prompt(&message.subject))
            .replace("{body}", &sanitize_for_prompt(&body))
    }

    async fn complete(&self, prompt: &str) -> Result<String, ClassificationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
        };

        debug!("Calling {} with model {}", self.url, self.model);

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| ClassificationError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClassificationError::HttpStatus {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ClassificationError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                ClassificationError::MalformedResponse("completion has no content".to_string())
            })
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn try_classify(
        &self,
        message: &RawMessage,
    ) -> Result<ClassificationResult, ClassificationError> {
        let prompt = self.build_prompt(message);
        let reply = self.complete(&prompt).await?;
        let extraction = parse_reply(&reply)?;
        into_result(extraction, || notes_seed(&message.subject, &message.body))
    }
}
