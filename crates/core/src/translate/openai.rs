//! OpenAI-backed translator implementation.
//! One chat completion per subtitle block, low temperature, no streaming.

use super::{Translator, GLOSSARY};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";
const TEMPERATURE: f64 = 0.2;

const SYSTEM_PROMPT: &str = "Você é um tradutor técnico de inglês para português, com foco em Jiu-Jitsu Brasileiro. Use apenas a tradução como resposta.";

/// Connection settings for the chat completions API.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
}

impl OpenAiConfig {
    /// Build a config from `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `OPENAI_MODEL`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
        Ok(Self {
            api_key,
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            temperature: TEMPERATURE,
        })
    }
}

/// Translator that delegates to the OpenAI chat completion API.
pub struct OpenAiTranslator {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiTranslator {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Send a JSON body to the chat completions endpoint and return the JSON response.
    async fn post_chat(&self, body: Value) -> Result<Value> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;
        let resp = resp.error_for_status()?;
        Ok(resp.json().await?)
    }
}

/// Build the user message: instructions, glossary and the text itself.
pub fn user_prompt(text: &str) -> String {
    let glossary: String = GLOSSARY
        .iter()
        .map(|(en, pt)| format!("- {en} = {pt}\n"))
        .collect();
    format!(
        "Você é um tradutor profissional com profundo conhecimento em Jiu-Jitsu Brasileiro.\n\
         Traduza o seguinte texto do inglês para o português brasileiro, usando termos técnicos corretos do Jiu-Jitsu.\n\
         **Não adicione comentários, introduções, explicações ou qualquer texto extra.**\n\
         Responda apenas com a tradução fiel do conteúdo.\n\n\
         ## Vocabulário técnico:\n{glossary}\n\
         Texto a ser traduzido:\n{text}\n"
    )
}

#[async_trait]
impl Translator for OpenAiTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "stream": false,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt(text)},
            ],
        });
        let value = self.post_chat(body).await?;
        let content = value["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("missing content"))?;
        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn config(base_url: String) -> OpenAiConfig {
        OpenAiConfig {
            api_key: "test-key".into(),
            base_url,
            model: "gpt-4o".into(),
            temperature: TEMPERATURE,
        }
    }

    #[test]
    fn prompt_lists_glossary_and_text() {
        let prompt = user_prompt("Good sweep.");
        assert!(prompt.contains("- half guard = meia guarda\n"));
        assert!(prompt.contains("- z-guard = meia escudo\n"));
        assert!(prompt.ends_with("Texto a ser traduzido:\nGood sweep.\n"));
    }

    #[tokio::test]
    async fn returns_message_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer test-key")
                    .body_contains("\"temperature\":0.2")
                    .body_contains("Good sweep.");
                then.status(200).json_body(json!({
                    "choices": [{"message": {"role": "assistant", "content": " Boa raspagem. "}}]
                }));
            })
            .await;
        let tr = OpenAiTranslator::new(config(server.url("/v1")));
        let out = tr.translate("Good sweep.").await.unwrap();
        assert_eq!(out, "Boa raspagem.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_errors_are_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(429).body("slow down");
            })
            .await;
        let tr = OpenAiTranslator::new(config(server.url("/v1")));
        assert!(tr.translate("hi").await.is_err());
    }

    #[tokio::test]
    async fn missing_content_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({"choices": []}));
            })
            .await;
        let tr = OpenAiTranslator::new(config(server.url("/v1")));
        assert!(tr.translate("hi").await.is_err());
    }
}
