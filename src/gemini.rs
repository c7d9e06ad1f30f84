//! Gemini REST client: speech synthesis, speech-to-intent and image
//! generation.
//!
//! All three calls go through `models/{model}:generateContent`. Synthesized
//! speech comes back as base64 s16le PCM (24 kHz mono) in the first inline
//! data part of the first candidate.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Config;
use crate::error::SpeechError;
use crate::speech::{SpeechSynthesizer, VoiceConfig};

/// Instruction sent along with a child's recorded drawing request.
const DRAWING_PROMPT_INSTRUCTION: &str = "Listen to this audio of a child describing a drawing. \
Extract the main subject they want to draw (e.g., 'a cat in space', 'a dinosaur'). \
Translate it to a simple English prompt suitable for an image generator. \
Return ONLY the English prompt text.";

const DEFAULT_IMAGE_MIME_TYPE: &str = "image/jpeg";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// ==========================================
// Wire format
// ==========================================

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfigBody>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SpeechConfigBody {
    voice_config: VoiceConfigBody,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct VoiceConfigBody {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateContentRequest {
    fn speech(text: &str, voice: &VoiceConfig) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(text.to_string()),
                    inline_data: None,
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: Some(SpeechConfigBody {
                    voice_config: VoiceConfigBody {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.voice_name.clone(),
                        },
                    },
                }),
            }),
        }
    }

    fn audio_prompt(base64_audio: &str, mime_type: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: Some(mime_type.to_string()),
                            data: base64_audio.to_string(),
                        }),
                    },
                    Part {
                        text: Some(DRAWING_PROMPT_INSTRUCTION.to_string()),
                        inline_data: None,
                    },
                ],
            }],
            generation_config: None,
        }
    }

    fn image(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                    inline_data: None,
                }],
            }],
            generation_config: None,
        }
    }
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    /// Base64 audio of the first part, if it carries any.
    fn first_audio(&self) -> Option<&str> {
        self.first_parts()
            .first()
            .and_then(|p| p.inline_data.as_ref())
            .map(|d| d.data.as_str())
            .filter(|d| !d.is_empty())
    }

    /// Concatenated text parts of the first candidate.
    fn text(&self) -> String {
        self.first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect()
    }

    /// `data:` URL of the first part carrying inline data.
    fn first_image_url(&self) -> Option<String> {
        self.first_parts()
            .iter()
            .find_map(|p| p.inline_data.as_ref())
            .map(|d| {
                let mime_type = d.mime_type.as_deref().unwrap_or(DEFAULT_IMAGE_MIME_TYPE);
                format!("data:{};base64,{}", mime_type, d.data)
            })
    }
}

// ==========================================
// Client
// ==========================================

pub struct GeminiClient {
    http: Client,
    base_url: Url,
    api_key: String,
    tts_model: String,
    stt_model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, SpeechError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            api_key: api_key.into(),
            tts_model: "gemini-2.5-flash-preview-tts".to_string(),
            stt_model: "gemini-2.5-flash".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, SpeechError> {
        let mut client = Self::new(config.gemini_base_url, config.api_key.clone())?;
        client.tts_model = config.tts_model.to_string();
        client.stt_model = config.stt_model.to_string();
        client.image_model = config.image_model.to_string();
        Ok(client)
    }

    fn endpoint(&self, model: &str) -> Result<Url, SpeechError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{}/models/{}:generateContent", base, model))?)
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, SpeechError> {
        if self.api_key.is_empty() {
            return Err(SpeechError::MissingApiKey);
        }

        let response = self
            .http
            .post(self.endpoint(model)?)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Turn a recorded description of a drawing into a short English image
    /// prompt. `None` on any failure or an empty answer.
    pub async fn prompt_from_audio(&self, base64_audio: &str, mime_type: &str) -> Option<String> {
        let request = GenerateContentRequest::audio_prompt(base64_audio, mime_type);
        match self.generate_content(&self.stt_model, &request).await {
            Ok(response) => {
                let prompt = response.text().trim().to_string();
                (!prompt.is_empty()).then_some(prompt)
            }
            Err(e) => {
                log::error!("Audio understanding error: {}", e);
                None
            }
        }
    }

    /// Generate an image and return it as a `data:` URL.
    pub async fn generate_image(&self, prompt: &str) -> Option<String> {
        let request = GenerateContentRequest::image(prompt);
        match self.generate_content(&self.image_model, &request).await {
            Ok(response) => response.first_image_url(),
            Err(e) => {
                log::error!("Image generation error: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiClient {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<String, SpeechError> {
        let request = GenerateContentRequest::speech(text, voice);
        let response = self.generate_content(&self.tts_model, &request).await?;
        response
            .first_audio()
            .map(str::to_string)
            .ok_or(SpeechError::EmptyResponse)
    }
}
