//! AI flows: prompt templates, response schemas and the orchestration of a
//! single model call.

use std::{future::Future, sync::Arc, time::Duration};

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::FlowError,
    gemini::{GeminiError, GenerativeModel, ModelRequest, PromptPart},
    models::{
        ClassificationRequest, ClassificationResult, ImageGenerationResult, Recyclability,
        ReuseSuggestionRequest, ReuseSuggestionResult,
    },
    schema,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelKind {
    Text,
    Image,
}

/// Declarative description of one flow.
pub struct FlowSpec {
    pub name: &'static str,
    pub model: ModelKind,
    pub template: &'static str,
    pub response_schema: fn() -> Option<Value>,
}

impl FlowSpec {
    /// Substitutes `{{key}}` placeholders in the template.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        vars.iter().fold(self.template.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{{{key}}}}}"), value)
        })
    }
}

fn suggestion_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "suggestion": { "type": "STRING", "description": "A creative reuse suggestion for the waste item." },
            "videoSearchQuery": {
                "type": "STRING",
                "description": "A concise search query (max 5 words) for finding DIY video tutorials related to the suggestion on platforms like YouTube."
            }
        },
        "required": ["suggestion", "videoSearchQuery"]
    })
}

fn classification_schema() -> Option<Value> {
    let values: Vec<&str> = Recyclability::ALL.iter().map(|r| r.as_str()).collect();
    Some(json!({
        "type": "OBJECT",
        "properties": {
            "recyclability": { "type": "STRING", "enum": values },
            "reuseSuggestions": { "type": "ARRAY", "items": suggestion_schema() },
            "recycleChannels": { "type": "ARRAY", "items": { "type": "STRING" } },
            "donateSuggestions": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["recyclability", "reuseSuggestions", "recycleChannels", "donateSuggestions"]
    }))
}

fn reuse_suggestions_schema() -> Option<Value> {
    Some(json!({
        "type": "OBJECT",
        "properties": {
            "suggestions": { "type": "ARRAY", "items": suggestion_schema() }
        },
        "required": ["suggestions"]
    }))
}

fn no_schema() -> Option<Value> {
    None
}

pub const CLASSIFY_WASTE: FlowSpec = FlowSpec {
    name: "classifyWaste",
    model: ModelKind::Text,
    template: "You are an expert in waste management and recycling.

You will classify the provided waste item as recyclable, non-recyclable, or unsure.
You will also provide suggestions for recycling it through appropriate channels, and donating it if applicable.

For the reuseSuggestions field, provide creative ideas for reusing the item. For each reuse suggestion, you MUST provide:
1. The 'suggestion' itself (a string describing the reuse idea).
2. A 'videoSearchQuery' (a concise string, max 5 words, for finding a relevant DIY video tutorial on YouTube for that specific suggestion).

Analyze the attached image to determine its recyclability and suggest appropriate actions.",
    response_schema: classification_schema,
};

pub const SUGGEST_REUSES: FlowSpec = FlowSpec {
    name: "suggestReuses",
    model: ModelKind::Text,
    template: "You are an expert in creative reuse and repurposing of waste items. A user will provide a description of a waste item. For that item, provide:
1. A creative reuse suggestion.
2. A concise and effective search query (maximum 5 words) that the user can use on a video platform like YouTube to find DIY tutorials for that specific suggestion.

Provide at least three distinct suggestions, each with its own reuse idea and video search query.

Waste Item Description: {{wasteItem}}",
    response_schema: reuse_suggestions_schema,
};

pub const GENERATE_IMAGE: FlowSpec = FlowSpec {
    name: "generateImage",
    model: ModelKind::Image,
    template: "A high-quality, professional, and visually appealing image representing: {{prompt}}. Photorealistic, clean, studio lighting.",
    response_schema: no_schema,
};

pub const MIN_EXPECTED_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
}

pub struct AiFlows {
    model: Arc<dyn GenerativeModel>,
    text_model: String,
    image_model: String,
    policy: CallPolicy,
}

impl AiFlows {
    pub fn new(model: Arc<dyn GenerativeModel>, config: &Config) -> Self {
        Self {
            model,
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            policy: CallPolicy { timeout: config.ai_timeout, max_attempts: config.ai_max_attempts },
        }
    }

    fn request_for(&self, flow: &FlowSpec, parts: Vec<PromptPart>) -> ModelRequest {
        let model = match flow.model {
            ModelKind::Text => self.text_model.clone(),
            ModelKind::Image => self.image_model.clone(),
        };
        ModelRequest { model, parts, response_schema: (flow.response_schema)() }
    }

    /// Runs one model call under the timeout, retrying transient failures.
    async fn invoke<T, F, Fut>(&self, flow: &FlowSpec, call: F) -> Result<T, FlowError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, GeminiError>>,
    {
        let mut attempt = 1;
        loop {
            let outcome = match tokio::time::timeout(self.policy.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(GeminiError::Timeout(self.policy.timeout)),
            };
            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.policy.max_attempts => {
                    warn!("🔄 Flow '{}' attempt {} failed ({}), retrying", flow.name, attempt, e);
                    attempt += 1;
                }
                Err(e) => return Err(FlowError::Generation(e)),
            }
        }
    }

    pub async fn classify_waste(&self, request: &ClassificationRequest) -> Result<ClassificationResult, FlowError> {
        let image = schema::validate_classification_input(request)?;
        info!("🎯 Classifying waste image ({}, {} base64 chars)", image.mime_type, image.payload.len());

        let model_request = self.request_for(&CLASSIFY_WASTE, vec![
            PromptPart::Text(CLASSIFY_WASTE.render(&[])),
            PromptPart::Media { mime_type: image.mime_type.to_string(), data: image.payload.to_string() },
        ]);
        let model = self.model.as_ref();
        let output = self.invoke(&CLASSIFY_WASTE, || model.generate_json(&model_request)).await?;

        let result = schema::validate_classification_output(&output)?;
        info!("✅ Classified as {} with {} reuse suggestions", result.recyclability.as_str(), result.reuse_suggestions.len());
        Ok(result)
    }

    pub async fn suggest_reuses(&self, request: &ReuseSuggestionRequest) -> Result<ReuseSuggestionResult, FlowError> {
        let item = schema::validate_reuse_suggestion_input(request)?;
        info!("🎯 Generating reuse suggestions for '{}'", item);

        let prompt = SUGGEST_REUSES.render(&[("wasteItem", item)]);
        let model_request = self.request_for(&SUGGEST_REUSES, vec![PromptPart::Text(prompt)]);
        let model = self.model.as_ref();
        let output = self.invoke(&SUGGEST_REUSES, || model.generate_json(&model_request)).await?;

        let result = schema::validate_reuse_suggestion_output(&output)?;
        for s in &result.suggestions {
            debug!("💡 {} -> {}", s.suggestion, s.video_search_url());
        }
        if result.suggestions.len() < MIN_EXPECTED_SUGGESTIONS {
            warn!("⚠️ Model returned {} suggestions for '{}', expected at least {}", result.suggestions.len(), item, MIN_EXPECTED_SUGGESTIONS);
        }
        Ok(result)
    }

    pub async fn generate_image(&self, prompt: &str) -> Result<ImageGenerationResult, FlowError> {
        let prompt = schema::validate_image_prompt(prompt)?;
        let full_prompt = GENERATE_IMAGE.render(&[("prompt", prompt)]);
        let preview: String = full_prompt.chars().take(100).collect();
        info!("🎯 Generating image with prompt: {}", preview);

        let model_request = self.request_for(&GENERATE_IMAGE, vec![PromptPart::Text(full_prompt)]);
        let model = self.model.as_ref();
        let image = self.invoke(&GENERATE_IMAGE, || model.generate_image(&model_request)).await?;

        Ok(ImageGenerationResult { image_data_uri: image.to_data_uri() })
    }
}


#[cfg(test)]
mod tests {
    use super::fake::ScriptedModel;
    use super::*;
    use crate::gemini::InlineImage;
    use crate::models::Recyclability;
    use pretty_assertions::assert_eq;

    const PHOTO: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn config() -> Config {
        Config::from_lookup(|_| None).unwrap()
    }

    fn flows(model: Arc<ScriptedModel>) -> AiFlows {
        AiFlows::new(model, &config())
    }

    fn classification_json() -> Value {
        json!({
            "recyclability": "recyclable",
            "reuseSuggestions": [{ "suggestion": "Bird feeder", "videoSearchQuery": "diy bottle bird feeder" }],
            "recycleChannels": ["Dry waste collection"],
            "donateSuggestions": []
        })
    }

    #[tokio::test]
    async fn classify_rejects_bad_uri_before_any_call() {
        let model = Arc::new(ScriptedModel::with_json(vec![Ok(classification_json())]));
        let request = ClassificationRequest { photo_data_uri: "not-a-data-uri".into() };
        let err = flows(model.clone()).classify_waste(&request).await.unwrap_err();
        assert!(matches!(err, FlowError::InvalidInput(_)));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn classify_embeds_image_and_validates_output() {
        let model = Arc::new(ScriptedModel::with_json(vec![Ok(classification_json())]));
        let request = ClassificationRequest { photo_data_uri: PHOTO.into() };
        let result = flows(model.clone()).classify_waste(&request).await.unwrap();
        assert_eq!(result.recyclability, Recyclability::Recyclable);

        let sent = model.requests.lock()[0].clone();
        assert_eq!(sent.model, "gemini-2.0-flash");
        assert_eq!(sent.parts[1], PromptPart::Media { mime_type: "image/png".into(), data: "iVBORw0KGgo=".into() });
        assert!(sent.response_schema.is_some());
    }

    #[tokio::test]
    async fn classify_is_independent_across_calls() {
        let model = Arc::new(ScriptedModel::with_json(vec![Ok(classification_json()), Ok(classification_json())]));
        let flows = flows(model.clone());
        let request = ClassificationRequest { photo_data_uri: PHOTO.into() };
        let first = flows.classify_waste(&request).await.unwrap();
        let second = flows.classify_waste(&request).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn classify_surfaces_schema_violation() {
        let model = Arc::new(ScriptedModel::with_json(vec![Ok(json!({ "recyclability": "maybe" }))]));
        let request = ClassificationRequest { photo_data_uri: PHOTO.into() };
        let err = flows(model).classify_waste(&request).await.unwrap_err();
        assert!(matches!(err, FlowError::SchemaViolation(_)));
    }

    #[tokio::test]
    async fn suggestions_for_plastic_bottle_have_short_queries() {
        let model = Arc::new(ScriptedModel::with_json(vec![Ok(json!({ "suggestions": [
            { "suggestion": "Self-watering planter", "videoSearchQuery": "bottle self watering planter" },
            { "suggestion": "Pencil holder", "videoSearchQuery": "how to make a plastic bottle pencil holder" },
            { "suggestion": "Bird feeder", "videoSearchQuery": "bottle bird feeder" }
        ]}))]));
        let request = ReuseSuggestionRequest { waste_item: "plastic bottle".into() };
        let result = flows(model.clone()).suggest_reuses(&request).await.unwrap();

        assert!(!result.suggestions.is_empty());
        for s in &result.suggestions {
            assert!(!s.suggestion.is_empty());
            assert!(s.video_search_query.split_whitespace().count() <= 5);
        }
        let prompt = match &model.requests.lock()[0].parts[0] {
            PromptPart::Text(t) => t.clone(),
            other => panic!("unexpected part {other:?}"),
        };
        assert!(prompt.ends_with("Waste Item Description: plastic bottle"));
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once() {
        let model = Arc::new(ScriptedModel::with_json(vec![
            Err(GeminiError::Status { status: 503, body: "overloaded".into() }),
            Ok(json!({ "suggestions": [] })),
        ]));
        let request = ReuseSuggestionRequest { waste_item: "jar".into() };
        let result = flows(model.clone()).suggest_reuses(&request).await.unwrap();
        assert!(result.suggestions.is_empty());
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn retry_budget_is_bounded() {
        let model = Arc::new(ScriptedModel::with_json(vec![
            Err(GeminiError::Http("reset".into())),
            Err(GeminiError::Http("reset".into())),
            Ok(json!({ "suggestions": [] })),
        ]));
        let request = ReuseSuggestionRequest { waste_item: "jar".into() };
        let err = flows(model.clone()).suggest_reuses(&request).await.unwrap_err();
        assert!(matches!(err, FlowError::Generation(GeminiError::Http(_))));
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let model = Arc::new(ScriptedModel::with_json(vec![
            Err(GeminiError::MalformedOutput("prose".into())),
            Ok(json!({ "suggestions": [] })),
        ]));
        let request = ReuseSuggestionRequest { waste_item: "jar".into() };
        let err = flows(model.clone()).suggest_reuses(&request).await.unwrap_err();
        assert!(matches!(err, FlowError::Generation(GeminiError::MalformedOutput(_))));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_call_times_out() {
        let model = Arc::new(ScriptedModel { hang: true, ..Default::default() });
        let request = ReuseSuggestionRequest { waste_item: "jar".into() };
        let err = flows(model.clone()).suggest_reuses(&request).await.unwrap_err();
        assert!(matches!(err, FlowError::Generation(GeminiError::Timeout(_))));
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn image_generation_wraps_prompt_and_returns_data_uri() {
        let model = Arc::new(ScriptedModel::with_images(vec![Ok(InlineImage {
            mime_type: "image/png".into(),
            data: "AAAA".into(),
        })]));
        let result = flows(model.clone()).generate_image("a tote bag from old jeans").await.unwrap();
        assert_eq!(result.image_data_uri, "data:image/png;base64,AAAA");

        let sent = model.requests.lock()[0].clone();
        assert_eq!(sent.model, "gemini-2.0-flash-preview-image-generation");
        assert_eq!(sent.parts, vec![PromptPart::Text(
            "A high-quality, professional, and visually appealing image representing: a tote bag from old jeans. Photorealistic, clean, studio lighting.".into()
        )]);
    }

    #[tokio::test]
    async fn image_generation_without_media_fails() {
        let model = Arc::new(ScriptedModel::with_images(vec![Err(GeminiError::NoMedia)]));
        let err = flows(model).generate_image("lamp").await.unwrap_err();
        assert!(matches!(err, FlowError::Generation(GeminiError::NoMedia)));
    }

    #[test]
    fn render_substitutes_placeholders() {
        assert!(SUGGEST_REUSES.render(&[("wasteItem", "old tyre")]).contains("Description: old tyre"));
        assert!(!GENERATE_IMAGE.render(&[("prompt", "x")]).contains("{{"));
    }
}
