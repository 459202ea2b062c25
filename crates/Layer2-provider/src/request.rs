//! Generation requests: validation and payload shaping

use cadence_foundation::{Error, GenerationKind, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Plain-mode prompts are capped regardless of model
const NON_CUSTOM_PROMPT_LIMIT: usize = 500;

/// Vendor model versions
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Model {
    #[serde(rename = "V3_5")]
    V3_5,
    #[serde(rename = "V4")]
    V4,
    #[serde(rename = "V4_5")]
    V4_5,
    #[serde(rename = "V4_5PLUS")]
    V4_5Plus,
    #[serde(rename = "V5")]
    V5,
}

impl Model {
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::V3_5 => "V3_5",
            Model::V4 => "V4",
            Model::V4_5 => "V4_5",
            Model::V4_5Plus => "V4_5PLUS",
            Model::V5 => "V5",
        }
    }

    /// Maximum prompt length in custom mode
    pub fn prompt_limit(&self) -> usize {
        match self {
            Model::V3_5 | Model::V4 => 3000,
            Model::V4_5 | Model::V4_5Plus | Model::V5 => 5000,
        }
    }

    pub fn style_limit(&self) -> usize {
        match self {
            Model::V3_5 | Model::V4 => 200,
            Model::V4_5 | Model::V4_5Plus | Model::V5 => 1000,
        }
    }

    pub fn title_limit(&self) -> usize {
        match self {
            Model::V4_5 | Model::V4_5Plus | Model::V5 => 100,
            Model::V3_5 | Model::V4 => 80,
        }
    }
}

impl std::str::FromStr for Model {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "V3_5" => Ok(Model::V3_5),
            "V4" => Ok(Model::V4),
            "V4_5" => Ok(Model::V4_5),
            "V4_5PLUS" => Ok(Model::V4_5Plus),
            "V5" => Ok(Model::V5),
            other => Err(Error::Validation(format!("unknown model '{}'", other))),
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to generate from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationMode {
    /// New song from a prompt
    Generate,
    /// Cover of uploaded audio
    Cover { upload_url: String },
    /// Continue uploaded audio from `continue_at` seconds
    Extend { upload_url: String, continue_at: f64 },
}

impl GenerationMode {
    pub fn kind(&self) -> GenerationKind {
        match self {
            GenerationMode::Generate => GenerationKind::Generate,
            GenerationMode::Cover { .. } => GenerationKind::Cover,
            GenerationMode::Extend { .. } => GenerationKind::Extend,
        }
    }
}

/// A generation request as submitted by a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub mode: GenerationMode,
    pub model: Model,
    pub custom_mode: bool,
    pub instrumental: bool,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub negative_tags: Option<String>,
    #[serde(default)]
    pub style_weight: Option<f64>,
    #[serde(default)]
    pub audio_weight: Option<f64>,
    #[serde(default)]
    pub weirdness_constraint: Option<f64>,
    #[serde(default)]
    pub vocal_gender: Option<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
}

impl GenerationRequest {
    pub fn new(mode: GenerationMode, model: Model) -> Self {
        Self {
            mode,
            model,
            custom_mode: false,
            instrumental: false,
            prompt: String::new(),
            title: String::new(),
            style: String::new(),
            negative_tags: None,
            style_weight: None,
            audio_weight: None,
            weirdness_constraint: None,
            vocal_gender: None,
            callback_url: None,
        }
    }

    /// Plain-mode request from a prompt
    pub fn generate(model: Model, prompt: impl Into<String>) -> Self {
        Self::new(GenerationMode::Generate, model).prompt(prompt)
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Switch to custom mode with a title and style
    pub fn custom(mut self, title: impl Into<String>, style: impl Into<String>) -> Self {
        self.custom_mode = true;
        self.title = title.into();
        self.style = style.into();
        self
    }

    pub fn instrumental(mut self, instrumental: bool) -> Self {
        self.instrumental = instrumental;
        self
    }

    pub fn negative_tags(mut self, tags: impl Into<String>) -> Self {
        self.negative_tags = Some(tags.into());
        self
    }

    pub fn vocal_gender(mut self, gender: impl Into<String>) -> Self {
        self.vocal_gender = Some(gender.into());
        self
    }

    pub fn callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    pub fn kind(&self) -> GenerationKind {
        self.mode.kind()
    }

    fn title_limit(&self) -> usize {
        match self.mode {
            GenerationMode::Extend { .. } => 100,
            _ => self.model.title_limit(),
        }
    }

    /// Check every rule and report all problems at once
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        let prompt = self.prompt.trim();
        let title = self.title.trim();
        let style = self.style.trim();

        let prompt_limit = if self.custom_mode {
            self.model.prompt_limit()
        } else {
            self.model.prompt_limit().min(NON_CUSTOM_PROMPT_LIMIT)
        };

        if !self.custom_mode && prompt.is_empty() {
            errors.push("prompt is required in simple mode".to_string());
        }
        if prompt.chars().count() > prompt_limit {
            errors.push(format!("prompt exceeds {} characters", prompt_limit));
        }

        if self.custom_mode {
            let title_limit = self.title_limit();
            if title.is_empty() {
                errors.push("title is required in custom mode".to_string());
            } else if title.chars().count() > title_limit {
                errors.push(format!("title exceeds {} characters", title_limit));
            }

            if style.is_empty() {
                errors.push("style is required in custom mode".to_string());
            } else if style.chars().count() > self.model.style_limit() {
                errors.push(format!(
                    "style exceeds {} characters",
                    self.model.style_limit()
                ));
            }

            if !self.instrumental && prompt.is_empty() {
                errors.push("lyrics are required when vocals are enabled".to_string());
            }
        }

        match &self.mode {
            GenerationMode::Generate => {}
            GenerationMode::Cover { upload_url } => {
                if upload_url.trim().is_empty() {
                    errors.push("upload_url is required".to_string());
                }
            }
            GenerationMode::Extend {
                upload_url,
                continue_at,
            } => {
                if upload_url.trim().is_empty() {
                    errors.push("upload_url is required".to_string());
                }
                if !continue_at.is_finite() || *continue_at <= 0.0 {
                    errors.push("continue_at must be greater than 0 seconds".to_string());
                }
            }
        }

        for (name, value) in [
            ("style_weight", self.style_weight),
            ("audio_weight", self.audio_weight),
            ("weirdness_constraint", self.weirdness_constraint),
        ] {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    errors.push(format!("{} must be within [0, 1]", name));
                }
            }
        }

        if let Some(ref gender) = self.vocal_gender {
            if gender != "m" && gender != "f" {
                errors.push("vocal_gender must be 'm' or 'f'".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors.join("; ")))
        }
    }

    /// Vendor JSON body; `default_callback` is used when none was set
    pub fn to_payload(&self, default_callback: &str) -> Value {
        let mut body = Map::new();
        let prompt = self.prompt.trim();

        body.insert("model".into(), json!(self.model.as_str()));
        body.insert("instrumental".into(), json!(self.instrumental));
        body.insert(
            "callBackUrl".into(),
            json!(self.callback_url.as_deref().unwrap_or(default_callback)),
        );

        match &self.mode {
            GenerationMode::Generate => {
                body.insert("customMode".into(), json!(self.custom_mode));
            }
            GenerationMode::Cover { upload_url } => {
                body.insert("uploadUrl".into(), json!(upload_url));
                body.insert("customMode".into(), json!(self.custom_mode));
            }
            GenerationMode::Extend {
                upload_url,
                continue_at,
            } => {
                body.insert("uploadUrl".into(), json!(upload_url));
                body.insert("defaultParamFlag".into(), json!(self.custom_mode));
                body.insert("continueAt".into(), json!(continue_at));
            }
        }

        if !prompt.is_empty() || !self.custom_mode || !self.instrumental {
            body.insert("prompt".into(), json!(prompt));
        }

        if self.custom_mode {
            body.insert("style".into(), json!(self.style.trim()));
            body.insert("title".into(), json!(self.title.trim()));
        }

        if let Some(tags) = self.negative_tags.as_deref().map(str::trim) {
            if !tags.is_empty() {
                body.insert("negativeTags".into(), json!(tags));
            }
        }
        if let Some(v) = self.style_weight {
            body.insert("styleWeight".into(), json!(v));
        }
        if let Some(v) = self.audio_weight {
            body.insert("audioWeight".into(), json!(v));
        }
        if let Some(v) = self.weirdness_constraint {
            body.insert("weirdnessConstraint".into(), json!(v));
        }
        if self.custom_mode && !self.instrumental {
            if let Some(ref gender) = self.vocal_gender {
                body.insert("vocalGender".into(), json!(gender));
            }
        }

        Value::Object(body)
    }
}
