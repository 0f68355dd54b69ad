//! §3 DATA MODEL — Project, RequestTemplate, Flow, Settings, HistoryEntry.

use crate::capture::VarScraper;
use crate::session::SessionJar;
use crate::varstore::VarStore;
use derive_builder::Builder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The literal sentinel that stands in for the project file's directory in
/// path-valued settings (spec.md §3/§4.7).
pub const PROJ_DIR_SENTINEL: &str = "::PROJ_DIR::";

/// Multi-valued header map, preserving insertion order per key
/// (spec.md §3 RequestTemplate invariant).
pub type HeaderMap = IndexMap<String, Vec<String>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTemplate {
    /// Display name, case preserved; lookups elsewhere are case-insensitive.
    pub name: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: HeaderMap,
    #[serde(default, with = "body_as_text", skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<u8>>,
    #[serde(default)]
    pub auth_flow: Option<String>,
    /// Keyed by the upper-cased scraper name; the invariant that the key
    /// equals `VarScraper::name()` is enforced in `Project::add_capture`.
    #[serde(default)]
    pub captures: IndexMap<String, VarScraper>,
}

/// Stores a body as plain JSON text. Request/response bodies in MORC are
/// HTTP payloads the user is templating and inspecting as text, so we keep
/// `project.json`/`history.json` human-readable rather than base64-blobbing
/// them; a body containing invalid UTF-8 is replaced lossily on save, which
/// callers accept as the tradeoff for a greppable history file.
mod body_as_text {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(bytes) => String::from_utf8_lossy(bytes).into_owned().serialize(s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let opt = Option::<String>::deserialize(d)?;
        Ok(opt.map(|s| s.into_bytes()))
    }
}

impl RequestTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: String::new(),
            url: String::new(),
            headers: IndexMap::new(),
            body: None,
            auth_flow: None,
            captures: IndexMap::new(),
        }
    }

    /// "Unsendable" means the method or URL is empty (spec.md §3).
    pub fn is_sendable(&self) -> bool {
        !self.method.is_empty() && !self.url.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowStep {
    /// Lowercased template name.
    pub template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<FlowStep>,
}

impl Flow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub template_name: String,
    pub request_snapshot: RequestSnapshot,
    pub response_snapshot: ResponseSnapshot,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSnapshot {
    pub method: String,
    pub url: String,
    pub headers: HeaderMap,
    #[serde(default, with = "body_as_text", skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub headers: HeaderMap,
    #[serde(default, with = "body_as_text", skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(setter(into), default)]
pub struct Settings {
    #[serde(default = "default_project_file")]
    pub project_file: String,
    #[serde(default = "default_history_file")]
    pub history_file: String,
    #[serde(default = "default_session_file")]
    pub session_file: String,
    #[serde(default = "default_true")]
    pub record_history: bool,
    #[serde(default = "default_true")]
    pub record_session: bool,
    #[serde(default = "default_cookie_lifetime", with = "humantime_serde")]
    pub cookie_lifetime: Duration,
    #[serde(default = "default_var_prefix")]
    pub var_prefix: String,
}

fn default_project_file() -> String {
    format!("{PROJ_DIR_SENTINEL}/project.json")
}
fn default_history_file() -> String {
    format!("{PROJ_DIR_SENTINEL}/history.json")
}
fn default_session_file() -> String {
    format!("{PROJ_DIR_SENTINEL}/session.json")
}
fn default_true() -> bool {
    true
}
fn default_cookie_lifetime() -> Duration {
    Duration::from_secs(24 * 3600)
}
fn default_var_prefix() -> String {
    "$".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_file: default_project_file(),
            history_file: default_history_file(),
            session_file: default_session_file(),
            record_history: true,
            record_session: true,
            cookie_lifetime: default_cookie_lifetime(),
            var_prefix: default_var_prefix(),
        }
    }
}

impl Settings {
    /// A single non-alphanumeric ASCII character (spec.md §3, validated per
    /// SPEC_FULL.md §4.4).
    pub fn prefix_char(&self) -> Result<char, crate::error::MorcError> {
        let mut chars = self.var_prefix.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return Err(crate::error::MorcError::BadInput(format!(
                "var_prefix '{}' must be exactly one character",
                self.var_prefix
            )));
        };
        if c.is_ascii_alphanumeric() {
            return Err(crate::error::MorcError::BadInput(format!(
                "var_prefix '{c}' must not be alphanumeric"
            )));
        }
        Ok(c)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(default = "default_project_name")]
    pub name: String,
    #[serde(default)]
    pub templates: IndexMap<String, RequestTemplate>,
    #[serde(default)]
    pub flows: IndexMap<String, Flow>,
    #[serde(default)]
    pub vars: VarStore,
    #[serde(skip)]
    pub cookies: SessionJar,
    #[serde(skip)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub config: Settings,
}

fn default_project_name() -> String {
    "untitled".to_string()
}

impl Default for Project {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            templates: IndexMap::new(),
            flows: IndexMap::new(),
            vars: VarStore::new(),
            cookies: SessionJar::new(),
            history: Vec::new(),
            config: Settings::default(),
        }
    }
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn get_template(&self, name: &str) -> Option<&RequestTemplate> {
        self.templates.get(&name.to_lowercase())
    }

    pub fn get_template_mut(&mut self, name: &str) -> Option<&mut RequestTemplate> {
        self.templates.get_mut(&name.to_lowercase())
    }

    pub fn add_template(&mut self, template: RequestTemplate) -> Result<(), crate::error::MorcError> {
        let key = template.name.to_lowercase();
        if self.templates.contains_key(&key) {
            return Err(crate::error::MorcError::already_exists(
                "template",
                template.name.clone(),
            ));
        }
        self.templates.insert(key, template);
        Ok(())
    }

    pub fn remove_template(&mut self, name: &str) -> Result<RequestTemplate, crate::error::MorcError> {
        self.templates
            .shift_remove(&name.to_lowercase())
            .ok_or_else(|| crate::error::MorcError::not_found("template", name))
    }

    pub fn get_flow(&self, name: &str) -> Option<&Flow> {
        self.flows.get(&name.to_lowercase())
    }

    pub fn get_flow_mut(&mut self, name: &str) -> Option<&mut Flow> {
        self.flows.get_mut(&name.to_lowercase())
    }

    pub fn add_flow(&mut self, flow: Flow) -> Result<(), crate::error::MorcError> {
        let key = flow.name.to_lowercase();
        if self.flows.contains_key(&key) {
            return Err(crate::error::MorcError::already_exists("flow", flow.name.clone()));
        }
        self.flows.insert(key, flow);
        Ok(())
    }

    pub fn remove_flow(&mut self, name: &str) -> Result<Flow, crate::error::MorcError> {
        self.flows
            .shift_remove(&name.to_lowercase())
            .ok_or_else(|| crate::error::MorcError::not_found("flow", name))
    }

    /// `is_execable` ⇔ every referenced template exists AND is sendable
    /// (spec.md §3 Flow invariant).
    pub fn flow_is_execable(&self, flow: &Flow) -> bool {
        flow.steps.iter().all(|step| {
            self.get_template(&step.template)
                .map(|t| t.is_sendable())
                .unwrap_or(false)
        })
    }
}
