//! Typed records for the JSON settings files.
//!
//! Each record keeps the keys it does not know about in a flattened `extra`
//! map, so a load/save cycle never drops fields written by other tools.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, UncleError};

/// Placeholder replaced by the organization id in URL templates.
pub const ORG_PLACEHOLDER: &str = "ORG";
/// Placeholder replaced by the conversation id in URL templates.
pub const CONV_PLACEHOLDER: &str = "CONV";
/// Placeholder replaced by user text in preset templates.
pub const PROMPT_PLACEHOLDER: &str = "PROMPT";

fn default_timezone() -> String {
    "UTC".to_string()
}

// =============================================================================
// target.json
// =============================================================================

/// Service endpoints and request identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Timezone reported with each prompt.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Completion endpoint template.
    #[serde(alias = "url")]
    pub query_llm: String,
    /// Conversation creation endpoint template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_conversation: Option<String>,
    /// Conversation listing endpoint template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_conversations: Option<String>,
    /// Single-conversation endpoint template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_conversation: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Endpoints named by the target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Create,
    Query,
    List,
    Conversation,
}

impl Endpoint {
    /// Key of the template in `target.json`.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Create => "create_conversation",
            Self::Query => "query_llm",
            Self::List => "list_conversations",
            Self::Conversation => "get_conversation",
        }
    }
}

impl Target {
    /// Raw template for an endpoint.
    ///
    /// The single-conversation endpoint falls back to the listing endpoint
    /// with `/CONV` added to its path.
    ///
    /// # Errors
    /// Returns `InvalidSetting` if the template is not configured.
    pub fn template(&self, endpoint: Endpoint) -> Result<String> {
        let template = match endpoint {
            Endpoint::Query => Some(self.query_llm.clone()),
            Endpoint::Create => self.create_conversation.clone(),
            Endpoint::List => self.list_conversations.clone(),
            Endpoint::Conversation => self
                .get_conversation
                .clone()
                .or_else(|| self.list_conversations.as_deref().map(conversation_from_list)),
        };
        template
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| UncleError::InvalidSetting {
                key: endpoint.key().to_string(),
                message: "missing from target.json".to_string(),
            })
    }

    /// Endpoint URL with `ORG` and `CONV` substituted.
    ///
    /// # Errors
    /// Returns `InvalidSetting` if the template is missing.
    pub fn url(&self, endpoint: Endpoint, org: &str, conversation: &str) -> Result<String> {
        Ok(fill_template(&self.template(endpoint)?, org, conversation))
    }
}

/// Listing template with `/CONV` added to the path, ahead of any query string.
fn conversation_from_list(list: &str) -> String {
    let (path, query) = list.split_once('?').map_or((list, None), |(p, q)| (p, Some(q)));
    let path = path.trim_end_matches('/');
    match query {
        Some(query) => format!("{path}/{CONV_PLACEHOLDER}?{query}"),
        None => format!("{path}/{CONV_PLACEHOLDER}"),
    }
}

/// Replace every `ORG` and `CONV` in a URL template.
#[must_use]
pub fn fill_template(template: &str, org: &str, conversation: &str) -> String {
    template
        .replace(ORG_PLACEHOLDER, org)
        .replace(CONV_PLACEHOLDER, conversation)
}

// =============================================================================
// creds.json
// =============================================================================

/// Session credentials and the active conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    /// Semicolon-delimited `k=v` cookie pairs.
    pub cookies: String,
    /// Organization id.
    pub org: String,
    /// Active conversation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<String>,
    /// Display name of the active conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Credentials {
    /// The active conversation id, if one is set.
    #[must_use]
    pub fn active_conversation(&self) -> Option<&str> {
        self.conversation
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Switch to another conversation.
    pub fn bind(&mut self, conversation: impl Into<String>, name: Option<String>) {
        self.conversation = Some(conversation.into());
        self.conversation_name = name;
    }

    /// Cookie pairs parsed from the `cookies` string.
    ///
    /// Empty segments and segments without `=` are skipped.
    #[must_use]
    pub fn cookie_pairs(&self) -> Vec<(String, String)> {
        self.cookies
            .split(';')
            .filter_map(|pair| {
                let (key, value) = pair.split_once('=')?;
                let key = key.trim();
                (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
            })
            .collect()
    }

    /// Value for a `Cookie` request header.
    #[must_use]
    pub fn cookie_header(&self) -> String {
        self.cookie_pairs()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// =============================================================================
// prompts.json
// =============================================================================

/// Named prompt templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prompts {
    #[serde(default)]
    pub prompts: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Prompts {
    /// Expand a preset around the user's text.
    ///
    /// # Errors
    /// Returns `PresetNotFound` for an unknown name.
    pub fn expand(&self, name: &str, text: &str) -> Result<String> {
        let template = self
            .prompts
            .get(name)
            .ok_or_else(|| UncleError::PresetNotFound(name.to_string()))?;
        Ok(expand_template(template, text))
    }
}

/// Substitute the first `PROMPT` in a template, or append after one space.
#[must_use]
pub fn expand_template(template: &str, text: &str) -> String {
    if template.contains(PROMPT_PLACEHOLDER) {
        template.replacen(PROMPT_PLACEHOLDER, text, 1)
    } else if text.is_empty() {
        template.to_string()
    } else {
        format!("{template} {text}")
    }
}

// =============================================================================
// JSON file helpers
// =============================================================================

/// Read and parse a JSON state file.
///
/// # Errors
/// `StateFileMissing` if absent, `StateFileInvalid` if unparsable.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            UncleError::StateFileMissing {
                path: path.display().to_string(),
            }
        } else {
            UncleError::Io(e)
        }
    })?;
    serde_json::from_str(&content).map_err(|e| UncleError::StateFileInvalid {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Rewrite a JSON state file wholesale.
///
/// # Errors
/// Returns an error if serialization or the write fails.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)?;
    Ok(())
}
