//! Conversation identity and its lifecycle.
//!
//! The active conversation lives in the credentials; the parent pointer
//! names the leaf message new prompts attach to. Both always describe the
//! same conversation: every switch either clears the pointer or replaces it
//! with the new conversation's leaf.

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::http;
use crate::error::{Result, UncleError};
use crate::storage::settings::{Credentials, Endpoint, Target};
use crate::storage::state::{StateStore, parse_parent};

/// Parent pointer meaning "start of conversation".
pub const NIL_PARENT: Uuid = Uuid::nil();

/// Where the local state stands with respect to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationState {
    /// No conversation selected.
    Unbound,
    /// Conversation selected, nothing sent yet.
    Bound { conversation: String },
    /// Conversation selected with a known leaf message.
    Active { conversation: String, parent: Uuid },
}

impl ConversationState {
    /// Derive the state from credentials and the stored pointer.
    #[must_use]
    pub fn from_parts(creds: &Credentials, parent: Option<Uuid>) -> Self {
        match (creds.active_conversation(), parent) {
            (None, _) => Self::Unbound,
            (Some(conversation), Some(parent)) if !parent.is_nil() => Self::Active {
                conversation: conversation.to_string(),
                parent,
            },
            (Some(conversation), _) => Self::Bound {
                conversation: conversation.to_string(),
            },
        }
    }

    /// Parent pointer to send with the next prompt.
    ///
    /// # Errors
    /// Returns `NoConversation` when unbound.
    pub fn parent_for_query(&self) -> Result<Uuid> {
        match self {
            Self::Unbound => Err(UncleError::NoConversation),
            Self::Bound { .. } => Ok(NIL_PARENT),
            Self::Active { parent, .. } => Ok(*parent),
        }
    }
}

/// One conversation as reported by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_leaf_message_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConversationRecord {
    /// The leaf message id, when present and well formed.
    #[must_use]
    pub fn leaf(&self) -> Option<Uuid> {
        self.current_leaf_message_uuid.as_deref().and_then(parse_parent)
    }

    /// Last update time, when the service sent a parsable one.
    #[must_use]
    pub fn updated(&self) -> Option<DateTime<Utc>> {
        self.updated_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc))
    }
}

/// Records from a raw listing; entries that are not conversations are skipped.
#[must_use]
pub fn parse_listing(raw: &[Value]) -> Vec<ConversationRecord> {
    raw.iter()
        .filter_map(|value| match serde_json::from_value(value.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed listing entry");
                None
            }
        })
        .collect()
}

/// Newest first by `updated_at`; entries without one keep service order, last.
#[must_use]
pub fn newest_first(mut records: Vec<ConversationRecord>) -> Vec<ConversationRecord> {
    records.sort_by(|a, b| b.updated().cmp(&a.updated()));
    records
}

/// Is this text a conversation id?
#[must_use]
pub fn parse_conversation_id(text: &str) -> Option<Uuid> {
    parse_parent(text)
}

// =============================================================================
// Select
// =============================================================================

/// Result of selecting from the cached listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Switched to the conversation.
    Selected {
        name: String,
        parent: Option<Uuid>,
    },
    /// The id is not in the cached listing.
    NotFound,
}

/// Switch to a conversation known from the last listing.
///
/// Nothing is written when the id is unknown.
///
/// # Errors
/// Returns error if the cache is unreadable or saving fails.
pub fn select<S: StateStore>(
    store: &mut S,
    creds: &mut Credentials,
    id: Uuid,
) -> Result<SelectOutcome> {
    let Some(raw) = store.load_listing()? else {
        tracing::info!("No cached listing to select from");
        return Ok(SelectOutcome::NotFound);
    };
    let Some(record) = parse_listing(&raw)
        .into_iter()
        .find(|r| parse_conversation_id(&r.uuid) == Some(id))
    else {
        return Ok(SelectOutcome::NotFound);
    };

    // Parent first: a failed write must not leave the new conversation paired
    // with the old conversation's leaf.
    let parent = record.leaf();
    match parent {
        Some(leaf) => store.save_parent(leaf)?,
        None => store.clear_parent()?,
    }
    creds.bind(record.uuid.clone(), Some(record.name.clone()));
    store.save_credentials(creds)?;
    tracing::info!(conversation = %record.uuid, ?parent, "Selected conversation");
    Ok(SelectOutcome::Selected {
        name: record.name,
        parent,
    })
}

// =============================================================================
// Create
// =============================================================================

/// Body of a conversation creation request.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRequest {
    pub uuid: String,
    pub name: String,
}

impl CreateRequest {
    /// Request with a fresh client-side id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            name: name.into(),
        }
    }
}

/// Adopt a freshly created conversation and start a new thread.
///
/// The service's echo of `uuid` and `name` wins over what was requested.
///
/// # Errors
/// Returns error if saving fails.
pub fn adopt_created<S: StateStore>(
    store: &mut S,
    creds: &mut Credentials,
    request: &CreateRequest,
    response: &Value,
) -> Result<(String, String)> {
    let field = |key: &str| response.get(key).and_then(Value::as_str).map(str::to_string);
    let uuid = field("uuid").unwrap_or_else(|| request.uuid.clone());
    let name = field("name").unwrap_or_else(|| request.name.clone());

    store.clear_parent()?;
    creds.bind(uuid.clone(), Some(name.clone()));
    store.save_credentials(creds)?;
    tracing::info!(conversation = %uuid, "Created conversation");
    Ok((uuid, name))
}

/// Create a conversation on the service and switch to it.
///
/// Only `201 Created` counts as success; local state is untouched otherwise.
///
/// # Errors
/// Returns `RemoteStatus` for any other status, or network/save errors.
pub async fn create<S: StateStore>(
    client: &Client,
    target: &Target,
    store: &mut S,
    creds: &mut Credentials,
    name: &str,
) -> Result<(String, String)> {
    let request = CreateRequest::new(name);
    let url = target.url(Endpoint::Create, &creds.org, &request.uuid)?;
    let response =
        match http::post_json(client, &url, &request, StatusCode::CREATED, "create").await {
            Ok(body) => body,
            // The 201 alone confirms creation; an unreadable body only loses the echo.
            Err(UncleError::UnexpectedResponse { message, .. }) => {
                tracing::debug!(%message, "Create body is not JSON; keeping the requested id");
                Value::Null
            }
            Err(e) => return Err(e),
        };
    adopt_created(store, creds, &request, &response)
}

// =============================================================================
// List
// =============================================================================

/// Fetch all conversations, cache the raw listing, and return them newest first.
///
/// # Errors
/// Returns error on a failed request or a body that is not an array.
pub async fn list<S: StateStore>(
    client: &Client,
    target: &Target,
    store: &mut S,
    creds: &Credentials,
) -> Result<Vec<ConversationRecord>> {
    let conversation = creds.active_conversation().unwrap_or_default();
    let url = target.url(Endpoint::List, &creds.org, conversation)?;
    let body = http::get_json(client, &url, "list").await?;
    let Value::Array(raw) = body else {
        return Err(UncleError::UnexpectedResponse {
            operation: "list",
            message: "expected a JSON array".to_string(),
        });
    };
    store.save_listing(&raw)?;
    tracing::debug!(count = raw.len(), "Cached conversation listing");
    Ok(newest_first(parse_listing(&raw)))
}

// =============================================================================
// Query
// =============================================================================

/// Body of a completion request.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub prompt: String,
    pub parent_message_uuid: String,
    pub timezone: String,
    pub attachments: Vec<Value>,
    pub files: Vec<Value>,
    pub rendering_mode: &'static str,
}

impl QueryRequest {
    #[must_use]
    pub fn new(prompt: impl Into<String>, parent: Uuid, timezone: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            parent_message_uuid: parent.hyphenated().to_string(),
            timezone: timezone.into(),
            attachments: Vec::new(),
            files: Vec::new(),
            rendering_mode: "raw",
        }
    }
}

/// Open the completion stream for a prompt.
///
/// # Errors
/// Returns `NoConversation` when unbound, `RemoteStatus` on a non-200 answer.
pub async fn query(
    client: &Client,
    target: &Target,
    creds: &Credentials,
    state: &ConversationState,
    prompt: &str,
) -> Result<reqwest::Response> {
    let parent = state.parent_for_query()?;
    let conversation = creds.active_conversation().unwrap_or_default();
    let url = target.url(Endpoint::Query, &creds.org, conversation)?;
    let request = QueryRequest::new(prompt, parent, target.timezone.clone());
    tracing::info!(conversation, %parent, "Sending prompt");
    http::post_stream(client, &url, &request, "query").await
}

// =============================================================================
// Parent refresh
// =============================================================================

/// The leaf message of a fetched conversation, else its top-level id.
#[must_use]
pub fn leaf_from_conversation(body: &Value) -> Option<Uuid> {
    ["current_leaf_message_uuid", "uuid"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str).and_then(parse_parent))
}

/// Re-fetch the conversation and store its leaf as the next parent.
///
/// On failure the previous pointer stays in place.
///
/// # Errors
/// Returns error on a failed request, a body without a usable id, or a failed save.
pub async fn refresh_parent<S: StateStore>(
    client: &Client,
    target: &Target,
    store: &mut S,
    creds: &Credentials,
) -> Result<Uuid> {
    let conversation = creds.active_conversation().ok_or(UncleError::NoConversation)?;
    let url = target.url(Endpoint::Conversation, &creds.org, conversation)?;
    let body = http::get_json(client, &url, "refresh").await?;
    let leaf = leaf_from_conversation(&body).ok_or_else(|| UncleError::UnexpectedResponse {
        operation: "refresh",
        message: "no leaf message id in conversation".to_string(),
    })?;
    store.save_parent(leaf)?;
    tracing::debug!(%leaf, "Refreshed parent pointer");
    Ok(leaf)
}
