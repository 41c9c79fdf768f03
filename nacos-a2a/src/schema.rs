//! A2A protocol schema types.
//!
//! Agent cards and messages as exchanged on the wire. Field names are
//! camelCase, as in the A2A protocol documents.

use serde::{Deserialize, Serialize};

/// A2A protocol version advertised in agent cards.
pub const PROTOCOL_VERSION: &str = "0.3.0";

/// Agent card describing an agent and how to reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    /// Protocol version the agent speaks.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    /// Unique agent name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Primary endpoint URL.
    pub url: String,
    /// Transport served at `url`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_transport: Option<String>,
    /// Further endpoints and their transports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_interfaces: Vec<AgentInterface>,
    /// Icon URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// Organization providing the agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<AgentProvider>,
    /// Agent version.
    pub version: String,
    /// Documentation URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
    /// Optional protocol features.
    #[serde(default)]
    pub capabilities: AgentCapabilities,
    /// Security scheme definitions, keyed by scheme name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_schemes: Option<serde_json::Map<String, serde_json::Value>>,
    /// Security requirements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<serde_json::Value>,
    /// Accepted input media types.
    #[serde(default)]
    pub default_input_modes: Vec<String>,
    /// Produced output media types.
    #[serde(default)]
    pub default_output_modes: Vec<String>,
    /// Skills the agent offers.
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
}

fn default_protocol_version() -> String {
    PROTOCOL_VERSION.to_string()
}

impl AgentCard {
    /// Every (transport, url) pair the card advertises, preferred first.
    pub fn interfaces(&self) -> Vec<AgentInterface> {
        let mut interfaces = Vec::with_capacity(1 + self.additional_interfaces.len());
        if let Some(transport) = &self.preferred_transport {
            interfaces.push(AgentInterface::new(transport.clone(), self.url.clone()));
        }
        for interface in &self.additional_interfaces {
            if !interfaces.contains(interface) {
                interfaces.push(interface.clone());
            }
        }
        interfaces
    }
}

/// A transport and the URL serving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInterface {
    /// Endpoint URL.
    pub url: String,
    /// Transport name, e.g. `JSONRPC`.
    pub transport: String,
}

impl AgentInterface {
    /// Create an interface.
    pub fn new(transport: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            transport: transport.into(),
        }
    }
}

/// Organization providing an agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProvider {
    /// Organization name.
    pub organization: String,
    /// Organization URL.
    #[serde(default)]
    pub url: String,
}

/// Optional protocol features an agent supports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    /// Server-sent event streaming.
    #[serde(default)]
    pub streaming: bool,
    /// Push notifications.
    #[serde(default)]
    pub push_notifications: bool,
    /// Task state transition history.
    #[serde(default)]
    pub state_transition_history: bool,
}

/// A skill an agent can perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// What the skill does.
    #[serde(default)]
    pub description: String,
    /// Tags for categorization.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Example prompts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    /// Input modes overriding the card defaults.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_modes: Vec<String>,
    /// Output modes overriding the card defaults.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_modes: Vec<String>,
}

impl AgentSkill {
    /// Create a skill.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
            examples: Vec::new(),
            input_modes: Vec::new(),
            output_modes: Vec::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// A message in the A2A protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Object discriminator, always `message`.
    #[serde(default = "message_kind")]
    pub kind: String,
    /// Unique message identifier.
    pub message_id: String,
    /// Sender role.
    pub role: Role,
    /// Content parts.
    pub parts: Vec<Part>,
    /// Conversation the message belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    /// Task the message belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Free-form metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

fn message_kind() -> String {
    "message".to_string()
}

impl Message {
    /// Create a message with a fresh identifier.
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self {
            kind: message_kind(),
            message_id: uuid::Uuid::new_v4().to_string(),
            role,
            parts,
            context_id: None,
            task_id: None,
            metadata: None,
        }
    }

    /// Create a user message with text content.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    /// Create an agent message with text content.
    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Role::Agent, vec![Part::text(text)])
    }

    /// Bind the message to a task and its context.
    #[must_use]
    pub fn in_task(mut self, task_id: impl Into<String>, context_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self.context_id = Some(context_id.into());
        self
    }

    /// Concatenated text of all text parts.
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(TextPart { text }) => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message from a client.
    User,
    /// Message from the agent.
    Agent,
}

/// A part of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    /// Text content.
    Text(TextPart),
    /// Structured data.
    Data(DataPart),
    /// File content, inline or by reference.
    File(FilePart),
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(TextPart { text: text.into() })
    }

    /// Create a data part.
    pub fn data(data: serde_json::Value) -> Self {
        Part::Data(DataPart { data })
    }
}

/// Text content part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPart {
    /// The text.
    pub text: String,
}

/// Structured data part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPart {
    /// The payload.
    pub data: serde_json::Value,
}

/// File part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePart {
    /// The file.
    pub file: FileContent,
}

/// File content: base64 bytes or a URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    /// File name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Media type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Base64-encoded content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<String>,
    /// Location of the content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}
