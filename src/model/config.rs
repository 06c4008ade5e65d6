//! Node kinds and their typed configuration payloads.
//!
//! Each node kind carries exactly one configuration shape. The pair is kept
//! in a single tagged union so handling code can match exhaustively and a
//! node's kind can never disagree with its payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FlowError;
use crate::model::ids::IdGenerator;

// ================================
// Node Kind
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Message,
    Delay,
    Condition,
    Webhook,
    AiReply,
    MassDispatch,
    TagMutation,
    Terminal,
}

impl NodeKind {
    pub const ALL: [NodeKind; 8] = [
        NodeKind::Message,
        NodeKind::Delay,
        NodeKind::Condition,
        NodeKind::Webhook,
        NodeKind::AiReply,
        NodeKind::MassDispatch,
        NodeKind::TagMutation,
        NodeKind::Terminal,
    ];

    /// Human-readable name shown on the canvas and in the node palette.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Message => "Send Message",
            NodeKind::Delay => "Delay",
            NodeKind::Condition => "Condition",
            NodeKind::Webhook => "Webhook",
            NodeKind::AiReply => "AI Reply",
            NodeKind::MassDispatch => "Mass Dispatch",
            NodeKind::TagMutation => "Tags",
            NodeKind::Terminal => "End",
        }
    }

    /// True for kinds that expose one outgoing handle per branch rule
    /// instead of the single implicit handle.
    pub fn is_branching(&self) -> bool {
        matches!(self, NodeKind::Condition)
    }

    /// True for kinds with no outgoing handles at all.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeKind::Terminal)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(|s| s.to_string()))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}

// ================================
// Message Node Config
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageConfig {
    #[serde(default = "default_template_type")]
    pub template_type: String,
    #[serde(default)]
    pub content: MessageContent,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct MessageContent {
    #[serde(default)]
    pub text: String,
}

fn default_template_type() -> String {
    "text".to_string()
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            template_type: default_template_type(),
            content: MessageContent::default(),
        }
    }
}

// ================================
// Delay Node Config
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DelayConfig {
    #[serde(default)]
    pub delay_type: DelayType,
    #[serde(default = "default_delay_duration")]
    pub duration: u64,
    #[serde(default)]
    pub unit: DelayUnit,
    #[serde(default)]
    pub exact_time: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum DelayType {
    #[default]
    Duration,
    ExactTime,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DelayUnit {
    Seconds,
    #[default]
    Minutes,
    Hours,
}

fn default_delay_duration() -> u64 {
    5
}

fn default_timezone() -> String {
    "America/Sao_Paulo".to_string()
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            delay_type: DelayType::Duration,
            duration: default_delay_duration(),
            unit: DelayUnit::Minutes,
            exact_time: String::new(),
            timezone: default_timezone(),
        }
    }
}

// ================================
// Condition Node Config
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct ConditionConfig {
    #[serde(default)]
    pub rules: Vec<ConditionRule>,
}

/// One branch of a condition node.
///
/// `next_node_id` is a cache of "which node does the edge bound to this rule
/// point at". It is recomputed by the branch engine after every structural
/// change and must never be edited directly.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConditionRule {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PredicateKind,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub expression: Option<CompiledExpression>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub custom_label: bool,
    #[serde(default)]
    pub next_node_id: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PredicateKind {
    TextContains,
    TextEquals,
    TextStartsWith,
    MessageTypeIs,
    AffirmativeReply,
    NegativeReply,
    AlwaysTrue,
}

/// Legal options for the `message-type-is` predicate, in coercion order:
/// an out-of-set value normalizes to the first entry.
pub const MESSAGE_TYPE_OPTIONS: &[&str] = &[
    "text", "image", "audio", "video", "document", "location", "contact", "sticker",
];

/// What shape of value a predicate kind accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueContract {
    /// The kind takes no value; it is resolved structurally by the runtime.
    None,
    /// Free text entered by the user.
    FreeText,
    /// One of a closed option set.
    Enumerated(&'static [&'static str]),
}

impl PredicateKind {
    pub fn value_contract(&self) -> ValueContract {
        match self {
            PredicateKind::TextContains
            | PredicateKind::TextEquals
            | PredicateKind::TextStartsWith => ValueContract::FreeText,
            PredicateKind::MessageTypeIs => ValueContract::Enumerated(MESSAGE_TYPE_OPTIONS),
            PredicateKind::AffirmativeReply
            | PredicateKind::NegativeReply
            | PredicateKind::AlwaysTrue => ValueContract::None,
        }
    }
}

impl std::fmt::Display for PredicateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(|s| s.to_string()))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}

/// Compiled form of a rule predicate, consumed by the execution runtime.
///
/// Kinds without a value contract compile to no expression at all; the
/// runtime resolves those branches structurally.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CompiledExpression {
    Contains { text: String },
    Equals { text: String },
    StartsWith { text: String },
    MessageTypeIs { value: String },
}

// ================================
// Webhook Node Config
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    #[serde(default = "default_webhook_method")]
    pub method: HttpMethod,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: Vec<KeyValuePair>,
    #[serde(default)]
    pub payload: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(|s| s.to_string()))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
}

fn default_webhook_method() -> HttpMethod {
    HttpMethod::Post
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            method: HttpMethod::Post,
            url: String::new(),
            headers: Vec::new(),
            payload: String::new(),
        }
    }
}

// ================================
// AI Reply Node Config
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct AiReplyConfig {
    #[serde(default)]
    pub prompt: String,
}

// ================================
// Mass Dispatch Node Config
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MassDispatchConfig {
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub numbers: Vec<String>,
    #[serde(default)]
    pub uploaded_file: Option<String>,
    #[serde(default)]
    pub schedule_enabled: bool,
    #[serde(default)]
    pub schedule_date: String,
    #[serde(default)]
    pub schedule_time: String,
    #[serde(default = "default_timezone")]
    pub schedule_timezone: String,
    #[serde(default)]
    pub auto_start: bool,
    #[serde(default)]
    pub settings: DispatchSettings,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSettings {
    #[serde(default)]
    pub speed: DispatchSpeed,
    #[serde(default)]
    pub personalization: bool,
    #[serde(default)]
    pub auto_delete: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispatchSpeed {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            speed: DispatchSpeed::Normal,
            personalization: false,
            auto_delete: false,
        }
    }
}

impl Default for MassDispatchConfig {
    fn default() -> Self {
        Self {
            template_id: String::new(),
            template: String::new(),
            numbers: Vec::new(),
            uploaded_file: None,
            schedule_enabled: false,
            schedule_date: String::new(),
            schedule_time: String::new(),
            schedule_timezone: default_timezone(),
            auto_start: false,
            settings: DispatchSettings::default(),
        }
    }
}

// ================================
// Tag Mutation Node Config
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct TagMutationConfig {
    #[serde(default)]
    pub apply: Vec<String>,
    #[serde(default)]
    pub remove: Vec<String>,
}

// ================================
// Terminal Node Config
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct TerminalConfig {}

// ================================
// Tagged Union + Factory
// ================================

/// Kind-specific node configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeConfig {
    Message(MessageConfig),
    Delay(DelayConfig),
    Condition(ConditionConfig),
    Webhook(WebhookConfig),
    AiReply(AiReplyConfig),
    MassDispatch(MassDispatchConfig),
    TagMutation(TagMutationConfig),
    Terminal(TerminalConfig),
}

impl NodeConfig {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeConfig::Message(_) => NodeKind::Message,
            NodeConfig::Delay(_) => NodeKind::Delay,
            NodeConfig::Condition(_) => NodeKind::Condition,
            NodeConfig::Webhook(_) => NodeKind::Webhook,
            NodeConfig::AiReply(_) => NodeKind::AiReply,
            NodeConfig::MassDispatch(_) => NodeKind::MassDispatch,
            NodeConfig::TagMutation(_) => NodeKind::TagMutation,
            NodeConfig::Terminal(_) => NodeKind::Terminal,
        }
    }

    /// Factory contract: the default payload for a kind.
    ///
    /// Condition nodes are seeded with two example text-contains rules so a
    /// freshly dropped node already shows a usable yes/no split.
    pub fn default_for(kind: NodeKind, ids: &dyn IdGenerator) -> NodeConfig {
        match kind {
            NodeKind::Message => NodeConfig::Message(MessageConfig::default()),
            NodeKind::Delay => NodeConfig::Delay(DelayConfig::default()),
            NodeKind::Condition => NodeConfig::Condition(ConditionConfig {
                rules: vec![
                    seed_rule(ids, PredicateKind::TextContains, "yes"),
                    seed_rule(ids, PredicateKind::TextContains, "no"),
                ],
            }),
            NodeKind::Webhook => NodeConfig::Webhook(WebhookConfig::default()),
            NodeKind::AiReply => NodeConfig::AiReply(AiReplyConfig::default()),
            NodeKind::MassDispatch => NodeConfig::MassDispatch(MassDispatchConfig::default()),
            NodeKind::TagMutation => NodeConfig::TagMutation(TagMutationConfig::default()),
            NodeKind::Terminal => NodeConfig::Terminal(TerminalConfig::default()),
        }
    }

    /// Parse a persisted `data` payload for the given kind.
    ///
    /// Payload fields all carry serde defaults, so partially filled payloads
    /// from older flow versions still load; a missing payload reads as empty.
    pub fn from_value(kind: NodeKind, data: Value) -> Result<NodeConfig, FlowError> {
        let data = if data.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            data
        };
        let shape = |e: serde_json::Error| FlowError::ConfigShape {
            kind: kind.to_string(),
            message: e.to_string(),
        };
        Ok(match kind {
            NodeKind::Message => NodeConfig::Message(serde_json::from_value(data).map_err(shape)?),
            NodeKind::Delay => NodeConfig::Delay(serde_json::from_value(data).map_err(shape)?),
            NodeKind::Condition => {
                NodeConfig::Condition(serde_json::from_value(data).map_err(shape)?)
            }
            NodeKind::Webhook => NodeConfig::Webhook(serde_json::from_value(data).map_err(shape)?),
            NodeKind::AiReply => NodeConfig::AiReply(serde_json::from_value(data).map_err(shape)?),
            NodeKind::MassDispatch => {
                NodeConfig::MassDispatch(serde_json::from_value(data).map_err(shape)?)
            }
            NodeKind::TagMutation => {
                NodeConfig::TagMutation(serde_json::from_value(data).map_err(shape)?)
            }
            NodeKind::Terminal => {
                NodeConfig::Terminal(serde_json::from_value(data).map_err(shape)?)
            }
        })
    }

    /// Serialize back to the persisted `data` payload.
    pub fn to_value(&self) -> Value {
        let value = match self {
            NodeConfig::Message(c) => serde_json::to_value(c),
            NodeConfig::Delay(c) => serde_json::to_value(c),
            NodeConfig::Condition(c) => serde_json::to_value(c),
            NodeConfig::Webhook(c) => serde_json::to_value(c),
            NodeConfig::AiReply(c) => serde_json::to_value(c),
            NodeConfig::MassDispatch(c) => serde_json::to_value(c),
            NodeConfig::TagMutation(c) => serde_json::to_value(c),
            NodeConfig::Terminal(c) => serde_json::to_value(c),
        };
        value.unwrap_or(Value::Null)
    }
}

fn seed_rule(ids: &dyn IdGenerator, kind: PredicateKind, value: &str) -> ConditionRule {
    ConditionRule {
        id: ids.next_id(),
        kind,
        value: value.to_string(),
        expression: crate::branch::compile(kind, value),
        label: crate::branch::derived_label(kind, value),
        custom_label: false,
        next_node_id: None,
    }
}
