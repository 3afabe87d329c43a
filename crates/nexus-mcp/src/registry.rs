//! Tools, resources, and prompts (spec §4.4, component C5).

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use nexus_core::{ErrorKind, NexusError, Result};
use serde_json::Value;

/// Safety annotations a client uses to decide whether to prompt its user
/// before invoking a tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolAnnotations {
    pub read_only: bool,
    pub destructive: bool,
    pub idempotent: bool,
}

impl ToolAnnotations {
    pub const fn read_only() -> Self {
        Self {
            read_only: true,
            destructive: false,
            idempotent: true,
        }
    }

    pub const fn destructive() -> Self {
        Self {
            read_only: false,
            destructive: true,
            idempotent: false,
        }
    }

    pub const fn mutating() -> Self {
        Self {
            read_only: false,
            destructive: false,
            idempotent: false,
        }
    }
}

/// A tool's outcome: either a JSON result (pretty-printed for the client)
/// or a plain-text refusal/explanation. Spec §4.4: "both are successful
/// protocol responses — errors are conveyed as content, never as transport
/// failures".
pub enum ToolOutcome {
    Json(Value),
    Text(String),
}

impl ToolOutcome {
    pub fn text(message: impl Into<String>) -> Self {
        Self::Text(message.into())
    }

    /// Renders the outcome as the single text block the MCP wire format
    /// expects in a tool result's `content` array.
    pub fn into_text_block(self) -> String {
        match self {
            ToolOutcome::Json(value) => {
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
            }
            ToolOutcome::Text(text) => text,
        }
    }
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Value) -> Result<ToolOutcome>;
}

#[async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<ToolOutcome>> + Send,
{
    async fn call(&self, args: Value) -> Result<ToolOutcome> {
        (self)(args).await
    }
}

pub struct Tool {
    pub name: &'static str,
    pub description: &'static str,
    pub annotations: ToolAnnotations,
    pub handler: Arc<dyn ToolHandler>,
}

#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn read(&self) -> Value;
}

#[async_trait]
impl<F, Fut> ResourceHandler for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Value> + Send,
{
    async fn read(&self) -> Value {
        (self)().await
    }
}

pub struct Resource {
    pub uri: &'static str,
    pub mime: &'static str,
    pub handler: Arc<dyn ResourceHandler>,
}

#[derive(Debug, Clone)]
pub struct PromptMessage {
    pub role: &'static str,
    pub text: String,
}

#[async_trait]
pub trait PromptHandler: Send + Sync {
    async fn build(&self) -> Vec<PromptMessage>;
}

#[async_trait]
impl<F, Fut> PromptHandler for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Vec<PromptMessage>> + Send,
{
    async fn build(&self) -> Vec<PromptMessage> {
        (self)().await
    }
}

pub struct Prompt {
    pub name: &'static str,
    pub description: &'static str,
    pub handler: Arc<dyn PromptHandler>,
}

/// Holds the three registered collections. Registration happens once at
/// startup; a name collision in any collection is a `FatalStartup` error
/// (spec §7.6), since it indicates two parts of the binary trying to own
/// the same tool/resource/prompt name.
#[derive(Default)]
pub struct Registry {
    tools: BTreeMap<&'static str, Tool>,
    resources: BTreeMap<&'static str, Resource>,
    prompts: BTreeMap<&'static str, Prompt>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tool(&mut self, tool: Tool) -> Result<()> {
        if self.tools.contains_key(tool.name) {
            return Err(NexusError::new(
                ErrorKind::FatalStartup,
                format!("duplicate tool registration: {}", tool.name),
            ));
        }
        self.tools.insert(tool.name, tool);
        Ok(())
    }

    pub fn register_resource(&mut self, resource: Resource) -> Result<()> {
        if self.resources.contains_key(resource.uri) {
            return Err(NexusError::new(
                ErrorKind::FatalStartup,
                format!("duplicate resource registration: {}", resource.uri),
            ));
        }
        self.resources.insert(resource.uri, resource);
        Ok(())
    }

    pub fn register_prompt(&mut self, prompt: Prompt) -> Result<()> {
        if self.prompts.contains_key(prompt.name) {
            return Err(NexusError::new(
                ErrorKind::FatalStartup,
                format!("duplicate prompt registration: {}", prompt.name),
            ));
        }
        self.prompts.insert(prompt.name, prompt);
        Ok(())
    }

    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn resource(&self, uri: &str) -> Option<&Resource> {
        self.resources.get(uri)
    }

    pub fn prompt(&self, name: &str) -> Option<&Prompt> {
        self.prompts.get(name)
    }

    pub fn tools(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values()
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn prompts(&self) -> impl Iterator<Item = &Prompt> {
        self.prompts.values()
    }
}
