use crate::error::{AgentError, Result};
use crate::traits::{Tool, ToolResult, ToolSpec};
use std::sync::Arc;
use tracing::warn;

/// Name-keyed tool table that advertises schemas in registration order.
///
/// Re-registering a name replaces the earlier tool but keeps its original
/// position in the advertised order.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => {
                warn!(tool = tool.name(), "Replacing previously registered tool");
                self.tools[idx] = tool;
            }
            None => self.tools.push(tool),
        }
    }

    pub fn extend(&mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) {
        for tool in tools {
            self.register(tool);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn schemas(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Resolves and runs a tool. A missing tool is fatal; a failing tool
    /// yields a soft error result.
    pub async fn execute(&self, name: &str, args: serde_json::Value) -> Result<ToolResult> {
        let tool = self.lookup(name).ok_or_else(|| AgentError::UnknownTool {
            name: name.to_string(),
        })?;

        match tool.execute(args).await {
            Ok(result) => Ok(result),
            Err(e) => Ok(ToolResult::error(e)),
        }
    }
}
