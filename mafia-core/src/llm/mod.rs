//! Claude-backed decision oracle.
//!
//! Each decision is one stateless completion: the system prompt carries the
//! rules and the role briefing, the user prompt carries the player's context
//! snapshot, and the model must answer through the forced `decide` tool.
//! Conversation history is never kept here; it is re-rendered from the
//! knowledge store every time.

mod prompt;
mod tools;

pub use prompt::{system_prompt, user_prompt};
pub use tools::{decide_tool, parse_decision, DECIDE_TOOL};

use crate::config::OracleConfig;
use crate::oracle::{Decision, DecisionContext, DecisionOracle, OracleError};
use crate::roles::Role;
use async_trait::async_trait;
use claude::{Claude, Message, Request};
use tracing::debug;

/// An oracle that asks Claude.
pub struct ClaudeOracle {
    client: Claude,
    config: OracleConfig,
}

impl ClaudeOracle {
    pub fn new(client: Claude, config: OracleConfig) -> Self {
        Self { client, config }
    }

    /// Build from `ANTHROPIC_API_KEY` with default settings.
    pub fn from_env() -> Result<Self, OracleError> {
        Ok(Self::new(Claude::from_env()?, OracleConfig::default()))
    }

    pub fn with_config(mut self, config: OracleConfig) -> Self {
        self.config = config;
        self
    }

    fn request(&self, role: Role, context: &DecisionContext) -> Request {
        let mut request = Request::new(vec![Message::user(user_prompt(role, context))])
            .with_system(system_prompt(&context.me.name, role))
            .with_max_tokens(self.config.max_tokens)
            .forcing_tool(decide_tool());
        if let Some(model) = &self.config.model {
            request = request.with_model(model.clone());
        }
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }
        request
    }
}

#[async_trait]
impl DecisionOracle for ClaudeOracle {
    async fn decide(&self, role: Role, context: &DecisionContext) -> Result<Decision, OracleError> {
        let response = self.client.complete(self.request(role, context)).await?;
        debug!(
            player = %context.me.name,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Claude responded"
        );

        if response.refused() {
            return Err(OracleError::Refused(response.text()));
        }
        let input = response.tool_input(DECIDE_TOOL).ok_or_else(|| {
            OracleError::Malformed(format!("no {DECIDE_TOOL} call in response: {}", response.text()))
        })?;
        parse_decision(input, context.phase, role)
    }
}
