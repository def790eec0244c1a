//! Bridges rig-core's `CompletionModel` to our `LlmProvider` trait.

use async_trait::async_trait;
use rig::completion::{
    CompletionModel, CompletionRequestBuilder, ToolDefinition as RigToolDefinition,
};
use rig::message::{AssistantContent, Message, ToolChoice, ToolResultContent, UserContent};
use rig::one_or_many::OneOrMany;
use rust_decimal::Decimal;

use crate::error::LlmError;
use crate::llm::costs;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role, ToolCall,
    ToolCompletionRequest, ToolCompletionResponse, ToolDefinition,
};

#[derive(Debug, Clone, Copy, Default)]
struct RequestOptions {
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    require_tool_call: bool,
}

/// Adapter wrapping a rig completion model.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
}

impl<M> RigAdapter<M>
where
    M: CompletionModel + Clone + Send + Sync + 'static,
{
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
        }
    }

    /// Build the rig request. `require_tool_call` maps to a required tool
    /// choice when tools are offered.
    fn build_request(
        &self,
        messages: &[ChatMessage],
        tools: Vec<RigToolDefinition>,
        options: RequestOptions,
    ) -> Result<CompletionRequestBuilder<M>, LlmError> {
        let (preamble, mut history) = convert_messages(messages);
        let prompt = history.pop().ok_or_else(|| LlmError::InvalidResponse {
            provider: self.model_name.clone(),
            reason: "request contains no non-system messages".to_string(),
        })?;

        let mut builder = self.model.completion_request(prompt).messages(history);
        if let Some(preamble) = preamble {
            builder = builder.preamble(preamble);
        }
        if !tools.is_empty() {
            builder = builder.tools(tools);
            if options.require_tool_call {
                builder = builder.tool_choice(ToolChoice::Required);
            }
        }
        if let Some(temperature) = options.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        if let Some(max_tokens) = options.max_tokens {
            builder = builder.max_tokens(u64::from(max_tokens));
        }
        Ok(builder)
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        tools: Vec<RigToolDefinition>,
        options: RequestOptions,
    ) -> Result<(Vec<String>, Vec<ToolCall>, u32, u32), LlmError> {
        let builder = self.build_request(messages, tools, options)?;
        let response = builder.send().await.map_err(|e| LlmError::RequestFailed {
            provider: self.model_name.clone(),
            reason: e.to_string(),
        })?;

        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();
        for content in response.choice.iter() {
            match content {
                AssistantContent::Text(text) => texts.push(text.text.clone()),
                AssistantContent::ToolCall(call) => tool_calls.push(ToolCall {
                    id: call.id.clone(),
                    name: call.function.name.clone(),
                    arguments: call.function.arguments.clone(),
                }),
                _ => {}
            }
        }

        let input_tokens = u32::try_from(response.usage.input_tokens).unwrap_or(u32::MAX);
        let output_tokens = u32::try_from(response.usage.output_tokens).unwrap_or(u32::MAX);
        Ok((texts, tool_calls, input_tokens, output_tokens))
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + Clone + Send + Sync + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        costs::model_cost(&self.model_name)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let (texts, _, input_tokens, output_tokens) = self
            .send(
                &request.messages,
                Vec::new(),
                RequestOptions {
                    temperature: request.temperature,
                    max_tokens: request.max_tokens,
                    require_tool_call: false,
                },
            )
            .await?;

        Ok(CompletionResponse {
            content: texts.join("\n"),
            input_tokens,
            output_tokens,
            finish_reason: FinishReason::Stop,
            response_id: None,
        })
    }

    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse, LlmError> {
        let tools = request.tools.iter().map(to_rig_tool).collect();
        let options = RequestOptions {
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            require_tool_call: request.require_tool_call,
        };

        let (texts, tool_calls, input_tokens, output_tokens) = self
            .send(&request.messages, tools, options)
            .await?;

        let finish_reason = if tool_calls.is_empty() {
            FinishReason::Stop
        } else {
            FinishReason::ToolUse
        };
        let content = if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        };

        Ok(ToolCompletionResponse {
            content,
            tool_calls,
            input_tokens,
            output_tokens,
            finish_reason,
            response_id: None,
        })
    }
}

fn to_rig_tool(tool: &ToolDefinition) -> RigToolDefinition {
    RigToolDefinition {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters: tool.parameters.clone(),
    }
}

/// Split system messages into a preamble and convert the rest to rig messages.
fn convert_messages(messages: &[ChatMessage]) -> (Option<String>, Vec<Message>) {
    let mut system_parts = Vec::new();
    let mut history = Vec::with_capacity(messages.len());

    for msg in messages {
        match msg.role {
            Role::System => system_parts.push(msg.content.clone()),
            Role::User => history.push(Message::user(msg.content.clone())),
            Role::Assistant if msg.calls().is_empty() => {
                history.push(Message::assistant(msg.content.clone()));
            }
            Role::Assistant => {
                let mut content = Vec::with_capacity(msg.calls().len() + 1);
                if !msg.content.is_empty() {
                    content.push(AssistantContent::text(msg.content.clone()));
                }
                for call in msg.calls() {
                    content.push(AssistantContent::tool_call(
                        call.id.clone(),
                        call.name.clone(),
                        call.arguments.clone(),
                    ));
                }
                if let Ok(content) = OneOrMany::many(content) {
                    history.push(Message::Assistant { id: None, content });
                }
            }
            Role::Tool => {
                let id = msg.tool_call_id.clone().unwrap_or_default();
                history.push(Message::User {
                    content: OneOrMany::one(UserContent::tool_result(
                        id,
                        OneOrMany::one(ToolResultContent::text(msg.content.clone())),
                    )),
                });
            }
        }
    }

    let preamble = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };
    (preamble, history)
}
