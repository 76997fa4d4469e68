use crate::{
    error::{ErrorResponse, EstimationError},
    estimator::{EstimationRequest, Estimator},
    types::EstimationResult,
};
use rmcp::{
    handler::server::tool::IntoCallToolResult, model::{CallToolResult, Content, ServerCapabilities, ServerInfo}, tool, Error as McpError, ServerHandler
};
use serde::Serialize;
use ts_rs::TS;
use std::sync::Arc;

/// Tool output: the estimation record or the client-facing error body
#[derive(Debug, Serialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum EstimateResponse {
    Estimate(EstimationResult),
    Error(ErrorResponse),
}

impl From<Result<EstimationResult, EstimationError>> for EstimateResponse {
    fn from(result: Result<EstimationResult, EstimationError>) -> Self {
        match result {
            Ok(estimate) => Self::Estimate(estimate),
            Err(err) => Self::Error(err.to_response()),
        }
    }
}

impl IntoCallToolResult for EstimateResponse {
    fn into_call_tool_result(self) -> Result<CallToolResult, McpError> {
        let body = serde_json::to_string_pretty(&self).unwrap_or_else(|_| format!("{:?}", self));
        Ok(match self {
            Self::Estimate(_) => CallToolResult::success(vec![Content::text(body)]),
            Self::Error(_) => CallToolResult::error(vec![Content::text(body)]),
        })
    }
}

/// MCP Server for body-fat estimation
#[derive(Clone)]
pub struct BodyFatMcpServer {
    estimator: Arc<Estimator>,
}

impl BodyFatMcpServer {
    pub fn new(estimator: Estimator) -> Self {
        Self { estimator: Arc::new(estimator) }
    }

    pub fn estimator(&self) -> &Arc<Estimator> {
        &self.estimator
    }
}

impl Default for BodyFatMcpServer {
    fn default() -> Self {
        Self::new(Estimator::default())
    }
}

#[tool(tool_box)]
impl BodyFatMcpServer {
    #[tool(description = "Estimate body-fat percentage and fitness classification from a full-body photo and the subject's sex, age, height and weight")]
    async fn estimate_body_fat(&self, #[tool(aggr)] request: EstimationRequest) -> EstimateResponse {
        let estimator = Arc::clone(&self.estimator);
        match tokio::task::spawn_blocking(move || estimator.estimate(&request)).await {
            Ok(result) => result.into(),
            Err(e) => {
                tracing::error!("estimation task failed: {e}");
                EstimateResponse::Error(ErrorResponse::internal())
            }
        }
    }

    #[tool(description = "Get the body-fat thresholds used for classification, per sex and age band")]
    fn get_classification_table(&self) -> String {
        let table = self.estimator.classifier().config();
        serde_json::to_string_pretty(table)
            .unwrap_or_else(|e| format!("Failed to serialize classification table: {}", e))
    }

    #[tool(description = "Get the JSON schema for estimate_body_fat requests")]
    fn get_request_schema(&self) -> String {
        let schema = EstimationRequest::schema();
        serde_json::to_string_pretty(&schema)
            .unwrap_or_else(|e| format!("Failed to serialize schema: {}", e))
    }
}

#[tool(tool_box)]
impl ServerHandler for BodyFatMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("Body Fat Estimation Server - Estimate body-fat percentage from a single full-body photo plus sex, age, height and weight. Results are educational estimates, not clinical assessments.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
