// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

//! HTTP client for communicating with the engine API

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EngineClient {
    client: Client,
    base_url: String,
}

/// Agent record as served by the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentInfo {
    pub id: Uuid,
    pub name: String,
    pub protocol: String,
    pub trust_score: f64,
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentInfo {
    pub task_id: Uuid,
    pub agent: AgentInfo,
    pub status: String,
}

/// Reassignment outcome; `new_agent` and `reason` are present only when
/// `status` is `reassigned`.
#[derive(Debug, Deserialize)]
pub struct ReassignmentInfo {
    pub status: String,
    #[serde(default)]
    pub new_agent: Option<AgentInfo>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustmentsInfo {
    pub delayed_penalty: f64,
    pub sla_bonus: f64,
    pub triggers_applied: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecalculationInfo {
    pub agent_id: Uuid,
    pub trust_score: f64,
    pub previous_score: f64,
    pub delta: f64,
    pub adjustments: AdjustmentsInfo,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct DeltaInfo {
    pub agent_id: Uuid,
    pub trust_score: f64,
    pub requested_delta: f64,
    pub applied_delta: f64,
}

#[derive(Debug, Deserialize)]
pub struct FlaggedAgentInfo {
    pub agent_id: Uuid,
    pub agent_name: String,
    pub occurrences: u32,
    pub current_score: f64,
}

#[derive(Debug, Deserialize)]
pub struct AuditReportInfo {
    pub flagged_agents: Vec<FlaggedAgentInfo>,
    pub threshold: f64,
}

#[derive(Debug, Deserialize)]
pub struct WindowInfo {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
}

#[derive(Debug, Deserialize)]
pub struct TrendInfo {
    pub agent_id: Uuid,
    pub current_score: f64,
    pub series_len: usize,
    pub windows: Vec<WindowInfo>,
}

#[derive(Debug, Deserialize)]
pub struct HealthInfo {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub uptime_secs: Option<u64>,
}

impl EngineClient {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::from_base_url(format!("http://{}:{}", host, port))
    }

    pub fn from_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub async fn health(&self) -> Result<HealthInfo> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .context("Failed to reach engine")?;

        if !response.status().is_success() {
            anyhow::bail!("Engine unhealthy: {}", error_message(response).await);
        }

        response.json().await.context("Failed to parse health response")
    }

    pub async fn register_agent(
        &self,
        name: &str,
        protocol: &str,
        trust_score: Option<f64>,
    ) -> Result<AgentInfo> {
        #[derive(Serialize)]
        struct RegisterRequest<'a> {
            name: &'a str,
            protocol: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            trust_score: Option<f64>,
        }

        let response = self
            .client
            .post(format!("{}/api/agents", self.base_url))
            .json(&RegisterRequest {
                name,
                protocol,
                trust_score,
            })
            .send()
            .await
            .context("Failed to register agent")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Failed to register agent: {}",
                error_message(response).await
            );
        }

        response.json().await.context("Failed to parse agent response")
    }

    pub async fn list_agents(&self) -> Result<Vec<AgentInfo>> {
        let response = self
            .client
            .get(format!("{}/api/agents", self.base_url))
            .send()
            .await
            .context("Failed to list agents")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to list agents: {}", error_message(response).await);
        }

        response.json().await.context("Failed to parse agent list")
    }

    pub async fn get_agent(&self, agent_id: Uuid) -> Result<AgentInfo> {
        let response = self
            .client
            .get(format!("{}/api/agents/{}", self.base_url, agent_id))
            .send()
            .await
            .context("Failed to get agent")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to get agent: {}", error_message(response).await);
        }

        response.json().await.context("Failed to parse agent response")
    }

    pub async fn assign_task(
        &self,
        protocol: &str,
        task_type: &str,
        payload: serde_json::Value,
    ) -> Result<AssignmentInfo> {
        #[derive(Serialize)]
        struct AssignRequest<'a> {
            protocol: &'a str,
            task_type: &'a str,
            payload: serde_json::Value,
        }

        let response = self
            .client
            .post(format!("{}/api/tasks/assign", self.base_url))
            .json(&AssignRequest {
                protocol,
                task_type,
                payload,
            })
            .send()
            .await
            .context("Failed to assign task")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to assign task: {}", error_message(response).await);
        }

        response
            .json()
            .await
            .context("Failed to parse assignment response")
    }

    pub async fn reassign_task(&self, task_id: Uuid) -> Result<ReassignmentInfo> {
        let response = self
            .client
            .post(format!("{}/api/tasks/{}/reassign", self.base_url, task_id))
            .send()
            .await
            .context("Failed to reassign task")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to reassign task: {}", error_message(response).await);
        }

        response
            .json()
            .await
            .context("Failed to parse reassignment response")
    }

    pub async fn recalculate_trust(&self, agent_id: Uuid) -> Result<RecalculationInfo> {
        #[derive(Serialize)]
        struct RecalculateRequest {
            agent_id: Uuid,
        }

        let response = self
            .client
            .post(format!("{}/api/trust/recalculate", self.base_url))
            .json(&RecalculateRequest { agent_id })
            .send()
            .await
            .context("Failed to recalculate trust")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Failed to recalculate trust: {}",
                error_message(response).await
            );
        }

        response
            .json()
            .await
            .context("Failed to parse recalculation response")
    }

    pub async fn apply_trust_delta(
        &self,
        agent_id: Uuid,
        delta: f64,
        reason: Option<&str>,
    ) -> Result<DeltaInfo> {
        #[derive(Serialize)]
        struct DeltaRequest<'a> {
            agent_id: Uuid,
            delta: f64,
            #[serde(skip_serializing_if = "Option::is_none")]
            reason: Option<&'a str>,
        }

        let response = self
            .client
            .post(format!("{}/api/trust/delta", self.base_url))
            .json(&DeltaRequest {
                agent_id,
                delta,
                reason,
            })
            .send()
            .await
            .context("Failed to apply trust delta")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Failed to apply trust delta: {}",
                error_message(response).await
            );
        }

        response.json().await.context("Failed to parse delta response")
    }

    pub async fn run_audit(&self, threshold: Option<f64>) -> Result<AuditReportInfo> {
        #[derive(Serialize)]
        struct AuditRequest {
            #[serde(skip_serializing_if = "Option::is_none")]
            threshold: Option<f64>,
        }

        let response = self
            .client
            .post(format!("{}/api/trust/audit", self.base_url))
            .json(&AuditRequest { threshold })
            .send()
            .await
            .context("Failed to run trust audit")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to run trust audit: {}", error_message(response).await);
        }

        response.json().await.context("Failed to parse audit report")
    }

    pub async fn trend(&self, agent_id: Uuid, freq: usize, window: usize) -> Result<TrendInfo> {
        let response = self
            .client
            .get(format!(
                "{}/api/trust/{}/trend?freq={}&window={}",
                self.base_url, agent_id, freq, window
            ))
            .send()
            .await
            .context("Failed to fetch trust trend")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Failed to fetch trust trend: {}",
                error_message(response).await
            );
        }

        response.json().await.context("Failed to parse trend response")
    }
}

/// Pull the `error` field out of an engine error body, falling back to the
/// raw text.
async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(value) => value
            .get("error")
            .and_then(|e| e.as_str())
            .map(str::to_string)
            .unwrap_or(body),
        Err(_) if body.is_empty() => status.to_string(),
        Err(_) => body,
    }
}
