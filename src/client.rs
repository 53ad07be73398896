//! Typed client for the `calorie_tracker/*` RPC messages and the host-native
//! messages the panel reuses.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::dates::format_date;
use crate::error::{ClientError, ClientResult};
use crate::hass::HassConnection;
use crate::models::{
    AssistPipeline, ConversationAgent, DailyData, DiscoveredComponent, EntryKind, Goal,
    LinkedComponent, NewEntry, ProfileUpdate, UserProfiles, WeeklySummary, decode_data_dates,
};

/// Reply of `auth/current_user`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Speech and conversation id from `conversation/process`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationReply {
    pub speech: String,
    pub conversation_id: Option<String>,
}

impl ConversationReply {
    fn decode(value: &Value) -> Self {
        let speech = value
            .pointer("/response/speech/plain/speech")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let conversation_id = value
            .get("conversation_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            speech,
            conversation_id,
        }
    }
}

#[derive(Clone)]
pub struct CalorieClient {
    conn: Arc<dyn HassConnection>,
}

impl CalorieClient {
    pub fn new(conn: Arc<dyn HassConnection>) -> Self {
        Self { conn }
    }

    async fn send(&self, command: Value) -> ClientResult<Value> {
        debug!(command_type = ?command.get("type"), "calling");
        self.conn.call(command).await
    }

    async fn send_typed<T: for<'de> Deserialize<'de>>(&self, command: Value) -> ClientResult<T> {
        let value = self.send(command).await?;
        Ok(serde_json::from_value(value)?)
    }

    // ==================== Host-native ====================

    pub async fn current_user(&self) -> ClientResult<CurrentUser> {
        self.send_typed(json!({ "type": "auth/current_user" })).await
    }

    pub async fn list_conversation_agents(&self) -> ClientResult<Vec<ConversationAgent>> {
        let value = self
            .send(json!({ "type": "conversation/agent/list" }))
            .await?;
        let agents = value.get("agents").cloned().unwrap_or(value);
        Ok(serde_json::from_value(agents)?)
    }

    pub async fn process_conversation(
        &self,
        text: &str,
        agent_id: &str,
        conversation_id: Option<&str>,
    ) -> ClientResult<ConversationReply> {
        let mut command = json!({
            "type": "conversation/process",
            "text": text,
            "agent_id": agent_id,
        });
        if let (Some(id), Some(object)) = (conversation_id, command.as_object_mut()) {
            object.insert("conversation_id".into(), json!(id));
        }
        let value = self.send(command).await?;
        Ok(ConversationReply::decode(&value))
    }

    pub async fn list_pipelines(&self) -> ClientResult<Vec<AssistPipeline>> {
        let value = self
            .send(json!({ "type": "assist_pipeline/pipeline/list" }))
            .await?;
        let pipelines = value.get("pipelines").cloned().unwrap_or(value);
        Ok(serde_json::from_value(pipelines)?)
    }

    // ==================== Reads ====================

    pub async fn get_user_profile(&self, user_id: &str) -> ClientResult<UserProfiles> {
        self.send_typed(json!({
            "type": "calorie_tracker/get_user_profile",
            "user_id": user_id,
        }))
        .await
    }

    pub async fn get_daily_data(
        &self,
        entity_id: &str,
        date: Option<NaiveDate>,
    ) -> ClientResult<DailyData> {
        self.send_typed(with_date(
            json!({ "type": "calorie_tracker/get_daily_data", "entity_id": entity_id }),
            date,
        ))
        .await
    }

    /// Weekly summary for the week containing `date`. Days without a goal
    /// fall back to `default_goal`.
    pub async fn get_weekly_summary(
        &self,
        entity_id: &str,
        date: Option<NaiveDate>,
        default_goal: f64,
    ) -> ClientResult<WeeklySummary> {
        let value = self
            .send(with_date(
                json!({ "type": "calorie_tracker/get_weekly_summary", "entity_id": entity_id }),
                date,
            ))
            .await?;
        let raw = value.get("weekly_summary").unwrap_or(&Value::Null);
        Ok(WeeklySummary::decode(raw, default_goal))
    }

    pub async fn get_linked_components(&self, entity_id: &str) -> ClientResult<Vec<LinkedComponent>> {
        let value = self
            .send(json!({ "type": "calorie_tracker/get_linked_components", "entity_id": entity_id }))
            .await?;
        Ok(LinkedComponent::decode_all(&value))
    }

    pub async fn get_goals(&self, entity_id: &str) -> ClientResult<Vec<Goal>> {
        let value = self
            .send(json!({ "type": "calorie_tracker/get_goals", "entity_id": entity_id }))
            .await?;
        let goals = value.get("goals").cloned().unwrap_or(value);
        Ok(serde_json::from_value(goals)?)
    }

    pub async fn get_discovered_data(&self) -> ClientResult<Vec<DiscoveredComponent>> {
        let value = self
            .send(json!({ "type": "calorie_tracker/get_discovered_data" }))
            .await?;
        Ok(DiscoveredComponent::decode_all(&value))
    }

    pub async fn get_month_data_days(
        &self,
        entity_id: &str,
        year: i32,
        month: u32,
    ) -> ClientResult<BTreeSet<NaiveDate>> {
        let value = self
            .send(json!({
                "type": "calorie_tracker/get_month_data_days",
                "entity_id": entity_id,
                "year": year,
                "month": month,
            }))
            .await?;
        Ok(decode_data_dates(&value))
    }

    // ==================== Mutations ====================

    pub async fn create_entry(&self, entity_id: &str, entry: &NewEntry) -> ClientResult<()> {
        let command = json!({
            "type": "calorie_tracker/create_entry",
            "entity_id": entity_id,
            "entry_type": entry.kind().as_str(),
            "entry": entry,
        });
        self.send(command).await.and_then(expect_success)
    }

    pub async fn update_entry(
        &self,
        entity_id: &str,
        entry_id: &str,
        entry: &NewEntry,
    ) -> ClientResult<()> {
        let command = json!({
            "type": "calorie_tracker/update_entry",
            "entity_id": entity_id,
            "entry_id": entry_id,
            "entry_type": entry.kind().as_str(),
            "entry": entry,
        });
        self.send(command).await.and_then(expect_success)
    }

    pub async fn delete_entry(
        &self,
        entity_id: &str,
        entry_id: &str,
        kind: EntryKind,
    ) -> ClientResult<()> {
        self.send(json!({
            "type": "calorie_tracker/delete_entry",
            "entity_id": entity_id,
            "entry_id": entry_id,
            "entry_type": kind.as_str(),
        }))
        .await
        .and_then(expect_success)
    }

    pub async fn update_profile(&self, entity_id: &str, update: &ProfileUpdate) -> ClientResult<()> {
        let mut command = serde_json::to_value(update)?;
        let Some(object) = command.as_object_mut() else {
            return Err(ClientError::Validation("profile update must be an object".into()));
        };
        object.insert("type".into(), json!("calorie_tracker/update_profile"));
        object.insert("entity_id".into(), json!(entity_id));
        self.send(command).await.and_then(expect_success)
    }

    /// Make `entity_id` the default profile of the host user `username`.
    pub async fn set_default_profile(&self, entity_id: &str, username: &str) -> ClientResult<()> {
        self.send(json!({
            "type": "calorie_tracker/update_profile",
            "entity_id": entity_id,
            "username": username,
        }))
        .await
        .and_then(expect_success)
    }

    pub async fn link_discovered_components(
        &self,
        entity_id: &str,
        components: &[DiscoveredComponent],
    ) -> ClientResult<()> {
        let items: Vec<Value> = components
            .iter()
            .map(|c| json!({ "domain": c.domain, "entry_id": c.entry_id }))
            .collect();
        self.send(json!({
            "type": "calorie_tracker/link_discovered_components",
            "entity_id": entity_id,
            "components": items,
        }))
        .await
        .and_then(expect_success)
    }

    pub async fn unlink_linked_component(
        &self,
        entity_id: &str,
        domain: &str,
        entry_id: &str,
    ) -> ClientResult<()> {
        self.send(json!({
            "type": "calorie_tracker/unlink_linked_component",
            "entity_id": entity_id,
            "domain": domain,
            "linked_entry_id": entry_id,
        }))
        .await
        .and_then(expect_success)
    }

    pub async fn log_weight(
        &self,
        entity_id: &str,
        weight: f64,
        date: Option<NaiveDate>,
    ) -> ClientResult<()> {
        self.send(with_date(
            json!({
                "type": "calorie_tracker/log_weight",
                "entity_id": entity_id,
                "weight": weight,
            }),
            date,
        ))
        .await
        .and_then(expect_success)
    }
}

fn with_date(mut command: Value, date: Option<NaiveDate>) -> Value {
    if let (Some(date), Some(object)) = (date, command.as_object_mut()) {
        object.insert("date".into(), json!(format_date(date)));
    }
    command
}

/// Mutations reply `{success: true}`; anything saying otherwise is an error.
fn expect_success(value: Value) -> ClientResult<()> {
    match value.get("success").and_then(Value::as_bool) {
        Some(false) => Err(ClientError::Rpc {
            code: "failed".into(),
            message: value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("request was not successful")
                .to_string(),
        }),
        _ => Ok(()),
    }
}
