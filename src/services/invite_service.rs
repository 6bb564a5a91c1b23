use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use uuid::Uuid;

use super::settlement_service::upsert_op;
use crate::auth::{generate_invite_token, InviteClaims};
use crate::database::models::{Associate, Contract, Invite, InviteStatus, Project, Settlement, Task};
use crate::database::{DatabaseError, Repository, Store};
use crate::error::ApiError;
use crate::filter::Filter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteResponse {
    Accepted,
    Declined,
}

impl From<InviteResponse> for InviteStatus {
    fn from(response: InviteResponse) -> Self {
        match response {
            InviteResponse::Accepted => InviteStatus::Accepted,
            InviteResponse::Declined => InviteStatus::Declined,
        }
    }
}

/// What an associate sees when opening an invite link
#[derive(Debug, Clone, Serialize)]
pub struct InviteView {
    pub invite_id: Uuid,
    pub status: InviteStatus,
    pub associate: InviteAssociate,
    pub project: InviteProject,
    pub task: InviteTask,
    pub contract: Option<Contract>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InviteAssociate {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InviteProject {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InviteTask {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub task_value: Option<Decimal>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InviteOutcome {
    pub invite: Invite,
    pub task: Option<Task>,
    pub settlement: Option<Settlement>,
}

pub struct InviteService {
    store: Arc<dyn Store>,
}

impl InviteService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn repo<T: crate::database::models::Model>(&self) -> Repository<T> {
        Repository::new(self.store.clone())
    }

    /// Invite one of the user's associates onto one of the user's tasks
    pub async fn create(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        associate_id: Uuid,
        contract_id: Option<Uuid>,
    ) -> Result<(Invite, String), ApiError> {
        let task = self.repo::<Task>().select_404(Filter::by_id(task_id)).await?;
        self.repo::<Project>()
            .select_one(Filter::by_id(task.project_id).eq("user_id", user_id))
            .await?
            .ok_or_else(|| ApiError::not_found("Task not found"))?;
        self.repo::<Associate>()
            .select_one(Filter::by_id(associate_id).eq("user_id", user_id))
            .await?
            .ok_or_else(|| ApiError::not_found("Associate not found"))?;
        if let Some(contract_id) = contract_id {
            self.repo::<Contract>()
                .select_one(Filter::by_id(contract_id).eq("task_id", task_id))
                .await?
                .ok_or_else(|| ApiError::not_found("Contract not found"))?;
        }

        let invite = self
            .repo::<Invite>()
            .create(&Invite::new(task.project_id, task.id, associate_id, contract_id))
            .await?;
        let token = generate_invite_token(&InviteClaims::new(invite.id, associate_id, task.id, contract_id))?;

        tracing::info!("Invited associate {} to task {}", associate_id, task.id);
        Ok((invite, token))
    }

    pub async fn view(&self, invite: &Invite) -> Result<InviteView, ApiError> {
        let associate = self.repo::<Associate>().select_404(Filter::by_id(invite.associate_id)).await?;
        let project = self.repo::<Project>().select_404(Filter::by_id(invite.project_id)).await?;
        let task = self.repo::<Task>().select_404(Filter::by_id(invite.task_id)).await?;
        let contract = match invite.contract_id {
            Some(id) => self.repo::<Contract>().select_one(Filter::by_id(id)).await?,
            None => None,
        };

        Ok(InviteView {
            invite_id: invite.id,
            status: invite.status,
            associate: InviteAssociate {
                id: associate.id,
                name: associate.name,
                email: associate.email,
            },
            project: InviteProject {
                id: project.id,
                name: project.name,
                description: project.description,
                deadline: project.deadline,
            },
            task: InviteTask {
                id: task.id,
                title: task.title,
                description: task.description,
                task_value: task.task_value,
                due_date: task.due_date,
                estimated_hours: task.estimated_hours,
            },
            contract,
        })
    }

    /// Record the associate's answer.
    ///
    /// Accepting assigns the task and upserts its settlement in the same batch
    /// as the invite update.
    pub async fn respond(&self, invite: &Invite, response: InviteResponse) -> Result<InviteOutcome, ApiError> {
        if invite.status != InviteStatus::Pending {
            return Err(ApiError::conflict(format!("Invite has already been {}", invite.status)));
        }

        let mut invite_changes = Map::new();
        invite_changes.insert("status".into(), json!(InviteStatus::from(response)));
        invite_changes.insert("responded_at".into(), json!(Utc::now()));
        // Losing a race with another response leaves no pending row to update
        let mut ops = vec![Repository::<Invite>::update_op(
            Filter::by_id(invite.id).eq("status", InviteStatus::Pending),
            invite_changes,
        )
        .require_match()];

        if response == InviteResponse::Accepted {
            let mut task = self.repo::<Task>().select_404(Filter::by_id(invite.task_id)).await?;
            let project = self.repo::<Project>().select_404(Filter::by_id(task.project_id)).await?;
            task.assigned_to_associate = Some(invite.associate_id);

            let mut task_changes = Map::new();
            task_changes.insert("assigned_to_associate".into(), json!(invite.associate_id));
            ops.push(Repository::<Task>::update_op(Filter::by_id(task.id), task_changes));
            if let Some(op) = upsert_op(&task, &project).map_err(ApiError::from)? {
                ops.push(op);
            }
        }

        let mut results = self
            .store
            .atomically(ops)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => ApiError::conflict("Invite has already been answered"),
                other => other.into(),
            })?
            .into_iter();
        let updated_invite = Repository::<Invite>::decode_all(results.next().unwrap_or_default())?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::conflict("Invite has already been answered"))?;
        let task = match results.next() {
            Some(rows) => Repository::<Task>::decode_all(rows)?.into_iter().next(),
            None => None,
        };
        let settlement = match results.next() {
            Some(rows) => Repository::<Settlement>::decode_all(rows)?.into_iter().next(),
            None => None,
        };

        tracing::info!("Invite {} {}", updated_invite.id, updated_invite.status);
        Ok(InviteOutcome {
            invite: updated_invite,
            task,
            settlement,
        })
    }
}
