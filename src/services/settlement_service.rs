use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{Associate, Model, Project, Settlement, SettlementStatus, Task};
use crate::database::{DatabaseError, Repository, Store, WriteOp};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::services::metrics::MonthWindow;

const CONFLICT_KEY: &[&str] = &["task_id", "associate_id"];
const REFRESHED_ON_UPSERT: &[&str] = &["expected_amount", "percentage_cut"];

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("{field}: {problem}")]
    Invalid { field: &'static str, problem: &'static str },

    #[error("expected amount does not fit in minor units")]
    AmountOutOfRange,
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::Database(e) => e.into(),
            SettlementError::Invalid { field, problem } => ApiError::field(field, problem),
            SettlementError::AmountOutOfRange => ApiError::bad_request("task_value is too large"),
        }
    }
}

/// Associate's share of a task given the owner's retained cut
pub fn associate_percentage(your_cut_percent: Decimal) -> Decimal {
    Decimal::ONE_HUNDRED - your_cut_percent
}

/// `floor(task_value * percentage / 100)` in integer minor units
pub fn expected_amount(task_value: Decimal, percentage: Decimal) -> Result<i64, SettlementError> {
    task_value
        .checked_mul(percentage)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .and_then(|v| v.floor().to_i64())
        .ok_or(SettlementError::AmountOutOfRange)
}

pub fn derive_status(settled_amount: i64, expected_amount: i64) -> SettlementStatus {
    if settled_amount == 0 {
        SettlementStatus::Pending
    } else if settled_amount < expected_amount {
        SettlementStatus::PartiallySettled
    } else {
        SettlementStatus::Settled
    }
}

/// Upsert op for the settlement a task implies, or `None` when the task has
/// no assignee or no value.
///
/// A new row starts pending with nothing settled; an existing row for the same
/// `(task, associate)` only has its expected amount and cut refreshed.
pub fn upsert_op(task: &Task, project: &Project) -> Result<Option<WriteOp>, SettlementError> {
    let (Some(associate_id), Some(task_value)) = (task.assigned_to_associate, task.task_value) else {
        return Ok(None);
    };

    let percentage = associate_percentage(project.your_cut_percent);
    let now = Utc::now();
    let settlement = Settlement {
        id: Uuid::new_v4(),
        project_id: project.id,
        task_id: task.id,
        associate_id,
        user_id: project.user_id,
        percentage_cut: percentage,
        expected_amount: expected_amount(task_value, percentage)?,
        settled_amount: 0,
        method: String::new(),
        transaction_ref: String::new(),
        status: SettlementStatus::Pending,
        settled_at: None,
        created_at: now,
        updated_at: now,
    };

    Ok(Some(WriteOp::Upsert {
        table: Settlement::TABLE,
        record: serde_json::to_value(&settlement).map_err(DatabaseError::from)?,
        conflict: CONFLICT_KEY,
        update: REFRESHED_ON_UPSERT,
    }))
}

/// Payout recorded against a settlement. `settled_amount` is the new cumulative total.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentUpdate {
    pub settled_amount: i64,
    pub transaction_ref: String,
    pub method: Option<String>,
}

/// Recent pending work per associate, grouped for the payout screen
#[derive(Debug, Clone, Serialize)]
pub struct AssociatePayables {
    pub associate_id: Uuid,
    pub associate_name: String,
    pub total_outstanding: i64,
    pub projects: Vec<ProjectPayables>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectPayables {
    pub project_id: Uuid,
    pub project_name: String,
    pub total_outstanding: i64,
    pub tasks: Vec<TaskPayable>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskPayable {
    pub settlement_id: Uuid,
    pub task_id: Uuid,
    pub task_title: String,
    pub expected_amount: i64,
    pub settled_amount: i64,
    pub status: SettlementStatus,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthlySettled {
    pub month: String,
    pub amount: i64,
    pub count: usize,
}

pub struct SettlementService {
    store: Arc<dyn Store>,
}

impl SettlementService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn settlements(&self) -> Repository<Settlement> {
        Repository::new(self.store.clone())
    }

    /// Create or refresh the settlement for a saved task
    pub async fn upsert_for_task(&self, task: &Task) -> Result<Option<Settlement>, SettlementError> {
        if task.assigned_to_associate.is_none() || task.task_value.is_none() {
            return Ok(None);
        }

        let project = Repository::<Project>::new(self.store.clone())
            .select_404(Filter::by_id(task.project_id))
            .await?;

        let Some(op) = upsert_op(task, &project)? else {
            return Ok(None);
        };
        let mut results = self.store.atomically(vec![op]).await?;
        let rows = results.pop().unwrap_or_default();
        let settlement = Repository::<Settlement>::decode_all(rows)?.into_iter().next();

        if let Some(settlement) = &settlement {
            tracing::debug!(
                "Settlement {} for task {} expects {}",
                settlement.id,
                task.id,
                settlement.expected_amount
            );
        }
        Ok(settlement)
    }

    /// Overwrite the cumulative settled amount and re-derive the status.
    ///
    /// `settled_at` is stamped only when the status moves into settled and is
    /// cleared when a lower amount moves it back out.
    pub async fn record_payment(
        &self,
        settlement_id: Uuid,
        user_id: Uuid,
        update: PaymentUpdate,
    ) -> Result<Settlement, SettlementError> {
        if update.settled_amount < 0 {
            return Err(SettlementError::Invalid {
                field: "settled_amount",
                problem: "must not be negative",
            });
        }
        let transaction_ref = update.transaction_ref.trim();
        if transaction_ref.is_empty() {
            return Err(SettlementError::Invalid {
                field: "transaction_ref",
                problem: "must not be empty",
            });
        }

        let filter = Filter::by_id(settlement_id).eq("user_id", user_id);
        let current = self.settlements().select_404(filter.clone()).await?;
        let status = derive_status(update.settled_amount, current.expected_amount);

        let mut changes = Map::new();
        changes.insert("settled_amount".into(), json!(update.settled_amount));
        changes.insert("transaction_ref".into(), json!(transaction_ref));
        changes.insert("status".into(), json!(status));
        if let Some(method) = update.method {
            changes.insert("method".into(), json!(method));
        }
        match (current.status, status) {
            (previous, SettlementStatus::Settled) if previous != SettlementStatus::Settled => {
                changes.insert("settled_at".into(), json!(Utc::now()));
            }
            (_, SettlementStatus::Settled) => {}
            _ => {
                changes.insert("settled_at".into(), Value::Null);
            }
        }

        let updated = self.settlements().update_one(filter, changes).await?;
        tracing::info!(
            "Settlement {} recorded {} of {} ({})",
            updated.id,
            updated.settled_amount,
            updated.expected_amount,
            updated.status
        );
        Ok(updated)
    }

    /// Unsettled settlements grouped associate → project → task
    pub async fn recent(&self, user_id: Uuid) -> Result<Vec<AssociatePayables>, SettlementError> {
        let open = self
            .settlements()
            .select_any(
                Filter::new()
                    .eq("user_id", user_id)
                    .is_in("status", [SettlementStatus::Pending, SettlementStatus::PartiallySettled])
                    .order_desc("created_at"),
            )
            .await?;
        if open.is_empty() {
            return Ok(vec![]);
        }

        let associates = names_by_id(
            Repository::<Associate>::new(self.store.clone())
                .select_ids(unique(open.iter().map(|s| s.associate_id)))
                .await?
                .into_iter()
                .map(|a| (a.id, a.name)),
        );
        let projects = names_by_id(
            Repository::<Project>::new(self.store.clone())
                .select_ids(unique(open.iter().map(|s| s.project_id)))
                .await?
                .into_iter()
                .map(|p| (p.id, p.name)),
        );
        let tasks = names_by_id(
            Repository::<Task>::new(self.store.clone())
                .select_ids(unique(open.iter().map(|s| s.task_id)))
                .await?
                .into_iter()
                .map(|t| (t.id, t.title)),
        );

        Ok(group_payables(open, &associates, &projects, &tasks))
    }

    /// Settled totals per month over the last `months` months, newest first
    pub async fn history(&self, user_id: Uuid, months: u32) -> Result<Vec<MonthlySettled>, SettlementError> {
        let current = MonthWindow::containing(Utc::now());
        let oldest = current.back(months.saturating_sub(1));

        let settled = self
            .settlements()
            .select_any(
                Filter::new()
                    .eq("user_id", user_id)
                    .eq("status", SettlementStatus::Settled)
                    .gte("settled_at", oldest.start)
                    .order_desc("settled_at"),
            )
            .await?;

        Ok(monthly_totals(&settled))
    }

    pub async fn for_associate(&self, associate_id: Uuid) -> Result<Vec<Settlement>, SettlementError> {
        Ok(self
            .settlements()
            .select_any(Filter::new().eq("associate_id", associate_id).order_desc("created_at"))
            .await?)
    }
}

fn unique(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = ids.collect();
    ids.sort();
    ids.dedup();
    ids
}

fn names_by_id(pairs: impl Iterator<Item = (Uuid, String)>) -> BTreeMap<Uuid, String> {
    pairs.collect()
}

fn group_payables(
    open: Vec<Settlement>,
    associates: &BTreeMap<Uuid, String>,
    projects: &BTreeMap<Uuid, String>,
    tasks: &BTreeMap<Uuid, String>,
) -> Vec<AssociatePayables> {
    let mut grouped: Vec<AssociatePayables> = Vec::new();

    // `open` arrives newest first, so tasks keep that order within a project
    for settlement in open {
        let outstanding = (settlement.expected_amount - settlement.settled_amount).max(0);
        let associate_idx = match grouped.iter().position(|a| a.associate_id == settlement.associate_id) {
            Some(idx) => idx,
            None => {
                grouped.push(AssociatePayables {
                    associate_id: settlement.associate_id,
                    associate_name: associates.get(&settlement.associate_id).cloned().unwrap_or_default(),
                    total_outstanding: 0,
                    projects: vec![],
                });
                grouped.len() - 1
            }
        };
        let associate = &mut grouped[associate_idx];
        associate.total_outstanding += outstanding;

        let project_idx = match associate.projects.iter().position(|p| p.project_id == settlement.project_id) {
            Some(idx) => idx,
            None => {
                associate.projects.push(ProjectPayables {
                    project_id: settlement.project_id,
                    project_name: projects.get(&settlement.project_id).cloned().unwrap_or_default(),
                    total_outstanding: 0,
                    tasks: vec![],
                });
                associate.projects.len() - 1
            }
        };
        let project = &mut associate.projects[project_idx];
        project.total_outstanding += outstanding;
        project.tasks.push(TaskPayable {
            settlement_id: settlement.id,
            task_id: settlement.task_id,
            task_title: tasks.get(&settlement.task_id).cloned().unwrap_or_default(),
            expected_amount: settlement.expected_amount,
            settled_amount: settlement.settled_amount,
            status: settlement.status,
            created_at: settlement.created_at,
        });
    }

    grouped.sort_by(|a, b| a.associate_name.to_lowercase().cmp(&b.associate_name.to_lowercase()));
    for associate in &mut grouped {
        associate
            .projects
            .sort_by(|a, b| a.project_name.to_lowercase().cmp(&b.project_name.to_lowercase()));
    }
    grouped
}

/// Expected amounts of settled rows per month. Expects `settled` ordered newest first
fn monthly_totals(settled: &[Settlement]) -> Vec<MonthlySettled> {
    let mut months: Vec<MonthlySettled> = Vec::new();
    for settlement in settled {
        let Some(settled_at) = settlement.settled_at else {
            continue;
        };
        let label = MonthWindow::containing(settled_at).long_label();
        match months.iter_mut().find(|m| m.month == label) {
            Some(month) => {
                month.amount += settlement.expected_amount;
                month.count += 1;
            }
            None => months.push(MonthlySettled {
                month: label,
                amount: settlement.expected_amount,
                count: 1,
            }),
        }
    }
    months
}
