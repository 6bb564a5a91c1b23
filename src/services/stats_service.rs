use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use uuid::Uuid;

use super::metrics::{
    days_between, efficiency_percent, mean, percent_change, performance_score, round2, share_percent, start_of_year,
    std_dev, MonthWindow,
};
use crate::database::models::{
    Associate, Entity, Expense, Invoice, InvoiceStatus, Payment, PaymentStatus, Project, Settlement, SettlementStatus,
    Task, TaskStatus,
};
use crate::database::{DatabaseError, Repository, Store};
use crate::filter::Filter;

const REVENUE_MONTHS: u32 = 6;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_projects: i64,
    pub projects_change: f64,
    pub total_clients: i64,
    pub clients_this_month: i64,
    pub revenue_this_month: f64,
    pub revenue_last_month: f64,
    pub revenue_change: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: f64,
    pub projects: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SettlementStats {
    pub total_payable: f64,
    pub monthly_payable_change: f64,
    pub total_settled_this_month: f64,
    pub monthly_payable_of_total: f64,
    pub outstanding_balance: f64,
    pub pending_settlements: i64,
    pub average_settlement_time: f64,
    pub settlement_time_improvement: f64,
    pub active_associates: usize,
    pub payment_success_rate: f64,
    pub total_transactions: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssociateStats {
    pub total_associates: usize,
    pub active_associates: usize,
    pub total_associate_projects: usize,
    pub active_associate_projects: usize,
    pub total_completed_tasks: usize,
    pub monthly_completed_tasks: usize,
    pub total_associate_earnings: f64,
    pub associate_earnings_percent: f64,
    pub average_performance: f64,
    pub rating_deviation: f64,
    pub efficiency_rate_percent: f64,
    pub efficiency_deviation_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinanceStats {
    pub total_revenue: f64,
    pub monthly_revenue: f64,
    pub revenue_change: f64,
    pub total_expenses: f64,
    pub monthly_expenses: f64,
    pub net_profit: f64,
    pub pending_payments: f64,
    pub overdue_payments: f64,
}

/// Read-only dashboard aggregates, scoped to one user and recomputed per request
pub struct StatsService {
    store: Arc<dyn Store>,
    now: DateTime<Utc>,
}

impl StatsService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::at(store, Utc::now())
    }

    /// Evaluate calendar windows relative to `now`
    pub fn at(store: Arc<dyn Store>, now: DateTime<Utc>) -> Self {
        Self { store, now }
    }

    fn repo<T: crate::database::models::Model>(&self) -> Repository<T> {
        Repository::new(self.store.clone())
    }

    fn this_month(&self) -> MonthWindow {
        MonthWindow::containing(self.now)
    }

    async fn confirmed_revenue(&self, user_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<f64, DatabaseError> {
        self.repo::<Payment>()
            .sum(
                "amount",
                Filter::new()
                    .eq("user_id", user_id)
                    .eq("status", PaymentStatus::Confirmed)
                    .within("paid_date", from, to),
            )
            .await
    }

    async fn projects_created(&self, user_id: Uuid, window: MonthWindow) -> Result<i64, DatabaseError> {
        self.repo::<Project>()
            .count(Filter::new().eq("user_id", user_id).within("created_at", window.start, window.end))
            .await
    }

    pub async fn dashboard(&self, user_id: Uuid) -> Result<DashboardStats, DatabaseError> {
        let this_month = self.this_month();
        let last_month = this_month.previous();

        let total_projects = self.repo::<Project>().count(Filter::new().eq("user_id", user_id)).await?;
        let projects_this_month = self.projects_created(user_id, this_month).await?;
        let projects_last_month = self.projects_created(user_id, last_month).await?;

        let total_clients = self.repo::<Entity>().count(Filter::new().eq("user_id", user_id)).await?;
        let clients_this_month = self
            .repo::<Entity>()
            .count(Filter::new().eq("user_id", user_id).within("created_at", this_month.start, this_month.end))
            .await?;

        let revenue_this_month = self.confirmed_revenue(user_id, this_month.start, this_month.end).await?;
        let revenue_last_month = self.confirmed_revenue(user_id, last_month.start, last_month.end).await?;

        Ok(DashboardStats {
            total_projects,
            projects_change: round2(percent_change(projects_this_month as f64, projects_last_month as f64)),
            total_clients,
            clients_this_month,
            revenue_this_month: round2(revenue_this_month),
            revenue_last_month: round2(revenue_last_month),
            revenue_change: round2(percent_change(revenue_this_month, revenue_last_month)),
        })
    }

    /// Confirmed revenue and new projects for the last six months, oldest first
    pub async fn revenue(&self, user_id: Uuid) -> Result<Vec<MonthlyRevenue>, DatabaseError> {
        let this_month = self.this_month();
        let mut months = Vec::with_capacity(REVENUE_MONTHS as usize);
        for back in (0..REVENUE_MONTHS).rev() {
            let window = this_month.back(back);
            months.push(MonthlyRevenue {
                month: window.short_label(),
                revenue: round2(self.confirmed_revenue(user_id, window.start, window.end).await?),
                projects: self.projects_created(user_id, window).await?,
            });
        }
        Ok(months)
    }

    pub async fn projects_by_category(&self, user_id: Uuid) -> Result<Vec<CategoryCount>, DatabaseError> {
        let projects = self.repo::<Project>().select_any(Filter::new().eq("user_id", user_id)).await?;
        Ok(count_categories(projects.iter().map(|p| p.category.as_str())))
    }

    pub async fn settlements(&self, user_id: Uuid) -> Result<SettlementStats, DatabaseError> {
        let repo = self.repo::<Settlement>();
        let this_month = self.this_month();
        let last_month = this_month.previous();
        let owned = || Filter::new().eq("user_id", user_id);
        let settled_in = |window: MonthWindow| {
            owned()
                .eq("status", SettlementStatus::Settled)
                .within("settled_at", window.start, window.end)
        };

        let total_payable = repo
            .sum("expected_amount", owned().eq("status", SettlementStatus::Pending))
            .await?;
        let settled_this_month = repo.select_any(settled_in(this_month)).await?;
        let settled_last_month = repo.select_any(settled_in(last_month)).await?;
        let settled_this_total: f64 = settled_this_month.iter().map(|s| s.expected_amount as f64).sum();
        let settled_last_total: f64 = settled_last_month.iter().map(|s| s.expected_amount as f64).sum();

        let open = repo
            .select_any(owned().is_in("status", [SettlementStatus::Pending, SettlementStatus::PartiallySettled]))
            .await?;
        let active_associates = open.iter().map(|s| s.associate_id).collect::<HashSet<_>>().len();

        let total_transactions = repo.count(owned()).await?;
        let settled_count = repo.count(owned().eq("status", SettlementStatus::Settled)).await?;

        let average_this = average_settlement_days(&settled_this_month);
        let average_last = average_settlement_days(&settled_last_month);
        let improvement = match (average_this, average_last) {
            (Some(this), Some(last)) => last - this,
            _ => 0.0,
        };

        Ok(SettlementStats {
            total_payable: round2(total_payable),
            monthly_payable_change: round2(percent_change(settled_this_total, settled_last_total)),
            total_settled_this_month: round2(settled_this_total),
            monthly_payable_of_total: round2(share_percent(settled_this_total, settled_this_total + total_payable)),
            outstanding_balance: round2(total_payable - settled_this_total),
            pending_settlements: open.len() as i64,
            average_settlement_time: round2(average_this.unwrap_or(0.0)),
            settlement_time_improvement: round2(improvement),
            active_associates,
            payment_success_rate: round2(share_percent(settled_count as f64, total_transactions as f64)),
            total_transactions,
        })
    }

    pub async fn associates(&self, user_id: Uuid) -> Result<AssociateStats, DatabaseError> {
        let this_month = self.this_month();
        let associates = self.repo::<Associate>().select_any(Filter::new().eq("user_id", user_id)).await?;

        let project_ids: Vec<Uuid> = self
            .repo::<Project>()
            .select_any(Filter::new().eq("user_id", user_id))
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        let assigned = if project_ids.is_empty() {
            vec![]
        } else {
            self.repo::<Task>()
                .select_any(Filter::new().is_in("project_id", project_ids).not_null("assigned_to_associate"))
                .await?
        };

        let settlements = self.repo::<Settlement>();
        let total_settled = settlements.sum("settled_amount", Filter::new().eq("user_id", user_id)).await?;
        let total_expected = settlements.sum("expected_amount", Filter::new().eq("user_id", user_id)).await?;

        let workload = AssociateWorkload::from_tasks(&assigned, this_month);

        Ok(AssociateStats {
            total_associates: associates.len(),
            active_associates: workload.active_associates,
            total_associate_projects: workload.projects,
            active_associate_projects: workload.active_projects,
            total_completed_tasks: workload.completed,
            monthly_completed_tasks: workload.completed_this_month,
            total_associate_earnings: round2(total_settled),
            associate_earnings_percent: round2(share_percent(total_settled, total_expected)),
            average_performance: round2(mean(&workload.performance_scores)),
            rating_deviation: round2(std_dev(&workload.performance_scores)),
            efficiency_rate_percent: round2(mean(&workload.efficiencies)),
            efficiency_deviation_percent: round2(std_dev(&workload.efficiencies)),
        })
    }

    pub async fn finances(&self, user_id: Uuid) -> Result<FinanceStats, DatabaseError> {
        let this_month = self.this_month();
        let last_month = this_month.previous();
        let year_start = start_of_year(self.now);

        let total_revenue = self.confirmed_revenue(user_id, year_start, this_month.end).await?;
        let monthly_revenue = self.confirmed_revenue(user_id, this_month.start, this_month.end).await?;
        let last_month_revenue = self.confirmed_revenue(user_id, last_month.start, last_month.end).await?;

        let expenses = self.repo::<Expense>();
        let total_expenses = expenses
            .sum("amount", Filter::new().eq("user_id", user_id).within("date", year_start, this_month.end))
            .await?;
        let monthly_expenses = expenses
            .sum(
                "amount",
                Filter::new().eq("user_id", user_id).within("date", this_month.start, this_month.end),
            )
            .await?;

        let unpaid = self
            .repo::<Invoice>()
            .select_any(Filter::new().eq("user_id", user_id).is_in(
                "status",
                [InvoiceStatus::Draft, InvoiceStatus::Sent, InvoiceStatus::Overdue],
            ))
            .await?;
        let (pending_payments, overdue_payments) = split_receivables(&unpaid, self.now);

        Ok(FinanceStats {
            total_revenue: round2(total_revenue),
            monthly_revenue: round2(monthly_revenue),
            revenue_change: round2(percent_change(monthly_revenue, last_month_revenue)),
            total_expenses: round2(total_expenses),
            monthly_expenses: round2(monthly_expenses),
            net_profit: round2(total_revenue - total_expenses),
            pending_payments: round2(pending_payments),
            overdue_payments: round2(overdue_payments),
        })
    }
}

/// Projects per category, largest first; a blank category counts as `uncategorized`
pub fn count_categories<'a>(categories: impl Iterator<Item = &'a str>) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for category in categories {
        let category = category.trim();
        let key = if category.is_empty() { "uncategorized" } else { category };
        *counts.entry(key.to_string()).or_default() += 1;
    }
    let mut result: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count));
    result
}

/// Mean days from creation to settlement; `None` over an empty set
pub fn average_settlement_days(settled: &[Settlement]) -> Option<f64> {
    let days: Vec<f64> = settled
        .iter()
        .filter_map(|s| s.settled_at.map(|at| days_between(s.created_at, at)))
        .collect();
    (!days.is_empty()).then(|| mean(&days))
}

/// Unpaid invoice totals as `(pending, overdue)`.
///
/// Overdue means flagged overdue or past a due date.
pub fn split_receivables(unpaid: &[Invoice], now: DateTime<Utc>) -> (f64, f64) {
    let mut pending = 0.0;
    let mut overdue = 0.0;
    for invoice in unpaid {
        let amount = invoice.amount.to_f64().unwrap_or(0.0);
        let past_due = invoice.due_date.map_or(false, |due| due < now);
        if invoice.status == InvoiceStatus::Overdue || past_due {
            overdue += amount;
        } else {
            pending += amount;
        }
    }
    (pending, overdue)
}

/// Per-associate figures derived from assigned tasks
#[derive(Debug, Default)]
pub struct AssociateWorkload {
    pub active_associates: usize,
    pub projects: usize,
    pub active_projects: usize,
    pub completed: usize,
    pub completed_this_month: usize,
    pub performance_scores: Vec<f64>,
    pub efficiencies: Vec<f64>,
}

impl AssociateWorkload {
    pub fn from_tasks(assigned: &[Task], month: MonthWindow) -> Self {
        let mut per_associate: HashMap<Uuid, (usize, usize)> = HashMap::new();
        let mut active_associates = HashSet::new();
        let mut projects = HashSet::new();
        let mut active_projects = HashSet::new();
        let mut workload = AssociateWorkload::default();

        for task in assigned {
            let Some(associate_id) = task.assigned_to_associate else {
                continue;
            };
            let done = task.status == TaskStatus::Done;
            let entry = per_associate.entry(associate_id).or_default();
            entry.1 += 1;
            projects.insert(task.project_id);

            if done {
                entry.0 += 1;
                workload.completed += 1;
                if task.completed_at.map_or(false, |at| at >= month.start && at < month.end) {
                    workload.completed_this_month += 1;
                }
            } else {
                active_associates.insert(associate_id);
                active_projects.insert(task.project_id);
            }

            if let Some(efficiency) = efficiency_percent(task.estimated_hours, task.actual_hours) {
                workload.efficiencies.push(efficiency);
            }
        }

        workload.active_associates = active_associates.len();
        workload.projects = projects.len();
        workload.active_projects = active_projects.len();
        workload.performance_scores = per_associate
            .values()
            .map(|(completed, assigned)| performance_score(*completed, *assigned))
            .collect();
        workload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Priority;
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    fn task(associate: Uuid, project: Uuid, status: TaskStatus, est: f64, actual: f64) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            project_id: project,
            milestone_id: None,
            title: "Task".into(),
            description: String::new(),
            status,
            priority: Priority::Medium,
            due_date: None,
            completed_at: (status == TaskStatus::Done).then_some(now),
            estimated_hours: est,
            actual_hours: actual,
            task_value: None,
            assigned_to_associate: Some(associate),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn blank_categories_are_uncategorized() {
        let counts = count_categories(["web", "", "mobile", "web", "  "].into_iter());
        assert_eq!(counts[0], CategoryCount { category: "web".into(), count: 2 });
        assert_eq!(counts[1], CategoryCount { category: "uncategorized".into(), count: 2 });
        assert_eq!(counts[2], CategoryCount { category: "mobile".into(), count: 1 });
    }

    #[test]
    fn workload_scores_per_associate() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        let tasks = vec![
            task(a, p1, TaskStatus::Done, 8.0, 10.0),
            task(a, p1, TaskStatus::InProgress, 4.0, 0.0),
            task(b, p2, TaskStatus::Done, 6.0, 6.0),
        ];

        let workload = AssociateWorkload::from_tasks(&tasks, MonthWindow::containing(Utc::now()));
        assert_eq!(workload.active_associates, 1);
        assert_eq!(workload.projects, 2);
        assert_eq!(workload.active_projects, 1);
        assert_eq!(workload.completed, 2);
        assert_eq!(workload.completed_this_month, 2);

        // a: 1/2 * 5 = 2.5, b: 1/1 * 5 = 5
        assert_eq!(mean(&workload.performance_scores), 3.75);
        assert_eq!(std_dev(&workload.performance_scores), 1.25);
        // 80% and 100%; the unlogged task is skipped
        assert_eq!(mean(&workload.efficiencies), 90.0);
        assert_eq!(std_dev(&workload.efficiencies), 10.0);
    }

    #[test]
    fn receivables_split_on_due_date() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap();
        let invoice = |amount: i64, status: InvoiceStatus, due: Option<DateTime<Utc>>| Invoice {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            invoice_number: "INV-FF-TEST".into(),
            amount: Decimal::from(amount),
            currency: "KES".into(),
            status,
            issue_date: now,
            due_date: due,
            paid_date: None,
            description: String::new(),
            notes: String::new(),
            payment_method: String::new(),
            transaction_ref: None,
            created_at: now,
            updated_at: now,
        };

        let unpaid = vec![
            invoice(100, InvoiceStatus::Sent, Some(now + Duration::days(3))),
            invoice(200, InvoiceStatus::Sent, Some(now - Duration::days(3))),
            invoice(400, InvoiceStatus::Overdue, None),
            invoice(800, InvoiceStatus::Draft, None),
        ];
        assert_eq!(split_receivables(&unpaid, now), (900.0, 600.0));
    }
}
