use uuid::Uuid;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{
    FilterOp, FilterOrderInfo, FilterValue, FilterWhereInfo, FilterWhereOptions, SortDirection, SqlResult,
};

/// Conditions, ordering and limit for one store query.
///
/// Conditions are ANDed together. Soft-deleted rows are excluded unless
/// `include_deleted` is called.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<FilterWhereInfo>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    options: FilterWhereOptions,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: Uuid) -> Self {
        Self::new().eq("id", id)
    }

    fn push(mut self, column: &str, operator: FilterOp, data: Vec<FilterValue>) -> Self {
        self.conditions.push(FilterWhereInfo { column: column.to_string(), operator, data });
        self
    }

    pub fn eq(self, column: &str, value: impl Into<FilterValue>) -> Self {
        self.push(column, FilterOp::Eq, vec![value.into()])
    }

    pub fn neq(self, column: &str, value: impl Into<FilterValue>) -> Self {
        self.push(column, FilterOp::Neq, vec![value.into()])
    }

    pub fn gt(self, column: &str, value: impl Into<FilterValue>) -> Self {
        self.push(column, FilterOp::Gt, vec![value.into()])
    }

    pub fn gte(self, column: &str, value: impl Into<FilterValue>) -> Self {
        self.push(column, FilterOp::Gte, vec![value.into()])
    }

    pub fn lt(self, column: &str, value: impl Into<FilterValue>) -> Self {
        self.push(column, FilterOp::Lt, vec![value.into()])
    }

    pub fn lte(self, column: &str, value: impl Into<FilterValue>) -> Self {
        self.push(column, FilterOp::Lte, vec![value.into()])
    }

    pub fn is_in<V: Into<FilterValue>>(self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let data = values.into_iter().map(Into::into).collect();
        self.push(column, FilterOp::In, data)
    }

    pub fn is_null(self, column: &str) -> Self {
        self.push(column, FilterOp::IsNull, vec![])
    }

    pub fn not_null(self, column: &str) -> Self {
        self.push(column, FilterOp::NotNull, vec![])
    }

    /// Half-open range: `start <= column < end`
    pub fn within(self, column: &str, start: impl Into<FilterValue>, end: impl Into<FilterValue>) -> Self {
        self.gte(column, start).lt(column, end)
    }

    pub fn order(mut self, column: &str, sort: SortDirection) -> Self {
        self.order_data.push(FilterOrderInfo { column: column.to_string(), sort });
        self
    }

    pub fn order_asc(self, column: &str) -> Self {
        self.order(column, SortDirection::Asc)
    }

    pub fn order_desc(self, column: &str) -> Self {
        self.order(column, SortDirection::Desc)
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn include_deleted(mut self) -> Self {
        self.options.include_deleted = true;
        self
    }

    pub fn conditions(&self) -> &[FilterWhereInfo] {
        &self.conditions
    }

    pub fn order_info(&self) -> &[FilterOrderInfo] {
        &self.order_data
    }

    pub fn limit_value(&self) -> Option<i64> {
        self.limit
    }

    pub fn options(&self) -> &FilterWhereOptions {
        &self.options
    }

    /// Check column names and operator arity before the filter reaches a backend
    pub fn validate(&self) -> Result<(), FilterError> {
        for condition in &self.conditions {
            Self::validate_identifier(&condition.column)
                .map_err(|_| FilterError::InvalidColumn(condition.column.clone()))?;
            let arity_ok = match condition.operator {
                FilterOp::IsNull | FilterOp::NotNull => condition.data.is_empty(),
                FilterOp::In => true,
                _ => condition.data.len() == 1,
            };
            if !arity_ok {
                return Err(FilterError::InvalidOperatorData(format!(
                    "{:?} on '{}' received {} values",
                    condition.operator,
                    condition.column,
                    condition.data.len()
                )));
            }
        }
        for order in &self.order_data {
            Self::validate_identifier(&order.column)
                .map_err(|_| FilterError::InvalidColumn(order.column.clone()))?;
        }
        if let Some(limit) = self.limit {
            if limit < 0 {
                return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
            }
        }
        Ok(())
    }

    /// Render `WHERE ... ORDER BY ... LIMIT ...` against `alias`, numbering parameters from `$start + 1`
    pub fn to_sql(&self, alias: &str, start: usize) -> Result<SqlResult, FilterError> {
        self.validate()?;
        let (where_clause, params) = FilterWhere::generate(self, alias, start);
        let mut clause = format!(" WHERE {}", where_clause);
        clause.push_str(&FilterOrder::generate(&self.order_data, alias));
        if let Some(limit) = self.limit {
            clause.push_str(&format!(" LIMIT {}", limit));
        }
        Ok(SqlResult { clause, params })
    }

    pub fn validate_identifier(name: &str) -> Result<(), FilterError> {
        let mut chars = name.chars();
        let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_');
        if !valid_start || !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') || name.len() > 63 {
            return Err(FilterError::InvalidTableName(name.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_renders_conditions_in_order() {
        let user_id = Uuid::new_v4();
        let sql = Filter::new()
            .eq("user_id", user_id)
            .eq("status", "pending")
            .order_desc("created_at")
            .limit(10)
            .to_sql("t", 0)
            .unwrap();

        assert_eq!(
            sql.clause,
            " WHERE t.\"deleted_at\" IS NULL AND t.\"user_id\" = $1 AND t.\"status\" = $2 ORDER BY t.\"created_at\" DESC LIMIT 10"
        );
        assert_eq!(sql.params, vec![FilterValue::Uuid(user_id), FilterValue::Text("pending".into())]);
    }

    #[test]
    fn test_filter_rejects_unsafe_column() {
        let result = Filter::new().eq("name; DROP TABLE users", "x").validate();
        assert!(matches!(result, Err(FilterError::InvalidColumn(_))));
    }

    #[test]
    fn test_filter_rejects_wrong_arity() {
        let mut filter = Filter::new();
        filter.conditions.push(FilterWhereInfo { column: "status".into(), operator: FilterOp::Eq, data: vec![] });
        assert!(matches!(filter.validate(), Err(FilterError::InvalidOperatorData(_))));
    }

    #[test]
    fn test_within_is_half_open() {
        let sql = Filter::new().within("paid_date", 1i64, 2i64).include_deleted().to_sql("t", 1).unwrap();
        assert_eq!(sql.clause, " WHERE t.\"paid_date\" >= $2 AND t.\"paid_date\" < $3");
    }
}
