use super::filter::Filter;
use super::types::{FilterOp, FilterValue, FilterWhereInfo};

/// Renders the condition list of a `Filter` as a SQL predicate with positional parameters
pub struct FilterWhere {
    alias: String,
    param_values: Vec<FilterValue>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(alias: &str, starting_param_index: usize) -> Self {
        Self {
            alias: alias.to_string(),
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Callers validate the filter first; column names are quoted but not re-checked here.
    pub fn generate(filter: &Filter, alias: &str, starting_param_index: usize) -> (String, Vec<FilterValue>) {
        let mut filter_where = Self::new(alias, starting_param_index);

        let mut sql_conditions = vec![];
        if !filter.options().include_deleted {
            sql_conditions.push(format!("{} IS NULL", filter_where.column("deleted_at")));
        }
        for condition in filter.conditions() {
            sql_conditions.push(filter_where.build_sql_condition(condition));
        }

        let where_clause = if sql_conditions.is_empty() { "1=1".to_string() } else { sql_conditions.join(" AND ") };
        (where_clause, filter_where.param_values)
    }

    fn column(&self, name: &str) -> String {
        format!("{}.\"{}\"", self.alias, name)
    }

    fn param(&mut self, value: FilterValue) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> String {
        let column = self.column(&condition.column);
        match condition.operator {
            FilterOp::IsNull | FilterOp::NotNull => format!("{} {}", column, condition.operator.to_sql()),
            FilterOp::In => {
                if condition.data.is_empty() {
                    return "1=0".to_string();
                }
                let params: Vec<String> = condition.data.iter().map(|v| self.param(v.clone())).collect();
                format!("{} IN ({})", column, params.join(", "))
            }
            FilterOp::Eq | FilterOp::Neq if condition.data.first() == Some(&FilterValue::Null) => {
                let op = if condition.operator == FilterOp::Eq { "IS NULL" } else { "IS NOT NULL" };
                format!("{} {}", column, op)
            }
            op => {
                let value = condition.data.first().cloned().unwrap_or(FilterValue::Null);
                format!("{} {} {}", column, op.to_sql(), self.param(value))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_in_expands_parameters() {
        let ids = vec![Uuid::new_v4(), Uuid::new_v4()];
        let filter = Filter::new().is_in("id", ids.clone());
        let (sql, params) = FilterWhere::generate(&filter, "t", 0);
        assert_eq!(sql, "t.\"deleted_at\" IS NULL AND t.\"id\" IN ($1, $2)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_empty_in_matches_nothing() {
        let filter = Filter::new().is_in::<Uuid>("id", vec![]).include_deleted();
        let (sql, params) = FilterWhere::generate(&filter, "t", 0);
        assert_eq!(sql, "1=0");
        assert!(params.is_empty());
    }

    #[test]
    fn test_null_equality_becomes_is_null() {
        let filter = Filter::new().eq("milestone_id", Option::<Uuid>::None).include_deleted();
        let (sql, params) = FilterWhere::generate(&filter, "t", 0);
        assert_eq!(sql, "t.\"milestone_id\" IS NULL");
        assert!(params.is_empty());
    }
}
