use super::types::FilterOrderInfo;

pub struct FilterOrder;

impl FilterOrder {
    pub fn generate(order_data: &[FilterOrderInfo], alias: &str) -> String {
        if order_data.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = order_data
            .iter()
            .map(|o| format!("{}.\"{}\" {}", alias, o.column, o.sort.to_sql()))
            .collect();
        format!(" ORDER BY {}", parts.join(", "))
    }
}
