use serde_json::Value;

/// Print just the key answer value from the output.
///
/// A valuation report prints its price per share; anything else prints the
/// first well-known field, then the first field of the result object.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_answer(value));
}

fn minimal_answer(value: &Value) -> String {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(pps) = result_obj.pointer("/valuation/price_per_share") {
        return format_minimal(pps);
    }
    if let Some(rate) = result_obj.pointer("/growth/rate") {
        return format_minimal(rate);
    }

    let priority_keys = ["price_per_share", "equity_value", "enterprise_value", "growth"];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    return format_minimal(val);
                }
            }
        }
        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, format_minimal(val));
        }
    }

    format_minimal(result_obj)
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_prints_price() {
        let v = json!({ "result": { "valuation": { "price_per_share": "12.34" } } });
        assert_eq!(minimal_answer(&v), "12.34");
    }

    #[test]
    fn test_undetermined_growth_prints_basis() {
        let v = json!({ "result": { "growth": { "basis": "undetermined" } } });
        assert_eq!(minimal_answer(&v), r#"{"basis":"undetermined"}"#);
    }

    #[test]
    fn test_growth_rate() {
        let v = json!({ "result": { "growth": { "basis": "historical", "rate": "0.1" } } });
        assert_eq!(minimal_answer(&v), "0.1");
    }
}
