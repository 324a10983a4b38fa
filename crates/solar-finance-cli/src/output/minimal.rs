use serde_json::Value;

/// Headline field of each command, in priority order.
const PRIORITY_KEYS: [&str; 8] = [
    "recommended_power_kwp",
    "recommendation",
    "sizing",
    "monthly_rate_percent",
    "installment_value",
    "monthly_saving",
    "display_label",
    "total_paid",
];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_answer(value));
}

fn minimal_answer(value: &Value) -> String {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        for key in PRIORITY_KEYS {
            match map.get(key) {
                // Nested records answer with their own headline
                Some(val @ Value::Object(_)) => return minimal_answer(val),
                Some(val) if !val.is_null() => return format_minimal(val),
                _ => {}
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
    fn test_rate_is_the_headline() {
        let out = json!({ "result": { "monthly_rate_percent": "0.9994", "semaphore": "excellent" } });
        assert_eq!(minimal_answer(&out), "0.9994");
    }

    #[test]
    fn test_reverse_answers_with_recommended_power() {
        let out = json!({
            "result": {
                "recommendation": {
                    "installment_value": "651.96",
                    "recommended_power_kwp": "7.02",
                    "system_value": "24464"
                },
                "financing_options": []
            }
        });
        assert_eq!(minimal_answer(&out), "7.02");
    }

    #[test]
    fn test_payback_label() {
        let out = json!({ "result": { "months": 60, "years": "5", "display_label": "5 years" } });
        assert_eq!(minimal_answer(&out), "5 years");
    }
}
