use colored::Colorize;
use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
///
/// Envelopes carrying a `results` array (schedules, yearly summaries,
/// financing options) print it as one row per item, followed by the scalar
/// fields of `result`.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match (map.get("results"), map.get("result")) {
            (Some(Value::Array(rows)), result) => {
                print_array_table(rows);
                if let Some(Value::Object(res)) = result {
                    println!();
                    print_scalar_fields(res);
                }
                print_notes(map);
            }
            (_, Some(Value::Object(res))) => {
                print_scalar_fields(res);
                print_nested_sections(res);
                print_notes(map);
            }
            _ => print_scalar_fields(map),
        },
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

/// Two-column table of every non-array field; nested objects are flattened
/// with dotted keys.
fn print_scalar_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    push_flattened(&mut builder, "", map);
    println!("{}", Table::from(builder));
}

fn push_flattened(builder: &mut Builder, prefix: &str, map: &Map<String, Value>) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match val {
            Value::Object(inner) => push_flattened(builder, &name, inner),
            Value::Array(_) => {}
            _ => builder.push_record([name, format_value(val)]),
        }
    }
}

/// Arrays of records inside `result` (e.g. the monthly projection) get
/// their own titled table.
fn print_nested_sections(map: &Map<String, Value>) {
    for (key, val) in map {
        if let Value::Array(rows) = val {
            if rows.first().map(Value::is_object).unwrap_or(false) {
                println!("\n{}", key.bold());
                print_array_table(rows);
            }
        }
    }
}

fn print_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\n{}", "Warnings:".yellow().bold());
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_value_null_as_dash() {
        assert_eq!(format_value(&Value::Null), "-");
        assert_eq!(format_value(&json!("1.69")), "1.69");
        assert_eq!(format_value(&json!([1, 2])), "1, 2");
    }

    #[test]
    fn test_flattened_keys() {
        let map = json!({ "payback": { "months": 43 }, "rows": [1], "total_paid": "100" });
        let mut builder = Builder::default();
        push_flattened(&mut builder, "", map.as_object().unwrap());
        let rendered = Table::from(builder).to_string();
        assert!(rendered.contains("payback.months"));
        assert!(rendered.contains("total_paid"));
        assert!(!rendered.contains("rows"));
    }
}
