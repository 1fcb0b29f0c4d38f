use serde_json::Value;

/// Print just the key answer value from the output.
///
/// Heuristic: look for well-known result fields in order of priority,
/// then fall back to the first field in the result object.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    // Priority list of key output fields
    let priority_keys = [
        "net_profit",
        "break_even_point",
        "total_cost",
        "profit",
        "final_price",
        "total_revenue",
        "allocated_fixed_cost",
        "contribution_margin",
    ];

    match result_obj {
        Value::Object(map) => {
            for key in &priority_keys {
                if let Some(val) = map.get(*key) {
                    if !val.is_null() {
                        println!("{}", format_minimal(val));
                        return;
                    }
                }
            }

            if let Some((key, val)) = map.iter().next() {
                println!("{}: {}", key, format_minimal(val));
            }
        }
        Value::Array(arr) => {
            // One key figure per record
            for item in arr {
                let line = item
                    .as_object()
                    .and_then(|m| {
                        let id = m.get("id").map(format_minimal).unwrap_or_default();
                        m.get("profit")
                            .or_else(|| m.get("total_cost"))
                            .map(|v| format!("{}: {}", id, format_minimal(v)))
                    })
                    .unwrap_or_else(|| format_minimal(item));
                println!("{}", line);
            }
        }
        other => println!("{}", format_minimal(other)),
    }
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
