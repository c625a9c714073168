use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Unsolicited line pushed to the UI after a response.
pub fn event(name: &str, payload: serde_json::Value) -> serde_json::Value {
    let mut line = json!({ "event": name });
    if let (Some(obj), serde_json::Value::Object(extra)) = (line.as_object_mut(), payload) {
        obj.extend(extra);
    }
    line
}
