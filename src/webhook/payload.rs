use serde_json::Value;

const ID_KEYS: [&str; 3] = ["database_id", "parent_id", "id"];

fn canonical(id: &str) -> String {
    id.replace('-', "").to_lowercase()
}

/// Whether a notification payload mentions `collection_id` anywhere.
///
/// Notion nests the database id differently per event type, so this walks
/// every id-like key and falls back to a plain text search.
pub fn references_collection(payload: &Value, collection_id: &str) -> bool {
    let target = canonical(collection_id);
    if target.is_empty() {
        return false;
    }

    let mut stack = vec![payload];
    while let Some(node) = stack.pop() {
        match node {
            Value::Object(map) => {
                for (key, value) in map {
                    if ID_KEYS.contains(&key.as_str())
                        && value.as_str().is_some_and(|id| canonical(id) == target)
                    {
                        return true;
                    }
                    stack.push(value);
                }
            }
            Value::Array(items) => stack.extend(items),
            _ => {}
        }
    }

    canonical(&payload.to_string()).contains(&target)
}
