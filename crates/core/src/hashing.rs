//! 批量记录的内容摘要
//!
//! 摘要基于规范化 JSON：对象的键递归排序，因此字段顺序不同但内容相同的批次
//! 得到相同的摘要。数组顺序保持不变。

use collector_errors::CollectorResult;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// 序列化为键已排序的紧凑 JSON
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> CollectorResult<String> {
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&sort_keys(value))?)
}

/// 规范化 JSON 的 SHA-256 摘要（小写十六进制）
pub fn content_digest<T: Serialize + ?Sized>(value: &T) -> CollectorResult<String> {
    let canonical = canonical_json(value)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(object) => {
            let mut entries: Vec<(String, Value)> = object.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key, sort_keys(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
