//! Retrieval of cached chunk pages by key and 1-based index.

use gmt_cache::ChunkStore;
use gmt_core::EngineError;
use serde_json::{Value, json};

use super::{McpToolDef, chunk_payload, opt_index, require_str};

pub fn def() -> McpToolDef {
    McpToolDef {
        name: "fetch-chunk",
        description: "Retrieve a specific chunk of a previous changeMode response by cache key \
                      and 1-based index. Use the cacheKey and total reported by the original \
                      response.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "cacheKey": {
                    "type": "string",
                    "description": "Cache key from the original chunked response"
                },
                "chunkIndex": {
                    "type": "number",
                    "description": "1-based index of the chunk to retrieve"
                }
            },
            "required": ["cacheKey", "chunkIndex"]
        }),
    }
}

pub fn handle(cache: &ChunkStore, args: &Value) -> Result<Value, EngineError> {
    let key = require_str(args, "cacheKey")?;
    let index = opt_index(args, "chunkIndex")?.ok_or_else(|| {
        EngineError::InvalidInput("missing required argument 'chunkIndex'".to_string())
    })?;

    let chunk = cache.get(key, index)?;
    Ok(chunk_payload(&chunk, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn seeded_cache() -> ChunkStore {
        let cache = ChunkStore::new(Duration::from_secs(60), 8);
        cache.store("key1", &"line\n".repeat(100), 50);
        cache
    }

    #[test]
    fn test_fetch_returns_page_with_metadata() {
        let cache = seeded_cache();
        let result = handle(&cache, &json!({"cacheKey": "key1", "chunkIndex": 1})).unwrap();
        assert_eq!(result["index"], 1);
        assert_eq!(result["cacheKey"], "key1");
        assert_eq!(result["hasMore"], true);
        assert!(result["content"][0]["text"].as_str().unwrap().contains("line"));
    }

    #[test]
    fn test_index_as_string_accepted() {
        let cache = seeded_cache();
        let result = handle(&cache, &json!({"cacheKey": "key1", "chunkIndex": "2"})).unwrap();
        assert_eq!(result["index"], 2);
    }

    #[test]
    fn test_out_of_range_index_is_invalid_input() {
        let cache = seeded_cache();
        let err = handle(&cache, &json!({"cacheKey": "key1", "chunkIndex": 999})).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_unknown_key_is_not_found() {
        let cache = seeded_cache();
        let err = handle(&cache, &json!({"cacheKey": "nope", "chunkIndex": 1})).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        assert!(err.to_string().contains("re-run"));
    }

    #[test]
    fn test_missing_arguments_rejected() {
        let cache = seeded_cache();
        assert!(handle(&cache, &json!({"chunkIndex": 1})).is_err());
        assert!(handle(&cache, &json!({"cacheKey": "key1"})).is_err());
    }
}
