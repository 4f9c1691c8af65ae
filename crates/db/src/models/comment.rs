use chrono::{DateTime, Utc};
use sea_orm::{DbErr, JsonValue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A comment embedded in a task or subtask document.
///
/// `author_name` is a snapshot taken when the comment was written and is not
/// updated if the author's username later changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub text: String,
    pub author_id: Uuid,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(text: String, author_id: Uuid, author_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            author_id,
            author_name,
            created_at: Utc::now(),
        }
    }
}

pub(crate) fn decode_comments(value: JsonValue) -> Result<Vec<Comment>, DbErr> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value).map_err(|err| DbErr::Json(err.to_string()))
}

pub(crate) fn encode_comments(comments: &[Comment]) -> Result<JsonValue, DbErr> {
    serde_json::to_value(comments).map_err(|err| DbErr::Json(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_survive_json_column_encoding() {
        let comment = Comment::new("looks good".to_string(), Uuid::new_v4(), "a@x.io".to_string());
        let encoded = encode_comments(std::slice::from_ref(&comment)).unwrap();
        let decoded = decode_comments(encoded).unwrap();
        assert_eq!(decoded, vec![comment]);
        assert!(decode_comments(JsonValue::Null).unwrap().is_empty());
    }
}
