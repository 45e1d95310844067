//! Submission - share action を WorkItem 列に解決する
//!
//! 外部の share action は 0 個以上の resource locator を運んでくる。
//! ここで解決できなかった payload は IntakeQueue に届く前に捨てられる。
//!
//! - `Single`: extras の `stream` キーに URI が 1 つ。解決できなければ全体がエラー
//! - `Multiple`: `stream` 配列。URI でない要素だけ読み飛ばす
//! - `Unsupported`: 知らない action。何も submit しない

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use super::{IntakeError, WorkItem};

/// Key under which a single share carries its resource locator.
pub const STREAM_KEY: &str = "stream";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Submission {
    Single {
        #[serde(default)]
        extras: Option<Map<String, Value>>,
    },
    Multiple {
        #[serde(default)]
        stream: Vec<Value>,
    },
    #[serde(other)]
    Unsupported,
}

impl Submission {
    /// Shorthand for a single share carrying `uri`.
    pub fn single(uri: impl Into<String>) -> Self {
        let mut extras = Map::new();
        extras.insert(STREAM_KEY.to_string(), Value::String(uri.into()));
        Self::Single {
            extras: Some(extras),
        }
    }

    /// Shorthand for a multi-item share.
    pub fn multiple<I, S>(uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Multiple {
            stream: uris.into_iter().map(|u| Value::String(u.into())).collect(),
        }
    }

    /// Resolve to work items in the order the share listed them.
    pub fn resolve(&self) -> Result<Vec<WorkItem>, IntakeError> {
        match self {
            Self::Single { extras } => {
                let extras = extras.as_ref().ok_or_else(|| {
                    IntakeError::InvalidSubmissionPayload("expected extras in single share".into())
                })?;
                let value = extras.get(STREAM_KEY).ok_or_else(|| {
                    IntakeError::InvalidSubmissionPayload(format!("missing `{STREAM_KEY}` in extras"))
                })?;
                let item = parse_item(value).map_err(IntakeError::InvalidSubmissionPayload)?;
                Ok(vec![item])
            }
            Self::Multiple { stream } => Ok(stream
                .iter()
                .filter_map(|value| match parse_item(value) {
                    Ok(item) => Some(item),
                    Err(reason) => {
                        debug!(%reason, "skipping unknown stream entry");
                        None
                    }
                })
                .collect()),
            Self::Unsupported => {
                debug!("unsupported share action, nothing to submit");
                Ok(Vec::new())
            }
        }
    }
}

fn parse_item(value: &Value) -> Result<WorkItem, String> {
    let Some(raw) = value.as_str() else {
        return Err(format!("expected URI for {STREAM_KEY}; got: {value}"));
    };
    Url::parse(raw).map_err(|e| format!("expected URI for {STREAM_KEY}; got {raw:?}: {e}"))?;
    Ok(WorkItem::new(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn single_share_resolves_to_one_item() {
        let items = Submission::single("content://media/external/images/42")
            .resolve()
            .unwrap();
        assert_eq!(items, vec![WorkItem::new("content://media/external/images/42")]);
    }

    #[rstest]
    #[case::no_extras(json!({ "action": "single" }))]
    #[case::missing_stream(json!({ "action": "single", "extras": { "subject": "hi" } }))]
    #[case::not_a_string(json!({ "action": "single", "extras": { "stream": 12 } }))]
    #[case::relative_path(json!({ "action": "single", "extras": { "stream": "photos/1.jpg" } }))]
    fn invalid_single_share_is_rejected(#[case] raw: Value) {
        let submission: Submission = serde_json::from_value(raw).unwrap();
        let err = submission.resolve().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Payload);
    }

    #[test]
    fn multiple_share_skips_unknown_entries_and_keeps_order() {
        let submission: Submission = serde_json::from_value(json!({
            "action": "multiple",
            "stream": ["file:///sdcard/a.jpg", 7, "not a uri", "content://media/b", null],
        }))
        .unwrap();

        let items = submission.resolve().unwrap();
        assert_eq!(
            items,
            vec![
                WorkItem::new("file:///sdcard/a.jpg"),
                WorkItem::new("content://media/b"),
            ]
        );
    }

    #[test]
    fn unknown_action_resolves_to_nothing() {
        let submission: Submission =
            serde_json::from_value(json!({ "action": "view", "data": "x" })).unwrap();
        assert_eq!(submission, Submission::Unsupported);
        assert!(submission.resolve().unwrap().is_empty());
    }
}
