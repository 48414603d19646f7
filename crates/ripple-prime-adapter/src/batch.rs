/*
[INPUT]:  A list of items and an async per-item action
[OUTPUT]: Per-item outcomes in input order
[POS]:    Crate utility - sequential batch execution
[UPDATE]: When adding failure policies
*/

use std::future::Future;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::http::{PrimeError, Result};

/// What to do when one item fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop and return the first error
    #[default]
    Abort,
    /// Record the error for the item and keep going
    ContinueOnFail,
}

#[derive(Debug)]
pub enum ItemOutcome<T> {
    Completed { index: usize, output: T },
    Failed { index: usize, error: PrimeError },
}

impl<T> ItemOutcome<T> {
    pub fn index(&self) -> usize {
        match self {
            ItemOutcome::Completed { index, .. } | ItemOutcome::Failed { index, .. } => *index,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ItemOutcome::Failed { .. })
    }
}

impl<T: Serialize> ItemOutcome<T> {
    /// Output as JSON, or `{"error": message}` for a failed item
    pub fn to_json(&self) -> Value {
        match self {
            ItemOutcome::Completed { output, .. } => {
                serde_json::to_value(output).unwrap_or(Value::Null)
            }
            ItemOutcome::Failed { error, .. } => json!({ "error": error.to_string() }),
        }
    }
}

/// Run `action` for each item in order
pub async fn run_batch<I, T, F, Fut>(
    items: I,
    policy: FailurePolicy,
    mut action: F,
) -> Result<Vec<ItemOutcome<T>>>
where
    I: IntoIterator,
    F: FnMut(usize, I::Item) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut outcomes = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        match action(index, item).await {
            Ok(output) => outcomes.push(ItemOutcome::Completed { index, output }),
            Err(error) => match policy {
                FailurePolicy::Abort => return Err(error),
                FailurePolicy::ContinueOnFail => {
                    warn!(index, error = %error, "batch item failed, continuing");
                    outcomes.push(ItemOutcome::Failed { index, error });
                }
            },
        }
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn halve(value: u32) -> Result<u32> {
        if value % 2 == 0 {
            Ok(value / 2)
        } else {
            Err(PrimeError::Protocol(format!("{value} is odd")))
        }
    }

    #[tokio::test]
    async fn test_abort_returns_first_error() {
        let err = run_batch([2, 3, 5], FailurePolicy::Abort, |_, v| halve(v))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Protocol error: 3 is odd");
    }

    #[tokio::test]
    async fn test_continue_records_failures_in_order() {
        let outcomes = run_batch([2, 3, 8], FailurePolicy::ContinueOnFail, |_, v| halve(v))
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[1].is_failed());
        assert_eq!(outcomes[2].index(), 2);
        assert_eq!(outcomes[0].to_json(), json!(1));
        assert_eq!(outcomes[1].to_json(), json!({"error": "Protocol error: 3 is odd"}));
    }
}
