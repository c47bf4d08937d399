//! JSON output for cycle reports and inventory listings.
//!
//! Pretty-printed so it reads well in a terminal and still pipes into jq.

use serde::Serialize;

use crate::error::Result;

pub fn render<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::diff::{Comparison, DiffResult};

    #[test]
    fn comparison_flattens_diff() {
        let comparison = Comparison {
            since: 10,
            current: 20,
            diff: DiffResult {
                added: vec!["svc-c".into()],
                removed: vec![],
                modified: vec!["svc-a".into()],
            },
        };

        let value: serde_json::Value = serde_json::from_str(&render(&comparison).unwrap()).unwrap();
        assert_eq!(value["since"], 10);
        assert_eq!(value["added"][0], "svc-c");
        assert_eq!(value["modified"][0], "svc-a");
    }
}
