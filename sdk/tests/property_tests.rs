use proptest::prelude::*;
use sdk::errors::{ConciergeErrorExt, EngineError};
use sdk::types::{TaskKind, ToolArgs};

// Hints must never echo the raw detail carried by the error.
proptest! {
    #[test]
    fn test_error_user_hint_completeness(detail in "[a-zA-Z0-9_./-]{12,40}") {
        let errs = vec![
            EngineError::Config(detail.clone()),
            EngineError::DispatchFailure(detail.clone()),
            EngineError::external("llm", detail.clone()),
            EngineError::ToolNotFound(detail.clone()),
            EngineError::InvalidInput(detail.clone()),
            EngineError::Invariant(detail.clone()),
            EngineError::DispatchAmbiguity { accepted: detail.clone(), rejected: detail.clone() },
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            prop_assert!(!hint.contains(&detail));
        }
    }
}

proptest! {
    #[test]
    fn test_tool_args_string_params_round_trip(
        key in "[a-z_]{1,12}",
        value in "\\PC{0,40}",
    ) {
        let raw = serde_json::json!({ key.clone(): value.clone() }).to_string();
        let args = ToolArgs::from_json(&raw).unwrap();
        prop_assert_eq!(args.param_str(&key).unwrap(), value);
    }
}

proptest! {
    #[test]
    fn test_task_kind_parse_matches_display(idx in 0usize..TaskKind::ALL.len()) {
        let kind = TaskKind::ALL[idx];
        prop_assert_eq!(kind.to_string().parse::<TaskKind>().unwrap(), kind);
        prop_assert!(kind.emit_tool().starts_with("emit_"));
    }
}
