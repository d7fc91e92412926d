use concierge_engine::config::Config;
use concierge_engine::workflow::{Outbox, WorkflowEvent, WorkflowSettings};
use proptest::prelude::*;
use sdk::types::TaskKind;

fn toml_with_dirs(dir: &tempfile::TempDir, body: &str) -> String {
    format!(
        "[core]\ndata_dir = {:?}\n\n[services]\nwork_dir = {:?}\n\n{}",
        dir.path().join("data"),
        dir.path().join("work"),
        body
    )
}

fn any_event() -> impl Strategy<Value = WorkflowEvent> {
    prop_oneof![
        Just(WorkflowEvent::concierge()),
        "[a-z ]{1,20}".prop_map(WorkflowEvent::orchestrate),
        "[a-z ]{1,20}".prop_map(WorkflowEvent::escalate),
        "[A-Za-z ]{1,20}".prop_map(WorkflowEvent::completed),
        (0usize..TaskKind::ALL.len(), "[a-z ]{1,20}")
            .prop_map(|(idx, request)| WorkflowEvent::task(TaskKind::ALL[idx], request)),
        Just(WorkflowEvent::Stop),
    ]
}

// Whatever order agents offer events in, the first one is the one routed.
proptest! {
    #[test]
    fn test_outbox_keeps_first_offer(events in prop::collection::vec(any_event(), 1..8)) {
        let mut outbox = Outbox::default();
        for (i, event) in events.iter().enumerate() {
            prop_assert_eq!(outbox.offer(event.clone()), i == 0);
        }

        prop_assert_eq!(outbox.rejected() as usize, events.len() - 1);
        prop_assert_eq!(outbox.take(), Some(events[0].clone()));
        prop_assert!(outbox.is_empty());
    }
}

// Exit keywords written in any case with stray whitespace still match
// user input the same way after the config is loaded.
proptest! {
    #[test]
    fn test_exit_keywords_are_normalized(
        keyword in "[a-zA-Z]{2,10}",
        left in " {0,3}",
        right in " {0,3}",
    ) {
        let dir = tempfile::TempDir::new().unwrap();
        let toml = toml_with_dirs(
            &dir,
            &format!("[workflow]\nexit_keywords = [{:?}]\n", format!("{}{}{}", left, keyword, right)),
        );
        let config = Config::from_toml_str(&toml).unwrap();

        prop_assert_eq!(&config.workflow.exit_keywords, &vec![keyword.to_lowercase()]);

        let settings = WorkflowSettings::from_config(&config.workflow);
        prop_assert!(settings.is_exit(&keyword.to_uppercase()));
        let padded = format!("  {}\t", keyword);
        prop_assert!(settings.is_exit(&padded));
        let longer = format!("{}x", keyword);
        prop_assert!(!settings.is_exit(&longer));
    }
}

proptest! {
    #[test]
    fn test_workflow_budget_follows_config(timeout_secs in 1u64..100_000) {
        let dir = tempfile::TempDir::new().unwrap();
        let toml = toml_with_dirs(&dir, &format!("[workflow]\ntimeout_secs = {}\n", timeout_secs));
        let config = Config::from_toml_str(&toml).unwrap();

        let settings = WorkflowSettings::from_config(&config.workflow);
        prop_assert_eq!(settings.budget.as_secs(), timeout_secs);
    }
}

proptest! {
    #[test]
    fn test_unknown_provider_is_rejected(provider in "[a-z]{3,12}") {
        prop_assume!(provider != "openai" && provider != "ollama");
        let dir = tempfile::TempDir::new().unwrap();
        let toml = toml_with_dirs(&dir, &format!("[llm]\nprovider = {:?}\n", provider));

        prop_assert!(Config::from_toml_str(&toml).is_err());
    }
}
