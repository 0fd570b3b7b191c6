//! On-call job: announce this week's on-call person in the channel topic.

use tracing::{error, info};

use teamops_config::AppConfig;
use teamops_storage::{ConfigStore, save_app_config};
use teamops_types::{JobOutcome, RosterEntry};

use crate::JobError;
use crate::chat::{ChatApi, report_failure};
use crate::rotation::advance;

/// Channel topic naming the on-call person.
pub fn topic_for(person: &RosterEntry) -> String {
    format!(":uia_cat: 本週值班人員: {}", person.name)
}

/// Run the on-call job.
///
/// The advanced rotation is saved only after the topic update succeeded, so a
/// failed run leaves the stored rotation where it was.
pub async fn run(chat: &dyn ChatApi, store: &dyn ConfigStore, config: &AppConfig) -> JobOutcome {
    let on_call = &config.on_call_config;
    if !on_call.enabled {
        let reason = "On-call notification is disabled.";
        info!("{reason}");
        return JobOutcome::Skipped {
            reason: reason.into(),
        };
    }

    match notify(chat, store, config).await {
        Ok(person) => {
            let detail = format!(
                "On-call notification triggered for {} ({}).",
                person.name, person.slack_user_id
            );
            info!(person = %person.name, "{detail}");
            JobOutcome::Succeeded { detail }
        }
        Err(e) => {
            let message = format!("Error sending on-call notification: {e}");
            error!("{message}");
            report_failure(chat, &on_call.slack_channel, &message).await;
            JobOutcome::Failed { error: message }
        }
    }
}

async fn notify(
    chat: &dyn ChatApi,
    store: &dyn ConfigStore,
    config: &AppConfig,
) -> Result<RosterEntry, JobError> {
    let (person, next_state) = advance(&config.on_call_schedule)?;

    chat.set_channel_topic(&config.on_call_config.slack_channel, &topic_for(&person))
        .await
        .map_err(JobError::Chat)?;

    let mut updated = config.clone();
    updated.on_call_schedule = next_state;
    save_app_config(store, &updated).await?;

    Ok(person)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeChat;
    use teamops_storage::{MemoryConfigStore, load_app_config};
    use teamops_types::OnCallSchedule;

    fn config(index: usize, names: &[&str]) -> AppConfig {
        let mut config = AppConfig::default();
        config.on_call_config.enabled = true;
        config.on_call_config.slack_channel = "C-ONCALL".into();
        config.on_call_schedule = OnCallSchedule {
            current_index: index,
            roster: names
                .iter()
                .enumerate()
                .map(|(i, name)| RosterEntry {
                    name: name.to_string(),
                    slack_user_id: format!("U{i:03}"),
                })
                .collect(),
        };
        config
    }

    fn store_with(config: &AppConfig) -> MemoryConfigStore {
        MemoryConfigStore::new(serde_json::to_value(config).unwrap())
    }

    #[tokio::test]
    async fn test_disabled_is_skipped() {
        let chat = FakeChat::new();
        let store = MemoryConfigStore::default();
        let outcome = run(&chat, &store, &AppConfig::default()).await;
        assert_eq!(
            outcome,
            JobOutcome::Skipped {
                reason: "On-call notification is disabled.".into()
            }
        );
        assert!(chat.topics().is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_sets_topic_and_advances() {
        let chat = FakeChat::new();
        let config = config(1, &["Alice", "Bob"]);
        let store = store_with(&config);

        let outcome = run(&chat, &store, &config).await;
        assert_eq!(
            outcome,
            JobOutcome::Succeeded {
                detail: "On-call notification triggered for Bob (U001).".into()
            }
        );
        assert_eq!(
            chat.topics(),
            vec![("C-ONCALL".to_string(), ":uia_cat: 本週值班人員: Bob".to_string())]
        );
        assert!(chat.messages().is_empty());

        let saved = load_app_config(&store).await;
        assert_eq!(saved.on_call_schedule.current_index, 0);
        assert_eq!(saved.on_call_schedule.roster, config.on_call_schedule.roster);
    }

    #[tokio::test]
    async fn test_empty_roster_fails_without_notifying() {
        let chat = FakeChat::new();
        let config = config(0, &[]);
        let store = store_with(&config);

        let outcome = run(&chat, &store, &config).await;
        match &outcome {
            JobOutcome::Failed { error } => assert!(error.contains("roster is empty")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(chat.topics().is_empty());
        assert_eq!(store.save_count(), 0);
        // The failure itself is reported to the channel.
        assert_eq!(chat.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_topic_failure_does_not_persist() {
        let chat = FakeChat::new();
        chat.set_fail_topics(true);
        let config = config(0, &["Alice", "Bob"]);
        let store = store_with(&config);

        let outcome = run(&chat, &store, &config).await;
        assert!(outcome.is_failed());
        assert_eq!(store.save_count(), 0);
        let stored = load_app_config(&store).await;
        assert_eq!(stored.on_call_schedule.current_index, 0);
    }

    #[tokio::test]
    async fn test_save_failure_is_reported() {
        let chat = FakeChat::new();
        let config = config(0, &["Alice", "Bob"]);
        let store = store_with(&config);
        store.set_fail_saves(true);

        let outcome = run(&chat, &store, &config).await;
        assert!(outcome.is_failed());
        assert_eq!(chat.topics().len(), 1);
        assert!(chat.messages()[0].1.contains("Storage error"));
    }

    #[tokio::test]
    async fn test_secondary_chat_failure_is_swallowed() {
        let chat = FakeChat::new();
        chat.set_fail_topics(true);
        chat.set_fail_messages(true);
        let config = config(0, &["Alice"]);
        let store = store_with(&config);

        let outcome = run(&chat, &store, &config).await;
        assert!(outcome.is_failed());
    }
}
