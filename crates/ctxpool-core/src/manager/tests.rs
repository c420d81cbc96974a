//! Tests for context manager

#[cfg(test)]
mod tests {
    use crate::compression::{CompressionFailure, StrategyKind};
    use crate::config::ContextSettings;
    use crate::context::{ContextTier, TierBreakpoints};
    use crate::error::{ContextError, ContextResult};
    use crate::events::ContextEvent;
    use crate::goals::GoalUpdate;
    use crate::hardware::{HardwareInfo, MockHardwareMonitor, ModelProfile, StaticProfiles};
    use crate::llm::stream_utils::from_chunks;
    use crate::llm::{StreamChunk, SummaryProvider, SummaryRequest, TextStream};
    use crate::manager::ContextManager;
    use crate::types::MessageRole;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast;

    enum Script {
        Reply(&'static str),
        Fail,
        Delay(Duration),
    }

    struct ScriptedProvider(Script);

    #[async_trait]
    impl SummaryProvider for ScriptedProvider {
        async fn stream_summary(&self, _request: SummaryRequest) -> ContextResult<TextStream> {
            let text = match &self.0 {
                Script::Reply(text) => *text,
                Script::Fail => return Err(ContextError::llm("model unavailable")),
                Script::Delay(delay) => {
                    tokio::time::sleep(*delay).await;
                    "Earlier work summarized."
                }
            };
            Ok(from_chunks(vec![
                Ok(StreamChunk::content(text)),
                Ok(StreamChunk::final_chunk(Some("stop".into()))),
            ]))
        }
    }

    fn settings(target: usize) -> ContextSettings {
        let mut settings = ContextSettings::default()
            .with_target_size(target)
            .with_strategy(StrategyKind::Truncate)
            .with_thresholds(0.7, 0.8)
            .with_guard_cooldown(Duration::from_secs(30));
        settings.preserve_recent = 256;
        settings.summary_max_tokens = 64;
        settings
    }

    fn with_provider(settings: ContextSettings, script: Script) -> ContextManager {
        ContextManager::builder(settings)
            .with_provider(Arc::new(ScriptedProvider(script)))
            .build()
    }

    /// Content that costs exactly `tokens` with the default counter
    fn body(tokens: usize) -> String {
        "x".repeat((tokens - 4) * 4)
    }

    async fn fill_to(manager: &ContextManager, percent: f64) {
        let usage = manager.usage();
        let wanted = (usage.max_tokens as f64 * percent / 100.0).ceil() as usize;
        let missing = wanted.saturating_sub(usage.current_tokens).max(5);
        manager
            .add_message(MessageRole::Assistant, body(missing))
            .await
            .unwrap();
    }

    /// 10 short user turns each followed by a 150-token answer
    async fn add_dialogue(manager: &ContextManager) {
        for i in 0..10 {
            manager
                .add_message(MessageRole::User, format!("question {i}"))
                .await
                .unwrap();
            manager
                .add_message(MessageRole::Assistant, body(150))
                .await
                .unwrap();
        }
    }

    fn drain(rx: &mut broadcast::Receiver<ContextEvent>) -> Vec<ContextEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn kinds(events: &[ContextEvent]) -> Vec<&'static str> {
        events.iter().map(|e| e.event_type()).collect()
    }

    fn user_contents(manager: &ContextManager) -> Vec<String> {
        manager
            .messages()
            .into_iter()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| m.content)
            .collect()
    }

    #[tokio::test]
    async fn test_operations_require_start() {
        let manager = ContextManager::new(settings(8192));
        let err = manager
            .add_message(MessageRole::User, "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ContextError::NotStarted));
        assert!(matches!(manager.compress().await, Err(ContextError::NotStarted)));
        assert!(matches!(manager.begin_streaming(), Err(ContextError::NotStarted)));
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let manager = ContextManager::new(settings(8192));
        manager.start("base").await.unwrap();
        assert!(matches!(
            manager.start("base").await,
            Err(ContextError::AlreadyStarted)
        ));

        manager.stop();
        assert!(!manager.is_started());
        manager.start("base").await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let manager = ContextManager::new(settings(8192));
        manager.start("").await.unwrap();
        let err = manager
            .add_message(MessageRole::User, "  \n")
            .await
            .unwrap_err();
        assert!(matches!(err, ContextError::InvalidInput { .. }));
        assert!(manager.messages().is_empty());
    }

    #[tokio::test]
    async fn test_start_publishes_initial_tier_and_prompt() {
        let manager = ContextManager::new(settings(8192));
        let mut rx = manager.subscribe();

        let tiers = manager.start("You are a build assistant.").await.unwrap();
        assert_eq!(tiers.actual_context_tier, ContextTier::Tier2Basic);
        assert_eq!(tiers.effective_prompt_tier, ContextTier::Tier2Basic);
        assert!(!tiers.prompt_tier_locked);
        assert_eq!(drain(&mut rx), vec![ContextEvent::TierChanged(tiers)]);

        let prompt = manager.system_prompt();
        assert!(prompt.starts_with("You are a build assistant."));
        assert!(prompt.contains("## Context budget (TIER_2_BASIC)"));
        assert!(manager.usage().committed_tokens > 0);
    }

    #[tokio::test]
    async fn test_manual_resize_publishes_one_tier_change() {
        let manager = ContextManager::new(settings(32_768));
        manager.start("base").await.unwrap();
        assert_eq!(
            manager.tier_state().unwrap().actual_context_tier,
            ContextTier::Tier4Premium
        );
        let mut rx = manager.subscribe();

        let outcome = manager.resize(4096, false).await.unwrap();
        assert_eq!(outcome.target_size, 4096);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        let ContextEvent::TierChanged(change) = events[0] else {
            panic!("expected tier change, got {:?}", events[0]);
        };
        assert_eq!(change.actual_context_tier, ContextTier::Tier1Minimal);
        assert_eq!(change.effective_prompt_tier, ContextTier::Tier1Minimal);
        assert!(!change.prompt_tier_locked);
        assert_eq!(outcome.tier_change, Some(change));
        assert_eq!(manager.usage().max_tokens, 4096);
        assert!(manager.system_prompt().contains("TIER_1_MINIMAL"));
    }

    #[tokio::test]
    async fn test_resize_within_tier_is_silent() {
        let manager = ContextManager::new(settings(32_768));
        manager.start("base").await.unwrap();
        let mut rx = manager.subscribe();

        let outcome = manager.resize(40_000, false).await.unwrap();
        assert_eq!(outcome.tier_change, None);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(manager.settings().target_size, 40_000);
    }

    #[tokio::test]
    async fn test_resize_clamps_to_bounds() {
        let manager = ContextManager::new(settings(8192));
        manager.start("base").await.unwrap();
        let outcome = manager.resize(10, false).await.unwrap();
        assert_eq!(outcome.target_size, manager.settings().min_size);
    }

    fn eight_gib_monitor() -> MockHardwareMonitor {
        let mut monitor = MockHardwareMonitor::new();
        monitor
            .expect_get_info()
            .returning(|| Ok(HardwareInfo::new(8 << 30, 0)));
        monitor
    }

    fn hardware_settings(target: usize, auto_size: bool) -> ContextSettings {
        let mut settings = settings(target).with_auto_size(auto_size);
        settings.vram_buffer = 0;
        settings
    }

    #[tokio::test]
    async fn test_auto_size_follows_hardware() {
        let manager = ContextManager::builder(hardware_settings(4096, true))
            .with_hardware(Arc::new(eight_gib_monitor()))
            .build();

        let tiers = manager.start("base").await.unwrap();
        // 8 GiB at 128 KiB per token
        assert_eq!(manager.usage().max_tokens, 65_536);
        assert_eq!(tiers.hardware_capability_tier, ContextTier::Tier5Ultra);
        assert_eq!(tiers.effective_prompt_tier, tiers.hardware_capability_tier);
        assert!(tiers.prompt_tier_locked);
    }

    #[tokio::test]
    async fn test_switching_to_auto_size_locks_prompt_tier() {
        let manager = ContextManager::builder(hardware_settings(4096, false))
            .with_hardware(Arc::new(eight_gib_monitor()))
            .build();

        let tiers = manager.start("base").await.unwrap();
        assert_eq!(tiers.actual_context_tier, ContextTier::Tier1Minimal);
        assert_eq!(tiers.effective_prompt_tier, ContextTier::Tier1Minimal);
        assert_eq!(tiers.hardware_capability_tier, ContextTier::Tier5Ultra);
        assert!(!tiers.prompt_tier_locked);

        let mut rx = manager.subscribe();
        let outcome = manager.resize(4096, true).await.unwrap();
        let change = outcome.tier_change.unwrap();
        assert_eq!(change.effective_prompt_tier, change.hardware_capability_tier);
        assert!(change.prompt_tier_locked);
        assert_eq!(kinds(&drain(&mut rx)), vec!["tier-changed"]);
    }

    #[tokio::test]
    async fn test_refresh_hardware_resizes_in_auto_mode() {
        let mut monitor = MockHardwareMonitor::new();
        let mut calls = 0;
        monitor.expect_get_info().returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(HardwareInfo::new(8 << 30, 0))
            } else {
                Ok(HardwareInfo::new(8 << 30, 7 << 30))
            }
        });
        let manager = ContextManager::builder(hardware_settings(4096, true))
            .with_hardware(Arc::new(monitor))
            .build();
        manager.start("base").await.unwrap();

        let change = manager.refresh_hardware().await.unwrap().unwrap();
        assert_eq!(manager.usage().max_tokens, 8192);
        assert_eq!(change.hardware_capability_tier, ContextTier::Tier2Basic);
        assert_eq!(change.effective_prompt_tier, ContextTier::Tier2Basic);
    }

    #[tokio::test]
    async fn test_hardware_failure_keeps_requested_size() {
        let mut monitor = MockHardwareMonitor::new();
        monitor
            .expect_get_info()
            .returning(|| Err(ContextError::other("driver not loaded")));
        let manager = ContextManager::builder(hardware_settings(16_384, true))
            .with_hardware(Arc::new(monitor))
            .build();

        let tiers = manager.start("base").await.unwrap();
        assert_eq!(manager.usage().max_tokens, 16_384);
        assert_eq!(tiers.hardware_capability_tier, tiers.actual_context_tier);
    }

    #[tokio::test]
    async fn test_auto_size_without_monitor_keeps_prompt_tier() {
        let manager = ContextManager::new(hardware_settings(16_384, true));
        let tiers = manager.start("base").await.unwrap();
        assert_eq!(tiers.effective_prompt_tier, ContextTier::Tier3Standard);

        for target in [4096, 65_536] {
            let outcome = manager.resize(target, true).await.unwrap();
            assert_eq!(outcome.target_size, target);
            let change = outcome.tier_change.unwrap();
            assert_eq!(change.effective_prompt_tier, ContextTier::Tier3Standard);
            assert_eq!(change.hardware_capability_tier, ContextTier::Tier3Standard);
        }
        assert!(manager.system_prompt().contains("TIER_3_STANDARD"));
    }

    #[tokio::test]
    async fn test_profile_breakpoints_are_used() {
        let breakpoints = TierBreakpoints {
            basic: 2048,
            standard: 4096,
            premium: 8192,
            ultra: 16_384,
        };
        let profiles = StaticProfiles::new().with_profile(ModelProfile {
            model_id: "small-model".into(),
            context_profiles: Vec::new(),
            default_context: 4096,
            max_context: 16_384,
            breakpoints: Some(breakpoints),
        });
        let mut settings = settings(8192);
        settings.model = Some("small-model".into());

        let manager = ContextManager::builder(settings)
            .with_profiles(Arc::new(profiles))
            .build();
        assert_eq!(manager.breakpoints(), breakpoints);

        let tiers = manager.start("base").await.unwrap();
        assert_eq!(tiers.actual_context_tier, ContextTier::Tier4Premium);
    }

    #[tokio::test]
    async fn test_warning_is_published_once() {
        let manager = ContextManager::new(settings(8192));
        manager.start("base").await.unwrap();
        let mut rx = manager.subscribe();

        fill_to(&manager, 72.0).await;
        fill_to(&manager, 75.0).await;

        let events = drain(&mut rx);
        assert_eq!(kinds(&events), vec!["memory-warning"]);
        let ContextEvent::MemoryWarning { percentage } = events[0] else {
            unreachable!()
        };
        assert!((72.0..75.0).contains(&percentage));
    }

    #[tokio::test]
    async fn test_automatic_compression_event_contract() {
        let manager = ContextManager::new(settings(4096));
        manager.start("base").await.unwrap();
        add_dialogue(&manager).await;
        let users = user_contents(&manager);
        let mut rx = manager.subscribe();

        fill_to(&manager, 85.0).await;

        let events = drain(&mut rx);
        assert_eq!(
            kinds(&events),
            vec!["snapshot-created", "summarizing", "compressed"]
        );
        let ContextEvent::Compressed {
            summary,
            tokens_before,
            tokens_after,
        } = &events[2]
        else {
            unreachable!()
        };
        assert!(summary.is_none());
        assert!(tokens_after < tokens_before);
        assert!(*tokens_after * 10 >= *tokens_before * 3);

        assert_eq!(user_contents(&manager), users);
        assert!(manager.usage().percentage < 80.0);
        let notice = manager.messages().pop().unwrap();
        assert_eq!(notice.role, MessageRole::System);
        assert!(notice.content.starts_with("[Context compressed using truncate strategy"));
        assert_eq!(manager.list_snapshots().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_manual_compression_matches_automatic_events() {
        let manager = ContextManager::new(settings(8192));
        manager.start("base").await.unwrap();
        add_dialogue(&manager).await;
        let mut rx = manager.subscribe();

        let outcome = manager.compress().await.unwrap();
        assert!(outcome.applied);
        assert!(outcome.snapshot_id.is_some());
        assert!(outcome.result.compression_ratio >= 0.3);
        assert_eq!(
            kinds(&drain(&mut rx)),
            vec!["snapshot-created", "summarizing", "compressed"]
        );
    }

    #[tokio::test]
    async fn test_compression_without_snapshots() {
        let mut settings = settings(8192);
        settings.snapshots_enabled = false;
        let manager = ContextManager::new(settings);
        manager.start("base").await.unwrap();
        add_dialogue(&manager).await;
        let mut rx = manager.subscribe();

        let outcome = manager.compress().await.unwrap();
        assert!(outcome.snapshot_id.is_none());
        assert_eq!(kinds(&drain(&mut rx)), vec!["summarizing", "compressed"]);
    }

    #[tokio::test]
    async fn test_summary_publishes_created_with_goal_updates() {
        let manager = with_provider(
            settings(8192).with_strategy(StrategyKind::Summarize),
            Script::Reply("Set up the parser.\n[CHECKPOINT] Parse config files - COMPLETED"),
        );
        manager.start("base").await.unwrap();
        add_dialogue(&manager).await;
        let users = user_contents(&manager);
        let mut rx = manager.subscribe();

        let outcome = manager.compress().await.unwrap();
        assert!(outcome.applied);

        let events = drain(&mut rx);
        assert_eq!(
            kinds(&events),
            vec![
                "snapshot-created",
                "summarizing",
                "compressed",
                "auto-summary-created"
            ]
        );
        let ContextEvent::AutoSummaryCreated {
            summary,
            goal_updates,
        } = &events[3]
        else {
            unreachable!()
        };
        assert!(summary.starts_with("Set up the parser."));
        assert!(matches!(
            goal_updates.as_slice(),
            [GoalUpdate::Checkpoint { .. }]
        ));

        let messages = manager.messages();
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[0].content.contains("Set up the parser."));
        assert_eq!(user_contents(&manager), users);
    }

    #[tokio::test]
    async fn test_provider_failure_reports_and_truncates() {
        let manager = with_provider(
            settings(8192).with_strategy(StrategyKind::Hybrid),
            Script::Fail,
        );
        manager.start("base").await.unwrap();
        add_dialogue(&manager).await;
        let mut rx = manager.subscribe();

        let outcome = manager.compress().await.unwrap();
        assert!(outcome.applied);
        assert_eq!(outcome.result.strategy, StrategyKind::Truncate);

        let events = drain(&mut rx);
        assert_eq!(
            kinds(&events),
            vec![
                "snapshot-created",
                "summarizing",
                "auto-summary-failed",
                "compressed"
            ]
        );
        assert!(matches!(
            &events[2],
            ContextEvent::AutoSummaryFailed {
                reason: CompressionFailure::Provider(_)
            }
        ));
    }

    #[tokio::test]
    async fn test_inflated_summary_leaves_history_unchanged() {
        let mut settings = settings(8192).with_strategy(StrategyKind::Summarize);
        settings.summary_max_tokens = 1000;
        let manager = with_provider(settings, Script::Reply("summary"));
        manager.start("base").await.unwrap();
        manager.add_message(MessageRole::User, "hi").await.unwrap();
        manager
            .add_message(MessageRole::Assistant, "hello")
            .await
            .unwrap();
        manager
            .add_message(MessageRole::User, "bye")
            .await
            .unwrap();
        let before = manager.messages();
        let mut rx = manager.subscribe();

        let outcome = manager.compress().await.unwrap();
        assert!(!outcome.applied);
        assert!(outcome.result.is_inflated());
        assert_eq!(outcome.result.strategy, StrategyKind::Truncate);
        assert_eq!(manager.messages(), before);

        let events = drain(&mut rx);
        assert_eq!(
            kinds(&events),
            vec!["snapshot-created", "summarizing", "auto-summary-failed"]
        );
        assert!(matches!(
            &events[2],
            ContextEvent::AutoSummaryFailed {
                reason: CompressionFailure::Inflated { .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_compression_disabled_reports_sustained_once() {
        let mut settings = settings(8192);
        settings.compression_enabled = false;
        let manager = ContextManager::new(settings);
        manager.start("base").await.unwrap();
        let mut rx = manager.subscribe();

        fill_to(&manager, 85.0).await;
        fill_to(&manager, 90.0).await;

        let events = drain(&mut rx);
        assert_eq!(kinds(&events), vec!["critical-sustained"]);
    }

    #[tokio::test]
    async fn test_concurrent_compression_is_rejected() {
        let manager = Arc::new(with_provider(
            settings(8192).with_strategy(StrategyKind::Summarize),
            Script::Delay(Duration::from_millis(200)),
        ));
        manager.start("base").await.unwrap();
        add_dialogue(&manager).await;

        let background = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.compress().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(manager.is_compressing());

        let err = manager.compress().await.unwrap_err();
        assert!(matches!(err, ContextError::CompressionInProgress));
        assert!(err.is_retryable());

        manager
            .add_message(MessageRole::User, "asked while compressing")
            .await
            .unwrap();

        let outcome = background.await.unwrap().unwrap();
        assert!(outcome.applied);
        assert!(!manager.is_compressing());

        let messages = manager.messages();
        let n = messages.len();
        assert_eq!(messages[n - 2].content, "asked while compressing");
        assert!(messages[n - 1].content.starts_with("[Context compressed"));
    }

    #[tokio::test]
    async fn test_stop_discards_running_compression() {
        let manager = Arc::new(with_provider(
            settings(8192).with_strategy(StrategyKind::Summarize),
            Script::Delay(Duration::from_secs(10)),
        ));
        manager.start("base").await.unwrap();
        add_dialogue(&manager).await;
        let before = manager.messages();
        let mut rx = manager.subscribe();

        let background = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.compress().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        manager.stop();

        let outcome = background.await.unwrap().unwrap();
        assert!(!outcome.applied);
        assert_eq!(outcome.result.fallback, Some(CompressionFailure::Cancelled));
        assert_eq!(manager.messages(), before);
        assert!(!kinds(&drain(&mut rx)).contains(&"compressed"));
    }

    #[tokio::test]
    async fn test_restart_discards_compression_from_previous_session() {
        let manager = Arc::new(with_provider(
            settings(8192).with_strategy(StrategyKind::Summarize),
            Script::Delay(Duration::from_secs(10)),
        ));
        manager.start("base").await.unwrap();
        add_dialogue(&manager).await;
        let before = manager.messages();

        let background = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.compress().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        manager.stop();
        manager.start("base").await.unwrap();
        let mut rx = manager.subscribe();

        let outcome = background.await.unwrap().unwrap();
        assert!(!outcome.applied);
        assert_eq!(outcome.result.fallback, Some(CompressionFailure::Cancelled));
        assert_eq!(manager.messages(), before);
        assert!(!kinds(&drain(&mut rx)).contains(&"compressed"));
        assert!(manager.is_started());
    }

    #[tokio::test]
    async fn test_oversized_inflight_report_is_bounded() {
        let manager = ContextManager::new(settings(8192));
        manager.start("base").await.unwrap();
        let committed = manager.usage().committed_tokens;
        manager.begin_streaming().unwrap();

        manager.report_inflight_tokens(1.0e20);
        manager.report_inflight_tokens(f64::MAX);
        let usage = manager.usage();
        assert_eq!(usage.inflight_tokens, u32::MAX as usize);
        assert_eq!(usage.current_tokens, committed + usage.inflight_tokens);
        assert!(manager.check_memory().await.is_ok());

        manager.cancel_streaming();
        assert_eq!(manager.usage().current_tokens, manager.usage().committed_tokens);
    }

    #[tokio::test]
    async fn test_streaming_accounting() {
        let manager = ContextManager::new(settings(8192));
        manager.start("base").await.unwrap();
        manager.begin_streaming().unwrap();
        assert!(manager.is_streaming());

        manager.report_inflight_tokens(120.0);
        let usage = manager.usage();
        assert_eq!(usage.inflight_tokens, 120);
        assert_eq!(usage.current_tokens, usage.committed_tokens + usage.inflight_tokens);

        manager.report_inflight_tokens(-500.0);
        assert_eq!(manager.usage().inflight_tokens, 0);

        manager.report_inflight_tokens(40.0);
        let id = manager.finish_streaming("the answer").await.unwrap();
        assert!(id.is_some());
        assert!(!manager.is_streaming());
        assert_eq!(manager.usage().inflight_tokens, 0);
        assert_eq!(manager.messages().last().unwrap().content, "the answer");
    }

    #[tokio::test]
    async fn test_empty_stream_commits_nothing() {
        let manager = ContextManager::new(settings(8192));
        manager.start("base").await.unwrap();
        manager.begin_streaming().unwrap();
        manager.report_inflight_tokens(10.0);
        assert_eq!(manager.finish_streaming("").await.unwrap(), None);
        assert!(manager.messages().is_empty());

        manager.begin_streaming().unwrap();
        manager.report_inflight_tokens(10.0);
        manager.cancel_streaming();
        assert_eq!(manager.usage().inflight_tokens, 0);
    }

    #[tokio::test]
    async fn test_check_memory_sees_inflight_tokens() {
        let manager = ContextManager::new(settings(8192));
        manager.start("base").await.unwrap();
        let mut rx = manager.subscribe();

        manager.begin_streaming().unwrap();
        manager.report_inflight_tokens(8192.0 * 0.75);
        let usage = manager.check_memory().await.unwrap();
        assert!(usage.percentage >= 75.0);
        assert_eq!(kinds(&drain(&mut rx)), vec!["memory-warning"]);
    }

    #[tokio::test]
    async fn test_snapshot_restore_round_trip() {
        let manager = ContextManager::new(settings(8192));
        manager.start("base").await.unwrap();
        add_dialogue(&manager).await;
        let saved = manager.messages();

        let snapshot = manager
            .create_snapshot(Some("before refactor".into()))
            .await
            .unwrap();
        assert_eq!(snapshot.metadata.label.as_deref(), Some("before refactor"));
        manager
            .add_message(MessageRole::User, "later")
            .await
            .unwrap();
        let mut rx = manager.subscribe();

        let count = manager.restore_snapshot(&snapshot.id).await.unwrap();
        assert_eq!(count, saved.len());
        assert_eq!(manager.messages(), saved);
        assert_eq!(
            drain(&mut rx),
            vec![ContextEvent::SnapshotRestored {
                id: snapshot.id.clone(),
                message_count: saved.len(),
            }]
        );
    }

    #[tokio::test]
    async fn test_restore_missing_snapshot() {
        let manager = ContextManager::new(settings(8192));
        manager.start("base").await.unwrap();
        let err = manager
            .restore_snapshot(&crate::snapshots::SnapshotId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ContextError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_restore_rejects_malformed_id() {
        let manager = ContextManager::new(settings(8192));
        manager.start("base").await.unwrap();
        manager.add_message(MessageRole::User, "keep me").await.unwrap();
        let err = manager
            .restore_snapshot(&crate::snapshots::SnapshotId::from_string("../other/id"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContextError::InvalidInput { .. }));
        assert_eq!(user_contents(&manager), vec!["keep me".to_string()]);
    }

    #[tokio::test]
    async fn test_snapshots_persist_to_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ContextManager::new(settings(8192).with_snapshot_dir(dir.path()));
        manager.start("base").await.unwrap();
        manager.add_message(MessageRole::User, "hi").await.unwrap();

        let snapshot = manager.create_snapshot(None).await.unwrap();
        assert!(dir.path().join(format!("{}.json", snapshot.id)).exists());
    }

    #[tokio::test]
    async fn test_update_settings_resizes() {
        let manager = ContextManager::new(settings(32_768));
        manager.start("base").await.unwrap();
        let mut rx = manager.subscribe();

        let patch = json!({ "target_size": 4096, "warning_threshold": 0.5 });
        let updated = manager
            .update_settings(patch.as_object().unwrap())
            .await
            .unwrap();
        assert_eq!(updated.target_size, 4096);
        assert_eq!(updated.warning_threshold, 0.5);
        assert_eq!(manager.usage().max_tokens, 4096);
        assert_eq!(kinds(&drain(&mut rx)), vec!["tier-changed"]);
    }

    #[tokio::test]
    async fn test_update_settings_rejects_bad_patch() {
        let manager = ContextManager::new(settings(8192));
        let before = manager.settings();

        let unknown = json!({ "target_size": 4096, "bogus": 1 });
        assert!(matches!(
            manager.update_settings(unknown.as_object().unwrap()).await,
            Err(ContextError::InvalidInput { .. })
        ));
        let mistyped = json!({ "target_size": "large" });
        assert!(matches!(
            manager.update_settings(mistyped.as_object().unwrap()).await,
            Err(ContextError::InvalidInput { .. })
        ));
        assert_eq!(manager.settings(), before);
    }

    #[test]
    fn test_estimate_uses_configured_strategy() {
        let manager = ContextManager::new(settings(8192));
        let estimate = manager.estimate_compression();
        assert_eq!(estimate.estimated_tokens, 0);
        assert_eq!(estimate.estimated_ratio, 1.0);
    }
}
