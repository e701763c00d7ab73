//! End-to-end session behaviour on a paused clock.

mod common;

use common::{wait_ms, Harness};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use translate_bridge::host::memory::{EditingQuirks, MemoryPage, NodeSpec};
use translate_bridge::persistence::save_selection;
use translate_bridge::{
    ElementDescriptor, ElementKind, ElementRef, EngineId, HostEvent, HostPage, MemoryStore,
    SelectionStore, SessionKey, UiEvent, LAST_SELECTION_KEY,
};

#[tokio::test(start_paused = true)]
async fn test_single_edit_commits_after_quiescence() {
    let h = Harness::start("example.com");
    h.backend.reply("你好", "Hello");

    h.handle.set_local_input("你好").await.unwrap();
    wait_ms(2400).await;
    assert_eq!(h.backend.call_count(), 0);

    wait_ms(200).await;
    assert_eq!(h.backend.calls(), vec!["你好".to_string()]);
    assert!(h.handle.snapshot().await.unwrap().pending.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_second_edit_restarts_quiescence() {
    let h = Harness::start("example.com");

    h.handle.set_local_input("你").await.unwrap();
    wait_ms(1000).await;
    h.handle.set_local_input("你好").await.unwrap();

    // 3.4s after the first edit, 2.4s after the second
    wait_ms(2400).await;
    assert_eq!(h.backend.call_count(), 0);

    wait_ms(200).await;
    assert_eq!(h.backend.calls(), vec!["你好".to_string()]);

    wait_ms(5000).await;
    assert_eq!(h.backend.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_edits_commits_once() {
    let h = Harness::start("example.com");

    for text in ["我", "我们", "我们去", "我们去吃", "我们去吃饭"] {
        h.handle.set_local_input(text).await.unwrap();
        wait_ms(800).await;
    }
    wait_ms(5000).await;

    assert_eq!(h.backend.calls(), vec!["我们去吃饭".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_latin_input_arms_nothing() {
    let h = Harness::start("example.com");

    h.handle.set_local_input("hello").await.unwrap();
    assert!(h.handle.snapshot().await.unwrap().pending.is_empty());

    wait_ms(3000).await;
    assert_eq!(h.backend.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_clearing_input_cancels_commit() {
    let h = Harness::start("example.com");

    h.handle.set_local_input("你好").await.unwrap();
    wait_ms(1000).await;
    h.handle.set_local_input("   ").await.unwrap();

    wait_ms(3000).await;
    assert_eq!(h.backend.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_countdown_is_reported_each_second() {
    let mut h = Harness::start("example.com");

    h.handle.set_local_input("你好").await.unwrap();
    wait_ms(2600).await;

    let countdown: Vec<Option<u32>> = h
        .drain_ui()
        .into_iter()
        .filter_map(|e| match e {
            UiEvent::Countdown {
                key: SessionKey::Local,
                remaining_seconds,
            } => Some(remaining_seconds),
            _ => None,
        })
        .collect();
    assert_eq!(countdown, vec![Some(3), Some(2), Some(1), None]);
}

#[tokio::test(start_paused = true)]
async fn test_auto_mode_plain_field_round_trip() {
    let h = Harness::start("example.com");
    h.backend.reply("你好", "Hello");
    let reply_box = h.add(NodeSpec::new("textarea").id("reply"));

    h.select(reply_box).await;
    h.enable_auto_mode().await;

    h.page.type_text(reply_box, "你好");
    wait_ms(100).await;
    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.local_input, "你好");
    assert_eq!(snapshot.pending, vec![SessionKey::Target(reply_box)]);

    wait_ms(2500).await;
    assert_eq!(h.backend.call_count(), 1);
    assert_eq!(h.page.value(reply_box), Some("Hello".to_string()));

    // Our own write is not a new edit
    wait_ms(5000).await;
    assert_eq!(h.backend.call_count(), 1);
    assert!(h.handle.snapshot().await.unwrap().pending.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rich_write_is_not_re_armed_even_with_source_characters() {
    let h = Harness::start("example.com");
    // The translation itself still contains Chinese, so only the write
    // tracking stops the loop
    h.backend.reply("小红书", "小红书 (Xiaohongshu)");
    let editor = h.add(NodeSpec::new("div").content_editable());

    h.select(editor).await;
    h.enable_auto_mode().await;

    h.page.type_text(editor, "小红书");
    wait_ms(3000).await;
    assert_eq!(h.backend.call_count(), 1);
    assert_eq!(
        h.page.inner_text(editor),
        Some("小红书 (Xiaohongshu)".to_string())
    );

    wait_ms(10_000).await;
    assert_eq!(h.backend.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_single_rich_edit_commits_on_time() {
    let h = Harness::start("example.com");
    let editor = h.add(NodeSpec::new("div").content_editable());
    h.select(editor).await;
    h.enable_auto_mode().await;

    // Input, then KeyUp after the settle delay, for one keystroke
    h.page.type_text(editor, "你好");
    wait_ms(2450).await;
    assert_eq!(h.backend.call_count(), 0);
    wait_ms(100).await;
    assert_eq!(h.backend.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_single_reddit_edit_commits_on_time() {
    let h = Harness::start("www.reddit.com");
    let editor = h.add(NodeSpec::new("div").role("textbox"));
    h.select(editor).await;
    h.enable_auto_mode().await;
    assert!(h.page.is_observed(editor));

    h.page.type_text(editor, "你好");
    wait_ms(2450).await;
    assert_eq!(h.backend.call_count(), 0);
    wait_ms(100).await;
    assert_eq!(h.backend.call_count(), 1);

    wait_ms(5000).await;
    assert_eq!(h.backend.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_clearing_target_cancels_commit() {
    let h = Harness::start("example.com");
    let reply_box = h.add(NodeSpec::new("textarea").id("reply"));
    h.select(reply_box).await;
    h.enable_auto_mode().await;

    h.page.type_text(reply_box, "你好");
    wait_ms(1000).await;
    assert_eq!(
        h.handle.snapshot().await.unwrap().pending,
        vec![SessionKey::Target(reply_box)]
    );

    h.page.type_text(reply_box, "");
    wait_ms(50).await;
    assert!(h.handle.snapshot().await.unwrap().pending.is_empty());

    wait_ms(5000).await;
    assert_eq!(h.backend.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_auto_mode_off_ignores_target_edits() {
    let h = Harness::start("example.com");
    let reply_box = h.add(NodeSpec::new("input").id("q"));
    h.select(reply_box).await;

    h.page.type_text(reply_box, "你好");
    wait_ms(3000).await;

    assert_eq!(h.backend.call_count(), 0);
    assert_eq!(h.handle.snapshot().await.unwrap().local_input, "");
}

#[tokio::test(start_paused = true)]
async fn test_local_commit_fills_target_in_auto_mode() {
    let h = Harness::start("example.com");
    h.backend.reply("谢谢", "Thanks");
    let reply_box = h.add(NodeSpec::new("textarea"));
    h.select(reply_box).await;
    h.enable_auto_mode().await;

    h.handle.set_local_input("谢谢").await.unwrap();
    wait_ms(2600).await;

    assert_eq!(h.page.value(reply_box), Some("Thanks".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_selection_keeps_target() {
    let mut h = Harness::start("example.com");
    let reply_box = h.add(NodeSpec::new("textarea").id("reply"));
    let container = h.add(NodeSpec::new("div").class("card"));
    h.select(reply_box).await;

    assert!(h.handle.enter_selection_mode().await.unwrap());
    h.page.click(container);
    let snapshot = h.handle.snapshot().await.unwrap();

    assert!(!snapshot.selecting);
    assert!(!h.page.click_capture_installed());
    assert_eq!(snapshot.target.map(|t| t.node()), Some(reply_box));
    let statuses = Harness::statuses(&h.drain_ui());
    assert_eq!(
        statuses.last().map(String::as_str),
        Some("The selected element is not a valid input, please select again")
    );
}

#[tokio::test(start_paused = true)]
async fn test_selection_toggle_and_rebind() {
    let h = Harness::start("example.com");
    let first = h.add(NodeSpec::new("input").id("first"));
    let second = h.add(NodeSpec::new("div").role("textbox").class("composer"));

    assert!(h.handle.toggle_selection_mode().await.unwrap());
    assert!(!h.handle.toggle_selection_mode().await.unwrap());
    assert!(!h.page.click(first));

    h.select(first).await;
    assert!(h.page.has_class(first, "active-element"));

    h.select(second).await;
    let target = h.handle.snapshot().await.unwrap().target.unwrap();
    assert_eq!(target.node(), second);
    assert_eq!(target.kind(), ElementKind::AriaTextboxRegion);
    assert_eq!(target.descriptor().class_name, "composer");
    assert!(!h.page.has_class(first, "active-element"));
    assert!(h.page.listeners(first).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_manual_translate() {
    let mut h = Harness::start("example.com");
    h.backend.reply("早上好", "Good morning");

    assert_eq!(h.handle.translate().await.unwrap(), None);
    assert_eq!(
        Harness::outputs(&h.drain_ui()),
        vec!["Please enter text to translate".to_string()]
    );

    h.handle.set_local_input("  早上好 ").await.unwrap();
    assert_eq!(
        h.handle.translate().await.unwrap(),
        Some("Good morning".to_string())
    );
    assert_eq!(h.backend.calls(), vec!["早上好".to_string()]);

    // The pending commit was cancelled by the manual call
    wait_ms(3000).await;
    assert_eq!(h.backend.call_count(), 1);
    let outputs = Harness::outputs(&h.drain_ui());
    assert_eq!(outputs.last().map(String::as_str), Some("Good morning"));
}

#[tokio::test(start_paused = true)]
async fn test_translation_failure_and_empty_result() {
    let mut h = Harness::start("example.com");
    h.backend.fail("坏");
    h.backend.reply("空", "");

    h.handle.set_local_input("坏").await.unwrap();
    assert_eq!(h.handle.translate().await.unwrap(), None);
    let outputs = Harness::outputs(&h.drain_ui());
    assert!(outputs.last().unwrap().starts_with("Translation error:"));

    h.handle.set_local_input("空").await.unwrap();
    assert_eq!(h.handle.translate().await.unwrap(), None);
    let outputs = Harness::outputs(&h.drain_ui());
    assert_eq!(outputs.last().map(String::as_str), Some("Translation result is empty"));
}

#[tokio::test(start_paused = true)]
async fn test_fill_requires_target() {
    let mut h = Harness::start("example.com");
    h.backend.reply("你好", "Hello");
    h.handle.set_local_input("你好").await.unwrap();

    assert_eq!(h.handle.fill_translation_to_target_input().await.unwrap(), None);
    assert_eq!(h.backend.call_count(), 0);
    assert!(Harness::statuses(&h.drain_ui()).contains(&"No target input selected".to_string()));

    let reply_box = h.add(NodeSpec::new("textarea"));
    h.select(reply_box).await;
    assert_eq!(
        h.handle.fill_translation_to_target_input().await.unwrap(),
        Some("Hello".to_string())
    );
    assert_eq!(h.page.value(reply_box), Some("Hello".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_submit_fills_when_bound() {
    let h = Harness::start("example.com");
    h.backend.reply("你好", "Hello");
    let reply_box = h.add(NodeSpec::new("textarea"));

    h.handle.set_local_input("你好").await.unwrap();
    assert_eq!(h.handle.submit().await.unwrap(), Some("Hello".to_string()));
    assert_eq!(h.page.value(reply_box), Some(String::new()));

    h.select(reply_box).await;
    h.handle.submit().await.unwrap();
    assert_eq!(h.page.value(reply_box), Some("Hello".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_stale_translation_is_not_shown() {
    let mut h = Harness::start("example.com");
    h.backend.reply("第一", "First");
    h.backend.reply("第二", "Second");
    h.backend.delay("第一", Duration::from_millis(500));

    h.handle.set_local_input("第一").await.unwrap();
    let slow = {
        let handle = h.handle.clone();
        tokio::spawn(async move { handle.translate().await })
    };
    wait_ms(10).await;
    h.handle.set_local_input("第二").await.unwrap();
    assert_eq!(h.handle.translate().await.unwrap(), Some("Second".to_string()));

    // The slow caller still gets its text back
    assert_eq!(slow.await.unwrap().unwrap(), Some("First".to_string()));

    let outputs = Harness::outputs(&h.drain_ui());
    assert_eq!(outputs.last().map(String::as_str), Some("Second"));
    assert!(!outputs.contains(&"First".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_stale_fill_writes_nothing() {
    let h = Harness::start("example.com");
    h.backend.reply("第一", "First");
    h.backend.reply("第二", "Second");
    h.backend.delay("第一", Duration::from_millis(500));
    let reply_box = h.add(NodeSpec::new("textarea"));
    h.select(reply_box).await;

    h.handle.set_local_input("第一").await.unwrap();
    let slow = {
        let handle = h.handle.clone();
        tokio::spawn(async move { handle.fill_translation_to_target_input().await })
    };
    wait_ms(10).await;
    h.handle.set_local_input("第二").await.unwrap();
    assert_eq!(h.handle.translate().await.unwrap(), Some("Second".to_string()));

    assert_eq!(slow.await.unwrap().unwrap(), None);
    assert_eq!(h.page.value(reply_box), Some(String::new()));
}

#[tokio::test(start_paused = true)]
async fn test_detached_target_reports_status() {
    let mut h = Harness::start("example.com");
    h.backend.reply("你好", "Hello");
    let reply_box = h.add(NodeSpec::new("textarea"));
    h.select(reply_box).await;
    h.page.detach(reply_box);

    h.handle.set_local_input("你好").await.unwrap();
    assert_eq!(h.handle.fill_translation_to_target_input().await.unwrap(), None);
    assert!(Harness::statuses(&h.drain_ui())
        .contains(&"The target input is no longer on the page".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_degraded_rich_write_still_lands() {
    let h = Harness::start("example.com");
    h.backend.reply("你好", "Hello there");
    let editor = h.add(NodeSpec::new("div").content_editable());
    h.page.set_quirks(EditingQuirks {
        delete_supported: true,
        insert_text_supported: false,
    });
    h.select(editor).await;

    h.handle.set_local_input("你好").await.unwrap();
    h.handle.fill_translation_to_target_input().await.unwrap();
    assert_eq!(h.page.inner_text(editor), Some("Hello there".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_reddit_editor_is_watched_for_mutations() {
    let h = Harness::start("www.reddit.com");
    let editor = h.add(NodeSpec::new("div").role("textbox"));
    h.select(editor).await;
    h.enable_auto_mode().await;
    assert!(h.page.is_observed(editor));

    // A script rewrites the editor without any keyboard events
    h.page.rewrite_text(editor, "你好");
    wait_ms(50).await;
    assert_eq!(
        h.handle.snapshot().await.unwrap().pending,
        vec![SessionKey::Target(editor)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_other_sites_do_not_observe_mutations() {
    let h = Harness::start("example.com");
    let editor = h.add(NodeSpec::new("div").role("textbox"));
    h.select(editor).await;
    h.enable_auto_mode().await;
    assert!(!h.page.is_observed(editor));

    h.page.rewrite_text(editor, "你好");
    wait_ms(50).await;
    assert!(h.handle.snapshot().await.unwrap().pending.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_restore_prefers_id() {
    let page = Arc::new(MemoryPage::new("example.com"));
    let by_class = page.append(page.body(), NodeSpec::new("textarea").class("box"));
    let by_id = page.append(page.body(), NodeSpec::new("textarea").id("reply").class("box"));

    let store = Arc::new(MemoryStore::new());
    let saved = ElementRef::new(
        99,
        ElementKind::PlainField,
        ElementDescriptor {
            tag_name: "TEXTAREA".to_string(),
            id: "reply".to_string(),
            name: String::new(),
            class_name: "box".to_string(),
        },
    );
    save_selection(store.as_ref(), LAST_SELECTION_KEY, &saved)
        .await
        .unwrap();

    let h = Harness::start_with(page, store);
    assert!(h.handle.restore_last_selection().await.unwrap());

    let target = h.handle.snapshot().await.unwrap().target.unwrap();
    assert_eq!(target.node(), by_id);
    assert_ne!(target.node(), by_class);
    assert!(h.page.has_class(by_id, "active-element"));
}

#[tokio::test(start_paused = true)]
async fn test_restore_without_candidate_stays_unbound() {
    let h = Harness::start("example.com");
    assert!(!h.handle.restore_last_selection().await.unwrap());

    h.store
        .save(
            LAST_SELECTION_KEY,
            r#"{"tagName":"TEXTAREA","id":"gone","name":"","className":""}"#,
        )
        .await
        .unwrap();
    assert!(!h.handle.restore_last_selection().await.unwrap());
    assert!(h.handle.snapshot().await.unwrap().target.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_unload_saves_selection() {
    let h = Harness::start("example.com");
    let reply_box = h.add(NodeSpec::new("textarea").id("reply").class("box"));
    h.select(reply_box).await;

    h.page.unload();
    h.task.await.unwrap();

    let saved = h.store.load(LAST_SELECTION_KEY).await.unwrap().unwrap();
    let descriptor: ElementDescriptor = serde_json::from_str(&saved).unwrap();
    assert_eq!(descriptor.id, "reply");
    assert_eq!(descriptor.class_name, "box");
    assert!(h.handle.snapshot().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_without_target_saves_nothing() {
    let h = Harness::start("example.com");
    h.handle.shutdown().await.unwrap();
    h.task.await.unwrap();

    assert_eq!(h.store.load(LAST_SELECTION_KEY).await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_engine_switch_is_reported() {
    let mut h = Harness::start("example.com");
    assert_eq!(h.handle.snapshot().await.unwrap().engine, EngineId::Google);

    h.handle.set_engine(EngineId::DeepL).await.unwrap();
    assert_eq!(h.handle.snapshot().await.unwrap().engine, EngineId::DeepL);
    assert!(h
        .drain_ui()
        .iter()
        .any(|e| matches!(e, UiEvent::EngineChanged(EngineId::DeepL))));
}

#[tokio::test(start_paused = true)]
async fn test_unload_through_host_event() {
    let h = Harness::start("example.com");
    let reply_box = h.add(NodeSpec::new("textarea").name("comment"));
    h.select(reply_box).await;

    h.handle.host_event(HostEvent::Unload).unwrap();
    h.task.await.unwrap();

    let saved = h.store.load(LAST_SELECTION_KEY).await.unwrap().unwrap();
    let descriptor: ElementDescriptor = serde_json::from_str(&saved).unwrap();
    assert_eq!(descriptor.name, "comment");
}
