//! Broadcast fan-out through the roster and the chunked send path.

use std::sync::Arc;

use tgrelay::api::TelegramApi;
use tgrelay::broadcast::{BroadcastFilter, BroadcastOptions, BroadcastRule};
use tgrelay::outbound::Outbound;
use tgrelay::roster::{MemoryRoster, Roster};

use crate::mock::ScriptedApi;

fn filter(api: &Arc<ScriptedApi>, roster: Arc<MemoryRoster>) -> BroadcastFilter {
    let outbound = Arc::new(Outbound::new(Arc::clone(api) as Arc<dyn TelegramApi>));
    BroadcastFilter::new(roster, outbound)
}

fn roster() -> Arc<MemoryRoster> {
    let roster = Arc::new(MemoryRoster::default());
    roster.update(1, "bot-alpha").expect("update");
    roster.update(2, "other").expect("update");
    roster
}

#[tokio::test]
async fn push_targets_only_matching_destinations() {
    let api = Arc::new(ScriptedApi::new());
    let filter = filter(&api, roster());

    let options = BroadcastOptions {
        rule: Some(BroadcastRule::Pattern("bot".to_string())),
        ..BroadcastOptions::default()
    };
    let initiated = filter.push("hello", &options).await.expect("push");

    assert_eq!(initiated, 1);
    api.wait_for_calls("sendMessage", 1).await;
    let sends = api.calls_to("sendMessage");
    assert_eq!(sends[0]["chat_id"], 1);
    assert_eq!(sends[0]["text"], "hello");
}

#[tokio::test]
async fn push_without_a_rule_reaches_the_whole_roster() {
    let api = Arc::new(ScriptedApi::new());
    let filter = filter(&api, roster());

    let initiated = filter
        .push("hello", &BroadcastOptions::default())
        .await
        .expect("push");

    assert_eq!(initiated, 2);
    api.wait_for_calls("sendMessage", 2).await;
}

#[tokio::test]
async fn predicate_rule_selects_destinations() {
    let api = Arc::new(ScriptedApi::new());
    let filter = filter(&api, roster());

    let options = BroadcastOptions {
        rule: Some(BroadcastRule::Predicate(Box::new(|name| name == "other"))),
        ..BroadcastOptions::default()
    };
    let initiated = filter.push("hello", &options).await.expect("push");

    assert_eq!(initiated, 1);
    api.wait_for_calls("sendMessage", 1).await;
    assert_eq!(api.calls_to("sendMessage")[0]["chat_id"], 2);
}

#[tokio::test]
async fn individual_delivery_failures_do_not_fail_the_push() {
    let api = Arc::new(ScriptedApi::new());
    api.script("sendMessage", Err("blocked by user"));
    let filter = filter(&api, roster());

    let initiated = filter
        .push("hello", &BroadcastOptions::default())
        .await
        .expect("push");

    // Both deliveries were initiated even though one fails.
    assert_eq!(initiated, 2);
    api.wait_for_calls("sendMessage", 2).await;
}
