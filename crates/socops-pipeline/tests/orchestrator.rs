mod support;

use std::sync::Arc;
use std::time::Duration;

use socops_core::ports::{PipelineStore, StatusUpdate, UpstreamError};
use socops_core::{Channel, GateLevel, PlanStatus, PostStatus};
use socops_pipeline::{evaluate, CopyOrchestrator, GateEngine, PipelineError, WeeklyPlanner};
use support::{
    candidate, sample_output, settings, week, FakeCatalog, FakeGenerator, FakeRules, FakeStore,
};
use tokio_util::sync::CancellationToken;

async fn planned_store() -> Arc<FakeStore> {
    let store = FakeStore::new();
    let catalog = FakeCatalog {
        high_traffic: vec![
            candidate(1, "disque-frein"),
            candidate(2, "plaquette-frein"),
            candidate(3, "filtre-huile"),
            candidate(4, "kit-embrayage"),
        ],
        ..FakeCatalog::default()
    };
    WeeklyPlanner::new(store.clone(), Arc::new(catalog), settings())
        .generate_plan("2026-W09", None, None)
        .await
        .unwrap();
    store
}

fn orchestrator(store: &Arc<FakeStore>, generator: &Arc<FakeGenerator>) -> CopyOrchestrator {
    CopyOrchestrator::new(
        generator.clone(),
        store.clone(),
        FakeRules::new(vec![]),
        settings(),
    )
}

#[tokio::test]
async fn stores_one_generated_post_per_slot() {
    let store = planned_store().await;
    let generator = FakeGenerator::ok();

    let report = orchestrator(&store, &generator)
        .generate_week("2026-W09", false, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.generated, 4);
    assert_eq!(report.failed, 0);
    assert_eq!(report.skipped, 0);
    assert!(report.failures.is_empty());
    assert!(report.previews.is_empty());
    // Mon, Fri, Sun target two channels, Wed (conseil) three.
    assert_eq!(generator.calls(), 9);
    assert_eq!(store.links().len(), 9);

    let posts = store.posts();
    assert_eq!(posts.len(), 4);
    for post in &posts {
        assert_eq!(post.status, PostStatus::Generated);
        assert_eq!(post.primary_channel(), Channel::Instagram);
        let primary = post.primary_variant().unwrap();
        assert_eq!(primary.utm.as_ref(), post.utm.as_ref());
        assert!(post.link_url.starts_with("https://www.example-pieces.fr/pieces/"));
        assert!(!post.link_url.contains("utm_"));
    }

    let plan = store.plan(week()).unwrap();
    assert_eq!(plan.counters.posts_generated, 4);
    assert_eq!(plan.status, PlanStatus::InProgress);
}

#[tokio::test]
async fn variants_fall_back_to_template_format() {
    let store = planned_store().await;
    let generator = FakeGenerator::ok();
    let plan = store.plan(week()).unwrap();
    let monday = &plan.slots[0];

    let copy = orchestrator(&store, &generator)
        .generate_for_slot(monday, week())
        .await
        .unwrap();

    assert_eq!(copy.slot_label, "catalogue-12h");
    assert_eq!(copy.primary_channel, Channel::Instagram);
    let instagram = &copy.variants[&Channel::Instagram];
    assert_eq!(instagram.format.as_deref(), Some("carrousel"));
    assert!(instagram.call_to_action.is_none());
    assert_eq!(
        instagram.utm.as_ref().unwrap().campaign,
        "mktg_2026w09_catalogue_disque-frein"
    );
    assert_eq!(instagram.hashtags, vec!["#frein", "#auto", "#entretien"]);
    assert!(copy.links[&Channel::Facebook]
        .full_url
        .contains("utm_source=facebook"));
    // Single-slot generation never writes.
    assert!(store.posts().is_empty());
}

#[tokio::test]
async fn requests_carry_channel_content_type_and_language() {
    let store = planned_store().await;
    let generator = FakeGenerator::ok();

    orchestrator(&store, &generator)
        .generate_week("2026-W09", true, &CancellationToken::new())
        .await
        .unwrap();

    let requests = generator.requests();
    let youtube = requests
        .iter()
        .filter(|r| r.content_type == "social_youtube")
        .count();
    assert_eq!(youtube, 1);
    assert!(requests.iter().all(|r| r.language == "fr" && !r.use_cache));
    assert!(requests
        .iter()
        .all(|r| r.prompt.contains("https://www.example-pieces.fr/pieces/")));
}

#[tokio::test]
async fn dry_run_previews_without_writing() {
    let store = planned_store().await;
    let generator = FakeGenerator::ok();

    let report = orchestrator(&store, &generator)
        .generate_week("2026-W09", true, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.generated, 4);
    assert_eq!(report.previews.len(), 4);
    let days: Vec<u8> = report.previews.iter().map(|p| p.day_of_week).collect();
    assert_eq!(days, vec![1, 3, 5, 7]);
    assert!(store.posts().is_empty());
    assert!(store.links().is_empty());
    assert_eq!(store.plan(week()).unwrap().status, PlanStatus::Draft);
}

#[tokio::test]
async fn one_failing_channel_does_not_sink_the_slot() {
    let store = planned_store().await;
    let generator = FakeGenerator::new(|req| {
        if req.content_type == "social_facebook" {
            Err(UpstreamError::Unavailable {
                service: "generator".to_string(),
                reason: "quota exceeded".to_string(),
            })
        } else {
            Ok(support::sample_output(&req.content_type))
        }
    });

    let report = orchestrator(&store, &generator)
        .generate_week("2026-W09", false, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.generated, 4);
    assert_eq!(report.failed, 0);
    assert_eq!(report.failures.len(), 4);
    assert!(report
        .failures
        .iter()
        .all(|f| f.channel == Some(Channel::Facebook) && f.reason.contains("quota")));

    for post in store.posts() {
        assert!(post.channels.contains_key(&Channel::Instagram));
        assert!(!post.channels.contains_key(&Channel::Facebook));
    }
    // Links only for channels that produced copy: 4 Instagram + 1 YouTube.
    assert_eq!(store.links().len(), 5);
}

#[tokio::test]
async fn slot_fails_when_no_channel_produces_copy() {
    let store = planned_store().await;
    let generator = FakeGenerator::new(|_| Ok("désolé, je ne peux pas".to_string()));

    let report = orchestrator(&store, &generator)
        .generate_week("2026-W09", false, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.generated, 0);
    assert_eq!(report.failed, 4);
    assert!(report.failures.iter().all(|f| f.channel.is_none()));
    assert!(report.failures[0].reason.contains("no JSON object"));
    assert!(store.posts().is_empty());
}

#[tokio::test]
async fn slow_generator_is_cut_off_by_the_timeout() {
    let store = planned_store().await;
    let generator = FakeGenerator::slow(Duration::from_secs(2));

    let report = orchestrator(&store, &generator)
        .generate_week("2026-W09", false, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.generated, 0);
    assert_eq!(report.failed, 4);
    assert!(report.failures[0].reason.contains("timed out"));
}

#[tokio::test]
async fn cancelled_batch_skips_every_slot() {
    let store = planned_store().await;
    let generator = FakeGenerator::ok();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = orchestrator(&store, &generator)
        .generate_week("2026-W09", false, &cancel)
        .await
        .unwrap();

    assert_eq!(report.skipped, 4);
    assert_eq!(report.generated, 0);
    assert_eq!(generator.calls(), 0);
    assert!(store.posts().is_empty());
}

#[tokio::test]
async fn approved_posts_are_not_overwritten_by_regeneration() {
    let store = planned_store().await;
    let generator = FakeGenerator::ok();
    let orch = orchestrator(&store, &generator);
    orch.generate_week("2026-W09", false, &CancellationToken::new())
        .await
        .unwrap();

    let locked = store.posts().into_iter().find(|p| p.key.day_of_week == 1).unwrap();
    let update = StatusUpdate {
        status: PostStatus::Approved,
        approved_by: Some("marie".to_string()),
        approved_at: None,
        published_at: None,
        clear_approval: false,
    };
    store
        .set_status(locked.id, &[PostStatus::Generated], &update)
        .await
        .unwrap()
        .unwrap();

    let report = orch
        .generate_week("2026-W09", false, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.generated, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(store.posts().len(), 4);
    let after = store.post(locked.id);
    assert_eq!(after.status, PostStatus::Approved);
    assert_eq!(after.approved_by.as_deref(), Some("marie"));
    assert_eq!(after.channels, locked.channels);
}

#[tokio::test]
async fn regeneration_keeps_post_identity() {
    let store = planned_store().await;
    let generator = FakeGenerator::ok();
    let orch = orchestrator(&store, &generator);

    orch.generate_week("2026-W09", false, &CancellationToken::new())
        .await
        .unwrap();
    let mut first: Vec<_> = store.posts().iter().map(|p| p.id).collect();
    orch.generate_week("2026-W09", false, &CancellationToken::new())
        .await
        .unwrap();
    let mut second: Vec<_> = store.posts().iter().map(|p| p.id).collect();

    first.sort();
    second.sort();
    assert_eq!(first, second);
    assert_eq!(store.links().len(), 9);
}

#[tokio::test]
async fn week_without_plan_is_not_found() {
    let store = FakeStore::new();
    let generator = FakeGenerator::ok();

    let err = orchestrator(&store, &generator)
        .generate_week("2026-W09", false, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::NotFound { entity: "plan", .. }));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn caption_without_cta_still_warns_after_generation() {
    let store = planned_store().await;
    let generator = FakeGenerator::new(|_| {
        Ok(r##"{"caption":"Des disques de frein pour votre voiture","hashtags":["#frein"]}"##.to_string())
    });

    orchestrator(&store, &generator)
        .generate_week("2026-W09", false, &CancellationToken::new())
        .await
        .unwrap();

    let posts = store.posts();
    assert_eq!(posts.len(), 4);
    for post in &posts {
        assert!(post.channels.values().all(|v| v.call_to_action.is_none()));
        let summary = evaluate(post, &[]);
        let cta = summary
            .compliance
            .checks
            .iter()
            .find(|c| c.name == "call_to_action")
            .unwrap();
        assert_eq!(cta.level, GateLevel::Warn);
    }
}

#[tokio::test]
async fn cancellation_mid_slot_keeps_stored_copy() {
    let store = planned_store().await;
    let serial = || {
        let mut s = settings();
        s.max_concurrent_generations = 1;
        s
    };
    CopyOrchestrator::new(
        FakeGenerator::ok(),
        store.clone(),
        FakeRules::new(vec![]),
        serial(),
    )
    .generate_week("2026-W09", false, &CancellationToken::new())
    .await
    .unwrap();
    let before: Vec<_> = store.posts().into_iter().map(|p| (p.id, p.channels)).collect();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let generator = FakeGenerator::new(move |req| {
        trigger.cancel();
        Ok(sample_output(&req.content_type).replace("Découvrez", "Profitez de"))
    });
    let report = CopyOrchestrator::new(
        generator.clone(),
        store.clone(),
        FakeRules::new(vec![]),
        serial(),
    )
    .generate_week("2026-W09", false, &cancel)
    .await
    .unwrap();

    assert_eq!(report.generated, 0);
    assert_eq!(report.skipped, 4);
    assert_eq!(generator.calls(), 1);
    for (id, channels) in before {
        assert_eq!(store.post(id).channels, channels);
    }
}

#[tokio::test]
async fn gated_posts_return_to_generated_on_regeneration() {
    let store = planned_store().await;
    let generator = FakeGenerator::ok();
    let orch = orchestrator(&store, &generator);
    orch.generate_week("2026-W09", false, &CancellationToken::new())
        .await
        .unwrap();

    let gate = GateEngine::new(store.clone(), FakeRules::new(vec![]), settings());
    let first = gate.run_for_week("2026-W09").await.unwrap();
    assert_eq!(first.passed + first.failed, 4);
    assert!(store.posts().iter().all(|p| p.status != PostStatus::Generated));

    let report = orch
        .generate_week("2026-W09", false, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.generated, 4);
    for post in store.posts() {
        assert_eq!(post.status, PostStatus::Generated);
    }
    assert!(PostStatus::GatePassed.can_transition_to(PostStatus::Generated));
    assert!(PostStatus::GateFailed.can_transition_to(PostStatus::Generated));

    let second = gate.run_for_week("2026-W09").await.unwrap();
    assert_eq!(second.passed + second.failed, 4);
}
