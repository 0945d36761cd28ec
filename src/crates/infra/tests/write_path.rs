mod common;

use application::command::behavior::PlayCmd;
use application::command::policy::{CounterPolicy, WriteMode};
use application::error::AppError;
use common::{toggle, Harness};
use domain::counter::{CounterKind, StatRepository, TargetScope};
use domain::comment::CommentRepository;
use domain::interaction::{Interaction, InteractionRepository, RelationKind};
use domain::value::{CommentId, UserId, VideoId};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_likes_duplicate_and_unlike_settle_at_twelve() {
    let h = Arc::new(Harness::new());
    h.stats.overwrite(CounterKind::Like, 100, 10).await.unwrap();
    h.interactions
        .insert(&Interaction::new(UserId::from(1), RelationKind::Like, 100).unwrap())
        .await
        .unwrap();

    // 三个新用户并发点赞，其中一人重复点击，老用户同时取消
    let mut tasks: Vec<_> = [2i64, 3, 4, 2]
        .into_iter()
        .map(|user| {
            let h = h.clone();
            tokio::spawn(async move { h.like(user, 100).await })
        })
        .collect();
    tasks.push({
        let h = h.clone();
        tokio::spawn(async move { h.unlike(1, 100).await })
    });
    for task in tasks {
        task.await.unwrap();
    }

    let view = h.hydration.video(None, VideoId::from(100)).await.unwrap();
    assert_eq!(view.like_count, 12);
    assert_eq!(h.stats.value(CounterKind::Like, 100), 10);
    assert_eq!(h.buffer.pending(CounterKind::Like, 100).await.unwrap(), 2);

    let report = h.scheduler.flush_once(CounterKind::Like).await.unwrap();
    assert_eq!(report.net_delta, 2);
    assert_eq!(h.stats.value(CounterKind::Like, 100), 12);
    assert_eq!(h.buffer.pending(CounterKind::Like, 100).await.unwrap(), 0);

    assert_eq!(h.interactions.len(), 3);
    assert!(!h
        .interactions
        .exists(UserId::from(1), RelationKind::Like, 100)
        .await
        .unwrap());
    for user in 2..=4 {
        assert!(h
            .interactions
            .exists(UserId::from(user), RelationKind::Like, 100)
            .await
            .unwrap());
    }

    let view = h.hydration.video(None, VideoId::from(100)).await.unwrap();
    assert_eq!(view.like_count, 12);
}

#[tokio::test]
async fn test_repeated_like_counts_once() {
    let h = Harness::new();
    h.like(7, 1).await;
    h.like(7, 1).await;

    let view = h
        .hydration
        .video(Some(UserId::from(7)), VideoId::from(1))
        .await
        .unwrap();
    assert_eq!(view.like_count, 1);
    assert_eq!(view.liked, Some(true));
    assert_eq!(h.interactions.len(), 1);
}

#[tokio::test]
async fn test_redundant_unlike_never_goes_negative() {
    let h = Harness::new();
    h.unlike(7, 1).await;
    h.unlike(7, 1).await;

    let view = h.hydration.video(None, VideoId::from(1)).await.unwrap();
    assert_eq!(view.like_count, 0);
    assert_eq!(h.buffer.pending(CounterKind::Like, 1).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_likes_from_distinct_users_converge() {
    let h = Arc::new(Harness::new());
    let tasks: Vec<_> = (1..=100)
        .map(|user| {
            let h = h.clone();
            tokio::spawn(async move { h.like(user, 55).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let view = h.hydration.video(None, VideoId::from(55)).await.unwrap();
    assert_eq!(view.like_count, 100);

    h.scheduler.flush_all().await;
    assert_eq!(h.stats.value(CounterKind::Like, 55), 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_double_click_from_same_user_counts_once() {
    let h = Arc::new(Harness::new());
    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let h = h.clone();
            tokio::spawn(async move { h.like(9, 3).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(h.interactions.len(), 1);
    let view = h.hydration.video(None, VideoId::from(3)).await.unwrap();
    assert_eq!(view.like_count, 1);
}

#[tokio::test]
async fn test_follow_self_is_rejected() {
    let h = Harness::new();
    let err = h
        .recorder
        .toggle_on(&h.ctx, toggle(4, RelationKind::Follow, 4))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert!(h.interactions.is_empty());

    h.recorder
        .toggle_on(&h.ctx, toggle(4, RelationKind::Follow, 5))
        .await
        .unwrap();
    assert_eq!(h.interactions.len(), 1);
}

#[tokio::test]
async fn test_cache_outage_fails_write_and_rolls_back_relation() {
    let h = Harness::new();
    h.cache.set_unavailable(true);

    let err = h
        .recorder
        .toggle_on(&h.ctx, toggle(1, RelationKind::Like, 8))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CacheUnavailable(_)));
    assert!(err.is_transient());
    assert!(h.interactions.is_empty());

    h.cache.set_unavailable(false);
    h.like(1, 8).await;
    let view = h.hydration.video(None, VideoId::from(8)).await.unwrap();
    assert_eq!(view.like_count, 1);
}

#[tokio::test]
async fn test_synchronous_policy_writes_through() {
    let policy = CounterPolicy::default().with(CounterKind::Favorite, WriteMode::Synchronous);
    let h = Harness::with_policy(policy);

    h.recorder
        .toggle_on(&h.ctx, toggle(2, RelationKind::Favorite, 40))
        .await
        .unwrap();

    assert_eq!(h.stats.value(CounterKind::Favorite, 40), 1);
    assert_eq!(h.buffer.pending(CounterKind::Favorite, 40).await.unwrap(), 0);
    let view = h.hydration.video(None, VideoId::from(40)).await.unwrap();
    assert_eq!(view.favorite_count, 1);
}

#[tokio::test]
async fn test_plays_and_shares_count_every_time() {
    let h = Harness::new();
    for _ in 0..3 {
        h.recorder
            .play(
                &h.ctx,
                PlayCmd {
                    video_id: VideoId::from(6),
                    user_id: UserId::from(1),
                },
            )
            .await
            .unwrap();
    }
    h.recorder
        .share(&h.ctx, VideoId::from(6), UserId::from(1))
        .await
        .unwrap();
    h.recorder
        .share(&h.ctx, VideoId::from(6), UserId::from(1))
        .await
        .unwrap();

    let view = h.hydration.video(None, VideoId::from(6)).await.unwrap();
    assert_eq!(view.play_count, 3);
    assert_eq!(view.share_count, 2);
}

#[tokio::test]
async fn test_comment_and_comment_like() {
    let h = Harness::new();
    let comment_id = h
        .recorder
        .comment(&h.ctx, VideoId::from(11), UserId::from(2), "  nice cut  ")
        .await
        .unwrap();

    let stored = h.comments.find_by_id(comment_id).await.unwrap().unwrap();
    assert_eq!(stored.content, "nice cut");
    assert!(h
        .stats
        .find(TargetScope::Comment, comment_id.as_i64())
        .await
        .unwrap()
        .is_some());

    h.recorder
        .toggle_on(&h.ctx, toggle(3, RelationKind::CommentLike, comment_id.as_i64()))
        .await
        .unwrap();

    let view = h.hydration.video(None, VideoId::from(11)).await.unwrap();
    assert_eq!(view.comment_count, 1);

    let comments = h
        .hydration
        .comments(Some(UserId::from(3)), &[comment_id, CommentId::from(999)])
        .await
        .unwrap();
    assert_eq!(comments[0].like_count, 1);
    assert_eq!(comments[0].liked, Some(true));
    assert_eq!(comments[1].liked, Some(false));
}

#[tokio::test]
async fn test_empty_comment_is_rejected_without_counting() {
    let h = Harness::new();
    let err = h
        .recorder
        .comment(&h.ctx, VideoId::from(12), UserId::from(2), "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CommentError(_)));
    assert!(h.comments.is_empty());

    let view = h.hydration.video(None, VideoId::from(12)).await.unwrap();
    assert_eq!(view.comment_count, 0);
}
