//! Service-level tests against an in-memory `SQLite` database.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use myvote_common::{AppError, FeedConfig};
use myvote_core::{
    AccountService, CreatePollInput, CreateUserInput, FeedService, FollowingService, PollService,
    Principal, Relationship, SearchService, VoteService,
};
use myvote_db::entities::user;
use myvote_db::repositories::{
    FollowingRepository, PollOptionRepository, PollRepository, UserRepository, VoteRepository,
};

struct Services {
    account: AccountService,
    following: FollowingService,
    poll: PollService,
    vote: VoteService,
    feed: FeedService,
    search: SearchService,
}

async fn services() -> Services {
    let db = Arc::new(myvote_db::test_utils::sqlite_memory().await.unwrap());

    let user_repo = UserRepository::new(db.clone());
    let following_repo = FollowingRepository::new(db.clone());
    let poll_repo = PollRepository::new(db.clone());
    let option_repo = PollOptionRepository::new(db.clone());
    let vote_repo = VoteRepository::new(db);

    let config = FeedConfig::default();
    let poll = PollService::new(poll_repo.clone(), option_repo.clone(), vote_repo.clone());
    let following = FollowingService::new(following_repo.clone(), user_repo.clone());

    Services {
        account: AccountService::new(
            user_repo.clone(),
            following_repo,
            poll_repo.clone(),
            vote_repo.clone(),
        ),
        vote: VoteService::new(vote_repo, poll_repo.clone(), option_repo, poll.clone()),
        feed: FeedService::new(poll.clone(), following.clone(), user_repo.clone(), config.clone()),
        search: SearchService::new(poll_repo, user_repo, config),
        following,
        poll,
    }
}

async fn signup(services: &Services, username: &str) -> (user::Model, Principal) {
    let user = services
        .account
        .create_user(CreateUserInput {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "password123".to_string(),
            password_confirmation: "password123".to_string(),
        })
        .await
        .unwrap();
    let principal = Principal::from(&user);
    (user, principal)
}

fn poll_input(name: &str, options: &[&str]) -> CreatePollInput {
    CreatePollInput {
        name: name.to_string(),
        description: None,
        options: options.iter().map(ToString::to_string).collect(),
    }
}

async fn pause() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

#[tokio::test]
async fn test_best_color_poll_scenario() {
    let s = services().await;
    let (_, alice) = signup(&s, "alice").await;
    let (_, bob) = signup(&s, "bob").await;

    let created = s
        .poll
        .create_poll(&alice, poll_input("Best color?", &["Red", "", "Blue"]))
        .await
        .unwrap();
    let texts: Vec<&str> = created.options.iter().map(|o| o.option.text.as_str()).collect();
    assert_eq!(texts, vec!["Red", "Blue"]);

    let poll_id = created.poll.id.clone();
    let red = created.options[0].option.id.clone();
    let blue = created.options[1].option.id.clone();

    s.vote.cast_vote(&poll_id, &red, &alice).await.unwrap();
    let again = s.vote.cast_vote(&poll_id, &blue, &alice).await;
    assert!(matches!(again, Err(AppError::AlreadyVoted)));

    let view = s.vote.view_poll(&poll_id, Some(&alice)).await.unwrap();
    assert!(view.has_voted);
    assert!(view.is_owner);
    assert_eq!(view.detail.total_votes, 1);
    assert_eq!(view.detail.options[0].votes, 1);
    assert_eq!(view.detail.options[1].votes, 0);

    let view = s.vote.view_poll(&poll_id, Some(&bob)).await.unwrap();
    assert!(!view.has_voted);
    assert!(!view.is_owner);

    let view = s.vote.view_poll(&poll_id, None).await.unwrap();
    assert!(view.has_voted);
    assert!(!view.is_owner);
}

#[tokio::test]
async fn test_second_vote_is_rejected_and_not_counted() {
    let s = services().await;
    let (_, alice) = signup(&s, "alice").await;
    let (_, bob) = signup(&s, "bob").await;

    let poll = s
        .poll
        .create_poll(&alice, poll_input("Lunch?", &["Soup", "Salad"]))
        .await
        .unwrap();
    let soup = poll.options[0].option.id.clone();
    let salad = poll.options[1].option.id.clone();

    s.vote.cast_vote(&poll.poll.id, &soup, &bob).await.unwrap();
    let second = s.vote.cast_vote(&poll.poll.id, &salad, &bob).await;
    assert!(matches!(second, Err(AppError::AlreadyVoted)));

    let detail = s.poll.get_poll_detail(&poll.poll.id).await.unwrap();
    assert_eq!(detail.total_votes, 1);
}

#[tokio::test]
async fn test_vote_for_option_of_another_poll() {
    let s = services().await;
    let (_, alice) = signup(&s, "alice").await;
    let (_, bob) = signup(&s, "bob").await;

    let first = s
        .poll
        .create_poll(&alice, poll_input("First", &["A", "B"]))
        .await
        .unwrap();
    let second = s
        .poll
        .create_poll(&alice, poll_input("Second", &["C", "D"]))
        .await
        .unwrap();

    let foreign = second.options[0].option.id.clone();
    let result = s.vote.cast_vote(&first.poll.id, &foreign, &bob).await;
    assert!(matches!(result, Err(AppError::OptionNotFound(_))));

    let missing = s.vote.cast_vote("no-such-poll", &foreign, &bob).await;
    assert!(matches!(missing, Err(AppError::PollNotFound(_))));
}

#[tokio::test]
async fn test_invalid_poll_stores_nothing() {
    let s = services().await;
    let (_, alice) = signup(&s, "alice").await;

    let result = s
        .poll
        .create_poll(&alice, poll_input("Lonely", &["Only", "  "]))
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let result = s.poll.create_poll(&alice, poll_input("   ", &["A", "B"])).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    assert_eq!(s.feed.explore(1).await.unwrap().total, 0);
}

#[tokio::test]
async fn test_only_owner_can_delete_poll() {
    let s = services().await;
    let (_, alice) = signup(&s, "alice").await;
    let (_, bob) = signup(&s, "bob").await;

    let poll = s
        .poll
        .create_poll(&alice, poll_input("Keep me?", &["Yes", "No"]))
        .await
        .unwrap();
    s.vote
        .cast_vote(&poll.poll.id, &poll.options[0].option.id, &bob)
        .await
        .unwrap();

    let denied = s.poll.delete_poll(&poll.poll.id, &bob).await;
    assert!(matches!(denied, Err(AppError::PermissionDenied(_))));
    assert!(s.poll.get_poll(&poll.poll.id).await.is_ok());

    s.poll.delete_poll(&poll.poll.id, &alice).await.unwrap();
    assert!(matches!(
        s.poll.get_poll(&poll.poll.id).await,
        Err(AppError::PollNotFound(_))
    ));
}

#[tokio::test]
async fn test_follow_feed_scenario() {
    let s = services().await;
    let (alice_user, alice) = signup(&s, "alice").await;
    let (bob_user, bob) = signup(&s, "bob").await;
    let (_, carol) = signup(&s, "carol").await;

    let older = s
        .poll
        .create_poll(&alice, poll_input("Older", &["A", "B"]))
        .await
        .unwrap();
    pause().await;
    s.poll
        .create_poll(&carol, poll_input("Carol's", &["A", "B"]))
        .await
        .unwrap();
    pause().await;
    let newer = s
        .poll
        .create_poll(&alice, poll_input("Newer", &["A", "B"]))
        .await
        .unwrap();
    pause().await;
    s.poll
        .create_poll(&bob, poll_input("Bob's own", &["A", "B"]))
        .await
        .unwrap();

    // Empty before following anyone
    let feed = s.feed.home_feed(Some(&bob), 1).await.unwrap().unwrap();
    assert_eq!(feed.total, 0);
    assert_eq!(feed.num_pages, 1);

    s.following.follow(&bob, &alice_user.id).await.unwrap();
    // Following twice keeps a single edge
    s.following.follow(&bob, &alice_user.id).await.unwrap();
    assert_eq!(s.following.count_followers(&alice_user.id).await.unwrap(), 1);

    let feed = s.feed.home_feed(Some(&bob), 1).await.unwrap().unwrap();
    let ids: Vec<&str> = feed.items.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec![newer.poll.id.as_str(), older.poll.id.as_str()]);

    let profile = s.following.profile("alice", Some(&bob)).await.unwrap();
    assert_eq!(profile.relationship, Relationship::Following);
    let profile = s.following.profile("bob", Some(&bob)).await.unwrap();
    assert_eq!(profile.relationship, Relationship::SelfView);
    assert_eq!(profile.following_count, 1);

    s.following.unfollow(&bob, &alice_user.id).await.unwrap();
    s.following.unfollow(&bob, &alice_user.id).await.unwrap();
    let feed = s.feed.home_feed(Some(&bob), 1).await.unwrap().unwrap();
    assert_eq!(feed.total, 0);

    assert!(matches!(
        s.following.follow(&bob, &bob_user.id).await,
        Err(AppError::SelfFollow)
    ));
    assert!(matches!(
        s.following.unfollow(&bob, &bob_user.id).await,
        Err(AppError::SelfUnfollow)
    ));
    assert!(s.feed.home_feed(None, 1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_explore_pages_clamp() {
    let s = services().await;
    let (_, alice) = signup(&s, "alice").await;

    for i in 0..12 {
        s.poll
            .create_poll(&alice, poll_input(&format!("Poll {i}"), &["A", "B"]))
            .await
            .unwrap();
    }

    let first = s.feed.explore(1).await.unwrap();
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.num_pages, 2);

    let past_end = s.feed.explore(9).await.unwrap();
    assert_eq!(past_end.number, 2);
    assert_eq!(past_end.items.len(), 2);

    let recent = s.feed.user_recent_polls("ALICE", 1).await.unwrap();
    assert_eq!(recent.title, "Recent polls by alice");
    assert_eq!(recent.page.total, 12);
}

#[tokio::test]
async fn test_search_users_and_polls() {
    let s = services().await;
    let (_, alice) = signup(&s, "alice").await;
    signup(&s, "malice").await;
    signup(&s, "bob").await;

    s.poll
        .create_poll(&alice, poll_input("Best color?", &["Red", "Blue"]))
        .await
        .unwrap();
    s.poll
        .create_poll(&alice, poll_input("Best food?", &["Soup", "Salad"]))
        .await
        .unwrap();

    let users = s.search.search_users("LIC", 1).await.unwrap();
    let names: Vec<&str> = users.items.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["alice", "malice"]);

    let polls = s.search.search_polls("color", 1).await.unwrap();
    assert_eq!(polls.total, 1);
    assert_eq!(polls.items[0].poll.name, "Best color?");
    assert!(polls.items[0].rank >= 0.3);

    let overview = s.search.search_all("   ").await.unwrap();
    assert_eq!(overview.users.total, 0);
    assert_eq!(overview.polls.total, 0);
}

#[tokio::test]
async fn test_search_polls_with_non_ascii_terms() {
    let s = services().await;
    let (_, alice) = signup(&s, "alice").await;

    s.poll
        .create_poll(&alice, poll_input("Ärger im Büro", &["Ja", "Nein"]))
        .await
        .unwrap();
    pause().await;
    s.poll
        .create_poll(&alice, poll_input("ärgerlich?", &["Ja", "Nein"]))
        .await
        .unwrap();

    let polls = s.search.search_polls("Ärger", 1).await.unwrap();
    let names: Vec<&str> = polls.items.iter().map(|r| r.poll.name.as_str()).collect();
    assert_eq!(names, vec!["ärgerlich?", "Ärger im Büro"]);

    let polls = s.search.search_polls("BÜRO", 1).await.unwrap();
    assert_eq!(polls.total, 1);
    assert_eq!(polls.items[0].poll.name, "Ärger im Büro");
}

#[tokio::test]
async fn test_account_lifecycle() {
    let s = services().await;
    let (alice_user, alice) = signup(&s, "alice").await;
    let (_, bob) = signup(&s, "bob").await;

    let duplicate = s
        .account
        .create_user(CreateUserInput {
            username: "Alice".to_string(),
            email: "other@example.com".to_string(),
            password: "password123".to_string(),
            password_confirmation: "password123".to_string(),
        })
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let token = alice_user.token.clone().unwrap();
    assert_eq!(
        s.account.authenticate_by_token(&token).await.unwrap().id,
        alice_user.id
    );
    let new_token = s.account.regenerate_token(&alice_user.id).await.unwrap();
    assert!(s.account.authenticate_by_token(&token).await.is_err());
    assert!(s.account.authenticate_by_token(&new_token).await.is_ok());

    let poll = s
        .poll
        .create_poll(&alice, poll_input("Gone soon", &["A", "B"]))
        .await
        .unwrap();
    s.vote
        .cast_vote(&poll.poll.id, &poll.options[0].option.id, &bob)
        .await
        .unwrap();

    let overview = s.account.get_overview(&alice).await.unwrap();
    assert_eq!(overview.polls_count, 1);
    assert_eq!(overview.votes_count, 0);

    assert!(s.account.delete_user(&alice, "wrong-password").await.is_err());
    s.account.delete_user(&alice, "password123").await.unwrap();

    assert!(s.account.authenticate("alice", "password123").await.is_err());
    assert!(matches!(
        s.poll.get_poll(&poll.poll.id).await,
        Err(AppError::PollNotFound(_))
    ));
    assert_eq!(s.account.get_overview(&bob).await.unwrap().votes_count, 0);
}
