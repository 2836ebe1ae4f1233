use std::sync::Arc;

use plaza::guard::Decision;
use plaza::models::{NewComment, NewPost, PostFilters, UserPatch};
use plaza::services::auth::{Credentials, Registration};
use plaza::store::memory::MemoryBackend;
use plaza::Plaza;
use uuid::Uuid;

fn app() -> Plaza {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
    let backend = Arc::new(MemoryBackend::new());
    Plaza::with_backends(backend.clone(), backend)
}

fn registration(nick: &str) -> Registration {
    Registration {
        email: format!("{nick}@example.com"),
        nick_name: nick.to_string(),
        complete_name: format!("{nick} lastname"),
        password: "secret1".to_string(),
        confirm_password: Some("secret1".to_string()),
    }
}

fn credentials(nick: &str) -> Credentials {
    Credentials {
        email: format!("{nick}@example.com"),
        password: "secret1".to_string(),
    }
}

/// Register an account, sign in through the session context and return
/// the cached profile row.
async fn sign_in(app: &Plaza, nick: &str) -> plaza::models::User {
    let signup = app.auth.sign_up(&registration(nick)).await;
    assert!(signup.success, "signup failed: {:?}", signup.error);

    let login = app.session.login(&credentials(nick)).await;
    assert!(login.success, "login failed: {:?}", login.error);

    app.session
        .current_user()
        .await
        .expect("profile row should be cached after login")
}

#[tokio::test]
async fn signup_login_logout_round_trip() {
    let app = app();
    let user = sign_in(&app, "ana").await;
    assert_eq!(user.nick_name, "ana");
    assert!(app.session.is_authenticated().await);

    let session = app.auth.current_session().await;
    assert!(session.success);
    assert_eq!(session.user.unwrap().email, "ana@example.com");

    app.session.logout().await;
    assert!(!app.session.is_authenticated().await);
    let session = app.auth.current_session().await;
    assert!(session.success);
    assert!(session.user.is_none());
}

#[tokio::test]
async fn guard_walks_the_documented_scenarios() {
    let app = app();

    // Unauthenticated: the admin panel bounces to login.
    assert_eq!(app.guard.resolve("/admin").await, Decision::Redirect("/login"));
    // Public and guest-only routes are open.
    assert_eq!(app.guard.resolve("/").await, Decision::Proceed);
    assert_eq!(app.guard.resolve("/login").await, Decision::Proceed);

    // Authenticated non-admin: admin panel bounces home, login is barred.
    sign_in(&app, "ana").await;
    assert_eq!(app.guard.resolve("/admin").await, Decision::Redirect("/"));
    assert_eq!(app.guard.resolve("/login").await, Decision::Redirect("/"));
    assert_eq!(app.guard.resolve("/profile").await, Decision::Proceed);
}

#[tokio::test]
async fn admin_flag_and_nickname_fallback_open_the_panel() {
    let client = app();
    let user = sign_in(&client, "ana").await;

    // Grant the explicit flag and refresh the cached row.
    let patch = UserPatch {
        is_admin: Some(true),
        ..UserPatch::default()
    };
    let updated = client.users.update(user.id, &patch).await.data.unwrap();
    client.session.set_user(updated).await;
    assert!(client.session.is_admin().await);
    assert_eq!(client.guard.resolve("/admin").await, Decision::Proceed);

    // A fresh client whose nickname is literally "admin" also passes.
    let fallback = app();
    sign_in(&fallback, "admin").await;
    assert!(fallback.session.is_admin().await);
    assert_eq!(fallback.guard.resolve("/admin").await, Decision::Proceed);
}

#[tokio::test]
async fn post_create_then_delete_leaves_nothing_behind() {
    let app = app();
    let author = sign_in(&app, "ana").await;

    let created = app
        .posts
        .create(&NewPost {
            description: "first post".to_string(),
            img_path: None,
            user_id: author.user_id,
        })
        .await
        .data
        .unwrap();

    assert!(app.posts.get_by_id(created.id).await.is_ok());
    assert!(app.posts.delete(created.id).await.success);

    let gone = app.posts.get_by_id(created.id).await;
    assert!(gone.data.is_none());
    assert!(gone.error.is_some());
}

#[tokio::test]
async fn toggle_twice_returns_to_the_original_state() {
    let app = app();
    let user = sign_in(&app, "ana").await;
    let post = app
        .posts
        .create(&NewPost {
            description: "toggle me".to_string(),
            img_path: None,
            user_id: user.user_id,
        })
        .await
        .data
        .unwrap();

    let before = app.likes_posts.check_user_liked(user.user_id, post.id).await;
    let first = app.likes_posts.toggle(user.user_id, post.id).await;
    let second = app.likes_posts.toggle(user.user_id, post.id).await;

    assert!(first.error.is_none());
    assert!(second.error.is_none());
    assert_eq!(second.liked, !first.liked);

    let after = app.likes_posts.check_user_liked(user.user_id, post.id).await;
    assert_eq!(after.liked, before.liked);
}

#[tokio::test]
async fn batched_counts_sum_to_total_like_rows() {
    let app = app();
    let author = sign_in(&app, "ana").await;

    let mut ids = Vec::new();
    for n in 0..3 {
        let post = app
            .posts
            .create(&NewPost {
                description: format!("post {n}"),
                img_path: None,
                user_id: author.user_id,
            })
            .await
            .data
            .unwrap();
        ids.push(post.id);
    }

    // 3 likes on the first post, 1 on the second, none on the third.
    for _ in 0..3 {
        app.likes_posts.like(Uuid::new_v4(), ids[0]).await;
    }
    app.likes_posts.like(Uuid::new_v4(), ids[1]).await;

    let counts = app.likes_posts.count_by_posts(&ids).await;
    assert!(counts.error.is_none());
    assert_eq!(counts.counts.values().sum::<u64>(), 4);
    assert_eq!(counts.counts.get(&ids[0]), Some(&3));
    assert_eq!(counts.counts.get(&ids[1]), Some(&1));
    assert!(!counts.counts.contains_key(&ids[2]));
}

#[tokio::test]
async fn like_bounds_select_posts_by_derived_count() {
    let app = app();
    let author = sign_in(&app, "ana").await;

    let mut ids = Vec::new();
    for n in 0..3 {
        let post = app
            .posts
            .create(&NewPost {
                description: format!("post {n}"),
                img_path: None,
                user_id: author.user_id,
            })
            .await
            .data
            .unwrap();
        ids.push(post.id);
    }
    for _ in 0..6 {
        app.likes_posts.like(Uuid::new_v4(), ids[0]).await;
    }
    for _ in 0..12 {
        app.likes_posts.like(Uuid::new_v4(), ids[1]).await;
    }

    let filters = PostFilters {
        likes_min: Some(5),
        likes_max: Some(10),
        ..PostFilters::default()
    };
    let posts = app.posts.get_all(Some(&filters)).await.data.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, ids[0]);
}

#[tokio::test]
async fn comments_carry_their_authors_and_take_likes() {
    let app = app();
    let author = sign_in(&app, "ana").await;
    let post = app
        .posts
        .create(&NewPost {
            description: "discuss".to_string(),
            img_path: None,
            user_id: author.user_id,
        })
        .await
        .data
        .unwrap();

    let comment = app
        .comments
        .create(&NewComment {
            post_id: post.id,
            body: "first!".to_string(),
            user_id: author.user_id,
        })
        .await
        .data
        .unwrap();

    let listed = app.comments.get_by_post(post.id).await.data.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].user.as_ref().unwrap().nick_name, "ana");

    assert!(app.likes_comments.toggle(author.user_id, comment.id).await.liked);
    assert_eq!(app.likes_comments.count_by_comment(comment.id).await.count, 1);

    let dup = app.likes_comments.like(author.user_id, comment.id).await;
    assert!(dup.error.is_some());

    assert!(app.comments.delete(comment.id).await.success);
    assert!(app.comments.get_by_post(post.id).await.data.unwrap().is_empty());
}

#[tokio::test]
async fn uniqueness_probes_report_presence_without_errors() {
    let app = app();
    sign_in(&app, "ana").await;

    let taken = app.users.check_nickname_exists("ana").await;
    assert!(taken.exists);
    assert!(taken.error.is_none());

    let free = app.users.check_nickname_exists("bruno").await;
    assert!(!free.exists);
    assert!(free.error.is_none());

    let email = app.users.check_email_exists("ana@example.com").await;
    assert!(email.exists);
    assert!(email.error.is_none());
}

#[tokio::test]
async fn admin_lifecycle_creates_and_deletes_accounts() {
    let app = app();
    sign_in(&app, "admin").await;

    let created = app.auth.create_user_from_admin(&registration("bruno")).await;
    assert!(created.success);
    assert!(app.users.check_nickname_exists("bruno").await.exists);

    let duplicate = app.auth.create_user_from_admin(&registration("bruno")).await;
    assert!(!duplicate.success);

    let bruno = app
        .users
        .get_all(None)
        .await
        .data
        .unwrap()
        .into_iter()
        .find(|u| u.nick_name == "bruno")
        .unwrap();

    let deleted = app.auth.delete_user_from_admin(bruno.user_id).await;
    assert!(deleted.success);
    assert!(!app.users.check_nickname_exists("bruno").await.exists);
}
