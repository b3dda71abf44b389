use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::http::{StatusCode, header};
use actix_web::test as actix_test;
use actix_web::{App, web};
use quill_core::domain::{Group, Post, User};
use quill_core::ports::{BaseRepository, PasswordService, PostFilter, PostRepository, TokenService};
use quill_infra::auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
use quill_infra::memory::InMemoryStore;

use super::{PageQuery, configure_routes};
use crate::middleware::auth::SESSION_COOKIE;
use crate::middleware::error::error_pages;
use crate::state::AppState;

macro_rules! init_app {
    ($state:expr) => {
        actix_test::init_service(
            App::new()
                .wrap(error_pages())
                .app_data(web::Data::new($state))
                .configure(configure_routes),
        )
        .await
    };
}

const PASSWORD: &str = "correct-horse";

struct Fixture {
    store: Arc<InMemoryStore>,
    state: AppState,
    author: User,
    reader: User,
    group: Group,
}

async fn fixture() -> Fixture {
    let store = InMemoryStore::new();
    let password_hash = Argon2PasswordService::new().hash(PASSWORD).unwrap();

    let author = store
        .users()
        .save(User::new(
            "testauthor".into(),
            "author@example.com".into(),
            password_hash.clone(),
        ))
        .await
        .unwrap();
    let reader = store
        .users()
        .save(User::new(
            "testviewer".into(),
            "viewer@example.com".into(),
            password_hash,
        ))
        .await
        .unwrap();
    let group = store
        .groups()
        .save(Group::new("Test group", "testgroup", "Test description"))
        .await
        .unwrap();

    let tokens = Arc::new(JwtTokenService::new(JwtConfig {
        secret: "handler-tests".to_string(),
        expiration_hours: 1,
        issuer: "quill-tests".to_string(),
    }));
    let state = AppState::in_memory(store.clone(), tokens).unwrap();

    Fixture {
        store,
        state,
        author,
        reader,
        group,
    }
}

impl Fixture {
    async fn seed_posts(&self, n: usize) -> Vec<Post> {
        let mut posts = Vec::with_capacity(n);
        for i in 1..=n {
            let post = self
                .store
                .posts()
                .save(Post::new(
                    self.author.id,
                    format!("Test post #{i}"),
                    Some(self.group.id),
                ))
                .await
                .unwrap();
            posts.push(post);
        }
        posts
    }

    fn session(&self, user: &User) -> Cookie<'static> {
        let token = self
            .state
            .tokens
            .generate_token(user.id, &user.username)
            .unwrap();
        Cookie::new(SESSION_COOKIE, token)
    }

    async fn post_count(&self) -> u64 {
        self.store.posts().count(PostFilter::All).await.unwrap()
    }
}

fn location(res: &actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>) -> &str {
    res.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn cards_in(body: &[u8]) -> usize {
    String::from_utf8_lossy(body)
        .matches("<article class=\"post\">")
        .count()
}

#[actix_rt::test]
async fn test_public_pages_render() {
    let fx = fixture().await;
    let posts = fx.seed_posts(1).await;
    let app = init_app!(fx.state.clone());

    for uri in [
        "/".to_string(),
        "/group/testgroup/".to_string(),
        "/profile/testauthor/".to_string(),
        format!("/posts/{}/", posts[0].id),
        "/auth/login/".to_string(),
        "/auth/signup/".to_string(),
    ] {
        let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(res.status(), StatusCode::OK, "{uri}");
        let content_type = res.headers().get(header::CONTENT_TYPE).unwrap();
        assert!(content_type.to_str().unwrap().starts_with("text/html"), "{uri}");
    }
}

#[actix_rt::test]
async fn test_listings_show_ten_then_remainder() {
    let fx = fixture().await;
    fx.seed_posts(15).await;
    let app = init_app!(fx.state.clone());

    for base in ["/", "/group/testgroup/", "/profile/testauthor/"] {
        let first = actix_test::call_and_read_body(&app, actix_test::TestRequest::get().uri(base).to_request()).await;
        assert_eq!(cards_in(&first), 10, "{base}");

        let uri = format!("{base}?page=2");
        let second = actix_test::call_and_read_body(&app, actix_test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(cards_in(&second), 5, "{uri}");
    }
}

#[actix_rt::test]
async fn test_bad_page_numbers_fall_back() {
    let fx = fixture().await;
    fx.seed_posts(15).await;
    let app = init_app!(fx.state.clone());

    let body = actix_test::call_and_read_body(&app, actix_test::TestRequest::get().uri("/?page=abc").to_request()).await;
    assert_eq!(cards_in(&body), 10);

    let body = actix_test::call_and_read_body(&app, actix_test::TestRequest::get().uri("/?page=99").to_request()).await;
    assert_eq!(cards_in(&body), 5);
}

#[test]
fn test_page_query_takes_last_value() {
    assert_eq!(PageQuery::parse("page=1&page=2").page.as_deref(), Some("2"));
    assert_eq!(PageQuery::parse("foo=bar").page, None);
    assert_eq!(PageQuery::parse("").page, None);
}

#[actix_rt::test]
async fn test_repeated_page_uses_last_value() {
    let fx = fixture().await;
    fx.seed_posts(15).await;
    let app = init_app!(fx.state.clone());

    let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/?page=1&page=2").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(cards_in(&actix_test::read_body(res).await), 5);
}

#[actix_rt::test]
async fn test_repeated_group_field_uses_last_value() {
    let fx = fixture().await;
    let app = init_app!(fx.state.clone());
    let group_id = fx.group.id.to_string();

    let req = actix_test::TestRequest::post()
        .uri("/create/")
        .cookie(fx.session(&fx.author))
        .set_form([("text", "Twice grouped"), ("group", ""), ("group", group_id.as_str())])
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::FOUND);
    let posts = fx.store.posts().fetch(PostFilter::Group(fx.group.id), 0, 10).await.unwrap();
    assert_eq!(posts.len(), 1);
}

#[actix_rt::test]
async fn test_group_page_lists_only_its_posts() {
    let fx = fixture().await;
    fx.seed_posts(2).await;
    let other = fx
        .store
        .groups()
        .save(Group::new("Other", "other", ""))
        .await
        .unwrap();
    let app = init_app!(fx.state.clone());

    let body = actix_test::call_and_read_body(&app, actix_test::TestRequest::get().uri("/group/other/").to_request()).await;
    assert_eq!(cards_in(&body), 0);
    assert!(String::from_utf8_lossy(&body).contains(&other.title));
}

#[actix_rt::test]
async fn test_unknown_resources_are_404() {
    let fx = fixture().await;
    let app = init_app!(fx.state.clone());

    for uri in [
        "/group/missing/",
        "/profile/nobody/",
        "/posts/999/",
        "/posts/abc/",
        "/unexisting_page/",
    ] {
        let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{uri}");

        let body = actix_test::read_body(res).await;
        assert!(String::from_utf8_lossy(&body).contains("Page not found"), "{uri}");
    }
}

#[actix_rt::test]
async fn test_anonymous_authoring_redirects_to_login() {
    let fx = fixture().await;
    let posts = fx.seed_posts(1).await;
    let app = init_app!(fx.state.clone());

    let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/create/").to_request()).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/auth/login/?next=/create/");

    let edit = format!("/posts/{}/edit/", posts[0].id);
    let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri(&edit).to_request()).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), format!("/auth/login/?next={edit}"));

    let req = actix_test::TestRequest::post()
        .uri("/create/")
        .set_form([("text", "Anonymous post")])
        .to_request();
    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/auth/login/?next=/create/");
    assert_eq!(fx.post_count().await, 1);
}

#[actix_rt::test]
async fn test_create_publishes_and_redirects_to_profile() {
    let fx = fixture().await;
    let app = init_app!(fx.state.clone());
    let group_id = fx.group.id.to_string();

    let req = actix_test::TestRequest::post()
        .uri("/create/")
        .cookie(fx.session(&fx.author))
        .set_form([("text", "Fresh post"), ("group", group_id.as_str())])
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/profile/testauthor/");
    assert_eq!(fx.post_count().await, 1);

    let posts = fx.store.posts().fetch(PostFilter::Group(fx.group.id), 0, 10).await.unwrap();
    assert_eq!(posts[0].text, "Fresh post");
    assert_eq!(posts[0].author_id, fx.author.id);
}

#[actix_rt::test]
async fn test_create_with_blank_text_rerenders_form() {
    let fx = fixture().await;
    let app = init_app!(fx.state.clone());

    let req = actix_test::TestRequest::post()
        .uri("/create/")
        .cookie(fx.session(&fx.author))
        .set_form([("text", "   "), ("group", "")])
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::OK);
    let body = actix_test::read_body(res).await;
    assert!(String::from_utf8_lossy(&body).contains("This field is required."));
    assert_eq!(fx.post_count().await, 0);
}

#[actix_rt::test]
async fn test_author_edit_updates_in_place() {
    let fx = fixture().await;
    let posts = fx.seed_posts(1).await;
    let app = init_app!(fx.state.clone());
    let uri = format!("/posts/{}/edit/", posts[0].id);

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&uri)
            .cookie(fx.session(&fx.author))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let req = actix_test::TestRequest::post()
        .uri(&uri)
        .cookie(fx.session(&fx.author))
        .set_form([("text", "Edited text")])
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), format!("/posts/{}/", posts[0].id));
    assert_eq!(fx.post_count().await, 1);

    let post = fx.store.posts().find_by_id(posts[0].id).await.unwrap().unwrap();
    assert_eq!(post.text, "Edited text");
    assert_eq!(post.group_id, None);
    assert_eq!(post.pub_date, posts[0].pub_date);
}

#[actix_rt::test]
async fn test_non_author_edit_redirects_to_detail() {
    let fx = fixture().await;
    let posts = fx.seed_posts(1).await;
    let app = init_app!(fx.state.clone());
    let uri = format!("/posts/{}/edit/", posts[0].id);
    let detail = format!("/posts/{}/", posts[0].id);

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&uri)
            .cookie(fx.session(&fx.reader))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), detail);

    let req = actix_test::TestRequest::post()
        .uri(&uri)
        .cookie(fx.session(&fx.reader))
        .set_form([("text", "Hijacked")])
        .to_request();
    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), detail);

    let post = fx.store.posts().find_by_id(posts[0].id).await.unwrap().unwrap();
    assert_eq!(post.text, "Test post #1");
}

#[actix_rt::test]
async fn test_login_sets_session_and_follows_next() {
    let fx = fixture().await;
    let app = init_app!(fx.state.clone());

    let req = actix_test::TestRequest::post()
        .uri("/auth/login/?next=/create/")
        .set_form([("username", "testauthor"), ("password", PASSWORD)])
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/create/");
    let cookie = res
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .unwrap();
    assert!(cookie.http_only().unwrap_or(false));

    let token = cookie.value().to_string();
    let claims = fx.state.tokens.validate_token(&token).unwrap();
    assert_eq!(claims.user_id, fx.author.id);
}

#[actix_rt::test]
async fn test_login_ignores_foreign_next() {
    let fx = fixture().await;
    let app = init_app!(fx.state.clone());

    let req = actix_test::TestRequest::post()
        .uri("/auth/login/?next=//evil.example/")
        .set_form([("username", "testauthor"), ("password", PASSWORD)])
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/");
}

#[actix_rt::test]
async fn test_login_with_wrong_password_rerenders() {
    let fx = fixture().await;
    let app = init_app!(fx.state.clone());

    let req = actix_test::TestRequest::post()
        .uri("/auth/login/")
        .set_form([("username", "testauthor"), ("password", "wrong-password")])
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.response().cookies().all(|c| c.name() != SESSION_COOKIE));
}

#[actix_rt::test]
async fn test_signup_creates_account_and_session() {
    let fx = fixture().await;
    let app = init_app!(fx.state.clone());

    let req = actix_test::TestRequest::post()
        .uri("/auth/signup/")
        .set_form([
            ("username", "newcomer"),
            ("email", "newcomer@example.com"),
            ("password", "long-enough"),
        ])
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/");
    assert!(res.response().cookies().any(|c| c.name() == SESSION_COOKIE));

    let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/profile/newcomer/").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_signup_rejects_taken_username() {
    let fx = fixture().await;
    let app = init_app!(fx.state.clone());

    let req = actix_test::TestRequest::post()
        .uri("/auth/signup/")
        .set_form([
            ("username", "testauthor"),
            ("email", "again@example.com"),
            ("password", "long-enough"),
        ])
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::OK);
    let body = actix_test::read_body(res).await;
    assert!(String::from_utf8_lossy(&body).contains("A user with that username already exists."));
}

#[actix_rt::test]
async fn test_logout_clears_cookie() {
    let fx = fixture().await;
    let app = init_app!(fx.state.clone());

    let req = actix_test::TestRequest::post()
        .uri("/auth/logout/")
        .cookie(fx.session(&fx.author))
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .unwrap();
    assert_eq!(cookie.value(), "");
}

#[actix_rt::test]
async fn test_health_reports_storage() {
    let fx = fixture().await;
    let app = init_app!(fx.state.clone());

    let req = actix_test::TestRequest::get().uri("/health").to_request();
    let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
}

#[actix_rt::test]
async fn test_detail_shows_edit_link_only_to_author() {
    let fx = fixture().await;
    let posts = fx.seed_posts(1).await;
    let app = init_app!(fx.state.clone());
    let uri = format!("/posts/{}/", posts[0].id);
    let edit_link = format!("/posts/{}/edit/", posts[0].id);

    let req = actix_test::TestRequest::get().uri(&uri).cookie(fx.session(&fx.author)).to_request();
    let body = actix_test::call_and_read_body(&app, req).await;
    assert!(String::from_utf8_lossy(&body).contains(&edit_link));

    let req = actix_test::TestRequest::get().uri(&uri).cookie(fx.session(&fx.reader)).to_request();
    let body = actix_test::call_and_read_body(&app, req).await;
    assert!(!String::from_utf8_lossy(&body).contains(&edit_link));
}
