//! Page rendering, pagination, caching and post/comment flows
#[macro_use]
mod common;

use actix_web::http::{header, StatusCode};
use actix_web::test;

use common::{body_text, location, multipart_body, post_cards, TestContext, SMALL_GIF};
use yatube_service::db::BlogRepository;
use yatube_service::models::PostFilter;

#[actix_web::test]
async fn test_public_pages_render_for_guests() {
    let ctx = TestContext::new();
    let author = ctx.user("auth").await;
    let group = ctx.group("Тестовая группа", "test-slug").await;
    let post = ctx.post(&author, "Тестовый пост", Some(&group)).await;
    let app = test_app!(ctx);

    let pages = [
        "/".to_string(),
        "/group/test-slug/".to_string(),
        "/profile/auth/".to_string(),
        format!("/posts/{}/", post.id),
    ];
    for uri in pages {
        let req = test::TestRequest::get().uri(&uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {}", uri);
        let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap();
        assert!(content_type.to_str().unwrap().starts_with("text/html"));
    }
}

#[actix_web::test]
async fn test_unknown_pages_are_404() {
    let ctx = TestContext::new();
    let app = test_app!(ctx);

    for uri in [
        "/unexisting_page/",
        "/group/nope/",
        "/profile/nobody/",
        "/posts/999/",
        "/posts/abc/",
        "/media/posts/missing.gif",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "GET {}", uri);
    }

    let req = test::TestRequest::get().uri("/unexisting_page/").to_request();
    let body = body_text(&test::call_and_read_body(&app, req).await);
    assert!(body.contains("Custom 404"));
}

#[actix_web::test]
async fn test_login_required_pages_redirect_guests() {
    let ctx = TestContext::new();
    let author = ctx.user("auth").await;
    let post = ctx.post(&author, "Тестовый пост", None).await;
    let app = test_app!(ctx);

    let cases = [
        (test::TestRequest::get().uri("/create/"), "/create/"),
        (test::TestRequest::get().uri("/follow/"), "/follow/"),
        (
            test::TestRequest::get().uri(&format!("/posts/{}/edit/", post.id)),
            "",
        ),
        (
            test::TestRequest::post()
                .uri(&format!("/posts/{}/comment/", post.id))
                .set_form([("text", "anonymous")]),
            "",
        ),
        (
            test::TestRequest::get().uri("/profile/auth/follow/"),
            "/profile/auth/follow/",
        ),
    ];

    for (req, next) in cases {
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        let location = location(&resp);
        assert!(location.starts_with("/auth/login/?next="), "{}", location);
        if !next.is_empty() {
            assert_eq!(
                location,
                format!("/auth/login/?next={}", urlencoding::encode(next))
            );
        }
    }

    assert!(ctx.repo.list_comments(post.id).await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_post_with_group_is_listed_only_where_it_belongs() {
    let ctx = TestContext::new();
    let author = ctx.user("auth").await;
    let group = ctx.group("Первая", "first").await;
    ctx.group("Вторая", "second").await;
    let post = ctx.post(&author, "Пост в первой группе", Some(&group)).await;
    let app = test_app!(ctx);

    for uri in ["/", "/group/first/", "/profile/auth/"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let body = body_text(&test::call_and_read_body(&app, req).await);
        assert_eq!(post_cards(&body), 1, "GET {}", uri);
        assert!(body.contains(&post.text));
        assert!(body.contains("/group/first/"));
    }

    let req = test::TestRequest::get().uri("/group/second/").to_request();
    let body = body_text(&test::call_and_read_body(&app, req).await);
    assert_eq!(post_cards(&body), 0);
    assert!(!body.contains(&post.text));
}

#[actix_web::test]
async fn test_listings_paginate_ten_per_page() {
    let ctx = TestContext::new();
    let author = ctx.user("auth").await;
    let group = ctx.group("Группа", "group").await;
    for i in 0..13 {
        ctx.post(&author, &format!("Пост номер {}", i), Some(&group))
            .await;
    }
    let app = test_app!(ctx);

    for base in ["/", "/group/group/", "/profile/auth/"] {
        let req = test::TestRequest::get().uri(base).to_request();
        let body = body_text(&test::call_and_read_body(&app, req).await);
        assert_eq!(post_cards(&body), 10, "first page of {}", base);

        let req = test::TestRequest::get()
            .uri(&format!("{}?page=2", base))
            .to_request();
        let body = body_text(&test::call_and_read_body(&app, req).await);
        assert_eq!(post_cards(&body), 3, "second page of {}", base);
    }
}

#[actix_web::test]
async fn test_listing_is_newest_first_and_bad_page_falls_back() {
    let ctx = TestContext::new();
    let author = ctx.user("auth").await;
    for i in 0..12 {
        ctx.post(&author, &format!("Пост номер {:02}", i), None).await;
    }
    let app = test_app!(ctx);

    let req = test::TestRequest::get().uri("/profile/auth/").to_request();
    let body = body_text(&test::call_and_read_body(&app, req).await);
    let newest = body.find("Пост номер 11").unwrap();
    let older = body.find("Пост номер 02").unwrap();
    assert!(newest < older);
    assert!(!body.contains("Пост номер 01"));

    let req = test::TestRequest::get()
        .uri("/profile/auth/?page=abc")
        .to_request();
    let body = body_text(&test::call_and_read_body(&app, req).await);
    assert_eq!(post_cards(&body), 10);

    let req = test::TestRequest::get()
        .uri("/profile/auth/?page=99")
        .to_request();
    let body = body_text(&test::call_and_read_body(&app, req).await);
    assert_eq!(post_cards(&body), 2);
}

#[actix_web::test]
async fn test_index_page_is_cached() {
    let ctx = TestContext::new();
    let author = ctx.user("auth").await;
    let post = ctx.post(&author, "Кешированный пост", None).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::get().uri("/").to_request();
    let first = test::call_and_read_body(&app, req).await;
    assert!(body_text(&first).contains("Кешированный пост"));

    assert!(ctx.repo.delete_post(post.id).await.unwrap());

    let req = test::TestRequest::get().uri("/").to_request();
    let second = test::call_and_read_body(&app, req).await;
    assert_eq!(first, second);

    // another query string is a separate cache entry
    let req = test::TestRequest::get().uri("/?page=1").to_request();
    let third = body_text(&test::call_and_read_body(&app, req).await);
    assert!(!third.contains("Кешированный пост"));
}

#[actix_web::test]
async fn test_profile_context() {
    let ctx = TestContext::new();
    let author = ctx.user("auth").await;
    let reader = ctx.user("reader").await;
    ctx.post(&author, "Первый", None).await;
    ctx.post(&author, "Второй", None).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/profile/auth/")
        .cookie(ctx.cookie(&reader))
        .to_request();
    let body = body_text(&test::call_and_read_body(&app, req).await);
    assert!(body.contains("Всего постов: 2"));
    assert!(body.contains("/profile/auth/follow/"));

    // no follow button on your own profile
    let req = test::TestRequest::get()
        .uri("/profile/auth/")
        .cookie(ctx.cookie(&author))
        .to_request();
    let body = body_text(&test::call_and_read_body(&app, req).await);
    assert!(!body.contains("/profile/auth/follow/"));
}

#[actix_web::test]
async fn test_create_post_redirects_to_profile() {
    let ctx = TestContext::new();
    let author = ctx.user("auth").await;
    let group = ctx.group("Группа", "group").await;
    let app = test_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/create/")
        .cookie(ctx.cookie(&author))
        .to_request();
    let body = body_text(&test::call_and_read_body(&app, req).await);
    assert!(body.contains("Текст поста"));
    assert!(body.contains("Группа, к которой будет относиться пост"));

    let group_id = group.id.to_string();
    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(ctx.cookie(&author))
        .set_form([("text", "Новый пост"), ("group", group_id.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/auth/");

    let posts = ctx.repo.list_posts(PostFilter::All, 10, 0).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].text, "Новый пост");
    assert_eq!(posts[0].author.id, author.id);
    assert_eq!(posts[0].group.as_ref().map(|g| g.id), Some(group.id));
}

#[actix_web::test]
async fn test_long_post_and_comment_are_accepted() {
    let ctx = TestContext::new();
    let author = ctx.user("auth").await;
    let app = test_app!(ctx);
    let long_text = "а".repeat(20_000);

    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(ctx.cookie(&author))
        .set_form([("text", long_text.as_str()), ("group", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let posts = ctx.repo.list_posts(PostFilter::All, 10, 0).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].text.chars().count(), 20_000);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/comment/", posts[0].id))
        .cookie(ctx.cookie(&author))
        .set_form([("text", long_text.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let comments = ctx.repo.list_comments(posts[0].id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, long_text);
}

#[actix_web::test]
async fn test_oversized_multipart_text_is_a_field_error() {
    let ctx = TestContext::new();
    let author = ctx.user("auth").await;
    let app = test_app!(ctx);

    let text = vec![b'a'; ctx.state.max_upload_bytes + 1];
    let boundary = "yatube-test-boundary";
    let body = multipart_body(boundary, &[("text", None, &text[..])]);
    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(ctx.cookie(&author))
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        ))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(&test::read_body(resp).await);
    assert!(body.contains("Текст слишком длинный."));
    assert_eq!(ctx.repo.count_posts(PostFilter::All).await.unwrap(), 0);
}

#[actix_web::test]
async fn test_create_post_with_image_upload() {
    let ctx = TestContext::new();
    let author = ctx.user("auth").await;
    let app = test_app!(ctx);

    let boundary = "yatube-test-boundary";
    let body = multipart_body(
        boundary,
        &[
            ("text", None, "Пост с картинкой".as_bytes()),
            ("group", None, &b""[..]),
            ("image", Some("small.gif"), SMALL_GIF),
        ],
    );
    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(ctx.cookie(&author))
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        ))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let posts = ctx.repo.list_posts(PostFilter::All, 10, 0).await.unwrap();
    assert_eq!(posts.len(), 1);
    let image = posts[0].image.clone().expect("image stored");
    assert!(image.starts_with("posts/") && image.ends_with(".gif"));
    assert!(ctx.media_dir.path().join(&image).is_file());

    let req = test::TestRequest::get()
        .uri(&format!("/media/{}", image))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/gif");

    // the listing shows the picture
    let req = test::TestRequest::get().uri("/profile/auth/").to_request();
    let body = body_text(&test::call_and_read_body(&app, req).await);
    assert!(body.contains(&format!("/media/{}", image)));
}

#[actix_web::test]
async fn test_invalid_post_form_is_rerendered() {
    let ctx = TestContext::new();
    let author = ctx.user("auth").await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(ctx.cookie(&author))
        .set_form([("text", "   "), ("group", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(&test::read_body(resp).await);
    assert!(body.contains("Обязательное поле."));

    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(ctx.cookie(&author))
        .set_form([("text", "Текст"), ("group", "12345")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(&test::read_body(resp).await);
    assert!(body.contains("Выберите корректный вариант"));
    assert!(body.contains("Текст"));

    let boundary = "b";
    let payload = multipart_body(
        boundary,
        &[
            ("text", None, &b"with a fake image"[..]),
            ("image", Some("fake.gif"), &b"definitely not an image"[..]),
        ],
    );
    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(ctx.cookie(&author))
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        ))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(&test::read_body(resp).await);
    assert!(body.contains("Загрузите правильное изображение"));

    assert_eq!(ctx.repo.count_posts(PostFilter::All).await.unwrap(), 0);
}

#[actix_web::test]
async fn test_author_can_edit_post() {
    let ctx = TestContext::new();
    let author = ctx.user("auth").await;
    let post = ctx.post(&author, "Старый текст", None).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(ctx.cookie(&author))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(&test::read_body(resp).await);
    assert!(body.contains("Редактировать пост"));
    assert!(body.contains("Старый текст"));

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(ctx.cookie(&author))
        .set_form([("text", "Новый текст"), ("group", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let updated = ctx.repo.find_post(post.id).await.unwrap().unwrap();
    assert_eq!(updated.text, "Новый текст");
    assert_eq!(updated.created_at, post.created_at);
}

#[actix_web::test]
async fn test_non_author_edit_is_redirected_and_changes_nothing() {
    let ctx = TestContext::new();
    let author = ctx.user("auth").await;
    let intruder = ctx.user("intruder").await;
    let post = ctx.post(&author, "Исходный текст", None).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(ctx.cookie(&intruder))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(ctx.cookie(&intruder))
        .set_form([("text", "Взлом"), ("group", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let unchanged = ctx.repo.find_post(post.id).await.unwrap().unwrap();
    assert_eq!(unchanged, post);
}

#[actix_web::test]
async fn test_delete_post_is_author_only() {
    let ctx = TestContext::new();
    let author = ctx.user("auth").await;
    let intruder = ctx.user("intruder").await;
    let post = ctx.post(&author, "Удаляемый пост", None).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/delete/", post.id))
        .cookie(ctx.cookie(&intruder))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));
    assert!(ctx.repo.find_post(post.id).await.unwrap().is_some());

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/delete/", post.id))
        .cookie(ctx.cookie(&author))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/profile/auth/");
    assert!(ctx.repo.find_post(post.id).await.unwrap().is_none());
}

#[actix_web::test]
async fn test_comment_flow() {
    let ctx = TestContext::new();
    let author = ctx.user("auth").await;
    let commenter = ctx.user("commenter").await;
    let post = ctx.post(&author, "Обсуждаемый пост", None).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/comment/", post.id))
        .cookie(ctx.cookie(&commenter))
        .set_form([("text", "Отличный пост")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    // the detail view accepts the same submission
    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/", post.id))
        .cookie(ctx.cookie(&commenter))
        .set_form([("text", "И второй")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/", post.id))
        .to_request();
    let body = body_text(&test::call_and_read_body(&app, req).await);
    let first = body.find("Отличный пост").expect("first comment shown");
    let second = body.find("И второй").expect("second comment shown");
    assert!(first < second);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/comment/", post.id))
        .cookie(ctx.cookie(&commenter))
        .set_form([("text", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(&test::read_body(resp).await);
    assert!(body.contains("Обязательное поле."));
    assert_eq!(ctx.repo.list_comments(post.id).await.unwrap().len(), 2);

    let req = test::TestRequest::post()
        .uri("/posts/999/comment/")
        .cookie(ctx.cookie(&commenter))
        .set_form([("text", "в пустоту")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_signup_login_logout() {
    let ctx = TestContext::new();
    ctx.user_with_password("existing").await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/auth/signup/")
        .set_form([
            ("username", "newbie"),
            ("first_name", "Новый"),
            ("last_name", "Автор"),
            ("password1", "long-password"),
            ("password2", "long-password"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    assert!(resp
        .response()
        .cookies()
        .any(|c| c.name() == yatube_service::security::SESSION_COOKIE));
    assert!(ctx
        .repo
        .find_user_by_username("newbie")
        .await
        .unwrap()
        .is_some());

    let req = test::TestRequest::post()
        .uri("/auth/signup/")
        .set_form([
            ("username", "existing"),
            ("password1", "long-password"),
            ("password2", "long-password"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(&test::read_body(resp).await);
    assert!(body.contains("Пользователь с таким именем уже существует."));

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form([
            ("username", "existing"),
            ("password", "wrong"),
            ("next", "/follow/"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form([
            ("username", "existing"),
            ("password", common::PASSWORD),
            ("next", "/follow/"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/follow/");

    // a backslash after the leading slash would leave the site
    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form([
            ("username", "existing"),
            ("password", common::PASSWORD),
            ("next", "/\\evil.example"),
        ])
        .to_request();
    let offsite = test::call_service(&app, req).await;
    assert_eq!(offsite.status(), StatusCode::FOUND);
    assert_eq!(location(&offsite), "/");
    let session = resp
        .response()
        .cookies()
        .find(|c| c.name() == yatube_service::security::SESSION_COOKIE)
        .expect("session cookie")
        .into_owned();

    let req = test::TestRequest::get()
        .uri("/follow/")
        .cookie(session)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/auth/logout/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let removal = resp
        .response()
        .cookies()
        .find(|c| c.name() == yatube_service::security::SESSION_COOKIE)
        .expect("removal cookie");
    assert_eq!(removal.value(), "");
}

#[actix_web::test]
async fn test_operational_endpoints() {
    let ctx = TestContext::new();
    let app = test_app!(ctx);

    for uri in ["/health", "/health/ready", "/metrics"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {}", uri);
    }
}
