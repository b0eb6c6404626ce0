use smallpress_core::db::open_db_in_memory;
use smallpress_core::{
    AuthService, PostRepository, PostService, PublishRequest, RepoError, ReviseRequest,
    SqlitePostRepository, SqliteSessionRepository, SqliteUserRepository,
};

#[test]
fn sign_in_resolve_and_sign_out_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(
        SqliteUserRepository::new(&conn),
        SqliteSessionRepository::new(&conn),
    );

    let signed_in = auth.sign_in("admin", "admin").unwrap().unwrap();
    assert_eq!(signed_in.username, "admin");

    let session = auth.current_session(&signed_in.token).unwrap().unwrap();
    assert_eq!(session.user_id, signed_in.user_id);
    assert_eq!(session.username, "admin");
    assert_eq!(session.expires_at, signed_in.expires_at);

    auth.sign_out(&signed_in.token).unwrap();
    assert_eq!(auth.current_session(&signed_in.token).unwrap(), None);

    // Signing out an already-dead session stays quiet.
    auth.sign_out(&signed_in.token).unwrap();
}

#[test]
fn bad_credentials_read_as_no_sign_in() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(
        SqliteUserRepository::new(&conn),
        SqliteSessionRepository::new(&conn),
    );

    assert!(auth.sign_in("admin", "wrong").unwrap().is_none());
    assert!(auth.sign_in("nobody", "admin").unwrap().is_none());
}

#[test]
fn publish_allocates_slugs_and_revise_keeps_created_at() {
    let conn = open_db_in_memory().unwrap();
    let posts = PostService::new(SqlitePostRepository::new(&conn));

    let first = posts
        .publish(&PublishRequest {
            title: "Hola, Mundo!".to_string(),
            image_path: None,
            content: "<p>uno</p>".to_string(),
        })
        .unwrap();
    assert_eq!(first.slug, "hola-mundo");

    let second = posts
        .publish(&PublishRequest {
            title: "Hola, Mundo!".to_string(),
            image_path: None,
            content: "<p>dos</p>".to_string(),
        })
        .unwrap();
    assert_eq!(second.slug, "hola-mundo-2");

    let revised = posts
        .revise(&ReviseRequest {
            id: first.id,
            title: "Hola de nuevo".to_string(),
            slug: first.slug.clone(),
            image_path: Some("/uploads/hola.png".to_string()),
            content: "<p>uno, otra vez</p>".to_string(),
        })
        .unwrap();
    assert_eq!(revised.created_at, first.created_at);
    assert_eq!(revised.title, "Hola de nuevo");
    assert_eq!(revised.image_path.as_deref(), Some("/uploads/hola.png"));

    assert_eq!(posts.list().unwrap().len(), 2);
    assert!(posts.find_by_slug("hola-mundo").unwrap().is_some());
    assert!(posts.find_by_id(second.id).unwrap().is_some());
}

#[test]
fn remove_clears_the_row_for_caller_side_file_cleanup() {
    let conn = open_db_in_memory().unwrap();
    let posts = PostService::new(SqlitePostRepository::new(&conn));

    let post = posts
        .publish(&PublishRequest {
            title: "Temporal".to_string(),
            image_path: Some("/uploads/temporal.png".to_string()),
            content: "<p>bye</p>".to_string(),
        })
        .unwrap();

    // The caller reads image_path before removal to delete the file.
    let read_back = posts.find_by_id(post.id).unwrap().unwrap();
    assert_eq!(read_back.image_path.as_deref(), Some("/uploads/temporal.png"));

    posts.remove(post.id).unwrap();
    assert_eq!(posts.find_by_id(post.id).unwrap(), None);
}

#[test]
fn publishing_into_a_stolen_slug_surfaces_conflict() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePostRepository::new(&conn);
    let posts = PostService::new(SqlitePostRepository::new(&conn));

    let published = posts
        .publish(&PublishRequest {
            title: "Carrera".to_string(),
            image_path: None,
            content: "<p>1</p>".to_string(),
        })
        .unwrap();

    // Simulate losing the probe/insert race: revising another row onto the
    // winner's slug hits the uniqueness constraint.
    let rival = posts
        .publish(&PublishRequest {
            title: "Rival".to_string(),
            image_path: None,
            content: "<p>2</p>".to_string(),
        })
        .unwrap();
    let err = posts
        .revise(&ReviseRequest {
            id: rival.id,
            title: "Rival".to_string(),
            slug: published.slug.clone(),
            image_path: None,
            content: "<p>2</p>".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, RepoError::Conflict(_)));

    // The losing write left no partial state behind.
    let unchanged = repo.get_post_by_id(rival.id).unwrap().unwrap();
    assert_eq!(unchanged.slug, rival.slug);
}
