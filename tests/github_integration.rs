//! Integration tests for the GitHub forge.
//!
//! A wiremock server stands in for the GitHub REST API. Tests cover the
//! request shapes of each Git Data call, status mapping, transport retry,
//! and a full deletion over HTTP.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use article_sweep::auth::StaticTokenProvider;
use article_sweep::core::config::Config;
use article_sweep::core::objects::{ObjectType, TreeEntry};
use article_sweep::core::types::{BranchName, Oid};
use article_sweep::engine::{ArticleDeleter, DeleteError, Stage};
use article_sweep::forge::github::GitHubForge;
use article_sweep::forge::{
    CreateCommitRequest, CreateTreeRequest, Forge, ForgeError, RetryPolicy, UpdateRefRequest,
};

const TOKEN: &str = "test-token";

fn sha(c: char) -> String {
    c.to_string().repeat(40)
}

fn oid(c: char) -> Oid {
    Oid::new(sha(c)).unwrap()
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2))
}

fn forge(server: &MockServer) -> GitHubForge {
    GitHubForge::new(Arc::new(StaticTokenProvider::new(TOKEN)), "owner", "blog")
        .with_api_base(server.uri())
        .with_retry(fast_retry())
}

fn main_branch() -> BranchName {
    BranchName::new("main").unwrap()
}

fn ref_body(sha: &str) -> serde_json::Value {
    json!({
        "ref": "refs/heads/main",
        "object": {"sha": sha, "type": "commit"}
    })
}

// =============================================================================
// Request shapes
// =============================================================================

mod requests {
    use super::*;

    #[tokio::test]
    async fn get_ref_sends_auth_and_parses_sha() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/blog/git/ref/heads/main"))
            .and(header("authorization", "Bearer test-token"))
            .and(header("x-github-api-version", "2022-11-28"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ref_body(&sha('a'))))
            .expect(1)
            .mount(&server)
            .await;

        let head = forge(&server).get_ref(&main_branch()).await.unwrap();

        assert_eq!(head.sha, oid('a'));
        assert_eq!(head.name, main_branch());
    }

    #[tokio::test]
    async fn get_commit_reads_tree_and_parents() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/owner/blog/git/commits/{}", sha('a'))))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": sha('a'),
                "tree": {"sha": sha('b')},
                "parents": [{"sha": sha('9')}]
            })))
            .mount(&server)
            .await;

        let commit = forge(&server).get_commit(&oid('a')).await.unwrap();

        assert_eq!(commit.tree_sha, oid('b'));
        assert_eq!(commit.parent_shas, vec![oid('9')]);
    }

    #[tokio::test]
    async fn list_tree_is_pinned_and_prefixed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!(
                "/repos/owner/blog/git/trees/{}:public/images",
                sha('a')
            )))
            .and(query_param("recursive", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": sha('c'),
                "tree": [
                    {"path": "foo", "type": "tree", "mode": "040000", "sha": sha('d')},
                    {"path": "foo/logo.png", "type": "blob", "mode": "100644", "sha": sha('e')}
                ],
                "truncated": false
            })))
            .mount(&server)
            .await;

        let entries = forge(&server)
            .list_tree(&oid('a'), "public/images")
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "public/images/foo");
        assert_eq!(entries[0].object_type, ObjectType::Tree);
        assert_eq!(entries[1].path, "public/images/foo/logo.png");
        assert!(entries[1].is_blob());
    }

    #[tokio::test]
    async fn truncated_listing_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/owner/blog/git/trees/{}:content", sha('a'))))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": sha('e'),
                "tree": [{"path": "a.md", "type": "blob", "mode": "100644"}],
                "truncated": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = forge(&server).list_tree(&oid('a'), "content").await.unwrap_err();

        assert!(matches!(err, ForgeError::ApiError { status: 200, .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn create_tree_sends_null_shas() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/owner/blog/git/trees"))
            .and(body_json(json!({
                "base_tree": sha('b'),
                "tree": [
                    {"path": "src/content/blog/foo.md", "mode": "100644", "type": "blob", "sha": null}
                ]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sha": sha('c')})))
            .expect(1)
            .mount(&server)
            .await;

        let tree = forge(&server)
            .create_tree(CreateTreeRequest {
                base_tree: oid('b'),
                entries: vec![TreeEntry::deletion("src/content/blog/foo.md")],
            })
            .await
            .unwrap();

        assert_eq!(tree, oid('c'));
    }

    #[tokio::test]
    async fn create_commit_sends_single_parent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/owner/blog/git/commits"))
            .and(body_json(json!({
                "message": "Delete article: foo",
                "tree": sha('c'),
                "parents": [sha('a')]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sha": sha('d')})))
            .expect(1)
            .mount(&server)
            .await;

        let commit = forge(&server)
            .create_commit(CreateCommitRequest {
                message: "Delete article: foo".into(),
                tree: oid('c'),
                parents: vec![oid('a')],
            })
            .await
            .unwrap();

        assert_eq!(commit, oid('d'));
    }

    #[tokio::test]
    async fn update_ref_is_not_forced() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/repos/owner/blog/git/refs/heads/main"))
            .and(body_json(json!({"sha": sha('d'), "force": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(ref_body(&sha('d'))))
            .expect(1)
            .mount(&server)
            .await;

        let updated = forge(&server)
            .update_ref(UpdateRefRequest {
                branch: main_branch(),
                sha: oid('d'),
                force: false,
            })
            .await
            .unwrap();

        assert_eq!(updated.sha, oid('d'));
    }
}

// =============================================================================
// Status mapping
// =============================================================================

mod status_mapping {
    use super::*;

    async fn get_ref_with(response: ResponseTemplate) -> (MockServer, ForgeError) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/blog/git/ref/heads/main"))
            .respond_with(response)
            .mount(&server)
            .await;
        let err = forge(&server).get_ref(&main_branch()).await.unwrap_err();
        (server, err)
    }

    #[tokio::test]
    async fn not_found() {
        let (_server, err) = get_ref_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})),
        )
        .await;
        assert!(matches!(err, ForgeError::NotFound(_)));
    }

    #[tokio::test]
    async fn unauthorized_retries_once_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/blog/git/ref/heads/main"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let err = forge(&server).get_ref(&main_branch()).await.unwrap_err();
        assert!(matches!(err, ForgeError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn forbidden_is_auth_failure_with_permissions() {
        let (_server, err) = get_ref_with(
            ResponseTemplate::new(403)
                .insert_header("X-Accepted-GitHub-Permissions", "contents=write")
                .set_body_json(json!({"message": "Resource not accessible"})),
        )
        .await;
        match err {
            ForgeError::AuthFailed(msg) => assert!(msg.contains("contents=write")),
            other => panic!("expected AuthFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exhausted_rate_limit() {
        let (server, err) = get_ref_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .set_body_json(json!({"message": "API rate limit exceeded"})),
        )
        .await;
        assert_eq!(err, ForgeError::RateLimited);
        // Rate limits are transient: every attempt in the policy was used
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn server_error_after_retries() {
        let (server, err) = get_ref_with(
            ResponseTemplate::new(502).set_body_json(json!({"message": "Bad Gateway"})),
        )
        .await;
        match err {
            ForgeError::ApiError { status, message } => {
                assert_eq!(status, 502);
                assert!(message.contains("GitHub server error"));
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn empty_repository_conflict_status_is_api_error() {
        let (_server, err) = get_ref_with(
            ResponseTemplate::new(409).set_body_json(json!({"message": "Git Repository is empty."})),
        )
        .await;
        assert!(matches!(err, ForgeError::ApiError { status: 409, .. }));
    }

    #[tokio::test]
    async fn non_fast_forward_is_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/repos/owner/blog/git/refs/heads/main"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(json!({"message": "Update is not a fast forward"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = forge(&server)
            .update_ref(UpdateRefRequest {
                branch: main_branch(),
                sha: oid('d'),
                force: false,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ForgeError::Conflict(_)));
    }

    #[tokio::test]
    async fn other_validation_errors_stay_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/owner/blog/git/trees"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({"message": "tree.sha is invalid"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = forge(&server)
            .create_tree(CreateTreeRequest {
                base_tree: oid('b'),
                entries: vec![TreeEntry::deletion("x.md")],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ForgeError::ApiError { status: 422, .. }));
    }
}

// =============================================================================
// Transport retry
// =============================================================================

mod transport_retry {
    use super::*;

    #[tokio::test]
    async fn transient_failure_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/blog/git/ref/heads/main"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/blog/git/ref/heads/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ref_body(&sha('a'))))
            .mount(&server)
            .await;

        let head = forge(&server).get_ref(&main_branch()).await.unwrap();

        assert_eq!(head.sha, oid('a'));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn conflict_is_never_retried_by_transport() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/repos/owner/blog/git/refs/heads/main"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(json!({"message": "Update is not a fast forward"})),
            )
            .mount(&server)
            .await;

        let _ = forge(&server)
            .update_ref(UpdateRefRequest {
                branch: main_branch(),
                sha: oid('d'),
                force: false,
            })
            .await;

        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn network_failure_maps_to_network_error() {
        // Nothing listens on this port once the server is dropped.
        // A bare (non-pooled) server is required: pooled servers keep listening after drop.
        let uri = {
            let server = MockServer::builder().start().await;
            server.uri()
        };
        let forge = GitHubForge::new(Arc::new(StaticTokenProvider::new(TOKEN)), "owner", "blog")
            .with_api_base(uri)
            .with_retry(RetryPolicy::none());

        let err = forge.get_ref(&main_branch()).await.unwrap_err();
        assert!(matches!(err, ForgeError::NetworkError(_)));
    }
}

// =============================================================================
// Full workflow over HTTP
// =============================================================================

mod workflow {
    use super::*;

    const ARTICLES: &str = "src/content/blog";
    const IMAGES: &str = "public/images";

    fn deleter(server: &MockServer) -> ArticleDeleter {
        let config = Config::new("owner", "blog")
            .unwrap()
            .with_api_base(server.uri())
            .with_transport_retry(fast_retry())
            .with_conflict_retries(0);
        let forge = GitHubForge::from_config(&config, Arc::new(StaticTokenProvider::new(TOKEN)));
        ArticleDeleter::new(config, Arc::new(forge))
    }

    async fn mount_state(server: &MockServer, articles: serde_json::Value, images: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/repos/owner/blog/git/ref/heads/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ref_body(&sha('a'))))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/owner/blog/git/commits/{}", sha('a'))))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": sha('a'),
                "tree": {"sha": sha('b')},
                "parents": []
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/owner/blog/git/trees/{}:{}", sha('a'), ARTICLES)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": sha('e'),
                "tree": articles,
                "truncated": false
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/owner/blog/git/trees/{}:{}", sha('a'), IMAGES)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": sha('f'),
                "tree": images,
                "truncated": false
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn deletes_article_in_one_commit() {
        let server = MockServer::start().await;
        mount_state(
            &server,
            json!([
                {"path": "My-Post.md", "type": "blob", "mode": "100644"},
                {"path": "other.md", "type": "blob", "mode": "100644"}
            ]),
            json!([
                {"path": "my-post", "type": "tree", "mode": "040000"},
                {"path": "my-post/cover.png", "type": "blob", "mode": "100644"}
            ]),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/repos/owner/blog/git/trees"))
            .and(body_json(json!({
                "base_tree": sha('b'),
                "tree": [
                    {"path": "src/content/blog/My-Post.md", "mode": "100644", "type": "blob", "sha": null},
                    {"path": "public/images/my-post/cover.png", "mode": "100644", "type": "blob", "sha": null}
                ]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sha": sha('c')})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/owner/blog/git/commits"))
            .and(body_json(json!({
                "message": "Delete article: my-post",
                "tree": sha('c'),
                "parents": [sha('a')]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sha": sha('d')})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/repos/owner/blog/git/refs/heads/main"))
            .and(body_json(json!({"sha": sha('d'), "force": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(ref_body(&sha('d'))))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = deleter(&server).delete_article("my-post").await.unwrap();

        assert_eq!(outcome.removed_count(), 2);
        assert_eq!(outcome.commit, Some(oid('d')));
    }

    #[tokio::test]
    async fn unmatched_identifier_sends_no_writes() {
        let server = MockServer::start().await;
        mount_state(
            &server,
            json!([{"path": "other.md", "type": "blob", "mode": "100644"}]),
            json!([]),
        )
        .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = deleter(&server).delete_article("missing").await.unwrap();

        assert!(outcome.is_noop());
    }

    #[tokio::test]
    async fn rejected_fast_forward_surfaces_conflict() {
        let server = MockServer::start().await;
        mount_state(
            &server,
            json!([{"path": "foo.md", "type": "blob", "mode": "100644"}]),
            json!([]),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/repos/owner/blog/git/trees"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sha": sha('c')})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/owner/blog/git/commits"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sha": sha('d')})))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/repos/owner/blog/git/refs/heads/main"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(json!({"message": "Update is not a fast forward"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = deleter(&server).delete_article("foo").await.unwrap_err();

        assert_eq!(err.stage, Stage::UpdateRef);
        assert!(matches!(err.source, DeleteError::Conflict(_)));
        assert_eq!(err.matched, Some(1));
    }

    #[tokio::test]
    async fn missing_storage_root_lists_as_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/blog/git/ref/heads/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ref_body(&sha('a'))))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/owner/blog/git/commits/{}", sha('a'))))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": sha('a'),
                "tree": {"sha": sha('b')},
                "parents": []
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/owner/blog/git/trees/{}:{}", sha('a'), ARTICLES)))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/owner/blog/git/trees/{}:{}", sha('a'), IMAGES)))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;

        let outcome = deleter(&server).delete_article("foo").await.unwrap();

        assert!(outcome.is_noop());
    }

    #[tokio::test]
    async fn truncated_listing_fails_before_any_write() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/blog/git/ref/heads/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ref_body(&sha('a'))))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/owner/blog/git/commits/{}", sha('a'))))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": sha('a'),
                "tree": {"sha": sha('b')},
                "parents": []
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/owner/blog/git/trees/{}:{}", sha('a'), ARTICLES)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": sha('e'),
                "tree": [{"path": "aaa.md", "type": "blob", "mode": "100644"}],
                "truncated": true
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/owner/blog/git/trees/{}:{}", sha('a'), IMAGES)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": sha('f'),
                "tree": [],
                "truncated": false
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let err = deleter(&server).delete_article("foo").await.unwrap_err();

        assert_eq!(err.stage, Stage::FetchState);
        assert_eq!(err.matched, None);
        match err.source {
            DeleteError::Api { status, message } => {
                assert_eq!(status, 200);
                assert!(message.contains("truncated"), "{message}");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_branch_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/blog/git/ref/heads/main"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;

        let err = deleter(&server).delete_article("foo").await.unwrap_err();

        assert_eq!(err.stage, Stage::FetchState);
        assert!(matches!(err.source, DeleteError::NotFound(_)));
    }
}
