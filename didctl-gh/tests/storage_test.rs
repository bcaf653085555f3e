//! End-to-end behaviour of the facade against the in-memory repository

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use didctl_gh::{BlobContent, DbError};
use didctl_test_utils::FakeGitHub;
use serde_json::json;

const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0xff, 0xfe];

#[tokio::test]
async fn test_concurrent_branch_ensure_is_idempotent() -> anyhow::Result<()> {
  let db = FakeGitHub::new().into_db();

  let (first, second) = tokio::join!(
    db.create_branch_if_not_exist("DID_owner1"),
    db.create_branch_if_not_exist("DID_owner1")
  );
  let (first, second) = (first?, second?);

  assert_eq!(first.name, "DID_owner1");
  assert_eq!(first.commit.sha, second.commit.sha);
  let branches = db.transport().branch_names().await;
  assert_eq!(branches.iter().filter(|name| *name == "DID_owner1").count(), 1);

  Ok(())
}

#[tokio::test]
async fn test_create_then_duplicate_then_update() -> anyhow::Result<()> {
  let db = FakeGitHub::new().into_db();
  db.create_branch_if_not_exist("CRE_abc").await?;

  let first = BlobContent::Json(json!({"id": "urn:cred:1", "status": "issued"}));
  let created = db.create_new_file("abc/1.json", &first, "CRE_abc", "issue").await?;
  assert_eq!(created.path, "abc/1.json");

  assert_eq!(
    db.create_new_file("abc/1.json", &first, "CRE_abc", "issue again").await.unwrap_err(),
    DbError::BlobExisted
  );

  let second = BlobContent::Json(json!({"id": "urn:cred:1", "status": "revoked"}));
  let updated = db.update_file("abc/1.json", &second, "CRE_abc", "revoke").await?;
  assert_ne!(updated.sha, created.sha);
  assert_eq!(db.get_file("abc/1.json", "CRE_abc").await?.content, second);

  Ok(())
}

#[tokio::test]
async fn test_unchanged_update_makes_no_commit() -> anyhow::Result<()> {
  let db = FakeGitHub::new().into_db();
  let content = BlobContent::Json(json!({"b": 2, "a": 1}));
  db.create_new_file("doc.json", &content, "main", "create").await?;
  let commits_before = db.transport().commit_count("main").await;

  // Same document, different key order
  let reordered = BlobContent::from_text(r#"{"a":1,"b":2}"#);
  assert_eq!(
    db.update_file("doc.json", &reordered, "main", "noop").await.unwrap_err(),
    DbError::DataNotChanged
  );
  assert_eq!(db.transport().commit_count("main").await, commits_before);

  Ok(())
}

#[tokio::test]
async fn test_round_trip_by_content_kind() -> anyhow::Result<()> {
  let db = FakeGitHub::new().into_db();

  let json_doc = BlobContent::Json(json!({"@context": ["https://www.w3.org/ns/did/v1"], "id": "did:web:x"}));
  let text_doc = BlobContent::Text("not { json".to_string());
  let binary_doc = BlobContent::from_bytes(PNG_HEADER);

  for (path, content) in [("a.json", &json_doc), ("notes.txt", &text_doc), ("logo.png", &binary_doc)] {
    db.create_new_file(path, content, "main", "add").await?;
    let read = db.get_file(path, "main").await?;
    assert_eq!(&read.content, content, "{path}");
    assert_eq!(read.is_binary, content.is_binary(), "{path}");
  }

  assert_eq!(db.get_file_raw("logo.png", "main").await?, PNG_HEADER);

  Ok(())
}

#[tokio::test]
async fn test_local_json_is_stored_verbatim() -> anyhow::Result<()> {
  let db = FakeGitHub::new().into_db();
  let local: &[u8] = b"{\n  \"z\": 1,\n  \"a\": 123456789012345678901234567890\n}\n";

  db.create_new_file("big.json", &BlobContent::from_file_bytes(local), "main", "create")
    .await?;
  assert_eq!(db.get_file_raw("big.json", "main").await?, local);
  assert_eq!(db.get_file("big.json", "main").await?.raw_bytes()?, local);

  // Reformatted but equal is a no-op
  let compact = BlobContent::from_file_bytes(br#"{"a":123456789012345678901234567890,"z":1}"#);
  assert_eq!(
    db.update_file("big.json", &compact, "main", "noop").await.unwrap_err(),
    DbError::DataNotChanged
  );

  // Neighbouring integers that share an f64 are still different records
  let next = BlobContent::from_file_bytes(b"{\"z\": 1, \"a\": 123456789012345678901234567891}");
  db.update_file("big.json", &next, "main", "bump").await?;
  let stored = db.get_file("big.json", "main").await?;
  let a = stored.content.as_json().and_then(|doc| doc.get("a")).map(ToString::to_string);
  assert_eq!(a.as_deref(), Some("123456789012345678901234567891"));

  Ok(())
}

#[tokio::test]
async fn test_unknown_binary_flag_depends_on_extension() -> anyhow::Result<()> {
  let fake = FakeGitHub::new();
  fake.commit_file("main", "image.png", PNG_HEADER, "image").await;
  let db = fake.into_db();

  let image = db.get_file("image.png", "main").await?;
  assert!(image.is_binary);
  assert_eq!(image.content, BlobContent::Binary(STANDARD.encode(PNG_HEADER)));
  assert!(db.transport().requests().iter().any(|request| request.starts_with("GET git/blobs/")));

  let fake = FakeGitHub::new();
  fake.commit_file("main", "broken.json", PNG_HEADER, "broken").await;
  let db = fake.into_db();

  let broken = db.get_file("broken.json", "main").await?;
  assert!(!broken.is_binary);
  assert!(!db.transport().requests().iter().any(|request| request.starts_with("GET git/blobs/")));

  Ok(())
}

#[tokio::test]
async fn test_branch_listing_has_no_duplicates() -> anyhow::Result<()> {
  let fake = FakeGitHub::new();
  for i in 0..230 {
    fake.create_branch(&format!("DID_owner{i:03}")).await;
  }
  let db = fake.into_db();

  let branches = db.get_all_branches().await?;
  let mut names: Vec<String> = branches.into_iter().map(|branch| branch.name).collect();
  // 230 tenants plus main and the empty base branch
  assert_eq!(names.len(), 232);
  names.dedup();
  assert_eq!(names.len(), 232);

  Ok(())
}

#[tokio::test]
async fn test_long_history_is_followed_to_the_end() -> anyhow::Result<()> {
  let fake = FakeGitHub::new();
  for i in 0..120 {
    fake.commit_file("main", "counter.json", format!("{{\"n\":{i}}}").as_bytes(), &format!("n={i}")).await;
  }
  let db = fake.into_db();

  let history = db.get_commit_history(None, "main", Some("counter.json")).await?;
  assert_eq!(history.total_count, 120);
  assert_eq!(history.history.len(), 120);
  assert_eq!(history.history[0].message, "n=119");

  let limited = db.get_commit_history(Some(5), "main", None).await?;
  assert_eq!(limited.history.len(), 5);

  Ok(())
}

#[tokio::test]
async fn test_file_history_of_missing_file() -> anyhow::Result<()> {
  let db = FakeGitHub::new().into_db();

  assert_eq!(
    db.get_commit_history(None, "main", Some("ghost.json")).await.unwrap_err(),
    DbError::BlobNotExisted
  );
  assert_eq!(
    db.get_file_latest_commit("main", "ghost.json").await.unwrap_err(),
    DbError::BlobNotExisted
  );

  Ok(())
}

#[tokio::test]
async fn test_file_history_newest_first() -> anyhow::Result<()> {
  let db = FakeGitHub::new().into_db();
  for version in 1..=3 {
    let content = BlobContent::Json(json!({"version": version}));
    if version == 1 {
      db.create_new_file("doc.json", &content, "main", "v1").await?;
    } else {
      db.update_file("doc.json", &content, "main", &format!("v{version}")).await?;
    }
  }

  let revisions = db.get_file_history("doc.json", "main").await?;
  let versions: Vec<i64> = revisions
    .iter()
    .filter_map(|revision| revision.file.content.as_json()?.get("version")?.as_i64())
    .collect();
  assert_eq!(versions, vec![3, 2, 1]);

  Ok(())
}

#[tokio::test]
async fn test_main_branch_is_never_deleted() -> anyhow::Result<()> {
  let db = FakeGitHub::new().into_db();

  assert_eq!(db.delete_branch("main").await.unwrap_err(), DbError::DeleteMainBranch);
  assert_eq!(db.transport().request_count(), 0);
  assert!(db.transport().branch_head("main").await.is_some());

  Ok(())
}

#[tokio::test]
async fn test_concurrent_writes_surface_a_conflict() -> anyhow::Result<()> {
  let db = FakeGitHub::new().with_write_gate(2).into_db();
  let first = BlobContent::Json(json!({"n": 1}));
  let second = BlobContent::Json(json!({"n": 2}));

  let (a, b) = tokio::join!(
    db.create_new_file("one.json", &first, "main", "one"),
    db.create_new_file("two.json", &second, "main", "two")
  );

  let results = [a, b];
  assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
  assert!(results.iter().any(|result| result.as_ref().err() == Some(&DbError::ConflictPush)));

  Ok(())
}

#[tokio::test]
async fn test_stale_version_is_rejected() -> anyhow::Result<()> {
  let db = FakeGitHub::new().into_db();
  let created = db
    .create_new_file("doc.json", &BlobContent::Json(json!({"v": 1})), "main", "v1")
    .await?;
  db.update_file("doc.json", &BlobContent::Json(json!({"v": 2})), "main", "v2").await?;

  assert_eq!(
    db.mutate(
      "doc.json",
      Some(&created.sha),
      &BlobContent::Json(json!({"v": 3})),
      "main",
      "v3"
    )
    .await
    .unwrap_err(),
    DbError::VersionMismatch
  );

  Ok(())
}

#[tokio::test]
async fn test_delete_then_read() -> anyhow::Result<()> {
  let db = FakeGitHub::new().into_db();
  db.create_new_file("doc.json", &BlobContent::Json(json!({})), "main", "create").await?;

  let commit = db.delete_file("doc.json", "main", None).await?;
  assert_eq!(db.transport().branch_head("main").await, Some(commit));
  assert!(!db.is_existed_file("doc.json", "main").await?);
  assert_eq!(db.get_file("doc.json", "main").await.unwrap_err(), DbError::BlobNotExisted);
  assert_eq!(db.delete_file("doc.json", "main", None).await.unwrap_err(), DbError::BlobNotExisted);

  Ok(())
}

#[tokio::test]
async fn test_tenant_branch_listing_and_tags() -> anyhow::Result<()> {
  let db = FakeGitHub::new().into_db();
  db.create_branch_if_not_exist("MSG_alice").await?;
  db.create_new_file("ali/inbox.json", &BlobContent::Json(json!([])), "MSG_alice", "inbox").await?;

  let files = db.get_all_files("MSG_alice").await?;
  assert_eq!(files.len(), 1);
  assert_eq!(files[0].path, "ali/inbox.json");

  let head = db.get_branch_last_commit_sha("MSG_alice").await?;
  db.tag("snapshot-1", &head).await?;
  assert_eq!(db.get_a_tag("snapshot-1").await?.object.sha, head);
  assert_eq!(db.tag("snapshot-1", &head).await.unwrap_err(), DbError::RefExisted);

  db.tag_commit_as_release("snapshot-2", Some("nightly"), Some(&head)).await?;
  let tags: Vec<String> = db.get_all_tags().await?.into_iter().map(|tag| tag.name).collect();
  assert_eq!(tags, vec!["snapshot-2", "snapshot-1"]);

  db.delete_release("snapshot-2").await?;
  assert_eq!(db.get_a_release("snapshot-2").await.unwrap_err(), DbError::RefNotExisted);
  assert_eq!(db.get_a_tag("snapshot-2").await.unwrap_err(), DbError::RefNotExisted);

  Ok(())
}

#[tokio::test]
async fn test_delete_release_clears_a_tag_without_release() -> anyhow::Result<()> {
  let db = FakeGitHub::new().into_db();
  let head = db.get_branch_last_commit_sha("main").await?;
  db.tag("orphan", &head).await?;

  db.delete_release("orphan").await?;
  assert_eq!(db.get_a_tag("orphan").await.unwrap_err(), DbError::RefNotExisted);
  assert_eq!(db.delete_release("orphan").await.unwrap_err(), DbError::RefNotExisted);

  Ok(())
}
