//! End-to-end versioning flow: lifecycle notifications, history queries,
//! and snapshot restore against an in-memory host repository.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Value};

use rowver::{
    DeleteKind, EntityRepository, RequestContext, RestoreOutcome, RowverResult, VersionAction,
    VersionedEntity, Versioner, VersioningConfig,
};

#[derive(Debug, Clone, PartialEq)]
struct Article {
    id: i64,
    title: String,
    body: String,
}

impl VersionedEntity for Article {
    fn table_name() -> &'static str {
        "articles"
    }

    fn entity_id(&self) -> i64 {
        self.id
    }

    fn writable_fields(&self) -> BTreeMap<String, Value> {
        BTreeMap::from([
            ("title".to_string(), json!(self.title)),
            ("body".to_string(), json!(self.body)),
        ])
    }

    fn apply_fields(&mut self, fields: &BTreeMap<String, Value>) -> RowverResult<()> {
        if let Some(title) = fields.get("title").and_then(Value::as_str) {
            self.title = title.to_string();
        }
        if let Some(body) = fields.get("body").and_then(Value::as_str) {
            self.body = body.to_string();
        }
        Ok(())
    }
}

/// Toy primary store standing in for the host application's persistence.
struct ArticleRepo {
    rows: RefCell<HashMap<i64, Article>>,
    next_id: Cell<i64>,
}

impl ArticleRepo {
    fn new() -> Self {
        Self {
            rows: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
        }
    }

    fn insert(&self, title: &str, body: &str) -> Article {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let article = Article {
            id,
            title: title.to_string(),
            body: body.to_string(),
        };
        self.rows.borrow_mut().insert(id, article.clone());
        article
    }

    fn get(&self, id: i64) -> Option<Article> {
        self.rows.borrow().get(&id).cloned()
    }
}

impl EntityRepository<Article> for ArticleRepo {
    fn create(&self, fields: &BTreeMap<String, Value>) -> RowverResult<Article> {
        let title = fields.get("title").and_then(Value::as_str).unwrap_or("");
        let body = fields.get("body").and_then(Value::as_str).unwrap_or("");
        Ok(self.insert(title, body))
    }

    fn update(&self, entity: &Article) -> RowverResult<()> {
        self.rows.borrow_mut().insert(entity.id, entity.clone());
        Ok(())
    }
}

fn versioner(config_fn: impl FnOnce(rowver::VersioningConfigBuilder) -> rowver::VersioningConfigBuilder) -> Versioner {
    // Cascade is off: the toy repo is not SQLite, so the version log has no
    // entity tables to reference.
    let builder = VersioningConfig::builder()
        .database_path(":memory:")
        .enforce_cascade(false);
    Versioner::open(config_fn(builder).build()).unwrap()
}

#[test]
fn test_update_history_is_gapless_and_newest_first() {
    let versioner = versioner(|b| b);
    let repo = ArticleRepo::new();
    let ctx = RequestContext::anonymous();

    // Create with create-versioning off, then two updates: A -> B -> C
    let mut article = repo.insert("A", "text");
    versioner.on_entity_created(&article, &ctx).unwrap();

    article.title = "B".to_string();
    repo.update(&article).unwrap();
    versioner.on_entity_updated(&article, &ctx).unwrap();

    article.title = "C".to_string();
    repo.update(&article).unwrap();
    versioner.on_entity_updated(&article, &ctx).unwrap();

    let versions = versioner.versions::<Article>(article.id).unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].version_number, 2);
    assert_eq!(versions[0].data["title"], json!("C"));
    assert_eq!(versions[1].version_number, 1);
    assert_eq!(versions[1].data["title"], json!("B"));
    assert!(versions
        .iter()
        .all(|v| v.action == VersionAction::Update && v.original_id == article.id));
}

#[test]
fn test_restore_in_place_round_trips_and_records_update() {
    let versioner = versioner(|b| b);
    let repo = ArticleRepo::new();
    let ctx = RequestContext::anonymous().with_user("editor-1");

    let mut article = repo.insert("B", "old body");
    versioner.on_entity_updated(&article, &ctx).unwrap();

    article.title = "C".to_string();
    article.body = "new body".to_string();
    repo.update(&article).unwrap();
    versioner.on_entity_updated(&article, &ctx).unwrap();

    let first = versioner.versions::<Article>(article.id).unwrap()[1].clone();
    let outcome = versioner
        .restore_version(&mut article, first.version_id, false, &repo, &ctx)
        .unwrap();

    assert!(matches!(outcome, RestoreOutcome::Restored));
    assert_eq!(article.title, "B");
    assert_eq!(article.body, "old body");
    assert_eq!(repo.get(article.id).unwrap(), article);

    // The restoration itself lands in the history as a third update
    let versions = versioner.versions::<Article>(article.id).unwrap();
    assert_eq!(versions.len(), 3);
    assert_eq!(versions[0].version_number, 3);
    assert_eq!(versions[0].action, VersionAction::Update);
    assert_eq!(versions[0].data["title"], json!("B"));
}

#[test]
fn test_restore_as_new_creates_fresh_entity() {
    let versioner = versioner(|b| b.version_on_create("articles"));
    let repo = ArticleRepo::new();
    let ctx = RequestContext::anonymous();

    let mut article = repo.insert("original", "snapshot me");
    versioner.on_entity_updated(&article, &ctx).unwrap();
    let snapshot = versioner.versions::<Article>(article.id).unwrap()[0].clone();

    article.title = "drifted".to_string();
    repo.update(&article).unwrap();
    versioner.on_entity_updated(&article, &ctx).unwrap();

    let outcome = versioner
        .restore_version(&mut article, snapshot.version_id, true, &repo, &ctx)
        .unwrap();

    let RestoreOutcome::CreatedNew(fresh) = outcome else {
        panic!("expected a new entity");
    };
    assert_ne!(fresh.id, article.id);
    assert_eq!(fresh.title, "original");
    assert_eq!(fresh.body, "snapshot me");
    assert_eq!(repo.get(fresh.id).unwrap(), fresh);

    // create-versioning is on, so the new entity starts its own history
    let fresh_versions = versioner.versions::<Article>(fresh.id).unwrap();
    assert_eq!(fresh_versions.len(), 1);
    assert_eq!(fresh_versions[0].action, VersionAction::Create);
    assert_eq!(fresh_versions[0].version_number, 1);
}

#[test]
fn test_restore_missing_version_touches_nothing() {
    let versioner = versioner(|b| b);
    let repo = ArticleRepo::new();
    let ctx = RequestContext::anonymous();

    let mut article = repo.insert("untouched", "body");
    versioner.on_entity_updated(&article, &ctx).unwrap();
    let before = article.clone();

    let outcome = versioner
        .restore_version(&mut article, 9999, false, &repo, &ctx)
        .unwrap();

    assert!(matches!(outcome, RestoreOutcome::NotFound));
    assert_eq!(article, before);
    assert_eq!(repo.get(article.id).unwrap(), before);
    assert_eq!(versioner.versions::<Article>(article.id).unwrap().len(), 1);
}

#[test]
fn test_soft_delete_recorded_once_hard_delete_not_at_all() {
    let versioner = versioner(|b| b);
    let repo = ArticleRepo::new();
    let ctx = RequestContext::anonymous();

    let soft = repo.insert("soft", "body");
    versioner
        .on_entity_deleted(&soft, DeleteKind::Soft, &ctx)
        .unwrap();
    let versions = versioner.versions::<Article>(soft.id).unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].action, VersionAction::Delete);

    let hard = repo.insert("hard", "body");
    versioner
        .on_entity_deleted(&hard, DeleteKind::Hard, &ctx)
        .unwrap();
    assert!(versioner.versions::<Article>(hard.id).unwrap().is_empty());
}

#[test]
fn test_history_of_unknown_entity_is_empty() {
    let versioner = versioner(|b| b);
    assert!(versioner.versions::<Article>(12345).unwrap().is_empty());
}
