//! End-to-end loading over the seeded lab database.

use pretty_assertions::assert_eq;
use tether_lab::models::{Company, Country, User};
use tether_lab::scenarios::{self, SEPARATOR};
use tether_lab::{Lab, LabError};
use tether_query::{ErrorCode, ErrorKind, Filter, Session};

async fn seeded_lab() -> Lab {
    let lab = Lab::connect("sqlite::memory:").await.unwrap();
    lab.recreate().await.unwrap();
    lab.seed().await.unwrap();
    lab
}

fn names<M>(entities: &[M], name: impl Fn(&M) -> String) -> Vec<String> {
    entities.iter().map(name).collect()
}

async fn users_of(session: &Session, company_id: i64) -> Vec<String> {
    let company = session.find::<Company>(company_id).await.unwrap().unwrap();
    session
        .entry(&company)
        .collection("users")
        .unwrap()
        .load()
        .await
        .unwrap();
    company.users.get().iter().map(|u| u.name.clone()).collect()
}

#[tokio::test]
async fn test_eager_graph_is_one_fetch() {
    let lab = seeded_lab().await;
    let session = lab.sessions().open();

    let users = session
        .query::<User>()
        .include("company")
        .then_include("country")
        .then_include("capital")
        .include("position")
        .all()
        .await
        .unwrap();

    assert_eq!(session.fetch_count(), 1);
    assert_eq!(names(&users, |u| u.name.clone()), ["Tom", "Bob", "Alice", "Kate"]);

    for user in &users {
        let company = user.company.get().unwrap();
        let country = company.country.get().unwrap();
        assert_eq!(country.name, "USA");
        assert_eq!(country.capital.get().unwrap().name, "Washington");
        assert!(user.position.get().is_some());
        // Not requested, so left unloaded.
        assert!(!company.users.is_loaded());
    }
    assert_eq!(session.fetch_count(), 1);
}

#[tokio::test]
async fn test_eager_collections_match_seed() {
    let lab = seeded_lab().await;
    let session = lab.sessions().open();

    let companies = session.query::<Company>().include("users").all().await.unwrap();
    let grouped: Vec<(String, Vec<String>)> = companies
        .iter()
        .map(|c| {
            let users = c.users.get().iter().map(|u| u.name.clone()).collect();
            (c.name.clone(), users)
        })
        .collect();

    assert_eq!(
        grouped,
        vec![
            ("Microsoft".to_string(), vec!["Tom".to_string(), "Alice".to_string()]),
            ("Google".to_string(), vec!["Bob".to_string(), "Kate".to_string()]),
        ]
    );
}

#[tokio::test]
async fn test_explicit_collection_matches_eager() {
    let lab = seeded_lab().await;

    let eager = {
        let session = lab.sessions().open();
        let company = session
            .query::<Company>()
            .include("users")
            .where_eq("id", 1)
            .first()
            .await
            .unwrap()
            .unwrap();
        let users: Vec<String> = company.users.get().iter().map(|u| u.name.clone()).collect();
        users
    };

    let session = lab.sessions().open();
    let explicit = users_of(&session, 1).await;
    assert_eq!(explicit, eager);
}

#[tokio::test]
async fn test_explicit_load_twice_is_stable() {
    let lab = seeded_lab().await;
    let session = lab.sessions().open();

    let company = session.find::<Company>(2).await.unwrap().unwrap();
    let entry = session.entry(&company);
    let users = entry.collection("users").unwrap();
    assert!(!users.is_loaded());

    users.load().await.unwrap();
    let once: Vec<String> = company.users.get().iter().map(|u| u.name.clone()).collect();
    users.load().await.unwrap();
    let twice: Vec<String> = company.users.get().iter().map(|u| u.name.clone()).collect();

    assert!(users.is_loaded());
    assert_eq!(once, ["Bob", "Kate"]);
    assert_eq!(twice, once);
}

#[tokio::test]
async fn test_explicit_filtered_load_fills_slot() {
    let lab = seeded_lab().await;
    let session = lab.sessions().open();

    let company = session.find::<Company>(1).await.unwrap().unwrap();
    let users = session.entry(&company).collection("users").unwrap();
    users.load_where(Filter::eq("name", "Alice")).await.unwrap();

    assert!(users.is_loaded());
    let loaded: Vec<String> = company.users.get().iter().map(|u| u.name.clone()).collect();
    assert_eq!(loaded, ["Alice"]);
    assert_eq!(session.stats().explicit_fetches, 1);
}

#[tokio::test]
async fn test_explicit_filtered_load_matches_eager() {
    let lab = seeded_lab().await;

    let eager: Vec<Vec<String>> = {
        let session = lab.sessions().open();
        let companies = session.query::<Company>().include("users").all().await.unwrap();
        companies
            .iter()
            .map(|c| c.users.get().iter().map(|u| u.name.clone()).collect())
            .collect()
    };

    let session = lab.sessions().open();
    let companies = session.query::<Company>().all().await.unwrap();
    let mut filtered = Vec::new();
    for company in &companies {
        session
            .entry(company)
            .collection("users")
            .unwrap()
            .load_where(Filter::None)
            .await
            .unwrap();
        let users: Vec<String> = company.users.get().iter().map(|u| u.name.clone()).collect();
        filtered.push(users);
    }

    assert_eq!(filtered, eager);
    assert_eq!(filtered[0], ["Tom", "Alice"]);
}

#[tokio::test]
async fn test_explicit_null_reference_skips_fetch() {
    let lab = seeded_lab().await;
    let session = lab.sessions().open();

    let mut orphan = Company::new("Orphan", None);
    session.add(&mut orphan).await.unwrap();
    let orphan = session.find::<Company>(orphan.id).await.unwrap().unwrap();

    let before = session.fetch_count();
    let country = session.entry(&orphan).reference("country").unwrap();
    country.load().await.unwrap();

    assert_eq!(session.fetch_count(), before);
    assert!(country.is_loaded());
    assert!(orphan.country.get().is_none());
}

#[tokio::test]
async fn test_load_related_is_one_fetch() {
    let lab = seeded_lab().await;
    let session = lab.sessions().open();

    let users = session.query::<User>().all().await.unwrap();
    let before = session.fetch_count();
    session.load_related(&users, "company").await.unwrap();

    assert_eq!(session.fetch_count(), before + 1);
    let companies: Vec<String> = users
        .iter()
        .map(|u| u.company.get().unwrap().name.clone())
        .collect();
    assert_eq!(companies, ["Microsoft", "Google", "Microsoft", "Google"]);
}

#[tokio::test]
async fn test_lazy_load_and_cache() {
    let lab = seeded_lab().await;
    let session = lab.lazy_sessions().open();

    let user = session.query::<User>().first().await.unwrap().unwrap();
    assert!(user.company.is_lazy());
    assert!(user.company.get().is_none());

    let company = user.company.load().await.unwrap().unwrap();
    assert_eq!(company.name, "Microsoft");
    let after_first = session.fetch_count();

    let again = user.company.load().await.unwrap().unwrap();
    assert_eq!(again.name, "Microsoft");
    assert_eq!(session.fetch_count(), after_first);
    assert_eq!(session.stats().lazy_fetches, 1);
}

#[tokio::test]
async fn test_lazy_n_plus_one() {
    let lab = seeded_lab().await;
    let session = lab.lazy_sessions().open();

    let users = session.query::<User>().all().await.unwrap();
    for user in &users {
        user.company.load().await.unwrap();
    }

    assert_eq!(session.fetch_count(), 1 + users.len() as u64);
    assert_eq!(session.stats().lazy_fetches, 4);
}

#[tokio::test]
async fn test_lazy_after_close_fails() {
    let lab = seeded_lab().await;
    let session = lab.lazy_sessions().open();
    let user = session.query::<User>().first().await.unwrap().unwrap();
    session.close();

    let err = user.company.load().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    assert!(user.company.get().is_none());
}

#[tokio::test]
async fn test_loaded_relation_survives_close() {
    let lab = seeded_lab().await;
    let session = lab.lazy_sessions().open();
    let user = session.query::<User>().first().await.unwrap().unwrap();
    user.company.load().await.unwrap();
    session.close();

    let company = user.company.load().await.unwrap().unwrap();
    assert_eq!(company.name, "Microsoft");
}

#[tokio::test]
async fn test_lazy_disabled_fails() {
    let lab = seeded_lab().await;
    let session = lab.sessions().open();
    let user = session.query::<User>().first().await.unwrap().unwrap();

    assert!(!user.company.is_lazy());
    let err = user.company.load().await.unwrap_err();
    assert!(err.is_invalid_operation());
    assert_eq!(session.fetch_count(), 1);
}

#[tokio::test]
async fn test_unknown_include_fails_before_fetch() {
    let lab = seeded_lab().await;
    let session = lab.sessions().open();

    let err = session
        .query::<User>()
        .include("company")
        .then_include("ceo")
        .all()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(session.fetch_count(), 0);
}

#[tokio::test]
async fn test_unknown_entry_relation() {
    let lab = seeded_lab().await;
    let session = lab.sessions().open();
    let country = session.query::<Country>().first().await.unwrap().unwrap();

    let err = session.entry(&country).collection("cities").unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_foreign_key_violation() {
    let lab = seeded_lab().await;
    let session = lab.sessions().open();

    let mut ghost = Company::new("Ghost", None);
    ghost.id = 99;
    let mut user = User::new("Nobody", Some(&ghost), None);

    let err = session.add(&mut user).await.unwrap_err();
    assert!(err.is_constraint_violation());
    assert_eq!(err.code, ErrorCode::ForeignKeyConstraint);
    assert_eq!(user.id, 0);
}

#[tokio::test]
async fn test_storage_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!(
        "sqlite://{}",
        dir.path().join("missing").join("lab.db").display()
    );

    let err = Lab::connect(&url).await.unwrap_err();
    assert!(matches!(err, LabError::Storage(_)));
}

#[tokio::test]
async fn test_file_database_recreate_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("helloapp.db").display());

    for _ in 0..2 {
        let lab = Lab::connect(&url).await.unwrap();
        lab.recreate().await.unwrap();
        let report = lab.seed().await.unwrap();
        assert_eq!(report.users, 4);

        let session = lab.sessions().open();
        assert_eq!(users_of(&session, 1).await, ["Tom", "Alice"]);
        let users = session.query::<User>().all().await.unwrap();
        assert_eq!(users.len(), 4);
    }
}

#[tokio::test]
async fn test_eager_scenario_output() {
    let lab = seeded_lab().await;
    let lines = scenarios::eager(&lab).await.unwrap();

    assert_eq!(lines.len(), 12);
    assert_eq!(
        lines[..3].to_vec(),
        vec!["Tom - Manager", "Microsoft - USA - Washington", SEPARATOR]
    );
    assert_eq!(lines[3], "Bob - Developer");
    assert_eq!(lines[4], "Google - USA - Washington");
}

#[tokio::test]
async fn test_lazy_scenario_output() {
    let lab = seeded_lab().await;
    let lines = scenarios::lazy(&lab).await.unwrap();

    assert_eq!(
        lines[..6].to_vec(),
        vec![
            "Tom - Microsoft",
            "Bob - Google",
            "Alice - Microsoft",
            "Kate - Google",
            "Microsoft: Tom Alice ",
            "Google: Bob Kate ",
        ]
    );
    assert_eq!(lines.len(), 7);
    assert!(lines[6].starts_with("Tom after release: "));
}

#[tokio::test]
async fn test_explicit_scenario_output() {
    let lab = seeded_lab().await;
    let lines = scenarios::explicit(&lab).await.unwrap();

    assert_eq!(
        lines[..7].to_vec(),
        vec![
            "Company: Microsoft",
            ":User  Tom",
            ":User  Alice",
            "Company: Microsoft",
            ":User  Tom",
            ":User  Alice",
            "Tom - Microsoft",
        ]
    );
    assert_eq!(lines.len(), 7 + 2 + 2 + 4);
}
