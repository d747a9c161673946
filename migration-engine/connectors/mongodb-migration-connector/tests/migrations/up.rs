use crate::{test_api::*, units::*};
use indoc::indoc;
use mongodb_migration_connector::{
    ErrorKind, MigrationParams, MigrationPlugin, MigrationRegistry, UP_SCRIPT_FILE_NAME, UpParams,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::{fs, path::Path};

fn write_script(dir: &Path, version: &str, contents: &str) {
    let version_dir = dir.join(version);
    fs::create_dir_all(&version_dir).unwrap();
    fs::write(version_dir.join(UP_SCRIPT_FILE_NAME), contents).unwrap();
}

#[test]
fn migrating_from_nothing_to_0_1_0_records_the_migration() {
    test_with_database(customers_and_countries(), |mut api| async move {
        assert!(!api.bind_ledger().await);

        api.connector.up(&UpParams::new("0.1.0")).await.unwrap();

        assert_eq!(api.ledger_versions().await, vec!["0.1.0"]);
        assert!(api.connector.has_migration(&MigrationParams::up("0.1.0")).await.unwrap());
        assert!(api.find_one("customers", doc! { "name": "PDMLab" }).await.is_some());
    });
}

#[test]
fn migrating_to_0_1_0_then_0_2_0_records_both() {
    test_with_database(customers_and_countries(), |mut api| async move {
        api.bind_ledger().await;

        api.connector.up(&UpParams::new("0.1.0")).await.unwrap();
        api.connector.up(&UpParams::new("0.2.0")).await.unwrap();

        assert_eq!(api.ledger_versions().await, vec!["0.1.0", "0.2.0"]);
        assert_eq!(api.count("migrations", doc! {}).await, 2);
        assert!(api.find_one("customers", doc! { "name": "PDMLab" }).await.is_some());
        assert!(api.find_one("countries", doc! { "name": "Germany" }).await.is_some());
        assert_eq!(
            api.connector.get_latest_applied_migration().await.unwrap().as_deref(),
            Some("0.2.0")
        );
    });
}

#[test]
fn custom_options_reach_the_migration_unit() {
    test_with_database(customers_and_countries(), |mut api| async move {
        api.bind_ledger().await;

        let params = UpParams::new("0.1.0").custom_options(json!({ "customName": "Acme Corp" }));
        api.connector.up(&params).await.unwrap();

        assert!(api.find_one("customers", doc! { "name": "Acme Corp" }).await.is_some());
        assert!(api.find_one("customers", doc! { "name": "PDMLab" }).await.is_none());
    });
}

#[test]
fn a_version_without_a_unit_is_a_resolution_error() {
    test_with_database(customers_and_countries(), |mut api| async move {
        api.bind_ledger().await;

        let err = api.connector.up(&UpParams::new("0.4.0")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert!(!api.bind_ledger().await);
        assert_eq!(api.ledger_versions().await, Vec::<String>::new());
    });
}

#[test]
fn a_version_missing_from_the_directory_is_a_resolution_error() {
    let tmp = tempfile::tempdir().unwrap();
    write_script(tmp.path(), "0.1.0", "[]");
    let directory = tmp.path().to_owned();

    test_with_database(MigrationRegistry::new(), |mut api| async move {
        api.bind_ledger().await;

        let err = api
            .connector
            .up(&UpParams::new("0.2.0").migrations_directory(&directory))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert!(err.message().unwrap().contains(UP_SCRIPT_FILE_NAME));
        assert_eq!(api.ledger_versions().await, Vec::<String>::new());
    });
}

#[test]
fn scripts_from_the_migrations_directory_are_run() {
    let tmp = tempfile::tempdir().unwrap();
    write_script(
        tmp.path(),
        "0.1.0",
        indoc! {r#"
            [
                { "insert": "customers", "documents": [{ "name": "PDMLab" }, { "name": "Acme Corp" }] },
                { "createIndexes": "customers", "indexes": [{ "key": { "name": 1 }, "name": "name_1", "unique": true }] }
            ]
        "#},
    );
    let directory = tmp.path().to_owned();

    test_with_database(MigrationRegistry::new(), |mut api| async move {
        api.bind_ledger().await;

        api.connector
            .up(&UpParams::new("0.1.0").migrations_directory(&directory))
            .await
            .unwrap();

        assert_eq!(api.count("customers", doc! {}).await, 2);
        assert_eq!(api.ledger_versions().await, vec!["0.1.0"]);
    });
}

#[test]
fn registered_units_take_precedence_over_scripts() {
    let tmp = tempfile::tempdir().unwrap();
    write_script(
        tmp.path(),
        "0.2.0",
        r#"[{ "insert": "countries", "documents": [{ "name": "France" }] }]"#,
    );
    let directory = tmp.path().to_owned();

    test_with_database(customers_and_countries(), |mut api| async move {
        api.bind_ledger().await;

        api.connector
            .up(&UpParams::new("0.2.0").migrations_directory(&directory))
            .await
            .unwrap();

        assert!(api.find_one("countries", doc! { "name": "Germany" }).await.is_some());
        assert!(api.find_one("countries", doc! { "name": "France" }).await.is_none());
    });
}

#[test]
fn a_failing_unit_is_not_recorded() {
    let registry = MigrationRegistry::new().with("0.1.0", HalfwayFailure);

    test_with_database(registry, |mut api| async move {
        api.bind_ledger().await;

        let err = api.connector.up(&UpParams::new("0.1.0")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Execution);
        assert!(err.to_string().contains("the second step of the migration blew up"));
        assert!(!api.connector.has_migration(&MigrationParams::up("0.1.0")).await.unwrap());
        // Partial writes stay.
        assert!(api.find_one("customers", doc! { "name": "Halfway" }).await.is_some());
    });
}

#[test]
fn a_failing_script_is_not_recorded() {
    let tmp = tempfile::tempdir().unwrap();
    write_script(tmp.path(), "0.1.0", r#"[{ "thisIsNotACommand": 1 }]"#);
    let directory = tmp.path().to_owned();

    test_with_database(MigrationRegistry::new(), |mut api| async move {
        api.bind_ledger().await;

        let err = api
            .connector
            .up(&UpParams::new("0.1.0").migrations_directory(&directory))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Execution);
        assert_eq!(api.ledger_versions().await, Vec::<String>::new());
    });
}

#[test]
fn up_runs_the_unit_even_when_already_applied() {
    test_with_database(customers_and_countries(), |mut api| async move {
        api.bind_ledger().await;

        api.connector.up(&UpParams::new("0.1.0")).await.unwrap();
        api.connector.up(&UpParams::new("0.1.0")).await.unwrap();

        assert_eq!(api.count("customers", doc! { "name": "PDMLab" }).await, 2);
        assert_eq!(api.count("migrations", doc! {}).await, 1);
    });
}

#[test]
fn recording_after_up_keeps_a_single_record() {
    test_with_database(customers_and_countries(), |mut api| async move {
        api.bind_ledger().await;

        api.connector.up(&UpParams::new("0.1.0")).await.unwrap();
        api.connector
            .add_migration_to_migrations_table(&MigrationParams::up("0.1.0"))
            .await
            .unwrap();

        assert_eq!(api.count("migrations", doc! { "version": "0.1.0", "direction": "up" }).await, 1);
    });
}

#[test]
fn up_needs_a_bound_ledger() {
    test_with_database(customers_and_countries(), |api| async move {
        let err = api.connector.up(&UpParams::new("0.1.0")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::LedgerNotBound);
        assert!(!api.collection_exists("customers").await);
    });
}
