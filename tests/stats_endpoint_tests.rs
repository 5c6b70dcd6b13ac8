use axum::http::StatusCode;
use chrono::{TimeZone, Utc};

mod utils;

use utils::*;

const STEVE: &str = "069a79f4-44e9-4726-a5be-fca90e38aaf5";
const STEVE_COMPACT: &str = "069a79f444e94726a5befca90e38aaf5";

fn steve_setup() -> TestSetupBuilder {
    TestSetupBuilder::new()
        .with_player_uuid(
            STEVE,
            "Steve",
            Utc.with_ymd_and_hms(2022, 1, 15, 9, 30, 0).unwrap(),
        )
        .with_session(1, 45, 8, 3)
        .with_session(1, 15, 4, 1)
        .with_kills(STEVE, 7)
        .with_groups(STEVE, "default", &["donador", "neroferno"])
        .with_balance(STEVE, "Vault", Some(2_500_000.0), None)
}

#[tokio::test]
async fn test_full_snapshot_by_name() {
    let setup = steve_setup()
        .with_audit(MockAuditConnector::new().with_player("Steve", 1_200, 640))
        .build();

    let (status, json) = setup.get_stats("Steve").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["username"], "Steve");
    assert_eq!(json["rank"], "Neroferno");
    assert_eq!(json["rank_image"], "/ranks/neroferno.png");
    assert_eq!(json["playtime"], "1h 0m");
    assert_eq!(json["kills"], 7);
    assert_eq!(json["mob_kills"], 12);
    assert_eq!(json["deaths"], 4);
    assert_eq!(json["money"], "2.5M");
    assert_eq!(json["blocks_mined"], 1_200);
    assert_eq!(json["blocks_placed"], 640);
    assert_eq!(json["member_since"], "15/01/2022");

    let audit = setup.audit.as_ref().unwrap();
    assert_eq!(audit.connect_count(), 1);
    assert_eq!(audit.close_count(), 1);
}

#[tokio::test]
async fn test_dashed_compact_and_uppercase_uuid_give_same_snapshot() {
    let setup = steve_setup().build();

    let (_, by_dashed) = setup.get_stats(STEVE).await;
    let (_, by_compact) = setup.get_stats(STEVE_COMPACT).await;
    let (_, by_upper) = setup.get_stats(&STEVE.to_uppercase()).await;
    let (_, by_name) = setup.get_stats("Steve").await;

    assert_eq!(by_dashed["username"], "Steve");
    assert_eq!(by_dashed, by_compact);
    assert_eq!(by_dashed, by_upper);
    assert_eq!(by_dashed, by_name);
}

#[tokio::test]
async fn test_compact_registry_row_still_joins_dashed_statistics() {
    let setup = TestSetupBuilder::new()
        .with_player_uuid(STEVE_COMPACT, "Steve", Utc::now())
        .with_kills(STEVE, 3)
        .with_groups(STEVE, "default", &["neroferno"])
        .with_balance(STEVE, "Vault", Some(1_500.0), None)
        .build();

    for identifier in ["Steve", STEVE, STEVE_COMPACT] {
        let (status, json) = setup.get_stats(identifier).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["rank"], "Neroferno");
        assert_eq!(json["kills"], 3);
        assert_eq!(json["money"], "1.5k");
    }
}

#[tokio::test]
async fn test_reused_name_resolves_to_latest_registration() {
    let setup = TestSetupBuilder::new()
        .with_player("Alex", Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap())
        .with_player("Alex", Utc.with_ymd_and_hms(2023, 2, 1, 0, 0, 0).unwrap())
        .build();

    let (status, json) = setup.get_stats("Alex").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["member_since"], "01/02/2023");
}

#[tokio::test]
async fn test_unknown_player_is_not_found_and_skips_statistics() {
    let setup = steve_setup()
        .with_audit(MockAuditConnector::new().with_player("Steve", 1, 1))
        .build();

    let (status, json) = setup.get_stats("Notch").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("Notch"));
    assert_eq!(setup.audit.as_ref().unwrap().connect_count(), 0);
}

#[tokio::test]
async fn test_blank_identifier_never_touches_identity_store() {
    let setup = steve_setup().build();

    let (status, _) = setup.get_stats("%20%20").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(setup.identities.lookup_count(), 0);
}

#[tokio::test]
async fn test_failing_stores_degrade_to_defaults() {
    let setup = TestSetupBuilder::new()
        .with_player_uuid(
            STEVE,
            "Steve",
            Utc.with_ymd_and_hms(2021, 12, 31, 0, 0, 0).unwrap(),
        )
        .with_failing_stats()
        .with_audit(MockAuditConnector::new().failing_queries())
        .build();

    let (status, json) = setup.get_stats("Steve").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["username"], "Steve");
    assert_eq!(json["rank"], "Default");
    assert_eq!(json["rank_image"], "/ranks/default.png");
    assert_eq!(json["playtime"], "0m");
    assert_eq!(json["kills"], 0);
    assert_eq!(json["mob_kills"], 0);
    assert_eq!(json["deaths"], 0);
    assert_eq!(json["money"], "0");
    assert_eq!(json["blocks_mined"], 0);
    assert_eq!(json["blocks_placed"], 0);
    assert_eq!(json["member_since"], "31/12/2021");

    // The audit connection is released even though its query failed
    assert_eq!(setup.audit.as_ref().unwrap().close_count(), 1);
}

#[tokio::test]
async fn test_unconfigured_audit_store_reports_zero_blocks() {
    let setup = steve_setup().build();

    let (status, json) = setup.get_stats("Steve").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["blocks_mined"], 0);
    assert_eq!(json["blocks_placed"], 0);
}

#[tokio::test]
async fn test_zero_numeric_balance_falls_back_to_text() {
    let setup = TestSetupBuilder::new()
        .with_player_uuid(STEVE, "Steve", Utc::now())
        .with_balance(STEVE, "EssentialsX", Some(0.0), Some("$1.234.567,89"))
        .build();

    let (_, json) = setup.get_stats("Steve").await;

    assert_eq!(json["money"], "1.23M");
}

#[tokio::test]
async fn test_balance_from_unmapped_plugin_is_ignored() {
    let setup = TestSetupBuilder::new()
        .with_player_uuid(STEVE, "Steve", Utc::now())
        .with_balance(STEVE, "VaultExtras", Some(9_000.0), None)
        .build();

    let (_, json) = setup.get_stats("Steve").await;

    assert_eq!(json["money"], "0");
}

#[tokio::test]
async fn test_unrecognized_group_is_shown_verbatim() {
    let setup = TestSetupBuilder::new()
        .with_player_uuid(STEVE, "Steve", Utc::now())
        .with_groups(STEVE, "Builder", &["Moderador"])
        .build();

    let (_, json) = setup.get_stats("Steve").await;

    assert_eq!(json["rank"], "Builder");
    assert_eq!(json["rank_image"], "/ranks/default.png");
}

#[tokio::test]
async fn test_decorated_group_names_normalize_to_canonical_rank() {
    let setup = TestSetupBuilder::new()
        .with_player_uuid(STEVE, "Steve", Utc::now())
        .with_groups(STEVE, "§6VIP", &["10_Fundador"])
        .build();

    let (_, json) = setup.get_stats("Steve").await;

    assert_eq!(json["rank"], "Fundador");
    assert_eq!(json["rank_image"], "/ranks/fundador.png");
}

#[tokio::test]
async fn test_health_endpoint() {
    let setup = TestSetupBuilder::new().build();

    let (status, body) = setup.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}
