use chrono::{Duration, Utc};

use fna_studio::models::{LinkStatus, TestimonialLinkRow};
use fna_studio::settings::{
    sanitize_admin_emails, settings_from_columns, AdminEmailConfig,
};

fn config(id: &str, is_primary: bool) -> AdminEmailConfig {
    AdminEmailConfig {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        name: id.to_string(),
        is_active: true,
        is_primary,
    }
}

#[test]
fn sanitize_leaves_empty_list_alone() {
    let mut configs: Vec<AdminEmailConfig> = Vec::new();
    sanitize_admin_emails(&mut configs);
    assert!(configs.is_empty());
}

#[test]
fn sanitize_promotes_first_when_no_primary() {
    let mut configs = vec![config("a", false), config("b", false)];
    sanitize_admin_emails(&mut configs);
    assert!(configs[0].is_primary);
    assert!(!configs[1].is_primary);
}

#[test]
fn sanitize_demotes_all_but_first_primary() {
    let mut configs = vec![config("a", true), config("b", true), config("c", true)];
    sanitize_admin_emails(&mut configs);
    assert!(configs[0].is_primary);
    assert!(!configs[1].is_primary);
    assert!(!configs[2].is_primary);
}

#[test]
fn sanitize_keeps_a_single_existing_primary() {
    let mut configs = vec![config("a", false), config("b", true)];
    let before = configs.clone();
    sanitize_admin_emails(&mut configs);
    assert_eq!(configs, before);
}

#[test]
fn malformed_columns_are_repaired_with_defaults() {
    let (settings, repaired) = settings_from_columns("not json", "null", "{}");
    assert!(repaired);
    assert!(!settings.admin_email_configs.is_empty());
    assert!(!settings.location_config.display_address.is_empty());
    assert!(!settings.booking_policies.cancellation.items.is_empty());
}

#[test]
fn valid_columns_pass_through_without_repair() {
    let admin = r#"[{"id":"a","email":"a@example.com","name":"A","isActive":true,"isPrimary":true}]"#;
    let (settings, repaired) = settings_from_columns(admin, "{}", "{}");
    assert!(!repaired);
    assert_eq!(settings.admin_email_configs.len(), 1);
}

#[test]
fn duplicate_primaries_in_stored_row_are_repaired() {
    let admin = r#"[
        {"id":"a","email":"a@example.com","name":"A","isActive":true,"isPrimary":true},
        {"id":"b","email":"b@example.com","name":"B","isActive":true,"isPrimary":true}
    ]"#;
    let (settings, repaired) = settings_from_columns(admin, "{}", "{}");
    assert!(repaired);
    assert!(settings.admin_email_configs[0].is_primary);
    assert!(!settings.admin_email_configs[1].is_primary);
}

fn link(is_active: i64, expires_at: Option<String>, max_uses: Option<i64>, use_count: i64) -> TestimonialLinkRow {
    TestimonialLinkRow {
        short_code: "ABC123".to_string(),
        label: String::new(),
        expires_at,
        max_uses,
        use_count,
        is_active,
        created_at: Utc::now().to_rfc3339(),
    }
}

#[test]
fn review_link_usability_truth_table() {
    let now = Utc::now();
    let future = (now + Duration::hours(1)).to_rfc3339();
    let past = (now - Duration::hours(1)).to_rfc3339();

    assert_eq!(link(1, None, None, 0).status_at(now), LinkStatus::Usable);
    assert_eq!(link(0, None, None, 0).status_at(now), LinkStatus::Inactive);
    assert_eq!(
        link(1, Some(past), None, 0).status_at(now),
        LinkStatus::Expired
    );
    assert_eq!(
        link(1, Some(future.clone()), None, 0).status_at(now),
        LinkStatus::Usable
    );
    assert_eq!(
        link(1, None, Some(3), 3).status_at(now),
        LinkStatus::LimitReached
    );
    assert_eq!(link(1, None, Some(3), 2).status_at(now), LinkStatus::Usable);
    // Inactive wins over every other reason.
    assert_eq!(
        link(0, Some(future), Some(1), 5).status_at(now),
        LinkStatus::Inactive
    );
    assert!(link(1, None, None, 0).is_usable(now));
    assert!(!link(0, None, None, 0).is_usable(now));
}
