//! Golden tests for the dashboard pipeline.
//!
//! These tests verify activity normalization and metric derivation against
//! known cases.

use chrono::{DateTime, Duration, TimeZone, Utc};
use medtrack_core::dashboard::{derive_metrics, normalize_activities, Dashboard, ExpiryPolicy};
use medtrack_core::models::{ActivityKind, InventoryItem, RawActivity, Unit};
use medtrack_core::Snapshot;

/// Test case for activity normalization.
struct ActivityCase {
    id: &'static str,
    action: Option<&'static str>,
    activity_type: Option<&'static str>,
    details: Option<&'static str>,
    description: Option<&'static str>,
    timestamp: Option<&'static str>,
    created_at: Option<&'static str>,
    expected_kind: ActivityKind,
    expected_description: &'static str,
    expected_time: &'static str,
}

fn get_activity_cases() -> Vec<ActivityCase> {
    vec![
        ActivityCase {
            id: "backend-created",
            action: Some("created"),
            activity_type: None,
            details: Some("Created new item: Paracetamol 500mg"),
            description: None,
            timestamp: Some("2024-06-01T09:15:00"),
            created_at: None,
            expected_kind: ActivityKind::Add,
            expected_description: "Created new item: Paracetamol 500mg",
            expected_time: "Jun 1, 2024, 9:15:00 AM",
        },
        ActivityCase {
            id: "backend-sold-microseconds",
            action: Some("sold"),
            activity_type: None,
            details: Some("Sold 20 tablets of Paracetamol 500mg"),
            description: None,
            timestamp: Some("2024-06-02T18:05:09.123456"),
            created_at: None,
            expected_kind: ActivityKind::Sold,
            expected_description: "Sold 20 tablets of Paracetamol 500mg",
            expected_time: "Jun 2, 2024, 6:05:09 PM",
        },
        ActivityCase {
            id: "backend-restocked",
            action: Some("restocked"),
            activity_type: None,
            details: Some("Restocked 50 rolls of Bandages"),
            description: None,
            timestamp: Some("2024-07-01T00:00:00Z"),
            created_at: None,
            expected_kind: ActivityKind::Restocked,
            expected_description: "Restocked 50 rolls of Bandages",
            expected_time: "Jul 1, 2024, 12:00:00 AM",
        },
        ActivityCase {
            id: "backend-deleted",
            action: Some("deleted"),
            activity_type: None,
            details: Some("Deleted item: Cetirizine 10mg"),
            description: None,
            timestamp: None,
            created_at: None,
            expected_kind: ActivityKind::Remove,
            expected_description: "Deleted item: Cetirizine 10mg",
            expected_time: "",
        },
        ActivityCase {
            id: "legacy-remove",
            action: None,
            activity_type: Some("remove"),
            details: None,
            description: Some("Removed 5 units of Ibuprofen"),
            timestamp: None,
            created_at: Some("2024-01-08T10:30:00Z"),
            expected_kind: ActivityKind::Remove,
            expected_description: "Removed 5 units of Ibuprofen",
            expected_time: "Jan 8, 2024, 10:30:00 AM",
        },
        ActivityCase {
            id: "mixed-schemes-action-wins",
            action: Some("sold"),
            activity_type: Some("add"),
            details: Some("Sold 3 capsules"),
            description: Some("Added stock"),
            timestamp: None,
            created_at: None,
            expected_kind: ActivityKind::Sold,
            expected_description: "Sold 3 capsules",
            expected_time: "",
        },
        ActivityCase {
            id: "unknown-type",
            action: Some("archived"),
            activity_type: None,
            details: None,
            description: None,
            timestamp: Some("last tuesday"),
            created_at: None,
            expected_kind: ActivityKind::Update,
            expected_description: "",
            expected_time: "last tuesday",
        },
    ]
}

#[test]
fn test_activity_golden_cases() {
    for case in get_activity_cases() {
        let raw = RawActivity {
            item_id: None,
            action: case.action.map(String::from),
            activity_type: case.activity_type.map(String::from),
            details: case.details.map(String::from),
            description: case.description.map(String::from),
            timestamp: case.timestamp.map(String::from),
            created_at: case.created_at.map(String::from),
        };

        let activity = &normalize_activities(std::slice::from_ref(&raw))[0];

        assert_eq!(activity.kind, case.expected_kind, "Case {}: type mismatch", case.id);
        assert_eq!(
            activity.description, case.expected_description,
            "Case {}: description mismatch",
            case.id
        );
        assert_eq!(activity.time, case.expected_time, "Case {}: time mismatch", case.id);
    }
}

#[test]
fn test_feed_keeps_five_newest() {
    let raw: Vec<RawActivity> = get_activity_cases()
        .iter()
        .map(|case| RawActivity {
            action: case.action.map(String::from),
            details: Some(case.id.to_string()),
            ..Default::default()
        })
        .collect();

    let feed = normalize_activities(&raw);
    assert_eq!(feed.len(), 5);
    let ids: Vec<&str> = feed.iter().map(|a| a.description.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "backend-created",
            "backend-sold-microseconds",
            "backend-restocked",
            "backend-deleted",
            "legacy-remove",
        ]
    );
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap()
}

fn stocked(
    name: &str,
    quantity: u32,
    reorder_level: u32,
    stocked_on: DateTime<Utc>,
    use_period: u32,
) -> InventoryItem {
    InventoryItem {
        id: name.to_lowercase().replace(' ', "-"),
        name: name.to_string(),
        description: String::new(),
        quantity,
        unit: Unit::Tablets,
        price: 1.0,
        use_period,
        reorder_level,
        created_at: stocked_on,
        updated_at: stocked_on,
    }
}

#[test]
fn test_ten_day_shelf_life_example() {
    let jan_1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let item = stocked("Amoxicillin", 40, 10, jan_1, 10);

    let metrics = derive_metrics(&[item], now(), ExpiryPolicy::FutureWindow);
    assert_eq!(metrics.expiring_soon_count, 1);
    assert_eq!(metrics.expiring[0].expiry, "2024-01-11");
    assert_eq!(metrics.expiring[0].days_left, 3);
}

#[test]
fn test_window_edges() {
    let cases = vec![
        ("expired-yesterday", -1, false),
        ("expires-now", 0, false),
        ("expires-tomorrow", 1, true),
        ("expires-in-30", 30, true),
        ("expires-in-31", 31, false),
    ];

    for (id, days, expected) in cases {
        let stocked_on = now() + Duration::days(days) - Duration::days(100);
        let item = stocked(id, 100, 10, stocked_on, 100);
        let metrics = derive_metrics(&[item], now(), ExpiryPolicy::FutureWindow);
        assert_eq!(
            metrics.expiring_soon_count == 1,
            expected,
            "Case {}: window membership mismatch",
            id
        );
    }
}

#[test]
fn test_full_dashboard() {
    let snapshot = Snapshot {
        items: vec![
            stocked("Paracetamol 500mg", 1000, 200, now() - Duration::days(300), 365),
            stocked("Amoxicillin 250mg", 80, 100, now() - Duration::days(170), 180),
            stocked("Bandages", 50, 50, now() - Duration::days(10), 730),
            stocked("Ibuprofen 200mg", 800, 150, now() - Duration::days(360), 365),
        ],
        activities: vec![RawActivity {
            action: Some("sold".into()),
            details: Some("Sold 20 capsules of Amoxicillin 250mg".into()),
            timestamp: Some("2024-01-07T16:00:00".into()),
            ..Default::default()
        }],
        loaded_at: Some(now()),
    };

    let dashboard = Dashboard::compose(&snapshot, now(), ExpiryPolicy::FutureWindow);

    assert_eq!(dashboard.summary.total, 4);
    assert_eq!(dashboard.summary.low_stock_count, 2);
    assert_eq!(dashboard.summary.low_stock_percent, 50.0);
    assert_eq!(dashboard.summary.expiring_soon_count, 2);

    let expiring: Vec<(&str, i64)> = dashboard
        .expiring
        .iter()
        .map(|d| (d.name.as_str(), d.days_left))
        .collect();
    assert_eq!(expiring, vec![("Ibuprofen 200mg", 5), ("Amoxicillin 250mg", 10)]);

    let low: Vec<(&str, u32)> = dashboard
        .low_stock
        .iter()
        .map(|d| (d.name.as_str(), d.left))
        .collect();
    assert_eq!(low, vec![("Bandages", 50), ("Amoxicillin 250mg", 80)]);

    assert_eq!(dashboard.recent_activity[0].time, "Jan 7, 2024, 4:00:00 PM");
}
