//! Local store and controller flow over an on-disk state file.

use std::sync::Arc;

use chrono::Utc;
use medtrack_core::alerts::{AlertDigest, NotificationLog};
use medtrack_core::models::{ActivityKind, ItemDraft, SalesMetric, StockAction, Unit, User};
use medtrack_core::search::SearchController;
use medtrack_core::{
    Database, ExpiryPolicy, InventoryController, InventoryStore, LocalStore, Session,
};

fn draft(name: &str, quantity: u32, reorder_level: u32) -> ItemDraft {
    ItemDraft {
        name: name.into(),
        description: "Test drug".into(),
        quantity,
        unit: Unit::Capsules,
        price: 8.99,
        use_period: 180,
        reorder_level,
    }
}

#[tokio::test]
async fn test_oversell_leaves_state_unchanged() {
    let store = Arc::new(LocalStore::in_memory().unwrap());
    let mut controller = InventoryController::new(store.clone(), ExpiryPolicy::default());

    controller.create(&draft("Amoxicillin 250mg", 10, 5)).await;
    let id = controller.snapshot().items[0].id.clone();
    let before = controller.snapshot().clone();

    let notice = controller.sell(&id, 11).await;
    assert!(notice.is_error());
    assert_eq!(controller.snapshot(), &before);

    // A fresh load shows the store did not change either.
    controller.refresh().await.unwrap();
    assert_eq!(controller.snapshot().items, before.items);
    assert_eq!(controller.snapshot().activities, before.activities);
    assert!(store.sales().unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_name_notice() {
    let store = Arc::new(LocalStore::in_memory().unwrap());
    let mut controller = InventoryController::new(store, ExpiryPolicy::default());

    controller.create(&draft("Amoxicillin 250mg", 10, 5)).await;
    let notice = controller.create(&draft("amoxicillin 250MG", 1, 1)).await;

    assert!(notice.is_error());
    assert_eq!(
        notice.message,
        "An item with the name 'amoxicillin 250MG' already exists (case-insensitive match)"
    );
    assert_eq!(controller.snapshot().items.len(), 1);
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("medtrack.db");

    {
        let store = Arc::new(LocalStore::open(&path).unwrap());
        let mut controller = InventoryController::new(store, ExpiryPolicy::default());
        controller.create(&draft("Amoxicillin 250mg", 10, 5)).await;
        let id = controller.snapshot().items[0].id.clone();
        controller.sell(&id, 4).await;
    }

    let store = LocalStore::open(&path).unwrap();
    let items = store.list_items().await.unwrap();
    assert_eq!(items[0].quantity, 6);

    let activities = store.list_activities().await.unwrap();
    assert_eq!(activities[0].action.as_deref(), Some("sold"));
    assert_eq!(
        activities[0].details.as_deref(),
        Some("Sold 4 capsules of Amoxicillin 250mg")
    );

    let points = store.sales_over_time(SalesMetric::Quantity).await.unwrap();
    assert_eq!(points[0].sales, 4.0);
}

#[tokio::test]
async fn test_search_drives_stock_adjustment() {
    let store = Arc::new(LocalStore::in_memory().unwrap());
    store.seed_sample_inventory().unwrap();
    let mut controller = InventoryController::new(store, ExpiryPolicy::default());
    controller.refresh().await.unwrap();

    let mut search = SearchController::new();
    search.open();
    search.set_query("band");
    let hit = search.results(&controller.snapshot().items)[0].clone();
    assert_eq!(hit.name, "Bandages");

    search.select(&hit, StockAction::Restock);
    let adjustment = search.submit("25").unwrap();
    let notice = controller
        .adjust(&adjustment.item_id, adjustment.action, adjustment.quantity)
        .await;
    assert!(!notice.is_error());

    let bandages = controller
        .snapshot()
        .items
        .iter()
        .find(|item| item.name == "Bandages")
        .unwrap();
    assert_eq!(bandages.quantity, 225);

    let dashboard = controller.dashboard(Utc::now());
    assert_eq!(dashboard.recent_activity[0].kind, ActivityKind::Restocked);
}

#[test]
fn test_session_and_alert_log_share_state_file() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("medtrack.db")).unwrap();

    let mut session = Session::restore(&db).unwrap();
    session
        .login(
            &db,
            User {
                id: None,
                email: "pharmacist@example.com".into(),
                name: String::new(),
                picture: None,
            },
        )
        .unwrap();

    let today = Utc::now().date_naive();
    let mut log = NotificationLog::load(&db).unwrap();
    let recipients = vec![session.email().unwrap().to_string()];
    assert_eq!(log.due(&recipients, today).len(), 1);
    log.record(&recipients[0], today);
    log.save(&db).unwrap();

    assert!(NotificationLog::load(&db).unwrap().due(&recipients, today).is_empty());
    assert_eq!(
        Session::restore(&db).unwrap().user().unwrap().display_name(),
        "pharmacist@example.com"
    );
}

#[test]
fn test_seeded_inventory_digest() {
    let db = Database::open_in_memory().unwrap();
    db.seed_sample_inventory().unwrap();
    let items = db.load_items().unwrap();

    // Amoxicillin (stocked 2024-06-10, 180 days) expires 2024-12-07.
    let later = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 12, 1, 0, 0, 0).unwrap();
    let digest = AlertDigest::build(&items, later).unwrap();
    assert_eq!(digest.expiring, vec!["Amoxicillin 250mg (expires in 6 days)"]);
    assert!(digest.low_stock.is_empty());
}

#[tokio::test]
async fn test_huge_use_period_keeps_dashboard_usable() {
    let store = Arc::new(LocalStore::in_memory().unwrap());
    let mut controller = InventoryController::new(store, ExpiryPolicy::default());

    let mut long_lived = draft("Sodium Chloride", 50, 5);
    long_lived.use_period = 100_000_000;
    assert!(!controller.create(&long_lived).await.is_error());

    let dashboard = controller.dashboard(Utc::now());
    assert_eq!(dashboard.summary.total, 1);
    assert!(dashboard.expiring.is_empty());
    assert!(AlertDigest::build(&controller.snapshot().items, Utc::now()).is_none());
}
