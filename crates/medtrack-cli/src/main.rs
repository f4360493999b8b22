//! `medtrack`: terminal front end for the pharmacy inventory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use medtrack_core::config::{load_config, load_config_from};
use medtrack_core::dashboard::Dashboard;
use medtrack_core::models::{InventoryItem, ItemDraft, SalesMetric, StockAction, Unit};
use medtrack_core::session::authorization_code;
use medtrack_core::{
    filter_table, AlertDigest, AppConfig, Database, GoogleOAuth, HttpStore, InventoryController,
    InventoryStore, LocalStore, Notice, NotificationLog, SearchController, Session, StoreError,
    StoreKind,
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "medtrack",
    about = "Track pharmacy stock, expiry dates and sales",
    version
)]
struct Cli {
    /// Output JSON instead of text
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    json: bool,

    /// Configuration file (extension optional)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the dashboard cards
    Dashboard,
    /// List inventory items
    List {
        /// Only rows whose name or description contains this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// Add an inventory item
    Add(ItemArgs),
    /// Edit an inventory item; omitted fields keep their current value
    Edit {
        id: String,
        #[command(flatten)]
        changes: EditArgs,
    },
    /// Delete an inventory item
    Delete { id: String },
    /// Record a sale
    Sell { id: String, quantity: u32 },
    /// Add stock to an item
    Restock { id: String, quantity: u32 },
    /// Search items by name, optionally selling or restocking the single match
    Find {
        query: String,
        /// Quantity to sell from the matched item
        #[arg(long, conflicts_with = "restock")]
        sell: Option<String>,
        /// Quantity to add to the matched item
        #[arg(long)]
        restock: Option<String>,
    },
    /// Sales over time and top sellers
    Reports {
        #[arg(long, default_value_t = SalesMetric::Quantity)]
        by: SalesMetric,
    },
    /// Print the Google sign-in URL
    LoginUrl {
        /// Opaque state echoed back on the callback
        #[arg(long)]
        state: Option<String>,
    },
    /// Finish sign-in with the URL the browser was redirected to
    Login { callback_url: String },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Print today's expiry and low-stock digest for each recipient not yet notified
    Notify,
    /// Replace the local inventory with sample data
    Seed,
}

#[derive(Args)]
struct ItemArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: String,
    #[arg(long)]
    quantity: u32,
    #[arg(long)]
    unit: Unit,
    #[arg(long)]
    price: f64,
    /// Shelf life in days from stocking
    #[arg(long)]
    use_period: u32,
    #[arg(long)]
    reorder_level: u32,
}

impl From<ItemArgs> for ItemDraft {
    fn from(args: ItemArgs) -> Self {
        Self {
            name: args.name,
            description: args.description,
            quantity: args.quantity,
            unit: args.unit,
            price: args.price,
            use_period: args.use_period,
            reorder_level: args.reorder_level,
        }
    }
}

#[derive(Args, Default)]
struct EditArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    quantity: Option<u32>,
    #[arg(long)]
    unit: Option<Unit>,
    #[arg(long)]
    price: Option<f64>,
    #[arg(long)]
    use_period: Option<u32>,
    #[arg(long)]
    reorder_level: Option<u32>,
}

impl EditArgs {
    fn apply(self, item: &InventoryItem) -> ItemDraft {
        let current = ItemDraft::from(item);
        ItemDraft {
            name: self.name.unwrap_or(current.name),
            description: self.description.unwrap_or(current.description),
            quantity: self.quantity.unwrap_or(current.quantity),
            unit: self.unit.unwrap_or(current.unit),
            price: self.price.unwrap_or(current.price),
            use_period: self.use_period.unwrap_or(current.use_period),
            reorder_level: self.reorder_level.unwrap_or(current.reorder_level),
        }
    }
}

struct CliContext {
    config: AppConfig,
    state: Database,
    session: Session,
    controller: InventoryController,
    local: Option<Arc<LocalStore>>,
    remote: Option<HttpStore>,
}

impl CliContext {
    fn initialize(config_path: Option<&PathBuf>) -> Result<Self> {
        let config = match config_path {
            Some(path) => load_config_from(path),
            None => load_config(),
        }
        .context("failed to load MedTrack configuration")?;

        init_tracing(&config.log_level, config.log_json);

        let state = Database::open(&config.state_path).with_context(|| {
            format!("failed to open state file {}", config.state_path.display())
        })?;
        let session = Session::restore(&state).context("failed to restore session")?;

        let mut local = None;
        let mut remote = None;
        let store: Arc<dyn InventoryStore> = match config.store {
            StoreKind::Local => {
                let store = Arc::new(
                    LocalStore::open(&config.state_path).context("failed to open local store")?,
                );
                local = Some(store.clone());
                store
            }
            StoreKind::Remote => {
                let email = session
                    .email()
                    .map(String::from)
                    .or_else(|| config.user_email.clone());
                let store = HttpStore::new(&config.api_base_url, email, config.request_timeout())
                    .context("failed to configure inventory API client")?;
                remote = Some(store.clone());
                Arc::new(store)
            }
        };

        tracing::debug!(store = ?config.store, "cli context ready");

        Ok(Self {
            controller: InventoryController::new(store, config.expiry_policy),
            config,
            state,
            session,
            local,
            remote,
        })
    }

    async fn load(&mut self) -> Result<()> {
        load_inventory(&mut self.controller).await
    }

    fn find_item(&self, id: &str) -> Result<&InventoryItem> {
        self.controller
            .snapshot()
            .items
            .iter()
            .find(|item| item.id == id)
            .ok_or_else(|| anyhow!("No inventory item with id '{}'", id))
    }

    fn recipients(&self) -> Vec<String> {
        self.session
            .email()
            .map(String::from)
            .or_else(|| self.config.user_email.clone())
            .into_iter()
            .collect()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut ctx = CliContext::initialize(cli.config.as_ref())?;
    let json = cli.json;

    match cli.command {
        Commands::Dashboard => {
            ctx.load().await?;
            let dashboard = ctx.controller.dashboard(Utc::now());
            if json {
                print_json(&dashboard)?;
            } else {
                print!("{}", render_dashboard(&dashboard));
            }
        }
        Commands::List { filter } => {
            ctx.load().await?;
            let items = filter_table(
                &ctx.controller.snapshot().items,
                filter.as_deref().unwrap_or(""),
            );
            if json {
                print_json(&items)?;
            } else if items.is_empty() {
                println!("No items found");
            } else {
                let now = Utc::now();
                for item in items {
                    println!("{}", item_row(item, now));
                }
            }
        }
        Commands::Add(args) => {
            let notice = ctx.controller.create(&args.into()).await;
            report(&notice, json)?;
        }
        Commands::Edit { id, changes } => {
            ctx.load().await?;
            let draft = changes.apply(ctx.find_item(&id)?);
            let notice = ctx.controller.update(&id, &draft).await;
            report(&notice, json)?;
        }
        Commands::Delete { id } => {
            ctx.load().await?;
            let notice = ctx.controller.delete(&id).await;
            report(&notice, json)?;
        }
        Commands::Sell { id, quantity } => {
            let notice =
                stock_command(&mut ctx.controller, &id, StockAction::Sell, quantity).await?;
            report(&notice, json)?;
        }
        Commands::Restock { id, quantity } => {
            let notice =
                stock_command(&mut ctx.controller, &id, StockAction::Restock, quantity).await?;
            report(&notice, json)?;
        }
        Commands::Find {
            query,
            sell,
            restock,
        } => {
            ctx.load().await?;
            let mut search = SearchController::new();
            search.open();
            search.set_query(query.as_str());
            let hits: Vec<InventoryItem> = search
                .results(&ctx.controller.snapshot().items)
                .into_iter()
                .cloned()
                .collect();

            let requested = match (sell, restock) {
                (Some(text), _) => Some((StockAction::Sell, text)),
                (None, Some(text)) => Some((StockAction::Restock, text)),
                (None, None) => None,
            };

            let Some((action, quantity_text)) = requested else {
                if json {
                    print_json(&hits)?;
                } else if hits.is_empty() {
                    println!("No items match '{}'", query);
                } else {
                    let now = Utc::now();
                    for item in &hits {
                        println!("{}", item_row(item, now));
                    }
                }
                return Ok(());
            };

            let [item] = hits.as_slice() else {
                bail!("'{}' matches {} items; narrow the search", query, hits.len());
            };
            search.select(item, action);
            let adjustment = search
                .submit(&quantity_text)
                .ok_or_else(|| anyhow!("Quantity must be a positive whole number"))?;
            let notice = ctx
                .controller
                .adjust(&adjustment.item_id, adjustment.action, adjustment.quantity)
                .await;
            report(&notice, json)?;
        }
        Commands::Reports { by } => {
            let store = ctx.controller.store().clone();
            let (points, top) = tokio::try_join!(store.sales_over_time(by), store.top_selling())
                .map_err(|err: StoreError| {
                    anyhow!("Failed to load reports: {}", err.user_message())
                })?;
            if json {
                print_json(&json!({ "sales_over_time": points, "top_selling": top }))?;
            } else {
                println!("Sales over time (by {})", by);
                for point in &points {
                    println!("  {}  {:.2}", point.date, point.sales);
                }
                println!();
                println!("Top selling");
                for seller in &top {
                    match seller.revenue {
                        Some(revenue) => {
                            println!("  {}  {} sold  ${:.2}", seller.name, seller.sold, revenue)
                        }
                        None => println!("  {}  {} sold", seller.name, seller.sold),
                    }
                }
            }
        }
        Commands::LoginUrl { state } => {
            if ctx.config.google_client_id.trim().is_empty() {
                bail!("google_client_id is not configured");
            }
            let state = state.unwrap_or_else(|| Uuid::new_v4().to_string());
            let url = GoogleOAuth::new(
                ctx.config.google_client_id.as_str(),
                ctx.config.google_redirect_uri.as_str(),
            )
            .authorization_url(&state)
            .context("failed to build the sign-in URL")?;
            if json {
                print_json(&json!({ "url": url.as_str(), "state": state }))?;
            } else {
                println!("{}", url);
            }
        }
        Commands::Login { callback_url } => {
            let code = authorization_code(&callback_url)?;
            let remote = ctx
                .remote
                .as_ref()
                .ok_or_else(|| anyhow!("Sign-in requires store = \"remote\""))?;
            let user = remote
                .exchange_code(&code)
                .await
                .map_err(|err| anyhow!("Sign-in failed: {}", err.user_message()))?;
            ctx.session
                .login(&ctx.state, user.clone())
                .context("failed to save session")?;
            if json {
                print_json(&user)?;
            } else {
                println!("Signed in as {} <{}>", user.display_name(), user.email);
            }
        }
        Commands::Logout => {
            ctx.session
                .logout(&ctx.state)
                .context("failed to clear session")?;
            if !json {
                println!("Signed out");
            }
        }
        Commands::Whoami => match ctx.session.user() {
            Some(user) if json => print_json(user)?,
            Some(user) => println!("{} <{}>", user.display_name(), user.email),
            None if json => print_json(&serde_json::Value::Null)?,
            None => println!("Not signed in"),
        },
        Commands::Notify => {
            ctx.load().await?;
            let now = Utc::now();
            let Some(digest) = AlertDigest::build(&ctx.controller.snapshot().items, now) else {
                if !json {
                    println!("Nothing to report");
                }
                return Ok(());
            };

            let recipients = ctx.recipients();
            if recipients.is_empty() {
                bail!("No recipient: sign in or set user_email");
            }

            let today = now.date_naive();
            let mut log = NotificationLog::load(&ctx.state).context("failed to load alert log")?;
            let due: Vec<String> = log
                .due(&recipients, today)
                .into_iter()
                .map(String::from)
                .collect();

            if json {
                print_json(&json!({ "recipients": due, "digest": digest }))?;
            } else if due.is_empty() {
                println!("Already notified today");
            }
            for email in &due {
                if !json {
                    println!("To: {}\nSubject: {}\n\n{}\n", email, digest.subject, digest.body());
                }
                log.record(email, today);
            }
            log.save(&ctx.state).context("failed to save alert log")?;
            tracing::info!(recipients = due.len(), "alert digest issued");
        }
        Commands::Seed => {
            let local = ctx
                .local
                .as_ref()
                .ok_or_else(|| anyhow!("Sample data can only be loaded into the local store"))?;
            let count = local
                .seed_sample_inventory()
                .map_err(|err| anyhow!("Failed to seed inventory: {}", err.user_message()))?;
            if json {
                print_json(&json!({ "seeded": count }))?;
            } else {
                println!("Seeded {} sample items", count);
            }
        }
    }

    Ok(())
}

async fn load_inventory(controller: &mut InventoryController) -> Result<()> {
    controller
        .refresh()
        .await
        .map_err(|err| anyhow!("Failed to load inventory: {}", err.user_message()))
}

/// Sell or restock against a loaded snapshot so the notice names the item.
async fn stock_command(
    controller: &mut InventoryController,
    id: &str,
    action: StockAction,
    quantity: u32,
) -> Result<Notice> {
    load_inventory(controller).await?;
    Ok(controller.adjust(id, action, quantity).await)
}

fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("medtrack_core={0},medtrack={0}", level)));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(err) = result {
        eprintln!("failed to install tracing subscriber: {}", err);
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a mutation outcome; an error notice fails the command.
fn report(notice: &Notice, json: bool) -> Result<()> {
    if json {
        print_json(notice)?;
    }
    if notice.is_error() {
        bail!("{}: {}", notice.title, notice.message);
    }
    if !json {
        println!("{}: {}", notice.title, notice.message);
    }
    Ok(())
}

fn item_row(item: &InventoryItem, now: DateTime<Utc>) -> String {
    let mut flags = Vec::new();
    if item.is_low_stock() {
        flags.push("low stock");
    }
    if item.is_expiring_soon(now) {
        flags.push("expiring soon");
    }
    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!("  [{}]", flags.join(", "))
    };

    format!(
        "{}  {}  {} {}  ${:.2}  expires {}{}",
        item.id,
        item.name,
        item.quantity,
        item.unit,
        item.price,
        item.expiry_date().format("%Y-%m-%d"),
        flags
    )
}

fn render_dashboard(dashboard: &Dashboard) -> String {
    let summary = &dashboard.summary;
    let mut out = String::new();

    out.push_str("Stock summary\n");
    out.push_str(&format!("  Total items:    {}\n", summary.total));
    out.push_str(&format!(
        "  Low stock:      {} ({:.1}%)\n",
        summary.low_stock_count, summary.low_stock_percent
    ));
    out.push_str(&format!(
        "  Expiring soon:  {} ({:.1}%)\n",
        summary.expiring_soon_count, summary.expiring_percent
    ));

    out.push_str("\nRecent activity\n");
    if dashboard.recent_activity.is_empty() {
        out.push_str("  (none)\n");
    }
    for activity in &dashboard.recent_activity {
        if activity.time.is_empty() {
            out.push_str(&format!("  [{}] {}\n", activity.kind, activity.description));
        } else {
            out.push_str(&format!(
                "  [{}] {}  ({})\n",
                activity.kind, activity.description, activity.time
            ));
        }
    }

    out.push_str("\nExpiring soon\n");
    if dashboard.expiring.is_empty() {
        out.push_str("  (none)\n");
    }
    for drug in &dashboard.expiring {
        out.push_str(&format!(
            "  {}  {}  {} days left\n",
            drug.name, drug.expiry, drug.days_left
        ));
    }

    out.push_str("\nLow stock\n");
    if dashboard.low_stock.is_empty() {
        out.push_str("  (none)\n");
    }
    for drug in &dashboard.low_stock {
        out.push_str(&format!(
            "  {}  {} left (reorder at {})\n",
            drug.name, drug.left, drug.threshold
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use clap::CommandFactory;
    use medtrack_core::{ExpiryPolicy, Snapshot};

    #[tokio::test]
    async fn test_stock_command_names_the_item() {
        let store = Arc::new(LocalStore::in_memory().unwrap());
        let mut seeding = InventoryController::new(store.clone(), ExpiryPolicy::default());
        seeding.create(&ItemDraft::from(&item(10))).await;
        let id = seeding.snapshot().items[0].id.clone();

        let mut controller = InventoryController::new(store, ExpiryPolicy::default());
        let notice = stock_command(&mut controller, &id, StockAction::Sell, 4)
            .await
            .unwrap();
        assert!(!notice.is_error());
        assert_eq!(notice.message, "Sold 4 of Amoxicillin 250mg");
        assert_eq!(controller.snapshot().items[0].quantity, 6);
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sell() {
        let cli = Cli::try_parse_from(["medtrack", "sell", "abc", "5", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Sell { ref id, quantity: 5 } if id == "abc"
        ));
    }

    #[test]
    fn test_parse_add_rejects_unknown_unit() {
        let args = [
            "medtrack",
            "add",
            "--name",
            "Saline",
            "--description",
            "Nasal spray",
            "--quantity",
            "10",
            "--unit",
            "sprays",
            "--price",
            "3.5",
            "--use-period",
            "90",
            "--reorder-level",
            "2",
        ];
        assert!(Cli::try_parse_from(args).is_err());

        let mut valid = args;
        valid[9] = "Bottles";
        let cli = Cli::try_parse_from(valid).unwrap();
        let Commands::Add(item) = cli.command else {
            panic!("expected add");
        };
        let draft = ItemDraft::from(item);
        assert_eq!(draft.unit, Unit::Bottles);
        assert_eq!(draft.use_period, 90);
    }

    #[test]
    fn test_find_flags_conflict() {
        assert!(
            Cli::try_parse_from(["medtrack", "find", "amox", "--sell", "1", "--restock", "2"])
                .is_err()
        );
    }

    #[test]
    fn test_reports_metric_default() {
        let cli = Cli::try_parse_from(["medtrack", "reports"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Reports {
                by: SalesMetric::Quantity
            }
        ));
        let cli = Cli::try_parse_from(["medtrack", "reports", "--by", "revenue"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Reports {
                by: SalesMetric::Revenue
            }
        ));
    }

    fn item(quantity: u32) -> InventoryItem {
        let stocked = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        InventoryItem {
            id: "amox".into(),
            name: "Amoxicillin 250mg".into(),
            description: "Antibiotic capsules".into(),
            quantity,
            unit: Unit::Capsules,
            price: 8.99,
            use_period: 10,
            reorder_level: 20,
            created_at: stocked,
            updated_at: stocked,
        }
    }

    #[test]
    fn test_edit_keeps_omitted_fields() {
        let changes = EditArgs {
            quantity: Some(50),
            ..EditArgs::default()
        };
        let draft = changes.apply(&item(10));
        assert_eq!(draft.quantity, 50);
        assert_eq!(draft.name, "Amoxicillin 250mg");
        assert_eq!(draft.unit, Unit::Capsules);
    }

    #[test]
    fn test_item_row_flags() {
        let now = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        assert_eq!(
            item_row(&item(10), now),
            "amox  Amoxicillin 250mg  10 capsules  $8.99  expires 2024-01-11  [low stock, expiring soon]"
        );
        assert!(!item_row(&item(500), now).contains("low stock"));
    }

    #[test]
    fn test_render_empty_dashboard() {
        let now = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        let dashboard = Dashboard::compose(&Snapshot::default(), now, ExpiryPolicy::default());
        let text = render_dashboard(&dashboard);
        assert!(text.contains("Total items:    0"));
        assert!(text.contains("Low stock:      0 (0.0%)"));
        assert_eq!(text.matches("(none)").count(), 3);
    }
}
