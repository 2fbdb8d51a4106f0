use cashflow_application::{
    Ledger,
    commands::{CreateCategory, CreateExpense, CreateIncome, MovementInput, UpdateExpense},
    config::AppConfig,
    queries::{GetBalance, GetExpensesByCategory, GetPaginatedMovements},
    telemetry,
};
use chrono::{TimeZone, Utc};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 可选
    let _ = dotenvy::dotenv();

    let config = AppConfig::load()?;
    telemetry::init(&config.log)?;

    let ledger = Ledger::from_config(&config).await?;
    let ctx = ledger.context();

    let food = ledger
        .dispatch(&ctx, CreateCategory::new("Food"))
        .await?;
    let rent = ledger
        .dispatch(&ctx, CreateCategory::new("Rent"))
        .await?;

    let groceries = ledger
        .dispatch(
            &ctx,
            CreateExpense::new(MovementInput::parse(
                &food,
                "50000",
                Some("groceries"),
                "2025-07-01",
            )?),
        )
        .await?;
    ledger
        .dispatch(
            &ctx,
            UpdateExpense::new(
                &groceries,
                MovementInput::parse(&food, "75000", Some("groceries"), "2025-07-01")?,
            ),
        )
        .await?;
    ledger
        .dispatch(
            &ctx,
            CreateExpense::new(MovementInput::parse(&rent, "900000", None, "2025-07-05T09:00:00Z")?),
        )
        .await?;
    ledger
        .dispatch(
            &ctx,
            CreateIncome::new(MovementInput::parse("", "2500000", Some("salary"), "2025-07-25 18:00:00")?),
        )
        .await?;

    let july = GetBalance {
        start: Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).single().unwrap_or_default(),
        end: Utc.with_ymd_and_hms(2025, 7, 31, 23, 59, 59).single().unwrap_or_default(),
    };
    let balance = ledger.query(&ctx, july.clone()).await?;
    let replayed = ledger.replay_query(&ctx, july).await?;
    tracing::info!(consistent = balance == replayed, "balance checked against replay");

    println!("period:  {}", balance.period);
    println!("income:  {:.2}", balance.total_income);
    println!("expense: {:.2}", balance.total_expense);
    println!("net:     {:.2}", balance.net_balance);

    for group in ledger.query(&ctx, GetExpensesByCategory::default()).await? {
        println!(
            "  {:<16} {:>12.2} ({} items)",
            group.category_name, group.total, group.count
        );
    }

    let page = ledger
        .query(
            &ctx,
            GetPaginatedMovements {
                limit: 2,
                ..Default::default()
            },
        )
        .await?;
    println!(
        "page {} of {} movements (has_next={})",
        page.page, page.total, page.has_next
    );

    Ok(())
}
