//! # ipe-admin
//!
//! Terminal front end for the back-office commands, for batch jobs and
//! support work without the screens.
//!
//! ## Usage
//! ```bash
//! ipe-admin [--config ipe.toml] [--db ./ipe.db] <command>
//!
//! ipe-admin reprice                 # preview the "Recalcular preços" batch
//! ipe-admin reprice --apply         # write the new prices
//! ipe-admin abc --days 90           # Curva ABC of the last 90 days
//! ipe-admin stale --days 60         # encalhados, 60-day threshold
//! ipe-admin kpis --days 30
//! ipe-admin token issue discount --by carla --discount 10 --uses 2
//! ipe-admin token redeem 123456 discount --by diego --discount 5
//! ipe-admin token revoke 123456
//! ipe-admin token list
//! ipe-admin commission set pix 3
//! ipe-admin commission list
//! ```

use chrono::Utc;
use std::env;
use std::path::PathBuf;
use tracing::info;

use ipe_backoffice::commands::{pricing, reports, sales, tokens};
use ipe_backoffice::state::{AppConfig, DbState};
use ipe_core::dashboard::{DateRange, MAX_RANGE_DAYS};
use ipe_core::token::TokenScope;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const DEFAULT_REPORT_DAYS: u32 = 30;

const HELP: &str = "\
Ipê Back Office admin

Usage: ipe-admin [OPTIONS] <COMMAND>

Options:
  -c, --config <PATH>   Config file (default: IPE_CONFIG or platform config dir)
  -d, --db <PATH>       Database file, overrides the config
  -h, --help            Show this help message

Commands:
  reprice [--apply]                           Recalculate prices from category margins
  abc [--days N]                              Curva ABC over the last N days
  stale [--days N]                            Products without sales for more than N days
  kpis [--days N]                             Dashboard KPIs over the last N days
  token issue <scope> --by <who> [--to <who>] [--discount PCT] [--uses N] [--ttl MIN]
  token redeem <code> <scope> --by <who> [--discount PCT] [--ref REF]
  token revoke <code>
  token list
  commission set <method> <pct>
  commission list

Scopes: discount, cancellation, price_change, supervisor_mode";

/// Positional arguments plus `--flag value` pairs.
struct Args {
    positional: Vec<String>,
    flags: Vec<(String, Option<String>)>,
}

impl Args {
    fn parse(raw: impl Iterator<Item = String>) -> Self {
        let mut positional = Vec::new();
        let mut flags: Vec<(String, Option<String>)> = Vec::new();
        let mut raw = raw.peekable();

        while let Some(arg) = raw.next() {
            if let Some(name) = arg.strip_prefix("--").or_else(|| short_flag(&arg)) {
                // Negative numbers are values, not flags
                let takes_value = raw
                    .peek()
                    .is_some_and(|next| !next.starts_with('-') || next.parse::<f64>().is_ok());
                let value = if takes_value { raw.next() } else { None };
                flags.push((name.to_string(), value));
            } else {
                positional.push(arg);
            }
        }
        Args { positional, flags }
    }

    fn has(&self, name: &str) -> bool {
        self.flags.iter().any(|(n, _)| n == name)
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.flags
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    fn parsed<T: std::str::FromStr>(&self, name: &str) -> CliResult<Option<T>> {
        match self.value(name) {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| format!("invalid value for --{}: {}", name, raw).into()),
            None => Ok(None),
        }
    }

    fn required(&self, name: &str) -> CliResult<String> {
        self.value(name)
            .map(str::to_string)
            .ok_or_else(|| format!("--{} is required", name).into())
    }

    fn positional(&self, index: usize, what: &str) -> CliResult<&str> {
        self.positional
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| format!("missing {}", what).into())
    }
}

fn short_flag(arg: &str) -> Option<&'static str> {
    match arg {
        "-c" => Some("config"),
        "-d" => Some("db"),
        "-h" => Some("help"),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let args = Args::parse(env::args().skip(1));
    if args.has("help") || args.positional.is_empty() {
        println!("{}", HELP);
        return Ok(());
    }

    ipe_backoffice::init_tracing();

    let mut config = AppConfig::load(args.value("config").map(PathBuf::from).as_deref())?;
    if let Some(db_path) = args.value("db") {
        config.database_path = PathBuf::from(db_path);
    }
    info!(tenant_id = %config.tenant_id, "ipe-admin starting");

    let db = DbState::open(&config).await?;

    match args.positional[0].as_str() {
        "reprice" => reprice(&db, &config, &args).await,
        "abc" => abc(&db, &args).await,
        "stale" => stale(&db, &config, &args).await,
        "kpis" => kpis(&db, &args).await,
        "token" => token(&db, &config, &args).await,
        "commission" => commission(&db, &args).await,
        other => Err(format!("unknown command: {} (try --help)", other).into()),
    }
}

fn report_range(args: &Args) -> CliResult<DateRange> {
    let days = args.parsed::<u32>("days")?.unwrap_or(DEFAULT_REPORT_DAYS);
    if days == 0 || days > MAX_RANGE_DAYS {
        return Err(format!("--days must be between 1 and {}", MAX_RANGE_DAYS).into());
    }
    Ok(DateRange::last_n_days(Utc::now().date_naive(), days))
}

async fn reprice(db: &DbState, config: &AppConfig, args: &Args) -> CliResult<()> {
    if args.has("apply") {
        let outcome = pricing::apply_reprice(db, config).await?;
        println!("✓ {} prices updated", outcome.updated);
        for failure in &outcome.failed {
            println!("✗ {} ({}): {}", failure.sku, failure.product_id, failure.message);
        }
        print_skips(&outcome.report);
        return Ok(());
    }

    let report = pricing::preview_reprice(db, config).await?;
    println!("{:<16} {:>14} {:>14} {:>8}", "SKU", "ATUAL", "NOVO", "MARGEM");
    for change in &report.changes {
        println!(
            "{:<16} {:>14} {:>14} {:>7.1}%",
            change.sku,
            change.old_price.to_string(),
            change.new_price.to_string(),
            change.margin.percentage()
        );
    }
    println!();
    println!("{} to change, {} unchanged", report.changes.len(), report.unchanged);
    print_skips(&report);
    println!("Run with --apply to write the new prices.");
    Ok(())
}

fn print_skips(report: &ipe_core::pricing::RepriceReport) {
    for skipped in &report.skipped {
        println!("⚠ skipped {} ({:?})", skipped.sku, skipped.reason);
    }
}

async fn abc(db: &DbState, args: &Args) -> CliResult<()> {
    let range = report_range(args)?;
    let report = reports::abc_curve(db, range).await?;

    println!("Curva ABC {} → {}  (total {})", range.start, range.end, report.total_revenue);
    println!("{:<40} {:>14} {:>8} {:>8} {:>6}", "PRODUTO", "RECEITA", "%", "ACUM.", "CLASSE");
    for entry in &report.entries {
        println!(
            "{:<40} {:>14} {:>7.2}% {:>7.2}% {:>6?}",
            truncate(&entry.name, 40),
            entry.revenue.to_string(),
            entry.share_pct,
            entry.cumulative_pct,
            entry.class
        );
    }
    println!();
    for class in &report.summary {
        println!(
            "{:?}: {} products, {} ({:.1}%)",
            class.class, class.products, class.revenue, class.revenue_share_pct
        );
    }
    Ok(())
}

async fn stale(db: &DbState, config: &AppConfig, args: &Args) -> CliResult<()> {
    let threshold = args.parsed::<i64>("days")?;
    let report = reports::stale_inventory(db, config, Utc::now().date_naive(), threshold).await?;

    println!(
        "Encalhados em {} (mais de {} dias sem venda)",
        report.reference_date, report.threshold_days
    );
    for entry in report.stale() {
        let since = match entry.days_since_last_sale {
            Some(days) => format!("{} days", days),
            None => "never sold".to_string(),
        };
        println!(
            "{:<16} {:<40} {:>6} un  {:>14}  {}",
            entry.sku,
            truncate(&entry.name, 40),
            entry.stock_quantity,
            entry.stock_value.to_string(),
            since
        );
    }
    println!();
    println!(
        "{} stale products ({} never sold), {} at cost",
        report.stale_count, report.never_sold_count, report.stale_value
    );
    Ok(())
}

async fn kpis(db: &DbState, args: &Args) -> CliResult<()> {
    let range = report_range(args)?;
    let dashboard = reports::dashboard(db, range).await?;
    let k = &dashboard.kpis;

    println!("{} → {}", range.start, range.end);
    println!("Revenue:         {}", k.revenue);
    println!(
        "Sales:           {} ({} completed, {} pending, {} cancelled)",
        k.effective_sales, k.completed_sales, k.pending_sales, k.cancelled_sales
    );
    println!("Average ticket:  {}", k.average_ticket);
    println!("Receivables:     {}", k.receivables);
    println!("Commissions:     {}", k.commissions);
    println!();
    for store in &dashboard.stores {
        println!(
            "{:<20} {:>14} ({} sales)",
            store.store_id,
            store.revenue.to_string(),
            store.sales
        );
    }
    println!();
    for person in &dashboard.salespeople {
        println!(
            "{:<20} {:>14} commission on {}",
            person.salesperson_id,
            person.commission.to_string(),
            person.revenue
        );
    }
    Ok(())
}

async fn token(db: &DbState, config: &AppConfig, args: &Args) -> CliResult<()> {
    match args.positional(1, "token subcommand")? {
        "issue" => {
            let scope: TokenScope = args.positional(2, "scope")?.parse()?;
            let input = tokens::IssueTokenInput {
                scope,
                issued_by: args.required("by")?,
                issued_to: args.value("to").map(str::to_string),
                max_discount_pct: args.parsed("discount")?,
                max_uses: args.parsed("uses")?,
                ttl_minutes: args.parsed("ttl")?,
            };
            let token = tokens::issue_token(db, config, input).await?;
            println!("✓ Token {} ({}), expires {}", token.code, token.scope, token.expires_at);
        }
        "redeem" => {
            let input = tokens::RedeemTokenInput {
                code: args.positional(2, "code")?.to_string(),
                scope: args.positional(3, "scope")?.parse()?,
                redeemed_by: args.required("by")?,
                reference: args.value("ref").map(str::to_string),
                discount_pct: args.parsed("discount")?,
            };
            let redeemed = tokens::redeem_token(db, input).await?;
            println!(
                "✓ Redeemed {}, {} uses left",
                redeemed.token.code, redeemed.token.remaining_uses
            );
        }
        "revoke" => {
            let token = tokens::revoke_token(db, args.positional(2, "code")?).await?;
            println!("✓ Token {} is {:?}", token.code, token.status);
        }
        "list" => {
            for token in tokens::list_active_tokens(db).await? {
                println!(
                    "{}  {:<16} {} uses left, expires {}",
                    token.code,
                    token.scope.to_string(),
                    token.remaining_uses,
                    token.expires_at
                );
            }
        }
        other => return Err(format!("unknown token subcommand: {}", other).into()),
    }
    Ok(())
}

async fn commission(db: &DbState, args: &Args) -> CliResult<()> {
    match args.positional(1, "commission subcommand")? {
        "set" => {
            let method = args.positional(2, "payment method")?;
            let pct: f64 = args
                .positional(3, "rate")?
                .replace(',', ".")
                .parse()
                .map_err(|_| "rate must be a number")?;
            let rate = sales::set_commission_rate(db, method, pct).await?;
            println!("✓ {} earns {:.2}%", rate.payment_method, rate.rate_pct);
        }
        "list" => {
            for rate in sales::list_commission_rates(db).await? {
                println!("{:<16} {:>6.2}%", rate.payment_method, rate.rate_pct);
            }
        }
        other => return Err(format!("unknown commission subcommand: {}", other).into()),
    }
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Args {
        Args::parse(raw.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_report_range_bounds() {
        let range = report_range(&args(&["abc", "--days", "7"])).unwrap();
        assert_eq!(range.len_days(), 7);
        assert_eq!(report_range(&args(&["kpis"])).unwrap().len_days(), 30);

        assert!(report_range(&args(&["abc", "--days", "4000000000"])).is_err());
        assert!(report_range(&args(&["abc", "--days", "0"])).is_err());
        assert!(report_range(&args(&["abc", "--days", "-3"])).is_err());
    }

    #[test]
    fn test_negative_numbers_are_values() {
        let parsed = args(&["commission", "set", "pix", "--rate", "-1", "--apply"]);
        assert_eq!(parsed.value("rate"), Some("-1"));
        assert!(parsed.has("apply"));
        assert_eq!(parsed.positional, vec!["commission", "set", "pix"]);
    }
}
