//! # Seed Data Generator
//!
//! Populates a database with a furniture catalog, commission rates and
//! roughly four months of sales, so every report has something to show.
//!
//! ## Usage
//! ```bash
//! cargo run -p ipe-db --bin seed
//! cargo run -p ipe-db --bin seed -- --sales 800 --db ./data/ipe.db
//! ```
//!
//! ## Generated Data
//! - Products across sofas, mesas, cadeiras, camas, armários and decoração,
//!   a few without cost or category so batch repricing has skips to report
//! - Commission rates for pix, débito, crédito, crediário and boleto
//! - Sales spread over the last 120 days; some products only sell early in
//!   the window and some never sell, so the stale report is not empty

use chrono::{Duration, Utc};
use std::env;
use ipe_core::pricing::MarkupConfig;
use ipe_core::{Money, NewSale, NewSaleItem, Percent, Product, DEFAULT_TENANT_ID};
use ipe_db::{Database, DbConfig};
use uuid::Uuid;

/// (category, SKU prefix, products, cost range in reais)
const CATALOG: &[(&str, &str, &[&str], (i64, i64))] = &[
    (
        "sofas",
        "SOF",
        &[
            "Sofá 2 lugares Linho",
            "Sofá 3 lugares Retrátil",
            "Sofá de Canto Veludo",
            "Poltrona Costela",
            "Chaise Longue",
        ],
        (900, 3500),
    ),
    (
        "mesas",
        "MES",
        &[
            "Mesa de Jantar Freijó 6 lugares",
            "Mesa de Centro Travertino",
            "Mesa Lateral Laca",
            "Aparador Ripado",
        ],
        (350, 2800),
    ),
    (
        "cadeiras",
        "CAD",
        &[
            "Cadeira Eames",
            "Cadeira de Palha Natural",
            "Banqueta Alta Jatobá",
            "Cadeira de Escritório Ergonômica",
        ],
        (120, 900),
    ),
    (
        "camas",
        "CAM",
        &[
            "Cama Box Casal",
            "Cama Queen Cabeceira Estofada",
            "Beliche Pinus",
            "Colchão Molas Ensacadas",
        ],
        (700, 4200),
    ),
    (
        "armarios",
        "ARM",
        &["Guarda-roupa 6 portas", "Cômoda 5 gavetas", "Estante Modular", "Rack para TV"],
        (400, 3000),
    ),
    (
        "decoracao",
        "DEC",
        &["Tapete Sisal 2x3", "Luminária de Piso", "Espelho Orgânico", "Vaso Cerâmica"],
        (60, 600),
    ),
];

/// Rates in basis points.
const COMMISSION_RATES: &[(&str, u32)] = &[
    ("pix", 300),
    ("debito", 250),
    ("credito", 200),
    ("crediario", 400),
    ("boleto", 150),
];

const STORES: &[&str] = &["loja-centro", "loja-shopping", "loja-outlet"];
const SALESPEOPLE: &[&str] = &["ana", "bruno", "carla", "diego"];

const HISTORY_DAYS: i64 = 120;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut sales_count: usize = 400;
    let mut db_path = String::from("./ipe_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sales_count = args[i + 1].parse().unwrap_or(400);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Ipê Back Office Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --sales <N>    Number of sales to generate (default: 400)");
                println!("  -d, --db <PATH>    Database file path (default: ./ipe_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Ipê Back Office Seed Data Generator");
    println!("======================================");
    println!("Database: {}", db_path);
    println!("Sales:    {}", sales_count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Commission rates
    for (method, bps) in COMMISSION_RATES {
        db.commissions().set_rate(method, Percent::from_bps(*bps)).await?;
    }
    println!("✓ {} commission rates", COMMISSION_RATES.len());

    // Catalog
    let markup = MarkupConfig::default().with_tax_estimate(Percent::from_bps(1800));
    let mut products = Vec::new();
    let mut seed = 0usize;
    for (category, prefix, names, cost_range) in CATALOG {
        for name in names.iter() {
            let product = generate_product(category, prefix, name, *cost_range, seed, &markup);
            if let Err(e) = db.products().insert(&product).await {
                eprintln!("Failed to insert {}: {}", product.sku, e);
                continue;
            }
            products.push(product);
            seed += 1;
        }
    }
    println!("✓ {} products", products.len());

    // Sales
    println!();
    println!("Generating sales...");
    let start = std::time::Instant::now();
    let now = Utc::now();
    let mut recorded = 0;

    for n in 0..sales_count {
        let days_ago = HISTORY_DAYS - 1 - (n as i64 * HISTORY_DAYS / sales_count.max(1) as i64);
        let product = &products[(n * 7 + n / 3) % products.len()];

        // Every seventh product never sells; every fifth stops selling early
        if seed_of(product) % 7 == 0 || (seed_of(product) % 5 == 0 && days_ago < 100) {
            continue;
        }

        let quantity = 1 + (n % 3) as i64;
        let unit = product.price_cents.max(10_000);
        let total = unit * quantity;
        let method = COMMISSION_RATES[n % COMMISSION_RATES.len()].0;
        // Crediário leaves a balance; everything else is paid in full
        let paid = if method == "crediario" { total / 4 } else { total };

        let sale = NewSale {
            store_id: STORES[n % STORES.len()].to_string(),
            salesperson_id: Some(SALESPEOPLE[(n / 2) % SALESPEOPLE.len()].to_string()),
            payment_method: method.to_string(),
            items: vec![NewSaleItem {
                product_id: product.id.clone(),
                name: product.name.clone(),
                quantity,
                unit_price_cents: unit,
            }],
            amount_paid_cents: paid,
            sold_at: Some(now - Duration::days(days_ago) - Duration::minutes((n % 480) as i64)),
        };

        match db.sales().record_sale(&sale, now).await {
            Ok((recorded_sale, _)) => {
                recorded += 1;
                if n % 23 == 0 {
                    db.sales().cancel_sale(&recorded_sale.id).await?;
                }
            }
            Err(e) => eprintln!("Failed to record sale {}: {}", n, e),
        }

        if recorded > 0 && recorded % 100 == 0 {
            println!("  Recorded {} sales...", recorded);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Recorded {} sales in {:?}", recorded, elapsed);
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Numeric suffix of the generated SKU.
fn seed_of(product: &Product) -> usize {
    product
        .sku
        .rsplit('-')
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

/// Builds one catalog item. Stock is generous so sales never run dry.
fn generate_product(
    category: &str,
    prefix: &str,
    name: &str,
    (min_cost, max_cost): (i64, i64),
    seed: usize,
    markup: &MarkupConfig,
) -> Product {
    let now = Utc::now();

    let cost_reais = min_cost + ((seed as i64 * 137) % (max_cost - min_cost + 1));
    let cost = Money::from_reais(cost_reais, 0);

    // A handful of imports without invoice or category
    let cost_cents = if seed % 11 == 10 { None } else { Some(cost.cents()) };
    let category = if seed % 13 == 12 { None } else { Some(category.to_string()) };

    let price = match (&category, cost_cents) {
        (Some(c), Some(_)) => markup.price_for(c, cost),
        _ => cost.ceil_to_real(),
    };

    Product {
        id: Uuid::new_v4().to_string(),
        tenant_id: DEFAULT_TENANT_ID.to_string(),
        sku: format!("{}-{:03}", prefix, seed),
        name: name.to_string(),
        category,
        cost_cents,
        price_cents: price.cents(),
        stock_quantity: 200 + (seed % 40) as i64,
        is_active: true,
        in_showroom: seed % 4 == 0,
        showroom_location: (seed % 4 == 0).then(|| "Loja Centro - Salão principal".to_string()),
        created_at: now,
        updated_at: now,
    }
}
