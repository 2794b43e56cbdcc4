//! Query builder example
//!
//! This example demonstrates the fluent query surface:
//! - Listing an entity with a plain FROM query
//! - Filtering with typed conditions
//! - Deleting through the same builder
//! - What happens when the terminal does not match the builder state
//!
//! Run with: cargo run --example queries

use minorm::prelude::*;

struct Product {
    id: Option<i64>,
    name: String,
    price: f64,
    stock: i32,
}

static PRODUCT: EntityDef = EntityDef {
    name: "Product",
    table: "products",
    identity: "id",
    identity_policy: IdentityPolicy::Engine,
    fields: &[
        FieldDef {
            name: "name",
            column: "name",
            kind: FieldKind::Text,
            default: None,
        },
        FieldDef {
            name: "price",
            column: "price",
            kind: FieldKind::Double,
            default: None,
        },
        FieldDef {
            name: "stock",
            column: "stock",
            kind: FieldKind::Int,
            default: Some("0"),
        },
    ],
};

impl Persistable for Product {
    fn descriptor() -> &'static EntityDef {
        &PRODUCT
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("name".to_string(), Value::from(self.name.clone()));
        row.insert("price".to_string(), Value::Double(self.price));
        row.insert("stock".to_string(), Value::Int(self.stock));
        row
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Product {
            id: row.get("id").and_then(Value::as_long),
            name: row.get("name").map(Value::as_string).unwrap_or_default(),
            price: row.get("price").and_then(Value::as_double).unwrap_or(0.0),
            stock: row.get("stock").and_then(Value::as_int).unwrap_or(0),
        })
    }

    fn identity(&self) -> Option<i64> {
        self.id
    }

    fn set_identity(&mut self, id: i64) {
        self.id = Some(id);
    }
}

minorm::register_entity!(Product);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== minorm - Query Builder Example ===\n");

    let dir = std::env::temp_dir();
    let db_path = dir.join("minorm_queries.db");
    let config_path = dir.join("minorm_queries.toml");
    std::fs::write(
        &config_path,
        format!(
            "[database]\ndriver = \"sqlite\"\nurl = \"sqlite:{}\"\nddl = \"create\"\n",
            db_path.display()
        ),
    )?;

    println!("1. Opening store and seeding products...");
    let store = Store::open(&config_path).await?;

    let seed = vec![
        ("Keyboard", 49.90, 120),
        ("Monitor", 219.00, 35),
        ("Mouse", 19.90, 400),
        ("Dock", 129.00, 8),
    ];
    for (name, price, stock) in seed {
        let mut product = Product {
            id: None,
            name: name.to_string(),
            price,
            stock,
        };
        store.save(&mut product).await?;
    }
    println!("   ✓ Seeded 4 products\n");

    // A FROM query with no conditions returns everything
    println!("2. Listing all products...");
    let all = store.query::<Product>().from().collect().await?;
    if let Some(products) = &all {
        for product in products {
            println!(
                "   - {} (${:.2}, {} in stock)",
                product.name, product.price, product.stock
            );
        }
    }
    println!();

    // Conditions bind typed parameters named after the field
    println!("3. Products under $100...");
    let cheap = store
        .query::<Product>()
        .from()
        .where_cond(lt("price", 100.0))
        .collect()
        .await?;
    println!("   Found {}:", cheap.as_ref().map_or(0, |found| found.len()));
    if let Some(products) = cheap {
        for product in products {
            println!("   - {} (${:.2})", product.name, product.price);
        }
    }
    println!();

    // Equality works the same way
    println!("4. Looking up the dock...");
    let docks = store
        .query::<Product>()
        .from()
        .where_cond(eq("name", "Dock"))
        .collect()
        .await?;
    if let Some(products) = docks {
        for product in products {
            println!("   ✓ #{}: {} in stock", product.id.unwrap_or_default(), product.stock);
        }
    }
    println!();

    // Deletions run through the same builder with the delete marker set
    println!("5. Dropping low-stock products...");
    let gone = store
        .query::<Product>()
        .delete()
        .from()
        .where_cond(lt("stock", 10))
        .execute()
        .await?;
    println!("   ✓ Deleted {} product(s)\n", gone);

    // A mismatched terminal is rejected before anything runs
    println!("6. Collecting a deletion is a contract error...");
    match store.query::<Product>().delete().from().collect().await {
        Ok(_) => println!("   unexpected success"),
        Err(err) => println!("   ✓ Rejected: {}", err),
    }
    println!();

    println!("7. Final inventory...");
    if let Some(remaining) = store.get_all::<Product>().await {
        println!("   {} product(s) remain", remaining.len());
    }

    let _ = std::fs::remove_file(&config_path);
    let _ = std::fs::remove_file(&db_path);

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
