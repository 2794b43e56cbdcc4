//! Store quickstart example
//!
//! This example demonstrates the persistence lifecycle:
//! - Declaring a persistable entity
//! - Opening a store from a configuration file
//! - Saving new entities and reading assigned identities back
//! - Updating an entity in place
//! - Listing everything stored
//!
//! Run with: cargo run --example quickstart

use minorm::prelude::*;

struct Employee {
    id: Option<i64>,
    name: String,
    age: i32,
}

static EMPLOYEE: EntityDef = EntityDef {
    name: "Employee",
    table: "employees",
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
            name: "age",
            column: "age",
            kind: FieldKind::Int,
            default: Some("18"),
        },
    ],
};

impl Persistable for Employee {
    fn descriptor() -> &'static EntityDef {
        &EMPLOYEE
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("name".to_string(), Value::from(self.name.clone()));
        row.insert("age".to_string(), Value::Int(self.age));
        row
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Employee {
            id: row.get("id").and_then(Value::as_long),
            name: row.get("name").map(Value::as_string).unwrap_or_default(),
            age: row.get("age").and_then(Value::as_int).unwrap_or(0),
        })
    }

    fn identity(&self) -> Option<i64> {
        self.id
    }

    fn set_identity(&mut self, id: i64) {
        self.id = Some(id);
    }
}

minorm::register_entity!(Employee);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== minorm - Quickstart Example ===\n");

    // Point a throwaway configuration at a temp database
    let dir = std::env::temp_dir();
    let db_path = dir.join("minorm_quickstart.db");
    let config_path = dir.join("minorm_quickstart.toml");
    std::fs::write(
        &config_path,
        format!(
            "[database]\ndriver = \"sqlite\"\nurl = \"sqlite:{}\"\nddl = \"create\"\n",
            db_path.display()
        ),
    )?;

    // Open the store; discovery picks up every registered entity
    println!("1. Opening store...");
    let store = Store::open(&config_path).await?;
    println!(
        "   ✓ Open ({} dialect, {} registered entities)\n",
        store.dialect(),
        store.entities().len()
    );

    // Save new employees; the engine assigns their identities
    println!("2. Saving employees...");
    let mut alice = Employee {
        id: None,
        name: "Alice".to_string(),
        age: 34,
    };
    let mut bob = Employee {
        id: None,
        name: "Bob".to_string(),
        age: 28,
    };
    store.save(&mut alice).await?;
    store.save(&mut bob).await?;
    println!("   ✓ Saved {} as #{}", alice.name, alice.id.unwrap_or_default());
    println!("   ✓ Saved {} as #{}\n", bob.name, bob.id.unwrap_or_default());

    // Update an entity at its current identity
    println!("3. Updating Bob's age...");
    bob.age = 29;
    store.update(&bob).await?;
    println!("   ✓ Updated\n");

    // Read everything back
    println!("4. Listing employees...");
    if let Some(everyone) = store.get_all::<Employee>().await {
        println!("   Found {} employees:", everyone.len());
        for person in &everyone {
            println!(
                "   - #{}: {} (age {})",
                person.id.unwrap_or_default(),
                person.name,
                person.age
            );
        }
    }

    // Remove the throwaway files
    let _ = std::fs::remove_file(&config_path);
    let _ = std::fs::remove_file(&db_path);

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
