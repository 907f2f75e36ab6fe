use anyhow::Result;
use std::path::Path;

use songplay_core::schema::Database;

pub fn show_status(db_path: &Path) -> Result<()> {
    let db = Database::open(db_path)?;

    println!("\n📊 Songplay Status\n");
    println!("  Database: {}", db_path.display());
    for (table, count) in db.table_counts()? {
        println!("  {table:<10} {count}");
    }

    Ok(())
}
