use crate::model::package::default_packages;
use crate::model::{PackageType, TourPackage};
use duckdb::Connection;

/// All packages ordered by display order.
///
/// An empty collection is seeded with the default catalogue first.
pub fn list_packages(conn: &Connection) -> Result<Vec<TourPackage>, duckdb::Error> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM packages", [], |row| row.get(0))?;
    if count == 0 {
        let defaults = default_packages();
        for package in &defaults {
            insert_package(conn, package)?;
        }
        tracing::info!(count = defaults.len(), "Seeded default tour packages");
    }

    let mut stmt = conn.prepare(
        "SELECT id, title, subtitle, description, features, price, package_type, display_order
         FROM packages
         ORDER BY display_order, id",
    )?;
    let rows = stmt
        .query_map([], row_to_package)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_package(conn: &Connection, id: &str) -> Result<Option<TourPackage>, duckdb::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, title, subtitle, description, features, price, package_type, display_order
         FROM packages WHERE id = ?",
    )?;
    let mut rows = stmt.query_map(duckdb::params![id], row_to_package)?;
    rows.next().transpose()
}

/// Overwrite every editable field of an existing package.
///
/// Returns `false` when no package has this id.
pub fn update_package(conn: &Connection, package: &TourPackage) -> Result<bool, duckdb::Error> {
    let changed = conn.execute(
        "UPDATE packages
         SET title = ?, subtitle = ?, description = ?, features = ?, price = ?,
             package_type = ?, display_order = ?
         WHERE id = ?",
        duckdb::params![
            package.title,
            package.subtitle,
            package.description,
            features_json(&package.features),
            package.price,
            package.package_type.as_str(),
            package.display_order,
            package.id,
        ],
    )?;
    Ok(changed > 0)
}

fn insert_package(conn: &Connection, package: &TourPackage) -> Result<(), duckdb::Error> {
    conn.execute(
        "INSERT INTO packages (id, title, subtitle, description, features, price, package_type, display_order)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        duckdb::params![
            package.id,
            package.title,
            package.subtitle,
            package.description,
            features_json(&package.features),
            package.price,
            package.package_type.as_str(),
            package.display_order,
        ],
    )?;
    Ok(())
}

fn features_json(features: &[String]) -> String {
    serde_json::to_string(features).unwrap_or_else(|_| "[]".to_string())
}

fn row_to_package(row: &duckdb::Row<'_>) -> Result<TourPackage, duckdb::Error> {
    let features: String = row.get(4)?;
    let package_type: String = row.get(6)?;
    Ok(TourPackage {
        id: row.get(0)?,
        title: row.get(1)?,
        subtitle: row.get(2)?,
        description: row.get(3)?,
        features: serde_json::from_str(&features).unwrap_or_default(),
        price: row.get(5)?,
        package_type: PackageType::parse(&package_type).unwrap_or(PackageType::Main),
        display_order: row.get(7)?,
    })
}
