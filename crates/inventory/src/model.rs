//! Full catalog record, as stored in the `motocicletas` table.

use motoasesor_core::InventoryRow;
use serde::{Deserialize, Serialize};

/// One motorcycle listing with every column of the table.
///
/// The relay only sees the [`InventoryRow`] projection; colour, year,
/// condition and origin are kept for the people maintaining the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motorcycle {
    pub brand: String,
    pub model: String,
    pub displacement_cc: i32,
    pub color: Option<String>,
    pub year: Option<i32>,
    pub price: f64,
    pub category: String,
    pub stock: i32,
    /// "Nueva", "Usada", ...
    pub condition: Option<String>,
    pub origin_country: Option<String>,
}

impl Motorcycle {
    /// Project onto the columns the relay reads, under the given identifier.
    pub fn to_row(&self, id: i64) -> InventoryRow {
        InventoryRow {
            id,
            brand: self.brand.clone(),
            model: self.model.clone(),
            displacement_cc: self.displacement_cc,
            price: self.price,
            category: self.category.clone(),
            stock: self.stock,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn listing(
    brand: &str,
    model: &str,
    cc: i32,
    color: &str,
    year: i32,
    price: f64,
    category: &str,
    stock: i32,
    origin: &str,
) -> Motorcycle {
    Motorcycle {
        brand: brand.into(),
        model: model.into(),
        displacement_cc: cc,
        color: Some(color.into()),
        year: Some(year),
        price,
        category: category.into(),
        stock,
        condition: Some("Nueva".into()),
        origin_country: Some(origin.into()),
    }
}

/// A small sample catalog used by `onboard --seed`.
pub fn demo_catalog() -> Vec<Motorcycle> {
    vec![
        listing("Honda", "CB500F", 471, "Rojo", 2024, 6899.0, "Naked", 3, "Japón"),
        listing("Yamaha", "MT-07", 689, "Azul", 2024, 8999.0, "Naked", 2, "Japón"),
        listing("Kawasaki", "Ninja 400", 399, "Verde", 2023, 5899.0, "Deportiva", 4, "Japón"),
        listing("Suzuki", "V-Strom 650", 645, "Gris", 2023, 9499.0, "Trail", 1, "Japón"),
        listing("Vespa", "Primavera 125", 125, "Blanco", 2024, 4299.0, "Scooter", 5, "Italia"),
        listing("Ducati", "Panigale V2", 955, "Rojo", 2023, 17990.0, "Deportiva", 0, "Italia"),
    ]
}
