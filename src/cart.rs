//! In-memory shopping cart

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, ValidationErrors};

/// A product as listed in the marketplace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub unit_price: Decimal,
    #[serde(default)]
    pub image_ref: String,
    #[serde(default)]
    pub seller_name: String,
}

/// One line of the cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub image_ref: String,
    pub seller_name: String,

    /// Always at least 1
    pub quantity: u32,
}

impl CartItem {
    /// Price of the whole line
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Cart lines in the order they were first added.
///
/// Holds at most one line per product id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` of a product, merging with an existing line
    pub fn add(&mut self, product: &Product, quantity: u32) -> Result<(), Error> {
        let mut errors = ValidationErrors::new();
        if product.id.trim().is_empty() {
            errors.add("id", "Product id is required");
        }
        if product.name.trim().is_empty() {
            errors.add("name", "Product name is required");
        }
        if product.unit_price.is_sign_negative() {
            errors.add("unit_price", "Price cannot be negative");
        }
        if quantity == 0 {
            errors.add("quantity", "Quantity must be at least 1");
        }
        errors.into_result()?;

        match self.items.iter_mut().find(|item| item.id == product.id) {
            Some(item) => item.quantity = item.quantity.saturating_add(quantity),
            None => self.items.push(CartItem {
                id: product.id.clone(),
                name: product.name.clone(),
                unit_price: product.unit_price,
                image_ref: product.image_ref.clone(),
                seller_name: product.seller_name.clone(),
                quantity,
            }),
        }
        Ok(())
    }

    /// Remove a line; returns whether it was present
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() < before
    }

    /// Change a line's quantity by `delta`, never going below 1
    pub fn update_quantity(&mut self, id: &str, delta: i64) {
        if let Some(item) = self.items.iter_mut().find(|item| item.id == id) {
            let next = (i64::from(item.quantity) + delta).clamp(1, i64::from(u32::MAX));
            item.quantity = next as u32;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of price times quantity over all lines
    pub fn total(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Sum of quantities, not the number of lines
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines
    pub fn len(&self) -> usize {
        self.items.len()
    }
}
