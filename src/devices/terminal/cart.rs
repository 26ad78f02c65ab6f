//! In-memory shopping cart, keyed by product id.
use crate::{config::CART_CAPACITY, devices::catalog::ProductRecord};
use heapless::Vec;

#[derive(Clone, Debug, PartialEq)]
pub struct CartLine {
    pub record: ProductRecord,
    pub quantity: u32,
}

impl CartLine {
    pub fn subtotal(&self) -> f32 { self.record.price * self.quantity as f32 }
}

/// A new id arrived with every line taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CartFull;

#[derive(Debug, Default)]
pub struct Cart {
    lines: Vec<CartLine, CART_CAPACITY>,
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    /// Adds one unit of a product. A product already in the cart has its
    /// quantity bumped, so it never takes a second line.
    pub fn add(&mut self, record: ProductRecord) -> Result<&CartLine, CartFull> {
        let position = match self.lines.iter().position(|line| line.record.id == record.id) {
            Some(position) => {
                self.lines[position].quantity += 1;
                position
            }
            None => {
                self.lines.push(CartLine { record, quantity: 1 }).map_err(|_| CartFull)?;
                self.lines.len() - 1
            }
        };
        Ok(&self.lines[position])
    }

    pub fn lines(&self) -> &[CartLine] { &self.lines }

    /// Number of distinct products.
    pub fn distinct(&self) -> usize { self.lines.len() }

    pub fn total(&self) -> f32 { self.lines.iter().map(CartLine::subtotal).sum() }

    pub fn is_empty(&self) -> bool { self.lines.is_empty() }

    pub fn clear(&mut self) { self.lines.clear(); }
}
