use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCartItemRequest {
    pub product_id: i64,
    pub quantity: i32,
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub stock: i32,
    pub subtotal: i64,
    pub weight_grams: i32,
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartResponse {
    pub items: Vec<CartLine>,
    pub total_quantity: i64,
    pub total_amount: i64,
}

impl CartResponse {
    pub fn new(items: Vec<CartLine>) -> Self {
        let total_quantity = items.iter().map(|l| i64::from(l.quantity)).sum();
        let total_amount = items.iter().map(|l| l.subtotal).sum();
        Self {
            items,
            total_quantity,
            total_amount,
        }
    }
}
