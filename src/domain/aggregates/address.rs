//! Address Aggregate

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recipient_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub is_default: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewAddress {
    pub recipient_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub is_default: bool,
}

impl Address {
    pub fn create(user_id: Uuid, new: NewAddress) -> Self {
        Self {
            id: Uuid::now_v7(), user_id, recipient_name: new.recipient_name, phone: new.phone,
            line1: new.line1, line2: new.line2, city: new.city, state: new.state,
            pincode: new.pincode, is_default: new.is_default,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool { self.user_id == user_id }
}
