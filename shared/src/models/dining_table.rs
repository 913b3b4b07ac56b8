//! Dining Table Model

use serde::{Deserialize, Serialize};

/// Table status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    #[default]
    Free,
    Occupied,
    Reserved,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Free => "free",
            TableStatus::Occupied => "occupied",
            TableStatus::Reserved => "reserved",
        }
    }
}

/// Dining table entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: String,
    /// Table number, unique within a restaurant
    pub number: i64,
    pub capacity: i32,
    pub status: TableStatus,
    /// Order currently occupying the table
    pub current_order: Option<String>,
}

/// Update table status payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableStatusUpdate {
    pub status: TableStatus,
    #[serde(default)]
    pub current_order: Option<String>,
}

impl TableStatusUpdate {
    /// `occupied` requires an order reference, `free` forbids one.
    pub fn is_consistent(&self) -> bool {
        match self.status {
            TableStatus::Occupied => self.current_order.is_some(),
            TableStatus::Free => self.current_order.is_none(),
            TableStatus::Reserved => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_update_consistency() {
        let occupied = TableStatusUpdate {
            status: TableStatus::Occupied,
            current_order: Some("o-1".to_string()),
        };
        assert!(occupied.is_consistent());

        let occupied_without_order = TableStatusUpdate {
            status: TableStatus::Occupied,
            current_order: None,
        };
        assert!(!occupied_without_order.is_consistent());

        let free_with_order = TableStatusUpdate {
            status: TableStatus::Free,
            current_order: Some("o-1".to_string()),
        };
        assert!(!free_with_order.is_consistent());

        let reserved = TableStatusUpdate {
            status: TableStatus::Reserved,
            current_order: None,
        };
        assert!(reserved.is_consistent());
    }
}
