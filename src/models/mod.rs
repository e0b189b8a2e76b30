pub mod analytics;
pub mod company;
pub mod customer;
pub mod inventory;
pub mod product;
pub mod purchase;
pub mod sale;
pub mod shop;
pub mod supplier;
pub mod transfer;
pub mod user;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Entity lifecycle state. Replaces ad-hoc deletion flags: rows are never
/// physically removed, a delete moves the row to `Deleted` and every read
/// filters on `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Active,
    Deleted,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Active => "active",
            Lifecycle::Deleted => "deleted",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Lifecycle {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "active" => Ok(Lifecycle::Active),
            "deleted" => Ok(Lifecycle::Deleted),
            other => Err(format!("unknown lifecycle state: {other}")),
        }
    }
}
