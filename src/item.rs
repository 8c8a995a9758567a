// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Global identity records used to police id reuse across roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role an id was registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Container,
    Invoice,
    Purchase,
}

impl ItemType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Container => "CONTAINER",
            Self::Invoice => "INVOICE",
            Self::Purchase => "PURCHASE",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONTAINER" => Ok(Self::Container),
            "INVOICE" => Ok(Self::Invoice),
            "PURCHASE" => Ok(Self::Purchase),
            other => Err(format!("unknown item type '{}'", other)),
        }
    }
}

/// An id registered under a type. Created once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
}

impl Item {
    pub fn new(id: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            id: id.into(),
            item_type,
        }
    }

    pub fn container(id: impl Into<String>) -> Self {
        Self::new(id, ItemType::Container)
    }

    pub fn purchase(id: impl Into<String>) -> Self {
        Self::new(id, ItemType::Purchase)
    }

    pub fn invoice(id: impl Into<String>) -> Self {
        Self::new(id, ItemType::Invoice)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.item_type, self.id)
    }
}
