//! Durable cart storage.
//!
//! The cart survives a page reload by persisting its line list and totals to
//! a JSON file under a fixed path. The persisted copy is a convenience, not a
//! source of truth: checkout distrusts it entirely and overwrites it with the
//! server cart before showing any total.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::cart::models::{CartLine, CartState};

/// Errors that can occur while reading or writing the cart file.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The cart file could not be read or written.
    #[error("cart file could not be read or written")]
    Io(#[from] io::Error),

    /// The cart file held something other than a persisted cart.
    #[error("cart file is not a valid persisted cart")]
    Json(#[from] serde_json::Error),
}

/// File-backed persistence for the cart store.
#[derive(Debug, Clone)]
pub struct CartStorage {
    path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedCart {
    saved_at: Timestamp,
    lines: Vec<PersistedLine>,
    subtotal: Decimal,
    item_count: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedLine {
    local_id: Uuid,
    product_id: u64,
    color_id: u64,
    size_id: u64,
    quantity: u32,
    unit_price: Decimal,
    cart_item_id: Option<u64>,
}

impl From<&CartLine> for PersistedLine {
    fn from(line: &CartLine) -> Self {
        Self {
            local_id: line.local_id,
            product_id: line.product_id.into_raw(),
            color_id: line.color_id.into_raw(),
            size_id: line.size_id.into_raw(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            cart_item_id: line.server_item_id.map(Into::into),
        }
    }
}

impl From<PersistedLine> for CartLine {
    fn from(line: PersistedLine) -> Self {
        Self {
            local_id: line.local_id,
            product_id: line.product_id.into(),
            color_id: line.color_id.into(),
            size_id: line.size_id.into(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            server_item_id: line.cart_item_id.map(Into::into),
        }
    }
}

impl CartStorage {
    /// Persist carts at the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this storage reads and writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Restore the persisted cart, if one exists.
    ///
    /// Totals are derived state, so they are recomputed from the restored
    /// lines rather than trusted from the file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<CartState>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)?;
        let persisted: PersistedCart = serde_json::from_str(&contents)?;

        let mut state = CartState {
            lines: persisted.lines.into_iter().map(Into::into).collect(),
            ..CartState::default()
        };
        state.recompute_totals();

        Ok(Some(state))
    }

    /// Write the given cart state to disk.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be written.
    pub fn save(&self, state: &CartState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let persisted = PersistedCart {
            saved_at: Timestamp::now(),
            lines: state.lines.iter().map(Into::into).collect(),
            subtotal: state.subtotal,
            item_count: state.item_count,
        };

        fs::write(&self.path, serde_json::to_vec_pretty(&persisted)?)?;

        Ok(())
    }
}
