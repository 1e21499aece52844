//! Cart reconciliation planning.
//!
//! The planning half of the synchronization routine: given the local lines
//! and a snapshot of the server cart, decide which corrective calls bring the
//! server toward local intent. Planning is pure; the store executes the plan
//! and records one outcome per correction.

use rustc_hash::FxHashMap;

use crate::domain::cart::models::{CartItemId, CartLine, ServerCartLine, VariantKey};

/// One corrective call against the server cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// Add this many units — the delta when the server already holds some of
    /// the quantity, the full local quantity when it holds none.
    Add { key: VariantKey, quantity: u32 },

    /// Bring the server line down to the local quantity via its handle.
    SetQuantity {
        key: VariantKey,
        cart_item_id: CartItemId,
        quantity: u32,
    },

    /// The server holds more than local wants but returned no handle for the
    /// line; there is no safe corrective action.
    MissingHandle { key: VariantKey },
}

impl Correction {
    /// The variant this correction concerns.
    #[must_use]
    pub fn key(&self) -> VariantKey {
        match self {
            Self::Add { key, .. } | Self::SetQuantity { key, .. } | Self::MissingHandle { key } => {
                *key
            }
        }
    }
}

/// What happened to one correction when it was executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineSyncStatus {
    /// The corrective call succeeded.
    Applied,
    /// The server answered 401/403; the line was left unsynced.
    Unauthorized,
    /// The corrective call failed for another reason; the line was skipped.
    Failed(String),
    /// No call was attempted (missing server handle).
    Skipped,
}

/// One correction together with its execution result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSyncOutcome {
    pub correction: Correction,
    pub status: LineSyncStatus,
}

/// The structured result of one synchronization attempt.
///
/// Per-line failures never fail the routine as a whole; callers that care
/// about convergence inspect the outcomes or the resulting cart state.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// One entry per corrective call the plan contained.
    pub outcomes: Vec<LineSyncOutcome>,
    /// Whether local state was replaced by the final server fetch.
    pub replaced: bool,
}

impl SyncReport {
    /// Whether every planned correction was applied.
    #[must_use]
    pub fn fully_applied(&self) -> bool {
        self.outcomes
            .iter()
            .all(|outcome| outcome.status == LineSyncStatus::Applied)
    }
}

/// Diff local lines against the server snapshot.
///
/// Quantities the server already holds are never re-sent: a local surplus
/// becomes a delta add, a local deficit becomes an absolute set against the
/// server's handle, and a key the server has no record of is added in full.
/// Lines whose quantities already agree produce no correction.
pub fn plan_corrections(local: &[CartLine], server: &[ServerCartLine]) -> Vec<Correction> {
    let lookup: FxHashMap<VariantKey, &ServerCartLine> = server
        .iter()
        .map(|line| (line.variant_key(), line))
        .collect();

    let mut corrections = Vec::new();

    for line in local {
        let key = line.variant_key();

        match lookup.get(&key) {
            None => corrections.push(Correction::Add {
                key,
                quantity: line.quantity,
            }),
            Some(server_line) if line.quantity > server_line.quantity => {
                corrections.push(Correction::Add {
                    key,
                    quantity: line.quantity - server_line.quantity,
                });
            }
            Some(server_line) if line.quantity < server_line.quantity => {
                corrections.push(match server_line.cart_item_id {
                    Some(cart_item_id) => Correction::SetQuantity {
                        key,
                        cart_item_id,
                        quantity: line.quantity,
                    },
                    None => Correction::MissingHandle { key },
                });
            }
            Some(_) => {}
        }
    }

    corrections
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use crate::domain::products::{ColorId, ProductId, SizeId};

    use super::*;

    fn key(product: u64, color: u64, size: u64) -> VariantKey {
        VariantKey {
            product_id: ProductId::from_raw(product),
            color_id: ColorId::from_raw(color),
            size_id: SizeId::from_raw(size),
        }
    }

    fn local(key: VariantKey, quantity: u32) -> CartLine {
        CartLine {
            local_id: Uuid::now_v7(),
            product_id: key.product_id,
            color_id: key.color_id,
            size_id: key.size_id,
            quantity,
            unit_price: Decimal::new(10_00, 2),
            server_item_id: None,
        }
    }

    fn server(key: VariantKey, quantity: u32, cart_item_id: Option<u64>) -> ServerCartLine {
        ServerCartLine {
            cart_item_id: cart_item_id.map(Into::into),
            product_id: key.product_id,
            color_id: key.color_id,
            size_id: key.size_id,
            quantity,
            unit_price: Decimal::new(10_00, 2),
            base_price: Decimal::new(10_00, 2),
        }
    }

    #[test]
    fn equal_quantities_need_no_correction() {
        let k = key(5, 1, 3);

        let corrections = plan_corrections(&[local(k, 2)], &[server(k, 2, Some(99))]);

        assert!(corrections.is_empty(), "got {corrections:?}");
    }

    #[test]
    fn local_surplus_adds_the_delta_only() {
        let k = key(5, 1, 3);

        let corrections = plan_corrections(&[local(k, 4)], &[server(k, 1, Some(99))]);

        assert_eq!(corrections, vec![Correction::Add { key: k, quantity: 3 }]);
    }

    #[test]
    fn local_deficit_sets_the_absolute_quantity() {
        let k = key(5, 1, 3);

        let corrections = plan_corrections(&[local(k, 1)], &[server(k, 4, Some(99))]);

        assert_eq!(
            corrections,
            vec![Correction::SetQuantity {
                key: k,
                cart_item_id: 99.into(),
                quantity: 1,
            }]
        );
    }

    #[test]
    fn key_absent_from_server_adds_in_full() {
        let k = key(5, 1, 3);

        let corrections = plan_corrections(&[local(k, 4)], &[]);

        assert_eq!(corrections, vec![Correction::Add { key: k, quantity: 4 }]);
    }

    #[test]
    fn deficit_without_handle_has_no_safe_correction() {
        let k = key(5, 1, 3);

        let corrections = plan_corrections(&[local(k, 1)], &[server(k, 4, None)]);

        assert_eq!(corrections, vec![Correction::MissingHandle { key: k }]);
    }

    #[test]
    fn corrections_follow_local_line_order() {
        let first = key(1, 1, 1);
        let second = key(2, 1, 1);
        let third = key(3, 1, 1);

        let corrections = plan_corrections(
            &[local(first, 2), local(second, 1), local(third, 5)],
            &[server(second, 3, Some(7))],
        );

        let keys: Vec<VariantKey> = corrections.iter().map(Correction::key).collect();
        assert_eq!(keys, vec![first, second, third]);
    }
}
