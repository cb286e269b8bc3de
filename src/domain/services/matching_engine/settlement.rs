//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Settlement of a single candidate match. Given the transaction built by the engine and the two
// orders involved, it computes the real fill, moves the position between the investors, consumes
// pending quantity, prices the transaction and closes fully filled orders.
//
// | Step | Effect                                                                          |
// |------|---------------------------------------------------------------------------------|
// | 0    | total and both new positions are computed checked; overflow aborts, no mutation |
// | 1    | fill = min(selling.pending_shares, buying.pending_shares)                       |
// | 2    | seller position -= fill, buyer position += fill                                 |
// | 3    | both orders' pending_shares -= fill                                             |
// | 4    | transaction.total = transaction.shares * buying.price                           |
// | 5    | each order is closed iff its pending_shares reached zero                        |
//--------------------------------------------------------------------------------------------------

use crate::domain::models::types::{Order, Transaction, TypeError};

/// Settles `transaction` between `selling_order` and `buying_order`.
///
/// The total is priced with the nominal quantity recorded on the transaction and the buying
/// order's limit price, not with the fill. The fill is stored in `transaction.filled`.
///
/// # Returns
/// The quantity exchanged.
///
/// # Errors
/// Returns `TypeError::Overflow` if the total or either position would overflow. Nothing is
/// mutated in that case.
pub fn settle(
    transaction: &mut Transaction,
    selling_order: &mut Order,
    buying_order: &mut Order,
) -> Result<u64, TypeError> {
    let fill = selling_order.pending_shares.min(buying_order.pending_shares);
    let delta = i64::try_from(fill).map_err(|_| TypeError::Overflow(format!("fill of {}", fill)))?;
    let total = Transaction::total_for(transaction.shares, buying_order.price)?;

    let asset_id = &selling_order.asset.id;
    if selling_order.investor.position_after(asset_id, -delta).is_none()
        || buying_order.investor.position_after(&buying_order.asset.id, delta).is_none()
    {
        return Err(TypeError::Overflow(format!("position change of {} in {}", delta, asset_id)));
    }

    selling_order
        .investor
        .update_position(&selling_order.asset.id, -delta);
    selling_order.fill(fill);

    buying_order
        .investor
        .update_position(&buying_order.asset.id, delta);
    buying_order.fill(fill);

    transaction.filled = fill;
    transaction.total = total;

    buying_order.close_if_filled();
    selling_order.close_if_filled();

    Ok(fill)
}
