use crate::Symbol;

/// Split `symbols` into contiguous batches of at most `limit`, in input order.
///
/// A `limit` of zero is treated as one.
pub fn chunk(symbols: &[Symbol], limit: usize) -> Vec<Vec<Symbol>> {
    symbols
        .chunks(limit.max(1))
        .map(<[Symbol]>::to_vec)
        .collect()
}
