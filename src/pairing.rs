use crate::errors::EngineError;

/// Pair an ordered candidate list into matches. Adjacent players meet by
/// default; when a pair would be a rematch, one forward scan looks for the
/// first later candidate who has not met the anchor and swaps them in. If
/// nobody qualifies the rematch stands. Deterministic for a given order.
pub fn pair<F>(candidates: &[u32], have_met: F) -> Result<Vec<(u32, u32)>, EngineError>
where
    F: Fn(u32, u32) -> bool,
{
    if candidates.len() % 2 != 0 {
        return Err(EngineError::StructuralMismatch(format!(
            "pairing needs an even candidate list, got {}",
            candidates.len()
        )));
    }
    let mut order: Vec<u32> = candidates.to_vec();
    let mut pairs = Vec::with_capacity(order.len() / 2);
    let mut i = 0;
    while i < order.len() {
        if have_met(order[i], order[i + 1]) {
            if let Some(j) = (i + 2..order.len()).find(|&j| !have_met(order[i], order[j])) {
                order.swap(i + 1, j);
            }
        }
        pairs.push((order[i], order[i + 1]));
        i += 2;
    }
    Ok(pairs)
}
