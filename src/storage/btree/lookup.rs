use super::node::NodeRead;
use crate::types::Result;

/// Returns the largest index whose key is `<= key`.
///
/// Entry 0 is the lower bound of the subtree and is never compared, so the
/// result is 0 whenever no later key qualifies. Keys are strictly increasing,
/// which lets this bisect over `1..n` while matching a left-to-right scan.
pub fn lookup_floor<N: NodeRead + ?Sized>(node: &N, key: &[u8]) -> Result<usize> {
    let n = node.key_count();
    let mut lo = 1usize;
    let mut hi = n.max(1);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if node.key(mid)? <= key {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    Ok(lo - 1)
}
