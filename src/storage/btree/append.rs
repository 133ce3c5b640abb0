//! Entry copy primitives shared by leaf and internal rewrites.
//!
//! A destination node is always sized up front with [`NodeBuf::new`]; entries
//! are then appended strictly left to right because each append derives its
//! position from the offset written by the previous one.

use std::convert::TryFrom;

use super::node::{NodeBuf, NodeRead, KV_HEADER_LEN, MAX_KEY_SIZE, MAX_VAL_SIZE};
use crate::types::{KvError, PageId, Result};

/// Copies `count` entries of `src` starting at `src_start` into `dst` at `dst_start`.
///
/// Pointers, offsets and KV bytes are copied; offsets are rebased onto
/// `dst.offset(dst_start)`.
pub fn append_range<N: NodeRead + ?Sized>(
    dst: &mut NodeBuf,
    src: &N,
    dst_start: usize,
    src_start: usize,
    count: usize,
) -> Result<()> {
    let src_n = src.key_count();
    if src_start + count > src_n {
        return Err(KvError::OutOfRange {
            field: "source range",
            index: src_start + count,
            bound: src_n + 1,
        });
    }
    let dst_n = dst.key_count();
    if dst_start + count > dst_n {
        return Err(KvError::OutOfRange {
            field: "destination range",
            index: dst_start + count,
            bound: dst_n + 1,
        });
    }
    if count == 0 {
        return Ok(());
    }

    for i in 0..count {
        dst.set_pointer(dst_start + i, src.pointer(src_start + i)?)?;
    }

    let dst_begin = dst.offset(dst_start)?;
    let src_begin = src.offset(src_start)?;
    for i in 1..=count {
        let relative = src
            .offset(src_start + i)?
            .checked_sub(src_begin)
            .ok_or(KvError::Corruption("offsets not monotonic"))?;
        dst.set_offset(dst_start + i, dst_begin + relative)?;
    }

    let begin = src.kv_position(src_start)?;
    let end = src.kv_position(src_start + count)?;
    let kvs = src
        .bytes()
        .get(begin..end)
        .ok_or(KvError::Corruption("entry extends past node buffer"))?;
    let at = dst.kv_position(dst_start)?;
    dst.write_at(at, kvs)
}

/// Writes one entry at `idx` and records the offset of the entry after it.
pub fn append_entry(
    dst: &mut NodeBuf,
    idx: usize,
    ptr: PageId,
    key: &[u8],
    val: &[u8],
) -> Result<()> {
    let klen = u16::try_from(key.len()).map_err(|_| KvError::KeyTooLarge {
        len: key.len(),
        max: MAX_KEY_SIZE,
    })?;
    let vlen = u16::try_from(val.len()).map_err(|_| KvError::ValueTooLarge {
        len: val.len(),
        max: MAX_VAL_SIZE,
    })?;

    dst.set_pointer(idx, ptr)?;

    let pos = dst.kv_position(idx)?;
    dst.write_at(pos, &klen.to_le_bytes())?;
    dst.write_at(pos + 2, &vlen.to_le_bytes())?;
    dst.write_at(pos + KV_HEADER_LEN, key)?;
    dst.write_at(pos + KV_HEADER_LEN + key.len(), val)?;

    let next = dst.offset(idx)? + KV_HEADER_LEN + key.len() + val.len();
    dst.set_offset(idx + 1, next)
}
