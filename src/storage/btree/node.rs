//! Binary node layout shared by leaf and internal pages.
//!
//! ```text
//! | type u16 | nkeys u16 | pointers [u64; n] | offsets [u16; n] | kv pairs ... |
//! kv pair: | klen u16 | vlen u16 | key | value |
//! ```
//!
//! All integers are little-endian. The offset of entry 0 is implicitly zero,
//! so the offset array stores the cumulative KV length after entries `1..=n`.

use std::cmp::Ordering;
use std::convert::TryFrom;

use bytes::Bytes;

use crate::types::{KvError, PageId, Result};

/// Size of a persisted page in bytes.
pub const PAGE_SIZE: usize = 4096;
/// Node header length (`type:u16` + `nkeys:u16`).
pub const HEADER_LEN: usize = 4;
/// Largest key accepted by the tree.
pub const MAX_KEY_SIZE: usize = 1000;
/// Largest value accepted by the tree.
pub const MAX_VAL_SIZE: usize = 3000;
/// Width of one child pointer.
pub const POINTER_LEN: usize = 8;
/// Width of one offset array slot.
pub const OFFSET_LEN: usize = 2;
/// Length prefix preceding each key/value pair (`klen:u16` + `vlen:u16`).
pub const KV_HEADER_LEN: usize = 4;
/// Capacity of a node under construction: a full page plus one inserted entry.
pub const BUILD_CAPACITY: usize = 2 * PAGE_SIZE;

const _: () = assert!(
    HEADER_LEN + POINTER_LEN + OFFSET_LEN + KV_HEADER_LEN + MAX_KEY_SIZE + MAX_VAL_SIZE
        <= PAGE_SIZE
);

/// Logical kind of a node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeKind {
    /// Separator keys with child page pointers, no values.
    Internal = 1,
    /// Key/value pairs.
    Leaf = 2,
}

impl NodeKind {
    /// Returns the on-disk tag.
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Decodes an on-disk tag.
    pub fn from_u16(value: u16) -> Result<Self> {
        match value {
            1 => Ok(Self::Internal),
            2 => Ok(Self::Leaf),
            _ => Err(KvError::Corruption("unknown node type tag")),
        }
    }
}

/// Bytes one entry contributes to a node, counting its pointer and offset slot.
pub const fn entry_footprint(key_len: usize, val_len: usize) -> usize {
    POINTER_LEN + OFFSET_LEN + KV_HEADER_LEN + key_len + val_len
}

fn read_u16(buf: &[u8], pos: usize) -> Result<u16> {
    match buf.get(pos..pos + 2) {
        Some(b) => Ok(u16::from_le_bytes([b[0], b[1]])),
        None => Err(KvError::Corruption("node buffer truncated")),
    }
}

fn read_u64(buf: &[u8], pos: usize) -> Result<u64> {
    let raw: [u8; 8] = buf
        .get(pos..pos + 8)
        .and_then(|b| b.try_into().ok())
        .ok_or(KvError::Corruption("node buffer truncated"))?;
    Ok(u64::from_le_bytes(raw))
}

fn slice_at(buf: &[u8], pos: usize, len: usize) -> Result<&[u8]> {
    buf.get(pos..pos + len)
        .ok_or(KvError::Corruption("entry extends past node buffer"))
}

/// Read accessors over an encoded node.
///
/// Every index is bounds-checked against the declared key count; an index
/// past it yields [`KvError::OutOfRange`] instead of reading stale bytes.
pub trait NodeRead {
    /// Raw encoded bytes. Always at least [`HEADER_LEN`] long.
    fn bytes(&self) -> &[u8];

    /// Node kind decoded from the header.
    fn kind(&self) -> Result<NodeKind> {
        NodeKind::from_u16(read_u16(self.bytes(), 0)?)
    }

    /// Number of entries declared by the header.
    fn key_count(&self) -> usize {
        let b = self.bytes();
        usize::from(u16::from_le_bytes([b[2], b[3]]))
    }

    /// Child pointer of entry `idx`.
    fn pointer(&self, idx: usize) -> Result<PageId> {
        let n = self.key_count();
        if idx >= n {
            return Err(KvError::OutOfRange {
                field: "pointer",
                index: idx,
                bound: n,
            });
        }
        Ok(PageId(read_u64(self.bytes(), HEADER_LEN + POINTER_LEN * idx)?))
    }

    /// Cumulative KV length before entry `idx`; valid for `idx <= n`.
    fn offset(&self, idx: usize) -> Result<usize> {
        if idx == 0 {
            return Ok(0);
        }
        let n = self.key_count();
        if idx > n {
            return Err(KvError::OutOfRange {
                field: "offset",
                index: idx,
                bound: n + 1,
            });
        }
        let pos = HEADER_LEN + POINTER_LEN * n + OFFSET_LEN * (idx - 1);
        Ok(usize::from(read_u16(self.bytes(), pos)?))
    }

    /// Absolute byte position of entry `idx` in the buffer; valid for `idx <= n`.
    fn kv_position(&self, idx: usize) -> Result<usize> {
        let n = self.key_count();
        if idx > n {
            return Err(KvError::OutOfRange {
                field: "kv position",
                index: idx,
                bound: n + 1,
            });
        }
        Ok(HEADER_LEN + (POINTER_LEN + OFFSET_LEN) * n + self.offset(idx)?)
    }

    /// Key bytes of entry `idx`.
    fn key(&self, idx: usize) -> Result<&[u8]> {
        let n = self.key_count();
        if idx >= n {
            return Err(KvError::OutOfRange {
                field: "key",
                index: idx,
                bound: n,
            });
        }
        let pos = self.kv_position(idx)?;
        let klen = usize::from(read_u16(self.bytes(), pos)?);
        slice_at(self.bytes(), pos + KV_HEADER_LEN, klen)
    }

    /// Value bytes of entry `idx`. Empty for internal nodes.
    fn value(&self, idx: usize) -> Result<&[u8]> {
        let n = self.key_count();
        if idx >= n {
            return Err(KvError::OutOfRange {
                field: "value",
                index: idx,
                bound: n,
            });
        }
        let pos = self.kv_position(idx)?;
        let klen = usize::from(read_u16(self.bytes(), pos)?);
        let vlen = usize::from(read_u16(self.bytes(), pos + 2)?);
        slice_at(self.bytes(), pos + KV_HEADER_LEN + klen, vlen)
    }

    /// Total bytes the node occupies.
    fn encoded_size(&self) -> Result<usize> {
        self.kv_position(self.key_count())
    }

    /// Full structural check of the encoding.
    fn validate(&self) -> Result<()> {
        let kind = self.kind()?;
        let n = self.key_count();
        let buf = self.bytes();
        if HEADER_LEN + (POINTER_LEN + OFFSET_LEN) * n > buf.len() {
            return Err(KvError::Corruption("key count exceeds node buffer"));
        }
        for idx in 0..n {
            let start = self.offset(idx)?;
            let end = self.offset(idx + 1)?;
            if end < start {
                return Err(KvError::Corruption("offsets not monotonic"));
            }
            let pos = self.kv_position(idx)?;
            let klen = usize::from(read_u16(buf, pos)?);
            let vlen = usize::from(read_u16(buf, pos + 2)?);
            if end - start != KV_HEADER_LEN + klen + vlen {
                return Err(KvError::Corruption("offset disagrees with entry length"));
            }
            if klen > MAX_KEY_SIZE || vlen > MAX_VAL_SIZE {
                return Err(KvError::Corruption("entry exceeds maximum size"));
            }
            if kind == NodeKind::Internal {
                if vlen != 0 {
                    return Err(KvError::Corruption("internal entry carries a value"));
                }
                if self.pointer(idx)?.is_null() {
                    return Err(KvError::Corruption("internal entry has null child"));
                }
            }
            if idx > 0 && self.key(idx - 1)?.cmp(self.key(idx)?) != Ordering::Less {
                return Err(KvError::Corruption("keys not strictly increasing"));
            }
        }
        if self.encoded_size()? > buf.len() {
            return Err(KvError::Corruption("node extends past buffer"));
        }
        Ok(())
    }
}

/// Node under construction.
///
/// Backed by a [`BUILD_CAPACITY`] buffer so a full page plus one inserted
/// entry can be assembled before the split engine cuts it down.
#[derive(Clone, Debug)]
pub struct NodeBuf {
    data: Vec<u8>,
}

impl NodeBuf {
    /// Allocates a zeroed builder with the header already written.
    pub fn new(kind: NodeKind, key_count: usize) -> Result<Self> {
        let mut buf = Self {
            data: vec![0u8; BUILD_CAPACITY],
        };
        buf.set_header(kind, key_count)?;
        Ok(buf)
    }

    /// Writes the node type and key count.
    pub fn set_header(&mut self, kind: NodeKind, key_count: usize) -> Result<()> {
        let n = u16::try_from(key_count).map_err(|_| KvError::Invalid("key count exceeds u16"))?;
        let arrays_end = HEADER_LEN + (POINTER_LEN + OFFSET_LEN) * key_count;
        if arrays_end > self.data.len() {
            return Err(KvError::Oversized {
                size: arrays_end,
                limit: self.data.len(),
            });
        }
        self.data[0..2].copy_from_slice(&kind.as_u16().to_le_bytes());
        self.data[2..4].copy_from_slice(&n.to_le_bytes());
        Ok(())
    }

    /// Stores the child pointer of entry `idx`.
    pub fn set_pointer(&mut self, idx: usize, page: PageId) -> Result<()> {
        let n = self.key_count();
        if idx >= n {
            return Err(KvError::OutOfRange {
                field: "pointer",
                index: idx,
                bound: n,
            });
        }
        self.write_at(HEADER_LEN + POINTER_LEN * idx, &page.0.to_le_bytes())
    }

    /// Stores the cumulative KV length after entry `idx - 1`; valid for `1 <= idx <= n`.
    pub fn set_offset(&mut self, idx: usize, value: usize) -> Result<()> {
        let n = self.key_count();
        if idx == 0 || idx > n {
            return Err(KvError::OutOfRange {
                field: "offset",
                index: idx,
                bound: n + 1,
            });
        }
        let raw = u16::try_from(value).map_err(|_| KvError::Oversized {
            size: value,
            limit: usize::from(u16::MAX),
        })?;
        let pos = HEADER_LEN + POINTER_LEN * n + OFFSET_LEN * (idx - 1);
        self.write_at(pos, &raw.to_le_bytes())
    }

    pub(crate) fn write_at(&mut self, pos: usize, src: &[u8]) -> Result<()> {
        let limit = self.data.len();
        match self.data.get_mut(pos..pos + src.len()) {
            Some(dst) => {
                dst.copy_from_slice(src);
                Ok(())
            }
            None => Err(KvError::Oversized {
                size: pos + src.len(),
                limit,
            }),
        }
    }

    /// Converts into a persisted node, failing if it does not fit a page.
    pub fn freeze(self) -> Result<Node> {
        Node::try_from(self)
    }
}

impl NodeRead for NodeBuf {
    fn bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Immutable node whose encoded size fits in one page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    data: Bytes,
}

static EMPTY_LEAF: [u8; HEADER_LEN] = [NodeKind::Leaf as u8, 0, 0, 0];

impl Node {
    /// Leaf with no entries, the starting point of an empty tree.
    pub fn empty_leaf() -> Self {
        Self {
            data: Bytes::from_static(&EMPTY_LEAF),
        }
    }

    /// Decodes a page image, trimming trailing bytes past the encoded size.
    pub fn from_page(page: Bytes) -> Result<Self> {
        if page.len() < HEADER_LEN {
            return Err(KvError::Corruption("page shorter than node header"));
        }
        let node = Self { data: page };
        node.kind()?;
        let size = node.encoded_size()?;
        if size > PAGE_SIZE {
            return Err(KvError::Oversized {
                size,
                limit: PAGE_SIZE,
            });
        }
        if size > node.data.len() {
            return Err(KvError::Corruption("node extends past page image"));
        }
        Ok(Self {
            data: node.data.slice(..size),
        })
    }

    /// Shared handle to the encoded bytes.
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    /// Value of entry `idx` without copying.
    pub fn value_bytes(&self, idx: usize) -> Result<Bytes> {
        let value = self.value(idx)?;
        Ok(self.data.slice_ref(value))
    }

    /// Page-sized image, zero padded past the encoded size.
    pub fn to_page(&self) -> Vec<u8> {
        let mut page = vec![0u8; PAGE_SIZE];
        page[..self.data.len()].copy_from_slice(&self.data);
        page
    }
}

impl NodeRead for Node {
    fn bytes(&self) -> &[u8] {
        &self.data
    }
}

impl TryFrom<NodeBuf> for Node {
    type Error = KvError;

    fn try_from(buf: NodeBuf) -> Result<Self> {
        let size = buf.encoded_size()?;
        if size > PAGE_SIZE {
            return Err(KvError::Oversized {
                size,
                limit: PAGE_SIZE,
            });
        }
        let mut data = buf.data;
        data.truncate(size);
        Ok(Self {
            data: Bytes::from(data),
        })
    }
}
