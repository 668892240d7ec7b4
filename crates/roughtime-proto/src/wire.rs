// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Roughtime tag-value wire format codec and packet framing.
//!
//! Messages are tag-value maps: a header with the tag count, cumulative value
//! offsets, and the sorted tags, followed by the concatenated values.
//!
//! Layout:
//! ```text
//! num_tags: u32 LE
//! offsets:  [u32 LE; N-1]   (cumulative byte offsets into the value region)
//! tags:     [[u8; 4]; N]    (sorted ascending by LE u32 value)
//! values:   [u8]            (concatenated, every value 4-byte aligned)
//! ```
//!
//! IETF packets wrap a message in an envelope: the 8-byte `ROUGHTIM` magic
//! and a 4-byte length field. Google-era traffic sends the bare message, so
//! [`decode_packet`] falls back to treating the buffer as a bare message when
//! the magic is absent.

use crate::error::RoughtimeError;
use crate::tag::Tag;

/// Magic bytes opening a framed Roughtime packet.
pub const PACKET_MAGIC: [u8; 8] = *b"ROUGHTIM";

/// Envelope size: 8 (magic) + 4 (length).
pub const PACKET_HEADER_LEN: usize = 12;

/// Upper bound on the tag count of a single message.
pub const MAX_TAG_COUNT: u32 = 1024;

// ── Little-endian scalar codecs ─────────────────────────────────────

/// Decode a `u32` from an exactly-4-byte little-endian buffer.
pub fn read_u32(data: &[u8]) -> Result<u32, RoughtimeError> {
    let bytes: [u8; 4] = data.try_into().map_err(|_| RoughtimeError::BadLength {
        what: "u32 value",
        expected: 4,
        actual: data.len(),
    })?;
    Ok(u32::from_le_bytes(bytes))
}

/// Decode a `u64` from an exactly-8-byte little-endian buffer.
pub fn read_u64(data: &[u8]) -> Result<u64, RoughtimeError> {
    let bytes: [u8; 8] = data.try_into().map_err(|_| RoughtimeError::BadLength {
        what: "u64 value",
        expected: 8,
        actual: data.len(),
    })?;
    Ok(u64::from_le_bytes(bytes))
}

/// Decode a sequence of little-endian `u32` words.
pub fn read_u32_list(data: &[u8]) -> Result<Vec<u32>, RoughtimeError> {
    if data.len() % 4 != 0 {
        return Err(RoughtimeError::BadLength {
            what: "u32 list value",
            expected: (data.len() + 3) & !3,
            actual: data.len(),
        });
    }
    Ok(data
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Encode a sequence of `u32` words as little-endian bytes.
pub fn encode_u32_list(words: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * 4);
    for w in words {
        out.extend_from_slice(&w.to_le_bytes());
    }
    out
}

// ── Zero-copy parser ────────────────────────────────────────────────

/// A parsed tag-value map referencing borrowed data.
///
/// Parsing validates the full canonical form: tag count cap, header bounds,
/// 4-byte alignment, a monotonically non-decreasing offset sequence with
/// strictly positive explicit offsets, and strictly ascending tags (which
/// also rules out duplicates).
#[derive(Debug, Eq, PartialEq)]
pub struct TagValueMap<'a> {
    num_tags: usize,
    offsets: &'a [u8],
    tags: &'a [u8],
    values: &'a [u8],
}

impl<'a> TagValueMap<'a> {
    /// Parse a tag-value map from raw bytes.
    pub fn parse(buf: &'a [u8]) -> Result<Self, RoughtimeError> {
        if buf.len() < 4 {
            return Err(RoughtimeError::Truncated {
                needed: 4,
                available: buf.len(),
            });
        }

        let num_tags = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if num_tags > MAX_TAG_COUNT {
            return Err(RoughtimeError::BadTlv {
                reason: "tag count exceeds cap",
            });
        }
        let num_tags = num_tags as usize;

        if num_tags == 0 {
            // An empty message is exactly the four zero bytes.
            if buf.len() != 4 {
                return Err(RoughtimeError::BadTlv {
                    reason: "value bytes present without tags",
                });
            }
            return Ok(TagValueMap {
                num_tags: 0,
                offsets: &[],
                tags: &[],
                values: &[],
            });
        }

        // Header: 4 (num_tags) + 4*(N-1) (offsets) + 4*N (tags).
        let offsets_len = (num_tags - 1) * 4;
        let tags_len = num_tags * 4;
        let header_len = 4 + offsets_len + tags_len;
        if buf.len() < header_len {
            return Err(RoughtimeError::Truncated {
                needed: header_len,
                available: buf.len(),
            });
        }

        let offsets = &buf[4..4 + offsets_len];
        let tags = &buf[4 + offsets_len..header_len];
        let values = &buf[header_len..];

        if values.len() % 4 != 0 {
            return Err(RoughtimeError::BadTlv {
                reason: "value region not 4-byte aligned",
            });
        }

        // The boundary sequence [0, offsets…, values.len()] must be
        // non-decreasing with every explicit offset aligned, positive, and
        // in bounds.
        let mut prev = 0usize;
        for chunk in offsets.chunks_exact(4) {
            let off = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as usize;
            if off % 4 != 0 {
                return Err(RoughtimeError::BadTlv {
                    reason: "offset not 4-byte aligned",
                });
            }
            if off == 0 {
                return Err(RoughtimeError::BadTlv {
                    reason: "offset is zero",
                });
            }
            if off < prev {
                return Err(RoughtimeError::BadTlv {
                    reason: "offsets not monotonic",
                });
            }
            if off > values.len() {
                return Err(RoughtimeError::BadTlv {
                    reason: "offset out of bounds",
                });
            }
            prev = off;
        }

        // Tags must be strictly ascending as LE integers.
        for i in 1..num_tags {
            let prev_tag = u32::from_le_bytes([
                tags[(i - 1) * 4],
                tags[(i - 1) * 4 + 1],
                tags[(i - 1) * 4 + 2],
                tags[(i - 1) * 4 + 3],
            ]);
            let curr_tag = u32::from_le_bytes([
                tags[i * 4],
                tags[i * 4 + 1],
                tags[i * 4 + 2],
                tags[i * 4 + 3],
            ]);
            if prev_tag >= curr_tag {
                return Err(RoughtimeError::BadTlv {
                    reason: "tags not strictly ascending",
                });
            }
        }

        Ok(TagValueMap {
            num_tags,
            offsets,
            tags,
            values,
        })
    }

    /// Number of tags in the map.
    pub fn len(&self) -> usize {
        self.num_tags
    }

    /// Whether the map holds no tags.
    pub fn is_empty(&self) -> bool {
        self.num_tags == 0
    }

    fn tag_at(&self, i: usize) -> Tag {
        Tag::from_bytes([
            self.tags[i * 4],
            self.tags[i * 4 + 1],
            self.tags[i * 4 + 2],
            self.tags[i * 4 + 3],
        ])
    }

    fn offset_at(&self, i: usize) -> usize {
        u32::from_le_bytes([
            self.offsets[i * 4],
            self.offsets[i * 4 + 1],
            self.offsets[i * 4 + 2],
            self.offsets[i * 4 + 3],
        ]) as usize
    }

    fn value_at(&self, i: usize) -> &'a [u8] {
        let start = if i == 0 { 0 } else { self.offset_at(i - 1) };
        let end = if i == self.num_tags - 1 {
            self.values.len()
        } else {
            self.offset_at(i)
        };
        &self.values[start..end]
    }

    /// Look up a tag's value. Returns `None` if the tag is not present.
    pub fn get(&self, tag: Tag) -> Option<&'a [u8]> {
        (0..self.num_tags)
            .find(|&i| self.tag_at(i) == tag)
            .map(|i| self.value_at(i))
    }

    /// Look up a required tag, failing with `InvalidResponse` if absent.
    pub fn require(&self, tag: Tag) -> Result<&'a [u8], RoughtimeError> {
        self.get(tag)
            .ok_or(RoughtimeError::InvalidResponse { missing: tag })
    }

    /// Parse a nested tag-value map out of a tag's value.
    pub fn get_nested(&self, tag: Tag) -> Result<TagValueMap<'a>, RoughtimeError> {
        TagValueMap::parse(self.require(tag)?)
    }

    /// Iterate over `(tag, value)` pairs in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, &'a [u8])> + '_ {
        (0..self.num_tags).map(|i| (self.tag_at(i), self.value_at(i)))
    }
}

// ── Builder ─────────────────────────────────────────────────────────

/// Builder for encoding a tag-value map.
///
/// Entries may be added in any order; encoding sorts them by numeric tag
/// value and right-pads every value to a 4-byte multiple.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    entries: Vec<(Tag, Vec<u8>)>,
}

impl MessageBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag-value entry. Each tag may be added at most once.
    pub fn add(&mut self, tag: Tag, value: Vec<u8>) -> &mut Self {
        self.entries.push((tag, value));
        self
    }

    /// Encode the message. An empty builder encodes to the four zero bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut entries: Vec<(Tag, &[u8])> = self
            .entries
            .iter()
            .map(|(t, v)| (*t, v.as_slice()))
            .collect();
        entries.sort_by_key(|(t, _)| t.number());
        for pair in entries.windows(2) {
            assert!(
                pair[0].0 != pair[1].0,
                "duplicate tag {} in message builder",
                pair[0].0
            );
        }

        let num_tags = entries.len();
        if num_tags == 0 {
            return 0u32.to_le_bytes().to_vec();
        }

        let padded_len = |v: &[u8]| (v.len() + 3) & !3;
        let values_len: usize = entries.iter().map(|(_, v)| padded_len(v)).sum();
        let total = 4 + (num_tags - 1) * 4 + num_tags * 4 + values_len;
        let mut buf = Vec::with_capacity(total);

        buf.extend_from_slice(&(num_tags as u32).to_le_bytes());

        let mut cumulative = 0u32;
        for (_, value) in entries.iter().take(num_tags - 1) {
            cumulative += padded_len(value) as u32;
            buf.extend_from_slice(&cumulative.to_le_bytes());
        }

        for (tag, _) in &entries {
            buf.extend_from_slice(tag.as_bytes());
        }

        for (_, value) in &entries {
            buf.extend_from_slice(value);
            buf.resize(buf.len() + (padded_len(value) - value.len()), 0);
        }

        buf
    }

    /// Encode the message and wrap it in a packet envelope.
    pub fn encode_packet(&self) -> Vec<u8> {
        encode_packet(&self.encode())
    }
}

// ── Packet envelope ─────────────────────────────────────────────────

/// Wrap a message in a packet envelope: `ROUGHTIM` magic plus LE length.
pub fn encode_packet(message: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(PACKET_HEADER_LEN + message.len());
    buf.extend_from_slice(&PACKET_MAGIC);
    buf.extend_from_slice(&(message.len() as u32).to_le_bytes());
    buf.extend_from_slice(message);
    buf
}

/// Strictly remove a packet envelope, failing with `BadMagic` when the
/// buffer does not start with `ROUGHTIM`.
pub fn strip_packet_frame(buf: &[u8]) -> Result<&[u8], RoughtimeError> {
    if buf.len() < 8 || buf[..8] != PACKET_MAGIC {
        return Err(RoughtimeError::BadMagic);
    }
    if buf.len() < PACKET_HEADER_LEN {
        return Err(RoughtimeError::Truncated {
            needed: PACKET_HEADER_LEN,
            available: buf.len(),
        });
    }
    let msg_len = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]) as usize;
    if msg_len % 4 != 0 {
        return Err(RoughtimeError::BadLength {
            what: "framed message",
            expected: (msg_len + 3) & !3,
            actual: msg_len,
        });
    }
    if PACKET_HEADER_LEN + msg_len != buf.len() {
        return Err(RoughtimeError::BadLength {
            what: "packet",
            expected: PACKET_HEADER_LEN + msg_len,
            actual: buf.len(),
        });
    }
    Ok(&buf[PACKET_HEADER_LEN..])
}

/// Decode a packet, returning the message bytes.
///
/// When the buffer does not begin with the `ROUGHTIM` magic it is treated as
/// a bare message (the Google-era wire format). A `min_size` greater than
/// zero rejects datagrams below that total size on either path.
pub fn decode_packet(buf: &[u8], min_size: usize) -> Result<&[u8], RoughtimeError> {
    if min_size > 0 && buf.len() < min_size {
        return Err(RoughtimeError::BadLength {
            what: "datagram",
            expected: min_size,
            actual: buf.len(),
        });
    }
    match strip_packet_frame(buf) {
        Ok(message) => Ok(message),
        Err(RoughtimeError::BadMagic) => Ok(buf),
        Err(e) => Err(e),
    }
}

// ── Typed recursive decoding ────────────────────────────────────────

/// A decoded tag value.
///
/// Nested messages retain their byte-exact wire form alongside the decoded
/// view: signatures verify over the original bytes, never a re-encoding.
#[derive(Debug, PartialEq)]
pub enum TlvValue<'a> {
    /// An opaque byte string.
    Bytes(&'a [u8]),
    /// A little-endian `u32`.
    U32(u32),
    /// A little-endian `u64`.
    U64(u64),
    /// A sequence of little-endian `u32` words.
    U32List(Vec<u32>),
    /// A nested tag-value message.
    Nested {
        /// The nested message's exact wire bytes.
        raw: &'a [u8],
        /// The recursively decoded message.
        message: DecodedMessage<'a>,
    },
}

/// A recursively decoded tag-value message with per-tag typed values.
#[derive(Debug, Default, PartialEq)]
pub struct DecodedMessage<'a> {
    entries: Vec<(Tag, TlvValue<'a>)>,
}

fn decode_value(tag: Tag, value: &[u8]) -> Result<TlvValue<'_>, RoughtimeError> {
    let decoded = match tag {
        Tag::RADI | Tag::TYPE | Tag::INDX => TlvValue::U32(read_u32(value)?),
        Tag::MIDP | Tag::MINT | Tag::MAXT => TlvValue::U64(read_u64(value)?),
        Tag::VERS => TlvValue::U32List(read_u32_list(value)?),
        // VER is a single word in responses and the offered list in requests.
        Tag::VER => {
            if value.len() == 4 {
                TlvValue::U32(read_u32(value)?)
            } else {
                TlvValue::U32List(read_u32_list(value)?)
            }
        }
        Tag::SREP | Tag::CERT | Tag::DELE => TlvValue::Nested {
            raw: value,
            message: DecodedMessage::decode(value)?,
        },
        _ => TlvValue::Bytes(value),
    };
    Ok(decoded)
}

impl<'a> DecodedMessage<'a> {
    /// Recursively decode a message, interpreting scalar and nested tags.
    pub fn decode(buf: &'a [u8]) -> Result<Self, RoughtimeError> {
        let map = TagValueMap::parse(buf)?;
        let mut entries = Vec::with_capacity(map.len());
        for (tag, value) in map.iter() {
            entries.push((tag, decode_value(tag, value)?));
        }
        Ok(DecodedMessage { entries })
    }

    /// Look up a tag's decoded value.
    pub fn get(&self, tag: Tag) -> Option<&TlvValue<'a>> {
        self.entries
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, v)| v)
    }

    /// The tag's value as a `u32`, if present and scalar.
    pub fn u32(&self, tag: Tag) -> Option<u32> {
        match self.get(tag) {
            Some(TlvValue::U32(v)) => Some(*v),
            _ => None,
        }
    }

    /// The tag's value as a `u64`, if present and scalar.
    pub fn u64(&self, tag: Tag) -> Option<u64> {
        match self.get(tag) {
            Some(TlvValue::U64(v)) => Some(*v),
            _ => None,
        }
    }

    /// The tag's value as raw bytes, if present and opaque.
    pub fn bytes(&self, tag: Tag) -> Option<&'a [u8]> {
        match self.get(tag) {
            Some(TlvValue::Bytes(v)) => Some(v),
            _ => None,
        }
    }

    /// The tag's nested message along with its byte-exact wire form.
    pub fn nested(&self, tag: Tag) -> Option<(&'a [u8], &DecodedMessage<'a>)> {
        match self.get(tag) {
            Some(TlvValue::Nested { raw, message }) => Some((raw, message)),
            _ => None,
        }
    }

    /// Number of entries in the message.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the message holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
