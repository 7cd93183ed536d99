//! Shared tag/value metadata block.
//!
//! Every codec family carries the same body after its own header prefix:
//!
//! ```text
//! u32 vendor length | vendor | u32 count | count x (u32 length | "TAG=value")
//! ```
//!
//! followed, for families that use one, by a framing byte.

use crate::error::{Result, XiphError};
use crate::utils::{put_length_prefixed, ByteReader};
use bytes::{BufMut, BytesMut};
use std::collections::BTreeMap;

/// Track title.
pub const TITLE: &str = "title";
/// Performing artist.
pub const ARTIST: &str = "artist";
/// Album or collection name.
pub const ALBUM: &str = "album";
/// Genre.
pub const GENRE: &str = "genre";
/// Recording or release date.
pub const DATE: &str = "date";
/// Track number, optionally `n/total`.
pub const TRACK_NUMBER: &str = "tracknumber";

/// Vendor string plus a case-insensitive multimap of tags.
///
/// Tags are stored normalized and kept sorted, which is also the order they
/// are serialized in. Values under one tag keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentBlock {
    vendor: String,
    comments: BTreeMap<String, Vec<String>>,
}

impl CommentBlock {
    /// Creates an empty block with the given vendor string.
    pub fn new(vendor: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            comments: BTreeMap::new(),
        }
    }

    /// Lower-cases the tag and drops anything outside printable ASCII
    /// `0x20..=0x7D` as well as `=`.
    pub fn normalize_tag(tag: &str) -> String {
        tag.chars()
            .filter(|c| matches!(*c, '\u{20}'..='\u{7D}') && *c != '=')
            .map(|c| c.to_ascii_lowercase())
            .collect()
    }

    /// Encoder vendor string.
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Replaces the vendor string.
    pub fn set_vendor(&mut self, vendor: impl Into<String>) {
        self.vendor = vendor.into();
    }

    /// Appends a value under `tag`.
    ///
    /// A tag with nothing left after normalization cannot be serialized and
    /// is ignored.
    pub fn add_comment(&mut self, tag: &str, value: impl Into<String>) {
        let Some(key) = Self::checked_tag(tag) else {
            return;
        };
        self.comments.entry(key).or_default().push(value.into());
    }

    /// Replaces every value of `tag` with `value`.
    pub fn set_comment(&mut self, tag: &str, value: impl Into<String>) {
        let Some(key) = Self::checked_tag(tag) else {
            return;
        };
        self.comments.insert(key, vec![value.into()]);
    }

    fn checked_tag(tag: &str) -> Option<String> {
        let key = Self::normalize_tag(tag);
        if key.is_empty() {
            log::debug!("ignoring comment with empty tag {:?}", tag);
            return None;
        }
        Some(key)
    }

    /// All values of `tag`, in insertion order.
    pub fn comments(&self, tag: &str) -> &[String] {
        self.comments
            .get(&Self::normalize_tag(tag))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First value of `tag`.
    pub fn first_comment(&self, tag: &str) -> Option<&str> {
        self.comments(tag).first().map(String::as_str)
    }

    /// Removes and returns every value of `tag`.
    pub fn remove_comments(&mut self, tag: &str) -> Vec<String> {
        self.comments
            .remove(&Self::normalize_tag(tag))
            .unwrap_or_default()
    }

    /// Removes one value of `tag`; returns whether it was present.
    pub fn remove_comment(&mut self, tag: &str, value: &str) -> bool {
        let key = Self::normalize_tag(tag);
        let Some(values) = self.comments.get_mut(&key) else {
            return false;
        };
        let Some(index) = values.iter().position(|v| v == value) else {
            return false;
        };
        values.remove(index);
        if values.is_empty() {
            self.comments.remove(&key);
        }
        true
    }

    /// Tag/value pairs in serialized order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.comments
            .iter()
            .flat_map(|(tag, values)| values.iter().map(move |v| (tag.as_str(), v.as_str())))
    }

    /// Normalized tags present, sorted.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.comments.keys().map(String::as_str)
    }

    /// Number of tag/value pairs.
    pub fn len(&self) -> usize {
        self.comments.values().map(Vec::len).sum()
    }

    /// Whether no tag/value pairs are stored.
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// First `title` value.
    pub fn title(&self) -> Option<&str> {
        self.first_comment(TITLE)
    }

    /// First `artist` value.
    pub fn artist(&self) -> Option<&str> {
        self.first_comment(ARTIST)
    }

    /// First `album` value.
    pub fn album(&self) -> Option<&str> {
        self.first_comment(ALBUM)
    }

    /// First `genre` value.
    pub fn genre(&self) -> Option<&str> {
        self.first_comment(GENRE)
    }

    /// First `date` value.
    pub fn date(&self) -> Option<&str> {
        self.first_comment(DATE)
    }

    /// Track number, ignoring any `/total` suffix.
    pub fn track_number(&self) -> Option<u32> {
        self.first_comment(TRACK_NUMBER)
            .and_then(|v| v.split('/').next())
            .and_then(|v| v.trim().parse().ok())
    }

    /// Decodes the block body starting at `offset`.
    ///
    /// Entries without `=` are skipped. When `framing_bit` is set and a byte
    /// follows the last entry, its low bit must be 1.
    pub fn decode(data: &[u8], offset: usize, framing_bit: bool) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        reader.skip(offset)?;

        let vendor_len = reader.read_u32_le()? as usize;
        let vendor = String::from_utf8_lossy(reader.read_slice(vendor_len)?).into_owned();
        let mut block = Self::new(vendor);

        let count = reader.read_u32_le()?;
        for index in 0..count {
            let len = reader.read_u32_le()? as usize;
            let entry = String::from_utf8_lossy(reader.read_slice(len)?);
            match entry.split_once('=') {
                Some((tag, value)) if !Self::normalize_tag(tag).is_empty() => {
                    block.add_comment(tag, value)
                }
                _ => log::debug!("skipping malformed comment entry {}: {:?}", index, entry),
            }
        }

        if framing_bit && reader.remaining() > 0 {
            let framing = reader.read_u8()?;
            if framing != 1 {
                return Err(XiphError::InvalidFraming(framing));
            }
        }

        Ok(block)
    }

    /// Encodes the block after a zero-filled `header_size` region, which the
    /// caller patches with its family prefix, then runs `footer`.
    pub fn encode_with<F>(&self, header_size: usize, footer: F) -> Result<BytesMut>
    where
        F: FnOnce(&mut BytesMut),
    {
        let mut buf = BytesMut::with_capacity(header_size + 8 + self.vendor.len());
        buf.put_bytes(0, header_size);
        put_length_prefixed(&mut buf, self.vendor.as_bytes())?;

        let count = u32::try_from(self.len())
            .map_err(|_| XiphError::InvalidData("too many comments".to_string()))?;
        buf.put_u32_le(count);
        for (tag, value) in self.iter() {
            let entry = format!("{}={}", tag, value);
            put_length_prefixed(&mut buf, entry.as_bytes())?;
        }

        footer(&mut buf);
        Ok(buf)
    }
}
