//! Huffman coding with a self-describing payload.
//!
//! The tree is an arena of nodes addressed by index, built greedily from a
//! min-heap keyed by `(frequency, node index)`. Leaves are created in ascending
//! symbol order, so ties resolve identically on every run and payloads are
//! reproducible byte for byte.
//!
//! Payload layout:
//!
//! ```text
//! [table_len: u32 BE][code table: UTF-8 JSON, table_len bytes][pad: u8][packed bits, MSB first]
//! ```
//!
//! The JSON table maps decimal-string symbols to codeword strings, e.g.
//! `{"0":"10","255":"0"}`. Keys are parsed back to integers before inversion.

use bitvec::prelude::*;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use crate::codecs::{
    decode_dims, decode_stats, degraded_grid, CodecStats, Decoded, Encoded, ImageCodec,
};
use crate::error::{CodecError, Result};
use crate::image::{fit_to_grid, NormalizedImage};
use crate::metadata::{CodecParams, Metadata};
use crate::metrics;
use crate::registry::Method;
use crate::utils::read_u32_be;

/// Table length prefix plus the padding byte.
const HEADER_OVERHEAD: usize = 5;

//==================================================================================
// 1. Tree Construction
//==================================================================================

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf { symbol: u8 },
    Internal { left: usize, right: usize },
}

/// Builds the tree and returns `(arena, root)`, or `None` when no symbol occurs.
fn build_tree(freqs: &[u64; 256]) -> Option<(Vec<Node>, usize)> {
    let mut arena = Vec::new();
    let mut heap = BinaryHeap::new();

    for (symbol, &freq) in freqs.iter().enumerate() {
        if freq > 0 {
            heap.push(Reverse((freq, arena.len())));
            arena.push(Node::Leaf { symbol: symbol as u8 });
        }
    }

    while heap.len() > 1 {
        let (Some(Reverse((f1, left))), Some(Reverse((f2, right)))) = (heap.pop(), heap.pop()) else {
            break;
        };
        heap.push(Reverse((f1 + f2, arena.len())));
        arena.push(Node::Internal { left, right });
    }

    heap.pop().map(|Reverse((_, root))| (arena, root))
}

//==================================================================================
// 2. The Code Table
//==================================================================================

/// A symbol -> codeword mapping. Codewords are strings of `'0'` and `'1'`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeTable {
    codes: BTreeMap<u8, String>,
}

impl CodeTable {
    /// Derives the optimal prefix code for a frequency histogram.
    pub fn from_frequencies(freqs: &[u64; 256]) -> Self {
        let mut codes = BTreeMap::new();
        let Some((arena, root)) = build_tree(freqs) else {
            return Self { codes };
        };

        let mut stack = vec![(root, String::new())];
        while let Some((idx, prefix)) = stack.pop() {
            match arena[idx] {
                Node::Leaf { symbol } => {
                    // A lone symbol still needs one bit.
                    let code = if prefix.is_empty() { "0".to_string() } else { prefix };
                    codes.insert(symbol, code);
                }
                Node::Internal { left, right } => {
                    stack.push((right, format!("{}1", prefix)));
                    stack.push((left, format!("{}0", prefix)));
                }
            }
        }
        Self { codes }
    }

    /// Shortcut for `from_frequencies(histogram(symbols))`.
    pub fn from_symbols(symbols: &[u8]) -> Self {
        Self::from_frequencies(&metrics::histogram(symbols))
    }

    /// Parses the decimal-string keyed form used in metadata and payloads.
    pub fn from_string_map(map: &BTreeMap<String, String>) -> Result<Self> {
        let mut codes = BTreeMap::new();
        for (key, code) in map {
            let symbol: u8 = key
                .trim()
                .parse()
                .map_err(|_| CodecError::InvalidParameter(format!("huffman symbol '{}' is not in 0..=255", key)))?;
            if code.is_empty() || !code.bytes().all(|b| b == b'0' || b == b'1') {
                return Err(CodecError::InvalidParameter(format!(
                    "huffman codeword '{}' for symbol {} is not a bit string",
                    code, symbol
                )));
            }
            codes.insert(symbol, code.clone());
        }
        Ok(Self { codes })
    }

    /// The decimal-string keyed form used in metadata and payloads.
    pub fn to_string_map(&self) -> BTreeMap<String, String> {
        self.codes.iter().map(|(s, c)| (s.to_string(), c.clone())).collect()
    }

    pub fn get(&self, symbol: u8) -> Option<&str> {
        self.codes.get(&symbol).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// `true` if no codeword is a prefix of another.
    pub fn is_prefix_free(&self) -> bool {
        let mut words: Vec<&str> = self.codes.values().map(String::as_str).collect();
        words.sort_unstable();
        // In sorted order a prefix is immediately followed by one of its extensions.
        words.windows(2).all(|pair| !pair[1].starts_with(pair[0]))
    }

    /// Frequency-weighted mean codeword length in bits.
    pub fn average_length(&self, freqs: &[u64; 256]) -> f64 {
        let mut total = 0u64;
        let mut bits = 0u64;
        for (&symbol, code) in &self.codes {
            let f = freqs[symbol as usize];
            total += f;
            bits += f * code.len() as u64;
        }
        if total == 0 {
            return 0.0;
        }
        bits as f64 / total as f64
    }

    /// `entropy / average_length`; 0 for an empty stream.
    pub fn efficiency(&self, symbols: &[u8]) -> f64 {
        let freqs = metrics::histogram(symbols);
        let avg = self.average_length(&freqs);
        if avg == 0.0 {
            return 0.0;
        }
        metrics::entropy(symbols) / avg
    }
}

//==================================================================================
// 3. Bit Packing
//==================================================================================

/// Concatenates codewords MSB-first and zero-pads to a byte boundary.
/// Returns the packed bytes and the number of padding bits.
fn pack_bits(symbols: &[u8], table: &CodeTable) -> Result<(Vec<u8>, u8)> {
    let mut lookup: Vec<Option<&str>> = vec![None; 256];
    for (&symbol, code) in &table.codes {
        lookup[symbol as usize] = Some(code.as_str());
    }

    let mut bits: BitVec<u8, Msb0> = BitVec::with_capacity(symbols.len() * 8);
    for &s in symbols {
        let code = lookup[s as usize]
            .ok_or_else(|| CodecError::InvalidParameter(format!("symbol {} missing from code table", s)))?;
        for c in code.bytes() {
            bits.push(c == b'1');
        }
    }

    let pad = (8 - bits.len() % 8) % 8;
    for _ in 0..pad {
        bits.push(false);
    }
    Ok((bits.into_vec(), pad as u8))
}

struct TrieNode {
    children: [Option<usize>; 2],
    symbol: Option<u8>,
}

/// Inverts a code table into a binary trie for bit-by-bit matching.
fn build_trie(table: &CodeTable) -> Vec<TrieNode> {
    let mut trie = vec![TrieNode { children: [None, None], symbol: None }];
    for (&symbol, code) in &table.codes {
        let mut node = 0;
        for c in code.bytes() {
            let branch = (c == b'1') as usize;
            node = match trie[node].children[branch] {
                Some(next) => next,
                None => {
                    trie.push(TrieNode { children: [None, None], symbol: None });
                    let next = trie.len() - 1;
                    trie[node].children[branch] = Some(next);
                    next
                }
            };
        }
        trie[node].symbol = Some(symbol);
    }
    trie
}

/// Greedily matches codewords in the first `valid_bits` bits of `bytes`.
/// Stops at the first bit sequence that leaves the trie.
fn unpack_bits(bytes: &[u8], valid_bits: usize, table: &CodeTable) -> Vec<u8> {
    let trie = build_trie(table);
    let bits = bytes.view_bits::<Msb0>();
    let mut decoded = Vec::new();
    let mut node = 0;

    for bit in bits.iter().by_vals().take(valid_bits) {
        match trie[node].children[bit as usize] {
            Some(next) => {
                if let Some(symbol) = trie[next].symbol {
                    decoded.push(symbol);
                    node = 0;
                } else {
                    node = next;
                }
            }
            None => {
                log::warn!("huffman bitstream left the code tree after {} symbols", decoded.len());
                break;
            }
        }
    }
    decoded
}

//==================================================================================
// 4. Codec
//==================================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HuffmanCodec;

impl HuffmanCodec {
    /// Splits a payload into its embedded table and bitstream.
    fn parse_payload(payload: &[u8]) -> std::result::Result<(Option<CodeTable>, u8, &[u8]), String> {
        if payload.len() < HEADER_OVERHEAD {
            return Err(format!("{} bytes is shorter than the header", payload.len()));
        }
        let table_len = read_u32_be(payload, 0).ok_or("missing table length")? as usize;
        let table_end = 4usize
            .checked_add(table_len)
            .filter(|end| *end < payload.len())
            .ok_or_else(|| format!("table length {} runs past the payload", table_len))?;

        let embedded = serde_json::from_slice::<BTreeMap<String, String>>(&payload[4..table_end])
            .ok()
            .and_then(|map| CodeTable::from_string_map(&map).ok());
        Ok((embedded, payload[table_end], &payload[table_end + 1..]))
    }
}

impl ImageCodec for HuffmanCodec {
    fn method(&self) -> Method {
        Method::Huffman
    }

    fn encode(&self, image: &NormalizedImage) -> Result<Encoded> {
        let symbols = image.symbols();
        let freqs = metrics::histogram(&symbols);
        let table = CodeTable::from_frequencies(&freqs);

        let payload = if symbols.is_empty() {
            Vec::new()
        } else {
            let table_json = serde_json::to_vec(&table.to_string_map())?;
            let table_len = u32::try_from(table_json.len())
                .map_err(|_| CodecError::InvalidParameter("huffman table too large".to_string()))?;
            let (packed, pad) = pack_bits(&symbols, &table)?;

            let mut payload = Vec::with_capacity(HEADER_OVERHEAD + table_json.len() + packed.len());
            payload.extend_from_slice(&table_len.to_be_bytes());
            payload.extend_from_slice(&table_json);
            payload.push(pad);
            payload.extend_from_slice(&packed);
            payload
        };

        let entropy = metrics::entropy(&symbols);
        let avg_code_length = table.average_length(&freqs);
        let efficiency = if avg_code_length > 0.0 { entropy / avg_code_length * 100.0 } else { 0.0 };

        log::debug!(
            "huffman: {} symbols, avg {:.3} bits vs entropy {:.3} ({:.1}% efficient)",
            table.len(),
            avg_code_length,
            entropy,
            efficiency
        );

        let stats = CodecStats::new(Method::Huffman, symbols.len(), payload.len(), entropy)
            .with_detail("num_symbols", table.len())
            .with_detail("avg_code_length", avg_code_length)
            .with_detail("efficiency", efficiency)
            .with_detail("bits_per_pixel", metrics::bits_per_pixel(payload.len() * 8, symbols.len()));

        let metadata = image.metadata(CodecParams::Huffman {
            huffman_codes: table.to_string_map(),
            num_symbols: table.len(),
        });

        Ok(Encoded { payload, metadata, stats })
    }

    fn decode(&self, payload: &[u8], metadata: &Metadata) -> Result<Decoded> {
        let (rows, cols) = decode_dims(metadata)?;
        if payload.is_empty() && rows * cols == 0 {
            let grid = fit_to_grid(Vec::new(), rows, cols)?;
            let stats = decode_stats(Method::Huffman, &grid, 0);
            return Ok(Decoded { grid, stats });
        }

        let (embedded, pad, body) = match Self::parse_payload(payload) {
            Ok(parts) => parts,
            Err(reason) => {
                let grid = degraded_grid(Method::Huffman, rows, cols, &reason);
                let stats = decode_stats(Method::Huffman, &grid, payload.len());
                return Ok(Decoded { grid, stats });
            }
        };

        let table = match embedded {
            Some(table) if !table.is_empty() => table,
            _ => match &metadata.params {
                CodecParams::Huffman { huffman_codes, .. } => {
                    CodeTable::from_string_map(huffman_codes).unwrap_or_default()
                }
                _ => CodeTable::default(),
            },
        };
        if table.is_empty() {
            let grid = degraded_grid(Method::Huffman, rows, cols, "no code table");
            let stats = decode_stats(Method::Huffman, &grid, payload.len());
            return Ok(Decoded { grid, stats });
        }

        let valid_bits = (body.len() * 8).saturating_sub(pad as usize);
        let symbols = unpack_bits(body, valid_bits, &table);
        let symbols_decoded = symbols.len();
        let grid = fit_to_grid(symbols, rows, cols)?;
        let stats = decode_stats(Method::Huffman, &grid, payload.len())
            .with_detail("symbols_decoded", symbols_decoded);
        Ok(Decoded { grid, stats })
    }
}

//==================================================================================
// 5. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{test_image, Pattern};
    use ndarray::{array, Array2};

    #[test]
    fn test_lone_symbol_gets_single_bit() {
        let table = CodeTable::from_symbols(&[42, 42, 42]);
        assert_eq!(table.get(42), Some("0"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_known_code_lengths() {
        // freq: a=5, b=2, c=1, d=1 -> lengths 1, 2, 3, 3
        let symbols = [0u8, 0, 0, 0, 0, 1, 1, 2, 3];
        let table = CodeTable::from_symbols(&symbols);
        let lengths: Vec<usize> = (0..4).map(|s| table.get(s).map_or(0, str::len)).collect();
        assert_eq!(lengths, vec![1, 2, 3, 3]);
        assert!(table.is_prefix_free());
    }

    #[test]
    fn test_tables_are_deterministic() {
        let image = test_image(32, 32, Pattern::Blocks, 5);
        let symbols: Vec<u8> = image.iter().copied().collect();
        assert_eq!(CodeTable::from_symbols(&symbols), CodeTable::from_symbols(&symbols));
        let a = HuffmanCodec.encode(&NormalizedImage::from_grid(image.clone())).unwrap();
        let b = HuffmanCodec.encode(&NormalizedImage::from_grid(image)).unwrap();
        assert_eq!(a.payload, b.payload);
    }

    #[test]
    fn test_efficiency_above_ninety_percent() {
        for pattern in [Pattern::Gradient, Pattern::Blocks, Pattern::Noise, Pattern::Checkerboard] {
            let symbols: Vec<u8> = test_image(64, 64, pattern, 1).iter().copied().collect();
            let table = CodeTable::from_symbols(&symbols);
            assert!(table.is_prefix_free(), "{:?}", pattern);
            let efficiency = table.efficiency(&symbols);
            assert!(efficiency > 0.9, "{:?} efficiency {}", pattern, efficiency);
        }
    }

    #[test]
    fn test_payload_layout() {
        let image = NormalizedImage::from_grid(array![[7u8, 7, 7]]);
        let encoded = HuffmanCodec.encode(&image).unwrap();
        let table = br#"{"7":"0"}"#;
        let mut expected = (table.len() as u32).to_be_bytes().to_vec();
        expected.extend_from_slice(table);
        expected.push(5); // three bits used, five padding
        expected.push(0);
        assert_eq!(encoded.payload, expected);
    }

    #[test]
    fn test_roundtrip_uses_embedded_table() {
        let grid = test_image(20, 30, Pattern::Gradient, 0);
        let image = NormalizedImage::from_grid(grid.clone());
        let mut encoded = HuffmanCodec.encode(&image).unwrap();
        // The payload alone is sufficient.
        encoded.metadata.params = CodecParams::Huffman { huffman_codes: BTreeMap::new(), num_symbols: 0 };
        let decoded = HuffmanCodec.decode(&encoded.payload, &encoded.metadata).unwrap();
        assert_eq!(decoded.grid, grid);
    }

    #[test]
    fn test_truncated_payload_degrades_to_zeros() {
        let image = NormalizedImage::from_grid(test_image(8, 8, Pattern::Noise, 3));
        let encoded = HuffmanCodec.encode(&image).unwrap();
        let decoded = HuffmanCodec.decode(&encoded.payload[..3], &encoded.metadata).unwrap();
        assert_eq!(decoded.grid, Array2::<u8>::zeros((8, 8)));

        let cut = &encoded.payload[..10];
        let decoded = HuffmanCodec.decode(cut, &encoded.metadata).unwrap();
        assert_eq!(decoded.grid, Array2::<u8>::zeros((8, 8)));
    }

    #[test]
    fn test_empty_image_roundtrip() {
        let image = NormalizedImage::from_grid(Array2::zeros((0, 4)));
        let encoded = HuffmanCodec.encode(&image).unwrap();
        assert!(encoded.payload.is_empty());
        assert_eq!(
            encoded.metadata.params,
            CodecParams::Huffman { huffman_codes: BTreeMap::new(), num_symbols: 0 }
        );
        let decoded = HuffmanCodec.decode(&encoded.payload, &encoded.metadata).unwrap();
        assert_eq!(decoded.grid.dim(), (0, 4));
    }

    #[test]
    fn test_bad_table_keys_are_rejected() {
        let mut map = BTreeMap::new();
        map.insert("300".to_string(), "0".to_string());
        assert!(CodeTable::from_string_map(&map).is_err());
        map.clear();
        map.insert("3".to_string(), "012".to_string());
        assert!(CodeTable::from_string_map(&map).is_err());
    }
}
