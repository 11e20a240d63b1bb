//! Fixed-length binary genes
//!
//! A gene is a bit vector read as a binary fraction: bit `i` contributes
//! `2^-(i+1)`, so every gene decodes to a value in `[0, 1)`.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{GenomeError, Result};

/// Bits packed into each byte of the dense encoding
pub const DENSE_BITS_PER_BYTE: usize = 7;

/// Bias added to every dense byte so the ASCII control block (0-32) is never emitted
const DENSE_BIAS: i32 = 33;

/// Largest value a signed byte can hold; dense values above it are folded negative
const SIGNED_BYTE_MAX: i32 = i8::MAX as i32;

/// A fixed-length sequence of bits encoding a value in `[0, 1)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gene {
    bits: Vec<bool>,
}

impl Gene {
    /// Build a gene of `len` random bits
    pub fn random<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
        let bits = (0..len).map(|_| rng.random::<bool>()).collect();
        Self { bits }
    }

    /// Build a gene from an explicit bit pattern
    pub fn from_bits(bits: &[bool]) -> Self {
        Self {
            bits: bits.to_vec(),
        }
    }

    /// Encode a real value as a binary fraction of `len` bits
    ///
    /// The value is made non-negative and reduced to its fractional part first,
    /// then expanded by repeated doubling.
    pub fn from_value(value: f64, len: usize) -> Self {
        let mut remainder = value.abs();
        if remainder >= 1.0 {
            remainder -= remainder.floor();
        }

        let mut bits = Vec::with_capacity(len);
        for _ in 0..len {
            remainder *= 2.0;
            if remainder >= 1.0 {
                bits.push(true);
                remainder -= 1.0;
            } else {
                bits.push(false);
            }
        }

        Self { bits }
    }

    /// Decode a gene from its dense byte encoding
    ///
    /// The byte run does not describe its own length, so the exact bit length
    /// used at encoding time must be supplied.
    pub fn from_dense(bytes: &[u8], bit_len: usize) -> Result<Self> {
        let expected = dense_byte_len(bit_len);
        if bytes.len() != expected {
            return Err(GenomeError::DenseLengthMismatch {
                bit_len,
                expected,
                found: bytes.len(),
            });
        }

        let skip = dense_lead_skip(bit_len);
        let mut bits = Vec::with_capacity(bit_len);

        for (byte_idx, &byte) in bytes.iter().enumerate() {
            let mut packed = unfold_dense_byte(byte).ok_or(GenomeError::InvalidDenseByte {
                position: byte_idx,
                byte,
            })?;

            for slot in 0..DENSE_BITS_PER_BYTE {
                if !(byte_idx == 0 && slot < skip) {
                    bits.push(packed & 1 == 1);
                }
                packed >>= 1;
            }
        }

        Ok(Self { bits })
    }

    /// Decode the gene into its binary-fraction value
    pub fn decode(&self) -> f64 {
        let mut value = 0.0;
        let mut place = 0.5;
        for &bit in &self.bits {
            if bit {
                value += place;
            }
            place *= 0.5;
        }
        value
    }

    /// Reduced precision variant of [`Gene::decode`]
    pub fn to_f32(&self) -> f32 {
        self.decode() as f32
    }

    /// Underlying bit pattern
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Number of bits in this gene
    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    /// Number of bytes this gene occupies in the dense encoding
    pub fn encoded_byte_len(&self) -> usize {
        dense_byte_len(self.bits.len())
    }

    /// Flip one uniformly chosen bit in place
    pub(crate) fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.bits.is_empty() {
            return;
        }
        let idx = rng.random_range(0..self.bits.len());
        self.bits[idx] = !self.bits[idx];
    }

    /// Pack the bits seven to a byte, aligned to the end of the sequence
    pub fn to_dense(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_byte_len());
        let mut slot = dense_lead_skip(self.bits.len());
        let mut packed = 0i32;
        let mut pending = false;

        for &bit in &self.bits {
            if bit {
                packed |= 1 << slot;
            }
            pending = true;
            slot += 1;
            if slot == DENSE_BITS_PER_BYTE {
                out.push(fold_dense_byte(packed));
                packed = 0;
                slot = 0;
                pending = false;
            }
        }
        if pending {
            out.push(fold_dense_byte(packed));
        }

        out
    }
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in &self.bits {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl FromStr for Gene {
    type Err = GenomeError;

    fn from_str(s: &str) -> Result<Self> {
        let bits = s
            .chars()
            .enumerate()
            .map(|(position, c)| match c {
                '1' => Ok(true),
                '0' => Ok(false),
                found => Err(GenomeError::InvalidBit { position, found }),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { bits })
    }
}

/// Bytes needed to densely encode `bit_len` bits
pub fn dense_byte_len(bit_len: usize) -> usize {
    bit_len.div_ceil(DENSE_BITS_PER_BYTE)
}

/// Leading bit slots left empty in the first dense byte
fn dense_lead_skip(bit_len: usize) -> usize {
    (DENSE_BITS_PER_BYTE - bit_len % DENSE_BITS_PER_BYTE) % DENSE_BITS_PER_BYTE
}

/// Apply the printable bias and fold values above the signed range negative
fn fold_dense_byte(packed: i32) -> u8 {
    let biased = packed + DENSE_BIAS;
    let signed = if biased > SIGNED_BYTE_MAX {
        -(biased - SIGNED_BYTE_MAX)
    } else {
        biased
    };
    signed as i8 as u8
}

/// Reverse [`fold_dense_byte`], rejecting bytes the encoder never produces
fn unfold_dense_byte(byte: u8) -> Option<i32> {
    let signed = byte as i8 as i32;
    let biased = if signed < 0 {
        -signed + SIGNED_BYTE_MAX
    } else {
        signed
    };
    let packed = biased - DENSE_BIAS;
    (0..(1 << DENSE_BITS_PER_BYTE))
        .contains(&packed)
        .then_some(packed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    #[test]
    fn test_decode_binary_fraction() {
        let gene: Gene = "101".parse().unwrap();
        assert_eq!(gene.decode(), 0.625);

        let gene: Gene = "0000".parse().unwrap();
        assert_eq!(gene.decode(), 0.0);

        let gene: Gene = "1111".parse().unwrap();
        assert_eq!(gene.decode(), 0.9375);
    }

    #[test]
    fn test_from_value_round_trip_all_lengths() {
        let samples = [0.0, 0.1, 0.25, 0.3333, 0.5, 0.75, 0.9, 0.999_999];
        for len in 1..=64 {
            let tolerance = 2f64.powi(-(len as i32));
            for &value in &samples {
                let gene = Gene::from_value(value, len);
                assert_eq!(gene.bit_len(), len);
                let decoded = gene.decode();
                assert!(
                    (decoded - value).abs() <= tolerance,
                    "len {len}: {value} decoded to {decoded}"
                );
                assert!((0.0..1.0).contains(&decoded));
            }
        }
    }

    #[test]
    fn test_from_value_uses_fractional_magnitude() {
        let gene = Gene::from_value(-3.25, 8);
        assert_eq!(gene.to_string(), "01000000");
        assert_eq!(gene.decode(), 0.25);
    }

    #[test]
    fn test_parse_rejects_non_binary() {
        let err = "10x1".parse::<Gene>().unwrap_err();
        assert!(matches!(
            err,
            GenomeError::InvalidBit {
                position: 2,
                found: 'x'
            }
        ));
    }

    #[test]
    fn test_dense_round_trip_exhaustive_small_lengths() {
        for len in 1..=14usize {
            for pattern in 0u32..(1 << len) {
                let bits: Vec<bool> = (0..len).map(|i| pattern >> i & 1 == 1).collect();
                let gene = Gene::from_bits(&bits);
                let dense = gene.to_dense();
                assert_eq!(dense.len(), gene.encoded_byte_len());
                let back = Gene::from_dense(&dense, len).unwrap();
                assert_eq!(back, gene, "len {len} pattern {pattern:b}");
            }
        }
    }

    #[test]
    fn test_dense_round_trip_random_long_genes() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(7);
        for len in 15..=128 {
            for _ in 0..32 {
                let gene = Gene::random(len, &mut rng);
                let back = Gene::from_dense(&gene.to_dense(), len).unwrap();
                assert_eq!(back, gene);
            }
        }
    }

    #[test]
    fn test_dense_avoids_control_characters() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(99);
        for len in 1..=40 {
            let gene = Gene::random(len, &mut rng);
            for byte in gene.to_dense() {
                assert!(!(0..=32).contains(&byte), "control byte {byte} emitted");
            }
        }
    }

    #[test]
    fn test_dense_partial_first_byte() {
        // 8 bits: first byte carries one bit in its top slot
        let gene: Gene = "10000000".parse().unwrap();
        let dense = gene.to_dense();
        assert_eq!(dense.len(), 2);
        assert_eq!(dense[0], (64 + 33) as u8);
        assert_eq!(dense[1], 33);
    }

    #[test]
    fn test_dense_folds_high_values_negative() {
        let gene = Gene::from_bits(&[true; 7]);
        let dense = gene.to_dense();
        // 127 + 33 = 160 folds to -(160 - 127) = -33
        assert_eq!(dense, vec![(-33i8) as u8]);
    }

    #[test]
    fn test_dense_rejects_invalid_bytes() {
        let err = Gene::from_dense(&[10], 7).unwrap_err();
        assert!(matches!(err, GenomeError::InvalidDenseByte { position: 0, .. }));

        let err = Gene::from_dense(&[40, 40], 7).unwrap_err();
        assert!(matches!(err, GenomeError::DenseLengthMismatch { expected: 1, .. }));
    }

    #[test]
    fn test_mutate_flips_one_bit() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(3);
        let original = Gene::random(32, &mut rng);
        let mut mutated = original.clone();
        mutated.mutate(&mut rng);

        let flipped = original
            .bits()
            .iter()
            .zip(mutated.bits())
            .filter(|(a, b)| a != b)
            .count();
        assert_eq!(flipped, 1);
    }

    #[test]
    fn test_mutate_empty_gene_is_noop() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(3);
        let mut gene = Gene::from_bits(&[]);
        gene.mutate(&mut rng);
        assert_eq!(gene.bit_len(), 0);
    }
}
