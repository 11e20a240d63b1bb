//! Chromosomes: ordered gene sequences and their genetic operators

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::gene::{dense_byte_len, Gene};
use super::{GenomeError, Result};

/// Ordered sequence of genes making up one candidate brain
///
/// Serializes through the plain bracketed text form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Chromosome {
    genes: Vec<Gene>,
}

impl Chromosome {
    /// Create an empty chromosome
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chromosome of `gene_count` random genes, each `gene_bits` long
    pub fn random<R: Rng + ?Sized>(gene_count: usize, gene_bits: usize, rng: &mut R) -> Self {
        let genes = (0..gene_count)
            .map(|_| Gene::random(gene_bits, rng))
            .collect();
        Self { genes }
    }

    /// Append a gene
    pub fn add_gene(&mut self, gene: Gene) {
        self.genes.push(gene);
    }

    /// Append a gene that may be absent, failing without modification if it is
    pub fn try_add_gene(&mut self, gene: Option<Gene>) -> Result<()> {
        let gene = gene.ok_or(GenomeError::MissingGene)?;
        self.genes.push(gene);
        Ok(())
    }

    /// Gene at `index`
    pub fn gene(&self, index: usize) -> Result<&Gene> {
        self.genes
            .get(index)
            .ok_or(GenomeError::GeneIndexOutOfRange {
                index,
                len: self.genes.len(),
            })
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn num_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// K-point crossover with another chromosome
    ///
    /// `points` crosspoints are drawn uniformly from the range both parents share,
    /// sorted, and each one swaps the parent supplying genes (equal crosspoints swap
    /// and swap back). Past the shorter parent's end, genes come from the longer
    /// parent, so the child is always as long as the longer parent.
    pub fn crossover<R: Rng + ?Sized>(
        &self,
        other: &Chromosome,
        points: usize,
        rng: &mut R,
    ) -> Result<Chromosome> {
        if points == 0 {
            return Err(GenomeError::NoCrossoverPoints);
        }

        let shared = self.len().min(other.len());
        let mut crosspoints: Vec<usize> = if shared == 0 {
            Vec::new()
        } else {
            (0..points).map(|_| rng.random_range(0..shared)).collect()
        };
        crosspoints.sort_unstable();

        log::trace!(
            "Crossover points {:?} over {} shared genes",
            crosspoints,
            shared
        );

        let start_self = rng.random::<bool>();
        Ok(self.crossover_at(other, &crosspoints, start_self))
    }

    /// Crossover with fixed sorted crosspoints and starting parent
    ///
    /// Each crosspoint at `i` swaps the source parent before gene `i` is taken.
    fn crossover_at(
        &self,
        other: &Chromosome,
        crosspoints: &[usize],
        start_self: bool,
    ) -> Chromosome {
        let self_is_longer = self.len() >= other.len();
        let shared = self.len().min(other.len());
        let longest = self.len().max(other.len());

        let mut from_self = start_self;
        let mut next_point = 0;
        let mut genes = Vec::with_capacity(longest);

        for i in 0..longest {
            if i < shared {
                while next_point < crosspoints.len() && crosspoints[next_point] == i {
                    from_self = !from_self;
                    next_point += 1;
                }
            } else {
                from_self = self_is_longer;
            }

            let source = if from_self { self } else { other };
            genes.push(source.genes[i].clone());
        }

        Chromosome { genes }
    }

    /// Copy of this chromosome with exactly one bit flipped in one random gene
    pub fn mutate<R: Rng + ?Sized>(&self, rng: &mut R) -> Chromosome {
        let mut mutated = self.clone();
        assert_eq!(mutated.len(), self.len(), "clone lost genes");

        if mutated.genes.is_empty() {
            return mutated;
        }

        let point = rng.random_range(0..mutated.genes.len());
        mutated.genes[point].mutate(rng);
        mutated
    }

    /// Decoded gene values as `[0.5][0.25]...`
    pub fn to_value_string(&self) -> String {
        self.genes
            .iter()
            .map(|gene| format!("[{}]", gene.decode()))
            .collect()
    }

    /// Dense encoding: `[bytesPerGene][bitsPerGene]` then every gene's dense bytes
    ///
    /// Only chromosomes whose genes share one bit length can be encoded this way.
    pub fn to_dense_bytes(&self) -> Result<Vec<u8>> {
        let first = self.genes.first().ok_or(GenomeError::Empty)?;
        let bit_len = first.bit_len();

        if let Some((gene, found)) = self
            .genes
            .iter()
            .map(Gene::bit_len)
            .enumerate()
            .find(|&(_, len)| len != bit_len)
        {
            return Err(GenomeError::MixedGeneLengths {
                gene,
                expected: bit_len,
                found,
            });
        }

        let byte_len = first.encoded_byte_len();
        let mut out = format!("[{}][{}]", byte_len, bit_len).into_bytes();
        out.reserve(byte_len * self.genes.len());
        for gene in &self.genes {
            out.extend(gene.to_dense());
        }
        Ok(out)
    }

    /// Parse the output of [`Chromosome::to_dense_bytes`]
    pub fn from_dense_bytes(bytes: &[u8]) -> Result<Chromosome> {
        if bytes.is_empty() {
            return Ok(Chromosome::new());
        }

        let (declared, pos) = parse_header_number(bytes, 0)?;
        let (bit_len, pos) = parse_header_number(bytes, pos)?;

        let expected = dense_byte_len(bit_len);
        if declared != expected {
            return Err(GenomeError::DenseHeaderMismatch {
                declared,
                bit_len,
                expected,
            });
        }

        let body = &bytes[pos..];
        if declared == 0 {
            return if body.is_empty() {
                Ok(Chromosome::new())
            } else {
                Err(GenomeError::Malformed {
                    position: pos,
                    reason: "gene data present for zero-length genes",
                })
            };
        }
        if body.len() % declared != 0 {
            return Err(GenomeError::Malformed {
                position: pos + body.len() - body.len() % declared,
                reason: "truncated dense gene",
            });
        }

        let genes = body
            .chunks(declared)
            .enumerate()
            .map(|(gene, chunk)| {
                Gene::from_dense(chunk, bit_len)
                    .map_err(|source| GenomeError::InvalidGene {
                        gene,
                        source: Box::new(source),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Chromosome { genes })
    }

    /// Dense encoding carried as text, one Latin-1 character per byte
    pub fn to_dense_string(&self) -> Result<String> {
        let bytes = self.to_dense_bytes()?;
        Ok(bytes.into_iter().map(char::from).collect())
    }

    /// Parse the output of [`Chromosome::to_dense_string`]
    pub fn from_dense_str(text: &str) -> Result<Chromosome> {
        let mut bytes = Vec::with_capacity(text.len());
        for c in text.chars() {
            let Ok(byte) = u8::try_from(c) else {
                return Err(GenomeError::NonLatin1 { found: c });
            };
            bytes.push(byte);
        }
        Self::from_dense_bytes(&bytes)
    }
}

/// Parse `[digits]` starting at `start`, returning the number and the next position
fn parse_header_number(bytes: &[u8], start: usize) -> Result<(usize, usize)> {
    if bytes.get(start) != Some(&b'[') {
        return Err(GenomeError::Malformed {
            position: start,
            reason: "expected '[' in dense header",
        });
    }

    let digits_start = start + 1;
    let close = bytes[digits_start..]
        .iter()
        .position(|&b| b == b']')
        .map(|offset| digits_start + offset)
        .ok_or(GenomeError::Malformed {
            position: start,
            reason: "unterminated dense header",
        })?;

    let digits = &bytes[digits_start..close];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(GenomeError::Malformed {
            position: digits_start,
            reason: "dense header must be a decimal number",
        });
    }

    let value = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(GenomeError::Malformed {
            position: digits_start,
            reason: "dense header number out of range",
        })?;

    Ok((value, close + 1))
}

impl fmt::Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for gene in &self.genes {
            write!(f, "[{}]", gene)?;
        }
        Ok(())
    }
}

impl FromStr for Chromosome {
    type Err = GenomeError;

    /// Parse the plain `[0101][1100]...` form; genes may differ in length
    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let mut genes = Vec::new();
        let mut pos = 0;

        while pos < text.len() {
            if !text[pos..].starts_with('[') {
                return Err(GenomeError::Malformed {
                    position: pos,
                    reason: "expected '['",
                });
            }
            let open = pos + 1;
            let close = text[open..]
                .find(']')
                .map(|offset| open + offset)
                .ok_or(GenomeError::Malformed {
                    position: pos,
                    reason: "unterminated gene",
                })?;

            let gene = text[open..close]
                .parse::<Gene>()
                .map_err(|source| GenomeError::InvalidGene {
                    gene: genes.len(),
                    source: Box::new(source),
                })?;
            genes.push(gene);
            pos = close + 1;
        }

        Ok(Chromosome { genes })
    }
}

impl From<Vec<Gene>> for Chromosome {
    fn from(genes: Vec<Gene>) -> Self {
        Self { genes }
    }
}

impl FromIterator<Gene> for Chromosome {
    fn from_iter<I: IntoIterator<Item = Gene>>(iter: I) -> Self {
        Self {
            genes: iter.into_iter().collect(),
        }
    }
}

impl From<Chromosome> for String {
    fn from(chromosome: Chromosome) -> Self {
        chromosome.to_string()
    }
}

impl TryFrom<String> for Chromosome {
    type Error = GenomeError;

    fn try_from(text: String) -> Result<Self> {
        text.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    fn seeded(seed: u64) -> Xoshiro256StarStar {
        Xoshiro256StarStar::seed_from_u64(seed)
    }

    fn bit_diff(a: &Chromosome, b: &Chromosome) -> usize {
        a.genes()
            .iter()
            .zip(b.genes())
            .map(|(x, y)| {
                x.bits()
                    .iter()
                    .zip(y.bits())
                    .filter(|(p, q)| p != q)
                    .count()
            })
            .sum()
    }

    #[test]
    fn test_random_chromosome_shape() {
        let mut rng = seeded(1);
        let chromosome = Chromosome::random(12, 20, &mut rng);
        assert_eq!(chromosome.num_genes(), 12);
        assert!(chromosome.genes().iter().all(|g| g.bit_len() == 20));
    }

    #[test]
    fn test_add_gene_and_lookup() {
        let mut chromosome = Chromosome::new();
        chromosome.add_gene("101".parse().unwrap());
        assert!(chromosome.try_add_gene(None).is_err());
        assert!(chromosome.try_add_gene(Some("11".parse().unwrap())).is_ok());

        assert_eq!(chromosome.num_genes(), 2);
        assert_eq!(chromosome.gene(1).unwrap().to_string(), "11");
        assert_eq!(
            chromosome.gene(2),
            Err(GenomeError::GeneIndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn test_crossover_requires_points() {
        let mut rng = seeded(2);
        let a = Chromosome::random(5, 8, &mut rng);
        let b = Chromosome::random(5, 8, &mut rng);
        assert_eq!(
            a.crossover(&b, 0, &mut rng),
            Err(GenomeError::NoCrossoverPoints)
        );
    }

    #[test]
    fn test_crossover_length_is_longer_parent() {
        let mut rng = seeded(3);
        for (len_a, len_b) in [(10, 10), (4, 17), (17, 4), (0, 6), (6, 0), (1, 1)] {
            let a = Chromosome::random(len_a, 8, &mut rng);
            let b = Chromosome::random(len_b, 8, &mut rng);
            for points in 1..6 {
                let child = a.crossover(&b, points, &mut rng).unwrap();
                assert_eq!(child.len(), len_a.max(len_b));
            }
        }
    }

    #[test]
    fn test_crossover_genes_come_from_parents() {
        let mut rng = seeded(4);
        let a = Chromosome::random(9, 16, &mut rng);
        let b = Chromosome::random(20, 16, &mut rng);

        for _ in 0..50 {
            let child = a.crossover(&b, 3, &mut rng).unwrap();
            for (i, gene) in child.genes().iter().enumerate() {
                if i < a.len() {
                    assert!(gene == a.gene(i).unwrap() || gene == b.gene(i).unwrap());
                } else {
                    assert_eq!(gene, b.gene(i).unwrap());
                }
            }
        }
    }

    #[test]
    fn test_single_crosspoint_switches_parent() {
        let a: Chromosome = "[0][0][0][0][0]".parse().unwrap();
        let b: Chromosome = "[1][1][1][1][1]".parse().unwrap();

        assert_eq!(a.crossover_at(&b, &[2], true).to_string(), "[0][0][1][1][1]");
        assert_eq!(a.crossover_at(&b, &[2], false).to_string(), "[1][1][0][0][0]");
        assert_eq!(a.crossover_at(&b, &[0], true).to_string(), "[1][1][1][1][1]");
    }

    #[test]
    fn test_equal_crosspoints_swap_back() {
        let a: Chromosome = "[0][0][0][0][0]".parse().unwrap();
        let b: Chromosome = "[1][1][1][1][1]".parse().unwrap();

        assert_eq!(a.crossover_at(&b, &[2, 2], true).to_string(), "[0][0][0][0][0]");
        assert_eq!(a.crossover_at(&b, &[2, 2], false).to_string(), "[1][1][1][1][1]");
        assert_eq!(a.crossover_at(&b, &[2, 2, 2], true).to_string(), "[0][0][1][1][1]");
        assert_eq!(a.crossover_at(&b, &[1, 3, 3], true).to_string(), "[0][1][1][1][1]");
    }

    #[test]
    fn test_crossover_tail_comes_from_longer_parent() {
        let a: Chromosome = "[0][0]".parse().unwrap();
        let b: Chromosome = "[1][1][1][1]".parse().unwrap();

        assert_eq!(a.crossover_at(&b, &[1], false).to_string(), "[1][0][1][1]");
        assert_eq!(b.crossover_at(&a, &[1], true).to_string(), "[1][0][1][1]");
    }

    #[test]
    fn test_mutate_changes_exactly_one_bit() {
        let mut rng = seeded(6);
        let original = Chromosome::random(30, 28, &mut rng);
        for _ in 0..100 {
            let mutated = original.mutate(&mut rng);
            assert_eq!(mutated.len(), original.len());
            assert_eq!(bit_diff(&original, &mutated), 1);
        }
    }

    #[test]
    fn test_clone_is_deep() {
        let mut rng = seeded(7);
        let original = Chromosome::random(4, 8, &mut rng);
        let mut copy = original.clone();
        copy.genes[0].mutate(&mut rng);
        assert_ne!(copy, original);
        assert_eq!(bit_diff(&original, &copy), 1);
    }

    #[test]
    fn test_plain_round_trip_mixed_lengths() {
        let text = "[0101][1][000111000]";
        let chromosome: Chromosome = text.parse().unwrap();
        assert_eq!(chromosome.num_genes(), 3);
        assert_eq!(chromosome.to_string(), text);
    }

    #[test]
    fn test_plain_parse_reports_failing_gene() {
        let err = "[01][0a1]".parse::<Chromosome>().unwrap_err();
        match err {
            GenomeError::InvalidGene { gene, source } => {
                assert_eq!(gene, 1);
                assert_eq!(
                    *source,
                    GenomeError::InvalidBit {
                        position: 1,
                        found: 'a'
                    }
                );
            }
            other => panic!("unexpected error {other:?}"),
        }

        assert!(matches!(
            "[01][11".parse::<Chromosome>(),
            Err(GenomeError::Malformed { position: 4, .. })
        ));
        assert!(matches!(
            "[01]x[11]".parse::<Chromosome>(),
            Err(GenomeError::Malformed { position: 4, .. })
        ));
    }

    #[test]
    fn test_dense_round_trip() {
        let mut rng = seeded(8);
        for bits in [1, 6, 7, 8, 20, 28, 64] {
            let chromosome = Chromosome::random(25, bits, &mut rng);
            let dense = chromosome.to_dense_bytes().unwrap();
            let back = Chromosome::from_dense_bytes(&dense).unwrap();
            assert_eq!(back, chromosome);

            let text = chromosome.to_dense_string().unwrap();
            assert_eq!(Chromosome::from_dense_str(&text).unwrap(), chromosome);
        }
    }

    #[test]
    fn test_dense_header() {
        let chromosome: Chromosome = "[00000000][11111111]".parse().unwrap();
        let dense = chromosome.to_dense_bytes().unwrap();
        assert!(dense.starts_with(b"[2][8]"));
        assert_eq!(dense.len(), b"[2][8]".len() + 4);
    }

    #[test]
    fn test_dense_rejects_mixed_lengths() {
        let chromosome: Chromosome = "[0101][1]".parse().unwrap();
        assert_eq!(
            chromosome.to_dense_bytes(),
            Err(GenomeError::MixedGeneLengths {
                gene: 1,
                expected: 4,
                found: 1
            })
        );
    }

    #[test]
    fn test_dense_rejects_bad_input() {
        assert!(matches!(
            Chromosome::from_dense_bytes(b"[2][8]AAA"),
            Err(GenomeError::Malformed { .. })
        ));
        assert!(matches!(
            Chromosome::from_dense_bytes(b"[3][8]AAA"),
            Err(GenomeError::DenseHeaderMismatch { .. })
        ));
        assert!(matches!(
            Chromosome::from_dense_bytes(b"[x][8]"),
            Err(GenomeError::Malformed { .. })
        ));
        assert!(matches!(
            Chromosome::from_dense_bytes(b"[1][7]A\x05"),
            Err(GenomeError::InvalidGene { gene: 1, .. })
        ));
    }

    #[test]
    fn test_serde_uses_plain_form() {
        let chromosome: Chromosome = "[01][10]".parse().unwrap();
        let ron_text = ron::to_string(&chromosome).unwrap();
        assert_eq!(ron_text, "\"[01][10]\"");
        let back: Chromosome = ron::from_str(&ron_text).unwrap();
        assert_eq!(back, chromosome);
    }
}
