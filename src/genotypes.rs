//! Genotype calls and their classification.
//!
//! The backend sends one entry per sample, covering every variant of the current
//! page. Haploid datasets send one allele index per variant; diploid (and higher
//! ploidy) datasets send one allele index per genome copy. `-1` marks a missing
//! call.

use serde::{Deserialize, Serialize};

use crate::traits::TsvSerialize;

/// The allele index the backend uses for a missing call.
pub const MISSING_ALLELE: i16 = -1;

/// The genotype calls of one sample across the variants of a page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleCalls {
    Haploid(Vec<i16>),
    Polyploid(Vec<Vec<i16>>),
}

impl SampleCalls {
    /// Number of variants covered.
    pub fn len(&self) -> usize {
        match self {
            SampleCalls::Haploid(calls) => calls.len(),
            SampleCalls::Polyploid(calls) => calls.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Classify every call by its number of alternate alleles.
    pub fn variant_types(&self) -> Vec<VariantType> {
        match self {
            SampleCalls::Haploid(calls) => calls
                .iter()
                .map(|&call| VariantType::from_haploid(call))
                .collect(),
            SampleCalls::Polyploid(calls) => calls
                .iter()
                .map(|genotype| VariantType::from_genotype(genotype))
                .collect(),
        }
    }
}

/// The class of a single genotype call, relative to the reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VariantType {
    Missing,
    Reference,
    Heterozygous,
    Alternate,
}

impl VariantType {
    pub fn from_haploid(call: i16) -> Self {
        match call {
            MISSING_ALLELE => VariantType::Missing,
            0 => VariantType::Reference,
            _ => VariantType::Alternate,
        }
    }

    /// Classify one genotype (one allele index per genome copy).
    pub fn from_genotype(genotype: &[i16]) -> Self {
        let Some(&first) = genotype.first() else {
            return VariantType::Missing;
        };
        if first == MISSING_ALLELE {
            VariantType::Missing
        } else if genotype.iter().any(|&allele| allele != first) {
            VariantType::Heterozygous
        } else if first == 0 {
            VariantType::Reference
        } else {
            VariantType::Alternate
        }
    }

    /// The numeric code of this class: `-1`, `0`, `1` or `2`.
    pub fn code(&self) -> i8 {
        match self {
            VariantType::Missing => -1,
            VariantType::Reference => 0,
            VariantType::Heterozygous => 1,
            VariantType::Alternate => 2,
        }
    }
}

impl TsvSerialize for VariantType {
    fn to_tsv(&self) -> String {
        self.code().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_diploid() {
        assert_eq!(VariantType::from_genotype(&[0, 0]), VariantType::Reference);
        assert_eq!(VariantType::from_genotype(&[0, 1]), VariantType::Heterozygous);
        assert_eq!(VariantType::from_genotype(&[1, 1]), VariantType::Alternate);
        assert_eq!(VariantType::from_genotype(&[2, 2]), VariantType::Alternate);
        assert_eq!(VariantType::from_genotype(&[-1, -1]), VariantType::Missing);
        assert_eq!(VariantType::from_genotype(&[]), VariantType::Missing);
    }

    #[test]
    fn test_classify_haploid() {
        assert_eq!(VariantType::from_haploid(0), VariantType::Reference);
        assert_eq!(VariantType::from_haploid(1), VariantType::Alternate);
        assert_eq!(VariantType::from_haploid(-1), VariantType::Missing);
    }

    #[test]
    fn test_sample_calls_deserialize() {
        let diploid: SampleCalls = serde_json::from_str("[[0, 0], [0, 1], [-1, -1]]").unwrap();
        assert_eq!(diploid.len(), 3);
        let codes: Vec<i8> = diploid.variant_types().iter().map(|t| t.code()).collect();
        assert_eq!(codes, vec![0, 1, -1]);

        let haploid: SampleCalls = serde_json::from_str("[0, 1, 1]").unwrap();
        assert_eq!(haploid, SampleCalls::Haploid(vec![0, 1, 1]));

        // loaded but empty is still a value
        let empty: SampleCalls = serde_json::from_str("[]").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_variant_type_tsv() {
        let types = vec![VariantType::Reference, VariantType::Missing];
        assert_eq!(types.to_tsv(), "0\t-1");
    }
}
