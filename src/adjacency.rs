use anyhow::{Context, Result};
use bitvec::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::InvalidInput;

/// The neighbor lists for a single direction offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjacencyRule {
    /// Neighbor offset `(dx, dy)` this rule constrains.
    pub offset: (isize, isize),
    /// `allowed[p]` lists the patterns permitted at `offset` from pattern `p`.
    pub allowed: Vec<Vec<usize>>,
}

/// Construction input for [`Adjacency`]: one [`AdjacencyRule`] per direction.
///
/// The direction set is whatever the caller provides; nothing here assumes
/// the four cardinals, and no symmetry between a rule and its opposite is
/// required or checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdjacencyLists {
    rules: Vec<AdjacencyRule>,
}

impl AdjacencyLists {
    /// An empty direction set.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add the neighbor lists for one direction.
    pub fn push(&mut self, offset: (isize, isize), allowed: Vec<Vec<usize>>) {
        self.rules.push(AdjacencyRule { offset, allowed });
    }

    /// The same neighbor lists in all four cardinal directions.
    pub fn cardinal(allowed: Vec<Vec<usize>>) -> Self {
        let mut lists = Self::new();
        for offset in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            lists.push(offset, allowed.clone());
        }
        lists
    }

    /// The rules in insertion order.
    pub fn rules(&self) -> &[AdjacencyRule] {
        &self.rules
    }

    /// Load lists from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("reading adjacency lists from {}", path.display()))?;
        let parsed = serde_yaml::from_str(&yaml)?;
        Ok(parsed)
    }

    /// Save the lists as a YAML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)
            .with_context(|| format!("writing adjacency lists to {}", path.display()))
    }
}

/// Per-direction pattern permission masks, read-only once built.
///
/// `mask(d, p)[q]` is true iff pattern `q` may appear at `directions()[d]`
/// from pattern `p`.
#[derive(Debug, Clone)]
pub struct Adjacency {
    num_patterns: usize,
    directions: Vec<(isize, isize)>,
    masks: Vec<Vec<BitVec>>,
}

impl Adjacency {
    /// Compile neighbor lists into dense permission masks.
    ///
    /// Fails with [`InvalidInput`] if any direction's list does not cover
    /// exactly `num_patterns` patterns, any listed index is out of range, or
    /// an offset is duplicated or zero.
    pub fn new(num_patterns: usize, lists: &AdjacencyLists) -> Result<Self> {
        if num_patterns == 0 {
            return Err(InvalidInput::new("adjacency requires at least one pattern").into());
        }

        let mut directions = Vec::with_capacity(lists.rules().len());
        let mut masks = Vec::with_capacity(lists.rules().len());
        for rule in lists.rules() {
            if rule.offset == (0, 0) {
                return Err(InvalidInput::new("offset (0, 0) is not a neighbor").into());
            }
            if directions.contains(&rule.offset) {
                return Err(InvalidInput::new(format!(
                    "duplicate direction offset {:?}",
                    rule.offset
                ))
                .into());
            }
            if rule.allowed.len() != num_patterns {
                return Err(InvalidInput::new(format!(
                    "direction {:?} lists {} patterns, expected {num_patterns}",
                    rule.offset,
                    rule.allowed.len()
                ))
                .into());
            }

            let mut rows = Vec::with_capacity(num_patterns);
            for (pattern, neighbours) in rule.allowed.iter().enumerate() {
                let mut row = bitvec![0; num_patterns];
                for &neighbour in neighbours {
                    if neighbour >= num_patterns {
                        return Err(InvalidInput::new(format!(
                            "pattern index {neighbour} out of range in direction {:?}, entry {pattern}",
                            rule.offset
                        ))
                        .into());
                    }
                    row.set(neighbour, true);
                }
                rows.push(row);
            }
            directions.push(rule.offset);
            masks.push(rows);
        }

        Ok(Self {
            num_patterns,
            directions,
            masks,
        })
    }

    /// Number of distinct patterns the masks cover.
    pub fn num_patterns(&self) -> usize {
        self.num_patterns
    }

    /// The direction offsets, in construction order.
    pub fn directions(&self) -> &[(isize, isize)] {
        &self.directions
    }

    /// The patterns permitted at `directions()[direction]` from `pattern`.
    pub fn mask(&self, direction: usize, pattern: usize) -> &BitVec {
        &self.masks[direction][pattern]
    }

    /// Whether `neighbour` may appear at `directions()[direction]` from
    /// `pattern`.
    pub fn permits(&self, direction: usize, pattern: usize, neighbour: usize) -> bool {
        self.masks[direction][pattern][neighbour]
    }
}
