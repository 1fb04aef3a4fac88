//! Layout engine core implementation.
//!
//! The pipeline is a chain of typed stages; each stage can only be produced
//! from the one before it, so a later stage never runs on missing input.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use super::finalize::finalize;
use super::intra::{ClusterSketch, settle_cluster};
use super::top_level::{TopNode, settle_top_level};
use super::types::{Layout, LayoutStage};
use crate::ast::Schema;
use crate::cluster::Partition;
use crate::config::LayoutConfig;
use crate::graph::Adjacency;

/// Layout engine configuration and computation.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    pub(crate) config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Compute the full layout for a normalized schema.
    pub fn layout(&self, schema: &Schema) -> Layout {
        self.settle_clusters(schema).settle_top_level().finalize()
    }

    /// Stage 1: arrange each group's members on their own.
    pub fn settle_clusters<'a>(&'a self, schema: &'a Schema) -> IntraClusterSettled<'a> {
        let seed = self.config.seed.unwrap_or_else(entropy_seed);
        let mut rng = StdRng::seed_from_u64(seed);

        // Phase 1: Structure
        let adjacency = Adjacency::build(schema);
        let partition = Partition::build(schema, &adjacency);
        let sizes: Vec<(f64, f64)> = schema
            .tables
            .iter()
            .map(|t| self.config.metrics.table_size(t))
            .collect();

        // Phase 2: Per-group simulation
        let sketches: Vec<ClusterSketch> = partition
            .clusters
            .iter()
            .map(|c| settle_cluster(c, &adjacency, &sizes, &self.config, &mut rng))
            .collect();

        debug!(
            seed,
            clusters = sketches.len(),
            standalone = partition.standalone.len(),
            "clusters settled"
        );

        IntraClusterSettled {
            config: &self.config,
            seed,
            rng,
            adjacency,
            partition,
            sizes,
            sketches,
        }
    }
}

/// Output of Stage 1.
pub struct IntraClusterSettled<'a> {
    config: &'a LayoutConfig,
    seed: u64,
    rng: StdRng,
    adjacency: Adjacency,
    partition: Partition,
    sizes: Vec<(f64, f64)>,
    sketches: Vec<ClusterSketch>,
}

impl<'a> IntraClusterSettled<'a> {
    pub fn stage(&self) -> LayoutStage {
        LayoutStage::IntraClusterSettled
    }

    pub fn sketches(&self) -> &[ClusterSketch] {
        &self.sketches
    }

    /// Stage 2: arrange groups and standalone tables.
    pub fn settle_top_level(mut self) -> TopLevelSettled<'a> {
        let top = settle_top_level(
            &self.partition,
            &self.adjacency,
            &self.sizes,
            &self.sketches,
            self.config,
            &mut self.rng,
        );
        debug!(nodes = top.len(), "top level settled");

        TopLevelSettled {
            config: self.config,
            seed: self.seed,
            adjacency: self.adjacency,
            partition: self.partition,
            sizes: self.sizes,
            top,
        }
    }
}

/// Output of Stage 2.
pub struct TopLevelSettled<'a> {
    config: &'a LayoutConfig,
    seed: u64,
    adjacency: Adjacency,
    partition: Partition,
    sizes: Vec<(f64, f64)>,
    top: Vec<TopNode>,
}

impl TopLevelSettled<'_> {
    pub fn stage(&self) -> LayoutStage {
        LayoutStage::TopLevelSettled
    }

    pub fn top_nodes(&self) -> &[TopNode] {
        &self.top
    }

    /// Stage 3: size group boxes, place members and separate leftovers.
    pub fn finalize(self) -> Layout {
        let layout = finalize(
            &self.partition,
            &self.adjacency,
            &self.sizes,
            &self.top,
            self.config,
            self.seed,
        );
        info!(
            seed = self.seed,
            nodes = layout.nodes.len(),
            "layout complete"
        );
        layout
    }
}

#[cfg(target_arch = "wasm32")]
fn entropy_seed() -> u64 {
    (js_sys::Math::random() * u64::MAX as f64) as u64
}

#[cfg(not(target_arch = "wasm32"))]
fn entropy_seed() -> u64 {
    rand::random()
}
