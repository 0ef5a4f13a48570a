//! Minimal recurrent-network genome used by the binary and the test-suite.
//!
//! Edges carry innovation numbers derived from their endpoints, so the same structural
//! change made independently in two lineages lines up during crossover and distance
//! computation without a global innovation registry.

use crate::engines::generation::genome::Genome;
use crate::engines::generation::operators::GenomeOperators;
use crate::error::Result;
use crate::types::{GenerationId, GroupId, Lineage};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};

const HIDDEN_NODE_BASE: u64 = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Input,
    Hidden,
    Output,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGene {
    pub id: u32,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeGene {
    pub innovation: i32,
    pub input: u32,
    pub output: u32,
    pub weight: f64,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkGenome {
    generation_id: GenerationId,
    group_id: GroupId,
    fitness: Option<f64>,
    lineage: Lineage,
    nodes: Vec<NodeGene>,
    /// Sorted by innovation number
    edges: Vec<EdgeGene>,
}

/// Innovation number of the edge `input -> output` (Cantor pairing)
pub fn edge_innovation(input: u32, output: u32) -> i32 {
    // Pairing of two u32 ids needs up to 65 bits
    let (a, b) = (input as u128, output as u128);
    let paired = (a + b) * (a + b + 1) / 2 + b;
    (paired % i32::MAX as u128) as i32
}

fn split_node_id(innovation: i32) -> u32 {
    let span = u32::MAX as u64 - HIDDEN_NODE_BASE;
    (HIDDEN_NODE_BASE + innovation as u64 % span) as u32
}

impl NetworkGenome {
    /// Fully connected input -> output network
    pub fn minimal(number_inputs: usize, number_outputs: usize) -> Self {
        let mut nodes = Vec::with_capacity(number_inputs + number_outputs);
        for i in 0..number_inputs {
            nodes.push(NodeGene { id: i as u32, kind: NodeKind::Input });
        }
        for o in 0..number_outputs {
            nodes.push(NodeGene {
                id: (number_inputs + o) as u32,
                kind: NodeKind::Output,
            });
        }

        let mut genome = Self {
            generation_id: 0,
            group_id: 0,
            fitness: None,
            lineage: Lineage::Seed,
            nodes,
            edges: Vec::new(),
        };
        for i in 0..number_inputs as u32 {
            for o in 0..number_outputs as u32 {
                genome.push_edge(i, number_inputs as u32 + o, 1.0);
            }
        }
        genome
    }

    pub fn set_fitness(&mut self, fitness: Option<f64>) {
        self.fitness = fitness;
    }

    pub fn nodes(&self) -> &[NodeGene] {
        &self.nodes
    }

    pub fn edges(&self) -> &[EdgeGene] {
        &self.edges
    }

    pub fn edges_mut(&mut self) -> &mut [EdgeGene] {
        &mut self.edges
    }

    pub fn hidden_node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.kind == NodeKind::Hidden).count()
    }

    pub fn enabled_edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.enabled).count()
    }

    fn has_node(&self, id: u32) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    fn node_kind(&self, id: u32) -> Option<NodeKind> {
        self.nodes.iter().find(|n| n.id == id).map(|n| n.kind)
    }

    /// Add an edge unless one with the same endpoints already exists
    fn push_edge(&mut self, input: u32, output: u32, weight: f64) -> bool {
        let innovation = edge_innovation(input, output);
        match self.edges.binary_search_by_key(&innovation, |e| e.innovation) {
            Ok(_) => false,
            Err(pos) => {
                self.edges.insert(
                    pos,
                    EdgeGene {
                        innovation,
                        input,
                        output,
                        weight,
                        enabled: true,
                    },
                );
                true
            }
        }
    }

    fn add_edge(&mut self, rng: &mut StdRng) -> bool {
        let sources: Vec<u32> = self
            .nodes
            .iter()
            .filter(|n| n.kind != NodeKind::Output)
            .map(|n| n.id)
            .collect();
        let targets: Vec<u32> = self
            .nodes
            .iter()
            .filter(|n| n.kind != NodeKind::Input)
            .map(|n| n.id)
            .collect();
        if sources.is_empty() || targets.is_empty() {
            return false;
        }
        let input = sources[rng.gen_range(0..sources.len())];
        let output = targets[rng.gen_range(0..targets.len())];
        if input == output {
            return false;
        }
        self.push_edge(input, output, rng.gen_range(-1.0..1.0))
    }

    fn split_edge(&mut self, rng: &mut StdRng) -> bool {
        let enabled: Vec<usize> = (0..self.edges.len()).filter(|&i| self.edges[i].enabled).collect();
        if enabled.is_empty() {
            return false;
        }
        let idx = enabled[rng.gen_range(0..enabled.len())];
        let EdgeGene { innovation, input, output, weight, .. } = self.edges[idx].clone();
        let hidden = split_node_id(innovation);
        if self.has_node(hidden) {
            return false;
        }

        self.edges[idx].enabled = false;
        self.nodes.push(NodeGene { id: hidden, kind: NodeKind::Hidden });
        self.push_edge(input, hidden, 1.0);
        self.push_edge(hidden, output, weight);
        true
    }

    fn perturb_weight(&mut self, rng: &mut StdRng) -> bool {
        if self.edges.is_empty() {
            return false;
        }
        let idx = rng.gen_range(0..self.edges.len());
        self.edges[idx].weight += rng.gen_range(-0.5..0.5);
        true
    }

    fn toggle_edge(&mut self, rng: &mut StdRng) -> bool {
        if self.edges.is_empty() {
            return false;
        }
        let idx = rng.gen_range(0..self.edges.len());
        self.edges[idx].enabled = !self.edges[idx].enabled;
        true
    }

    /// Apply between 1 and `max_mutations` structural or weight mutations
    pub fn mutate(&mut self, max_mutations: u32, rng: &mut StdRng) {
        let count = rng.gen_range(1..=max_mutations.max(1));
        let mut applied = 0;
        let mut attempts = 0;
        while applied < count && attempts < count * 10 {
            attempts += 1;
            let changed = match rng.gen_range(0..4) {
                0 => self.add_edge(rng),
                1 => self.split_edge(rng),
                2 => self.perturb_weight(rng),
                _ => self.toggle_edge(rng),
            };
            if changed {
                applied += 1;
            }
        }
        self.fitness = None;
    }

    /// NEAT-style crossover: matching genes from either parent, disjoint and excess
    /// genes from the fitter parent only
    pub fn crossover(more_fit: &Self, less_fit: &Self, rng: &mut StdRng) -> Self {
        let other: BTreeMap<i32, &EdgeGene> =
            less_fit.edges.iter().map(|e| (e.innovation, e)).collect();

        let mut child = Self {
            generation_id: 0,
            group_id: more_fit.group_id,
            fitness: None,
            lineage: Lineage::IntraGroupCrossover,
            nodes: more_fit.nodes.clone(),
            edges: Vec::with_capacity(more_fit.edges.len()),
        };

        for edge in &more_fit.edges {
            let gene = match other.get(&edge.innovation) {
                Some(matching) if rng.gen_bool(0.5) => (*matching).clone(),
                _ => edge.clone(),
            };
            child.edges.push(gene);
        }

        // Hidden nodes borrowed through matching genes must exist in the child
        for edge in &child.edges {
            for id in [edge.input, edge.output] {
                if !child.nodes.iter().any(|n| n.id == id) {
                    if let Some(kind) = less_fit.node_kind(id) {
                        child.nodes.push(NodeGene { id, kind });
                    }
                }
            }
        }
        child
    }
}

impl Genome for NetworkGenome {
    fn generation_id(&self) -> GenerationId {
        self.generation_id
    }

    fn set_generation_id(&mut self, id: GenerationId) {
        self.generation_id = id;
    }

    fn group_id(&self) -> GroupId {
        self.group_id
    }

    fn set_group_id(&mut self, id: GroupId) {
        self.group_id = id;
    }

    fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    fn lineage(&self) -> Lineage {
        self.lineage
    }

    fn set_lineage(&mut self, lineage: Lineage) {
        self.lineage = lineage;
    }

    fn innovation_signature(&self) -> Vec<i32> {
        self.edges.iter().map(|e| e.innovation).collect()
    }

    fn innovation_weight(&self, innovation: i32) -> Option<f64> {
        self.edges
            .binary_search_by_key(&innovation, |e| e.innovation)
            .ok()
            .map(|i| self.edges[i].weight)
    }

    fn is_output_unreachable(&self) -> bool {
        let mut reached: HashSet<u32> = HashSet::new();
        let mut queue: VecDeque<u32> = self
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Input)
            .map(|n| n.id)
            .collect();
        reached.extend(queue.iter().copied());

        while let Some(node) = queue.pop_front() {
            for edge in self.edges.iter().filter(|e| e.enabled && e.input == node) {
                if reached.insert(edge.output) {
                    queue.push_back(edge.output);
                }
            }
        }

        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Output)
            .any(|n| !reached.contains(&n.id))
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Reproduction operators for [`NetworkGenome`]
pub fn network_operators(max_mutations: u32) -> GenomeOperators<NetworkGenome> {
    GenomeOperators::new(
        max_mutations,
        Box::new(|max: u32, genome: &mut NetworkGenome, rng: &mut StdRng| genome.mutate(max, rng)),
        Box::new(NetworkGenome::crossover),
    )
}
