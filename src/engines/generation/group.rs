use crate::engines::generation::genome::Genome;
use crate::types::{compare_fitness, fitness_key, GenerationId, GroupId};
use rand::Rng;
use std::cmp::Ordering;

/// Clustering flavour of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Distance-clustered, unbounded
    Species,
    /// Fixed partition with a maximum size
    Island { capacity: usize },
}

/// How a single group took a genome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupInsert {
    Rejected,
    /// The genome is now the best of this group
    GroupBest,
    Inserted,
}

/// A species or island: genomes kept in arrival order with cached best/worst
#[derive(Debug, Clone)]
pub struct Group<G: Genome> {
    id: GroupId,
    kind: GroupKind,
    genomes: Vec<G>,
    best: Option<usize>,
    worst: Option<usize>,
}

impl<G: Genome> Group<G> {
    pub(crate) fn species(id: GroupId) -> Self {
        Self::with_kind(id, GroupKind::Species)
    }

    pub(crate) fn island(id: GroupId, capacity: usize) -> Self {
        Self::with_kind(id, GroupKind::Island { capacity })
    }

    fn with_kind(id: GroupId, kind: GroupKind) -> Self {
        Self {
            id,
            kind,
            genomes: Vec::new(),
            best: None,
            worst: None,
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        match self.kind {
            GroupKind::Species => None,
            GroupKind::Island { capacity } => Some(capacity),
        }
    }

    pub fn is_full(&self) -> bool {
        self.capacity().map_or(false, |c| self.genomes.len() >= c)
    }

    /// Members in arrival order
    pub fn genomes(&self) -> &[G] {
        &self.genomes
    }

    pub fn contains(&self, generation_id: GenerationId) -> bool {
        self.genomes
            .iter()
            .any(|g| g.generation_id() == generation_id)
    }

    pub fn best_genome(&self) -> Option<&G> {
        self.best.map(|i| &self.genomes[i])
    }

    pub fn worst_genome(&self) -> Option<&G> {
        self.worst.map(|i| &self.genomes[i])
    }

    pub fn best_fitness(&self) -> Option<f64> {
        self.best_genome().and_then(|g| g.fitness())
    }

    pub fn worst_fitness(&self) -> Option<f64> {
        self.worst_genome().and_then(|g| g.fitness())
    }

    /// Most recently inserted member, used as the NEAT representative
    pub fn latest_genome(&self) -> Option<&G> {
        self.genomes.last()
    }

    pub fn random_genome<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&G> {
        if self.genomes.is_empty() {
            return None;
        }
        Some(&self.genomes[rng.gen_range(0..self.genomes.len())])
    }

    /// Two members at distinct positions
    pub fn two_random_genomes<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(&G, &G)> {
        let n = self.genomes.len();
        if n < 2 {
            return None;
        }
        let first = rng.gen_range(0..n);
        let mut second = rng.gen_range(0..n - 1);
        if second >= first {
            second += 1;
        }
        Some((&self.genomes[first], &self.genomes[second]))
    }

    /// Insert a copy of `genome`, retagged with this group's id
    ///
    /// Duplicated generation ids are rejected. A full island only accepts a genome
    /// strictly better than its worst member, which it then evicts.
    pub fn insert(&mut self, genome: &G) -> GroupInsert {
        if self.contains(genome.generation_id()) {
            return GroupInsert::Rejected;
        }

        if self.is_full() {
            let Some(worst) = self.worst else {
                return GroupInsert::Rejected;
            };
            if compare_fitness(genome.fitness(), self.genomes[worst].fitness()) != Ordering::Less {
                return GroupInsert::Rejected;
            }
            self.genomes.remove(worst);
        }

        let mut copy = genome.clone();
        copy.set_group_id(self.id);
        self.genomes.push(copy);
        self.refresh_extremes();

        if self.best == Some(self.genomes.len() - 1) {
            GroupInsert::GroupBest
        } else {
            GroupInsert::Inserted
        }
    }

    fn refresh_extremes(&mut self) {
        self.best = None;
        self.worst = None;
        for (i, genome) in self.genomes.iter().enumerate() {
            let key = fitness_key(genome.fitness());
            // Ties favour the newest member for best and the oldest for worst
            match self.best {
                Some(b) if key > fitness_key(self.genomes[b].fitness()) => {}
                _ => self.best = Some(i),
            }
            match self.worst {
                Some(w) if key <= fitness_key(self.genomes[w].fitness()) => {}
                _ => self.worst = Some(i),
            }
        }
    }
}
