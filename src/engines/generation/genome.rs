use crate::error::Result;
use crate::types::{GenerationId, GroupId, Lineage};

/// Unit of selection handled by the speciation strategies
///
/// The population engine never looks inside a genome. It only needs:
/// - identity (`generation_id`) and the group it belongs to (`group_id`)
/// - its validation error (`fitness`, lower is better, `None` until trained)
/// - an innovation signature for genomic distance
/// - a structural validity check
/// - a self-describing byte encoding for the wire
///
/// Genomes are values: strategies clone on insert and hand out owned genomes on
/// generation, so nothing is shared between a group and a genome in flight.
pub trait Genome: Clone + Send + 'static {
    fn generation_id(&self) -> GenerationId;
    fn set_generation_id(&mut self, id: GenerationId);

    fn group_id(&self) -> GroupId;
    fn set_group_id(&mut self, id: GroupId);

    fn fitness(&self) -> Option<f64>;

    fn lineage(&self) -> Lineage;
    fn set_lineage(&mut self, lineage: Lineage);

    /// Structural identifiers in ascending order
    fn innovation_signature(&self) -> Vec<i32>;

    /// Weight carried by the gene with this innovation number, if the genome exposes weights
    fn innovation_weight(&self, _innovation: i32) -> Option<f64> {
        None
    }

    /// True when no directed path leads from an input to every output
    fn is_output_unreachable(&self) -> bool;

    fn to_bytes(&self) -> Result<Vec<u8>>;
    fn from_bytes(bytes: &[u8]) -> Result<Self>;
}
