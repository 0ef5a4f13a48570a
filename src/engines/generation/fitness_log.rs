use crate::engines::generation::genome::Genome;
use crate::engines::generation::strategy::{format_fitness, SpeciationStrategy};
use crate::error::Result;
use chrono::{SecondsFormat, Utc};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const FITNESS_LOG_FILE: &str = "fitness_log.csv";
pub const GLOBAL_BEST_FILE: &str = "global_best_genome.bin";

/// Run artefacts written under the output directory
///
/// Long format: every insertion appends one row per group, so the column set stays
/// fixed while NEAT founds and drops species.
pub struct FitnessLog {
    directory: PathBuf,
    file: File,
}

/// Column names of [`FITNESS_LOG_FILE`] for a strategy labelling its groups `label`
pub fn fitness_log_header(label: &str) -> String {
    format!(
        "timestamp,inserted,generated,best_fitness,worst_fitness,{0}_id,{0}_size,{0}_best_fitness,{0}_worst_fitness",
        label
    )
}

impl FitnessLog {
    pub fn create<G: Genome>(directory: &Path, strategy: &dyn SpeciationStrategy<G>) -> Result<Self> {
        fs::create_dir_all(directory)?;
        let mut file = File::create(directory.join(FITNESS_LOG_FILE))?;
        writeln!(file, "{}", fitness_log_header(strategy.group_label()))?;
        Ok(Self {
            directory: directory.to_path_buf(),
            file,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn append<G: Genome>(&mut self, strategy: &dyn SpeciationStrategy<G>) -> Result<()> {
        let prefix = format!(
            "{},{},{},{},{}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            strategy.evaluated_genomes(),
            strategy.generated_genomes(),
            format_fitness(strategy.best_fitness()),
            format_fitness(strategy.worst_fitness()),
        );
        for group in strategy.groups() {
            writeln!(
                self.file,
                "{},{},{},{},{}",
                prefix,
                group.id(),
                group.len(),
                format_fitness(group.best_fitness()),
                format_fitness(group.worst_fitness())
            )?;
        }
        self.file.flush()?;
        Ok(())
    }

    pub fn write_global_best<G: Genome>(&self, genome: &G) -> Result<PathBuf> {
        let path = self.directory.join(GLOBAL_BEST_FILE);
        fs::write(&path, genome.to_bytes()?)?;
        Ok(path)
    }
}
