use distevo::config::{AppConfig, ConfigManager, StrategyKind, TransportKind};
use distevo::distributed::run_local;
use distevo::engines::generation::fitness_log::{fitness_log_header, FITNESS_LOG_FILE, GLOBAL_BEST_FILE};
use distevo::engines::generation::{Genome, NetworkGenome};
use std::sync::{Arc, Mutex};

#[test]
fn test_config_round_trip_and_env_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("distevo.toml");

    let manager = ConfigManager::new();
    manager
        .update(|c| {
            c.speciation.strategy = StrategyKind::Neat;
            c.speciation.species_threshold = 0.75;
            c.evolution.seed = Some(99);
        })
        .unwrap();
    manager.save_to_file(&path).unwrap();

    let reloaded = ConfigManager::new();
    reloaded.load_from_file(&path).unwrap();
    assert_eq!(reloaded.get().unwrap(), manager.get().unwrap());

    std::env::set_var("DISTEVO_EVOLUTION__MAX_GENOMES", "17");
    let overridden = ConfigManager::new();
    let loaded = overridden.load_from_file(&path);
    std::env::remove_var("DISTEVO_EVOLUTION__MAX_GENOMES");
    loaded.unwrap();
    assert_eq!(overridden.get().unwrap().evolution.max_genomes, 17);
}

#[test]
fn test_missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ConfigManager::new();
    assert!(manager.load_from_file(dir.path().join("absent.toml")).is_err());
}

#[test]
fn test_neat_run_writes_fitness_log_and_global_best() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.evolution.max_genomes = 20;
    config.evolution.seed = Some(7);
    config.evolution.output_directory = Some(dir.path().to_path_buf());
    config.speciation.strategy = StrategyKind::Neat;
    config.speciation.species_threshold = 1.5;
    config.distributed.worker_count = 2;
    assert_eq!(config.distributed.transport, TransportKind::Local);
    config.validate().unwrap();

    let engine = Arc::new(Mutex::new(config.build_engine().unwrap()));
    let summary = run_local(Arc::clone(&engine), 2, |_| config.trainer()).unwrap();
    assert_eq!(summary.coordinator.genomes_inserted, 20);
    assert!(summary.coordinator.new_global_bests >= 1);

    let log = std::fs::read_to_string(dir.path().join(FITNESS_LOG_FILE)).unwrap();
    let mut lines = log.lines();
    let header = lines.next().unwrap();
    assert_eq!(header, fitness_log_header("species"));
    let columns = header.split(',').count();

    let mut insertions = std::collections::BTreeSet::new();
    for line in lines {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), columns);
        insertions.insert(fields[1].parse::<u64>().unwrap());
    }
    assert_eq!(insertions, (1..=20).collect());

    let bytes = std::fs::read(dir.path().join(GLOBAL_BEST_FILE)).unwrap();
    let written = NetworkGenome::from_bytes(&bytes).unwrap();
    let engine = engine.lock().unwrap();
    let best = engine.best_genome().unwrap();
    assert!(written.fitness().is_some());
    assert_eq!(written.fitness(), best.fitness());
}
