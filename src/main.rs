use anyhow::Context;
use distevo::config::{AppConfig, ConfigManager, Role, TransportKind};
use distevo::distributed::{run_local, Coordinator, TcpTransport, Worker};
use distevo::engines::generation::{EvolutionEngine, Genome, LogProgressCallback, NetworkGenome};
use std::net::TcpListener;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{:#}", error);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let manager = ConfigManager::new();
    if let Some(path) = std::env::args().nth(1) {
        manager
            .load_from_file(&path)
            .with_context(|| format!("loading configuration from {}", path))?;
    }
    let config = manager.get()?;

    match (config.distributed.transport, config.distributed.role) {
        (TransportKind::Local, _) => run_in_process(&config),
        (TransportKind::Tcp, Role::Coordinator) => run_tcp_coordinator(&config),
        (TransportKind::Tcp, Role::Worker) => run_tcp_worker(&config),
    }
}

fn run_in_process(config: &AppConfig) -> anyhow::Result<()> {
    let engine = config.build_engine()?.with_callback(LogProgressCallback::default());
    let engine = Arc::new(Mutex::new(engine));

    let summary = run_local(Arc::clone(&engine), config.distributed.worker_count, |_| config.trainer())?;
    log::info!(
        "run complete: {} genomes inserted, {} new global bests",
        summary.coordinator.genomes_inserted,
        summary.coordinator.new_global_bests
    );
    report_best(&engine)
}

fn run_tcp_coordinator(config: &AppConfig) -> anyhow::Result<()> {
    let settings = &config.distributed;
    let engine = config.build_engine()?.with_callback(LogProgressCallback::default());
    let engine = Arc::new(Mutex::new(engine));

    let listener = TcpListener::bind(&settings.bind_address)
        .with_context(|| format!("binding {}", settings.bind_address))?;
    log::info!("waiting for {} workers on {}", settings.worker_count, settings.bind_address);
    let transport = TcpTransport::coordinator(listener, settings.worker_count, settings.max_frame_bytes)?;

    Coordinator::new(transport, Arc::clone(&engine))?.run()?;
    report_best(&engine)
}

fn run_tcp_worker(config: &AppConfig) -> anyhow::Result<()> {
    let settings = &config.distributed;
    let transport = TcpTransport::worker(
        settings.coordinator_address.as_str(),
        settings.connect_attempts,
        Duration::from_millis(settings.connect_retry_ms),
        settings.max_frame_bytes,
    )
    .with_context(|| format!("connecting to {}", settings.coordinator_address))?;

    let stats = Worker::<NetworkGenome, _, _>::new(transport, config.trainer()).run()?;
    log::info!(
        "worker done: {} genomes trained, best fitness {:?}",
        stats.genomes_trained,
        stats.best_fitness
    );
    Ok(())
}

fn report_best<G: Genome>(engine: &Arc<Mutex<EvolutionEngine<G>>>) -> anyhow::Result<()> {
    let engine = engine
        .lock()
        .map_err(|_| anyhow::anyhow!("evolution engine lock poisoned"))?;
    engine.strategy().log_population();
    match engine.best_genome() {
        Some(best) => log::info!(
            "best genome {} (group {}, {}) fitness {:?}",
            best.generation_id(),
            best.group_id(),
            best.lineage(),
            best.fitness()
        ),
        None => log::warn!("no trained genome was inserted"),
    }
    Ok(())
}
