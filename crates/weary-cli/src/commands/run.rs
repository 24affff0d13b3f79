use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};

use weary_engine::Engine;

use crate::error::CliError;
use crate::io;

pub fn handle_run(
    file: PathBuf,
    threads: Option<usize>,
    output: Option<PathBuf>,
    report: bool,
    progress: bool,
) -> Result<(), CliError> {
    let spec = io::read_tree(&file)?;
    let mut root = io::into_node(spec)?;

    let threads = threads.unwrap_or_else(num_cpus::get);
    log::info!("evaluating {} with {threads} worker(s)", file.display());
    let mut engine = Engine::new(threads)?;

    let bar = progress.then(|| {
        let bar = ProgressBar::new(root.unresolved_count() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{bar:40.green} {pos}/{len} nodes")
                .unwrap(),
        );
        bar
    });

    let outcome = engine.run_with(&mut root, |_| {
        if let Some(bar) = &bar {
            bar.inc(1);
        }
    });
    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }
    outcome?;

    let result = root.matrix().ok_or(CliError::Shape {
        message: "evaluation finished without a materialized root".to_string(),
    })?;
    let output = output.unwrap_or_else(|| io::default_output(&file));
    io::write_matrix(&output, result)?;
    println!(
        "{} rows x {} columns -> {}",
        result.len(),
        result.first().map_or(0, Vec::len),
        output.display()
    );

    if report {
        eprintln!("{}", engine.worker_report());
    }
    Ok(())
}
