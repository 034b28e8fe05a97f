use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use rtv::cli::CliArgs;
use rtv::controller::Controller;
use rtv::domain::TVError;
use rtv::logging;
use rtv::model::{Model, Status};
use rtv::store::{HttpSource, RecordStore};
use rtv::ui::TableUI;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let log_path = match logging::init(&args.log_file, args.verbose) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!("Starting rtv, logging to {}", log_path.display());

    let result = run(&args);
    ratatui::restore();
    match result {
        Err(e) => {
            error!("rtv stopped: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: &CliArgs) -> Result<(), TVError> {
    let cfg = args.to_config();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    let source = HttpSource::new(&cfg)?;
    let store = RecordStore::new(Arc::new(source), runtime.handle().clone());

    let mut terminal = ratatui::init();
    let size = terminal.size()?;
    let mut model = Model::init(&cfg, store, size.width as usize);
    if let Some(resource) = &args.resource {
        model.open(resource);
    }
    let mut ui = TableUI::new(&cfg);
    let controller = Controller::new(&cfg);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }

    info!("Bye");
    Ok(())
}
