use fvwave::cli::Args;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = match Args::cli_setup("wave") {
        Ok(args) => args,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = args.run_dimension();
    args.finish();
    match result {
        Ok(summary) => {
            tracing::info!(
                "Finished {} steps at Time = {} with {} checkpoints in {:.3} s",
                summary.steps,
                summary.final_time_name,
                summary.checkpoints,
                summary.elapsed.as_secs_f64()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
