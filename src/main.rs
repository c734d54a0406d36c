use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match listing_harvester::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("listing-harvester: {error:#}");
            ExitCode::FAILURE
        }
    }
}
