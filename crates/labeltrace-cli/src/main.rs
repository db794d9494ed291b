#[tokio::main]
async fn main() -> anyhow::Result<()> {
    labeltrace_cli::run(std::env::args_os()).await
}
