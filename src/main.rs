mod cli;
mod script;

fn main() -> anyhow::Result<()> {
    cli::run()
}
