fn main() -> anyhow::Result<()> {
    tpkforge::cli::run_cli()
}
