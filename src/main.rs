pub fn main() -> miette::Result<()> {
    stager::cli::execute()
}
