fn main() -> anyhow::Result<()> {
    themekeeper::run()?;
    Ok(())
}
