fn main() -> anyhow::Result<()> {
    arena_bot::run()
}
