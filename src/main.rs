fn main() -> anyhow::Result<()> {
    audioshelf_lib::run()
}
