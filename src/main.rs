fn main() -> anyhow::Result<()> {
    request_lens::run()
}
