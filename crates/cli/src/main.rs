use anyhow::Result;

fn main() -> Result<()> {
    layerkit_cli::main_entry()
}
