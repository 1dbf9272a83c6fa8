use medrag_config::Config;

/// Writes the config template to `~/medrag/config.json`.
#[derive(Debug, Clone, Copy)]
pub struct InitStrategy;

impl super::CommandStrategy for InitStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config_path = Config::create_config()?;

        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Next steps:");
        println!("   1. Edit the config file and add your OpenAI API key");
        println!("      (or export OPENAI_API_KEY)");
        println!("   2. Point index.path at a built document index directory");
        println!("      containing index.vec and index.json");
        println!("   3. Run 'medrag serve' and open http://localhost:5000");
        println!();
        Ok(())
    }
}
