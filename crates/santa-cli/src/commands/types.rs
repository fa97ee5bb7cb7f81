//! List registered generator types.

use anyhow::Result;
use colored::Colorize;
use santa_generators::Registry;

pub fn run(keys: bool) -> Result<()> {
    let registry = Registry::with_defaults();

    for type_name in registry.list_types() {
        if keys {
            let generator = registry.get(&type_name)?;
            println!("{}  {}", type_name.cyan(), generator.output_keys().join(", "));
        } else {
            println!("{}", type_name);
        }
    }
    Ok(())
}
