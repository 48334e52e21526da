use miette::Result;

use artipush_core::step::PublishStep;
use artipush_ops::Publisher;
use artipush_util::errors::PublishError;

pub fn exec(json: bool) -> Result<()> {
    let docs = Publisher::documentation();

    if json {
        let out = serde_json::to_string_pretty(&docs).map_err(|e| PublishError::Generic {
            message: format!("Failed to serialize documentation: {e}"),
        })?;
        println!("{out}");
        return Ok(());
    }

    println!("{}", console::style(docs.description).bold());
    println!();
    println!("Fields:");
    for field in &docs.fields {
        println!("  {:<8} {}", console::style(field.name).cyan(), field.summary);
    }
    println!();
    println!("Output: {}", docs.output);
    println!();
    println!("Example:");
    for line in docs.example.trim().lines() {
        println!("  {line}");
    }
    Ok(())
}
