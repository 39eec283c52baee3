use anyhow::{bail, Context, Result};

use journal_lib::storage::{PersistenceService, Template};

use crate::app::App;
use crate::OutputFormat;

pub fn run_list(app: &App, format: &OutputFormat) -> Result<()> {
    let templates = app
        .storage
        .list_templates()
        .context("Failed to list templates")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&templates)?);
        }
        OutputFormat::Plain => {
            if templates.is_empty() {
                println!("No templates.");
                return Ok(());
            }
            let name_w = templates.iter().map(|t| t.name.len()).max().unwrap_or(4).min(30);
            for t in &templates {
                let first_line = t.content.lines().next().unwrap_or("");
                println!("{:<name_w$}  {}", t.name, first_line, name_w = name_w);
            }
        }
    }

    Ok(())
}

pub fn run_new(app: &App, name: &str, content: Option<String>, format: &OutputFormat) -> Result<()> {
    let Some(content) = content else {
        bail!("Template content is required: pass --content or pipe it on stdin");
    };
    let template = app
        .storage
        .create_template(Template::new(name, content)?)
        .context("Failed to create template")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&template)?);
        }
        OutputFormat::Plain => {
            println!("Created template \"{}\"", template.name);
            println!("  ID: {}", template.id);
        }
    }

    Ok(())
}

pub fn run_delete(app: &App, name: &str, format: &OutputFormat) -> Result<()> {
    let template = app.find_template(name)?;
    app.storage
        .delete_template(template.id)
        .context("Failed to delete template")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "deleted": template.id.to_string() });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Deleted template \"{}\"", template.name);
        }
    }

    Ok(())
}
