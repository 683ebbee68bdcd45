use clap::Subcommand;
use focusloop_core::{Database, Engine, StatusFilter};

use super::print_json;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a new task
    Add {
        /// Task name
        name: String,
        /// Estimated number of work intervals
        #[arg(long, default_value = "1")]
        estimate: u32,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// List tasks
    List {
        /// active, completed or all
        #[arg(long, default_value = "active")]
        status: StatusFilter,
        /// Only tasks carrying this tag
        #[arg(long)]
        tag: Option<String>,
    },
    /// Mark a task as completed
    Complete {
        /// Task ID
        id: String,
    },
}

pub fn run(action: TaskAction, engine: &Engine<Database>) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TaskAction::Add {
            name,
            estimate,
            tags,
        } => {
            let task = engine.add_task(&name, Some(estimate), &tags)?;
            print_json(&task)?;
        }
        TaskAction::List { status, tag } => {
            let tasks = engine.list_tasks(status, tag.as_deref())?;
            print_json(&tasks)?;
        }
        TaskAction::Complete { id } => {
            let task = engine.complete_task(&id)?;
            print_json(&task)?;
        }
    }
    Ok(())
}
