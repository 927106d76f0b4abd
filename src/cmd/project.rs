//! Project initialization — `tutor init`.

use anyhow::Result;
use tutor::tutor_config::TutorConfig;

pub fn cmd_init(config: &TutorConfig) -> Result<()> {
    use tutor::init::{init_project, is_initialized};

    let was_initialized = is_initialized(&config.project_dir);
    let result = init_project(&config.project_dir)?;

    if result.created {
        println!(
            "Initialized tutor project at {}",
            result.tutor_dir.display()
        );
        println!();
        println!("Created directory structure:");
        println!("  .tutor/");
        println!("  ├── sessions/     # Conversation sessions (use `tutor say`)");
        println!("  └── logs/         # Log files when [logging] file = true");
        println!();
        println!("Next steps:");
        println!("  1. Run `tutor config init` to configure the digestion backend");
        println!("  2. Record turns with `tutor say` and phases with `tutor advance`");
        println!("  3. Run `tutor context` to build the bounded context");
    } else if was_initialized {
        println!(
            "Tutor project already initialized at {}",
            result.tutor_dir.display()
        );
        println!("Directory structure verified.");
    } else {
        println!(
            "Completed tutor initialization at {}",
            result.tutor_dir.display()
        );
    }

    Ok(())
}
