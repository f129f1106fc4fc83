use std::time::Duration;

use stackops::{
    cli::AnsiStyles,
    models::{Operation, StackId},
    orchestration::StackManager,
    presentation::{StackView, ERROR_BADGE},
    StackopsError, StackopsResult,
};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(200);

const CONFIRMATIONS: &[&str] = &["y", "yes"];

//--------------------------------------------------------------------------------------------------
// Functions: Handlers
//--------------------------------------------------------------------------------------------------

pub async fn list_subcommand(manager: &StackManager) -> StackopsResult<()> {
    let stacks = manager.load().await?;
    if stacks.is_empty() {
        println!("no stacks registered");
        return Ok(());
    }

    manager.refresh_all(false).await;
    for view in manager.views() {
        print_stack_line(&view);
    }

    Ok(())
}

pub async fn status_subcommand(manager: &StackManager, id: StackId) -> StackopsResult<()> {
    manager.load().await?;
    manager.refresh_stack(id, false).await?;

    let view = manager.view(id).ok_or(StackopsError::StackNotFound(id))?;
    print_stack(&view);

    Ok(())
}

pub async fn operation_subcommand(
    manager: &StackManager,
    id: StackId,
    operation: Operation,
    wait: bool,
) -> StackopsResult<()> {
    manager.load().await?;

    // restart and build are only allowed once a snapshot shows the stack running
    manager.refresh_stack(id, false).await?;

    let result = manager.dispatch(id, operation).await?;
    if !result.output.is_empty() {
        print!("{}", result.output);
        if !result.output.ends_with('\n') {
            println!();
        }
    }

    if result.success {
        eprintln!("{}", result.message.valid());
    } else {
        eprintln!("{}", result.message.error());
        for (container, error) in manager.container_errors(id) {
            eprintln!("{} {}", container.literal(), error.invalid());
        }
    }

    if wait && operation.is_mutating() {
        wait_for_refreshes(manager, id).await;
        if let Some(view) = manager.view(id) {
            print_stack(&view);
        }
    }

    if !result.success {
        return Err(StackopsError::OperationFailed {
            stack_id: id,
            operation,
            message: result.message,
        });
    }

    Ok(())
}

pub async fn remove_subcommand(
    manager: &StackManager,
    id: StackId,
    yes: bool,
) -> StackopsResult<()> {
    manager.load().await?;
    let stack = manager
        .registry()
        .get(id)
        .ok_or(StackopsError::StackNotFound(id))?;

    if !yes {
        let prompt = format!(
            "remove stack {} ({}) from the registry? [y/N] ",
            stack.name.literal(),
            stack.path.placeholder()
        );

        if !confirm(&prompt).await? {
            println!("aborted");
            return Ok(());
        }
    }

    manager.remove(id).await?;
    println!("removed stack {}", stack.name.literal());

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

async fn confirm(prompt: &str) -> StackopsResult<bool> {
    let mut stdout = io::stdout();
    stdout.write_all(prompt.as_bytes()).await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(io::stdin()).read_line(&mut answer).await?;

    let answer = answer.trim().to_lowercase();
    Ok(CONFIRMATIONS.contains(&answer.as_str()))
}

async fn wait_for_refreshes(manager: &StackManager, id: StackId) {
    while !manager.pending_refreshes(id).is_empty() || manager.is_refreshing(id) {
        tokio::time::sleep(WAIT_POLL_INTERVAL).await;
    }
}

fn print_stack_line(view: &StackView) {
    let badge = view.badge();
    let mut line = format!(
        "{} {:>4}  {}  {}",
        badge.glyph,
        view.stack.id,
        view.stack.name.literal(),
        view.stack.path.placeholder()
    );

    if let Some(service) = &view.stack.service_name {
        line.push_str(&format!("  [{service}]"));
    }

    if !view.stack.is_active {
        line.push_str("  (inactive)");
    }

    if !view.errors.is_empty() {
        line.push_str(&format!("  {}", format!("{} errors", view.errors.len()).error()));
    }

    println!("{line}");
}

fn print_stack(view: &StackView) {
    let badge = view.badge();
    println!(
        "{} {} {}",
        badge.glyph,
        view.stack.name.header(),
        format!("({})", badge.label).placeholder()
    );

    println!("  path: {}", view.stack.path);
    if let Some(service) = &view.stack.service_name {
        println!("  service: {service}");
    }

    if let Some(description) = &view.stack.description {
        println!("  description: {description}");
    }

    let flags = view.stack.flag_args();
    if !flags.is_empty() {
        println!("  flags: {}", flags.join(" "));
    }

    if view.services.is_empty() {
        println!("  no containers");
    }

    for service in &view.services {
        println!(
            "  {} {}  {}  {}",
            service.badge.glyph,
            service.container_name.literal(),
            service.service_name,
            service.status.placeholder()
        );

        if let Some(error) = &service.error {
            println!("      {}", error.error());
        }
    }

    // errors for containers that no longer show up in the snapshot
    for (container, error) in &view.errors {
        if !view.services.iter().any(|s| &s.container_name == container) {
            println!(
                "  {} {}  {}",
                ERROR_BADGE.glyph,
                container.literal(),
                error.error()
            );
        }
    }
}
