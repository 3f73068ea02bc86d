//! One-shot subcommands: load, act through the controller, settle, print.

use anyhow::{Context, Result, bail};
use chrono::Local;
use console::style;
use task_list_controller::{ControllerError, Task, TaskForm, TaskListController};
use task_store_client::TaskId;
use tracing::warn;

pub async fn list(controller: &mut TaskListController) -> Result<()> {
    load(controller).await;
    print_tasks(controller);
    Ok(())
}

pub async fn add(
    controller: &mut TaskListController,
    title: String,
    description: String,
    image_url: String,
) -> Result<()> {
    load(controller).await;

    *controller.create_form_mut() = TaskForm::new(title, description, image_url);
    let id = match controller.submit_create() {
        Ok(id) => id,
        Err(ControllerError::Invalid(errors)) => {
            for error in errors.iter() {
                eprintln!("{} {}", style("✗").red().bold(), error);
            }
            bail!("Task not created");
        }
        Err(e) => return Err(e.into()),
    };

    controller.settle().await;
    println!("{} Created task {}", style("✓").green().bold(), style(&id).cyan());
    print_tasks(controller);
    Ok(())
}

pub async fn toggle(controller: &mut TaskListController, id: TaskId) -> Result<()> {
    load(controller).await;

    let index = find(controller, &id)?;
    let status = controller
        .toggle(index)
        .with_context(|| format!("Failed to toggle task {id}"))?;

    controller.settle().await;
    println!(
        "{} {} {}",
        status.glyph(),
        style(&id).cyan(),
        status.toggle_label()
    );
    print_tasks(controller);
    Ok(())
}

pub async fn delete(controller: &mut TaskListController, id: TaskId) -> Result<()> {
    load(controller).await;

    let index = find(controller, &id)?;
    controller
        .delete(index)
        .with_context(|| format!("Failed to delete task {id}"))?;

    controller.settle().await;
    println!("{} Deleted task {}", style("✓").green().bold(), style(&id).cyan());
    print_tasks(controller);
    Ok(())
}

/// A failed load leaves the list empty; the command carries on.
async fn load(controller: &mut TaskListController) {
    if let Err(e) = controller.load().await {
        warn!(error = %e, "Continuing without the remote list");
        eprintln!("{} Could not load tasks: {}", style("!").yellow().bold(), e);
    }
}

fn find(controller: &TaskListController, id: &TaskId) -> Result<usize> {
    match controller.position_of(id) {
        Some(index) => Ok(index),
        None => bail!("No task with id {id}"),
    }
}

fn print_tasks(controller: &TaskListController) {
    if controller.tasks().is_empty() {
        println!("{}", style("No tasks").dim());
        return;
    }
    for task in controller.tasks() {
        println!("{}", format_task(task));
    }
}

fn format_task(task: &Task) -> String {
    let id = task.id().map_or_else(|| "-".to_string(), ToString::to_string);
    let title = if task.is_completed() {
        style(task.title()).dim()
    } else {
        style(task.title()).bold()
    };
    format!(
        "{} {} {} - {} {}",
        task.presentation().glyph,
        style(format!("[{id}]")).cyan(),
        title,
        task.description(),
        style(task.created_at().with_timezone(&Local).format("%Y-%m-%d %H:%M")).dim()
    )
}
