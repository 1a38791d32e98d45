use anyhow::Result;
use remote_tree_explorer::app::{self, events::IpcMessage, events::UserEvent, state::AppState};
use remote_tree_explorer::backend::HttpFileService;
use remote_tree_explorer::config::{self, AppConfig};
use remote_tree_explorer::utils::clipboard::Osc52Clipboard;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const HELP: &str = "\
Navigation:  cd <path> | up | ls | refresh | tree | expand <path> | collapse <path>
Sorting:     sort <name|size|modified>
Search:      find <query> | search <query> | clear-search
Selection:   select <path> | unselect <path> | clear-selection
Copy:        options | depth <n> | sizes | dates | colors | copy
Files:       preview <path> | mkdir <name> | rename <path> <name> | rm <path>
             mv <path> <folder> | cp <path> <folder>
             quit";

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they do not interleave with the listing output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });
    tracing::info!("Using file service at {}", config.backend_url);

    let backend = Arc::new(HttpFileService::new(
        config.backend_url.clone(),
        config.request_timeout(),
    ));
    let state = Arc::new(Mutex::new(AppState::new(
        config,
        backend,
        Arc::new(Osc52Clipboard),
    )));

    let (proxy, mut events) = mpsc::unbounded_channel::<UserEvent>();
    let printer = tokio::spawn(async move {
        let mut last_status = String::new();
        while let Some(event) = events.recv().await {
            print_event(event, &mut last_status);
        }
    });

    app::dispatch(command("initialize", Value::Null), proxy.clone(), state.clone()).await;
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match verb {
            "quit" | "exit" => break,
            "help" => println!("{HELP}"),
            "ls" => print_listing(&state),
            "tree" => {
                let mode = if app::helpers::lock_state(&state).view_mode.is_recursive() {
                    "list"
                } else {
                    "recursive"
                };
                run(&state, &proxy, "set_view_mode", json!({ "mode": mode })).await;
                print_listing(&state);
            }
            "cd" if rest == ".." => {
                run(&state, &proxy, "go_up", Value::Null).await;
                print_listing(&state);
            }
            "cd" => {
                let path = resolve(&state, rest);
                run(&state, &proxy, "navigate", json!({ "path": path })).await;
                print_listing(&state);
            }
            "up" => {
                run(&state, &proxy, "go_up", Value::Null).await;
                print_listing(&state);
            }
            "refresh" => {
                run(&state, &proxy, "refresh", Value::Null).await;
                print_listing(&state);
            }
            "expand" | "collapse" => {
                let path = resolve(&state, rest);
                let name = format!("{verb}_node");
                run(&state, &proxy, &name, json!({ "path": path })).await;
                print_listing(&state);
            }
            "sort" => {
                let key = match rest {
                    "size" => "size",
                    "modified" | "date" => "modified_at",
                    _ => "name",
                };
                run(&state, &proxy, "request_sort", json!({ "key": key })).await;
                print_listing(&state);
            }
            "find" => run(&state, &proxy, "update_search", json!({ "query": rest })).await,
            "search" => run(&state, &proxy, "submit_search", json!({ "query": rest })).await,
            "clear-search" => run(&state, &proxy, "clear_search", Value::Null).await,
            "select" | "unselect" => {
                let path = resolve(&state, rest);
                let payload = json!({ "path": path, "selected": verb == "select" });
                run(&state, &proxy, "toggle_selection", payload).await;
            }
            "clear-selection" => run(&state, &proxy, "clear_selection", Value::Null).await,
            "options" => {
                run(&state, &proxy, "toggle_copy_options", Value::Null).await;
                print_options(&state);
            }
            "depth" | "sizes" | "dates" | "colors" => {
                let mut options = app::helpers::lock_state(&state).copy_options;
                match verb {
                    "depth" => match rest.parse() {
                        Ok(depth) => options.max_depth = depth,
                        Err(_) => {
                            println!("depth expects a number");
                            continue;
                        }
                    },
                    "sizes" => options.include_sizes = !options.include_sizes,
                    "dates" => options.include_dates = !options.include_dates,
                    _ => options.use_colors = !options.use_colors,
                }
                let payload = serde_json::to_value(options)?;
                run(&state, &proxy, "update_copy_options", payload).await;
                print_options(&state);
            }
            "copy" => run(&state, &proxy, "copy_structure", Value::Null).await,
            "preview" => {
                let path = resolve(&state, rest);
                run(&state, &proxy, "load_preview", json!({ "path": path })).await;
            }
            "mkdir" => {
                let current = app::helpers::lock_state(&state).current_path.clone();
                let payload = json!({ "operation": "create_folder", "path": current, "new_name": rest });
                run(&state, &proxy, "file_op", payload).await;
            }
            "rename" | "mv" | "cp" => {
                let Some((target, argument)) = rest.rsplit_once(' ') else {
                    println!("{verb} expects two arguments");
                    continue;
                };
                let path = resolve(&state, target.trim());
                let payload = match verb {
                    "rename" => json!({ "operation": "rename", "path": path, "new_name": argument }),
                    "mv" => json!({ "operation": "move", "path": path, "destination": resolve(&state, argument) }),
                    _ => json!({ "operation": "copy", "path": path, "destination": resolve(&state, argument) }),
                };
                run(&state, &proxy, "file_op", payload).await;
            }
            "rm" => {
                let path = resolve(&state, rest);
                let payload = json!({ "operation": "delete", "path": path });
                run(&state, &proxy, "file_op", payload).await;
            }
            _ => println!("Unknown command '{verb}'. Type 'help' for the list."),
        }
    }

    let state_guard = app::helpers::lock_state(&state);
    if let Err(e) = config::settings::save_config(&state_guard.config, None) {
        tracing::error!("Failed to save config on exit: {}", e);
    }
    drop(state_guard);
    drop(proxy);
    printer.abort();
    Ok(())
}

fn command(name: &str, payload: Value) -> IpcMessage {
    IpcMessage {
        command: name.to_string(),
        payload,
    }
}

async fn run(
    state: &Arc<Mutex<AppState>>,
    proxy: &mpsc::UnboundedSender<UserEvent>,
    name: &str,
    payload: Value,
) {
    app::dispatch(command(name, payload), proxy.clone(), state.clone()).await;
}

/// Absolute paths pass through; anything else is joined onto the current directory.
fn resolve(state: &Arc<Mutex<AppState>>, arg: &str) -> String {
    let state_guard = app::helpers::lock_state(state);
    let separator = state_guard.path_model.separator().as_char();
    let is_absolute = arg.starts_with(separator) || arg.get(1..2) == Some(":");
    if is_absolute || arg.is_empty() {
        return arg.to_string();
    }
    state_guard
        .path_model
        .join(&state_guard.current_path, arg)
        .unwrap_or_else(|_| arg.to_string())
}

fn print_listing(state: &Arc<Mutex<AppState>>) {
    let ui = app::view_model::generate_ui_state(&app::helpers::lock_state(state));
    println!("\n{}  ({:?}, {} selected)", ui.current_path, ui.view_mode, ui.selected_count);

    let mark = |selected: bool| if selected { "*" } else { " " };
    if ui.view_mode.is_recursive() {
        for row in &ui.tree {
            let indent = "  ".repeat(row.depth);
            let marker = match (row.kind, row.is_expanded) {
                (remote_tree_explorer::core::EntryKind::Folder, true) => "v ",
                (remote_tree_explorer::core::EntryKind::Folder, false) => "> ",
                _ => "  ",
            };
            let size = row.size_label.as_deref().unwrap_or("");
            println!("{} {indent}{marker}{} {size}", mark(row.is_selected), row.name);
        }
        return;
    }
    for row in &ui.folders {
        println!("{} [{}]  {}", mark(row.is_selected), row.name, row.modified);
    }
    for row in &ui.files {
        let size = row.size_label.as_deref().unwrap_or("");
        println!("{}  {}  {}  {}", mark(row.is_selected), row.name, size, row.modified);
    }
}

fn print_options(state: &Arc<Mutex<AppState>>) {
    let state_guard = app::helpers::lock_state(state);
    let options = state_guard.copy_options;
    println!(
        "copy options ({}): depth {}, sizes {}, dates {}, colors {}",
        if state_guard.selection.options_panel_open() { "open" } else { "closed" },
        options.max_depth,
        options.include_sizes,
        options.include_dates,
        options.use_colors
    );
}

fn print_event(event: UserEvent, last_status: &mut String) {
    match event {
        UserEvent::StateUpdate(ui) => {
            if ui.status_message == *last_status {
                return;
            }
            println!("-- {}", ui.status_message);
            if !ui.search.query.is_empty() && !ui.search.is_searching {
                for hit in &ui.search.hits {
                    println!("  {}", hit.entry.path);
                }
            }
            *last_status = ui.status_message;
        }
        UserEvent::ShowPreview { path, preview } => match preview {
            remote_tree_explorer::backend::PreviewData::Text(text) => {
                println!("--- {path} ---\n{text}\n---");
            }
            remote_tree_explorer::backend::PreviewData::Image(bytes) => {
                println!("--- {path}: image, {} bytes ---", bytes.len());
            }
            remote_tree_explorer::backend::PreviewData::Unsupported => {
                println!("--- {path}: preview not available ---");
            }
        },
        UserEvent::ShowError(message) => eprintln!("error: {message}"),
        UserEvent::ShowWarning(message) => eprintln!("warning: {message}"),
        UserEvent::StructureCopied { text } => println!("Copied to clipboard:\n{text}"),
        UserEvent::OperationComplete(message) => println!("{message}"),
    }
}
