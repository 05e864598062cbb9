use std::io::Write as _;

use tokio::io::{AsyncBufReadExt, BufReader};

use flowscope::api::ConsoleApi;
use flowscope::config::{Config, DisplayMode};
use flowscope::controller::{run_submission, ExecutionController};
use flowscope::graph;
use flowscope::layout::LayoutEngine;
use flowscope::render;
use flowscope::threads::ThreadRegistry;

fn load_env_file() {
    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            tracing::warn!(error = %e, "Could not determine current directory for .env lookup");
            return;
        }
    };

    let mut current = cwd;
    loop {
        let candidate = current.join(".env");
        if candidate.exists() {
            match dotenvy::from_path(&candidate) {
                Ok(_) => tracing::info!(path = %candidate.display(), "Loaded environment from .env"),
                Err(e) => {
                    tracing::warn!(path = %candidate.display(), error = %e, "Failed to load .env file")
                }
            }
            return;
        }
        if !current.pop() {
            return;
        }
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    load_env_file();

    let config = Config::from_env()?;
    let api = ConsoleApi::new(&config.service_url, config.connect_timeout)?;

    let graph_response = api.fetch_graph().await?;
    let model = graph::normalize_response(&graph_response);
    let mut engine = LayoutEngine::new(config.layout.clone());
    let mut layout = engine.layout(&model);
    tokio::time::sleep(config.layout.fit_debounce).await;
    if engine.take_fit_request() {
        tracing::debug!(width = layout.width, height = layout.height, "viewport refit");
    }

    let mut registry = graph_response
        .is_stateful
        .then(|| ThreadRegistry::new(api.clone()));
    let mut controller = ExecutionController::new();
    let mut mode = config.display_mode;

    println!("flowscope — connected to {}", config.service_url);
    println!("{}", render::format_graph(&layout, None));
    println!("thread: {}", controller.thread_id());
    println!("commands: /graph /reload /threads [substr] /open <id> /new /hover <n> /unhover /mode clean|raw /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line.split_once(' ').map_or((line, ""), |(a, b)| (a, b.trim())) {
            ("", _) => {}
            ("/quit" | "/exit", _) => break,
            ("/graph", _) => {
                println!("{}", render::format_graph(&layout, controller.active_node()));
            }
            ("/reload", _) => match api.fetch_graph().await {
                Ok(response) => {
                    let model = graph::normalize_response(&response);
                    layout = engine.layout(&model);
                    tokio::time::sleep(config.layout.fit_debounce).await;
                    if engine.take_fit_request() {
                        tracing::debug!(width = layout.width, height = layout.height, "viewport refit");
                    }
                    println!("{}", render::format_graph(&layout, controller.active_node()));
                }
                Err(e) => tracing::warn!(error = %e, "graph reload failed"),
            },
            ("/mode", arg) => match arg {
                "clean" => mode = DisplayMode::Clean,
                "raw" => mode = DisplayMode::Raw,
                _ => println!("mode is '{}' (expected clean or raw)", mode.as_str()),
            },
            ("/new", _) => {
                let id = controller.new_thread();
                println!("thread: {id}");
            }
            ("/threads", arg) => match registry.as_mut() {
                Some(registry) => {
                    let filter = (!arg.is_empty()).then_some(arg);
                    match registry.refresh(filter).await {
                        Ok(threads) if threads.is_empty() => println!("no threads"),
                        Ok(threads) => {
                            for thread in threads {
                                println!("{}  (updated {})", thread.id, thread.updated_at);
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "thread list fetch failed"),
                    }
                }
                None => println!("service is stateless; no threads to list"),
            },
            ("/open", id) if !id.is_empty() => match registry.as_ref() {
                Some(registry) => match registry.history(id).await {
                    Ok(history) => {
                        controller.select_thread(id, history);
                        println!("thread: {id}");
                        for (index, step) in controller.steps().iter().enumerate() {
                            println!("{}", render::format_step(index, step, mode));
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, thread = id, "history fetch failed"),
                },
                None => println!("service is stateless; no history to load"),
            },
            ("/open", _) => println!("usage: /open <thread-id>"),
            ("/hover", n) => {
                if let Ok(index) = n.parse::<usize>() {
                    controller.hover_step(index);
                    println!("{}", render::format_graph(&layout, controller.active_node()));
                }
            }
            ("/unhover", _) => {
                controller.clear_hover();
            }
            (command, _) if command.starts_with('/') => {
                println!("unknown command: {command}");
            }
            _ => {
                let mut printed = controller.steps().len();
                let result = run_submission(&mut controller, &api, line, |state| {
                    while printed < state.steps().len() {
                        println!("{}", render::format_step(printed, &state.steps()[printed], mode));
                        printed += 1;
                    }
                })
                .await;
                if let Err(e) = result {
                    tracing::warn!(error = %e, "run ended early; resubmit to retry");
                }
            }
        }
        prompt();
    }

    Ok(())
}
