//! Interactive terminal front-end.
//!
//! A plain REPL over stdin/stdout that feeds each line through the
//! orchestration loop. The [`TerminalObserver`] renders turn events with
//! color and, in prompt mode, asks for confirmation before running tools.

use std::io::{self, BufRead, Write};

use colored::Colorize;
use inquire::Confirm;

use crate::agent::{Agent, TurnObserver};
use crate::session::{Session, ToolCall, ToolVerbosity};
use crate::Result;

/// Print the startup banner for an interactive session.
pub fn print_header(model: &str, provider: &str, session_name: &str) {
    println!("{}", "tandem".yellow().bold());
    println!("{}", format!("  {model}  •  {provider}").cyan());
    println!("  session: {}", session_name.bright_black());
    println!("  type /quit or press Ctrl-D to exit\n");
}

/// Run the interactive loop until the user quits or stdin closes.
///
/// Per-turn failures are printed and the loop continues; only I/O
/// failures on the terminal itself abort.
pub async fn run_interactive(
    agent: &Agent,
    session: &mut Session,
    initial_prompt: Option<String>,
) -> Result<()> {
    let mut observer = TerminalObserver::new(agent.verbosity);

    if let Some(prompt) = initial_prompt {
        run_turn(agent, session, &prompt, &mut observer).await;
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("\n{} ", ">".green().bold());
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "/quit" | "/exit") {
            break;
        }

        run_turn(agent, session, input, &mut observer).await;
    }

    Ok(())
}

async fn run_turn(agent: &Agent, session: &mut Session, text: &str, observer: &mut TerminalObserver) {
    if let Err(e) = agent.process_user_input(session, text, observer).await {
        eprintln!("{}", format!("Error: {e}").red());
    }
}

/// Renders turn events on the terminal.
pub struct TerminalObserver {
    verbosity: ToolVerbosity,
}

impl TerminalObserver {
    pub fn new(verbosity: ToolVerbosity) -> Self {
        Self { verbosity }
    }
}

impl TurnObserver for TerminalObserver {
    fn on_assistant_message(&mut self, text: &str) {
        println!("\n{text}");
    }

    fn on_tool_call(&mut self, call: &ToolCall) {
        match self.verbosity {
            ToolVerbosity::None => {}
            ToolVerbosity::Info => {
                println!("  {} {}", "•".green(), format!("running {}", call.name).bright_black());
            }
            ToolVerbosity::All => {
                let args = serde_json::to_string(&call.args).unwrap_or_default();
                println!("  {} {}", "•".green(), format!("running {} {args}", call.name).bright_black());
            }
        }
    }

    fn on_tool_result(&mut self, call: &ToolCall, result: &str) {
        if self.verbosity == ToolVerbosity::All {
            println!("  {} {}", "✓".green().bold(), format!("{} -> {result}", call.name).bright_black());
        }
    }

    fn should_execute_tool(&mut self, call: &ToolCall) -> bool {
        let args = serde_json::to_string(&call.args).unwrap_or_default();
        let question = format!("Allow tool '{}' with args {args}?", call.name);
        // A broken prompt (e.g. no TTY) counts as a denial.
        Confirm::new(&question)
            .with_default(false)
            .prompt()
            .unwrap_or(false)
    }

    fn on_warning(&mut self, text: &str) {
        eprintln!("  {} {}", "⚠".yellow().bold(), text.yellow());
    }
}
