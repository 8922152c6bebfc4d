//! Interactive prompt loop of the desktop client.

use anyhow::Result;
use console::style;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use shared::AgentInvoker;

use crate::render::{print_answer, print_history};
use crate::session::ClientSession;

pub struct Repl<I> {
    editor: DefaultEditor,
    session: ClientSession<I>,
    show_trace: bool,
}

impl<I: AgentInvoker> Repl<I> {
    pub fn new(session: ClientSession<I>, show_trace: bool) -> Result<Self> {
        let config = Config::builder().history_ignore_space(true).build();
        let editor = DefaultEditor::with_config(config)?;

        Ok(Self {
            editor,
            session,
            show_trace,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("{}", style("\nText2SQL Agent - Amazon Athena").bold().cyan());
        println!(
            "Session {}. Type {} to quit, {} for help\n",
            style(self.session.session_id()).dim(),
            style("exit").dim(),
            style("/help").dim()
        );

        loop {
            match self.editor.readline("question> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    self.editor.add_history_entry(line)?;

                    if line.eq_ignore_ascii_case("exit") {
                        break;
                    }

                    if let Some(command) = line.strip_prefix('/') {
                        self.handle_command(command).await;
                    } else {
                        self.handle_question(line).await;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("Use 'exit' to quit");
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_question(&mut self, question: &str) {
        println!("{}", style("Processing your question...").dim());
        let answer = self.session.ask(question).await;
        print_answer(&answer);

        if self.show_trace {
            self.print_trace();
        }
    }

    async fn handle_command(&mut self, command: &str) {
        match command.trim() {
            "end" => {
                let farewell = self.session.end().await;
                println!("\n{}\n", style(farewell).green());
            }
            "history" => print_history(self.session.conversation()),
            "trace" => self.print_trace(),
            "help" => self.show_help(),
            other => println!("Unknown command: /{}", other),
        }
    }

    fn print_trace(&self) {
        println!("{}", style("Trace Data").bold().dim());
        println!("{}\n", style(self.session.last_trace()).dim());
    }

    fn show_help(&self) {
        println!("\n{}", style("Available Commands:").bold());
        println!("  /history - Show the conversation, newest first");
        println!("  /trace   - Show trace data of the last answer");
        println!("  /end     - End the agent session and clear the history");
        println!("  /help    - Show this help message");
        println!("  exit     - Quit\n");
    }
}
