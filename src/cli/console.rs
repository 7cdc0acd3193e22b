use colored::*;
use std::io::{self, Write};

use crate::core::{ExecutionMode, LoopPhase};

/// Console handles all terminal I/O with colored formatting
#[derive(Debug, Clone)]
pub struct Console {
    user_color: Color,
    answer_color: Color,
    tool_color: Color,
}

impl Console {
    /// Create a new Console with default colors
    pub fn new() -> Self {
        Self {
            user_color: Color::Cyan,
            answer_color: Color::Green,
            tool_color: Color::Magenta,
        }
    }

    /// Create a new Console with custom colors
    pub fn with_colors(user_color: Color, answer_color: Color, tool_color: Color) -> Self {
        Self {
            user_color,
            answer_color,
            tool_color,
        }
    }

    /// Print the task as the user's message
    pub fn print_user(&self, message: &str) {
        println!("{} {}", "Task:".color(self.user_color).bold(), message);
    }

    /// Print a loop phase change
    pub fn print_phase(&self, phase: LoopPhase) {
        println!("{}", format!("[{}]", phase).bright_black());
    }

    /// Print a thought extracted from a completion
    pub fn print_thought(&self, thought: &str) {
        println!("{} {}", "Thought:".dimmed().italic(), thought.dimmed());
    }

    /// Print a tool dispatch
    pub fn print_tool_call(&self, name: &str) {
        println!("{} {}", "●".color(self.tool_color), name.color(self.tool_color).bold());
    }

    /// Print a question the agent asks the user
    pub fn print_question(&self, prompt: &str) {
        println!("{} {}", "Question:".yellow().bold(), prompt);
    }

    /// Print the final answer
    pub fn print_answer(&self, answer: &str) {
        println!(
            "{} {}",
            "Answer:".color(self.answer_color).bold(),
            answer.color(self.answer_color)
        );
    }

    /// Print a newline
    pub fn println(&self) {
        println!();
    }

    /// Print a system message (errors, info, etc.)
    pub fn print_system(&self, message: &str) {
        println!("{} {}", "System:".yellow().bold(), message);
    }

    /// Print an error message
    pub fn print_error(&self, error: &str) {
        eprintln!("{} {}", "Error:".red().bold(), error);
    }

    /// Read a line of input from the user
    pub fn read_input(&self) -> io::Result<String> {
        print!("{} ", ">".color(self.user_color).bold());
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }

    /// Print a welcome banner
    pub fn print_banner(&self, skill_id: &str, mode: ExecutionMode) {
        println!("{}", "=".repeat(60).bright_blue());
        println!(
            "{}",
            format!("  Skill Session Engine - {} ({})", skill_id, mode)
                .bright_blue()
                .bold()
        );
        println!("{}", "=".repeat(60).bright_blue());
        println!();
    }

    /// Print a separator line
    pub fn print_separator(&self) {
        println!("{}", "-".repeat(60).bright_black());
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}
