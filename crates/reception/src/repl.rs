//! The order front-end: a line-oriented read-eval-print loop sitting in
//! front of the dispatcher.

use std::io::{self, BufRead, Write};

use plazza_fleet::KitchenManager;
use plazza_protocol::{Ingredient, PizzaJob, ALL_INGREDIENTS};

use crate::order;
use crate::signals::shutdown_requested;

const SWEEP_EVERY: u32 = 10;

/// Drives the console loop for one fleet.
pub struct Repl<'a> {
    manager: &'a KitchenManager,
    multiplier: f64,
    commands_processed: u32,
}

impl<'a> Repl<'a> {
    /// Build a REPL over `manager`, applying `multiplier` to every job it dispatches.
    pub fn new(manager: &'a KitchenManager, multiplier: f64) -> Self {
        Self { manager, multiplier, commands_processed: 0 }
    }

    /// Read lines until EOF, `quit`/`exit`, or a shutdown signal.
    pub fn run(&mut self) {
        let stdin = io::stdin();
        loop {
            if shutdown_requested() {
                println!("shutdown requested, exiting");
                break;
            }

            print!("> ");
            if io::stdout().flush().is_err() {
                break;
            }

            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if !self.handle_line(line.trim()) {
                        break;
                    }
                    self.commands_processed += 1;
                    if self.commands_processed % SWEEP_EVERY == 0 {
                        self.manager.sweep_idle();
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    tracing::warn!(%err, "failed to read a line from stdin");
                    break;
                }
            }
        }
    }

    /// Returns `false` when the REPL should stop after this line.
    fn handle_line(&self, line: &str) -> bool {
        match line.to_ascii_lowercase().as_str() {
            "" => true,
            "status" => {
                self.print_status();
                true
            }
            "help" => {
                print_help();
                true
            }
            "quit" | "exit" => false,
            _ => {
                self.handle_order(line);
                true
            }
        }
    }

    fn handle_order(&self, line: &str) {
        match order::parse_order_line(line) {
            Ok(items) => {
                for item in items {
                    for _ in 0..item.quantity {
                        let job = PizzaJob::new(item.pizza_type, item.size, self.multiplier);
                        if let Err(err) = self.manager.distribute(job) {
                            println!("order failed: {err}");
                            tracing::warn!(%err, "failed to distribute pizza job");
                        }
                    }
                }
            }
            Err(err) => println!("{err}"),
        }
    }

    fn print_status(&self) {
        let statuses = self.manager.display_status();
        println!("=== fleet status: {} kitchen(s) ===", statuses.len());
        for status in &statuses {
            println!(
                "kitchen {}: {}/{} cooks active, {} queued (capacity {})",
                status.worker_id, status.active_cooks, status.total_cooks, status.queued_jobs, status.max_capacity,
            );
            println!("  stock: {}", format_ingredients(&status.ingredient_counts));
        }
        println!("=== end status ===");
    }
}

fn format_ingredients(counts: &[u32; 9]) -> String {
    ALL_INGREDIENTS
        .iter()
        .zip(counts.iter())
        .map(|(ingredient, count)| format!("{}={count}", ingredient_name(*ingredient)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn ingredient_name(ingredient: Ingredient) -> &'static str {
    match ingredient {
        Ingredient::Dough => "dough",
        Ingredient::Tomato => "tomato",
        Ingredient::Gruyere => "gruyere",
        Ingredient::Ham => "ham",
        Ingredient::Mushrooms => "mushrooms",
        Ingredient::Steak => "steak",
        Ingredient::Eggplant => "eggplant",
        Ingredient::GoatCheese => "goat cheese",
        Ingredient::ChiefLove => "chief's love",
    }
}

fn print_help() {
    println!("commands:");
    println!("  <type> <SIZE> x<qty>[; <type> <SIZE> x<qty> ...]   place an order, e.g. 'margarita M x2'");
    println!("  status                                              show fleet status");
    println!("  help                                                 show this help");
    println!("  quit | exit                                         shut down and exit");
}
