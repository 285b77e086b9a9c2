use expense_ledger::{Expense, Summary,
    backend::{FileStore, LocalLedgerStore},
    config::{AppConfig, DEFAULT_CONFIG},
    expense::parse_date,
    remote::{FirestoreCollection, RemoteLedgerStore},
    summary::format_amount};

use std::path::PathBuf;
use anyhow::{self, Context};
use chrono::Utc;
use colored::Colorize;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(version, about, propagate_version = true)]
struct Cli {
   /// Path to the TOML configuration file
   #[clap(short, long, value_parser, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

   /// Action to perform
   #[clap(subcommand)]
   action: Subcommands,
}

#[derive(Debug, Subcommand)]
enum Subcommands {
    /// Record a new expense
    Add(AddExpense),
    /// List all expenses with their index
    List,
    /// Delete the expense at an index shown by `list`
    Delete(ExpenseIndex),
    /// Show totals per month and per description
    Summary,
    /// List expenses stored in the remote collection
    RemoteList,
    /// Copy a local expense to the remote collection
    RemotePush(ExpenseIndex)
}

#[derive(Args, Debug)]
struct AddExpense {
    /// What the money was spent on
    #[clap(short='d', long, value_parser)]
    description: String,

    /// Amount spent, e.g. 4.50
    #[clap(short='a', long, value_parser)]
    amount: String,

    #[clap(short='c', long, value_parser)]
    category: Option<String>,

    #[clap(short='n', long, value_parser)]
    note: Option<String>,

    /// Date as YYYY-MM-DD or RFC 3339; defaults to now
    #[clap(long, value_parser)]
    date: Option<String>
}

impl AddExpense {
    fn to_expense(&self) -> anyhow::Result<Expense> {
        let date = match &self.date {
            Some(raw) => parse_date(raw).with_context(|| format!("unrecognised date: {}", raw))?,
            None => Utc::now()
        };
        let mut expense = Expense::from_form(&self.description, &self.amount, date)?;
        expense.category = self.category.clone();
        expense.note = self.note.clone();
        return Ok(expense);
    }
}

#[derive(Args, Debug)]
struct ExpenseIndex {
    /// Position of the expense, as printed by `list`
    #[clap(value_parser)]
    index: usize
}

fn print_expenses(expenses: &[Expense]) {
    if expenses.is_empty() {
        println!("{}", "No expenses recorded".dimmed());
    }
    for (index, expense) in expenses.iter().enumerate() {
        println!("{:>3}  {}", index.to_string().cyan(), expense);
    }
}

fn print_summary(summary: &Summary) {
    println!("{}: {}", "Total".bold(), format_amount(summary.total).green());
    if summary.saturated {
        println!("{}", "Some sums exceed the representable range and are capped".yellow());
    }

    println!("\n{}", "By month".bold());
    for (label, amount) in summary.by_month.labels.iter().zip(&summary.by_month.amounts) {
        println!("  {:<5}{:>12}", label, format_amount(*amount));
    }

    println!("\n{}", "By description".bold());
    for slice in &summary.by_category {
        let (r, g, b) = hex_rgb(slice.color).unwrap_or((255, 255, 255));
        println!("  {} {:<20}{:>12}", "■".truecolor(r, g, b), slice.name, format_amount(slice.amount));
    }
}

/// `#rrggbb` to its components.
fn hex_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

fn remote_store(config: &AppConfig) -> anyhow::Result<RemoteLedgerStore<FirestoreCollection>> {
    let remote = config.remote.as_ref()
        .context("no [remote] section in the configuration")?;
    Ok(remote.open_store())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::read(&cli.config)?;
    let store: LocalLedgerStore<FileStore> = config.storage.open_store()?;

    match cli.action {
        Subcommands::Add(add) => {
            let expense = add.to_expense()?;
            store.append(expense.clone())?;
            println!("{} {}", "Added".green(), expense);

            if let Some(remote) = config.remote.as_ref().filter(|remote| remote.mirror_appends) {
                remote.open_store().save_remote(&expense).await;
            }
        },
        Subcommands::List => {
            print_expenses(&store.read_all());
        },
        Subcommands::Delete(delete) => {
            store.delete_at(delete.index)?;
        },
        Subcommands::Summary => {
            let offset = config.summary.offset()?;
            print_summary(&Summary::of(&store.read_all(), &offset));
        },
        Subcommands::RemoteList => {
            for document in remote_store(&config)?.read_all_remote().await {
                println!("{}  {}", document.id.cyan(), document.expense);
            }
        },
        Subcommands::RemotePush(push) => {
            let expenses = store.read_all();
            let expense = expenses.get(push.index)
                .with_context(|| format!("no expense at index {}", push.index))?;
            match remote_store(&config)?.save_remote(expense).await {
                Some(id) => println!("{} {}", "Pushed as".green(), id),
                None => println!("{}", "Remote collection unavailable, see log".yellow())
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    run(Cli::parse()).await
}
