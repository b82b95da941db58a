use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use memopersist::prelude::*;
use memopersist::{FileStore, in_memory_context_with_config};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "memopersist",
    version,
    about = "Walk customers through a write-behind persistence context"
)]
pub struct Cli {
    /// Directory holding table snapshots (overrides MEMOPERSIST_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// auto | commit (overrides MEMOPERSIST_FLUSH_MODE)
    #[arg(long, global = true)]
    pub flush_mode: Option<FlushMode>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Persist, flush, rename, detach, merge and remove one customer, printing the table after each step
    Demo,

    /// Store a new customer
    Add {
        #[arg(long)]
        first: String,
        #[arg(long)]
        last: String,
    },

    /// Rename a stored customer
    Rename {
        #[arg(long)]
        id: u64,
        #[arg(long)]
        first: String,
        #[arg(long)]
        last: String,
    },

    /// Delete a stored customer
    Remove {
        #[arg(long)]
        id: u64,
    },

    /// Print stored customers as JSON
    List {
        #[arg(long)]
        last_name: Option<String>,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    let mut config = ContextConfig::from_env().context("reading configuration from environment")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    if let Some(mode) = cli.flush_mode {
        config.flush_mode = mode;
    }

    match cli.command {
        Command::Demo => {
            if config.data_dir.is_some() {
                demo(file_context::<Customer>(config)?)
            } else {
                let (ctx, _) = in_memory_context_with_config::<Customer>(config);
                demo(ctx)
            }
        }
        Command::Add { first, last } => {
            let mut ctx = open(config)?;
            let saved = Repository::new(&mut ctx).save(Customer::new(first, last))?;
            let summary = finish(ctx)?;
            println!(
                "added customer {} ({} row(s) written)",
                saved.id().map(|id| id.to_string()).unwrap_or_default(),
                summary.writes()
            );
            Ok(())
        }
        Command::Rename { id, first, last } => {
            let mut ctx = open(config)?;
            let customer = ctx
                .find(EntityId(id))?
                .with_context(|| format!("customer {} not found", id))?;
            customer.borrow_mut().update_name(first, last);
            let summary = finish(ctx)?;
            println!("renamed customer {} ({} row(s) written)", id, summary.writes());
            Ok(())
        }
        Command::Remove { id } => {
            let mut ctx = open(config)?;
            Repository::new(&mut ctx)
                .delete_by_id(EntityId(id))
                .with_context(|| format!("removing customer {}", id))?;
            finish(ctx)?;
            println!("removed customer {}", id);
            Ok(())
        }
        Command::List { last_name } => {
            let mut ctx = open(config)?;
            let mut repo = Repository::new(&mut ctx);
            let found = match last_name {
                Some(last_name) => repo.find_by_last_name(&last_name)?,
                None => repo.find_all()?,
            };
            let customers: Vec<Customer> = found.iter().map(EntityRef::to_entity).collect();
            println!("{}", serde_json::to_string_pretty(&customers)?);
            Ok(())
        }
    }
}

fn open(config: ContextConfig) -> Result<PersistenceContext<Customer, FileStore>> {
    if config.data_dir.is_none() {
        bail!("this command needs --data-dir or MEMOPERSIST_DATA_DIR");
    }
    Ok(file_context::<Customer>(config)?)
}

/// Flushes and checkpoints regardless of durability mode.
fn finish(mut ctx: PersistenceContext<Customer, FileStore>) -> Result<FlushSummary> {
    let summary = ctx.flush()?;
    ctx.store().checkpoint()?;
    Ok(summary)
}

fn demo<S: Store>(mut ctx: PersistenceContext<Customer, S>) -> Result<()> {
    let customer = EntityRef::new(Customer::new("first", "last"));
    print_step(&ctx, &customer, "new customer")?;

    ctx.persist(&customer)?;
    print_step(&ctx, &customer, "persist")?;

    ctx.flush()?;
    print_step(&ctx, &customer, "flush")?;

    customer.borrow_mut().update_name("new first", "new last");
    print_step(&ctx, &customer, "rename while managed")?;

    ctx.flush()?;
    print_step(&ctx, &customer, "flush")?;

    ctx.detach(&customer)?;
    customer
        .borrow_mut()
        .update_name("detached first", "detached last");
    ctx.flush()?;
    print_step(&ctx, &customer, "detach, rename, flush")?;

    let managed = ctx.merge(&customer)?;
    print_step(&ctx, &managed, "merge")?;

    ctx.flush()?;
    print_step(&ctx, &managed, "flush")?;

    ctx.remove(&managed)?;
    print_step(&ctx, &managed, "remove")?;

    ctx.flush()?;
    print_step(&ctx, &managed, "flush")?;
    Ok(())
}

fn print_step<S: Store>(
    ctx: &PersistenceContext<Customer, S>,
    instance: &EntityRef<Customer>,
    step: &str,
) -> Result<()> {
    let rows = ctx.store().read_all()?;
    println!(
        "{:<24} state={:<9} rows={}",
        step,
        ctx.state_of(instance)?.to_string(),
        rows.len()
    );
    for (id, fields) in rows {
        let stored = Customer::from_row(id, &fields)?;
        println!(
            "    {:>4}  {:<16} {}",
            id.to_string(),
            stored.first_name(),
            stored.last_name()
        );
    }
    Ok(())
}
