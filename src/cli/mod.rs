//! CLI commands for handoff using clap.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::cancel::{CancelToken, Cancellation};
use crate::config::{get_settings_path, Settings};
use crate::error::Error;
use crate::protocol::{fan_in_errors, join_producer, spawn_signal_producer};

/// handoff - cancellation-aware single-slot handoff between tasks.
#[derive(Parser)]
#[command(name = "handoff")]
#[command(version = "0.1.0")]
#[command(about = "Run producer/consumer handoffs over a capacity-1 mailbox", long_about = None)]
pub struct Commands {
    /// Settings file (defaults to $HANDOFF_CONFIG or the platform config dir)
    #[arg(long, global = true, env = "HANDOFF_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Produce a run of numbers and consume them one at a time
    Demo(DemoArgs),

    /// Fan several workers' failures into one error mailbox
    FanIn {
        /// Number of workers
        #[arg(long, default_value_t = 4)]
        workers: usize,

        /// How many of the workers fail
        #[arg(long, default_value_t = 1)]
        failing: usize,
    },

    /// Print the effective settings
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct DemoArgs {
    /// Number of values the producer yields
    #[arg(long, default_value_t = 5)]
    pub count: u32,

    /// Producer sends a fatal error instead of this item (1-based)
    #[arg(long)]
    pub fail_at: Option<u32>,

    /// Consumer cancels the token after reading this many items
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub cancel_after: Option<u64>,

    /// Deadline for the whole run, overriding settings
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl Commands {
    /// Run the command.
    pub async fn run(&self, settings: &Settings) -> Result<()> {
        match &self.command {
            Command::Demo(args) => cmd_demo(settings, args).await,
            Command::FanIn { workers, failing } => cmd_fan_in(settings, *workers, *failing).await,
            Command::Config => cmd_config(self.config.as_ref(), settings),
        }
    }
}

// Command implementations

async fn cmd_demo(settings: &Settings, args: &DemoArgs) -> Result<()> {
    let (received, outcome) = run_demo(settings, args).await;
    println!("Received: {:?}", received);
    outcome?;
    println!("No Error");
    Ok(())
}

/// Run the demo handoff and report what the consumer saw plus the combined
/// consumer/producer outcome.
pub async fn run_demo(settings: &Settings, args: &DemoArgs) -> (Vec<u32>, crate::Result<()>) {
    let mut settings = settings.clone();
    if let Some(ms) = args.timeout_ms {
        settings.handoff.timeout_ms = Some(ms);
    }
    let token = settings.token();

    let count = args.count;
    let fail_at = args.fail_at;
    let (producer, mut mailbox) = spawn_signal_producer(token.clone(), move |ctx| async move {
        for n in 1..=count {
            if fail_at == Some(n) {
                return ctx.fatal(Error::msg(format!("item {} rejected", n))).await;
            }
            if !ctx.yield_value(n).await {
                return Err(ctx.err().unwrap_or(Error::Canceled));
            }
            tracing::debug!(item = n, "produced");
        }
        Ok(())
    });

    let mut received = Vec::new();
    let mut consumed = Ok(());
    if args.cancel_after == Some(0) {
        tracing::info!("consumer cancelling before reading");
        token.cancel();
    }
    while !token.is_done() {
        let Some(signal) = mailbox.recv().await else {
            break;
        };
        let mut n = 0;
        if !signal.as_value(&mut n) {
            consumed = signal.into_result().map(|_| ());
            break;
        }
        received.push(n);
        if args.cancel_after == Some(received.len() as u64) {
            tracing::info!(after = received.len(), "consumer cancelling");
            token.cancel();
            break;
        }
    }
    drop(mailbox);
    token.cancel();

    let produced = join_producer(producer).await;
    if let Err(e) = &produced {
        tracing::warn!("producer stopped: {}", e);
    }
    (received, consumed.and(produced))
}

async fn cmd_fan_in(settings: &Settings, workers: usize, failing: usize) -> Result<()> {
    let errors = run_fan_in(settings.token(), workers, failing).await;
    println!("Collected {} error(s) from {} worker(s)", errors.len(), workers);
    for err in &errors {
        println!("  {}", err);
    }
    Ok(())
}

/// Spawn `workers` producers sharing one error context; the first `failing`
/// of them exit with an error.
pub async fn run_fan_in(token: CancelToken, workers: usize, failing: usize) -> Vec<Error> {
    fan_in_errors(token, workers, move |id| async move {
        if id < failing {
            return Err(Error::msg(format!("worker {} failed", id)));
        }
        Ok(())
    })
    .await
}

fn cmd_config(path: Option<&PathBuf>, settings: &Settings) -> Result<()> {
    let path = match path {
        Some(path) => path.clone(),
        None => get_settings_path()?,
    };
    println!("# {}", path.display());
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo(count: u32) -> DemoArgs {
        DemoArgs {
            count,
            fail_at: None,
            cancel_after: None,
            timeout_ms: None,
        }
    }

    #[tokio::test]
    async fn test_demo_delivers_everything() {
        let (received, outcome) = run_demo(&Settings::default(), &demo(5)).await;
        assert_eq!(received, vec![1, 2, 3, 4, 5]);
        assert_eq!(outcome, Ok(()));
    }

    #[tokio::test]
    async fn test_demo_fatal_stops_producer() {
        let args = DemoArgs {
            fail_at: Some(3),
            ..demo(5)
        };
        let (received, outcome) = run_demo(&Settings::default(), &args).await;
        assert_eq!(received, vec![1, 2]);
        assert_eq!(outcome, Err(Error::msg("item 3 rejected")));
    }

    #[tokio::test]
    async fn test_demo_consumer_cancel() {
        let args = DemoArgs {
            cancel_after: Some(2),
            ..demo(5)
        };
        let (received, outcome) = run_demo(&Settings::default(), &args).await;
        assert_eq!(received, vec![1, 2]);
        assert_eq!(outcome, Err(Error::Canceled));
    }

    #[tokio::test]
    async fn test_demo_cancel_before_first_read() {
        let args = DemoArgs {
            cancel_after: Some(0),
            ..demo(5)
        };
        let (received, outcome) = run_demo(&Settings::default(), &args).await;
        assert!(received.is_empty());
        assert_eq!(outcome, Err(Error::Canceled));
    }

    #[test]
    fn test_parse_rejects_zero_cancel_after() {
        let parsed = Commands::try_parse_from(["handoff", "demo", "--cancel-after", "0"]);
        assert!(parsed.is_err());

        let cli = Commands::try_parse_from(["handoff", "demo", "--cancel-after", "1"]).unwrap();
        match cli.command {
            Command::Demo(args) => assert_eq!(args.cancel_after, Some(1)),
            _ => panic!("expected demo"),
        }
    }

    #[tokio::test]
    async fn test_fan_in_collects_failures() {
        let errors = run_fan_in(CancelToken::new(), 4, 2).await;
        let mut messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        messages.sort();
        assert_eq!(messages, vec!["worker 0 failed", "worker 1 failed"]);
    }

    #[test]
    fn test_parse_demo_args() {
        let cli = Commands::try_parse_from(["handoff", "demo", "--count", "3", "--fail-at", "2"])
            .unwrap();
        match cli.command {
            Command::Demo(args) => {
                assert_eq!(args.count, 3);
                assert_eq!(args.fail_at, Some(2));
                assert_eq!(args.cancel_after, None);
            }
            _ => panic!("expected demo"),
        }
    }
}
