use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use reqwest::Client;
use wanderplan_core::{
    inclusive_day_count, BudgetTier, DraftUpdate, NewTrip, TripRequest, TripWizard, WizardStep,
};
use wanderplan_observability::{init_tracing_to_stderr, AppMetrics};
use wanderplan_planner::{prepare_plan, CompletionClient, CompletionConfig, TripPlanner};

#[derive(Debug, Parser)]
#[command(name = "wanderplan")]
#[command(about = "Wanderplan itinerary CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Walk through the trip wizard and generate a markdown itinerary.
    Plan {
        #[command(flatten)]
        trip: TripArgs,
        #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
        #[arg(long, env = "OPENROUTER_MODEL")]
        model: Option<String>,
    },
    /// Print the inclusive number of days between two dates.
    Days {
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    /// Print the prompt that would be sent, without calling the provider.
    Prompt {
        #[arg(long)]
        destination: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        budget: String,
    },
}

#[derive(Debug, Args)]
struct TripArgs {
    #[arg(long)]
    destination: Option<String>,
    #[arg(long)]
    start: Option<String>,
    #[arg(long)]
    end: Option<String>,
    #[arg(long)]
    budget: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing_to_stderr("wanderplan_cli");
    let cli = Cli::parse();

    match cli.command {
        Command::Plan {
            trip,
            api_key,
            model,
        } => {
            let new_trip = run_wizard(trip)?;

            let mut config = CompletionConfig::new(api_key);
            if let Some(model) = model {
                config = config.with_model(model);
            }
            let planner = TripPlanner::new(
                CompletionClient::new(Client::new(), config),
                AppMetrics::shared(),
            );

            let generated = planner
                .generate_request(new_trip.to_request())
                .await
                .context("itinerary generation failed")?;
            println!("{}", generated.plan);
        }
        Command::Days { start, end } => {
            let days = inclusive_day_count(&start, &end)?;
            println!("{days}");
        }
        Command::Prompt {
            destination,
            start,
            end,
            budget,
        } => {
            let prepared = prepare_plan(TripRequest {
                destination,
                start_date: start,
                end_date: end,
                budget,
            })?;
            println!("{}", prepared.prompt);
        }
    }

    Ok(())
}

/// Values passed as flags are used first; anything missing or rejected is asked for on stdin.
/// Prompts go to stderr so stdout carries only the generated plan.
fn run_wizard(args: TripArgs) -> Result<NewTrip> {
    let mut preset = DraftUpdate {
        destination: args.destination,
        start_date: args.start,
        end_date: args.end,
        budget_preference: args.budget,
    };
    let mut wizard = TripWizard::new();

    loop {
        let step = wizard.step();
        let update = match step {
            WizardStep::Destination => DraftUpdate {
                destination: Some(preset_or_prompt(
                    &mut preset.destination,
                    "Where do you want to go?",
                )?),
                ..DraftUpdate::default()
            },
            WizardStep::Dates => DraftUpdate {
                start_date: Some(preset_or_prompt(
                    &mut preset.start_date,
                    "Start date (YYYY-MM-DD)",
                )?),
                end_date: Some(preset_or_prompt(
                    &mut preset.end_date,
                    "End date (YYYY-MM-DD)",
                )?),
                ..DraftUpdate::default()
            },
            WizardStep::Budget => {
                if preset.budget_preference.is_none() {
                    for tier in BudgetTier::ALL {
                        eprintln!("  {:<10} {}", tier.as_code(), tier.label());
                    }
                }
                DraftUpdate {
                    budget_preference: Some(preset_or_prompt(
                        &mut preset.budget_preference,
                        "Budget",
                    )?),
                    ..DraftUpdate::default()
                }
            }
        };
        wizard.update(update);

        let outcome = if step == WizardStep::Budget {
            match wizard.finish() {
                Ok(new_trip) => return Ok(new_trip),
                Err(error) => Err(error),
            }
        } else {
            wizard.next().map(|_| ())
        };

        if let Err(error) = outcome {
            eprintln!("Step {} ({}): {}", step.number(), step.title(), error);
        }
    }
}

fn preset_or_prompt(preset: &mut Option<String>, label: &str) -> Result<String> {
    if let Some(value) = preset.take() {
        return Ok(value);
    }

    eprint!("{label}: ");
    io::stderr().flush()?;

    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        bail!("input closed before the trip wizard finished");
    }
    Ok(line.trim().to_string())
}
