//! Provisioning for the single DynamoDB table behind the `dynamodb`
//! storage backend.
//!
//! `deploy` creates the table, or adds whatever indexes and stream the live
//! table lacks. `status` compares the live table against the layout the
//! server's key builders query, and `--check` turns drift into a failure.
//!
//! Environment: `AWS_ENDPOINT_URL` targets a local DynamoDB, `AWS_REGION`
//! (default `us-east-1`) and `AWS_PROFILE` select the account.

mod client;
mod config;
mod deploy;
mod error;
mod planning;

use error::{DynamodbError, Result};

use aws_sdk_dynamodb::Client;
use dialoguer::Confirm;

use crate::prelude::*;
use planning::{DeployPlan, DestroyPlan};

#[derive(Debug, clap::Args)]
pub struct DynamodbCommand {
    #[command(subcommand)]
    action: DynamodbAction,
}

#[derive(Debug, clap::Subcommand)]
enum DynamodbAction {
    /// Create the table, or add its missing indexes and change stream
    Deploy(TableArgs),
    /// Delete the table and every item in it
    Destroy(TableArgs),
    /// Compare the live table with the layout the server expects
    Status(StatusArgs),
}

#[derive(Debug, clap::Args)]
struct TableArgs {
    /// Table to manage
    #[arg(long, env = "DYNAMODB_TABLE_NAME", default_value = "real")]
    table_name: String,

    /// Apply without asking for confirmation
    #[arg(long, short = 'y')]
    yes: bool,
}

#[derive(Debug, clap::Args)]
struct StatusArgs {
    /// Table to inspect
    #[arg(long, env = "DYNAMODB_TABLE_NAME", default_value = "real")]
    table_name: String,

    /// Fail when the table needs a deploy
    #[arg(long)]
    check: bool,
}

pub async fn run(command: DynamodbCommand, out: &Output) -> Result<()> {
    let aws = client::AwsConfig::default();
    out.line(format!("{} {}", p_b("Target:"), aws.target_display()));
    let client = client::create_client(&aws).await?;

    match command.action {
        DynamodbAction::Deploy(args) => run_deploy(&client, &args, out).await,
        DynamodbAction::Destroy(args) => run_destroy(&client, &args, out).await,
        DynamodbAction::Status(args) => run_status(&client, &args, out).await,
    }
}

async fn run_deploy(client: &Client, args: &TableArgs, out: &Output) -> Result<()> {
    let desired = config::real_table_config().with_table_name(&args.table_name);
    let current = client::get_table_state(client, &args.table_name).await?;
    let plan = planning::calculate_deploy_plan(current.as_ref(), &desired);

    out.plan("Deploy plan", &planning::format_deploy_plan(&plan));
    if matches!(plan, DeployPlan::NoChanges { .. }) {
        out.line(p_g("Table is up to date."));
        return Ok(());
    }

    confirm(args.yes, "Apply these changes?", true)?;
    out.line(p_b("Applying changes..."));
    deploy::execute_deploy_plan(client, &plan).await?;

    let arn = client::get_table_state(client, &args.table_name)
        .await?
        .and_then(|state| state.stream_arn);
    match arn {
        Some(arn) => out.line(format!(
            "{} forward {} to POST /internal/stream",
            p_g("Deployed."),
            arn
        )),
        None => out.line(p_g("Deployed.")),
    }
    Ok(())
}

async fn run_destroy(client: &Client, args: &TableArgs, out: &Output) -> Result<()> {
    let current = client::get_table_state(client, &args.table_name).await?;
    let plan = planning::calculate_destroy_plan(current.as_ref(), &args.table_name);

    out.plan("Destroy plan", &planning::format_destroy_plan(&plan));
    if matches!(plan, DestroyPlan::AlreadyGone { .. }) {
        return Ok(());
    }

    confirm(
        args.yes,
        "Delete this table? ALL DATA WILL BE LOST",
        false,
    )?;
    deploy::execute_destroy_plan(client, &plan).await?;
    out.line(p_g("Table deleted."));
    Ok(())
}

async fn run_status(client: &Client, args: &StatusArgs, out: &Output) -> Result<()> {
    let desired = config::real_table_config().with_table_name(&args.table_name);
    let current = client::get_table_state(client, &args.table_name).await?;

    out.plan(
        "Table status",
        &planning::format_table_status(current.as_ref(), &desired),
    );

    let pending = planning::calculate_deploy_plan(current.as_ref(), &desired).pending_changes();
    if pending == 0 {
        out.line(p_g("Table matches the server layout."));
        return Ok(());
    }
    if args.check {
        return Err(DynamodbError::OutOfDate {
            table: args.table_name.clone(),
            pending,
        });
    }
    out.line(p_y(&format!("{pending} pending change(s), run `dynamodb deploy`.")));
    Ok(())
}

fn confirm(skip: bool, prompt: &str, default: bool) -> Result<()> {
    if skip || Confirm::new().with_prompt(prompt).default(default).interact()? {
        Ok(())
    } else {
        Err(DynamodbError::Cancelled)
    }
}
