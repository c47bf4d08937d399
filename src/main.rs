use clap::Parser;
use pcdrift::api::{Client, PipelineSource, TagFilter};
use pcdrift::cli::{BranchArgs, Cli, Command, PipelinesArgs, SnapshotsArgs, SuppressionAction};
use pcdrift::config::{self, Config, Credentials, FileSettings};
use pcdrift::cycle;
use pcdrift::inventory;
use pcdrift::report::{self, json, table};
use pcdrift::store::SqliteStore;
use pcdrift::util;
use pcdrift::Result;
use std::io::{BufRead, Write};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default = if verbose { "pcdrift=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

/// Credentials are checked before anything touches disk or network.
fn connect() -> Result<(Client, FileSettings)> {
    let credentials = Credentials::from_env()?;
    let file = FileSettings::load()?;
    let client = Client::login(&credentials, file.timeout()?)?;
    Ok((client, file))
}

fn print_list(items: &[serde_json::Value], as_json: bool, empty: &str, render: fn(&[serde_json::Value]) -> String) -> Result<()> {
    if as_json {
        println!("{}", json::render(items)?);
    } else if items.is_empty() {
        println!("{empty}");
    } else {
        print!("{}", render(items));
    }
    Ok(())
}

fn pipelines(args: &PipelinesArgs) -> Result<()> {
    let credentials = Credentials::from_env()?;
    let file = FileSettings::load()?;
    let config = Config::from_pipelines_args(args, &file)?;
    let client = Client::login(&credentials, config.timeout)?;

    if args.show {
        let pipelines = client.pipeline_tools()?;
        let repos = client.repositories()?;
        let matched = inventory::match_repos_with_apps(&repos, &pipelines);
        if config.json_output {
            println!("{}", json::render(&matched)?);
        } else {
            print!("{}", report::render_repo_apps(&matched));
        }
        return Ok(());
    }

    let store = SqliteStore::new(&config.db_path);
    tracing::debug!(db = %store.path().display(), "using snapshot store");

    let mut source = PipelineSource::new(&client);
    let result = cycle::run(&store, &mut source, config.cycle_options())?;

    if config.json_output {
        println!("{}", json::render(&result)?);
    } else {
        print!("{}", table::render_cycle(&result, args.show_records));
    }
    Ok(())
}

fn snapshots(args: &SnapshotsArgs) -> Result<()> {
    let file = FileSettings::load()?;
    let store = SqliteStore::new(config::resolve_db_path(args.db.as_deref(), &file)?);
    let cutoff = args
        .days
        .map_or(i64::MIN, |days| util::days_before(util::unix_now(), days));

    let rows: Vec<(i64, Option<usize>)> = store
        .load_existing_since(cutoff)?
        .into_iter()
        .map(|s| (s.captured_at, s.collection().ok().map(|c| c.len())))
        .collect();

    print!("{}", table::render_snapshot_list(&rows));
    Ok(())
}

fn confirm_on_stdin(repo: &pcdrift::api::types::Repository) -> bool {
    println!("\nRepository: {}", repo.repository);
    println!("ID: {}", repo.id);
    println!("Source: {}", repo.source_or_unknown());
    println!("Owner: {}", repo.owner_or_unknown());
    print!("Change branch for this repository? (y/n): ");
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    match std::io::stdin().lock().read_line(&mut answer) {
        Ok(_) => answer.trim().eq_ignore_ascii_case("y"),
        Err(e) => {
            tracing::warn!(error = %e, "could not read confirmation, skipping");
            false
        }
    }
}

fn branch(args: &BranchArgs) -> Result<()> {
    let (client, _) = connect()?;
    let mut repos = inventory::exclude_cli_sources(client.repositories()?);

    if repos.is_empty() {
        println!("No repositories found.");
        return Ok(());
    }

    if let Some(name) = &args.repository {
        repos.retain(|r| &r.repository == name);
        if repos.is_empty() {
            println!("Repository '{name}' not found.");
            return Ok(());
        }
    }

    let path = inventory::save_repository_branches(&repos, &args.out_dir, chrono::Local::now().naive_local())?;
    println!("Repository information saved to {}", path.display());

    let Some(branch) = args.branch.as_deref().filter(|_| !args.scan_only) else {
        println!("Scan completed. Repository branches have been saved.");
        return Ok(());
    };

    println!("Setting branch '{branch}' for repositories:");
    let outcome = inventory::set_branches(
        &repos,
        |repo| !args.interactive || confirm_on_stdin(repo),
        |repo| client.set_scanned_branch(&repo.id, branch),
    );

    print!("{}", report::render_branch_outcome(&outcome, branch));
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Pipelines(args) => pipelines(&args),
        Command::Snapshots(args) => snapshots(&args),
        Command::Repos(args) => {
            let (client, _) = connect()?;
            let repos = client.repositories()?;
            let today = chrono::Local::now().date_naive();
            let stale = inventory::stale_repositories(&repos, args.days, today);

            if args.json {
                println!("{}", json::render(&stale)?);
            } else if repos.is_empty() {
                println!("No repositories found.");
            } else {
                print!("{}", report::render_stale_repos(&stale, args.days, today));
            }
            Ok(())
        }
        Command::Suppressions(args) => {
            let (client, _) = connect()?;
            match args.action.unwrap_or(SuppressionAction::List) {
                SuppressionAction::List => print_list(
                    &client.suppressions()?,
                    args.output.json,
                    "No suppression rules found.",
                    report::render_suppressions,
                ),
                SuppressionAction::Create {
                    account_id,
                    resource_id,
                    comment,
                    policy_id,
                } => {
                    let created = client.create_suppression(&policy_id, &account_id, &resource_id, &comment)?;
                    println!("Suppression created for policy {policy_id}.");
                    if !created.is_null() {
                        println!("{}", json::render(&created)?);
                    }
                    Ok(())
                }
                SuppressionAction::Delete {
                    policy_id,
                    suppression_id,
                } => {
                    let status = client.delete_suppression(&policy_id, &suppression_id)?;
                    println!("Suppression rule deleted successfully. Status code: {status}");
                    Ok(())
                }
            }
        }
        Command::Tags(args) => {
            let (client, _) = connect()?;
            let filter = TagFilter {
                tag_type: args.tag_type,
                repo_id: args.repo_id,
                file_path: args.file_path,
            };
            print_list(&client.tag_rules(&filter)?, args.output.json, "No tag rules found.", report::render_tag_rules)
        }
        Command::EnforcementRules(args) => {
            let (client, _) = connect()?;
            print_list(
                &client.enforcement_rules()?,
                args.json,
                "No enforcement rules found.",
                report::render_enforcement_rules,
            )
        }
        Command::PipelineRisks(args) => {
            let (client, _) = connect()?;
            print_list(
                &client.pipeline_risks()?,
                args.json,
                "No pipeline risks found.",
                report::render_pipeline_risks,
            )
        }
        Command::Branch(args) => branch(&args),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
