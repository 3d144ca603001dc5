pub mod analysis;
pub mod commands;
pub mod error;
pub mod models;

use clap::{value_parser, Arg, ArgMatches, Command};
use commands::{
    ingest::{import_file, scan_uploads},
    report::{annual_report, bug_report, org_summary, team_report, trend_report, DEFAULT_TOP_N},
    settings::{get_settings, load_effective_config, save_settings},
    workspace::open_workspace,
};
use models::compliance::TrendBasis;
use models::config::SharedConfig;
use models::metric::Metric;
use models::snapshot::Period;
use serde::Serialize;
use serde_json::Value;

pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = cli().get_matches();
    match dispatch(&matches) {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Failed to serialize output: {e}");
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn cli() -> Command {
    let team = || Arg::new("team").required(true).help("Team (cell) identifier");
    let period = || {
        Arg::new("period")
            .long("period")
            .value_parser(parse_period)
            .help("Period as YYYY-MM")
    };

    Command::new("okrlens")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Per-team code-quality compliance and OKR tracking")
        .subcommand_required(true)
        .arg(
            Arg::new("workspace")
                .long("workspace")
                .short('w')
                .global(true)
                .default_value(".")
                .help("Workspace directory holding .okrlens/ and uploads/"),
        )
        .subcommand(Command::new("init").about("Create the workspace database and settings"))
        .subcommand(
            Command::new("import")
                .about("Import one JSON upload")
                .arg(Arg::new("file").required(true).help("JSON array of snapshot rows"))
                .arg(period().help("Stamp every row with this period")),
        )
        .subcommand(Command::new("scan").about("Import every uploads/metri*_*.json file"))
        .subcommand(
            Command::new("report")
                .about("OKR table, project detail, bugs and regressions for a team")
                .arg(team())
                .arg(period()),
        )
        .subcommand(
            Command::new("trend")
                .about("Per-period series for one team and metric")
                .arg(team())
                .arg(
                    Arg::new("metric")
                        .required(true)
                        .value_parser(parse_metric)
                        .help("security, reliability, maintainability, coverage or complexity"),
                )
                .arg(
                    Arg::new("basis")
                        .long("basis")
                        .value_parser(["okr", "raw"])
                        .default_value("okr")
                        .help("Plot OKR% or raw compliance%"),
                ),
        )
        .subcommand(
            Command::new("summary")
                .about("Organization-wide compliance for one period")
                .arg(period()),
        )
        .subcommand(
            Command::new("annual")
                .about("Months meeting goal in a year")
                .arg(team())
                .arg(
                    Arg::new("year")
                        .required(true)
                        .value_parser(value_parser!(i32)),
                ),
        )
        .subcommand(
            Command::new("bugs")
                .about("Bug trend and per-project variation for a team")
                .arg(team())
                .arg(
                    Arg::new("top")
                        .long("top")
                        .value_parser(value_parser!(usize))
                        .default_value("5")
                        .help("How many projects to rank each way"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Read or update settings.json")
                .subcommand_required(true)
                .subcommand(Command::new("get"))
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("json").required(true).help("Partial settings object")),
                ),
        )
}

fn dispatch(matches: &ArgMatches) -> Result<Value, String> {
    let workspace = workspace_arg(matches);

    match matches.subcommand() {
        Some(("init", _)) => to_json(open_workspace(workspace)?),
        Some(("import", args)) => {
            let file = required::<String>(args, "file")?;
            let period = args.get_one::<Period>("period").copied();
            to_json(import_file(workspace, file, period)?)
        }
        Some(("scan", _)) => to_json(scan_uploads(workspace)?),
        Some(("report", args)) => {
            let config = shared_config(workspace)?;
            let team = required::<String>(args, "team")?;
            let period = args.get_one::<Period>("period").copied();
            to_json(team_report(workspace, &config, team, period)?)
        }
        Some(("trend", args)) => {
            let config = shared_config(workspace)?;
            let team = required::<String>(args, "team")?;
            let metric = *required::<Metric>(args, "metric")?;
            let basis = match args.get_one::<String>("basis").map(String::as_str) {
                Some("raw") => TrendBasis::Raw,
                _ => TrendBasis::Okr,
            };
            to_json(trend_report(workspace, &config, team, metric, basis)?)
        }
        Some(("summary", args)) => {
            let config = shared_config(workspace)?;
            let period = args.get_one::<Period>("period").copied();
            to_json(org_summary(workspace, &config, period)?)
        }
        Some(("annual", args)) => {
            let config = shared_config(workspace)?;
            let team = required::<String>(args, "team")?;
            let year = *required::<i32>(args, "year")?;
            to_json(annual_report(workspace, &config, team, year)?)
        }
        Some(("bugs", args)) => {
            let team = required::<String>(args, "team")?;
            let top_n = args.get_one::<usize>("top").copied().unwrap_or(DEFAULT_TOP_N);
            to_json(bug_report(workspace, team, top_n)?)
        }
        Some(("config", args)) => match args.subcommand() {
            Some(("get", _)) => get_settings(workspace),
            Some(("set", set_args)) => {
                let raw = required::<String>(set_args, "json")?;
                let update: Value =
                    serde_json::from_str(raw).map_err(|e| format!("Invalid settings JSON: {e}"))?;
                let config = shared_config(workspace)?;
                save_settings(workspace, update, &config)
            }
            _ => Err("Unknown config operation".to_string()),
        },
        _ => Err("Unknown command".to_string()),
    }
}

/// `--workspace` is global; the innermost subcommand sees the value wherever
/// it was given on the command line.
fn workspace_arg(matches: &ArgMatches) -> &str {
    let mut current = matches;
    while let Some((_, sub)) = current.subcommand() {
        current = sub;
    }
    current
        .get_one::<String>("workspace")
        .or_else(|| matches.get_one::<String>("workspace"))
        .map(String::as_str)
        .unwrap_or(".")
}

fn shared_config(workspace: &str) -> Result<SharedConfig, String> {
    Ok(SharedConfig::new(load_effective_config(workspace)?))
}

fn required<'a, T: Clone + Send + Sync + 'static>(args: &'a ArgMatches, id: &str) -> Result<&'a T, String> {
    args.get_one::<T>(id)
        .ok_or_else(|| format!("Missing argument: {id}"))
}

fn to_json<T: Serialize>(value: T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| format!("Failed to serialize output: {e}"))
}

fn parse_period(raw: &str) -> Result<Period, String> {
    Period::parse(raw).map_err(|e| e.to_string())
}

fn parse_metric(raw: &str) -> Result<Metric, String> {
    raw.parse::<Metric>().map_err(|e| e.to_string())
}
