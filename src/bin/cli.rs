use chrono::{Local, NaiveDate};
use clap::Parser;
use install_schedule::{
    Category, ConverterConfig, Project, ProjectError, ProjectMetadata, ScheduleNormalizer, TaskFilter,
    TaskRecord, Workbook, load_project_from_csv, load_project_from_json, save_project_to_csv,
    save_project_to_json, sample_tasks,
};
use polars::prelude::{AnyValue, DataFrame};
use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "cli")]
#[command(version, about = "Installation schedule dashboard", long_about = None)]
struct Cli {
    /// Verbose logging on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Task table (CSV) to load at startup
    #[arg(long, value_name = "CSV")]
    load: Option<PathBuf>,

    /// Status workbook (.xlsx, CSV directory or CSV file) to convert at startup
    #[arg(long, value_name = "WORKBOOK")]
    convert: Option<PathBuf>,

    /// Converter configuration (JSON)
    #[arg(long, value_name = "JSON")]
    config: Option<PathBuf>,

    /// Reference date for conversion and sample data (defaults to today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    today: Option<NaiveDate>,
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let mut col_names: Vec<String> = vec!["#".to_string()];
    col_names.extend(columns.iter().map(|c| c.name().to_string()));

    let mut cells: Vec<Vec<String>> = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let mut row = vec![row_idx.to_string()];
        for col in columns {
            let s = match col.get(row_idx) {
                Ok(AnyValue::Null) | Err(_) => String::new(),
                Ok(AnyValue::String(s)) => s.to_string(),
                Ok(av) => av.to_string(),
            };
            row.push(s);
        }
        cells.push(row);
    }

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.chars().count()).collect();
    for row in &cells {
        for (ci, s) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(s.chars().count());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(w + 2));
        sep.push('+');
    }

    let render_row = |values: &[String]| {
        let mut line = String::from("|");
        for (ci, s) in values.iter().enumerate() {
            let pad = widths[ci].saturating_sub(s.chars().count());
            line.push(' ');
            line.push_str(s);
            line.push_str(&" ".repeat(pad));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&col_names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &cells {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  show                               Show the task table\n  sample                             Replace the table with the sample rollout\n  demo                               Replace the table with a generic demo plan\n  add <category> <YYYY-MM-DD> <days> <name...>\n                                     Append a task (category like issue_resolution)\n  delete <name...>                   Delete every task with that name\n  pct      <row> <0-100>             Set completion percentage\n  zone     <row> <n>                 Set trustee zone\n  notes    <row> <text...>           Set notes (rest of line)\n  resource <row> <text...>           Set resource (rest of line)\n  category <row> <category>          Set category\n  start    <row> <YYYY-MM-DD>        Move start, keeping duration\n  duration <row> <days>              Set duration and finish\n  recalc                             Recalculate finish = start + duration\n  filter [category=a,b] [zone=1,2] [from=YYYY-MM-DD] [to=YYYY-MM-DD] [text=word]\n                                     Show the matching tasks\n  summary                            Show completion and per-category/zone counts\n  convert <workbook>                 Replace the table with a converted status workbook\n  meta show                          Show project metadata\n  meta name <text...>                Update project name\n  meta desc <text...>                Update project description\n  save <json|csv> <path>             Persist the project to disk\n  load <json|csv> <path>             Load a project from disk\n  quit|exit                          Exit"
    );
}

fn print_metadata(project: &Project) {
    let metadata = project.metadata();
    println!("Project name       : {}", metadata.project_name);
    println!("Project description: {}", metadata.project_description);
    println!("Tasks              : {}", project.len());
}

fn parse_category(raw: &str) -> Result<Category, String> {
    Category::from_str(&raw.replace(['_', '-'], " "))
}

fn parse_row(raw: Option<&str>) -> Result<usize, String> {
    raw.ok_or_else(|| "missing row".to_string())?
        .parse::<usize>()
        .map_err(|_| "Invalid row".to_string())
}

fn parse_date(raw: Option<&str>) -> Result<NaiveDate, String> {
    raw.and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .ok_or_else(|| "Invalid date (YYYY-MM-DD)".to_string())
}

fn parse_filter<'a>(args: impl Iterator<Item = &'a str>) -> Result<TaskFilter, String> {
    let mut filter = TaskFilter::default();
    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{arg}'"))?;
        match key {
            "category" => {
                for part in value.split(',') {
                    filter.categories.push(parse_category(part)?);
                }
            }
            "zone" => {
                for part in value.split(',') {
                    let zone = part
                        .trim()
                        .parse::<u32>()
                        .map_err(|_| format!("invalid zone '{part}'"))?;
                    filter.zones.push(zone);
                }
            }
            "from" => filter.from = Some(parse_date(Some(value))?),
            "to" => filter.to = Some(parse_date(Some(value))?),
            "text" => filter.text = Some(value.to_string()),
            other => return Err(format!("unknown filter '{other}'")),
        }
    }
    Ok(filter)
}

fn convert_workbook(
    path: &str,
    normalizer: &ScheduleNormalizer,
    project: &mut Project,
) -> Result<(), String> {
    let workbook = Workbook::open(path).map_err(|e| e.to_string())?;
    let conversion = normalizer
        .convert_workbook(&workbook)
        .map_err(|e| e.to_string())?;
    let report = conversion.report.clone();
    let overlaps = conversion.overlapping_pairs().len();
    project
        .replace_all(conversion.into_tasks())
        .map_err(|e| e.to_string())?;
    println!(
        "Converted {} tasks (dated={}, scheduled={}, skipped headers={}, skipped in-progress={}).",
        project.len(),
        report.dated_rows,
        report.cursor_rows,
        report.skipped_header_rows,
        report.skipped_in_progress_rows
    );
    if !report.issues_sheet_present {
        println!("No '{}' sheet found.", normalizer.config().issues_sheet);
    }
    if !report.revisits_sheet_present {
        println!("No '{}' sheet found.", normalizer.config().revisits_sheet);
    }
    if overlaps > 0 {
        println!("Warning: {overlaps} dated task(s) overlap cursor-scheduled tasks.");
    }
    Ok(())
}

fn run_edit(project: &mut Project, cmd: &str, mut parts: std::str::SplitWhitespace<'_>) -> Result<(), String> {
    let row = parse_row(parts.next())?;
    let rest: Vec<&str> = parts.collect();
    let value = rest.join(" ");
    let result = match cmd {
        "pct" => {
            let pct = value
                .parse::<u8>()
                .map_err(|_| "Invalid percentage".to_string())?;
            project.set_completion(row, pct)
        }
        "zone" => {
            let zone = value.parse::<u32>().map_err(|_| "Invalid zone".to_string())?;
            project.set_zone(row, zone)
        }
        "notes" => project.set_notes(row, &value),
        "resource" => project.set_resource(row, &value),
        "category" => project.set_category(row, parse_category(&value)?),
        "start" => project.set_start(row, parse_date(Some(value.as_str()))?),
        _ => {
            let days = value
                .parse::<i64>()
                .map_err(|_| "Invalid duration".to_string())?;
            project.set_duration(row, days)
        }
    };
    result.map_err(|e| e.to_string())
}

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    let config = match &cli.config {
        Some(path) => match ConverterConfig::from_json_path(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Could not read config {}: {e}", path.display());
                std::process::exit(2);
            }
        },
        None => ConverterConfig::default(),
    };
    let normalizer = ScheduleNormalizer::new(config, today);

    let mut project = Project::new();
    if let Some(path) = &cli.load {
        match load_project_from_csv(path) {
            Ok(loaded) => project = loaded,
            Err(e) => println!("Load error: {e}"),
        }
    }
    if let Some(path) = &cli.convert {
        if let Err(e) = convert_workbook(&path.to_string_lossy(), &normalizer, &mut project) {
            println!("Convert error: {e}");
        }
    }

    println!("Installation Schedule (CLI) - type 'help' for commands\n");
    println!("{}", render_df_as_text_table(project.dataframe()));

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "show" => println!("{}", render_df_as_text_table(project.dataframe())),
            "sample" => match Project::sample(today) {
                Ok(sample) => {
                    project = sample;
                    println!("Loaded sample rollout.");
                    println!("{}", render_df_as_text_table(project.dataframe()));
                }
                Err(e) => println!("Error: {e}"),
            },
            "demo" => match sample_tasks(today)
                .map_err(ProjectError::from)
                .and_then(|tasks| Project::with_tasks(ProjectMetadata::default(), tasks))
            {
                Ok(demo) => {
                    project = demo;
                    println!("Loaded demo plan.");
                    println!("{}", render_df_as_text_table(project.dataframe()));
                }
                Err(e) => println!("Error: {e}"),
            },
            "add" => {
                let category = parts.next();
                let start = parts.next();
                let days = parts.next();
                let name = parts.collect::<Vec<_>>().join(" ");
                match (category, start, days) {
                    (Some(category), Some(start), Some(days)) if !name.is_empty() => {
                        let category = match parse_category(category) {
                            Ok(c) => c,
                            Err(e) => {
                                println!("{e}");
                                continue;
                            }
                        };
                        let start = match parse_date(Some(start)) {
                            Ok(d) => d,
                            Err(e) => {
                                println!("{e}");
                                continue;
                            }
                        };
                        let days: i64 = match days.parse() {
                            Ok(v) => v,
                            Err(_) => {
                                println!("Invalid duration");
                                continue;
                            }
                        };
                        match project.add_task(TaskRecord::new(name.clone(), category, start, days)) {
                            Ok(()) => {
                                println!("Task '{name}' added.");
                                println!("{}", render_df_as_text_table(project.dataframe()));
                            }
                            Err(e) => println!("Error: {e}"),
                        }
                    }
                    _ => println!("Usage: add <category> <YYYY-MM-DD> <days> <name...>"),
                }
            }
            "delete" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    println!("Usage: delete <name...>");
                    continue;
                }
                match project.delete_task(&name) {
                    Ok(0) => println!("Task '{name}' not found."),
                    Ok(_) => {
                        println!("Task '{name}' deleted.");
                        println!("{}", render_df_as_text_table(project.dataframe()));
                    }
                    Err(e) => println!("Error deleting task: {e}"),
                }
            }
            "pct" | "zone" | "notes" | "resource" | "category" | "start" | "duration" => {
                match run_edit(&mut project, cmd, parts) {
                    Ok(()) => println!(
                        "{cmd} set.\n{}",
                        render_df_as_text_table(project.dataframe())
                    ),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "recalc" => match project.recalculate_finish_dates() {
                Ok(()) => println!(
                    "Finish dates recalculated.\n{}",
                    render_df_as_text_table(project.dataframe())
                ),
                Err(e) => println!("Error: {e}"),
            },
            "filter" => {
                let result = parse_filter(parts)
                    .and_then(|filter| project.filtered_frame(&filter).map_err(|e| e.to_string()));
                match result {
                    Ok(df) => println!("{}", render_df_as_text_table(&df)),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "summary" => match project.summary() {
                Ok(summary) => println!("{}", summary.to_cli_summary()),
                Err(e) => println!("Error: {e}"),
            },
            "convert" => {
                let path = parts.collect::<Vec<_>>().join(" ");
                if path.is_empty() {
                    println!("Usage: convert <workbook>");
                    continue;
                }
                match convert_workbook(&path, &normalizer, &mut project) {
                    Ok(()) => println!("{}", render_df_as_text_table(project.dataframe())),
                    Err(e) => println!("Convert error: {e}"),
                }
            }
            "meta" => match parts.next() {
                Some("show") | None => print_metadata(&project),
                Some("name") => {
                    let text = parts.collect::<Vec<_>>().join(" ");
                    project.set_project_name(text);
                    print_metadata(&project);
                }
                Some("desc") => {
                    let text = parts.collect::<Vec<_>>().join(" ");
                    project.set_project_description(text);
                    print_metadata(&project);
                }
                Some(other) => println!("Unknown meta command '{other}'"),
            },
            "save" | "load" => {
                let format = parts.next();
                let path = parts.next();
                match (format, path) {
                    (Some("json"), Some(path)) if cmd == "save" => {
                        match save_project_to_json(&project, path) {
                            Ok(()) => println!("Project saved to {path}."),
                            Err(e) => println!("Save error: {e}"),
                        }
                    }
                    (Some("csv"), Some(path)) if cmd == "save" => {
                        match save_project_to_csv(&project, path) {
                            Ok(()) => println!("Project saved to {path}."),
                            Err(e) => println!("Save error: {e}"),
                        }
                    }
                    (Some("json"), Some(path)) => match load_project_from_json(path) {
                        Ok(loaded) => {
                            project = loaded;
                            println!("Project loaded from {path}.");
                        }
                        Err(e) => println!("Load error: {e}"),
                    },
                    (Some("csv"), Some(path)) => match load_project_from_csv(path) {
                        Ok(loaded) => {
                            project = loaded;
                            println!("Project loaded from {path}.");
                        }
                        Err(e) => println!("Load error: {e}"),
                    },
                    _ => println!("Usage: {cmd} <json|csv> <path>"),
                }
            }
            other => println!("Unknown command '{other}'. Type 'help'."),
        }
    }
}
