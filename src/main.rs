use std::error::Error;
use std::path::PathBuf;

use chrono::{DateTime, Local, LocalResult, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};

use minnow_timetracker::aggregate::{EntryFilter, GroupingMode, aggregate};
use minnow_timetracker::config::load_settings;
use minnow_timetracker::domain::{Entry, format_duration};
use minnow_timetracker::storage::{
	backup_entries, backup_file_name, clear_entries, load_entries, prepend_entry, restore_entries,
	save_entries, save_timer_start,
};
use minnow_timetracker::stores::{recent_stores, remember_store, resolve_store_path};
use minnow_timetracker::suggest::ranked_tags;
use minnow_timetracker::ui::run_dashboard;

#[derive(Debug, Parser)]
#[command(
	name = "minnow-timetracker",
	about = "Terminal time tracker with tag annotations"
)]
struct Cli {
	#[arg(long)]
	store: Option<PathBuf>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Init,
	Dashboard,
	Add {
		#[arg(long)]
		duration: String,
		#[arg(long)]
		description: Option<String>,
		#[arg(long)]
		date: Option<String>,
	},
	Report {
		#[arg(long)]
		group: Option<String>,
		#[arg(long)]
		filter: Option<String>,
		#[arg(long)]
		from: Option<String>,
		#[arg(long)]
		to: Option<String>,
	},
	Tags {
		#[arg(long, default_value_t = 20)]
		limit: usize,
	},
	Backup {
		#[arg(long)]
		out: Option<PathBuf>,
	},
	Restore {
		file: PathBuf,
	},
	Clear,
	Stores {
		#[arg(long, default_value_t = 20)]
		limit: usize,
	},
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();

	if let Some(Command::Stores { limit }) = &cli.command {
		print_recent_stores(*limit)?;
		return Ok(());
	}

	let store_path = resolve_store_path(cli.store)?;
	if let Err(err) = remember_store(&store_path) {
		eprintln!("warning: failed to update recent stores: {err}");
	}

	match cli.command.unwrap_or(Command::Dashboard) {
		Command::Init => {
			let entries = load_entries(&store_path)?;
			save_entries(&store_path, &entries)?;
			println!("initialized store at {}", store_path.display());
		}
		Command::Dashboard => {
			run_dashboard(&store_path)?;
		}
		Command::Add {
			duration,
			description,
			date,
		} => {
			let backdated = date.is_some();
			let date = match date {
				Some(raw) => parse_entry_date(&raw)?,
				None => Utc::now(),
			};
			let entry = Entry::new(date, &duration, description.as_deref().unwrap_or(""));
			let summary = format!("{} {}", format_duration(entry.duration), entry.description);
			prepend_entry(&store_path, entry)?;
			if !backdated {
				save_timer_start(&store_path, Utc::now())?;
			}
			println!("logged {summary}");
		}
		Command::Report {
			group,
			filter,
			from,
			to,
		} => {
			let entries = load_entries(&store_path)?;
			let mode = match group {
				Some(name) => GroupingMode::from_name(&name).ok_or_else(|| {
					format!("unknown grouping '{name}', expected none|day|week|month")
				})?,
				None => {
					let settings = load_settings().unwrap_or_else(|err| {
						eprintln!("warning: {err}");
						Default::default()
					});
					settings.grouping_mode()
				}
			};
			let filter = EntryFilter {
				fulltext: filter,
				min_date: from.as_deref().map(parse_day).transpose()?,
				max_date: to.as_deref().map(parse_day).transpose()?,
			};
			print_report(&entries, mode, &filter);
		}
		Command::Tags { limit } => {
			let entries = load_entries(&store_path)?;
			print_ranked_tags(&entries, limit);
		}
		Command::Backup { out } => {
			let file_name = backup_file_name(Local::now().date_naive());
			let target = out.unwrap_or_else(|| PathBuf::from(".")).join(file_name);
			backup_entries(&store_path, &target)?;
			println!("backed up store to {}", target.display());
		}
		Command::Restore { file } => {
			restore_entries(&store_path, &file)?;
			println!("restored store from {}", file.display());
		}
		Command::Clear => {
			clear_entries(&store_path)?;
			println!("cleared store at {}", store_path.display());
		}
		Command::Stores { .. } => {}
	}

	Ok(())
}

fn print_recent_stores(limit: usize) -> Result<(), Box<dyn Error>> {
	let rows = recent_stores(limit)?;
	if rows.is_empty() {
		println!("no recent stores");
		return Ok(());
	}

	for (index, path) in rows.iter().enumerate() {
		println!("{:>2}. {}", index + 1, path.display());
	}

	Ok(())
}

fn print_report(entries: &[Entry], mode: GroupingMode, filter: &EntryFilter) {
	let buckets = aggregate(entries, mode, filter);
	if buckets.is_empty() {
		if filter.is_empty() {
			println!("no entries yet");
		} else {
			println!("no entries match the filter");
		}
		return;
	}

	for bucket in buckets {
		println!(
			"{} ~ {}",
			bucket.key.heading(),
			format_duration(bucket.duration)
		);
		for tag_bucket in &bucket.tag_buckets {
			println!(
				"  {} ~ {}",
				tag_bucket.tag,
				format_duration(tag_bucket.duration)
			);
			for entry in &tag_bucket.entries {
				println!(
					"    {} {}",
					format_duration(entry.duration),
					entry.description
				);
			}
		}
		println!();
	}
}

fn print_ranked_tags(entries: &[Entry], limit: usize) {
	let ranked = ranked_tags(entries);
	if ranked.is_empty() {
		println!("no tags yet");
		return;
	}

	for (index, tag) in ranked.iter().take(limit).enumerate() {
		println!("{:>2}. {tag}", index + 1);
	}
}

fn parse_entry_date(raw: &str) -> Result<DateTime<Utc>, Box<dyn Error>> {
	if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
		return Ok(timestamp.with_timezone(&Utc));
	}

	// bare dates land at local noon
	let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d")?;
	let naive = day.and_hms_opt(12, 0, 0).expect("noon must be valid");
	match Local.from_local_datetime(&naive) {
		LocalResult::Single(timestamp) => Ok(timestamp.with_timezone(&Utc)),
		LocalResult::Ambiguous(first, _) => Ok(first.with_timezone(&Utc)),
		LocalResult::None => Err(format!("date does not exist in local time: {raw}").into()),
	}
}

fn parse_day(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
	NaiveDate::parse_from_str(raw, "%Y-%m-%d")
}
